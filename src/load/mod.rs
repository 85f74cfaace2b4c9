pub mod auth;
pub mod bigquery;
pub mod csv;
pub mod memory;

pub use bigquery::BigQueryLoader;
pub use memory::MemoryWarehouse;
