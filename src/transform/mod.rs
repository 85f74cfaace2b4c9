pub mod clean;
pub mod revenue;

pub use clean::{CleanedDataset, Cleaner, CleaningStats};
pub use revenue::{RevenueTransform, SalesReport, TransformedDataset};
