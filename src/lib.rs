//! # ecommerce-etl - Pipeline ETL de transações de e-commerce
//!
//! Pipeline em lote que baixa o dataset público de transações de e-commerce,
//! limpa e agrega os dados, guarda um snapshot do dataset limpo em object
//! storage e substitui por completo a tabela de destino no data warehouse.
//!
//! ## Etapas
//!
//! Extração → Inspeção → Limpeza → Snapshot no bucket → Transformação → Carga
//!
//! - **Extração**: download (ou arquivo local, ou blob no bucket), abertura do
//!   zip e decodificação com codificação de fallback.
//! - **Inspeção**: primeiras linhas, tipos e valores ausentes por coluna.
//! - **Limpeza**: remoção de linhas incompletas ou inválidas e de duplicatas.
//! - **Transformação**: receita por linha, receita total, vendas por país e
//!   receita por descrição de item.
//! - **Carga**: substituição completa da tabela. Uma falha aqui é registrada
//!   e não interrompe o pipeline.
//!
//! ## Exemplo Rápido
//!
//! ```rust,no_run
//! use ecommerce_etl::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let config = EtlConfig::from_file("etl.toml")?;
//!     let report = ecommerce_etl::pipeline::run(config).await?;
//!
//!     println!("{}", report.sales);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod inspect;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod traits;
pub mod transform;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports para facilitar o uso
pub use config::EtlConfig;
pub use error::{EtlError, Result};
pub use events::{InMemoryEventEmitter, LoggingEventEmitter};
pub use pipeline::{Pipeline, PipelineReport};
pub use storage::StorageGateway;
pub use traits::*;
pub use types::{LoadOutcome, PipelineEvent, PipelineState, RawTransaction, RevenueRecord, Transaction};

/// Prelude com imports mais comuns
pub mod prelude {
    pub use crate::config::{EtlConfig, RowErrorPolicy};
    pub use crate::error::{EtlError, Result};
    pub use crate::events::{InMemoryEventEmitter, LoggingEventEmitter};
    pub use crate::pipeline::{Pipeline, PipelineReport};
    pub use crate::storage::StorageGateway;
    pub use crate::traits::{DatasetSource, EventEmitter, Extractor, ObjectStore, Transformer, WarehouseLoader};
    pub use crate::types::{
        LoadOutcome, PipelineEvent, PipelineState, RawTransaction, RevenueRecord, TableRef, Transaction,
    };

    // Extração
    pub use crate::extract::source::{FileSource, HttpSource, StorageSource};
    pub use crate::extract::{EncodingPolicy, TextEncoding, TransactionExtractor};

    // Inspeção e transformação
    pub use crate::inspect::{InspectionReport, Inspector};
    pub use crate::transform::{Cleaner, CleaningStats, RevenueTransform, SalesReport};

    // Armazenamento e carga
    pub use crate::load::{BigQueryLoader, MemoryWarehouse};
    pub use crate::storage::local::LocalObjectStore;
    pub use crate::storage::memory::MemoryObjectStore;
    #[cfg(feature = "cloud")]
    pub use crate::storage::s3::S3ObjectStore;
}

/// Informações sobre a versão da biblioteca
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Informações sobre a biblioteca
pub fn about() -> &'static str {
    env!("CARGO_PKG_DESCRIPTION")
}
