//! # Memory Warehouse
//!
//! Warehouse em memória com semântica de substituição completa por tabela.
//! Útil para testes e para execuções locais sem destino remoto.

use async_trait::async_trait;
use crate::error::{LoadError, Result};
use crate::traits::WarehouseLoader;
use crate::types::{LoadSummary, RevenueRecord, TableRef};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Warehouse que mantém as tabelas em memória
///
/// # Exemplos
///
/// ```rust
/// use ecommerce_etl::load::memory::MemoryWarehouse;
/// use ecommerce_etl::traits::WarehouseLoader;
/// use ecommerce_etl::types::TableRef;
///
/// async fn exemplo() -> ecommerce_etl::error::Result<()> {
///     let warehouse = MemoryWarehouse::new();
///     let table = TableRef::new("proj", "ecommerce_data", "sales_report");
///
///     warehouse.replace_table(&table, &[]).await?;
///     assert_eq!(warehouse.table(&table).map(|rows| rows.len()), Some(0));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    tables: Arc<Mutex<HashMap<TableRef, Vec<RevenueRecord>>>>,
    loads: Arc<Mutex<usize>>,
    failure: Option<String>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warehouse que rejeita toda carga com a mensagem informada
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Conteúdo atual da tabela, se ela já foi criada
    pub fn table(&self, table: &TableRef) -> Option<Vec<RevenueRecord>> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
    }

    /// Número de cargas bem-sucedidas
    pub fn load_count(&self) -> usize {
        *self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WarehouseLoader for MemoryWarehouse {
    async fn replace_table(&self, table: &TableRef, rows: &[RevenueRecord]) -> Result<LoadSummary> {
        if let Some(message) = &self.failure {
            return Err(LoadError::DestinationConnection(message.clone()).into());
        }

        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.clone(), rows.to_vec());
        *self.loads.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        Ok(LoadSummary {
            table: table.clone(),
            rows_loaded: rows.len(),
            job_id: None,
        })
    }
}
