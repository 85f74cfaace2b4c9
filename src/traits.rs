use async_trait::async_trait;
use crate::error::Result;
use crate::types::{LoadSummary, RawTransaction, RevenueRecord, TableRef};
use std::path::PathBuf;

/// Trait para fontes do dataset bruto
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Materializa o dataset em um arquivo local (zip ou CSV) e retorna o caminho
    async fn fetch(&self) -> Result<PathBuf>;

    /// Descrição curta da fonte, usada nos logs
    fn describe(&self) -> String;
}

/// Trait para componentes que extraem dados
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extrai o dataset bruto, com o schema original
    async fn extract(&self) -> Result<Vec<RawTransaction>>;
}

/// Trait para componentes que transformam dados
#[async_trait]
pub trait Transformer: Send + Sync {
    type Input: Send + 'static;
    type Output: Send;

    /// Transforma o dataset inteiro
    async fn transform(&self, data: Vec<Self::Input>) -> Result<Self::Output>;
}

/// Trait para backends de object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Grava o blob, sobrescrevendo conteúdo existente
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()>;

    /// Lê o blob; falha com `StorageError::NotFound` se ele não existir
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Nome do backend, usado nos logs
    fn backend_name(&self) -> &'static str;
}

/// Trait para componentes que carregam dados no warehouse
#[async_trait]
pub trait WarehouseLoader: Send + Sync {
    /// Substitui todo o conteúdo da tabela pelas linhas informadas
    async fn replace_table(&self, table: &TableRef, rows: &[RevenueRecord]) -> Result<LoadSummary>;
}

/// Trait para emissão de eventos do pipeline
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emite um evento do pipeline
    async fn emit(&self, event: crate::types::PipelineEvent) -> Result<()>;
}
