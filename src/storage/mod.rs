//! # Storage Gateway
//!
//! Leitura e escrita de blobs nomeados em um bucket. Usado tanto para o
//! cache do CSV bruto quanto para o snapshot dos dados limpos.

pub mod local;
pub mod memory;

#[cfg(feature = "cloud")]
pub mod s3;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::traits::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Fachada sobre um [`ObjectStore`] com operações baseadas em arquivos locais
#[derive(Clone)]
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
}

impl StorageGateway {
    pub fn new<S: ObjectStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Cria o gateway a partir da configuração de armazenamento
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Local => Ok(Self::new(local::LocalObjectStore::new(&config.local_root))),
            #[cfg(feature = "cloud")]
            StorageBackend::S3 => Ok(Self::new(s3::S3ObjectStore::from_config(config).await)),
            #[cfg(not(feature = "cloud"))]
            StorageBackend::S3 => Err(crate::error::EtlError::Config(
                crate::error::ConfigError::InvalidValue {
                    param: "storage.backend".to_string(),
                    value: "s3 (compilado sem a feature `cloud`)".to_string(),
                },
            )),
        }
    }

    /// Nome do backend em uso
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Envia o conteúdo de um arquivo local para `bucket/key`, sobrescrevendo-o
    pub async fn put(&self, bucket: &str, local_path: impl AsRef<Path>, key: &str) -> Result<()> {
        let local_path = local_path.as_ref();
        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        self.store.put_object(bucket, key, data).await?;

        info!(
            bucket = %bucket,
            key = %key,
            bytes = size,
            "Arquivo {} enviado para {}",
            local_path.display(),
            key
        );
        Ok(())
    }

    /// Baixa `bucket/key` para um arquivo local; o blob precisa existir
    pub async fn get(&self, bucket: &str, key: &str, local_path: impl AsRef<Path>) -> Result<()> {
        let local_path = local_path.as_ref();
        let data = self.store.get_object(bucket, key).await?;

        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(local_path, &data).await?;

        info!(
            bucket = %bucket,
            key = %key,
            bytes = data.len(),
            "Arquivo {} baixado para {}",
            key,
            local_path.display()
        );
        Ok(())
    }

    /// Grava bytes diretamente no blob
    pub async fn put_bytes(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.store.put_object(bucket, key, data).await
    }

    /// Lê o blob inteiro em memória
    pub async fn get_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.store.get_object(bucket, key).await
    }
}

impl std::fmt::Debug for StorageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageGateway")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}
