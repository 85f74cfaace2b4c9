//! # Local Store
//!
//! Object store em disco: cada bucket é um diretório sob a raiz configurada.

use async_trait::async_trait;
use crate::error::{Result, StorageError};
use crate::traits::ObjectStore;
use std::path::{Component, Path, PathBuf};

/// Object store baseado no sistema de arquivos local
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Caminho do blob em disco; rejeita chaves que escapariam do bucket
    fn blob_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if bucket.is_empty() || bucket.contains(['/', '\\']) || key.is_empty() || escapes {
            return Err(StorageError::Backend {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "nome de bucket ou chave inválido".to_string(),
            }
            .into());
        }

        Ok(self.root.join(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.blob_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_writes_under_bucket_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store
            .put_object("amentoria", "cleaned_data.csv", b"x".to_vec())
            .await
            .unwrap();

        assert!(dir.path().join("amentoria").join("cleaned_data.csv").exists());
        assert_eq!(
            store.get_object("amentoria", "cleaned_data.csv").await.unwrap(),
            b"x"
        );
    }

    #[tokio::test]
    async fn test_local_store_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.get_object("amentoria", "nada.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_local_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        assert!(store.put_object("b", "../fora.csv", vec![]).await.is_err());
        assert!(store.put_object("b", "/abs.csv", vec![]).await.is_err());
        assert!(store.put_object("a/b", "k", vec![]).await.is_err());
    }
}
