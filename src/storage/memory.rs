//! # Memory Store
//!
//! Object store em memória, para testes e execuções locais.

use async_trait::async_trait;
use crate::error::{Result, StorageError};
use crate::traits::ObjectStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type Blobs = HashMap<(String, String), Vec<u8>>;

/// Object store que mantém os blobs em um `HashMap` compartilhado.
///
/// Clones compartilham o mesmo armazenamento.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    blobs: Arc<Mutex<Blobs>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conteúdo atual de um blob, se existir
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Número de blobs armazenados
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key).ok_or_else(|| {
            StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
            .into()
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
