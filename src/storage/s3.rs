//! # S3 Store
//!
//! Object store sobre a API S3. Com `endpoint` configurado aponta para
//! qualquer serviço compatível, como o endpoint de interoperabilidade do
//! Google Cloud Storage (`https://storage.googleapis.com`) com chaves HMAC.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::traits::ObjectStore;
use tracing::debug;

/// Object store baseado no SDK S3
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Constrói o cliente a partir da cadeia padrão de credenciais da AWS
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        debug!(endpoint = ?config.endpoint, region = %config.region, "Cliente S3 criado");
        Self::new(Client::from_conf(s3_config))
    }
}

fn backend_error(bucket: &str, key: &str, message: String) -> StorageError {
    StorageError::Backend {
        bucket: bucket.to_string(),
        key: key.to_string(),
        message,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| backend_error(bucket, key, DisplayErrorContext(err).to_string()))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                    .into());
                }
                return Err(
                    backend_error(bucket, key, DisplayErrorContext(service_error).to_string()).into(),
                );
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|err| backend_error(bucket, key, err.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
