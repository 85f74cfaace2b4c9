//! Fontes do dataset bruto: download HTTP, arquivo local ou blob no bucket.

use async_trait::async_trait;
use crate::config::{SourceConfig, SourceKind, StorageConfig};
use crate::error::{ExtractError, Result};
use crate::storage::StorageGateway;
use crate::traits::DatasetSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Baixa o arquivo compactado do dataset para um caminho local fixo
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    archive_path: PathBuf,
    credentials: Option<(String, String)>,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            archive_path: archive_path.into(),
            credentials: None,
            client: reqwest::Client::new(),
        }
    }

    /// Usa autenticação HTTP básica (usuário e chave da API do host)
    pub fn with_basic_auth(mut self, username: impl Into<String>, key: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), key.into()));
        self
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn fetch(&self) -> Result<PathBuf> {
        info!(url = %self.url, "Baixando dataset");

        let mut request = self.client.get(&self.url);
        if let Some((username, key)) = &self.credentials {
            request = request.basic_auth(username, Some(key));
        }

        let response = request.send().await?.error_for_status()?;
        let payload = response.bytes().await?;

        if let Some(parent) = self.archive_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.archive_path, &payload).await?;

        info!(
            bytes = payload.len(),
            path = %self.archive_path.display(),
            "Download concluído"
        );
        Ok(self.archive_path.clone())
    }

    fn describe(&self) -> String {
        format!("http: {}", self.url)
    }
}

/// Usa um arquivo local já existente (zip ou CSV)
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    async fn fetch(&self) -> Result<PathBuf> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(ExtractError::FileNotFound(self.path.display().to_string()).into());
        }
        Ok(self.path.clone())
    }

    fn describe(&self) -> String {
        format!("arquivo: {}", self.path.display())
    }
}

/// Baixa o CSV bruto guardado no bucket para um caminho local
#[derive(Debug, Clone)]
pub struct StorageSource {
    gateway: StorageGateway,
    bucket: String,
    key: String,
    local_path: PathBuf,
}

impl StorageSource {
    pub fn new(
        gateway: StorageGateway,
        bucket: impl Into<String>,
        key: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            bucket: bucket.into(),
            key: key.into(),
            local_path: local_path.into(),
        }
    }
}

#[async_trait]
impl DatasetSource for StorageSource {
    async fn fetch(&self) -> Result<PathBuf> {
        self.gateway
            .get(&self.bucket, &self.key, &self.local_path)
            .await?;
        Ok(self.local_path.clone())
    }

    fn describe(&self) -> String {
        format!("{}: {}/{}", self.gateway.backend_name(), self.bucket, self.key)
    }
}

/// Monta a fonte descrita na configuração
pub fn from_config(
    source: &SourceConfig,
    storage: &StorageConfig,
    gateway: &StorageGateway,
) -> Result<Arc<dyn DatasetSource>> {
    let missing = |param: &str| {
        crate::error::EtlError::Config(crate::error::ConfigError::MissingRequiredParameter(
            param.to_string(),
        ))
    };

    let built: Arc<dyn DatasetSource> = match source.kind {
        SourceKind::Http => {
            let mut http = HttpSource::new(&source.url, &source.archive_path);
            if let (Some(username), Some(key)) = (&source.username, &source.key) {
                http = http.with_basic_auth(username, key);
            }
            Arc::new(http)
        }
        SourceKind::File => {
            let path = source
                .local_path
                .as_ref()
                .ok_or_else(|| missing("source.local_path"))?;
            Arc::new(FileSource::new(path))
        }
        SourceKind::Storage => {
            let key = source
                .raw_key
                .as_ref()
                .ok_or_else(|| missing("source.raw_key"))?;
            Arc::new(StorageSource::new(
                gateway.clone(),
                &storage.bucket,
                key,
                &source.raw_local_path,
            ))
        }
    };

    Ok(built)
}
