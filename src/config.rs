use crate::error::{ConfigError, EtlError};
use crate::extract::encoding::TextEncoding;
use crate::types::TableRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Endpoint de download do dataset público de e-commerce
pub const DEFAULT_SOURCE_URL: &str =
    "https://www.kaggle.com/api/v1/datasets/download/carrie1/ecommerce-data";

/// Configuração principal do ETL
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EtlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub inspection: InspectionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// De onde o dataset bruto é obtido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Download HTTP do arquivo compactado
    Http,
    /// Arquivo local já baixado (zip ou CSV)
    File,
    /// CSV bruto guardado no bucket
    Storage,
}

/// Configuração da fonte do dataset
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub url: String,
    /// Caminho fixo onde o download é gravado
    pub archive_path: PathBuf,
    /// Arquivo local usado quando `kind = "file"`
    pub local_path: Option<PathBuf>,
    /// Chave do CSV bruto no bucket quando `kind = "storage"`
    pub raw_key: Option<String>,
    pub raw_local_path: PathBuf,
    /// Entrada do zip a ser lida; sem valor, o zip deve conter um único CSV
    pub csv_entry: Option<String>,
    pub username: Option<String>,
    pub key: Option<String>,
    pub primary_encoding: TextEncoding,
    pub fallback_encoding: TextEncoding,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Http,
            url: DEFAULT_SOURCE_URL.to_string(),
            archive_path: PathBuf::from("/tmp/ecommerce-data.zip"),
            local_path: None,
            raw_key: None,
            raw_local_path: PathBuf::from("/tmp/raw_data.csv"),
            csv_entry: None,
            username: None,
            key: None,
            primary_encoding: TextEncoding::Utf8,
            fallback_encoding: TextEncoding::Latin1,
        }
    }
}

/// Backend do object storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// API S3 (AWS ou endpoint compatível, como o de interoperabilidade do GCS)
    S3,
    /// Diretório local, um subdiretório por bucket
    Local,
}

/// Configuração do object storage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub cleaned_key: String,
    /// Arquivo temporário do snapshot limpo antes do upload
    pub cleaned_local_path: PathBuf,
    pub endpoint: Option<String>,
    pub region: String,
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: "amentoria".to_string(),
            cleaned_key: "cleaned_data.csv".to_string(),
            cleaned_local_path: PathBuf::from("/tmp/cleaned_data.csv"),
            endpoint: None,
            region: "auto".to_string(),
            local_root: PathBuf::from("/tmp/ecommerce-etl-storage"),
        }
    }
}

/// Configuração do data warehouse de destino
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    /// Chave da service account; o arquivo só é lido no momento da carga
    pub credentials_path: PathBuf,
    pub location: Option<String>,
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset_id: String::new(),
            table_id: String::new(),
            credentials_path: PathBuf::new(),
            location: None,
            api_base_url: "https://bigquery.googleapis.com".to_string(),
            poll_interval_ms: 1000,
            max_poll_attempts: 300,
        }
    }
}

impl WarehouseConfig {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.project_id, &self.dataset_id, &self.table_id)
    }
}

/// O que fazer com linhas cujos valores não podem ser convertidos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowErrorPolicy {
    /// Aborta a execução no primeiro valor inválido
    #[default]
    Fail,
    /// Descarta a linha e segue, contabilizando-a
    Skip,
}

/// Configuração da limpeza
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub row_error_policy: RowErrorPolicy,
}

/// Configuração da inspeção
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectionConfig {
    pub preview_rows: usize,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

/// Configuração de observabilidade
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Formato de log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl EtlConfig {
    /// Cria um novo builder para configuração
    pub fn builder() -> EtlConfigBuilder {
        EtlConfigBuilder::default()
    }

    /// Carrega configuração do ambiente do processo
    pub fn from_env() -> Result<Self, EtlError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Carrega configuração a partir de uma função de busca de variáveis
    pub fn from_env_with<F>(lookup: F) -> Result<Self, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(project) = lookup("ETL_PROJECT_ID") {
            builder = builder.project_id(project);
        }
        if let Some(dataset) = lookup("ETL_DATASET_ID") {
            builder = builder.dataset_id(dataset);
        }
        if let Some(table) = lookup("ETL_TABLE_ID") {
            builder = builder.table_id(table);
        }
        if let Some(path) = lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            builder = builder.credentials_path(path);
        }
        if let Some(location) = lookup("ETL_WAREHOUSE_LOCATION") {
            builder.config.warehouse.location = Some(location);
        }

        if let Some(bucket) = lookup("ETL_BUCKET") {
            builder = builder.bucket(bucket);
        }
        if let Some(endpoint) = lookup("ETL_STORAGE_ENDPOINT") {
            builder = builder.storage_endpoint(endpoint);
        }
        if let Some(backend) = lookup("ETL_STORAGE_BACKEND") {
            let backend = match backend.to_lowercase().as_str() {
                "s3" => StorageBackend::S3,
                "local" => StorageBackend::Local,
                _ => {
                    return Err(EtlError::Config(ConfigError::InvalidValue {
                        param: "storage.backend".to_string(),
                        value: backend,
                    }))
                }
            };
            builder = builder.storage_backend(backend);
        }
        if let Some(root) = lookup("ETL_LOCAL_STORAGE_ROOT") {
            builder = builder.local_storage_root(root);
        }

        if let Some(url) = lookup("ETL_SOURCE_URL") {
            builder = builder.source_url(url);
        }
        if let Some(username) = lookup("KAGGLE_USERNAME") {
            builder.config.source.username = Some(username);
        }
        if let Some(key) = lookup("KAGGLE_KEY") {
            builder.config.source.key = Some(key);
        }

        if let Some(policy) = lookup("ETL_ROW_ERROR_POLICY") {
            let policy = match policy.to_lowercase().as_str() {
                "fail" => RowErrorPolicy::Fail,
                "skip" => RowErrorPolicy::Skip,
                _ => {
                    return Err(EtlError::Config(ConfigError::InvalidValue {
                        param: "cleaning.row_error_policy".to_string(),
                        value: policy,
                    }))
                }
            };
            builder = builder.row_error_policy(policy);
        }

        if let Some(level) = lookup("ETL_LOG_LEVEL") {
            builder = builder.log_level(level);
        }

        builder.build()
    }

    /// Carrega configuração de arquivo
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EtlError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Carrega configuração de string TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, EtlError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Valida a configuração
    pub fn validate(&self) -> Result<(), EtlError> {
        let required = [
            ("warehouse.project_id", self.warehouse.project_id.as_str()),
            ("warehouse.dataset_id", self.warehouse.dataset_id.as_str()),
            ("warehouse.table_id", self.warehouse.table_id.as_str()),
            ("storage.bucket", self.storage.bucket.as_str()),
            ("storage.cleaned_key", self.storage.cleaned_key.as_str()),
        ];
        for (param, value) in required {
            if value.trim().is_empty() {
                return Err(missing(param));
            }
        }

        if self.warehouse.credentials_path.as_os_str().is_empty() {
            return Err(missing("warehouse.credentials_path"));
        }

        match self.source.kind {
            SourceKind::Http if self.source.url.trim().is_empty() => {
                return Err(missing("source.url"));
            }
            SourceKind::File if self.source.local_path.is_none() => {
                return Err(missing("source.local_path"));
            }
            SourceKind::Storage if self.source.raw_key.is_none() => {
                return Err(missing("source.raw_key"));
            }
            _ => {}
        }

        if self.inspection.preview_rows == 0 {
            return Err(invalid("inspection.preview_rows", "0"));
        }

        if self.warehouse.poll_interval_ms == 0 {
            return Err(invalid("warehouse.poll_interval_ms", "0"));
        }

        if self.warehouse.max_poll_attempts == 0 {
            return Err(invalid("warehouse.max_poll_attempts", "0"));
        }

        Ok(())
    }
}

fn missing(param: &str) -> EtlError {
    EtlError::Config(ConfigError::MissingRequiredParameter(param.to_string()))
}

fn invalid(param: &str, value: &str) -> EtlError {
    EtlError::Config(ConfigError::InvalidValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}

/// Builder para configuração ETL
#[derive(Default)]
pub struct EtlConfigBuilder {
    config: EtlConfig,
}

impl EtlConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config.warehouse.project_id = project_id.into();
        self
    }

    pub fn dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.config.warehouse.dataset_id = dataset_id.into();
        self
    }

    pub fn table_id(mut self, table_id: impl Into<String>) -> Self {
        self.config.warehouse.table_id = table_id.into();
        self
    }

    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.warehouse.credentials_path = path.into();
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.storage.bucket = bucket.into();
        self
    }

    pub fn cleaned_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage.cleaned_local_path = path.into();
        self
    }

    pub fn storage_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage.backend = backend;
        self
    }

    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage.endpoint = Some(endpoint.into());
        self
    }

    pub fn local_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage.local_root = root.into();
        self
    }

    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.config.source.kind = SourceKind::Http;
        self.config.source.url = url.into();
        self
    }

    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source.kind = SourceKind::File;
        self.config.source.local_path = Some(path.into());
        self
    }

    pub fn source_blob(mut self, key: impl Into<String>) -> Self {
        self.config.source.kind = SourceKind::Storage;
        self.config.source.raw_key = Some(key.into());
        self
    }

    pub fn archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source.archive_path = path.into();
        self
    }

    pub fn encodings(mut self, primary: TextEncoding, fallback: TextEncoding) -> Self {
        self.config.source.primary_encoding = primary;
        self.config.source.fallback_encoding = fallback;
        self
    }

    pub fn row_error_policy(mut self, policy: RowErrorPolicy) -> Self {
        self.config.cleaning.row_error_policy = policy;
        self
    }

    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.config.inspection.preview_rows = rows;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.observability.log_level = level.into();
        self
    }

    pub fn build(self) -> Result<EtlConfig, EtlError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete_builder() -> EtlConfigBuilder {
        EtlConfig::builder()
            .project_id("composed-hold")
            .dataset_id("ecommerce_data")
            .table_id("sales_report")
            .credentials_path("/secrets/key.json")
    }

    #[test]
    fn test_default_config() {
        let config = EtlConfig::default();
        assert_eq!(config.storage.bucket, "amentoria");
        assert_eq!(config.storage.cleaned_key, "cleaned_data.csv");
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.primary_encoding, TextEncoding::Utf8);
        assert_eq!(config.source.fallback_encoding, TextEncoding::Latin1);
        assert_eq!(config.inspection.preview_rows, 5);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_config_builder() {
        let config = complete_builder()
            .bucket("outro-bucket")
            .row_error_policy(RowErrorPolicy::Skip)
            .log_level("debug")
            .build()
            .unwrap();

        assert_eq!(config.storage.bucket, "outro-bucket");
        assert_eq!(config.cleaning.row_error_policy, RowErrorPolicy::Skip);
        assert_eq!(
            config.warehouse.table_ref().to_string(),
            "composed-hold.ecommerce_data.sales_report"
        );
    }

    #[test]
    fn test_missing_required_fields_are_named() {
        let err = EtlConfig::builder().build().unwrap_err();
        assert!(matches!(
            err,
            EtlError::Config(ConfigError::MissingRequiredParameter(ref p)) if p == "warehouse.project_id"
        ));

        let err = EtlConfig::builder()
            .project_id("p")
            .dataset_id("d")
            .table_id("t")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            EtlError::Config(ConfigError::MissingRequiredParameter(ref p)) if p == "warehouse.credentials_path"
        ));

        let err = complete_builder().bucket("  ").build().unwrap_err();
        assert!(matches!(
            err,
            EtlError::Config(ConfigError::MissingRequiredParameter(ref p)) if p == "storage.bucket"
        ));
    }

    #[test]
    fn test_credentials_file_is_not_checked() {
        let config = complete_builder()
            .credentials_path("/nao/existe/key.json")
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_config_validation() {
        let err = complete_builder().preview_rows(0).build().unwrap_err();
        assert!(matches!(err, EtlError::Config(ConfigError::InvalidValue { .. })));

        let mut config = complete_builder().build().unwrap();
        config.source.kind = SourceKind::File;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_env() {
        let vars: HashMap<&str, &str> = [
            ("ETL_PROJECT_ID", "proj"),
            ("ETL_DATASET_ID", "ecommerce_data"),
            ("ETL_TABLE_ID", "sales_report"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/key.json"),
            ("ETL_BUCKET", "amentoria"),
            ("ETL_STORAGE_BACKEND", "local"),
            ("KAGGLE_USERNAME", "user"),
            ("KAGGLE_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let config =
            EtlConfig::from_env_with(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.warehouse.project_id, "proj");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.source.username.as_deref(), Some("user"));
        assert_eq!(config.source.key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_config_from_env_rejects_unknown_backend() {
        let vars: HashMap<&str, &str> = [("ETL_STORAGE_BACKEND", "ftp")].into_iter().collect();
        let err = EtlConfig::from_env_with(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, EtlError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
        [source]
        kind = "file"
        local_path = "/data/data.csv"
        fallback_encoding = "latin1"

        [storage]
        backend = "local"
        bucket = "amentoria"
        local_root = "/tmp/storage"

        [warehouse]
        project_id = "proj"
        dataset_id = "ecommerce_data"
        table_id = "sales_report"
        credentials_path = "/secrets/key.json"

        [cleaning]
        row_error_policy = "skip"

        [observability]
        log_level = "debug"
        log_format = "json"
        "#;

        let config = EtlConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.local_path, Some(PathBuf::from("/data/data.csv")));
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.cleaned_key, "cleaned_data.csv");
        assert_eq!(config.cleaning.row_error_policy, RowErrorPolicy::Skip);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.inspection.preview_rows, 5);
    }
}
