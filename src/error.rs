use thiserror::Error;

/// Tipo Result principal da biblioteca
pub type Result<T> = std::result::Result<T, EtlError>;

/// Erro principal do pipeline
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Erro de extração: {0}")]
    Extract(#[from] ExtractError),

    #[error("Erro de transformação: {0}")]
    Transform(#[from] TransformError),

    #[error("Erro de carga: {0}")]
    Load(#[from] LoadError),

    #[error("Erro de armazenamento: {0}")]
    Storage(#[from] StorageError),

    #[error("Erro de configuração: {0}")]
    Config(#[from] ConfigError),

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),}

/// Erros relacionados à extração do dataset
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Falha no download de {url}: {message}")]
    Download { url: String, message: String },

    #[error("Arquivo não encontrado: {0}")]
    FileNotFound(String),

    #[error("Arquivo compactado inválido: {0}")]
    Archive(String),

    #[error("Formato inválido: {0}")]
    InvalidFormat(String),

    #[error("Não foi possível decodificar o conteúdo como {encoding}")]
    Decode { encoding: String },

    #[error("Erro de parsing na linha {row}, coluna {column}: valor '{value}'")]
    ParseError {
        row: usize,
        column: String,
        value: String,
    },
}

/// Erros relacionados à limpeza e transformação
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Data inválida na linha {row}: '{value}'")]
    DateParse { row: usize, value: String },
}

/// Erros relacionados ao carregamento no warehouse
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Falha de autenticação: {0}")]
    Authentication(String),

    #[error("Erro de conexão de destino: {0}")]
    DestinationConnection(String),

    #[error("Job de carga {job_id} falhou: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Job de carga {job_id} não concluiu após {attempts} consultas")]
    JobIncomplete { job_id: String, attempts: u32 },

    #[error("Erro de escrita: {0}")]
    WriteError(String),
}

/// Erros do object storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob não encontrado: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Erro no backend de armazenamento ({bucket}/{key}): {message}")]
    Backend {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Erros relacionados à configuração
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parâmetro obrigatório ausente: {0}")]
    MissingRequiredParameter(String),

    #[error("Valor inválido para {param}: {value}")]
    InvalidValue { param: String, value: String },

    #[error("Erro de parsing de configuração: {0}")]
    ParseError(String),
}

impl EtlError {
    /// Retorna o código de erro
    pub fn error_code(&self) -> &'static str {
        match self {
            EtlError::Extract(_) => "EXTRACT_ERROR",
            EtlError::Transform(_) => "TRANSFORM_ERROR",
            EtlError::Load(_) => "LOAD_ERROR",
            EtlError::Storage(_) => "STORAGE_ERROR",
            EtlError::Config(_) => "CONFIG_ERROR",
            EtlError::Io(_) => "IO_ERROR",
            EtlError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Indica se o blob ausente foi a causa do erro
    pub fn is_not_found(&self) -> bool {
        matches!(self, EtlError::Storage(StorageError::NotFound { .. }))
    }
}

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        EtlError::Config(ConfigError::ParseError(err.to_string()))
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(io_err) => {
                EtlError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()))
            }
            csv::ErrorKind::Utf8 { .. } => {
                EtlError::Extract(ExtractError::InvalidFormat("UTF-8 inválido".to_string()))
            }
            _ => EtlError::Extract(ExtractError::InvalidFormat(err.to_string())),
        }
    }
}

impl From<zip::result::ZipError> for EtlError {
    fn from(err: zip::result::ZipError) -> Self {
        EtlError::Extract(ExtractError::Archive(err.to_string()))
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<desconhecida>".to_string());
        EtlError::Extract(ExtractError::Download {
            url,
            message: err.to_string(),
        })
    }
}

impl From<jsonwebtoken::errors::Error> for EtlError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        EtlError::Load(LoadError::Authentication(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EtlError::Storage(StorageError::NotFound {
            bucket: "b".to_string(),
            key: "k".to_string(),
        });
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.is_not_found());

        let err = EtlError::Config(ConfigError::MissingRequiredParameter("bucket".to_string()));
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = EtlError::Transform(TransformError::DateParse {
            row: 3,
            value: "ontem".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Erro de transformação: Data inválida na linha 3: 'ontem'"
        );
    }
}
