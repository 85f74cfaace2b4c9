//! Autenticação OAuth2 do warehouse via chave de service account
//! (concessão JWT bearer assinada com RS256).

use async_trait::async_trait;
use crate::error::{LoadError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Escopo de acesso de leitura e escrita no BigQuery
pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;

/// Fornece o token de acesso usado nas chamadas ao warehouse
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Campos usados do arquivo JSON da service account
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Lê a chave do arquivo indicado
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LoadError::Authentication(format!(
                "não foi possível ler as credenciais em {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            LoadError::Authentication(format!("credenciais inválidas em {}: {}", path.display(), e))
                .into()
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Obtém tokens trocando um JWT assinado pela chave da service account.
///
/// O arquivo de credenciais só é lido quando um token é solicitado.
#[derive(Debug, Clone)]
pub struct ServiceAccountTokenProvider {
    credentials_path: PathBuf,
    client: reqwest::Client,
}

impl ServiceAccountTokenProvider {
    pub fn new(credentials_path: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            client,
        }
    }

    fn signed_assertion(key: &ServiceAccountKey) -> Result<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let claims = Claims {
            iss: &key.client_email,
            scope: BIGQUERY_SCOPE,
            aud: &key.token_uri,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &encoding_key,
        )?)
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let key = ServiceAccountKey::from_file(&self.credentials_path).await?;
        let assertion = Self::signed_assertion(&key)?;

        debug!(client_email = %key.client_email, "Solicitando token de acesso");

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| LoadError::Authentication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoadError::Authentication(format!("{}: {}", status, body)).into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LoadError::Authentication(e.to_string()))?;
        Ok(token.access_token)
    }
}

/// Token fixo, para destinos que não exigem a troca OAuth2
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
