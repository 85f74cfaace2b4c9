//! # BigQuery Loader
//!
//! Carga completa (substituição) de uma tabela do BigQuery pela API REST:
//! um job de carga com upload multipart em JSON delimitado por linha,
//! `WRITE_TRUNCATE` e `CREATE_IF_NEEDED`, acompanhado até o estado `DONE`.

use async_trait::async_trait;
use crate::config::WarehouseConfig;
use crate::error::{LoadError, Result};
use crate::load::auth::{ServiceAccountTokenProvider, TokenProvider};
use crate::traits::WarehouseLoader;
use crate::types::{ColumnType, LoadSummary, RevenueRecord, TableRef, REVENUE_COLUMNS};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const MULTIPART_BOUNDARY: &str = "ecommerce_etl_load_job";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
    #[serde(default)]
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    #[serde(default)]
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    #[serde(default)]
    output_rows: Option<String>,
}

impl Job {
    fn is_done(&self) -> bool {
        self.status.state == "DONE"
    }

    fn output_rows(&self) -> Option<usize> {
        self.statistics
            .as_ref()?
            .load
            .as_ref()?
            .output_rows
            .as_ref()?
            .parse()
            .ok()
    }

    fn check_error(&self) -> Result<()> {
        match &self.status.error_result {
            Some(error) => Err(LoadError::JobFailed {
                job_id: self.job_reference.job_id.clone(),
                message: format!("{}: {}", error.reason, error.message),
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Schema da tabela de destino, derivado das colunas do registro
pub fn table_schema() -> Value {
    let fields: Vec<Value> = REVENUE_COLUMNS
        .iter()
        .map(|column| {
            let field_type = match column.column_type {
                ColumnType::String => "STRING",
                ColumnType::Integer => "INTEGER",
                ColumnType::Float => "FLOAT",
                ColumnType::Timestamp => "TIMESTAMP",
            };
            json!({ "name": column.name, "type": field_type, "mode": "NULLABLE" })
        })
        .collect();
    json!({ "fields": fields })
}

/// Carregador para o BigQuery
#[derive(Clone)]
pub struct BigQueryLoader {
    client: reqwest::Client,
    token_provider: Arc<dyn TokenProvider>,
    api_base_url: String,
    location: Option<String>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl BigQueryLoader {
    pub fn new(api_base_url: impl Into<String>, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_provider,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            location: None,
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 300,
        }
    }

    /// Cria o carregador autenticado pela chave de service account configurada
    pub fn from_config(config: &WarehouseConfig) -> Self {
        let client = reqwest::Client::new();
        let token_provider = Arc::new(ServiceAccountTokenProvider::new(
            &config.credentials_path,
            client.clone(),
        ));

        let mut loader = Self::new(&config.api_base_url, token_provider)
            .with_polling(
                Duration::from_millis(config.poll_interval_ms),
                config.max_poll_attempts,
            );
        loader.client = client;
        loader.location = config.location.clone();
        loader
    }

    /// Região do job de carga
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Intervalo e número máximo de consultas ao status do job
    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    fn job_configuration(&self, table: &TableRef) -> Value {
        let mut job_reference = json!({ "projectId": table.project_id });
        if let Some(location) = &self.location {
            job_reference["location"] = json!(location);
        }

        json!({
            "jobReference": job_reference,
            "configuration": {
                "load": {
                    "destinationTable": {
                        "projectId": table.project_id,
                        "datasetId": table.dataset_id,
                        "tableId": table.table_id,
                    },
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "writeDisposition": "WRITE_TRUNCATE",
                    "createDisposition": "CREATE_IF_NEEDED",
                    "schema": table_schema(),
                }
            }
        })
    }

    fn multipart_body(metadata: &Value, rows: &[RevenueRecord]) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = MULTIPART_BOUNDARY,
                m = metadata
            )
            .as_bytes(),
        );
        for row in rows {
            serde_json::to_writer(&mut body, row)?;
            body.push(b'\n');
        }
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
        Ok(body)
    }

    async fn read_job(response: reqwest::Response) -> Result<Job> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoadError::DestinationConnection(format!("{}: {}", status, body)).into());
        }
        response
            .json()
            .await
            .map_err(|e| LoadError::DestinationConnection(e.to_string()).into())
    }

    async fn insert_job(&self, token: &str, table: &TableRef, rows: &[RevenueRecord]) -> Result<Job> {
        let url = format!(
            "{}/upload/bigquery/v2/projects/{}/jobs?uploadType=multipart",
            self.api_base_url, table.project_id
        );
        let body = Self::multipart_body(&self.job_configuration(table), rows)?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| LoadError::DestinationConnection(e.to_string()))?;

        Self::read_job(response).await
    }

    async fn get_job(&self, token: &str, project_id: &str, reference: &JobReference) -> Result<Job> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/jobs/{}",
            self.api_base_url, project_id, reference.job_id
        );
        let mut request = self.client.get(&url).bearer_auth(token);
        if let Some(location) = reference.location.as_ref().or(self.location.as_ref()) {
            request = request.query(&[("location", location)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LoadError::DestinationConnection(e.to_string()))?;
        Self::read_job(response).await
    }
}

impl std::fmt::Debug for BigQueryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryLoader")
            .field("api_base_url", &self.api_base_url)
            .field("location", &self.location)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

#[async_trait]
impl WarehouseLoader for BigQueryLoader {
    async fn replace_table(&self, table: &TableRef, rows: &[RevenueRecord]) -> Result<LoadSummary> {
        let token = self.token_provider.access_token().await?;
        let mut job = self.insert_job(&token, table, rows).await?;
        let job_id = job.job_reference.job_id.clone();

        info!(job_id = %job_id, table = %table, rows = rows.len(), "Job de carga criado");

        let mut attempts = 0;
        while !job.is_done() {
            if attempts >= self.max_poll_attempts {
                return Err(LoadError::JobIncomplete { job_id, attempts }.into());
            }
            attempts += 1;
            tokio::time::sleep(self.poll_interval).await;

            job = self
                .get_job(&token, &table.project_id, &job.job_reference)
                .await?;
            debug!(job_id = %job_id, state = %job.status.state, "Status do job de carga");
        }
        job.check_error()?;

        let rows_loaded = job.output_rows().unwrap_or(rows.len());
        info!(table = %table, rows = rows_loaded, "Data uploaded to BigQuery: {}", table);

        Ok(LoadSummary {
            table: table.clone(),
            rows_loaded,
            job_id: Some(job_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::load::auth::StaticToken;
    use crate::testing::{serve_responses, CannedResponse};
    use crate::types::Transaction;

    fn loader(base_url: &str) -> BigQueryLoader {
        BigQueryLoader::new(base_url, Arc::new(StaticToken("test-token".to_string())))
            .with_location("US")
            .with_polling(Duration::from_millis(1), 3)
    }

    fn rows() -> Vec<RevenueRecord> {
        let transaction = Transaction {
            invoice_no: Some("536365".to_string()),
            stock_code: Some("85123A".to_string()),
            description: "WHITE HANGING HEART T-LIGHT HOLDER".to_string(),
            quantity: 6,
            invoice_date: None,
            unit_price: 2.5,
            customer_id: "17850".to_string(),
            country: Some("United Kingdom".to_string()),
        };
        vec![RevenueRecord {
            total_revenue: transaction.revenue(),
            transaction,
        }]
    }

    fn job(state: &str) -> CannedResponse {
        CannedResponse::json(json!({
            "jobReference": { "projectId": "proj", "jobId": "job_1", "location": "US" },
            "status": { "state": state }
        }))
    }

    #[test]
    fn test_schema_types() {
        let schema = table_schema();
        let fields = schema["fields"].as_array().unwrap();

        assert_eq!(fields.len(), 9);
        assert_eq!(fields[3]["name"], "Quantity");
        assert_eq!(fields[3]["type"], "INTEGER");
        assert_eq!(fields[4]["type"], "TIMESTAMP");
        assert_eq!(fields[8]["name"], "TotalRevenue");
        assert_eq!(fields[8]["type"], "FLOAT");
    }

    #[tokio::test]
    async fn test_replace_table_polls_until_done() {
        let done = CannedResponse::json(json!({
            "jobReference": { "projectId": "proj", "jobId": "job_1", "location": "US" },
            "status": { "state": "DONE" },
            "statistics": { "load": { "outputRows": "1" } }
        }));
        let (base_url, server) = serve_responses(vec![job("PENDING"), job("RUNNING"), done]).await;

        let table = TableRef::new("proj", "ecommerce_data", "sales_report");
        let summary = loader(&base_url).replace_table(&table, &rows()).await.unwrap();

        assert_eq!(summary.rows_loaded, 1);
        assert_eq!(summary.job_id.as_deref(), Some("job_1"));

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 3);

        let insert = &requests[0];
        assert!(insert.starts_with("POST /upload/bigquery/v2/projects/proj/jobs?uploadType=multipart"));
        assert!(insert.to_lowercase().contains("authorization: bearer test-token"));
        assert!(insert.contains("\"writeDisposition\":\"WRITE_TRUNCATE\""));
        assert!(insert.contains("\"tableId\":\"sales_report\""));
        assert!(insert.contains("\"TotalRevenue\":15.0"));

        assert!(requests[1].starts_with("GET /bigquery/v2/projects/proj/jobs/job_1?location=US"));
    }

    #[tokio::test]
    async fn test_job_error_is_reported() {
        let failed = CannedResponse::json(json!({
            "jobReference": { "projectId": "proj", "jobId": "job_1" },
            "status": {
                "state": "DONE",
                "errorResult": { "reason": "invalid", "message": "schema mismatch" }
            }
        }));
        let (base_url, _server) = serve_responses(vec![failed]).await;

        let table = TableRef::new("proj", "ds", "t");
        let err = loader(&base_url).replace_table(&table, &rows()).await.unwrap_err();

        assert!(matches!(
            err,
            EtlError::Load(LoadError::JobFailed { ref message, .. }) if message.contains("schema mismatch")
        ));
    }

    #[tokio::test]
    async fn test_job_that_never_finishes() {
        let (base_url, _server) =
            serve_responses(vec![job("RUNNING"), job("RUNNING"), job("RUNNING"), job("RUNNING")]).await;

        let table = TableRef::new("proj", "ds", "t");
        let err = loader(&base_url).replace_table(&table, &rows()).await.unwrap_err();
        assert!(matches!(
            err,
            EtlError::Load(LoadError::JobIncomplete { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_http_error_is_load_error() {
        let (base_url, _server) =
            serve_responses(vec![CannedResponse::status(403, "Access Denied")]).await;

        let table = TableRef::new("proj", "ds", "t");
        let err = loader(&base_url).replace_table(&table, &rows()).await.unwrap_err();
        assert!(matches!(err, EtlError::Load(LoadError::DestinationConnection(_))));
        assert!(err.to_string().contains("Access Denied"));
    }
}
