//! # Pipeline
//!
//! Orquestra as etapas em sequência: extração, inspeção, limpeza, snapshot
//! do dataset limpo no bucket, transformação e carga no warehouse.
//!
//! Qualquer falha até a transformação interrompe a execução. A falha da carga
//! é registrada em log e no relatório, e a execução termina com sucesso.

use crate::config::EtlConfig;
use crate::error::{ConfigError, EtlError, Result};
use crate::events::LoggingEventEmitter;
use crate::extract::{EncodingPolicy, TransactionExtractor};
use crate::inspect::{InspectionReport, Inspector};
use crate::load::{self, BigQueryLoader};
use crate::storage::StorageGateway;
use crate::traits::{EventEmitter, Extractor, Transformer, WarehouseLoader};
use crate::transform::{Cleaner, CleaningStats, RevenueTransform, SalesReport};
use crate::types::{LoadOutcome, PipelineEvent, PipelineState};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

/// Resultado de uma execução do pipeline
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pipeline_id: String,
    pub inspection: InspectionReport,
    pub cleaning: CleaningStats,
    pub sales: SalesReport,
    pub load: LoadOutcome,
    pub execution_time_ms: u64,
}

impl PipelineReport {
    /// Linhas gravadas no warehouse, se a carga foi concluída
    pub fn rows_loaded(&self) -> Option<usize> {
        match &self.load {
            LoadOutcome::Loaded(summary) => Some(summary.rows_loaded),
            LoadOutcome::Failed { .. } => None,
        }
    }
}

/// Pipeline ETL do dataset de e-commerce
pub struct Pipeline<E, L> {
    extractor: E,
    loader: L,
    storage: StorageGateway,
    config: EtlConfig,
    state: Arc<Mutex<PipelineState>>,
    event_emitter: Arc<dyn EventEmitter>,
    pipeline_id: String,
}

impl Pipeline<(), ()> {
    /// Cria um novo builder de pipeline
    pub fn builder() -> PipelineBuilder<(), ()> {
        PipelineBuilder::new()
    }

    /// Cria um builder com configuração personalizada
    pub fn with_config(config: EtlConfig) -> PipelineBuilder<(), ()> {
        PipelineBuilder::new().config(config)
    }
}

impl<E, L> Pipeline<E, L>
where
    E: Extractor,
    L: WarehouseLoader,
{
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Retorna o estado atual do pipeline
    pub fn current_state(&self) -> PipelineState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Altera o estado do pipeline e emite evento
    async fn set_state(&self, new_state: PipelineState) -> Result<()> {
        let old_state = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, new_state.clone())
        };

        self.event_emitter
            .emit(PipelineEvent::StateChanged {
                pipeline_id: self.pipeline_id.clone(),
                old_state,
                new_state,
                timestamp: SystemTime::now(),
            })
            .await
    }

    async fn stage_completed(&self, stage: PipelineState, rows: usize) -> Result<()> {
        self.event_emitter
            .emit(PipelineEvent::StageCompleted {
                pipeline_id: self.pipeline_id.clone(),
                stage,
                rows,
                timestamp: SystemTime::now(),
            })
            .await
    }

    async fn emit_error(&self, message: String) {
        let event = PipelineEvent::Error {
            pipeline_id: self.pipeline_id.clone(),
            error: message,
            timestamp: SystemTime::now(),
        };
        if let Err(e) = self.event_emitter.emit(event).await {
            warn!(error = %e, "Falha ao emitir evento de erro");
        }
    }

    /// Marca o pipeline como falho e devolve o erro original
    async fn abort(&self, stage: &str, err: EtlError) -> EtlError {
        let message = format!("Erro na {}: {}", stage, err);
        error!(code = err.error_code(), "{}", message);

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = PipelineState::Failed(message.clone());
        }
        self.emit_error(message).await;
        err
    }

    /// Executa todas as etapas do pipeline
    pub async fn execute(&self) -> Result<PipelineReport> {
        let start_time = Instant::now();

        self.event_emitter
            .emit(PipelineEvent::Started {
                pipeline_id: self.pipeline_id.clone(),
                timestamp: SystemTime::now(),
            })
            .await?;

        // Extração
        self.set_state(PipelineState::Extracting).await?;
        info!("Extracting data...");
        let raw = match self.extractor.extract().await {
            Ok(rows) => rows,
            Err(e) => return Err(self.abort("extração", e).await),
        };
        self.stage_completed(PipelineState::Extracting, raw.len()).await?;

        // Inspeção
        self.set_state(PipelineState::Inspecting).await?;
        info!("Inspecting data...");
        let inspection = Inspector::new(self.config.inspection.preview_rows).inspect(&raw);
        self.stage_completed(PipelineState::Inspecting, inspection.row_count)
            .await?;

        // Limpeza
        self.set_state(PipelineState::Cleaning).await?;
        info!("Cleaning data...");
        let cleaner = Cleaner::new(self.config.cleaning.row_error_policy);
        let cleaned = match cleaner.transform(raw).await {
            Ok(cleaned) => cleaned,
            Err(e) => return Err(self.abort("limpeza", e).await),
        };
        self.stage_completed(PipelineState::Cleaning, cleaned.rows.len())
            .await?;

        // Snapshot dos dados limpos
        self.set_state(PipelineState::Persisting).await?;
        if let Err(e) = self.persist_cleaned(&cleaned.rows).await {
            return Err(self.abort("gravação dos dados limpos", e).await);
        }
        self.stage_completed(PipelineState::Persisting, cleaned.rows.len())
            .await?;

        // Transformação
        self.set_state(PipelineState::Transforming).await?;
        info!("Transforming data...");
        let transformed = match RevenueTransform::new().transform(cleaned.rows).await {
            Ok(transformed) => transformed,
            Err(e) => return Err(self.abort("transformação", e).await),
        };
        self.stage_completed(PipelineState::Transforming, transformed.rows.len())
            .await?;

        // Carga: a falha é registrada, não propagada
        self.set_state(PipelineState::Loading).await?;
        let table = self.config.warehouse.table_ref();
        let load = match self.loader.replace_table(&table, &transformed.rows).await {
            Ok(summary) => {
                self.stage_completed(PipelineState::Loading, summary.rows_loaded)
                    .await?;
                LoadOutcome::Loaded(summary)
            }
            Err(e) => {
                let message = e.to_string();
                error!(table = %table, "Error loading data into BigQuery: {}", message);
                self.emit_error(format!("Erro na carga: {}", message)).await;
                LoadOutcome::Failed { message }
            }
        };

        self.set_state(PipelineState::Completed).await?;

        let report = PipelineReport {
            pipeline_id: self.pipeline_id.clone(),
            inspection,
            cleaning: cleaned.stats,
            sales: transformed.report,
            load,
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        };

        self.event_emitter
            .emit(PipelineEvent::Completed {
                pipeline_id: self.pipeline_id.clone(),
                rows_cleaned: report.cleaning.output_rows,
                load_succeeded: report.load.is_loaded(),
                execution_time_ms: report.execution_time_ms,
                timestamp: SystemTime::now(),
            })
            .await?;

        info!(
            rows = report.cleaning.output_rows,
            execution_time_ms = report.execution_time_ms,
            "Pipeline executado"
        );

        Ok(report)
    }

    /// Grava o CSV limpo no caminho local e o envia para o bucket
    async fn persist_cleaned(&self, rows: &[crate::types::Transaction]) -> Result<()> {
        let storage = &self.config.storage;
        load::csv::write_csv(&storage.cleaned_local_path, rows).await?;
        self.storage
            .put(&storage.bucket, &storage.cleaned_local_path, &storage.cleaned_key)
            .await
    }
}

/// Builder para criação de pipelines
pub struct PipelineBuilder<E, L> {
    extractor: E,
    loader: L,
    storage: Option<StorageGateway>,
    config: EtlConfig,
    event_emitter: Option<Arc<dyn EventEmitter>>,
}

impl PipelineBuilder<(), ()> {
    pub fn new() -> Self {
        Self {
            extractor: (),
            loader: (),
            storage: None,
            config: EtlConfig::default(),
            event_emitter: None,
        }
    }
}

impl Default for PipelineBuilder<(), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> PipelineBuilder<E, L> {
    /// Define o extrator
    pub fn extract<NewE: Extractor>(self, extractor: NewE) -> PipelineBuilder<NewE, L> {
        PipelineBuilder {
            extractor,
            loader: self.loader,
            storage: self.storage,
            config: self.config,
            event_emitter: self.event_emitter,
        }
    }

    /// Define o carregador do warehouse
    pub fn load<NewL: WarehouseLoader>(self, loader: NewL) -> PipelineBuilder<E, NewL> {
        PipelineBuilder {
            extractor: self.extractor,
            loader,
            storage: self.storage,
            config: self.config,
            event_emitter: self.event_emitter,
        }
    }

    /// Define o gateway usado para o snapshot dos dados limpos
    pub fn storage(mut self, storage: StorageGateway) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn config(mut self, config: EtlConfig) -> Self {
        self.config = config;
        self
    }

    /// Define o event emitter
    pub fn event_emitter<T: EventEmitter + 'static>(mut self, emitter: T) -> Self {
        self.event_emitter = Some(Arc::new(emitter));
        self
    }
}

impl<E, L> PipelineBuilder<E, L>
where
    E: Extractor,
    L: WarehouseLoader,
{
    /// Constrói o pipeline; o gateway de armazenamento é obrigatório
    pub fn build(self) -> Result<Pipeline<E, L>> {
        let storage = self
            .storage
            .ok_or_else(|| ConfigError::MissingRequiredParameter("storage".to_string()))?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Ok(Pipeline {
            extractor: self.extractor,
            loader: self.loader,
            storage,
            config: self.config,
            state: Arc::new(Mutex::new(PipelineState::default())),
            event_emitter: self
                .event_emitter
                .unwrap_or_else(|| Arc::new(LoggingEventEmitter::new())),
            pipeline_id: format!("pipeline-{}-{}", std::process::id(), millis),
        })
    }
}

/// Valida a configuração, monta o pipeline completo e o executa
pub async fn run(config: EtlConfig) -> Result<PipelineReport> {
    config.validate()?;

    let gateway = StorageGateway::from_config(&config.storage).await?;
    let source = crate::extract::source::from_config(&config.source, &config.storage, &gateway)?;

    let mut extractor = TransactionExtractor::from_source(source)
        .with_encoding(EncodingPolicy::new(
            config.source.primary_encoding,
            config.source.fallback_encoding,
        ))
        .with_row_error_policy(config.cleaning.row_error_policy);
    if let Some(entry) = &config.source.csv_entry {
        extractor = extractor.with_csv_entry(entry);
    }

    let loader = BigQueryLoader::from_config(&config.warehouse);

    Pipeline::with_config(config)
        .extract(extractor)
        .load(loader)
        .storage(gateway)
        .build()?
        .execute()
        .await
}
