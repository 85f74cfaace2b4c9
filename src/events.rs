//! Sistema de eventos para observabilidade do pipeline

use async_trait::async_trait;
use crate::error::Result;
use crate::traits::EventEmitter;
use crate::types::PipelineEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// Implementação simples de EventEmitter que logga eventos
#[derive(Debug, Clone, Default)]
pub struct LoggingEventEmitter;

impl LoggingEventEmitter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventEmitter for LoggingEventEmitter {
    async fn emit(&self, event: PipelineEvent) -> Result<()> {
        match event {
            PipelineEvent::Started { pipeline_id, timestamp } => {
                info!(
                    pipeline_id = %pipeline_id,
                    timestamp = ?timestamp,
                    "Pipeline iniciado"
                );
            }
            PipelineEvent::StateChanged {
                pipeline_id,
                old_state,
                new_state,
                timestamp,
            } => {
                info!(
                    pipeline_id = %pipeline_id,
                    old_state = %old_state,
                    new_state = %new_state,
                    timestamp = ?timestamp,
                    "Estado do pipeline alterado"
                );
            }
            PipelineEvent::StageCompleted {
                pipeline_id,
                stage,
                rows,
                timestamp,
            } => {
                info!(
                    pipeline_id = %pipeline_id,
                    stage = %stage,
                    rows = rows,
                    timestamp = ?timestamp,
                    "Etapa concluída"
                );
            }
            PipelineEvent::Error { pipeline_id, error, timestamp } => {
                error!(
                    pipeline_id = %pipeline_id,
                    error = %error,
                    timestamp = ?timestamp,
                    "Erro no pipeline"
                );
            }
            PipelineEvent::Completed {
                pipeline_id,
                rows_cleaned,
                load_succeeded,
                execution_time_ms,
                timestamp,
            } => {
                info!(
                    pipeline_id = %pipeline_id,
                    rows_cleaned = rows_cleaned,
                    load_succeeded = load_succeeded,
                    execution_time_ms = execution_time_ms,
                    timestamp = ?timestamp,
                    "Pipeline concluído"
                );
            }
        }

        Ok(())
    }
}

/// EventEmitter que armazena eventos em memória para testes
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventEmitter {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl InMemoryEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retorna todos os eventos capturados
    pub fn get_events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Limpa todos os eventos armazenados
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Retorna o número de eventos capturados
    pub fn event_count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl EventEmitter for InMemoryEventEmitter {
    async fn emit(&self, event: PipelineEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineState;
    use std::time::SystemTime;

    #[tokio::test]
    async fn test_logging_event_emitter() {
        let emitter = LoggingEventEmitter::new();

        let event = PipelineEvent::StageCompleted {
            pipeline_id: "test-pipeline".to_string(),
            stage: PipelineState::Cleaning,
            rows: 42,
            timestamp: SystemTime::now(),
        };

        assert!(emitter.emit(event).await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_event_emitter() {
        let emitter = InMemoryEventEmitter::new();
        assert_eq!(emitter.event_count(), 0);

        emitter
            .emit(PipelineEvent::Started {
                pipeline_id: "test-pipeline".to_string(),
                timestamp: SystemTime::now(),
            })
            .await
            .unwrap();
        emitter
            .emit(PipelineEvent::StateChanged {
                pipeline_id: "test-pipeline".to_string(),
                old_state: PipelineState::Idle,
                new_state: PipelineState::Extracting,
                timestamp: SystemTime::now(),
            })
            .await
            .unwrap();

        assert_eq!(emitter.event_count(), 2);
        assert!(matches!(
            emitter.get_events()[1],
            PipelineEvent::StateChanged { new_state: PipelineState::Extracting, .. }
        ));

        emitter.clear();
        assert_eq!(emitter.event_count(), 0);
    }
}
