//! Inicialização do subscriber de `tracing`.

use crate::config::{LogFormat, ObservabilityConfig};
use tracing_subscriber::EnvFilter;

/// Instala o subscriber global conforme a configuração de observabilidade.
///
/// `RUST_LOG`, quando definido, tem precedência sobre `log_level`. Chamadas
/// repetidas são ignoradas.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if result.is_err() {
        tracing::debug!("Subscriber de log já inicializado");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let config = ObservabilityConfig {
            log_level: "warn".to_string(),
            log_format: LogFormat::Compact,
        };
        init(&config);
        init(&config);
    }
}
