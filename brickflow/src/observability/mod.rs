//! Logging and timing.

mod logger;
mod timer;

pub use logger::BrickLogger;
pub use timer::StepTimer;

use crate::config::{EngineConfig, LOG_ENV_VAR};
use crate::errors::BrickflowError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `BRICKFLOW_LOG` if set, else from
/// [`EngineConfig::log_filter`]. Fails if a global subscriber is already
/// installed.
pub fn init_tracing(config: &EngineConfig) -> Result<(), BrickflowError> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| BrickflowError::Configuration(format!("invalid log filter: {e}")))?;

    let json = config.json_logs.then(|| tracing_subscriber::fmt::layer().json());
    let text = (!config.json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| BrickflowError::Configuration(format!("failed to install subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_fails() {
        let config = EngineConfig::default().with_log_filter("warn");
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(BrickflowError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_filter() {
        if std::env::var(LOG_ENV_VAR).is_ok() {
            return;
        }
        let config = EngineConfig::default().with_log_filter("brickflow=loud");
        assert!(matches!(
            init_tracing(&config),
            Err(BrickflowError::Configuration(_))
        ));
    }
}
