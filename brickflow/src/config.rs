//! Engine configuration.
//!
//! Loaded from JSON or from `BRICKFLOW_*` environment variables; anything not
//! set keeps its default.

use crate::errors::BrickflowError;
use crate::expression::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Default maximum number of nested pipeline runs.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "BRICKFLOW_LOG";

const ENV_PREFIX: &str = "BRICKFLOW_";

/// Settings shared by every run of a [`PipelineEngine`](crate::pipeline::PipelineEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of sub-pipeline runs before a run is rejected.
    pub max_depth: usize,
    /// HTML-escape template output.
    pub autoescape: bool,
    /// Validate rendered arguments against brick input schemas.
    pub validate_inputs: bool,
    /// Retry limit used when a Retry step omits `maxRetries`. `None` retries
    /// until the body succeeds.
    pub default_max_retries: Option<usize>,
    /// `tracing` filter directive used when `BRICKFLOW_LOG` is unset.
    pub log_filter: String,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            autoescape: true,
            validate_inputs: true,
            default_max_retries: None,
            log_filter: "info".to_string(),
            json_logs: false,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, BrickflowError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| BrickflowError::Configuration(format!("{key}={raw:?}: {e}")))
}

fn parse_env_bool(key: &str, raw: &str) -> Result<bool, BrickflowError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BrickflowError::Configuration(format!(
            "{key}={raw:?}: expected a boolean"
        ))),
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, BrickflowError> {
        serde_json::from_str(json)
            .map_err(|e| BrickflowError::Configuration(format!("invalid engine config: {e}")))
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BrickflowError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Builds a config from the process environment.
    pub fn from_env() -> Result<Self, BrickflowError> {
        Self::from_env_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// Recognized variables: `BRICKFLOW_MAX_DEPTH`, `BRICKFLOW_AUTOESCAPE`,
    /// `BRICKFLOW_VALIDATE_INPUTS`, `BRICKFLOW_DEFAULT_MAX_RETRIES`,
    /// `BRICKFLOW_LOG` and `BRICKFLOW_JSON_LOGS`.
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self, BrickflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        let mut config = Self::default();
        if let Some((key, raw)) = var("MAX_DEPTH") {
            config.max_depth = parse_env(&key, &raw)?;
        }
        if let Some((key, raw)) = var("AUTOESCAPE") {
            config.autoescape = parse_env_bool(&key, &raw)?;
        }
        if let Some((key, raw)) = var("VALIDATE_INPUTS") {
            config.validate_inputs = parse_env_bool(&key, &raw)?;
        }
        if let Some((key, raw)) = var("DEFAULT_MAX_RETRIES") {
            config.default_max_retries = match raw.trim() {
                "" | "unbounded" => None,
                _ => Some(parse_env(&key, &raw)?),
            };
        }
        if let Some(filter) = lookup(LOG_ENV_VAR) {
            config.log_filter = filter;
        }
        if let Some((key, raw)) = var("JSON_LOGS") {
            config.json_logs = parse_env_bool(&key, &raw)?;
        }
        Ok(config)
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets template autoescaping.
    #[must_use]
    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    /// Enables or disables schema validation.
    #[must_use]
    pub fn with_validate_inputs(mut self, validate_inputs: bool) -> Self {
        self.validate_inputs = validate_inputs;
        self
    }

    /// Sets the retry limit used when a Retry step omits one.
    #[must_use]
    pub fn with_default_max_retries(mut self, max_retries: Option<usize>) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    /// Sets the fallback log filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Enables JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json_logs: bool) -> Self {
        self.json_logs = json_logs;
        self
    }

    /// Returns the render options implied by this config.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::default().with_autoescape(self.autoescape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 10);
        assert!(config.autoescape);
        assert!(config.validate_inputs);
        assert_eq!(config.default_max_retries, None);
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json_str(r#"{"max_depth": 3, "default_max_retries": 5}"#).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.default_max_retries, Some(5));
        assert!(config.autoescape);

        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(BrickflowError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"autoescape": false, "json_logs": true}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(!config.autoescape);
        assert!(config.json_logs);
        assert!(!config.render_options().autoescape);

        assert!(matches!(
            EngineConfig::from_file("/definitely/not/here.json"),
            Err(BrickflowError::Io(_))
        ));
    }

    #[test]
    fn test_from_env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("BRICKFLOW_MAX_DEPTH", "4"),
            ("BRICKFLOW_AUTOESCAPE", "off"),
            ("BRICKFLOW_DEFAULT_MAX_RETRIES", "2"),
            ("BRICKFLOW_LOG", "brickflow=debug"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::from_env_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(config.max_depth, 4);
        assert!(!config.autoescape);
        assert_eq!(config.default_max_retries, Some(2));
        assert_eq!(config.log_filter, "brickflow=debug");
        assert!(config.validate_inputs);
    }

    #[test]
    fn test_from_env_lookup_rejects_garbage() {
        let err = EngineConfig::from_env_lookup(|k| {
            (k == "BRICKFLOW_VALIDATE_INPUTS").then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("BRICKFLOW_VALIDATE_INPUTS"));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_max_depth(2)
            .with_validate_inputs(false)
            .with_default_max_retries(Some(1))
            .with_log_filter("warn")
            .with_json_logs(true)
            .with_autoescape(false);
        assert_eq!(config.max_depth, 2);
        assert!(!config.validate_inputs);
        assert_eq!(config.default_max_retries, Some(1));
        assert_eq!(config.log_filter, "warn");
        assert!(config.json_logs);
        assert!(!config.autoescape);
    }
}
