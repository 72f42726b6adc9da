//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are merged in order, later ones
//! winning: built-in defaults, the optional TOML file, `TRAFFICWISE__*` variables.

use super::EvaluationConfig;
use crate::error::{Result, TrafficError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Prefix of environment overrides, e.g. `TRAFFICWISE__ORCHESTRATION__MAX_CONCURRENCY=8`.
pub const ENV_PREFIX: &str = "TRAFFICWISE";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigManager {
    config: EvaluationConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load(config_file: Option<&Path>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_with_env(config_file, &environment)
    }

    /// Load configuration with an explicit environment name
    pub fn load_with_env(config_file: Option<&Path>, environment: &str) -> Result<Arc<ConfigManager>> {
        let defaults = config::Config::try_from(&EvaluationConfig::default())
            .map_err(|e| TrafficError::Configuration(format!("Invalid defaults: {e}")))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(TrafficError::Configuration(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: EvaluationConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .and_then(|merged| merged.try_deserialize::<EvaluationConfig>())
            .map_err(|e| TrafficError::Configuration(e.to_string()))?;

        config.validate()?;

        debug!(
            environment = environment,
            config_file = ?config_file.map(Path::display),
            max_concurrency = config.orchestration.max_concurrency,
            unit_timeout_ms = config.orchestration.unit_timeout_ms,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            source_file: config_file.map(Path::to_path_buf),
        }))
    }

    /// Wrap an already-built configuration, e.g. in tests.
    pub fn from_config(config: EvaluationConfig) -> Result<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_file: None,
        }))
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        std::env::var("TRAFFICWISE_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
