//! # Evaluation Configuration
//!
//! Layered configuration for the evaluation engine: built-in defaults, an optional TOML
//! file, then `TRAFFICWISE__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trafficwise_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load(None)?;
//! let concurrency = manager.config().orchestration.max_concurrency;
//! # let _ = concurrency;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::defaults;
use crate::error::{Result, TrafficError};
use crate::orchestration::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub orchestration: OrchestrationConfig,
    /// Budget for transient unit failures (store outages, timeouts)
    pub retry: RetryConfig,
    /// Budget for collaborator calls, applied inside the calling handler
    pub collaborator_retry: RetryConfig,
    pub retrieval: RetrievalConfig,
    pub aggregation: AggregationConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// In-flight bound for every Map step of the evaluation workflow
    pub max_concurrency: usize,
    /// Timeout applied to each Task invocation
    pub unit_timeout_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: defaults::MAP_MAX_CONCURRENCY,
            unit_timeout_ms: 30_000,
        }
    }
}

impl OrchestrationConfig {
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Images older than `predictFor - image_max_age_seconds` are ignored
    pub image_max_age_seconds: i64,
    /// Measurements older than `predictFor - measurement_max_age_seconds` are ignored
    pub measurement_max_age_seconds: i64,
    pub batch_get_max_keys: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            image_max_age_seconds: defaults::IMAGE_MAX_AGE_SECONDS,
            measurement_max_age_seconds: defaults::MEASUREMENT_MAX_AGE_SECONDS,
            batch_get_max_keys: defaults::BATCH_GET_MAX_KEYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub top_n: usize,
    pub min_emergency_vehicles: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            top_n: defaults::TRAFFIC_LOAD_TOP_N,
            min_emergency_vehicles: defaults::MIN_NUM_EMERGENCY_VEHICLES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Records per page returned by the in-process store engine
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::STORE_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EvaluationConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.orchestration.max_concurrency == 0 {
            return Err(TrafficError::Configuration(
                "orchestration.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.orchestration.unit_timeout_ms == 0 {
            return Err(TrafficError::Configuration(
                "orchestration.unit_timeout_ms must be positive".to_string(),
            ));
        }
        for (name, retry) in [
            ("retry", &self.retry),
            ("collaborator_retry", &self.collaborator_retry),
        ] {
            if retry.max_attempts == 0 {
                return Err(TrafficError::Configuration(format!(
                    "{name}.max_attempts must be at least 1"
                )));
            }
            if retry.backoff_multiplier < 1.0 {
                return Err(TrafficError::Configuration(format!(
                    "{name}.backoff_multiplier must be >= 1.0"
                )));
            }
        }
        if self.retrieval.image_max_age_seconds < 0 || self.retrieval.measurement_max_age_seconds < 0
        {
            return Err(TrafficError::Configuration(
                "retrieval max ages must not be negative".to_string(),
            ));
        }
        if self.retrieval.batch_get_max_keys == 0 {
            return Err(TrafficError::Configuration(
                "retrieval.batch_get_max_keys must be at least 1".to_string(),
            ));
        }
        if self.aggregation.top_n == 0 {
            return Err(TrafficError::Configuration(
                "aggregation.top_n must be at least 1".to_string(),
            ));
        }
        if self.store.page_size == 0 {
            return Err(TrafficError::Configuration(
                "store.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
