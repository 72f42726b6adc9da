#![allow(dead_code)] // Each test binary uses a different subset of the helpers

pub mod builders;
pub mod flaky_store;
pub mod recording;
pub mod strategies;

pub use builders::*;
pub use flaky_store::*;
pub use recording::*;

use trafficwise_core::config::EvaluationConfig;

/// Defaults with millisecond backoff so retry paths stay fast under test
pub fn fast_config() -> EvaluationConfig {
    let mut config = EvaluationConfig::default();
    for retry in [&mut config.retry, &mut config.collaborator_retry] {
        retry.base_delay_ms = 1;
        retry.max_delay_ms = 5;
        retry.jitter = false;
    }
    config.orchestration.unit_timeout_ms = 2_000;
    config
}
