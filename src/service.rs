//! # Evaluation Service
//!
//! Entry point for one evaluation run: wires the store and collaborators into the
//! handler registry, validates the evaluation graph once at construction, and runs it
//! per trigger.

use crate::collaborators::Collaborators;
use crate::config::EvaluationConfig;
use crate::constants::Timestamp;
use crate::handlers::evaluation_registry;
use crate::orchestration::{EvaluationWorkflow, OrchestrationError, OrchestrationResult, RunReport};
use crate::store::KeyedStore;
use std::sync::Arc;
use tracing::info;

pub struct EvaluationService {
    workflow: EvaluationWorkflow,
}

impl EvaluationService {
    /// Fails with a configuration error when the configuration or the graph is invalid
    pub fn new(
        store: Arc<dyn KeyedStore>,
        collaborators: Collaborators,
        config: &EvaluationConfig,
    ) -> OrchestrationResult<Self> {
        config
            .validate()
            .map_err(|e| OrchestrationError::Configuration(e.to_string()))?;

        let registry = evaluation_registry(store, &collaborators, config);
        let workflow = EvaluationWorkflow::new(Arc::new(registry), config)?;

        info!(
            max_concurrency = config.orchestration.max_concurrency,
            unit_timeout_ms = config.orchestration.unit_timeout_ms,
            "🏗️ Evaluation service ready"
        );
        Ok(Self { workflow })
    }

    /// Run one evaluation. `predict_for` overrides the clock.
    pub async fn evaluate(&self, predict_for: Option<Timestamp>) -> RunReport {
        self.workflow.run(predict_for).await
    }

    pub fn workflow(&self) -> &EvaluationWorkflow {
        &self.workflow
    }
}
