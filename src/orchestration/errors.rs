//! Step-level error types.
//!
//! Errors nest the way steps nest: a failed unit inside a Map item inside a Parallel
//! branch inside a stage reads as `StageFailed -> BranchFailed -> MapFailed ->
//! UnitFailed`, so a run report can name both the stage and the items that failed.

use crate::error::TrafficError;
use serde::Serialize;
use thiserror::Error;

pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    /// Malformed step graph or context contract. Fatal at construction time.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),

    #[error("Unit '{step}' failed after {attempts} attempt(s): {source}")]
    UnitFailed {
        step: String,
        attempts: u32,
        source: TrafficError,
    },

    #[error("Branch {branch} of parallel step '{step}' failed: {source}")]
    BranchFailed {
        step: String,
        branch: usize,
        source: Box<OrchestrationError>,
    },

    #[error(
        "Map step '{step}' failed for {count} item(s): {items}",
        count = .failures.len(),
        items = summarize_items(.failures)
    )]
    MapFailed {
        step: String,
        failures: Vec<ItemFailure>,
    },

    #[error("Stage {index} '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        index: usize,
        source: Box<OrchestrationError>,
    },

    #[error("Unit '{step}' panicked: {reason}")]
    UnitPanicked { step: String, reason: String },

    #[error("Internal orchestration error: {0}")]
    Internal(String),
}

/// One failed element of a Map step
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub index: usize,
    pub item: String,
    pub error: OrchestrationError,
}

/// Flattened view of a failed item for reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub step: String,
    pub index: usize,
    pub item: String,
    pub error_code: Option<String>,
    pub message: String,
}

fn summarize_items(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("#{} '{}'", failure.index, failure.item))
        .collect::<Vec<_>>()
        .join(", ")
}

impl OrchestrationError {
    /// Every failed Map item anywhere below this error, outermost first
    pub fn failed_items(&self) -> Vec<FailedItem> {
        let mut items = Vec::new();
        self.collect_failed_items(&mut items);
        items
    }

    fn collect_failed_items(&self, items: &mut Vec<FailedItem>) {
        match self {
            OrchestrationError::MapFailed { step, failures } => {
                for failure in failures {
                    items.push(FailedItem {
                        step: step.clone(),
                        index: failure.index,
                        item: failure.item.clone(),
                        error_code: failure.error.root_cause().map(|e| e.error_code().to_string()),
                        message: failure.error.to_string(),
                    });
                    failure.error.collect_failed_items(items);
                }
            }
            OrchestrationError::BranchFailed { source, .. }
            | OrchestrationError::StageFailed { source, .. } => source.collect_failed_items(items),
            _ => {}
        }
    }

    /// The first unit-level error below this one, following branch order and item order
    pub fn root_cause(&self) -> Option<&TrafficError> {
        match self {
            OrchestrationError::UnitFailed { source, .. } => Some(source),
            OrchestrationError::BranchFailed { source, .. }
            | OrchestrationError::StageFailed { source, .. } => source.root_cause(),
            OrchestrationError::MapFailed { failures, .. } => {
                failures.first().and_then(|failure| failure.error.root_cause())
            }
            _ => None,
        }
    }
}
