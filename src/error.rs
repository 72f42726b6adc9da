//! Error types for evaluation units.
//!
//! [`TrafficError`] is what a single unit of work (a store call, a collaborator call,
//! an aggregation) reports. The orchestrator wraps it into
//! [`OrchestrationError`](crate::orchestration::OrchestrationError) once the unit's retry
//! budget is spent.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrafficError {
    /// Transport or auth failure talking to the keyed store. Transient.
    #[error("Store unavailable during {operation}: {reason}")]
    StoreUnavailable { operation: String, reason: String },

    /// A required record is missing or malformed. Never retried.
    #[error("Data integrity error for ({pk}, {sk}): {reason}")]
    DataIntegrity { pk: String, sk: String, reason: String },

    /// An external prediction/detection call failed or returned garbage.
    #[error("Collaborator {collaborator} failed: {reason}")]
    Collaborator { collaborator: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unit exceeded its timeout. Treated like any other transient failure.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Bad run input, e.g. a negative evaluation timestamp.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl TrafficError {
    pub fn store_unavailable(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn data_integrity(
        pk: impl Into<String>,
        sk: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DataIntegrity {
            pk: pk.into(),
            sk: sk.into(),
            reason: reason.into(),
        }
    }

    pub fn collaborator(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    /// Whether the orchestrator may retry the unit that produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Timeout(_))
    }

    /// Stable code used in structured logs and run reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::DataIntegrity { .. } => "DATA_INTEGRITY",
            Self::Collaborator { .. } => "COLLABORATOR_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Timeout(_) => "UNIT_TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for TrafficError {
    fn from(error: serde_json::Error) -> Self {
        TrafficError::Validation(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, TrafficError>;
