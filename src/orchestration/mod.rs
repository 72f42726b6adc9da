//! # Orchestration Engine
//!
//! A small workflow engine: step graphs are plain data, validated against a handler
//! registry before a run and interpreted by the [`StepExecutor`].
//!
//! ## Core Components
//!
//! - **WorkflowContext**: typed context slots threaded between steps
//! - **Step**: Task / Sequence / Parallel / Map graph nodes
//! - **HandlerRegistry**: named [`UnitHandler`] implementations behind Task steps
//! - **validate_stages**: construction-time check of inputs, outputs and kinds
//! - **StepExecutor**: timeouts, transient retries, bounded fan-out, positional merges
//! - **EvaluationWorkflow**: the six-stage evaluation run and its [`RunReport`]

pub mod context;
pub mod errors;
pub mod handler;
pub mod retry;
pub mod step;
pub mod step_executor;
pub mod validation;
pub mod workflow;

pub use context::{ContextField, ContextValue, UnitInput, ValueKind, WorkflowContext};
pub use errors::*;
pub use handler::{HandlerRegistry, UnitHandler};
pub use retry::{retry_with_backoff, RetryFailure, RetryPolicy};
pub use step::{MapStep, OutputPath, ParallelStep, SequenceStep, Step, TaskStep};
pub use step_executor::{StepExecutionConfig, StepExecutor, StepOutcome};
pub use validation::validate_stages;
pub use workflow::{
    evaluation_stages, EvaluationWorkflow, RunFailure, RunReport, RunStatus, StageReport, StageStatus,
};
