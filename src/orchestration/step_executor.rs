//! # Step Executor
//!
//! Interprets a [`Step`] graph against a [`WorkflowContext`].
//!
//! ## Execution Semantics
//!
//! - **Task**: selects its inputs, invokes the handler under a timeout, retries transient
//!   failures with backoff, checks the result kind and merges it into the context
//! - **Sequence**: runs children in order; the first failure ends the sequence
//! - **Parallel**: all branches start on the same context snapshot and always run to
//!   completion. Branch writes stay inside the branch; branch `i`'s result lands in
//!   slot `i`. When several branches fail, the lowest branch index is reported.
//! - **Map**: one body invocation per element, at most `max_concurrency` in flight.
//!   Items never see each other's writes. Results come back in item order and every
//!   failed item is reported, sorted by index.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trafficwise_core::orchestration::{
//!     HandlerRegistry, StepExecutionConfig, StepExecutor, TaskStep, WorkflowContext,
//! };
//!
//! # tokio_test::block_on(async {
//! let executor = StepExecutor::new(Arc::new(HandlerRegistry::new()), StepExecutionConfig::default());
//! let step = TaskStep::new("get_predict_for_timestamp").into();
//! let outcome = executor.execute(&step, WorkflowContext::for_trigger(None)).await;
//! # let _ = outcome;
//! # });
//! ```

use crate::config::EvaluationConfig;
use crate::error::TrafficError;
use crate::logging::log_unit_operation;
use crate::orchestration::context::{ContextValue, WorkflowContext};
use crate::orchestration::errors::{ItemFailure, OrchestrationError, OrchestrationResult};
use crate::orchestration::handler::HandlerRegistry;
use crate::orchestration::retry::{retry_with_backoff, RetryPolicy};
use crate::orchestration::step::{MapStep, OutputPath, ParallelStep, SequenceStep, Step, TaskStep};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Defaults applied to Task steps that do not carry their own
#[derive(Debug, Clone)]
pub struct StepExecutionConfig {
    pub default_timeout: Duration,
    pub default_retry: RetryPolicy,
}

impl Default for StepExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            default_retry: RetryPolicy::default(),
        }
    }
}

impl StepExecutionConfig {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            default_timeout: config.orchestration.unit_timeout(),
            default_retry: config.retry.policy(),
        }
    }
}

/// Context after a step ran, plus the value the step produced
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub context: WorkflowContext,
    pub result: ContextValue,
}

#[derive(Clone)]
pub struct StepExecutor {
    registry: Arc<HandlerRegistry>,
    config: StepExecutionConfig,
}

impl StepExecutor {
    pub fn new(registry: Arc<HandlerRegistry>, config: StepExecutionConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StepExecutionConfig {
        &self.config
    }

    /// Execute `step` on `context`
    pub fn execute<'a>(
        &'a self,
        step: &'a Step,
        context: WorkflowContext,
    ) -> BoxFuture<'a, OrchestrationResult<StepOutcome>> {
        async move {
            match step {
                Step::Task(task) => {
                    AssertUnwindSafe(self.execute_task(task, context))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| {
                            Err(OrchestrationError::UnitPanicked {
                                step: task.name.clone(),
                                reason: panic_message(payload.as_ref()),
                            })
                        })
                }
                Step::Sequence(sequence) => self.execute_sequence(sequence, context).await,
                Step::Parallel(parallel) => self.execute_parallel(parallel, context).await,
                Step::Map(map) => self.execute_map(map, context).await,
            }
        }
        .boxed()
    }

    async fn execute_task(
        &self,
        task: &TaskStep,
        mut context: WorkflowContext,
    ) -> OrchestrationResult<StepOutcome> {
        let handler = self.registry.get(&task.handler).ok_or_else(|| {
            OrchestrationError::Configuration(format!(
                "step '{}' uses unknown handler '{}'",
                task.name, task.handler
            ))
        })?;
        let input = context.select(&task.inputs)?;
        let timeout = task.timeout.unwrap_or(self.config.default_timeout);
        let policy = task.retry.as_ref().unwrap_or(&self.config.default_retry);
        let item = input.item_label();

        debug!(step = %task.name, handler = %task.handler, item = item, "Invoking unit");
        let started = Instant::now();

        let handler_ref = handler.as_ref();
        let input_ref = &input;
        let invocation = retry_with_backoff(policy, &task.name, TrafficError::is_transient, || async move {
            match tokio::time::timeout(timeout, handler_ref.invoke(input_ref)).await {
                Ok(result) => result,
                Err(_) => Err(TrafficError::Timeout(timeout)),
            }
        })
        .await;

        let value = match invocation {
            Ok(value) => value,
            Err(failure) => {
                let details = failure.error.to_string();
                log_unit_operation(
                    &task.handler,
                    &task.name,
                    item,
                    failure.attempts,
                    "failed",
                    Some(&details),
                );
                return Err(OrchestrationError::UnitFailed {
                    step: task.name.clone(),
                    attempts: failure.attempts,
                    source: failure.error,
                });
            }
        };

        if value.kind() != handler.output_kind() {
            return Err(OrchestrationError::Configuration(format!(
                "handler '{}' declares {} results but returned {}",
                task.handler,
                handler.output_kind(),
                value.kind()
            )));
        }

        debug!(
            step = %task.name,
            item = item,
            duration_ms = started.elapsed().as_millis() as u64,
            result_kind = %value.kind(),
            "Unit completed"
        );

        context.apply(&task.output, value.clone())?;
        Ok(StepOutcome {
            context,
            result: value,
        })
    }

    async fn execute_sequence(
        &self,
        sequence: &SequenceStep,
        context: WorkflowContext,
    ) -> OrchestrationResult<StepOutcome> {
        let mut outcome = StepOutcome {
            context,
            result: ContextValue::Unit,
        };
        for step in &sequence.steps {
            outcome = self.execute(step, outcome.context).await?;
        }
        Ok(outcome)
    }

    async fn execute_parallel(
        &self,
        parallel: &ParallelStep,
        mut context: WorkflowContext,
    ) -> OrchestrationResult<StepOutcome> {
        if parallel.branches.len() != parallel.slots.len() {
            return Err(OrchestrationError::Configuration(format!(
                "parallel step '{}' has {} branches but {} result slots",
                parallel.name,
                parallel.branches.len(),
                parallel.slots.len()
            )));
        }

        let outcomes = join_all(
            parallel
                .branches
                .iter()
                .map(|branch| self.execute(branch, context.clone())),
        )
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut first_failure = None;
        for (branch, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(outcome) => results.push(outcome.result),
                Err(error) => {
                    error!(step = %parallel.name, branch = branch, error = %error, "❌ Parallel branch failed");
                    if first_failure.is_none() {
                        first_failure = Some(OrchestrationError::BranchFailed {
                            step: parallel.name.clone(),
                            branch,
                            source: Box::new(error),
                        });
                    }
                }
            }
        }
        if let Some(failure) = first_failure {
            return Err(failure);
        }

        for (slot, value) in parallel.slots.iter().zip(&results) {
            context.apply(slot, value.clone())?;
        }
        Ok(StepOutcome {
            context,
            result: ContextValue::List(results),
        })
    }

    async fn execute_map(&self, map: &MapStep, mut context: WorkflowContext) -> OrchestrationResult<StepOutcome> {
        let items = match context.get(map.items) {
            Some(ContextValue::Ids(ids)) => ids.clone(),
            Some(other) => {
                return Err(OrchestrationError::Configuration(format!(
                    "map step '{}' expects ids in '{}', found {}",
                    map.name,
                    map.items,
                    other.kind()
                )))
            }
            None => {
                return Err(OrchestrationError::Configuration(format!(
                    "map step '{}' iterates over missing field '{}'",
                    map.name, map.items
                )))
            }
        };
        if map.max_concurrency == 0 {
            return Err(OrchestrationError::Configuration(format!(
                "map step '{}' has zero max concurrency",
                map.name
            )));
        }

        info!(
            step = %map.name,
            items = items.len(),
            max_concurrency = map.max_concurrency,
            "🗺️ Map step fanning out"
        );

        let semaphore = Arc::new(Semaphore::new(map.max_concurrency));
        let mut handles = Vec::with_capacity(items.len());
        for item in &items {
            // Holding the permit before spawning bounds in-flight bodies, not just handler calls
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| OrchestrationError::Internal(format!("map semaphore closed: {e}")))?;
            let scoped = context.with_item(ContextValue::Id(item.clone()))?;
            let executor = self.clone();
            let body = Arc::clone(&map.body);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                executor.execute(&body, scoped).await
            }));
        }

        let mut results = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        for (index, (item, handle)) in items.iter().zip(handles).enumerate() {
            match handle.await {
                Ok(Ok(outcome)) => results.push(outcome.result),
                Ok(Err(error)) => failures.push(ItemFailure {
                    index,
                    item: item.clone(),
                    error,
                }),
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        panic_message(join_error.into_panic().as_ref())
                    } else {
                        join_error.to_string()
                    };
                    failures.push(ItemFailure {
                        index,
                        item: item.clone(),
                        error: OrchestrationError::UnitPanicked {
                            step: map.body.name().to_string(),
                            reason,
                        },
                    });
                }
            }
        }

        info!(
            step = %map.name,
            succeeded = results.len(),
            failed = failures.len(),
            "🗺️ Map step completed"
        );

        if !failures.is_empty() {
            return Err(OrchestrationError::MapFailed {
                step: map.name.clone(),
                failures,
            });
        }

        let result = match map.output {
            OutputPath::Field(_) => ContextValue::List(results),
            OutputPath::Discard => ContextValue::Unit,
        };
        context.apply(&map.output, result.clone())?;
        Ok(StepOutcome { context, result })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
