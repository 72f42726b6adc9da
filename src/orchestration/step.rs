//! # Step Graph
//!
//! A workflow is data: a tree of [`Step`] variants interpreted by the
//! [`StepExecutor`](crate::orchestration::step_executor::StepExecutor).
//!
//! - [`TaskStep`]: one unit of work, resolved by handler name
//! - [`SequenceStep`]: children strictly in order, context flowing forward
//! - [`ParallelStep`]: fixed branches on one context snapshot, results merged by position
//! - [`MapStep`]: one body invocation per element of a run-time list, bounded concurrency

use crate::orchestration::context::ContextField;
use crate::orchestration::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Where a step's result goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPath {
    Field(ContextField),
    Discard,
}

#[derive(Debug, Clone)]
pub enum Step {
    Task(TaskStep),
    Sequence(SequenceStep),
    Parallel(ParallelStep),
    Map(MapStep),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Step::Task(task) => &task.name,
            Step::Sequence(sequence) => &sequence.name,
            Step::Parallel(parallel) => &parallel.name,
            Step::Map(map) => &map.name,
        }
    }

    pub fn sequence(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Step::Sequence(SequenceStep {
            name: name.into(),
            steps,
        })
    }

    /// Branches paired with the slot each one's result is merged into
    pub fn parallel(name: impl Into<String>, branches: Vec<(Step, OutputPath)>) -> Self {
        let (branches, slots) = branches.into_iter().unzip();
        Step::Parallel(ParallelStep {
            name: name.into(),
            branches,
            slots,
        })
    }

    pub fn map(
        name: impl Into<String>,
        items: ContextField,
        max_concurrency: usize,
        body: Step,
        output: OutputPath,
    ) -> Self {
        Step::Map(MapStep {
            name: name.into(),
            items,
            max_concurrency,
            body: Arc::new(body),
            output,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskStep {
    pub name: String,
    /// Registry name of the handler to invoke
    pub handler: String,
    pub inputs: Vec<ContextField>,
    pub output: OutputPath,
    /// Falls back to the executor default
    pub timeout: Option<Duration>,
    /// Falls back to the executor default
    pub retry: Option<RetryPolicy>,
}

impl TaskStep {
    /// A task named after its handler, without inputs, discarding its output
    pub fn new(handler: impl Into<String>) -> Self {
        let handler = handler.into();
        Self {
            name: handler.clone(),
            handler,
            inputs: Vec::new(),
            output: OutputPath::Discard,
            timeout: None,
            retry: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_inputs(mut self, inputs: &[ContextField]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    pub fn with_output(mut self, field: ContextField) -> Self {
        self.output = OutputPath::Field(field);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}

impl From<TaskStep> for Step {
    fn from(task: TaskStep) -> Self {
        Step::Task(task)
    }
}

#[derive(Debug, Clone)]
pub struct SequenceStep {
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub struct ParallelStep {
    pub name: String,
    pub branches: Vec<Step>,
    /// `slots[i]` receives the result of `branches[i]`
    pub slots: Vec<OutputPath>,
}

#[derive(Debug, Clone)]
pub struct MapStep {
    pub name: String,
    /// List field to fan out over
    pub items: ContextField,
    pub max_concurrency: usize,
    pub body: Arc<Step>,
    /// `Field` collects results in item order, `Discard` keeps only failures
    pub output: OutputPath,
}
