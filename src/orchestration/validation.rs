//! # Graph Validation
//!
//! Checks a step graph against the handler registry before any unit runs. Validation
//! walks the graph the way the executor will, tracking which context fields are
//! guaranteed to exist at each point.

use crate::orchestration::context::{ContextField, ValueKind};
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::handler::HandlerRegistry;
use crate::orchestration::step::{MapStep, OutputPath, ParallelStep, Step, TaskStep};
use std::collections::{BTreeSet, HashSet};

/// Validate top-level stages that run in order on one shared context
pub fn validate_stages(
    stages: &[Step],
    registry: &HandlerRegistry,
    initial: &[ContextField],
) -> OrchestrationResult<ValueKind> {
    if stages.is_empty() {
        return Err(configuration("workflow has no stages"));
    }

    let mut validator = Validator {
        registry,
        names: HashSet::new(),
    };
    let mut available: BTreeSet<ContextField> = initial.iter().copied().collect();
    let mut kind = ValueKind::Unit;
    for stage in stages {
        kind = validator.step(stage, &mut available)?;
    }
    Ok(kind)
}

fn configuration(message: impl Into<String>) -> OrchestrationError {
    OrchestrationError::Configuration(message.into())
}

struct Validator<'a> {
    registry: &'a HandlerRegistry,
    names: HashSet<String>,
}

impl Validator<'_> {
    /// Returns the kind of value the step produces and records its writes in `available`
    fn step(&mut self, step: &Step, available: &mut BTreeSet<ContextField>) -> OrchestrationResult<ValueKind> {
        if !self.names.insert(step.name().to_string()) {
            return Err(configuration(format!("duplicate step name '{}'", step.name())));
        }

        match step {
            Step::Task(task) => self.task(task, available),
            Step::Sequence(sequence) => {
                if sequence.steps.is_empty() {
                    return Err(configuration(format!("sequence '{}' has no steps", sequence.name)));
                }
                let mut kind = ValueKind::Unit;
                for child in &sequence.steps {
                    kind = self.step(child, available)?;
                }
                Ok(kind)
            }
            Step::Parallel(parallel) => self.parallel(parallel, available),
            Step::Map(map) => self.map(map, available),
        }
    }

    fn task(&mut self, task: &TaskStep, available: &mut BTreeSet<ContextField>) -> OrchestrationResult<ValueKind> {
        let handler = self.registry.get(&task.handler).ok_or_else(|| {
            configuration(format!("step '{}' uses unknown handler '{}'", task.name, task.handler))
        })?;

        if let Some(missing) = task.inputs.iter().find(|field| !available.contains(field)) {
            return Err(configuration(format!(
                "step '{}' reads '{missing}' before any step writes it",
                task.name
            )));
        }
        if let Some(missing) = handler
            .required_inputs()
            .iter()
            .find(|field| !task.inputs.contains(field))
        {
            return Err(configuration(format!(
                "step '{}' does not select '{missing}' required by handler '{}'",
                task.name, task.handler
            )));
        }

        let kind = handler.output_kind();
        self.output(&task.name, &task.output, kind, available)?;
        Ok(kind)
    }

    fn parallel(
        &mut self,
        parallel: &ParallelStep,
        available: &mut BTreeSet<ContextField>,
    ) -> OrchestrationResult<ValueKind> {
        if parallel.branches.is_empty() {
            return Err(configuration(format!("parallel step '{}' has no branches", parallel.name)));
        }
        if parallel.branches.len() != parallel.slots.len() {
            return Err(configuration(format!(
                "parallel step '{}' has {} branches but {} result slots",
                parallel.name,
                parallel.branches.len(),
                parallel.slots.len()
            )));
        }

        // Every branch sees the same snapshot; only slot writes survive the step
        let mut kinds = Vec::with_capacity(parallel.branches.len());
        for branch in &parallel.branches {
            let mut scoped = available.clone();
            kinds.push(self.step(branch, &mut scoped)?);
        }
        for (slot, kind) in parallel.slots.iter().zip(kinds) {
            self.output(&parallel.name, slot, kind, available)?;
        }
        Ok(ValueKind::List)
    }

    fn map(&mut self, map: &MapStep, available: &mut BTreeSet<ContextField>) -> OrchestrationResult<ValueKind> {
        if map.max_concurrency == 0 {
            return Err(configuration(format!("map step '{}' has zero max concurrency", map.name)));
        }
        if map.items.kind() != ValueKind::Ids {
            return Err(configuration(format!(
                "map step '{}' iterates over '{}', which is not a list of ids",
                map.name, map.items
            )));
        }
        if !available.contains(&map.items) {
            return Err(configuration(format!(
                "map step '{}' iterates over '{}' before any step writes it",
                map.name, map.items
            )));
        }

        let mut scoped = available.clone();
        scoped.insert(ContextField::Item);
        self.step(&map.body, &mut scoped)?;

        let kind = match map.output {
            OutputPath::Field(_) => ValueKind::List,
            OutputPath::Discard => ValueKind::Unit,
        };
        self.output(&map.name, &map.output, kind, available)?;
        Ok(kind)
    }

    fn output(
        &self,
        step: &str,
        output: &OutputPath,
        kind: ValueKind,
        available: &mut BTreeSet<ContextField>,
    ) -> OrchestrationResult<()> {
        let OutputPath::Field(field) = output else {
            return Ok(());
        };
        if field.is_reserved() {
            return Err(configuration(format!("step '{step}' writes reserved field '{field}'")));
        }
        if field.kind() != kind {
            return Err(configuration(format!(
                "step '{step}' produces {kind} but '{field}' holds {}",
                field.kind()
            )));
        }
        available.insert(*field);
        Ok(())
    }
}
