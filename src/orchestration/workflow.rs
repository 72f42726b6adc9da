//! # Evaluation Workflow
//!
//! The periodic evaluation as a step graph, and the runner that executes its six
//! top-level stages in order:
//!
//! 0. determine `predictFor`
//! 1. per camera: images, car counts + prediction, emergency count, persisted counts;
//!    in parallel, per station: air-quality prediction
//! 2. list streets
//! 3. per street: limit check
//! 4. list sections
//! 5. per section: display info
//!
//! A stage only starts after the previous one finished, so every street check sees every
//! count and prediction written for the same `predictFor`.

use crate::config::{EvaluationConfig, OrchestrationConfig};
use crate::constants::{handlers, Timestamp};
use crate::logging::log_stage_operation;
use crate::orchestration::context::{ContextField, ContextValue, WorkflowContext};
use crate::orchestration::errors::{FailedItem, OrchestrationError, OrchestrationResult};
use crate::orchestration::handler::HandlerRegistry;
use crate::orchestration::step::{OutputPath, Step, TaskStep};
use crate::orchestration::step_executor::{StepExecutionConfig, StepExecutor};
use crate::orchestration::validation::validate_stages;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Top-level stages of one evaluation run
pub fn evaluation_stages(config: &OrchestrationConfig) -> Vec<Step> {
    use ContextField::*;

    let concurrency = config.max_concurrency;

    let count_vehicles = Step::parallel(
        "count_vehicles",
        vec![
            (
                Step::sequence(
                    "count_and_predict_cars",
                    vec![
                        TaskStep::new(handlers::COUNT_CARS)
                            .with_inputs(&[Images])
                            .with_output(CarCounts)
                            .into(),
                        TaskStep::new(handlers::PREDICT_CAR_COUNT)
                            .with_inputs(&[CarCounts, PredictFor])
                            .into(),
                    ],
                ),
                OutputPath::Field(CarCountPrediction),
            ),
            (
                TaskStep::new(handlers::COUNT_EMERGENCY_VEHICLES)
                    .with_inputs(&[Images])
                    .into(),
                OutputPath::Field(EmergencyVehicleCount),
            ),
        ],
    );

    let process_camera = Step::sequence(
        "process_camera",
        vec![
            TaskStep::new(handlers::GET_IMAGES)
                .with_inputs(&[Item, PredictFor])
                .with_output(Images)
                .into(),
            count_vehicles,
            TaskStep::new(handlers::UPDATE_VEHICLES_COUNT)
                .with_inputs(&[Item, PredictFor, CarCountPrediction, EmergencyVehicleCount])
                .into(),
        ],
    );

    let cameras = Step::sequence(
        "cameras",
        vec![
            TaskStep::new(handlers::GET_CAMERA_LIST).with_output(CameraIds).into(),
            Step::map(
                "process_cameras",
                CameraIds,
                concurrency,
                process_camera,
                OutputPath::Field(CameraResults),
            ),
        ],
    );

    let stations = Step::sequence(
        "stations",
        vec![
            TaskStep::new(handlers::GET_STATION_LIST).with_output(StationIds).into(),
            Step::map(
                "process_stations",
                StationIds,
                concurrency,
                TaskStep::new(handlers::PREDICT_AIR_QUALITY)
                    .with_inputs(&[Item, PredictFor])
                    .into(),
                OutputPath::Field(StationResults),
            ),
        ],
    );

    vec![
        TaskStep::new(handlers::GET_PREDICT_FOR_TIMESTAMP)
            .with_inputs(&[Trigger])
            .with_output(PredictFor)
            .into(),
        Step::parallel(
            "gather_vehicle_and_air_quality_data",
            vec![
                (cameras, OutputPath::Field(CameraResults)),
                (stations, OutputPath::Field(StationResults)),
            ],
        ),
        TaskStep::new(handlers::GET_STREET_LIST).with_output(StreetIds).into(),
        Step::map(
            "check_street_limits",
            StreetIds,
            concurrency,
            TaskStep::new(handlers::CHECK_LIMITS)
                .with_inputs(&[Item, PredictFor])
                .into(),
            OutputPath::Discard,
        ),
        TaskStep::new(handlers::GET_SECTION_LIST).with_output(SectionIds).into(),
        Step::map(
            "determine_section_info",
            SectionIds,
            concurrency,
            TaskStep::new(handlers::DETERMINE_INFO)
                .with_inputs(&[Item, PredictFor])
                .into(),
            OutputPath::Discard,
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
    /// Not started because an earlier stage failed
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub index: usize,
    pub name: String,
    pub status: StageStatus,
    pub duration_ms: u64,
}

/// Where and why a run stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub stage: String,
    pub index: usize,
    pub message: String,
    pub error_code: Option<String>,
    pub failed_items: Vec<FailedItem>,
}

/// Outcome of one evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unset when the run failed before the timestamp was determined
    pub predict_for: Option<Timestamp>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub stages: Vec<StageReport>,
    pub failure: Option<RunFailure>,
    #[serde(skip)]
    pub error: Option<OrchestrationError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|stage| stage.name == name)
    }
}

/// Validated evaluation graph bound to an executor
pub struct EvaluationWorkflow {
    executor: StepExecutor,
    stages: Vec<Step>,
}

impl EvaluationWorkflow {
    /// The standard evaluation graph, validated against `registry`
    pub fn new(registry: Arc<HandlerRegistry>, config: &EvaluationConfig) -> OrchestrationResult<Self> {
        let executor = StepExecutor::new(registry, StepExecutionConfig::from_config(config));
        Self::with_stages(executor, evaluation_stages(&config.orchestration))
    }

    /// Any stage list, validated against the executor's registry
    pub fn with_stages(executor: StepExecutor, stages: Vec<Step>) -> OrchestrationResult<Self> {
        validate_stages(&stages, executor.registry(), &[ContextField::Trigger])?;
        info!(
            stages = stages.len(),
            handlers = executor.registry().len(),
            "✅ Evaluation workflow validated"
        );
        Ok(Self { executor, stages })
    }

    pub fn stages(&self) -> &[Step] {
        &self.stages
    }

    /// Run every stage in order. The first failing stage ends the run; later stages are
    /// reported as skipped.
    pub async fn run(&self, predict_for: Option<Timestamp>) -> RunReport {
        let started_at = Utc::now();
        let run_started = Instant::now();
        let mut context = WorkflowContext::for_trigger(predict_for);
        let mut stages = Vec::with_capacity(self.stages.len());
        let mut failure = None;

        info!(predict_for = predict_for, "🚀 Evaluation run starting");

        for (index, stage) in self.stages.iter().enumerate() {
            if failure.is_some() {
                stages.push(StageReport {
                    index,
                    name: stage.name().to_string(),
                    status: StageStatus::Skipped,
                    duration_ms: 0,
                });
                continue;
            }

            let current = current_predict_for(&context);
            log_stage_operation(stage.name(), index, current, "started", None);
            let stage_started = Instant::now();
            let outcome = self.executor.execute(stage, context.clone()).await;
            let duration_ms = stage_started.elapsed().as_millis() as u64;

            match outcome {
                Ok(outcome) => {
                    context = outcome.context;
                    log_stage_operation(
                        stage.name(),
                        index,
                        current_predict_for(&context),
                        "completed",
                        Some(duration_ms),
                    );
                    stages.push(StageReport {
                        index,
                        name: stage.name().to_string(),
                        status: StageStatus::Completed,
                        duration_ms,
                    });
                }
                Err(source) => {
                    log_stage_operation(stage.name(), index, current, "failed", Some(duration_ms));
                    stages.push(StageReport {
                        index,
                        name: stage.name().to_string(),
                        status: StageStatus::Failed,
                        duration_ms,
                    });
                    failure = Some(OrchestrationError::StageFailed {
                        stage: stage.name().to_string(),
                        index,
                        source: Box::new(source),
                    });
                }
            }
        }

        let duration_ms = run_started.elapsed().as_millis() as u64;
        let predict_for = current_predict_for(&context);
        match failure {
            None => {
                info!(predict_for = predict_for, duration_ms = duration_ms, "✅ Evaluation run completed");
                RunReport {
                    predict_for,
                    started_at,
                    duration_ms,
                    status: RunStatus::Succeeded,
                    stages,
                    failure: None,
                    error: None,
                }
            }
            Some(error) => {
                error!(predict_for = predict_for, duration_ms = duration_ms, error = %error, "❌ Evaluation run failed");
                RunReport {
                    predict_for,
                    started_at,
                    duration_ms,
                    status: RunStatus::Failed,
                    stages,
                    failure: Some(run_failure(&error)),
                    error: Some(error),
                }
            }
        }
    }
}

fn current_predict_for(context: &WorkflowContext) -> Option<Timestamp> {
    match context.get(ContextField::PredictFor) {
        Some(ContextValue::Timestamp(t)) => Some(*t),
        _ => None,
    }
}

fn run_failure(error: &OrchestrationError) -> RunFailure {
    let (stage, index, message) = match error {
        OrchestrationError::StageFailed { stage, index, source } => (stage.clone(), *index, source.to_string()),
        other => (String::new(), 0, other.to_string()),
    };
    RunFailure {
        stage,
        index,
        message,
        error_code: error.root_cause().map(|cause| cause.error_code().to_string()),
        failed_items: error.failed_items(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_graph_has_six_stages() {
        let stages = evaluation_stages(&OrchestrationConfig::default());
        let names: Vec<&str> = stages.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec![
                "get_predict_for_timestamp",
                "gather_vehicle_and_air_quality_data",
                "get_street_list",
                "check_street_limits",
                "get_section_list",
                "determine_section_info",
            ]
        );
    }

    #[test]
    fn test_every_map_uses_configured_concurrency() {
        let config = OrchestrationConfig {
            max_concurrency: 7,
            ..OrchestrationConfig::default()
        };
        let stages = evaluation_stages(&config);
        for index in [3, 5] {
            match &stages[index] {
                Step::Map(map) => assert_eq!(map.max_concurrency, 7),
                other => panic!("stage {index} is not a map: {}", other.name()),
            }
        }
    }
}
