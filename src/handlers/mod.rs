//! # Evaluation Handlers
//!
//! The units of work behind the evaluation workflow's Task steps. Each handler wraps a
//! catalog listing, a windowed retrieval, a collaborator call or an aggregation, and
//! declares the context fields it reads and the kind of value it returns.
//!
//! Collaborator calls are retried inside the handler with their own budget; transient
//! store errors and timeouts bubble up to the orchestrator, which retries the whole unit.

pub mod camera;
pub mod catalog;
pub mod section;
pub mod station;
pub mod street;
pub mod timestamp;

use crate::aggregation::LimitChecker;
use crate::catalog::EntityCatalog;
use crate::collaborators::Collaborators;
use crate::config::EvaluationConfig;
use crate::constants::handlers as names;
use crate::error::{Result, TrafficError};
use crate::orchestration::handler::HandlerRegistry;
use crate::orchestration::retry::{retry_with_backoff, RetryPolicy};
use crate::retrieval::WindowedRetrieval;
use crate::store::KeyedStore;
use std::future::Future;
use std::sync::Arc;

pub use camera::{
    CountCarsHandler, CountEmergencyVehiclesHandler, GetImagesHandler, PredictCarCountHandler,
    UpdateVehiclesCountHandler,
};
pub use catalog::{EntityKind, ListEntitiesHandler};
pub use section::DetermineInfoHandler;
pub use station::PredictAirQualityHandler;
pub use street::CheckLimitsHandler;
pub use timestamp::PredictForHandler;

/// Call a collaborator, retrying its own failures under `policy`. Store errors and
/// other failures pass through untouched.
pub(crate) async fn call_collaborator<T, F, Fut>(policy: &RetryPolicy, collaborator: &str, call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(
        policy,
        collaborator,
        |error| matches!(error, TrafficError::Collaborator { .. }),
        call,
    )
    .await
    .map_err(|failure| failure.error)
}

/// A registry holding every handler the evaluation workflow references
pub fn evaluation_registry(
    store: Arc<dyn KeyedStore>,
    collaborators: &Collaborators,
    config: &EvaluationConfig,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_evaluation_handlers(&mut registry, store, collaborators, config);
    registry
}

pub fn register_evaluation_handlers(
    registry: &mut HandlerRegistry,
    store: Arc<dyn KeyedStore>,
    collaborators: &Collaborators,
    config: &EvaluationConfig,
) {
    let catalog = EntityCatalog::new(Arc::clone(&store));
    let retrieval = WindowedRetrieval::new(Arc::clone(&store), config.retrieval.batch_get_max_keys);
    let limit_checker = LimitChecker::new(Arc::clone(&store), retrieval.clone(), config.aggregation.clone());
    let collaborator_retry = config.collaborator_retry.policy();

    registry.register(
        names::GET_PREDICT_FOR_TIMESTAMP,
        Arc::new(PredictForHandler::new(Arc::clone(&collaborators.clock))),
    );

    for (name, kind) in [
        (names::GET_CAMERA_LIST, EntityKind::Camera),
        (names::GET_STATION_LIST, EntityKind::Station),
        (names::GET_STREET_LIST, EntityKind::Street),
        (names::GET_SECTION_LIST, EntityKind::Section),
    ] {
        registry.register(name, Arc::new(ListEntitiesHandler::new(catalog.clone(), kind)));
    }

    registry.register(
        names::GET_IMAGES,
        Arc::new(GetImagesHandler::new(
            retrieval.clone(),
            config.retrieval.image_max_age_seconds,
        )),
    );
    registry.register(
        names::COUNT_CARS,
        Arc::new(CountCarsHandler::new(
            Arc::clone(&collaborators.vehicle_detector),
            collaborator_retry.clone(),
        )),
    );
    registry.register(
        names::PREDICT_CAR_COUNT,
        Arc::new(PredictCarCountHandler::new(
            Arc::clone(&collaborators.car_count_predictor),
            collaborator_retry.clone(),
        )),
    );
    registry.register(
        names::COUNT_EMERGENCY_VEHICLES,
        Arc::new(CountEmergencyVehiclesHandler::new(
            Arc::clone(&collaborators.vehicle_detector),
            collaborator_retry.clone(),
        )),
    );
    registry.register(
        names::UPDATE_VEHICLES_COUNT,
        Arc::new(UpdateVehiclesCountHandler::new(Arc::clone(&store))),
    );
    registry.register(
        names::PREDICT_AIR_QUALITY,
        Arc::new(PredictAirQualityHandler::new(
            Arc::clone(&store),
            retrieval,
            Arc::clone(&collaborators.air_quality_predictor),
            config.retrieval.measurement_max_age_seconds,
            collaborator_retry.clone(),
        )),
    );
    registry.register(names::CHECK_LIMITS, Arc::new(CheckLimitsHandler::new(limit_checker)));
    registry.register(
        names::DETERMINE_INFO,
        Arc::new(DetermineInfoHandler::new(
            Arc::clone(&collaborators.info_determiner),
            collaborator_retry,
        )),
    );
}
