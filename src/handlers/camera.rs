//! Per-camera units of the vehicle branch: image window, car counting and prediction,
//! emergency counting, and the write of the camera's counts for `predictFor`.

use super::call_collaborator;
use crate::collaborators::{CarCountPredictor, VehicleDetector};
use crate::error::{Result, TrafficError};
use crate::models::TrafficCount;
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use crate::orchestration::handler::UnitHandler;
use crate::orchestration::retry::RetryPolicy;
use crate::retrieval::WindowedRetrieval;
use crate::store::keys::traffic_count_key;
use crate::store::{encode, KeyedStore};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub struct GetImagesHandler {
    retrieval: WindowedRetrieval,
    max_age: i64,
}

impl GetImagesHandler {
    pub fn new(retrieval: WindowedRetrieval, max_age: i64) -> Self {
        Self { retrieval, max_age }
    }
}

#[async_trait]
impl UnitHandler for GetImagesHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Item, ContextField::PredictFor]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Images
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let camera_id = input.id(ContextField::Item)?;
        let predict_for = input.timestamp(ContextField::PredictFor)?;
        let images = self
            .retrieval
            .images_for_camera(camera_id, predict_for, self.max_age)
            .await?;
        Ok(ContextValue::Images(images))
    }
}

pub struct CountCarsHandler {
    detector: Arc<dyn VehicleDetector>,
    retry: RetryPolicy,
}

impl CountCarsHandler {
    pub fn new(detector: Arc<dyn VehicleDetector>, retry: RetryPolicy) -> Self {
        Self { detector, retry }
    }
}

#[async_trait]
impl UnitHandler for CountCarsHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Images]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::CountSeries
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let images = input.images(ContextField::Images)?;
        let detector = self.detector.as_ref();
        let counts = call_collaborator(&self.retry, "vehicle_detector", move || detector.count_cars(images)).await?;
        Ok(ContextValue::CountSeries(counts))
    }
}

pub struct PredictCarCountHandler {
    predictor: Arc<dyn CarCountPredictor>,
    retry: RetryPolicy,
}

impl PredictCarCountHandler {
    pub fn new(predictor: Arc<dyn CarCountPredictor>, retry: RetryPolicy) -> Self {
        Self { predictor, retry }
    }
}

#[async_trait]
impl UnitHandler for PredictCarCountHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::CarCounts, ContextField::PredictFor]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Count
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let history = input.count_series(ContextField::CarCounts)?;
        let predict_for = input.timestamp(ContextField::PredictFor)?;
        let predictor = self.predictor.as_ref();
        let prediction = call_collaborator(&self.retry, "car_count_predictor", move || {
            predictor.predict(history, predict_for)
        })
        .await?;
        Ok(ContextValue::Count(prediction))
    }
}

pub struct CountEmergencyVehiclesHandler {
    detector: Arc<dyn VehicleDetector>,
    retry: RetryPolicy,
}

impl CountEmergencyVehiclesHandler {
    pub fn new(detector: Arc<dyn VehicleDetector>, retry: RetryPolicy) -> Self {
        Self { detector, retry }
    }
}

#[async_trait]
impl UnitHandler for CountEmergencyVehiclesHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Images]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Count
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let images = input.images(ContextField::Images)?;
        let detector = self.detector.as_ref();
        let count = call_collaborator(&self.retry, "vehicle_detector", move || {
            detector.count_emergency_vehicles(images)
        })
        .await?;
        Ok(ContextValue::Count(i64::from(count)))
    }
}

/// Persists the merged vehicle counts of one camera at `(camera#<id>, trafficCount#<t>)`
pub struct UpdateVehiclesCountHandler {
    store: Arc<dyn KeyedStore>,
}

impl UpdateVehiclesCountHandler {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UnitHandler for UpdateVehiclesCountHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[
            ContextField::Item,
            ContextField::PredictFor,
            ContextField::CarCountPrediction,
            ContextField::EmergencyVehicleCount,
        ]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Record
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let camera_id = input.id(ContextField::Item)?;
        let predict_for = input.timestamp(ContextField::PredictFor)?;
        let emergency = input.count(ContextField::EmergencyVehicleCount)?;
        let count = TrafficCount {
            car_count_prediction: input.count(ContextField::CarCountPrediction)?,
            emergency_vehicle_count: u32::try_from(emergency).map_err(|_| {
                TrafficError::collaborator(
                    "vehicle_detector",
                    format!("emergency vehicle count {emergency} is out of range"),
                )
            })?,
        };

        self.store
            .put(traffic_count_key(camera_id, predict_for), encode(&count)?)
            .await?;

        debug!(
            camera_id = camera_id,
            predict_for = predict_for,
            car_count_prediction = count.car_count_prediction,
            emergency_vehicle_count = count.emergency_vehicle_count,
            "Camera counts written"
        );

        Ok(ContextValue::Record(json!({
            "cameraId": camera_id,
            "carCountPrediction": count.car_count_prediction,
            "emergencyVehicleCount": count.emergency_vehicle_count,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::stub::StubVehicleDetector;
    use crate::collaborators::ImageSeries;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_update_writes_traffic_count() {
        let store = Arc::new(InMemoryStore::default());
        let handler = UpdateVehiclesCountHandler::new(store.clone());
        let input = UnitInput::from_values([
            (ContextField::Item, ContextValue::Id("cam_1".into())),
            (ContextField::PredictFor, ContextValue::Timestamp(600)),
            (ContextField::CarCountPrediction, ContextValue::Count(12)),
            (ContextField::EmergencyVehicleCount, ContextValue::Count(1)),
        ]);

        let result = handler.invoke(&input).await.unwrap();
        assert_eq!(result.kind(), ValueKind::Record);

        let stored = store.snapshot(&traffic_count_key("cam_1", 600)).unwrap();
        assert_eq!(stored["carCountPrediction"], 12);
        assert_eq!(stored["emergencyVehicleCount"], 1);
    }

    #[tokio::test]
    async fn test_negative_emergency_count_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let handler = UpdateVehiclesCountHandler::new(store.clone());
        let input = UnitInput::from_values([
            (ContextField::Item, ContextValue::Id("cam_1".into())),
            (ContextField::PredictFor, ContextValue::Timestamp(600)),
            (ContextField::CarCountPrediction, ContextValue::Count(12)),
            (ContextField::EmergencyVehicleCount, ContextValue::Count(-1)),
        ]);

        assert!(handler.invoke(&input).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_emergency_count_widens_detector_output() {
        let handler = CountEmergencyVehiclesHandler::new(Arc::new(StubVehicleDetector), RetryPolicy::no_retry());
        let input = UnitInput::from_values([(
            ContextField::Images,
            ContextValue::Images(ImageSeries::from([(1, "img1".to_string())])),
        )]);
        assert_eq!(handler.invoke(&input).await, Ok(ContextValue::Count(2)));
    }
}
