use super::call_collaborator;
use crate::collaborators::AirQualityPredictor;
use crate::error::{Result, TrafficError};
use crate::models::AirQualityPrediction;
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use crate::orchestration::handler::UnitHandler;
use crate::orchestration::retry::RetryPolicy;
use crate::retrieval::WindowedRetrieval;
use crate::store::keys::air_quality_prediction_key;
use crate::store::{encode, KeyedStore};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Forecasts a station's air quality from its measurement window and stores the
/// forecast at `(station#<id>, prediction#<t>)`
pub struct PredictAirQualityHandler {
    store: Arc<dyn KeyedStore>,
    retrieval: WindowedRetrieval,
    predictor: Arc<dyn AirQualityPredictor>,
    max_age: i64,
    retry: RetryPolicy,
}

impl PredictAirQualityHandler {
    pub fn new(
        store: Arc<dyn KeyedStore>,
        retrieval: WindowedRetrieval,
        predictor: Arc<dyn AirQualityPredictor>,
        max_age: i64,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            retrieval,
            predictor,
            max_age,
            retry,
        }
    }
}

#[async_trait]
impl UnitHandler for PredictAirQualityHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Item, ContextField::PredictFor]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Record
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let station_id = input.id(ContextField::Item)?;
        let predict_for = input.timestamp(ContextField::PredictFor)?;

        let history = self
            .retrieval
            .measurements_for_station(station_id, predict_for, self.max_age)
            .await?;
        let predictor = self.predictor.as_ref();
        let history_ref = &history;
        let air_quality = call_collaborator(&self.retry, "air_quality_predictor", move || async move {
            let air_quality = predictor.predict(history_ref, predict_for).await?;
            if air_quality.is_finite() {
                Ok(air_quality)
            } else {
                Err(TrafficError::collaborator(
                    "air_quality_predictor",
                    format!("non-finite prediction {air_quality}"),
                ))
            }
        })
        .await?;

        self.store
            .put(
                air_quality_prediction_key(station_id, predict_for),
                encode(&AirQualityPrediction { air_quality })?,
            )
            .await?;

        debug!(
            station_id = station_id,
            predict_for = predict_for,
            measurements = history.len(),
            air_quality = air_quality,
            "Air-quality prediction written"
        );

        Ok(ContextValue::Record(json!({
            "stationId": station_id,
            "airQuality": air_quality,
            "measurements": history.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::stub::StubAirQualityPredictor;
    use crate::collaborators::MeasurementSeries;
    use crate::constants::Timestamp;
    use crate::store::InMemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct NanPredictor {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AirQualityPredictor for NanPredictor {
        async fn predict(&self, _history: &MeasurementSeries, _predict_for: Timestamp) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(f64::NAN)
        }
    }

    fn station_input(predict_for: Timestamp) -> UnitInput {
        UnitInput::from_values([
            (ContextField::Item, ContextValue::Id("st_1".into())),
            (ContextField::PredictFor, ContextValue::Timestamp(predict_for)),
        ])
    }

    #[tokio::test]
    async fn test_prediction_written_for_exact_timestamp() {
        let store = Arc::new(InMemoryStore::default());
        let handler = PredictAirQualityHandler::new(
            store.clone(),
            WindowedRetrieval::new(store.clone(), 100),
            Arc::new(StubAirQualityPredictor),
            3600,
            RetryPolicy::no_retry(),
        );
        handler.invoke(&station_input(7200)).await.unwrap();

        let stored = store.snapshot(&air_quality_prediction_key("st_1", 7200)).unwrap();
        assert_eq!(stored["airQuality"], 0.5);
    }

    #[tokio::test]
    async fn test_non_finite_prediction_is_collaborator_error() {
        let store = Arc::new(InMemoryStore::default());
        let predictor = Arc::new(NanPredictor::default());
        let handler = PredictAirQualityHandler::new(
            store.clone(),
            WindowedRetrieval::new(store.clone(), 100),
            predictor.clone(),
            3600,
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                backoff_multiplier: 1.0,
                jitter: false,
            },
        );

        let error = handler.invoke(&station_input(7200)).await.unwrap_err();

        assert!(matches!(error, TrafficError::Collaborator { .. }));
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 2);
        assert!(store.snapshot(&air_quality_prediction_key("st_1", 7200)).is_none());
    }
}
