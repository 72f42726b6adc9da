//! # Aggregation Engine
//!
//! Per-street limit checks. The numeric policies are plain functions so they can be
//! reasoned about (and property-tested) without a store:
//!
//! - [`traffic_load`]: mean of the `top_n` highest relative camera loads
//! - [`emergency_vehicles_active`]: any camera at or above the emergency threshold
//! - [`air_quality_load`]: forecast relative to the street's limit
//!
//! A zero denominator saturates the load at `1.0`.
//!
//! [`LimitChecker`] gathers the inputs for one street, applies the policies and upserts
//! the result at `(street#<id>, info#<predictFor>)`.

use crate::config::AggregationConfig;
use crate::constants::Timestamp;
use crate::error::{Result, TrafficError};
use crate::models::StreetInfo;
use crate::retrieval::WindowedRetrieval;
use crate::store::keys::street_info_key;
use crate::store::{encode, KeyedStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Load value used when a denominator is zero
pub const SATURATED: f64 = 1.0;

/// Traffic load of a street with `capacity` given per-camera predicted counts.
///
/// Negative predictions are treated as zero. No counts at all yields `0.0`.
pub fn traffic_load<I>(capacity: u32, counts: I, top_n: usize) -> f64
where
    I: IntoIterator<Item = i64>,
{
    let mut relative: Vec<f64> = counts
        .into_iter()
        .map(|count| {
            if capacity > 0 {
                count.max(0) as f64 / f64::from(capacity)
            } else {
                SATURATED
            }
        })
        .collect();

    if relative.is_empty() || top_n == 0 {
        return 0.0;
    }

    relative.sort_by(|a, b| b.total_cmp(a));
    relative.truncate(top_n);
    relative.iter().sum::<f64>() / relative.len() as f64
}

/// True iff any evaluated camera saw at least `threshold` emergency vehicles.
pub fn emergency_vehicles_active<I>(counts: I, threshold: u32) -> bool
where
    I: IntoIterator<Item = u32>,
{
    counts.into_iter().any(|count| count >= threshold)
}

pub fn air_quality_load(prediction: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        prediction / limit
    } else {
        SATURATED
    }
}

/// Evaluates and persists the limits of single streets
#[derive(Clone)]
pub struct LimitChecker {
    store: Arc<dyn KeyedStore>,
    retrieval: WindowedRetrieval,
    policy: AggregationConfig,
}

impl LimitChecker {
    pub fn new(store: Arc<dyn KeyedStore>, retrieval: WindowedRetrieval, policy: AggregationConfig) -> Self {
        Self {
            store,
            retrieval,
            policy,
        }
    }

    /// Compute and upsert the street's result for `predict_for`. A failed write fails
    /// the whole check.
    #[instrument(skip(self), fields(street_id = street_id, predict_for = predict_for))]
    pub async fn check_street(&self, street_id: &str, predict_for: Timestamp) -> Result<StreetInfo> {
        let street = self.retrieval.street(street_id).await?;

        let counts = if street.cameras.is_empty() {
            Default::default()
        } else {
            self.retrieval
                .traffic_counts_for_cameras(&street.cameras, predict_for)
                .await?
        };
        let air_quality = self
            .retrieval
            .air_quality_prediction(&street.station, predict_for)
            .await?;

        let info = StreetInfo {
            traffic_load: traffic_load(
                street.traffic_capacity,
                counts.values().map(|count| count.car_count_prediction),
                self.policy.top_n,
            ),
            emergency_vehicles_active: emergency_vehicles_active(
                counts.values().map(|count| count.emergency_vehicle_count),
                self.policy.min_emergency_vehicles,
            ),
            air_quality_load: air_quality_load(air_quality, street.air_quality_limit),
        };

        let key = street_info_key(street_id, predict_for);
        if !(info.traffic_load.is_finite() && info.air_quality_load.is_finite()) {
            return Err(TrafficError::data_integrity(
                &key.pk,
                &key.sk,
                format!(
                    "non-finite load (traffic {}, air quality {})",
                    info.traffic_load, info.air_quality_load
                ),
            ));
        }
        self.store.put(key, encode(&info)?).await?;

        debug!(
            street_id = street_id,
            cameras_evaluated = counts.len(),
            traffic_load = info.traffic_load,
            emergency_vehicles_active = info.emergency_vehicles_active,
            air_quality_load = info.air_quality_load,
            "Street limits written"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_traffic_load_top_three_mean() {
        let load = traffic_load(10, [5, 12, 3, 20], 3);
        assert!(approx(load, (2.0 + 1.2 + 0.5) / 3.0));
    }

    #[test]
    fn test_traffic_load_fewer_cameras_than_top_n() {
        assert!(approx(traffic_load(10, [5], 3), 0.5));
        assert!(approx(traffic_load(10, [5, 15], 3), 1.0));
    }

    #[test]
    fn test_traffic_load_zero_capacity_saturates() {
        assert!(approx(traffic_load(0, [0, 7], 3), 1.0));
        assert!(approx(traffic_load(0, std::iter::empty(), 3), 0.0));
    }

    #[test]
    fn test_traffic_load_no_counts() {
        assert!(approx(traffic_load(25, std::iter::empty(), 3), 0.0));
    }

    #[test]
    fn test_negative_prediction_clamped() {
        assert!(approx(traffic_load(10, [-4], 3), 0.0));
    }

    #[test]
    fn test_emergency_threshold() {
        assert!(emergency_vehicles_active([0, 2], 1));
        assert!(!emergency_vehicles_active([0], 1));
        assert!(!emergency_vehicles_active(std::iter::empty(), 1));
        assert!(!emergency_vehicles_active([1, 1], 2));
    }

    #[tokio::test]
    async fn test_non_finite_load_is_not_written() {
        use crate::constants::prefixes;
        use crate::models::{AirQualityPrediction, Street};
        use crate::store::keys::air_quality_prediction_key;
        use crate::store::{InMemoryStore, ItemKey};

        let store = Arc::new(InMemoryStore::default());
        let street = Street {
            cameras: Default::default(),
            station: "st_1".to_string(),
            traffic_capacity: 10,
            // Positive but small enough that the load overflows
            air_quality_limit: 1e-320,
        };
        store.insert(ItemKey::base(prefixes::STREET, "s1"), encode(&street).unwrap());
        store.insert(
            air_quality_prediction_key("st_1", 600),
            encode(&AirQualityPrediction { air_quality: 0.5 }).unwrap(),
        );
        let checker = LimitChecker::new(
            store.clone(),
            WindowedRetrieval::new(store.clone(), 100),
            AggregationConfig::default(),
        );

        let error = checker.check_street("s1", 600).await.unwrap_err();

        assert!(matches!(error, TrafficError::DataIntegrity { .. }));
        assert!(store.snapshot(&street_info_key("s1", 600)).is_none());
    }

    #[test]
    fn test_air_quality_load() {
        assert!(approx(air_quality_load(0.4, 0.8), 0.5));
        assert!(approx(air_quality_load(123.0, 0.0), 1.0));
    }
}
