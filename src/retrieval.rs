//! # Windowed Retrieval
//!
//! Time-bounded reads of the series the evaluation consumes. A window query covers the
//! open sort-key range `(<kind>#(predictFor - maxAge), end of <kind>)`, scanned
//! newest-first, so a record exactly `maxAge` old is already outside the window.

use crate::constants::{prefixes, Timestamp};
use crate::error::{Result, TrafficError};
use crate::models::{AirQualityPrediction, ImageRecord, Measurement, Street, TrafficCount};
use crate::store::keys::{
    air_quality_prediction_key, entity_key, parse_time_key, strip_entity_prefix, time_key,
    traffic_count_key, type_prefix,
};
use crate::store::{
    query_all, require, ItemKey, KeyedStore, Projection, QueryRequest, Record, SortKeyCondition,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct WindowedRetrieval {
    store: Arc<dyn KeyedStore>,
    batch_get_max_keys: usize,
}

impl WindowedRetrieval {
    pub fn new(store: Arc<dyn KeyedStore>, batch_get_max_keys: usize) -> Self {
        Self {
            store,
            batch_get_max_keys: batch_get_max_keys.max(1),
        }
    }

    /// Capture time -> image reference for every image inside the window.
    pub async fn images_for_camera(
        &self,
        camera_id: &str,
        predict_for: Timestamp,
        max_age: i64,
    ) -> Result<BTreeMap<Timestamp, String>> {
        let request = window_request(prefixes::CAMERA, camera_id, prefixes::IMAGE, predict_for, max_age);
        let records = query_all(self.store.as_ref(), request).await?;
        let images = decode_series(&records, prefixes::IMAGE, |image: ImageRecord| image.uri)?;

        debug!(
            camera_id = camera_id,
            predict_for = predict_for,
            image_count = images.len(),
            "Retrieved image window"
        );
        Ok(images)
    }

    /// The most recent image inside the window, if any, read consistently.
    pub async fn latest_image_for_camera(
        &self,
        camera_id: &str,
        predict_for: Timestamp,
        max_age: i64,
    ) -> Result<Option<(Timestamp, String)>> {
        let request = window_request(prefixes::CAMERA, camera_id, prefixes::IMAGE, predict_for, max_age)
            .consistent()
            .with_limit(1);
        let page = self.store.query(&request).await?;
        Ok(decode_series(&page.records, prefixes::IMAGE, |image: ImageRecord| image.uri)?
            .into_iter()
            .next_back())
    }

    /// Measurement time -> air quality for every raw measurement inside the window.
    pub async fn measurements_for_station(
        &self,
        station_id: &str,
        predict_for: Timestamp,
        max_age: i64,
    ) -> Result<BTreeMap<Timestamp, f64>> {
        let request = window_request(
            prefixes::STATION,
            station_id,
            prefixes::MEASUREMENT,
            predict_for,
            max_age,
        );
        let records = query_all(self.store.as_ref(), request).await?;
        decode_series(&records, prefixes::MEASUREMENT, |m: Measurement| m.air_quality)
    }

    /// The most recent measurement inside the window, if any, read consistently.
    pub async fn latest_measurement_for_station(
        &self,
        station_id: &str,
        predict_for: Timestamp,
        max_age: i64,
    ) -> Result<Option<(Timestamp, f64)>> {
        let request = window_request(
            prefixes::STATION,
            station_id,
            prefixes::MEASUREMENT,
            predict_for,
            max_age,
        )
        .consistent()
        .with_limit(1);
        let page = self.store.query(&request).await?;
        Ok(decode_series(&page.records, prefixes::MEASUREMENT, |m: Measurement| m.air_quality)?
            .into_iter()
            .next_back())
    }

    /// Vehicle counts recorded for exactly `predict_for`, batched. Cameras without a
    /// record are left out, never defaulted.
    pub async fn traffic_counts_for_cameras<'a, I>(
        &self,
        camera_ids: I,
        predict_for: Timestamp,
    ) -> Result<BTreeMap<String, TrafficCount>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let keys: Vec<ItemKey> = camera_ids
            .into_iter()
            .map(|camera_id| traffic_count_key(camera_id, predict_for))
            .collect();

        let mut counts = BTreeMap::new();
        for chunk in keys.chunks(self.batch_get_max_keys) {
            let records = self.store.batch_get(chunk, &Projection::All).await?;
            for record in records {
                let camera_id = strip_entity_prefix(prefixes::CAMERA, &record.key.pk)
                    .ok_or_else(|| {
                        TrafficError::data_integrity(&record.key.pk, &record.key.sk, "not a camera partition")
                    })?
                    .to_string();
                counts.insert(camera_id, record.decode::<TrafficCount>()?);
            }
        }
        Ok(counts)
    }

    /// Consistent point read of a station forecast. Absence is an error.
    pub async fn air_quality_prediction(&self, station_id: &str, predict_for: Timestamp) -> Result<f64> {
        let key = air_quality_prediction_key(station_id, predict_for);
        let record = require(self.store.as_ref(), &key, &Projection::of(&["airQuality"]), true).await?;
        Ok(record.decode::<AirQualityPrediction>()?.air_quality)
    }

    /// Consistent read of a street's base record.
    pub async fn street(&self, street_id: &str) -> Result<Street> {
        let key = ItemKey::base(prefixes::STREET, street_id);
        require(self.store.as_ref(), &key, &Projection::All, true)
            .await?
            .decode()
    }
}

fn window_request(
    entity: &str,
    id: &str,
    kind: &str,
    predict_for: Timestamp,
    max_age: i64,
) -> QueryRequest {
    let cutoff = predict_for.saturating_sub(max_age);
    // Nothing sorts before zero, so a negative cutoff keeps the whole series
    let condition = if cutoff < 0 {
        SortKeyCondition::BeginsWith(type_prefix(kind))
    } else {
        SortKeyCondition::PrefixAfter {
            prefix: type_prefix(kind),
            after: time_key(kind, cutoff),
        }
    };
    QueryRequest::new(entity_key(entity, id), condition).newest_first()
}

fn decode_series<M, V, F>(records: &[Record], kind: &str, extract: F) -> Result<BTreeMap<Timestamp, V>>
where
    M: serde::de::DeserializeOwned,
    F: Fn(M) -> V,
{
    records
        .iter()
        .map(|record| -> Result<(Timestamp, V)> {
            let t = parse_time_key(kind, &record.key.sk).ok_or_else(|| {
                TrafficError::data_integrity(&record.key.pk, &record.key.sk, "unparseable timestamp")
            })?;
            Ok((t, extract(record.decode::<M>()?)))
        })
        .collect()
}
