//! Instrumented collaborators and unit handlers for orchestration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trafficwise_core::collaborators::{
    AirQualityPredictor, CarCountPredictor, CountSeries, ImageSeries, InfoDeterminer,
    MeasurementSeries, VehicleDetector,
};
use trafficwise_core::constants::{prefixes, Timestamp};
use trafficwise_core::error::{Result, TrafficError};
use trafficwise_core::models::{Section, SectionInfo, StreetInfo};
use trafficwise_core::orchestration::{ContextField, ContextValue, UnitHandler, UnitInput, ValueKind};
use trafficwise_core::store::keys::{section_info_key, street_info_key};
use trafficwise_core::store::{encode, require, ItemKey, KeyedStore, Projection};

/// Detector answering from per-image tables; unknown images count as zero
#[derive(Default)]
pub struct ScriptedDetector {
    cars: HashMap<String, u32>,
    emergency: HashMap<String, u32>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cars(mut self, uri: &str, count: u32) -> Self {
        self.cars.insert(uri.to_string(), count);
        self
    }

    pub fn emergency(mut self, uri: &str, count: u32) -> Self {
        self.emergency.insert(uri.to_string(), count);
        self
    }
}

#[async_trait]
impl VehicleDetector for ScriptedDetector {
    async fn count_cars(&self, images: &ImageSeries) -> Result<CountSeries> {
        Ok(images
            .iter()
            .map(|(t, uri)| (*t, self.cars.get(uri).copied().unwrap_or(0)))
            .collect())
    }

    async fn count_emergency_vehicles(&self, images: &ImageSeries) -> Result<u32> {
        Ok(images
            .values()
            .next_back()
            .and_then(|uri| self.emergency.get(uri).copied())
            .unwrap_or(0))
    }
}

/// Predicts the most recent observed count
pub struct LatestCountPredictor;

#[async_trait]
impl CarCountPredictor for LatestCountPredictor {
    async fn predict(&self, history: &CountSeries, _predict_for: Timestamp) -> Result<i64> {
        Ok(history.values().next_back().map_or(0, |count| i64::from(*count)))
    }
}

/// Forecasts NaN whatever the history
#[derive(Default)]
pub struct NanAirQualityPredictor {
    calls: AtomicU32,
}

impl NanAirQualityPredictor {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AirQualityPredictor for NanAirQualityPredictor {
    async fn predict(&self, _history: &MeasurementSeries, _predict_for: Timestamp) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(f64::NAN)
    }
}

/// Records every section it is asked about
#[derive(Default)]
pub struct RecordingInfoDeterminer {
    calls: Mutex<Vec<(Timestamp, String)>>,
}

impl RecordingInfoDeterminer {
    pub fn calls(&self) -> Vec<(Timestamp, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl InfoDeterminer for RecordingInfoDeterminer {
    async fn determine(&self, predict_for: Timestamp, section_id: &str) -> Result<()> {
        self.calls.lock().push((predict_for, section_id.to_string()));
        Ok(())
    }
}

/// Writes section display info from the street's limit results, reading them back
/// from the store like the deployed determiner
pub struct StreetInfoDeterminer {
    store: Arc<dyn KeyedStore>,
    jam_speed_limit: u32,
}

impl StreetInfoDeterminer {
    pub fn new(store: Arc<dyn KeyedStore>, jam_speed_limit: u32) -> Self {
        Self { store, jam_speed_limit }
    }
}

#[async_trait]
impl InfoDeterminer for StreetInfoDeterminer {
    async fn determine(&self, predict_for: Timestamp, section_id: &str) -> Result<()> {
        let section: Section = require(
            self.store.as_ref(),
            &ItemKey::base(prefixes::SECTION, section_id),
            &Projection::All,
            false,
        )
        .await?
        .decode()?;
        let street: StreetInfo = require(
            self.store.as_ref(),
            &street_info_key(&section.street, predict_for),
            &Projection::All,
            true,
        )
        .await?
        .decode()?;

        let traffic_jam = street.traffic_load > 1.0;
        let speed_limit = if traffic_jam || street.emergency_vehicles_active {
            section.default_speed_limit.min(self.jam_speed_limit)
        } else {
            section.default_speed_limit
        };
        let info = SectionInfo {
            speed_limit,
            traffic_jam,
            emergency_vehicles_active: street.emergency_vehicles_active,
        };
        self.store
            .put(section_info_key(section_id, predict_for), encode(&info)?)
            .await
    }
}

/// Per-item handler that tracks how many invocations overlap
pub struct OverlapTracker {
    current: AtomicUsize,
    max_seen: AtomicUsize,
    invocations: AtomicUsize,
    delay: Duration,
}

impl OverlapTracker {
    pub fn new(delay: Duration) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            invocations: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitHandler for OverlapTracker {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Item]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Id
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let item = input.id(ContextField::Item)?.to_string();
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        self.invocations.fetch_add(1, Ordering::SeqCst);

        // Later items finish first so completion order differs from item order
        let position: u64 = item.trim_start_matches("item_").parse().unwrap_or(0);
        tokio::time::sleep(self.delay + Duration::from_micros(1_000u64.saturating_sub(position * 10))).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(ContextValue::Id(item))
    }
}

/// Per-item handler failing permanently for selected items
pub struct FailingItems {
    failing: HashSet<String>,
    delay: Duration,
}

impl FailingItems {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|item| item.to_string()).collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl UnitHandler for FailingItems {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Item]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Id
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let item = input.id(ContextField::Item)?;
        tokio::time::sleep(self.delay).await;
        if self.failing.contains(item) {
            return Err(TrafficError::data_integrity(format!("street#{item}"), "baseEntity", "missing"));
        }
        Ok(ContextValue::Id(item.to_string()))
    }
}

/// Handler without inputs that hangs on its first `slow_calls` invocations
pub struct SlowThenFast {
    slow_calls: AtomicU32,
    calls: AtomicU32,
    kind: ValueKind,
    value: ContextValue,
}

impl SlowThenFast {
    pub fn new(slow_calls: u32, value: ContextValue) -> Self {
        Self {
            slow_calls: AtomicU32::new(slow_calls),
            calls: AtomicU32::new(0),
            kind: value.kind(),
            value,
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitHandler for SlowThenFast {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[]
    }

    fn output_kind(&self) -> ValueKind {
        self.kind
    }

    async fn invoke(&self, _input: &UnitInput) -> Result<ContextValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slow = self
            .slow_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if slow {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(self.value.clone())
    }
}

/// Handler returning a fixed value, optionally failing permanently
pub struct Fixed {
    kind: ValueKind,
    result: Result<ContextValue>,
}

impl Fixed {
    pub fn value(value: ContextValue) -> Self {
        Self {
            kind: value.kind(),
            result: Ok(value),
        }
    }

    pub fn failing(kind: ValueKind, error: TrafficError) -> Self {
        Self {
            kind,
            result: Err(error),
        }
    }
}

#[async_trait]
impl UnitHandler for Fixed {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[]
    }

    fn output_kind(&self) -> ValueKind {
        self.kind
    }

    async fn invoke(&self, _input: &UnitInput) -> Result<ContextValue> {
        self.result.clone()
    }
}
