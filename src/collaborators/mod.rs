//! # External Collaborators
//!
//! Contracts for the prediction and detection services the evaluation calls and trusts.
//! Their algorithms live outside this crate; the core only depends on the shapes below.
//! [`stub`] provides fixed-value implementations for wiring and local runs.

pub mod stub;

use crate::constants::Timestamp;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Image time -> image reference
pub type ImageSeries = BTreeMap<Timestamp, String>;
/// Image time -> detected cars
pub type CountSeries = BTreeMap<Timestamp, u32>;
/// Measurement time -> air quality
pub type MeasurementSeries = BTreeMap<Timestamp, f64>;

/// Vehicle detection on camera imagery. Best-effort: counts may be zero or absent.
#[async_trait]
pub trait VehicleDetector: Send + Sync {
    /// Cars per image
    async fn count_cars(&self, images: &ImageSeries) -> Result<CountSeries>;

    /// Emergency vehicles in the most recent image of the series
    async fn count_emergency_vehicles(&self, images: &ImageSeries) -> Result<u32>;
}

#[async_trait]
pub trait CarCountPredictor: Send + Sync {
    async fn predict(&self, history: &CountSeries, predict_for: Timestamp) -> Result<i64>;
}

#[async_trait]
pub trait AirQualityPredictor: Send + Sync {
    async fn predict(&self, history: &MeasurementSeries, predict_for: Timestamp) -> Result<f64>;
}

/// Derives display info for one section and writes it to `(section#<id>, info#<t>)`
#[async_trait]
pub trait InfoDeterminer: Send + Sync {
    async fn determine(&self, predict_for: Timestamp, section_id: &str) -> Result<()>;
}

/// Source of the "evaluate now" timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Always reports the same instant; for replay and tests
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Every collaborator one evaluation needs
#[derive(Clone)]
pub struct Collaborators {
    pub vehicle_detector: Arc<dyn VehicleDetector>,
    pub car_count_predictor: Arc<dyn CarCountPredictor>,
    pub air_quality_predictor: Arc<dyn AirQualityPredictor>,
    pub info_determiner: Arc<dyn InfoDeterminer>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Stub implementations throughout, with the system clock
    pub fn stubs() -> Self {
        Self {
            vehicle_detector: Arc::new(stub::StubVehicleDetector),
            car_count_predictor: Arc::new(stub::StubCarCountPredictor),
            air_quality_predictor: Arc::new(stub::StubAirQualityPredictor),
            info_determiner: Arc::new(stub::NoopInfoDeterminer),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_vehicle_detector(mut self, detector: Arc<dyn VehicleDetector>) -> Self {
        self.vehicle_detector = detector;
        self
    }

    pub fn with_car_count_predictor(mut self, predictor: Arc<dyn CarCountPredictor>) -> Self {
        self.car_count_predictor = predictor;
        self
    }

    pub fn with_air_quality_predictor(mut self, predictor: Arc<dyn AirQualityPredictor>) -> Self {
        self.air_quality_predictor = predictor;
        self
    }

    pub fn with_info_determiner(mut self, determiner: Arc<dyn InfoDeterminer>) -> Self {
        self.info_determiner = determiner;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
