//! Fixed-value collaborators. They ignore their input and return the same dummy values
//! the deployed pipeline used while the real services were being built.

use super::{
    AirQualityPredictor, CarCountPredictor, CountSeries, ImageSeries, InfoDeterminer,
    MeasurementSeries, VehicleDetector,
};
use crate::constants::Timestamp;
use crate::error::Result;
use async_trait::async_trait;

pub struct StubVehicleDetector;

#[async_trait]
impl VehicleDetector for StubVehicleDetector {
    async fn count_cars(&self, _images: &ImageSeries) -> Result<CountSeries> {
        Ok(CountSeries::from([(1, 5), (2, 10)]))
    }

    async fn count_emergency_vehicles(&self, _images: &ImageSeries) -> Result<u32> {
        Ok(2)
    }
}

pub struct StubCarCountPredictor;

#[async_trait]
impl CarCountPredictor for StubCarCountPredictor {
    async fn predict(&self, _history: &CountSeries, _predict_for: Timestamp) -> Result<i64> {
        Ok(10)
    }
}

pub struct StubAirQualityPredictor;

#[async_trait]
impl AirQualityPredictor for StubAirQualityPredictor {
    async fn predict(&self, _history: &MeasurementSeries, _predict_for: Timestamp) -> Result<f64> {
        Ok(0.5)
    }
}

pub struct NoopInfoDeterminer;

#[async_trait]
impl InfoDeterminer for NoopInfoDeterminer {
    async fn determine(&self, _predict_for: Timestamp, _section_id: &str) -> Result<()> {
        Ok(())
    }
}
