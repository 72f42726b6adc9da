//! # Dataset Seeding
//!
//! Provisions a store from a JSON dataset of streets: each street with its cameras,
//! one sensor station with raw measurements, its sections, a traffic capacity and an
//! air-quality limit. Street names double as street ids.
//!
//! ```json
//! [
//!   {
//!     "street_name": "main_street",
//!     "cameras": [
//!       { "camera_id": "cam_1", "images_path": "main_street/cam_1",
//!         "images": [{ "1700000000": "main_street/cam_1/0001.jpg" }] }
//!     ],
//!     "sensor_station": { "station_id": "st_1", "measurements": [{ "1700000000": 0.51 }] },
//!     "sections": [{ "section_id": "sec_1", "street_name": "main_street", "defaultSpeedLimit": 50 }],
//!     "trafficCapacity": 20,
//!     "airQualityLimit": 0.8
//!   }
//! ]
//! ```

use crate::constants::{prefixes, Timestamp};
use crate::error::{Result, TrafficError};
use crate::models::{Camera, ImageRecord, Measurement, Section, Station, Street};
use crate::store::{encode, Attributes, ItemKey, KeyedStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub streets: Vec<StreetSeed>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreetSeed {
    pub street_name: String,
    #[serde(default)]
    pub cameras: Vec<CameraSeed>,
    pub sensor_station: StationSeed,
    #[serde(default)]
    pub sections: Vec<SectionSeed>,
    #[serde(rename = "trafficCapacity")]
    pub traffic_capacity: u32,
    #[serde(rename = "airQualityLimit")]
    pub air_quality_limit: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraSeed {
    pub camera_id: String,
    #[serde(default)]
    pub images_path: Option<String>,
    /// Single-entry `{ "<t>": "<uri>" }` objects
    #[serde(default)]
    pub images: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationSeed {
    pub station_id: String,
    /// Single-entry `{ "<t>": <airQuality> }` objects
    #[serde(default)]
    pub measurements: Vec<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectionSeed {
    pub section_id: String,
    pub street_name: String,
    #[serde(rename = "defaultSpeedLimit")]
    pub default_speed_limit: u32,
}

/// What [`provision`] wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub streets: usize,
    pub cameras: usize,
    pub stations: usize,
    pub sections: usize,
    pub images: usize,
    pub measurements: usize,
}

impl Dataset {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TrafficError::Validation(format!("invalid dataset: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrafficError::Configuration(format!("cannot read dataset {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    match raw.parse::<Timestamp>() {
        Ok(t) if t >= 0 => Ok(t),
        _ => Err(TrafficError::Validation(format!(
            "'{raw}' is not a non-negative POSIX timestamp"
        ))),
    }
}

async fn put_entity(store: &dyn KeyedStore, prefix: &str, id: &str, attributes: Attributes) -> Result<()> {
    store.put(ItemKey::base(prefix, id), attributes).await?;
    store.put(ItemKey::listing(prefix, id), Attributes::new()).await
}

/// Write base records, catalog listings, image references and measurements for every
/// street of the dataset
pub async fn provision(store: &dyn KeyedStore, dataset: &Dataset) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for street in &dataset.streets {
        let station_id = &street.sensor_station.station_id;

        let record = Street {
            cameras: street.cameras.iter().map(|camera| camera.camera_id.clone()).collect(),
            station: station_id.clone(),
            traffic_capacity: street.traffic_capacity,
            air_quality_limit: street.air_quality_limit,
        };
        put_entity(store, prefixes::STREET, &street.street_name, encode(&record)?).await?;
        summary.streets += 1;

        for camera in &street.cameras {
            let record = Camera {
                street: street.street_name.clone(),
                images_path: camera.images_path.clone(),
            };
            put_entity(store, prefixes::CAMERA, &camera.camera_id, encode(&record)?).await?;
            summary.cameras += 1;

            for (t, uri) in camera.images.iter().flatten() {
                let key = ItemKey::series(prefixes::CAMERA, &camera.camera_id, prefixes::IMAGE, parse_timestamp(t)?);
                store.put(key, encode(&ImageRecord { uri: uri.clone() })?).await?;
                summary.images += 1;
            }
        }

        let record = Station {
            street: street.street_name.clone(),
        };
        put_entity(store, prefixes::STATION, station_id, encode(&record)?).await?;
        summary.stations += 1;

        for (t, air_quality) in street.sensor_station.measurements.iter().flatten() {
            let key = ItemKey::series(prefixes::STATION, station_id, prefixes::MEASUREMENT, parse_timestamp(t)?);
            store
                .put(key, encode(&Measurement { air_quality: *air_quality })?)
                .await?;
            summary.measurements += 1;
        }

        for section in &street.sections {
            let record = Section {
                street: section.street_name.clone(),
                default_speed_limit: section.default_speed_limit,
            };
            put_entity(store, prefixes::SECTION, &section.section_id, encode(&record)?).await?;
            summary.sections += 1;
        }
    }

    info!(
        streets = summary.streets,
        cameras = summary.cameras,
        stations = summary.stations,
        sections = summary.sections,
        images = summary.images,
        measurements = summary.measurements,
        "🌱 Dataset provisioned"
    );
    Ok(summary)
}
