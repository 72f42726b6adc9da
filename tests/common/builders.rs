//! Fixture builders that provision an in-memory store directly, bypassing the
//! evaluation workflow.

use std::collections::BTreeSet;
use std::sync::Arc;
use trafficwise_core::constants::{prefixes, Timestamp};
use trafficwise_core::models::{Camera, ImageRecord, Measurement, Section, Station, Street};
use trafficwise_core::store::{encode, Attributes, InMemoryStore, ItemKey};

/// Builder pattern for a small city: streets with cameras, stations and sections
pub struct CityBuilder {
    store: Arc<InMemoryStore>,
}

impl CityBuilder {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new(page_size)),
        }
    }

    fn entity(&self, prefix: &str, id: &str, attributes: Attributes) {
        self.store.insert(ItemKey::base(prefix, id), attributes);
        self.store.insert(ItemKey::listing(prefix, id), Attributes::new());
    }

    /// A street with its station; cameras are added with [`CityBuilder::camera`]
    pub fn street(self, id: &str, capacity: u32, station: &str, air_quality_limit: f64) -> Self {
        let street = Street {
            cameras: BTreeSet::new(),
            station: station.to_string(),
            traffic_capacity: capacity,
            air_quality_limit,
        };
        self.entity(prefixes::STREET, id, encode(&street).unwrap());
        self.entity(
            prefixes::STATION,
            station,
            encode(&Station {
                street: id.to_string(),
            })
            .unwrap(),
        );
        self
    }

    /// A camera on `street`, also recorded in the street's base record
    pub fn camera(self, id: &str, street: &str) -> Self {
        self.entity(
            prefixes::CAMERA,
            id,
            encode(&Camera {
                street: street.to_string(),
                images_path: None,
            })
            .unwrap(),
        );

        let key = ItemKey::base(prefixes::STREET, street);
        let mut attributes = self.store.snapshot(&key).expect("street must be added before its cameras");
        let cameras = attributes
            .entry("cameras")
            .or_insert_with(|| serde_json::json!([]));
        cameras.as_array_mut().unwrap().push(serde_json::json!(id));
        self.store.insert(key, attributes);
        self
    }

    pub fn images(self, camera: &str, images: &[(Timestamp, &str)]) -> Self {
        for (t, uri) in images {
            self.store.insert(
                ItemKey::series(prefixes::CAMERA, camera, prefixes::IMAGE, *t),
                encode(&ImageRecord { uri: uri.to_string() }).unwrap(),
            );
        }
        self
    }

    pub fn measurements(self, station: &str, measurements: &[(Timestamp, f64)]) -> Self {
        for (t, air_quality) in measurements {
            self.store.insert(
                ItemKey::series(prefixes::STATION, station, prefixes::MEASUREMENT, *t),
                encode(&Measurement {
                    air_quality: *air_quality,
                })
                .unwrap(),
            );
        }
        self
    }

    pub fn section(self, id: &str, street: &str, default_speed_limit: u32) -> Self {
        self.entity(
            prefixes::SECTION,
            id,
            encode(&Section {
                street: street.to_string(),
                default_speed_limit,
            })
            .unwrap(),
        );
        self
    }

    pub fn build(self) -> Arc<InMemoryStore> {
        self.store
    }
}

impl Default for CityBuilder {
    fn default() -> Self {
        Self::new()
    }
}
