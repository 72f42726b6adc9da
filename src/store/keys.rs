//! Composite key construction.
//!
//! Every record lives under `(PK, SK)`. Entity partitions are `<type>#<id>`; time-series
//! sort keys are `<kind>#<t>` with `t` zero-padded to [`TIMESTAMP_KEY_WIDTH`] digits.

use crate::constants::{prefixes, Timestamp, BASE_ENTITY_SK, CATALOG_PARTITION, TIMESTAMP_KEY_WIDTH};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Base record of an entity, e.g. `(street#s1, baseEntity)`
    pub fn base(entity_prefix: &str, id: &str) -> Self {
        Self::new(entity_key(entity_prefix, id), BASE_ENTITY_SK)
    }

    /// Catalog listing entry, e.g. `(baseEntity, street#s1)`
    pub fn listing(entity_prefix: &str, id: &str) -> Self {
        Self::new(CATALOG_PARTITION, entity_key(entity_prefix, id))
    }

    /// Time-series record, e.g. `(camera#c1, image#00000000001700000000)`
    pub fn series(entity_prefix: &str, id: &str, kind: &str, t: Timestamp) -> Self {
        Self::new(entity_key(entity_prefix, id), time_key(kind, t))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.pk, self.sk)
    }
}

/// `<prefix>#<id>`
pub fn entity_key(prefix: &str, id: &str) -> String {
    format!("{prefix}#{id}")
}

/// `<prefix>#` as used for `begins_with` conditions
pub fn type_prefix(prefix: &str) -> String {
    format!("{prefix}#")
}

/// `<kind>#<zero-padded t>`. Only non-negative timestamps sort correctly.
pub fn time_key(kind: &str, t: Timestamp) -> String {
    format!("{kind}#{t:0width$}", width = TIMESTAMP_KEY_WIDTH)
}

/// Inverse of [`entity_key`]: the id behind a typed key, if the prefix matches.
pub fn strip_entity_prefix<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_prefix('#')
}

/// Inverse of [`time_key`].
pub fn parse_time_key(kind: &str, sk: &str) -> Option<Timestamp> {
    strip_entity_prefix(kind, sk)?.parse().ok()
}

pub fn street_info_key(street_id: &str, t: Timestamp) -> ItemKey {
    ItemKey::series(prefixes::STREET, street_id, prefixes::INFO, t)
}

pub fn section_info_key(section_id: &str, t: Timestamp) -> ItemKey {
    ItemKey::series(prefixes::SECTION, section_id, prefixes::INFO, t)
}

pub fn traffic_count_key(camera_id: &str, t: Timestamp) -> ItemKey {
    ItemKey::series(prefixes::CAMERA, camera_id, prefixes::TRAFFIC_COUNT, t)
}

pub fn air_quality_prediction_key(station_id: &str, t: Timestamp) -> ItemKey {
    ItemKey::series(prefixes::STATION, station_id, prefixes::PREDICTION, t)
}
