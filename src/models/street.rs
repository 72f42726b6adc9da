use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Base record at `(street#<id>, baseEntity)`. Read-only during an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Street {
    #[serde(default)]
    pub cameras: BTreeSet<String>,
    pub station: String,
    pub traffic_capacity: u32,
    pub air_quality_limit: f64,
}

/// Limit-check result at `(street#<id>, info#<t>)`. Overwritten on every run for `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetInfo {
    pub traffic_load: f64,
    pub emergency_vehicles_active: bool,
    pub air_quality_load: f64,
}
