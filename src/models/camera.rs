use serde::{Deserialize, Serialize};

/// Base record at `(camera#<id>, baseEntity)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub street: String,
    /// Location of the camera's image uploads
    #[serde(default)]
    pub images_path: Option<String>,
}

/// Image reference at `(camera#<id>, image#<t>)`, written by image ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub uri: String,
}

/// Vehicle counts at `(camera#<id>, trafficCount#<t>)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficCount {
    pub car_count_prediction: i64,
    pub emergency_vehicle_count: u32,
}
