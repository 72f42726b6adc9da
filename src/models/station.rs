use serde::{Deserialize, Serialize};

/// Base record at `(station#<id>, baseEntity)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub street: String,
}

/// Raw sensor reading at `(station#<id>, measurement#<t>)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub air_quality: f64,
}

/// Forecast at `(station#<id>, prediction#<t>)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityPrediction {
    pub air_quality: f64,
}
