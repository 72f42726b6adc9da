use serde::{Deserialize, Serialize};

/// Base record at `(section#<id>, baseEntity)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub street: String,
    pub default_speed_limit: u32,
}

/// Display info at `(section#<id>, info#<t>)`, produced by the info-determination
/// collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInfo {
    pub speed_limit: u32,
    pub traffic_jam: bool,
    pub emergency_vehicles_active: bool,
}
