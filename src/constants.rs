//! Key layout and fixed policy constants shared across the crate.

/// POSIX timestamp in seconds.
pub type Timestamp = i64;

/// Partition key holding the catalog listings of every entity type.
pub const CATALOG_PARTITION: &str = "baseEntity";

/// Sort key of an entity's base record inside its own partition.
pub const BASE_ENTITY_SK: &str = "baseEntity";

/// Width of zero-padded timestamps inside sort keys. Fixed width keeps lexicographic
/// order equal to numeric order.
pub const TIMESTAMP_KEY_WIDTH: usize = 20;

pub mod prefixes {
    pub const CAMERA: &str = "camera";
    pub const STATION: &str = "station";
    pub const STREET: &str = "street";
    pub const SECTION: &str = "section";

    pub const IMAGE: &str = "image";
    pub const TRAFFIC_COUNT: &str = "trafficCount";
    pub const MEASUREMENT: &str = "measurement";
    pub const PREDICTION: &str = "prediction";
    pub const INFO: &str = "info";
}

/// Policy defaults. All of them can be overridden through configuration.
pub mod defaults {
    /// How many of the most congested cameras feed a street's traffic load.
    pub const TRAFFIC_LOAD_TOP_N: usize = 3;
    /// Emergency vehicles counted on a camera before the street is flagged.
    pub const MIN_NUM_EMERGENCY_VEHICLES: u32 = 1;
    /// Upper bound of in-flight invocations per Map step.
    pub const MAP_MAX_CONCURRENCY: usize = 40;
    /// Keys per batched lookup.
    pub const BATCH_GET_MAX_KEYS: usize = 100;
    pub const IMAGE_MAX_AGE_SECONDS: i64 = 3600;
    pub const MEASUREMENT_MAX_AGE_SECONDS: i64 = 6 * 3600;
    pub const STORE_PAGE_SIZE: usize = 100;
}

/// Names of the handlers wired into the evaluation workflow.
pub mod handlers {
    pub const GET_PREDICT_FOR_TIMESTAMP: &str = "get_predict_for_timestamp";
    pub const GET_CAMERA_LIST: &str = "get_camera_list";
    pub const GET_IMAGES: &str = "get_images";
    pub const COUNT_CARS: &str = "count_cars";
    pub const PREDICT_CAR_COUNT: &str = "predict_car_count";
    pub const COUNT_EMERGENCY_VEHICLES: &str = "count_emergency_vehicles";
    pub const UPDATE_VEHICLES_COUNT: &str = "update_vehicles_count";
    pub const GET_STATION_LIST: &str = "get_station_list";
    pub const PREDICT_AIR_QUALITY: &str = "predict_air_quality";
    pub const GET_STREET_LIST: &str = "get_street_list";
    pub const CHECK_LIMITS: &str = "check_limits";
    pub const GET_SECTION_LIST: &str = "get_section_list";
    pub const DETERMINE_INFO: &str = "determine_info";
}
