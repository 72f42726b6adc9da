//! # Store Models
//!
//! Typed views of the records kept in the keyed store. Attribute names are camelCase,
//! matching what provisioning and the upstream collaborators write.
//!
//! - [`street`]: street base records and the per-evaluation limit results
//! - [`camera`]: image references and per-camera vehicle counts
//! - [`station`]: air-quality measurements and predictions
//! - [`section`]: section base records and display info

pub mod camera;
pub mod section;
pub mod station;
pub mod street;

pub use camera::{Camera, ImageRecord, TrafficCount};
pub use section::{Section, SectionInfo};
pub use station::{AirQualityPrediction, Measurement, Station};
pub use street::{Street, StreetInfo};
