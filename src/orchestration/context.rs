//! # Workflow Context
//!
//! The payload threaded between steps. Instead of a free-form document, the context is
//! a set of named slots ([`ContextField`]), each with one fixed [`ValueKind`]. Step
//! graphs are validated against these kinds before anything runs, and the executor
//! re-checks them at every step boundary.

use crate::collaborators::{CountSeries, ImageSeries};
use crate::constants::Timestamp;
use crate::error::{Result, TrafficError};
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::step::OutputPath;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Named context slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextField {
    /// Run trigger, carrying the optional `predictFor` override
    Trigger,
    PredictFor,
    CameraIds,
    StationIds,
    StreetIds,
    SectionIds,
    /// Current element inside a Map body
    Item,
    Images,
    CarCounts,
    CarCountPrediction,
    EmergencyVehicleCount,
    CameraResults,
    StationResults,
}

impl ContextField {
    pub fn kind(self) -> ValueKind {
        match self {
            ContextField::Trigger => ValueKind::Trigger,
            ContextField::PredictFor => ValueKind::Timestamp,
            ContextField::CameraIds
            | ContextField::StationIds
            | ContextField::StreetIds
            | ContextField::SectionIds => ValueKind::Ids,
            ContextField::Item => ValueKind::Id,
            ContextField::Images => ValueKind::Images,
            ContextField::CarCounts => ValueKind::CountSeries,
            ContextField::CarCountPrediction | ContextField::EmergencyVehicleCount => ValueKind::Count,
            ContextField::CameraResults | ContextField::StationResults => ValueKind::List,
        }
    }

    /// Slots only the executor itself may write
    pub fn is_reserved(self) -> bool {
        matches!(self, ContextField::Trigger | ContextField::Item)
    }

    pub fn name(self) -> &'static str {
        match self {
            ContextField::Trigger => "trigger",
            ContextField::PredictFor => "predictFor",
            ContextField::CameraIds => "cameraIds",
            ContextField::StationIds => "stationIds",
            ContextField::StreetIds => "streetIds",
            ContextField::SectionIds => "sectionIds",
            ContextField::Item => "item",
            ContextField::Images => "images",
            ContextField::CarCounts => "carCounts",
            ContextField::CarCountPrediction => "carCountPrediction",
            ContextField::EmergencyVehicleCount => "emergencyVehicleCount",
            ContextField::CameraResults => "cameraResults",
            ContextField::StationResults => "stationResults",
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Unit,
    Trigger,
    Timestamp,
    Id,
    Ids,
    Images,
    CountSeries,
    Count,
    Record,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum ContextValue {
    Unit,
    Trigger { predict_for: Option<Timestamp> },
    Timestamp(Timestamp),
    Id(String),
    Ids(Vec<String>),
    Images(ImageSeries),
    CountSeries(CountSeries),
    Count(i64),
    Record(serde_json::Value),
    List(Vec<ContextValue>),
}

impl ContextValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ContextValue::Unit => ValueKind::Unit,
            ContextValue::Trigger { .. } => ValueKind::Trigger,
            ContextValue::Timestamp(_) => ValueKind::Timestamp,
            ContextValue::Id(_) => ValueKind::Id,
            ContextValue::Ids(_) => ValueKind::Ids,
            ContextValue::Images(_) => ValueKind::Images,
            ContextValue::CountSeries(_) => ValueKind::CountSeries,
            ContextValue::Count(_) => ValueKind::Count,
            ContextValue::Record(_) => ValueKind::Record,
            ContextValue::List(_) => ValueKind::List,
        }
    }
}

/// Running context of one workflow scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowContext {
    values: BTreeMap<ContextField, ContextValue>,
}

impl WorkflowContext {
    /// Root context of an evaluation run
    pub fn for_trigger(predict_for: Option<Timestamp>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(ContextField::Trigger, ContextValue::Trigger { predict_for });
        Self { values }
    }

    pub fn get(&self, field: ContextField) -> Option<&ContextValue> {
        self.values.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = ContextField> + '_ {
        self.values.keys().copied()
    }

    /// Scope for one Map item: the shared context plus the item itself
    pub fn with_item(&self, item: ContextValue) -> OrchestrationResult<Self> {
        let mut scoped = self.clone();
        scoped.insert(ContextField::Item, item)?;
        Ok(scoped)
    }

    /// Merge a step result according to its output path
    pub fn apply(&mut self, output: &OutputPath, value: ContextValue) -> OrchestrationResult<()> {
        match output {
            OutputPath::Discard => Ok(()),
            OutputPath::Field(field) => self.insert(*field, value),
        }
    }

    fn insert(&mut self, field: ContextField, value: ContextValue) -> OrchestrationResult<()> {
        if value.kind() != field.kind() {
            return Err(OrchestrationError::Configuration(format!(
                "field '{field}' holds {} values, got {}",
                field.kind(),
                value.kind()
            )));
        }
        self.values.insert(field, value);
        Ok(())
    }

    /// The subset of the context a Task declared as its input
    pub fn select(&self, fields: &[ContextField]) -> OrchestrationResult<UnitInput> {
        let values = fields
            .iter()
            .map(|field| {
                self.values
                    .get(field)
                    .cloned()
                    .map(|value| (*field, value))
                    .ok_or_else(|| {
                        OrchestrationError::Configuration(format!(
                            "input field '{field}' is not present in the context"
                        ))
                    })
            })
            .collect::<OrchestrationResult<BTreeMap<_, _>>>()?;
        Ok(UnitInput { values })
    }
}

/// Input handed to a unit handler. Typed accessors fail with a configuration error
/// when a field was not selected or holds another kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitInput {
    values: BTreeMap<ContextField, ContextValue>,
}

impl UnitInput {
    pub fn from_values(values: impl IntoIterator<Item = (ContextField, ContextValue)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Short description of the current Map item, for logs
    pub fn item_label(&self) -> Option<&str> {
        match self.values.get(&ContextField::Item) {
            Some(ContextValue::Id(id)) => Some(id.as_str()),
            _ => None,
        }
    }

    fn field(&self, field: ContextField) -> Result<&ContextValue> {
        self.values.get(&field).ok_or_else(|| {
            TrafficError::Configuration(format!("field '{field}' was not selected as input"))
        })
    }

    fn mismatch(field: ContextField, value: &ContextValue) -> TrafficError {
        TrafficError::Configuration(format!(
            "field '{field}' expected {}, found {}",
            field.kind(),
            value.kind()
        ))
    }

    pub fn trigger(&self) -> Result<Option<Timestamp>> {
        match self.field(ContextField::Trigger)? {
            ContextValue::Trigger { predict_for } => Ok(*predict_for),
            other => Err(Self::mismatch(ContextField::Trigger, other)),
        }
    }

    pub fn timestamp(&self, field: ContextField) -> Result<Timestamp> {
        match self.field(field)? {
            ContextValue::Timestamp(t) => Ok(*t),
            other => Err(Self::mismatch(field, other)),
        }
    }

    pub fn id(&self, field: ContextField) -> Result<&str> {
        match self.field(field)? {
            ContextValue::Id(id) => Ok(id.as_str()),
            other => Err(Self::mismatch(field, other)),
        }
    }

    pub fn images(&self, field: ContextField) -> Result<&ImageSeries> {
        match self.field(field)? {
            ContextValue::Images(images) => Ok(images),
            other => Err(Self::mismatch(field, other)),
        }
    }

    pub fn count_series(&self, field: ContextField) -> Result<&CountSeries> {
        match self.field(field)? {
            ContextValue::CountSeries(series) => Ok(series),
            other => Err(Self::mismatch(field, other)),
        }
    }

    pub fn count(&self, field: ContextField) -> Result<i64> {
        match self.field(field)? {
            ContextValue::Count(count) => Ok(*count),
            other => Err(Self::mismatch(field, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rejects_kind_mismatch() {
        let mut context = WorkflowContext::for_trigger(None);
        let result = context.apply(
            &OutputPath::Field(ContextField::PredictFor),
            ContextValue::Ids(vec![]),
        );
        assert!(matches!(result, Err(OrchestrationError::Configuration(_))));
        assert!(context.get(ContextField::PredictFor).is_none());
    }

    #[test]
    fn test_discard_leaves_context_untouched() {
        let mut context = WorkflowContext::for_trigger(Some(5));
        let before = context.clone();
        context.apply(&OutputPath::Discard, ContextValue::Count(3)).unwrap();
        assert_eq!(context, before);
    }

    #[test]
    fn test_select_missing_field_fails() {
        let context = WorkflowContext::for_trigger(None);
        assert!(context.select(&[ContextField::PredictFor]).is_err());

        let input = context.select(&[ContextField::Trigger]).unwrap();
        assert_eq!(input.trigger().unwrap(), None);
        assert!(input.timestamp(ContextField::PredictFor).is_err());
    }

    #[test]
    fn test_item_scope_does_not_touch_parent() {
        let parent = WorkflowContext::for_trigger(None);
        let scoped = parent.with_item(ContextValue::Id("street_1".to_string())).unwrap();
        assert!(parent.get(ContextField::Item).is_none());
        let input = scoped.select(&[ContextField::Item]).unwrap();
        assert_eq!(input.item_label(), Some("street_1"));
    }
}
