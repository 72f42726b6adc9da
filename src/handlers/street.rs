use crate::aggregation::LimitChecker;
use crate::error::Result;
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use crate::orchestration::handler::UnitHandler;
use async_trait::async_trait;

/// Runs the limit check of one street
pub struct CheckLimitsHandler {
    checker: LimitChecker,
}

impl CheckLimitsHandler {
    pub fn new(checker: LimitChecker) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl UnitHandler for CheckLimitsHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Item, ContextField::PredictFor]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Unit
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let street_id = input.id(ContextField::Item)?;
        let predict_for = input.timestamp(ContextField::PredictFor)?;
        self.checker.check_street(street_id, predict_for).await?;
        Ok(ContextValue::Unit)
    }
}
