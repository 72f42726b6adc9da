use crate::collaborators::Clock;
use crate::error::{Result, TrafficError};
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use crate::orchestration::handler::UnitHandler;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Decides the evaluation timestamp: the trigger's override when present, otherwise
/// the clock's current time.
pub struct PredictForHandler {
    clock: Arc<dyn Clock>,
}

impl PredictForHandler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl UnitHandler for PredictForHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Trigger]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Timestamp
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let override_value = input.trigger()?;
        let predict_for = override_value.unwrap_or_else(|| self.clock.now());
        if predict_for < 0 {
            return Err(TrafficError::Validation(format!(
                "predictFor must be a non-negative POSIX timestamp, got {predict_for}"
            )));
        }

        info!(
            predict_for = predict_for,
            overridden = override_value.is_some(),
            "⏱️ Evaluation timestamp determined"
        );
        Ok(ContextValue::Timestamp(predict_for))
    }
}
