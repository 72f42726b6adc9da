use super::call_collaborator;
use crate::collaborators::InfoDeterminer;
use crate::error::Result;
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use crate::orchestration::handler::UnitHandler;
use crate::orchestration::retry::RetryPolicy;
use async_trait::async_trait;
use std::sync::Arc;

/// Hands one section to the info-determination collaborator, which writes the
/// section's display info itself
pub struct DetermineInfoHandler {
    determiner: Arc<dyn InfoDeterminer>,
    retry: RetryPolicy,
}

impl DetermineInfoHandler {
    pub fn new(determiner: Arc<dyn InfoDeterminer>, retry: RetryPolicy) -> Self {
        Self { determiner, retry }
    }
}

#[async_trait]
impl UnitHandler for DetermineInfoHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[ContextField::Item, ContextField::PredictFor]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Unit
    }

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue> {
        let section_id = input.id(ContextField::Item)?;
        let predict_for = input.timestamp(ContextField::PredictFor)?;
        let determiner = self.determiner.as_ref();
        call_collaborator(&self.retry, "info_determiner", move || {
            determiner.determine(predict_for, section_id)
        })
        .await?;
        Ok(ContextValue::Unit)
    }
}
