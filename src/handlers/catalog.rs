use crate::catalog::EntityCatalog;
use crate::error::Result;
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use crate::orchestration::handler::UnitHandler;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Camera,
    Station,
    Street,
    Section,
}

/// Lists every id of one entity type from the catalog
pub struct ListEntitiesHandler {
    catalog: EntityCatalog,
    kind: EntityKind,
}

impl ListEntitiesHandler {
    pub fn new(catalog: EntityCatalog, kind: EntityKind) -> Self {
        Self { catalog, kind }
    }
}

#[async_trait]
impl UnitHandler for ListEntitiesHandler {
    fn required_inputs(&self) -> &'static [ContextField] {
        &[]
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Ids
    }

    async fn invoke(&self, _input: &UnitInput) -> Result<ContextValue> {
        let ids = match self.kind {
            EntityKind::Camera => self.catalog.list_cameras().await?,
            EntityKind::Station => self.catalog.list_stations().await?,
            EntityKind::Street => self.catalog.list_streets().await?,
            EntityKind::Section => self.catalog.list_sections().await?,
        };
        debug!(entity = ?self.kind, count = ids.len(), "Listed catalog entities");
        Ok(ContextValue::Ids(ids))
    }
}
