//! # Entity Catalogs
//!
//! Paginated enumerators over the catalog partition. Listing entries live at
//! `(baseEntity, <type>#<id>)`; each listing follows continuation tokens until the
//! store reports no further page. Order follows arrival and carries no meaning.

use crate::constants::{prefixes, CATALOG_PARTITION};
use crate::error::{Result, TrafficError};
use crate::store::keys::{strip_entity_prefix, type_prefix};
use crate::store::{query_all, KeyedStore, Projection, QueryRequest, SortKeyCondition};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct EntityCatalog {
    store: Arc<dyn KeyedStore>,
}

impl EntityCatalog {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self { store }
    }

    pub async fn list_cameras(&self) -> Result<Vec<String>> {
        self.list(prefixes::CAMERA).await
    }

    pub async fn list_stations(&self) -> Result<Vec<String>> {
        self.list(prefixes::STATION).await
    }

    pub async fn list_streets(&self) -> Result<Vec<String>> {
        self.list(prefixes::STREET).await
    }

    pub async fn list_sections(&self) -> Result<Vec<String>> {
        self.list(prefixes::SECTION).await
    }

    async fn list(&self, entity: &str) -> Result<Vec<String>> {
        // Keys only; listing attributes are irrelevant here
        let request = QueryRequest::new(
            CATALOG_PARTITION,
            SortKeyCondition::BeginsWith(type_prefix(entity)),
        )
        .with_projection(Projection::Attributes(Vec::new()));

        let records = query_all(self.store.as_ref(), request).await?;

        let ids = records
            .iter()
            .map(|record| {
                strip_entity_prefix(entity, &record.key.sk)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        TrafficError::data_integrity(
                            &record.key.pk,
                            &record.key.sk,
                            format!("catalog entry is not a {entity} key"),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(entity = entity, count = ids.len(), "Catalog listed");
        Ok(ids)
    }
}
