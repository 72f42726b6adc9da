//! # Keyed Store Client
//!
//! Typed access to the single composite-key `(PK, SK)` store every evaluation reads from
//! and writes to.
//!
//! ## Contract
//!
//! - `get`: point lookup, `None` when absent
//! - `query`: one page of a partition, filtered by a sort-key condition, in either scan
//!   direction, with a continuation token when more pages remain
//! - `batch_get`: many point lookups in one call; absent keys are simply missing
//! - `put`: idempotent upsert
//!
//! Transport/auth failures surface as [`TrafficError::StoreUnavailable`] and are retried
//! by the caller. A required record that is absent after a successful call is a
//! [`TrafficError::DataIntegrity`] error, see [`require`].
//!
//! Implementations are shared by many in-flight invocations and take no client-side
//! locks beyond their own internals; concurrent upserts of one key are last-writer-wins.

pub mod keys;
pub mod memory;

use crate::error::{Result, TrafficError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use keys::ItemKey;
pub use memory::{InMemoryStore, OperationCounts};

pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A stored item: its key plus (possibly projected) attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: ItemKey,
    pub attributes: Attributes,
}

impl Record {
    /// Decode the attributes into a typed model. Malformed data is an integrity error.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.attributes.clone())).map_err(|e| {
            TrafficError::data_integrity(&self.key.pk, &self.key.sk, format!("malformed record: {e}"))
        })
    }
}

/// Serialize a model into store attributes.
pub fn encode<T: Serialize>(value: &T) -> Result<Attributes> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(TrafficError::Validation(format!(
            "store attributes must be an object, got {other}"
        ))),
    }
}

/// Which attributes to return
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projection {
    #[default]
    All,
    Attributes(Vec<String>),
}

impl Projection {
    pub fn of(names: &[&str]) -> Self {
        Self::Attributes(names.iter().map(|name| (*name).to_string()).collect())
    }

    pub fn apply(&self, attributes: &Attributes) -> Attributes {
        match self {
            Projection::All => attributes.clone(),
            Projection::Attributes(names) => attributes
                .iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Sort-key restriction within one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    /// `begins_with(SK, prefix)`
    BeginsWith(String),
    /// `SK` starts with `prefix` and is strictly greater than `after`: the open range
    /// `(after, end of prefix)`
    PrefixAfter { prefix: String, after: String },
}

impl SortKeyCondition {
    pub fn matches(&self, sk: &str) -> bool {
        match self {
            SortKeyCondition::BeginsWith(prefix) => sk.starts_with(prefix.as_str()),
            SortKeyCondition::PrefixAfter { prefix, after } => {
                sk.starts_with(prefix.as_str()) && sk > after.as_str()
            }
        }
    }
}

/// Resume point of a paginated query: the last key the previous page evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(ItemKey);

impl ContinuationToken {
    pub fn new(last_evaluated: ItemKey) -> Self {
        Self(last_evaluated)
    }

    pub fn last_evaluated(&self) -> &ItemKey {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub pk: String,
    pub condition: SortKeyCondition,
    pub projection: Projection,
    pub consistent_read: bool,
    /// `false` scans newest-first (descending sort key)
    pub scan_forward: bool,
    /// Cap on records in this page, on top of the store's own page size
    pub limit: Option<usize>,
    pub start_after: Option<ContinuationToken>,
}

impl QueryRequest {
    pub fn new(pk: impl Into<String>, condition: SortKeyCondition) -> Self {
        Self {
            pk: pk.into(),
            condition,
            projection: Projection::All,
            consistent_read: false,
            scan_forward: true,
            limit: None,
            start_after: None,
        }
    }

    pub fn newest_first(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn starting_after(mut self, token: Option<ContinuationToken>) -> Self {
        self.start_after = token;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub records: Vec<Record>,
    pub next_token: Option<ContinuationToken>,
}

#[async_trait]
pub trait KeyedStore: Send + Sync {
    async fn get(&self, key: &ItemKey, projection: &Projection, consistent_read: bool)
        -> Result<Option<Record>>;

    async fn query(&self, request: &QueryRequest) -> Result<QueryPage>;

    async fn batch_get(&self, keys: &[ItemKey], projection: &Projection) -> Result<Vec<Record>>;

    async fn put(&self, key: ItemKey, attributes: Attributes) -> Result<()>;
}

/// Point lookup of a record that must exist.
pub async fn require(
    store: &dyn KeyedStore,
    key: &ItemKey,
    projection: &Projection,
    consistent_read: bool,
) -> Result<Record> {
    store
        .get(key, projection, consistent_read)
        .await?
        .ok_or_else(|| TrafficError::data_integrity(&key.pk, &key.sk, "required record not found"))
}

/// Run a query to exhaustion, following continuation tokens. Each page is appended
/// before the next one is requested.
pub async fn query_all(store: &dyn KeyedStore, request: QueryRequest) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut request = request;
    loop {
        let page = store.query(&request).await?;
        records.extend(page.records);
        match page.next_token {
            Some(token) => request = request.starting_after(Some(token)),
            None => break,
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefix_after_is_open_range() {
        let condition = SortKeyCondition::PrefixAfter {
            prefix: "image#".to_string(),
            after: "image#0005".to_string(),
        };
        assert!(!condition.matches("image#0005"));
        assert!(condition.matches("image#0006"));
        assert!(!condition.matches("image#0004"));
        assert!(!condition.matches("trafficCount#0009"));
    }

    #[test]
    fn test_projection_keeps_named_attributes() {
        let mut attributes = Attributes::new();
        attributes.insert("a".to_string(), json!(1));
        attributes.insert("b".to_string(), json!(2));

        let projected = Projection::of(&["b"]).apply(&attributes);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get("b"), Some(&json!(2)));
        assert_eq!(Projection::All.apply(&attributes).len(), 2);
    }

    #[test]
    fn test_decode_malformed_record_is_integrity_error() {
        let mut attributes = Attributes::new();
        attributes.insert("airQuality".to_string(), json!("not a number"));
        let record = Record {
            key: ItemKey::new("station#s1", "prediction#1"),
            attributes,
        };

        let result = record.decode::<crate::models::AirQualityPrediction>();
        assert!(matches!(result, Err(TrafficError::DataIntegrity { .. })));
    }
}
