//! In-process store engine.
//!
//! Ordered map of `(PK, SK) -> attributes` behind a read/write lock. Pages are capped at
//! a configurable size so pagination is exercised with realistic data volumes.
//! Every read sees the latest write; the consistent-read flag is only counted.

use super::{Attributes, ContinuationToken, ItemKey, KeyedStore, Projection, QueryPage, QueryRequest, Record};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Calls served so far, per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub get: u64,
    pub query: u64,
    pub batch_get: u64,
    pub put: u64,
    /// Gets and queries that asked for a consistent read
    pub consistent_reads: u64,
}

#[derive(Debug, Default)]
struct Counters {
    get: AtomicU64,
    query: AtomicU64,
    batch_get: AtomicU64,
    put: AtomicU64,
    consistent_reads: AtomicU64,
}

#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<ItemKey, Attributes>>,
    page_size: usize,
    counters: Counters,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(crate::constants::defaults::STORE_PAGE_SIZE)
    }
}

impl InMemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            counters: Counters::default(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Synchronous upsert for provisioning and test fixtures
    pub fn insert(&self, key: ItemKey, attributes: Attributes) {
        self.records.write().insert(key, attributes);
    }

    /// Synchronous lookup for assertions
    pub fn snapshot(&self, key: &ItemKey) -> Option<Attributes> {
        self.records.read().get(key).cloned()
    }

    /// Every key of a partition whose sort key starts with `sk_prefix`
    pub fn keys_with_prefix(&self, pk: &str, sk_prefix: &str) -> Vec<ItemKey> {
        self.records
            .read()
            .range(ItemKey::new(pk, sk_prefix)..)
            .take_while(|(key, _)| key.pk == pk && key.sk.starts_with(sk_prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn operation_counts(&self) -> OperationCounts {
        OperationCounts {
            get: self.counters.get.load(Ordering::Relaxed),
            query: self.counters.query.load(Ordering::Relaxed),
            batch_get: self.counters.batch_get.load(Ordering::Relaxed),
            put: self.counters.put.load(Ordering::Relaxed),
            consistent_reads: self.counters.consistent_reads.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl KeyedStore for InMemoryStore {
    async fn get(
        &self,
        key: &ItemKey,
        projection: &Projection,
        consistent_read: bool,
    ) -> Result<Option<Record>> {
        self.counters.get.fetch_add(1, Ordering::Relaxed);
        if consistent_read {
            self.counters.consistent_reads.fetch_add(1, Ordering::Relaxed);
        }
        Ok(self.records.read().get(key).map(|attributes| Record {
            key: key.clone(),
            attributes: projection.apply(attributes),
        }))
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        self.counters.query.fetch_add(1, Ordering::Relaxed);
        if request.consistent_read {
            self.counters.consistent_reads.fetch_add(1, Ordering::Relaxed);
        }
        let records = self.records.read();

        let mut matching: Vec<(&ItemKey, &Attributes)> = records
            .range(ItemKey::new(request.pk.as_str(), "")..)
            .take_while(|(key, _)| key.pk == request.pk)
            .filter(|(key, _)| request.condition.matches(&key.sk))
            .collect();

        if !request.scan_forward {
            matching.reverse();
        }

        if let Some(token) = &request.start_after {
            let resume_sk = token.last_evaluated().sk.as_str();
            let resume_at = matching
                .iter()
                .position(|(key, _)| {
                    if request.scan_forward {
                        key.sk.as_str() > resume_sk
                    } else {
                        key.sk.as_str() < resume_sk
                    }
                })
                .unwrap_or(matching.len());
            matching.drain(..resume_at);
        }

        let page_len = request
            .limit
            .map_or(self.page_size, |limit| limit.min(self.page_size));
        let has_more = matching.len() > page_len;
        matching.truncate(page_len);

        let next_token = if has_more {
            matching
                .last()
                .map(|(key, _)| ContinuationToken::new((*key).clone()))
        } else {
            None
        };

        trace!(
            pk = %request.pk,
            returned = matching.len(),
            has_more = has_more,
            "In-memory query page"
        );

        Ok(QueryPage {
            records: matching
                .into_iter()
                .map(|(key, attributes)| Record {
                    key: key.clone(),
                    attributes: request.projection.apply(attributes),
                })
                .collect(),
            next_token,
        })
    }

    async fn batch_get(&self, keys: &[ItemKey], projection: &Projection) -> Result<Vec<Record>> {
        self.counters.batch_get.fetch_add(1, Ordering::Relaxed);
        let records = self.records.read();
        Ok(keys
            .iter()
            .filter_map(|key| {
                records.get(key).map(|attributes| Record {
                    key: key.clone(),
                    attributes: projection.apply(attributes),
                })
            })
            .collect())
    }

    async fn put(&self, key: ItemKey, attributes: Attributes) -> Result<()> {
        self.counters.put.fetch_add(1, Ordering::Relaxed);
        self.records.write().insert(key, attributes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{query_all, SortKeyCondition};
    use serde_json::json;

    fn attrs(value: i64) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("value".to_string(), json!(value));
        attributes
    }

    fn seeded(page_size: usize, count: usize) -> InMemoryStore {
        let store = InMemoryStore::new(page_size);
        for i in 0..count {
            store.insert(ItemKey::new("p", format!("item#{i:03}")), attrs(i as i64));
        }
        store.insert(ItemKey::new("p", "other#000"), attrs(-1));
        store.insert(ItemKey::new("q", "item#000"), attrs(-2));
        store
    }

    #[tokio::test]
    async fn test_query_pages_follow_tokens() {
        let store = seeded(3, 7);
        let request = QueryRequest::new("p", SortKeyCondition::BeginsWith("item#".to_string()));

        let first = store.query(&request).await.unwrap();
        assert_eq!(first.records.len(), 3);
        assert!(first.next_token.is_some());

        let all = query_all(&store, request).await.unwrap();
        let sks: Vec<_> = all.iter().map(|r| r.key.sk.clone()).collect();
        assert_eq!(sks.len(), 7);
        assert_eq!(sks.first().map(String::as_str), Some("item#000"));
        assert_eq!(sks.last().map(String::as_str), Some("item#006"));
    }

    #[tokio::test]
    async fn test_descending_scan_with_limit() {
        let store = seeded(10, 5);
        let request = QueryRequest::new("p", SortKeyCondition::BeginsWith("item#".to_string()))
            .newest_first()
            .with_limit(1);

        let page = store.query(&request).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].key.sk, "item#004");
        assert!(page.next_token.is_some());
        assert_eq!(store.operation_counts().consistent_reads, 0);

        let all = query_all(&store, request).await.unwrap();
        let values: Vec<_> = all.iter().map(|r| r.attributes["value"].clone()).collect();
        assert_eq!(values, vec![json!(4), json!(3), json!(2), json!(1), json!(0)]);
    }

    #[tokio::test]
    async fn test_empty_partition_returns_no_token() {
        let store = InMemoryStore::new(2);
        let page = store
            .query(&QueryRequest::new("missing", SortKeyCondition::BeginsWith(String::new())))
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_batch_get_skips_absent_keys() {
        let store = seeded(10, 2);
        let keys = vec![
            ItemKey::new("p", "item#001"),
            ItemKey::new("p", "item#999"),
            ItemKey::new("p", "item#000"),
        ];
        let records = store.batch_get(&keys, &Projection::All).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.operation_counts().batch_get, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = InMemoryStore::default();
        let key = ItemKey::new("street#s", "info#1");
        store.put(key.clone(), attrs(1)).await.unwrap();
        store.put(key.clone(), attrs(2)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot(&key).unwrap()["value"], json!(2));
    }
}
