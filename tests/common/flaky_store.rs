//! Store wrapper that injects `StoreUnavailable` failures in front of an
//! [`InMemoryStore`].

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use trafficwise_core::error::{Result, TrafficError};
use trafficwise_core::store::{
    Attributes, InMemoryStore, ItemKey, KeyedStore, Projection, QueryPage, QueryRequest, Record,
    SortKeyCondition,
};

pub struct FlakyStore {
    inner: Arc<InMemoryStore>,
    /// Every operation fails until this many failures were served
    transient_failures: AtomicU32,
    /// Puts into this partition always fail
    failing_put_pk: Option<String>,
    /// Queries whose sort-key condition starts with this prefix always fail
    failing_query_prefix: Option<String>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            transient_failures: AtomicU32::new(0),
            failing_put_pk: None,
            failing_query_prefix: None,
        }
    }

    pub fn failing_first(self, failures: u32) -> Self {
        self.transient_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn failing_puts_for(mut self, pk: &str) -> Self {
        self.failing_put_pk = Some(pk.to_string());
        self
    }

    pub fn failing_queries_for(mut self, sk_prefix: &str) -> Self {
        self.failing_query_prefix = Some(sk_prefix.to_string());
        self
    }

    pub fn inner(&self) -> &Arc<InMemoryStore> {
        &self.inner
    }

    fn transient(&self, operation: &str) -> Result<()> {
        let failed = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(TrafficError::store_unavailable(operation, "injected transient failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyedStore for FlakyStore {
    async fn get(&self, key: &ItemKey, projection: &Projection, consistent_read: bool) -> Result<Option<Record>> {
        self.transient("get")?;
        self.inner.get(key, projection, consistent_read).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        self.transient("query")?;
        if let Some(prefix) = &self.failing_query_prefix {
            let condition_prefix = match &request.condition {
                SortKeyCondition::BeginsWith(prefix) => prefix,
                SortKeyCondition::PrefixAfter { prefix, .. } => prefix,
            };
            if condition_prefix.starts_with(prefix.as_str()) {
                return Err(TrafficError::store_unavailable("query", "injected outage"));
            }
        }
        self.inner.query(request).await
    }

    async fn batch_get(&self, keys: &[ItemKey], projection: &Projection) -> Result<Vec<Record>> {
        self.transient("batch_get")?;
        self.inner.batch_get(keys, projection).await
    }

    async fn put(&self, key: ItemKey, attributes: Attributes) -> Result<()> {
        self.transient("put")?;
        if self.failing_put_pk.as_deref() == Some(key.pk.as_str()) {
            return Err(TrafficError::store_unavailable("put", "injected write failure"));
        }
        self.inner.put(key, attributes).await
    }
}
