//! Live handles onto cached queries.
//!
//! A [`Subscription`] pins its entry in the cache and observes every
//! state change through a watch channel: initial load, refetches after
//! invalidation, and fetch failures. Dropping the handle releases the
//! pin; once the last subscriber is gone the entry becomes evictable
//! again.

use tokio::sync::watch;
use voltaic_core::error::VoltaicError;
use voltaic_core::identity::Timestamp;
use voltaic_core::record::Record;

use crate::key::QueryKey;
use crate::query_cache::QueryCache;

/// Observable state of one cached query.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    /// Last successfully fetched records, kept through reloads.
    pub records: Option<Vec<Record>>,
    /// Last fetch failure, cleared by the next success.
    pub error: Option<VoltaicError>,
    /// True while no data has arrived yet or a refetch is pending.
    pub is_loading: bool,
    pub fetched_at: Option<Timestamp>,
}

impl QuerySnapshot {
    /// Records if present, empty slice otherwise.
    pub fn records_or_empty(&self) -> &[Record] {
        self.records.as_deref().unwrap_or(&[])
    }
}

pub struct Subscription {
    cache: QueryCache,
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot>,
}

impl Subscription {
    pub(crate) fn new(
        cache: QueryCache,
        key: QueryKey,
        rx: watch::Receiver<QuerySnapshot>,
    ) -> Self {
        Self { cache, key, rx }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state of the query.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change. Returns false if the cache entry
    /// was torn down.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the query is not loading, then return the settled state.
    pub async fn settled(&mut self) -> QuerySnapshot {
        loop {
            let snapshot = self.rx.borrow().clone();
            if !snapshot.is_loading {
                return snapshot;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_cache::{FetchResult, QueryFetcher};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};
    use voltaic_core::identity::{RecordId, TenantId};
    use voltaic_core::record::EntityKind;

    struct SequenceFetcher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl QueryFetcher for SequenceFetcher {
        async fn fetch(&self) -> FetchResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut fields = serde_json::Map::new();
            fields.insert("generation".to_string(), serde_json::json!(call));
            Ok(vec![Record::new(RecordId::now_v7(), fields)])
        }
    }

    fn setup() -> (QueryCache, Arc<AtomicUsize>, Arc<dyn QueryFetcher>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher: Arc<dyn QueryFetcher> = Arc::new(SequenceFetcher {
            calls: Arc::clone(&calls),
        });
        (QueryCache::in_memory(TenantId::now_v7()), calls, fetcher)
    }

    #[tokio::test]
    async fn test_subscription_loads_initial_data() {
        let (cache, calls, fetcher) = setup();
        let mut sub = cache
            .subscribe(QueryKey::for_kind(EntityKind::Task), fetcher)
            .await;
        let snapshot = sub.settled().await;
        assert_eq!(snapshot.records_or_empty().len(), 1);
        assert!(snapshot.error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_pushes_fresh_data_to_subscriber() {
        let (cache, calls, fetcher) = setup();
        let mut sub = cache
            .subscribe(QueryKey::for_kind(EntityKind::Task), fetcher)
            .await;
        sub.settled().await;

        cache.invalidate_kind(EntityKind::Task);
        let refreshed = timeout(Duration::from_secs(1), sub.settled())
            .await
            .expect("refetch should settle");
        assert_eq!(
            refreshed.records_or_empty()[0].f64_field("generation"),
            Some(1.0)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drop_releases_the_entry() {
        let (cache, _calls, fetcher) = setup();
        let key = QueryKey::for_kind(EntityKind::Task);
        let sub = cache.subscribe(key.clone(), fetcher).await;
        drop(sub);

        // With no subscriber left, invalidation schedules no refetch and
        // the entry is free to be swept once it expires.
        assert_eq!(cache.invalidate_kind(EntityKind::Task), 1);
        tokio::task::yield_now().await;
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_two_subscribers_share_one_entry() {
        let (cache, calls, fetcher) = setup();
        let key = QueryKey::for_kind(EntityKind::Contract);
        let mut first = cache.subscribe(key.clone(), Arc::clone(&fetcher)).await;
        first.settled().await;
        let mut second = cache.subscribe(key.clone(), fetcher).await;
        second.settled().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count(), 1);
    }
}
