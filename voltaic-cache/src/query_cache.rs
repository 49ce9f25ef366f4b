//! Read-through query cache with request coalescing.
//!
//! One entry per [`QueryKey`]. Concurrent readers of the same key share a
//! single gateway fetch: the first caller becomes the leader and runs the
//! fetcher, later callers subscribe to the in-flight result over a
//! broadcast channel. Invalidation bumps an epoch counter per entry, so a
//! fetch that raced an invalidation can never satisfy a later read.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use voltaic_core::error::{CacheError, VoltaicError, VoltaicResult};
use voltaic_core::identity::{TenantId, Timestamp};
use voltaic_core::record::{EntityKind, Record};

use crate::freshness::{CacheRead, Freshness};
use crate::journal::{ChangeJournal, InMemoryChangeJournal, Watermark};
use crate::key::QueryKey;
use crate::subscription::{QuerySnapshot, Subscription};

/// Result of a single gateway fetch, cloneable so it can fan out to
/// every coalesced caller.
pub type FetchResult = Result<Vec<Record>, VoltaicError>;

// ===== FETCHERS =====

/// Source of truth for one query, normally a closure over a gateway call.
#[async_trait::async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self) -> FetchResult;
}

/// Adapter turning an async closure into a [`QueryFetcher`].
pub struct FnFetcher<F>(pub F);

#[async_trait::async_trait]
impl<F, Fut> QueryFetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult> + Send,
{
    async fn fetch(&self) -> FetchResult {
        (self.0)().await
    }
}

// ===== CONFIG & STATS =====

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this are never served, regardless of freshness.
    pub entry_ttl: chrono::Duration,
    /// Unsubscribed entries above this count get evicted oldest-first.
    pub max_entries: usize,
    /// Staleness bound used by [`QueryCache::get`].
    pub default_max_staleness: chrono::Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: chrono::Duration::hours(1),
            max_entries: 1024,
            default_max_staleness: chrono::Duration::seconds(60),
        }
    }
}

impl CacheConfig {
    pub fn with_entry_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_default_max_staleness(mut self, staleness: chrono::Duration) -> Self {
        self.default_max_staleness = staleness;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Reads that joined another caller's in-flight fetch.
    pub coalesced: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

// ===== ENTRIES =====

#[derive(Default)]
struct Entry {
    data: Option<Vec<Record>>,
    error: Option<VoltaicError>,
    fetched_at: Option<Timestamp>,
    watermark: Option<Watermark>,
    /// Bumped by invalidation; an entry is valid only when
    /// `fetched_epoch == epoch`.
    epoch: u64,
    fetched_epoch: u64,
    inflight: Option<broadcast::Sender<FetchResult>>,
    subscribers: usize,
    snapshot_tx: Option<watch::Sender<QuerySnapshot>>,
    fetcher: Option<Arc<dyn QueryFetcher>>,
}

impl Entry {
    fn is_valid(&self) -> bool {
        self.data.is_some() && self.fetched_epoch == self.epoch
    }

    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            records: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.inflight.is_some()
                || (self.data.is_none() && self.error.is_none()),
            fetched_at: self.fetched_at,
        }
    }
}

enum ReadPlan {
    Follow(broadcast::Receiver<FetchResult>),
    Candidate {
        records: Vec<Record>,
        fetched_at: Timestamp,
        watermark: Option<Watermark>,
    },
    Fetch,
}

enum LeadPlan {
    Lead {
        tx: broadcast::Sender<FetchResult>,
        epoch: u64,
    },
    Follow(broadcast::Receiver<FetchResult>),
    Settled(CacheRead<Vec<Record>>),
}

// ===== CACHE =====

/// Process-wide cache over gateway collection queries.
///
/// Cloning is cheap; all clones share one entry table.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    stats: Mutex<CacheStats>,
    journal: Arc<dyn ChangeJournal>,
    tenant: TenantId,
    config: CacheConfig,
}

static GLOBAL: OnceCell<QueryCache> = OnceCell::new();

impl QueryCache {
    pub fn new(tenant: TenantId, journal: Arc<dyn ChangeJournal>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                stats: Mutex::new(CacheStats::default()),
                journal,
                tenant,
                config,
            }),
        }
    }

    /// Cache over an in-process change journal, with default limits.
    pub fn in_memory(tenant: TenantId) -> Self {
        Self::new(
            tenant,
            Arc::new(InMemoryChangeJournal::new()),
            CacheConfig::default(),
        )
    }

    /// Install the process-wide cache. Returns false if one is already
    /// installed.
    pub fn install_global(cache: QueryCache) -> bool {
        GLOBAL.set(cache).is_ok()
    }

    pub fn global() -> Option<&'static QueryCache> {
        GLOBAL.get()
    }

    pub fn tenant(&self) -> TenantId {
        self.inner.tenant
    }

    pub fn journal(&self) -> Arc<dyn ChangeJournal> {
        Arc::clone(&self.inner.journal)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> CacheStats {
        *self.lock_stats()
    }

    pub fn entry_count(&self) -> usize {
        self.lock_entries().len()
    }

    /// Read with the configured default staleness bound.
    pub async fn get(
        &self,
        key: &QueryKey,
        fetcher: &dyn QueryFetcher,
    ) -> VoltaicResult<CacheRead<Vec<Record>>> {
        self.get_with(
            key,
            Freshness::BestEffort {
                max_staleness: self.inner.config.default_max_staleness,
            },
            fetcher,
        )
        .await
    }

    /// Read-through under an explicit freshness contract.
    ///
    /// At most one fetch per key is in flight at a time: concurrent
    /// callers of the same key all receive the one fetch's result.
    pub async fn get_with(
        &self,
        key: &QueryKey,
        freshness: Freshness,
        fetcher: &dyn QueryFetcher,
    ) -> VoltaicResult<CacheRead<Vec<Record>>> {
        let started_at = Utc::now();

        let plan = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_default();
            if let Some(tx) = &entry.inflight {
                ReadPlan::Follow(tx.subscribe())
            } else if entry.is_valid() {
                match (&entry.data, entry.fetched_at) {
                    (Some(records), Some(fetched_at)) => ReadPlan::Candidate {
                        records: records.clone(),
                        fetched_at,
                        watermark: entry.watermark,
                    },
                    _ => ReadPlan::Fetch,
                }
            } else {
                ReadPlan::Fetch
            }
        };

        match plan {
            ReadPlan::Follow(rx) => return self.follow(key, rx).await,
            ReadPlan::Candidate {
                records,
                fetched_at,
                watermark,
            } => {
                if self
                    .is_fresh(key, freshness, fetched_at, watermark.as_ref())
                    .await?
                {
                    self.bump(|s| s.hits += 1);
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(CacheRead::from_cache(records, fetched_at, watermark));
                }
            }
            ReadPlan::Fetch => {}
        }

        // The entry is missing, invalid, or too stale. Become the leader
        // for this key, unless another caller got there between phases.
        let lead = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_default();
            if let Some(tx) = &entry.inflight {
                LeadPlan::Follow(tx.subscribe())
            } else {
                match (&entry.data, entry.fetched_at) {
                    (Some(records), Some(fetched_at))
                        if entry.is_valid() && fetched_at >= started_at =>
                    {
                        // A racing leader finished after we started, so its
                        // result satisfies any freshness contract we hold.
                        LeadPlan::Settled(CacheRead::from_cache(
                            records.clone(),
                            fetched_at,
                            entry.watermark,
                        ))
                    }
                    _ => {
                        let (tx, _rx) = broadcast::channel(8);
                        entry.inflight = Some(tx.clone());
                        LeadPlan::Lead {
                            tx,
                            epoch: entry.epoch,
                        }
                    }
                }
            }
        };

        match lead {
            LeadPlan::Follow(rx) => self.follow(key, rx).await,
            LeadPlan::Settled(read) => {
                self.bump(|s| s.hits += 1);
                Ok(read)
            }
            LeadPlan::Lead { tx, epoch } => self.lead(key, fetcher, tx, epoch).await,
        }
    }

    /// Run the fetch as the leader and fan the outcome out.
    async fn lead(
        &self,
        key: &QueryKey,
        fetcher: &dyn QueryFetcher,
        tx: broadcast::Sender<FetchResult>,
        epoch: u64,
    ) -> VoltaicResult<CacheRead<Vec<Record>>> {
        self.bump(|s| s.misses += 1);
        tracing::debug!(key = %key, "cache miss, fetching");

        let watermark = match self.inner.journal.current_watermark(self.inner.tenant).await {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "journal unavailable, caching without watermark");
                None
            }
        };
        let outcome = fetcher.fetch().await;
        let fetched_at = Utc::now();

        let evicted = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.inflight = None;
            match &outcome {
                Ok(records) => {
                    entry.data = Some(records.clone());
                    entry.error = None;
                    entry.fetched_at = Some(fetched_at);
                    entry.watermark = watermark;
                    entry.fetched_epoch = epoch;
                }
                Err(e) => {
                    entry.error = Some(e.clone());
                }
            }
            if let Some(snap_tx) = &entry.snapshot_tx {
                let _ = snap_tx.send(entry.snapshot());
            }
            let _ = tx.send(outcome.clone());
            Self::evict_excess(&mut entries, self.inner.config.max_entries)
        };
        if evicted > 0 {
            self.bump(|s| s.evictions += evicted);
        }

        outcome.map(|records| CacheRead::from_gateway(records, fetched_at, watermark))
    }

    /// Wait on a leader's in-flight fetch.
    async fn follow(
        &self,
        key: &QueryKey,
        mut rx: broadcast::Receiver<FetchResult>,
    ) -> VoltaicResult<CacheRead<Vec<Record>>> {
        self.bump(|s| s.coalesced += 1);
        tracing::debug!(key = %key, "joining in-flight fetch");
        match rx.recv().await {
            Ok(Ok(records)) => {
                let (fetched_at, watermark) = {
                    let entries = self.lock_entries();
                    match entries.get(key) {
                        Some(entry) => (entry.fetched_at.unwrap_or(Utc::now()), entry.watermark),
                        None => (Utc::now(), None),
                    }
                };
                Ok(CacheRead::from_gateway(records, fetched_at, watermark))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CacheError::FetchAbandoned {
                key: key.to_string(),
            }
            .into()),
        }
    }

    async fn is_fresh(
        &self,
        key: &QueryKey,
        freshness: Freshness,
        fetched_at: Timestamp,
        watermark: Option<&Watermark>,
    ) -> VoltaicResult<bool> {
        let age = Utc::now() - fetched_at;
        if age > self.inner.config.entry_ttl {
            return Ok(false);
        }
        match freshness {
            Freshness::BestEffort { max_staleness } => Ok(age <= max_staleness),
            Freshness::Consistent => {
                let Some(watermark) = watermark else {
                    return Ok(false);
                };
                let kinds: Vec<EntityKind> = key.entity_kind().into_iter().collect();
                let changes = self
                    .inner
                    .journal
                    .changes_since(self.inner.tenant, watermark, &kinds)
                    .await?;
                Ok(changes.is_empty())
            }
        }
    }

    /// Invalidate every entry whose key starts with `prefix` and kick off
    /// background refetches for the subscribed ones. Returns the number of
    /// entries invalidated.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let (count, refetch) = {
            let mut entries = self.lock_entries();
            let mut count = 0;
            let mut refetch = Vec::new();
            for (key, entry) in entries.iter_mut() {
                if !key.starts_with(prefix) {
                    continue;
                }
                entry.epoch += 1;
                count += 1;
                if let Some(snap_tx) = &entry.snapshot_tx {
                    snap_tx.send_modify(|s| s.is_loading = true);
                }
                if entry.subscribers > 0 {
                    if let Some(fetcher) = &entry.fetcher {
                        refetch.push((key.clone(), Arc::clone(fetcher)));
                    }
                }
            }
            (count, refetch)
        };
        tracing::debug!(prefix = %prefix, invalidated = count, "invalidated cache prefix");
        for (key, fetcher) in refetch {
            let cache = self.clone();
            tokio::spawn(async move {
                if let Err(e) = cache
                    .get_with(&key, Freshness::Consistent, fetcher.as_ref())
                    .await
                {
                    tracing::debug!(key = %key, error = %e, "background refetch failed");
                }
            });
        }
        count
    }

    /// Invalidate every query over one entity kind.
    pub fn invalidate_kind(&self, kind: EntityKind) -> usize {
        self.invalidate_prefix(&QueryKey::for_kind(kind))
    }

    /// Subscribe to a query. The entry is fetched if needed and pinned
    /// against eviction; invalidations trigger background refetches whose
    /// results flow to the returned [`Subscription`].
    pub async fn subscribe(&self, key: QueryKey, fetcher: Arc<dyn QueryFetcher>) -> Subscription {
        let rx = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.subscribers += 1;
            entry.fetcher = Some(Arc::clone(&fetcher));
            match &entry.snapshot_tx {
                Some(tx) => tx.subscribe(),
                None => {
                    let (tx, rx) = watch::channel(entry.snapshot());
                    entry.snapshot_tx = Some(tx);
                    rx
                }
            }
        };
        // Populate or refresh; a failure lands in the snapshot rather
        // than here.
        if let Err(e) = self.get_with(&key, Freshness::Consistent, fetcher.as_ref()).await {
            tracing::debug!(key = %key, error = %e, "initial subscription fetch failed");
        }
        Subscription::new(self.clone(), key, rx)
    }

    pub(crate) fn release(&self, key: &QueryKey) {
        let mut entries = self.lock_entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.fetcher = None;
                entry.snapshot_tx = None;
            }
        }
    }

    /// Drop expired, unsubscribed entries. Returns the count removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let ttl = self.inner.config.entry_ttl;
        let removed = {
            let mut entries = self.lock_entries();
            let before = entries.len();
            entries.retain(|_, e| {
                e.subscribers > 0
                    || e.inflight.is_some()
                    || e.fetched_at.map_or(false, |t| now - t <= ttl)
            });
            before - entries.len()
        };
        if removed > 0 {
            self.bump(|s| s.evictions += removed as u64);
        }
        removed
    }

    fn evict_excess(entries: &mut HashMap<QueryKey, Entry>, max_entries: usize) -> u64 {
        let mut evicted = 0;
        while entries.len() > max_entries {
            let victim = entries
                .iter()
                .filter(|(_, e)| e.subscribers == 0 && e.inflight.is_none())
                .min_by_key(|(_, e)| e.fetched_at.unwrap_or(DateTime::<Utc>::MIN_UTC))
                .map(|(k, _)| k.clone());
            match victim {
                Some(key) => {
                    entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_stats(&self) -> MutexGuard<'_, CacheStats> {
        self.inner
            .stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut self.lock_stats());
    }
}
