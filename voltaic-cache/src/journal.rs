//! Change journal backing the consistent-read path.
//!
//! Every successful write appends a change for its tenant; the cache
//! compares an entry's watermark against the journal to decide whether a
//! "consistent" read can be served from memory. Sequences are per-tenant
//! and strictly monotonic.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use voltaic_core::error::CacheError;
use voltaic_core::identity::{RecordId, TenantId, Timestamp};
use voltaic_core::record::EntityKind;

/// A point in a tenant's change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub sequence: u64,
    pub observed_at: Timestamp,
}

impl Watermark {
    pub fn origin() -> Self {
        Self {
            sequence: 0,
            observed_at: Utc::now(),
        }
    }
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub sequence: u64,
    pub kind: EntityKind,
    pub record_id: RecordId,
    pub recorded_at: Timestamp,
}

#[async_trait]
pub trait ChangeJournal: Send + Sync {
    /// Current high-water mark for a tenant.
    async fn current_watermark(&self, tenant: TenantId) -> Result<Watermark, CacheError>;

    /// Append a change and return its watermark.
    async fn record_change(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        record_id: RecordId,
    ) -> Result<Watermark, CacheError>;

    /// Changes after `since`, optionally narrowed to some kinds.
    /// An empty `kinds` slice means all kinds.
    async fn changes_since(
        &self,
        tenant: TenantId,
        since: &Watermark,
        kinds: &[EntityKind],
    ) -> Result<Vec<ChangeEntry>, CacheError>;

    /// Drop entries at or below `up_to` for a tenant. Returns the count removed.
    async fn prune(&self, tenant: TenantId, up_to: &Watermark) -> Result<usize, CacheError>;
}

/// In-process journal, one change stream per tenant.
#[derive(Debug, Default)]
pub struct InMemoryChangeJournal {
    streams: RwLock<HashMap<TenantId, TenantStream>>,
}

#[derive(Debug, Default)]
struct TenantStream {
    next_sequence: u64,
    entries: Vec<ChangeEntry>,
}

impl InMemoryChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChangeJournal for InMemoryChangeJournal {
    async fn current_watermark(&self, tenant: TenantId) -> Result<Watermark, CacheError> {
        let streams = self.streams.read().await;
        let sequence = streams.get(&tenant).map(|s| s.next_sequence).unwrap_or(0);
        Ok(Watermark {
            sequence,
            observed_at: Utc::now(),
        })
    }

    async fn record_change(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        record_id: RecordId,
    ) -> Result<Watermark, CacheError> {
        let mut streams = self.streams.write().await;
        let stream = streams.entry(tenant).or_default();
        stream.next_sequence += 1;
        let entry = ChangeEntry {
            sequence: stream.next_sequence,
            kind,
            record_id,
            recorded_at: Utc::now(),
        };
        let watermark = Watermark {
            sequence: entry.sequence,
            observed_at: entry.recorded_at,
        };
        stream.entries.push(entry);
        Ok(watermark)
    }

    async fn changes_since(
        &self,
        tenant: TenantId,
        since: &Watermark,
        kinds: &[EntityKind],
    ) -> Result<Vec<ChangeEntry>, CacheError> {
        let streams = self.streams.read().await;
        let Some(stream) = streams.get(&tenant) else {
            return Ok(Vec::new());
        };
        Ok(stream
            .entries
            .iter()
            .filter(|e| e.sequence > since.sequence)
            .filter(|e| kinds.is_empty() || kinds.contains(&e.kind))
            .cloned()
            .collect())
    }

    async fn prune(&self, tenant: TenantId, up_to: &Watermark) -> Result<usize, CacheError> {
        let mut streams = self.streams.write().await;
        let Some(stream) = streams.get_mut(&tenant) else {
            return Ok(0);
        };
        let before = stream.entries.len();
        stream.entries.retain(|e| e.sequence > up_to.sequence);
        Ok(before - stream.entries.len())
    }
}
