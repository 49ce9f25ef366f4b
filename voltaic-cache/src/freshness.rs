//! Freshness contract for cache reads.
//!
//! Callers state how stale a cached collection may be; the cache decides
//! between serving the entry and going back to the gateway. Reads carry
//! their provenance so callers can surface "last updated" in the UI.

use chrono::{Duration, Utc};
use voltaic_core::identity::Timestamp;

use crate::journal::Watermark;

/// How fresh a read must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve cached data if it was fetched within `max_staleness`,
    /// without consulting the change journal.
    BestEffort { max_staleness: Duration },
    /// Serve cached data only if the change journal shows no relevant
    /// writes since the entry was fetched.
    Consistent,
}

impl Default for Freshness {
    fn default() -> Self {
        Freshness::Consistent
    }
}

impl Freshness {
    pub fn best_effort_secs(secs: i64) -> Self {
        Freshness::BestEffort {
            max_staleness: Duration::seconds(secs),
        }
    }
}

/// A value read through the cache, with staleness metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    fetched_at: Timestamp,
    watermark: Option<Watermark>,
    cache_hit: bool,
}

impl<T> CacheRead<T> {
    pub fn from_cache(value: T, fetched_at: Timestamp, watermark: Option<Watermark>) -> Self {
        Self {
            value,
            fetched_at,
            watermark,
            cache_hit: true,
        }
    }

    pub fn from_gateway(value: T, fetched_at: Timestamp, watermark: Option<Watermark>) -> Self {
        Self {
            value,
            fetched_at,
            watermark,
            cache_hit: false,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    pub fn watermark(&self) -> Option<&Watermark> {
        self.watermark.as_ref()
    }

    pub fn was_cache_hit(&self) -> bool {
        self.cache_hit
    }

    /// Age of the value at the time of the call.
    pub fn staleness(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}
