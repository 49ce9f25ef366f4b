//! Voltaic Cache - query cache layer between the views and the gateway.
//!
//! Collection reads go through a process-wide [`QueryCache`] keyed by
//! entity kind and query shape. The cache coalesces concurrent fetches,
//! honors per-read freshness contracts against a tenant-scoped change
//! journal, and pushes refetched data to live subscriptions after
//! invalidation.

pub mod freshness;
pub mod journal;
pub mod key;
pub mod query_cache;
pub mod subscription;

pub use freshness::{CacheRead, Freshness};
pub use journal::{ChangeEntry, ChangeJournal, InMemoryChangeJournal, Watermark};
pub use key::QueryKey;
pub use query_cache::{CacheConfig, CacheStats, FetchResult, FnFetcher, QueryCache, QueryFetcher};
pub use subscription::{QuerySnapshot, Subscription};
