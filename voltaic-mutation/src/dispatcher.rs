//! Single-write mutation dispatch.
//!
//! A [`Mutator`] owns the pending flag for one submission surface (a
//! form, a dialog). `is_pending()` is true strictly between dispatch and
//! settle; the flag is held by a guard so early returns and panics
//! release it. Success runs the declared journal records, invalidations,
//! and the `on_success` hook, in that order; failure runs `on_error` and
//! nothing else. A cancelled dispatch runs neither.

use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use voltaic_cache::{QueryCache, QueryKey};
use voltaic_core::error::{MutationError, VoltaicError, VoltaicResult};
use voltaic_core::identity::RecordId;
use voltaic_core::record::EntityKind;

use crate::saga::{Saga, SagaContext};

/// How a dispatched mutation resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The write settled successfully with this gateway output.
    Completed(Value),
    /// The caller's scope ended first; no callbacks ran, nothing was
    /// invalidated.
    Cancelled,
}

/// How a dispatched saga resolved.
#[derive(Debug, Clone)]
pub enum SagaOutcome {
    Completed(SagaContext),
    Cancelled,
}

type SuccessHook = Box<dyn FnOnce(&Value) + Send + Sync>;
type ErrorHook = Box<dyn FnOnce(&VoltaicError) + Send + Sync>;

/// Declarative wrapper around one mutation: what to invalidate, what to
/// journal, and which hooks to fire once the write settles.
#[derive(Default)]
pub struct MutationSpec {
    invalidates: Vec<QueryKey>,
    record_changes: Vec<(EntityKind, RecordId)>,
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
}

impl MutationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate this key prefix after a successful write.
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Record this write in the change journal after success, so
    /// consistent reads elsewhere see it.
    pub fn records_change(mut self, kind: EntityKind, id: RecordId) -> Self {
        self.record_changes.push((kind, id));
        self
    }

    pub fn on_success(mut self, hook: impl FnOnce(&Value) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnOnce(&VoltaicError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

/// Guard owning the pending flag for the duration of one dispatch.
struct PendingGuard {
    flag: Arc<AtomicBool>,
}

impl PendingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, MutationError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MutationError::AlreadyPending);
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct Mutator {
    cache: QueryCache,
    pending: Arc<AtomicBool>,
}

impl Mutator {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// True strictly between dispatch and settle.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Dispatch a single write with no cancellation scope.
    pub async fn dispatch<F, Fut>(
        &self,
        spec: MutationSpec,
        write: F,
    ) -> VoltaicResult<MutationOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VoltaicResult<Value>>,
    {
        self.dispatch_scoped(spec, write, &CancellationToken::new())
            .await
    }

    /// Dispatch a single write, abandoning it if `scope` is cancelled
    /// first. A cancelled write runs no hooks and invalidates nothing.
    pub async fn dispatch_scoped<F, Fut>(
        &self,
        spec: MutationSpec,
        write: F,
        scope: &CancellationToken,
    ) -> VoltaicResult<MutationOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VoltaicResult<Value>>,
    {
        let _guard = PendingGuard::acquire(&self.pending)?;
        let write = write();
        tokio::pin!(write);
        let result = tokio::select! {
            _ = scope.cancelled() => {
                tracing::debug!("mutation cancelled before settling");
                return Ok(MutationOutcome::Cancelled);
            }
            result = &mut write => result,
        };
        match result {
            Ok(output) => {
                self.settle_success(&spec).await;
                if let Some(hook) = spec.on_success {
                    hook(&output);
                }
                Ok(MutationOutcome::Completed(output))
            }
            Err(error) => {
                if let Some(hook) = spec.on_error {
                    hook(&error);
                }
                Err(error)
            }
        }
    }

    /// Dispatch a chained write. On step failure the saga compensates
    /// (unless built `without_compensation`) and the failure maps to a
    /// [`MutationError`]. Cancellation abandons the chain where it
    /// stands, without compensation.
    pub async fn dispatch_saga(
        &self,
        spec: MutationSpec,
        saga: Saga,
        scope: &CancellationToken,
    ) -> VoltaicResult<SagaOutcome> {
        let _guard = PendingGuard::acquire(&self.pending)?;
        let run = saga.run();
        tokio::pin!(run);
        let result = tokio::select! {
            _ = scope.cancelled() => {
                tracing::debug!("saga cancelled before settling");
                return Ok(SagaOutcome::Cancelled);
            }
            result = &mut run => result,
        };
        match result {
            Ok(ctx) => {
                self.settle_success(&spec).await;
                if let Some(hook) = spec.on_success {
                    hook(&Value::Null);
                }
                Ok(SagaOutcome::Completed(ctx))
            }
            Err(failure) => {
                let error: VoltaicError = failure.into_mutation_error().into();
                if let Some(hook) = spec.on_error {
                    hook(&error);
                }
                Err(error)
            }
        }
    }

    async fn settle_success(&self, spec: &MutationSpec) {
        for (kind, id) in &spec.record_changes {
            if let Err(e) = self
                .cache
                .journal()
                .record_change(self.cache.tenant(), *kind, *id)
                .await
            {
                tracing::debug!(kind = %kind, error = %e, "failed to journal change");
            }
        }
        for prefix in &spec.invalidates {
            self.cache.invalidate_prefix(prefix);
        }
    }
}
