//! Compensating sagas for chained writes.
//!
//! A saga is an ordered list of named steps. Actions run strictly one
//! after another; each action sees the outputs of every step before it,
//! which is how a ledger entry learns the id of the payable created one
//! step earlier. When a step fails, the compensations of the completed
//! steps run in reverse order so a half-finished chain does not leave
//! orphaned records behind.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use uuid::Uuid;
use voltaic_core::error::{MutationError, VoltaicError, VoltaicResult};
use voltaic_core::identity::RecordId;

/// Accumulated outputs of the completed steps, keyed by step name.
#[derive(Debug, Clone, Default)]
pub struct SagaContext {
    outputs: HashMap<String, Value>,
}

impl SagaContext {
    pub fn output(&self, step: &str) -> Option<&Value> {
        self.outputs.get(step)
    }

    /// The `id` field of a step's output, parsed as a record id.
    pub fn record_id(&self, step: &str) -> Option<RecordId> {
        self.outputs
            .get(step)
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Uuid>().ok())
            .map(RecordId::from)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    fn insert(&mut self, step: String, output: Value) {
        self.outputs.insert(step, output);
    }
}

type ActionFn = Box<dyn Fn(SagaContext) -> BoxFuture<'static, VoltaicResult<Value>> + Send + Sync>;
type CompensateFn = Box<dyn Fn(SagaContext) -> BoxFuture<'static, VoltaicResult<()>> + Send + Sync>;

struct Step {
    name: String,
    action: ActionFn,
    compensate: Option<CompensateFn>,
}

/// Why a saga stopped, and what happened while unwinding.
#[derive(Debug)]
pub struct SagaFailure {
    pub failed_step: String,
    pub error: VoltaicError,
    /// Compensations that themselves failed, in the order they ran.
    pub compensation_errors: Vec<(String, VoltaicError)>,
}

impl SagaFailure {
    pub fn into_mutation_error(self) -> MutationError {
        if let Some((step, error)) = self.compensation_errors.into_iter().next() {
            MutationError::CompensationFailed {
                step,
                reason: error.to_string(),
            }
        } else {
            MutationError::ChainFailed {
                step: self.failed_step,
                reason: self.error.to_string(),
            }
        }
    }
}

pub struct Saga {
    steps: Vec<Step>,
    compensate_on_failure: bool,
}

impl Default for Saga {
    fn default() -> Self {
        Self::new()
    }
}

impl Saga {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            compensate_on_failure: true,
        }
    }

    /// Fire-and-forget chain: completed steps stay as they are when a
    /// later step fails.
    pub fn without_compensation(mut self) -> Self {
        self.compensate_on_failure = false;
        self
    }

    pub fn step<F, Fut>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(SagaContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VoltaicResult<Value>> + Send + 'static,
    {
        self.steps.push(Step {
            name: name.into(),
            action: Box::new(move |ctx| Box::pin(action(ctx))),
            compensate: None,
        });
        self
    }

    pub fn step_with_compensation<F, Fut, C, CFut>(
        mut self,
        name: impl Into<String>,
        action: F,
        compensate: C,
    ) -> Self
    where
        F: Fn(SagaContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VoltaicResult<Value>> + Send + 'static,
        C: Fn(SagaContext) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = VoltaicResult<()>> + Send + 'static,
    {
        self.steps.push(Step {
            name: name.into(),
            action: Box::new(move |ctx| Box::pin(action(ctx))),
            compensate: Some(Box::new(move |ctx| Box::pin(compensate(ctx)))),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the chain to completion or unwind it.
    pub async fn run(self) -> Result<SagaContext, SagaFailure> {
        let mut ctx = SagaContext::default();
        for index in 0..self.steps.len() {
            let step = &self.steps[index];
            tracing::debug!(step = %step.name, "running saga step");
            match (step.action)(ctx.clone()).await {
                Ok(output) => ctx.insert(step.name.clone(), output),
                Err(error) => {
                    let mut compensation_errors = Vec::new();
                    if self.compensate_on_failure {
                        for done in self.steps[..index].iter().rev() {
                            let Some(compensate) = &done.compensate else {
                                continue;
                            };
                            tracing::debug!(step = %done.name, "compensating saga step");
                            if let Err(e) = compensate(ctx.clone()).await {
                                compensation_errors.push((done.name.clone(), e));
                            }
                        }
                    }
                    return Err(SagaFailure {
                        failed_step: step.name.clone(),
                        error,
                        compensation_errors,
                    });
                }
            }
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use voltaic_core::error::GatewayError;

    fn trace() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str)) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let push = {
            let log = Arc::clone(&log);
            move |event: &str| log.lock().unwrap().push(event.to_string())
        };
        (log, push)
    }

    fn gateway_down() -> VoltaicError {
        GatewayError::Transport {
            message: "connection reset".to_string(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_later_step_sees_earlier_output() {
        let payable_id = RecordId::now_v7();
        let saga = Saga::new()
            .step("payable", move |_ctx| async move {
                Ok(json!({ "id": payable_id.as_uuid().to_string(), "amount": 1200.0 }))
            })
            .step("ledger", move |ctx| async move {
                let linked = ctx.record_id("payable").ok_or_else(gateway_down)?;
                Ok(json!({ "linked_payable": linked.as_uuid().to_string() }))
            });

        let ctx = saga.run().await.expect("saga should complete");
        assert_eq!(ctx.len(), 2);
        assert_eq!(
            ctx.output("ledger").and_then(|v| v.get("linked_payable")),
            Some(&json!(payable_id.as_uuid().to_string()))
        );
    }

    #[tokio::test]
    async fn test_failure_compensates_in_reverse_order() {
        let (log, push) = trace();
        let push = Arc::new(push);

        let p1 = Arc::clone(&push);
        let p2 = Arc::clone(&push);
        let p3 = Arc::clone(&push);
        let p4 = Arc::clone(&push);
        let saga = Saga::new()
            .step_with_compensation(
                "first",
                move |_ctx| {
                    p1("first");
                    async { Ok(json!({})) }
                },
                move |_ctx| {
                    p2("undo first");
                    async { Ok(()) }
                },
            )
            .step_with_compensation(
                "second",
                move |_ctx| {
                    p3("second");
                    async { Ok(json!({})) }
                },
                move |_ctx| {
                    p4("undo second");
                    async { Ok(()) }
                },
            )
            .step("third", |_ctx| async { Err(gateway_down()) });

        let failure = saga.run().await.expect_err("saga should fail");
        assert_eq!(failure.failed_step, "third");
        assert!(failure.compensation_errors.is_empty());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "second", "undo second", "undo first"]
        );
    }

    #[tokio::test]
    async fn test_compensation_errors_are_collected() {
        let saga = Saga::new()
            .step_with_compensation(
                "create",
                |_ctx| async { Ok(json!({})) },
                |_ctx| async { Err(gateway_down()) },
            )
            .step("fail", |_ctx| async { Err(gateway_down()) });

        let failure = saga.run().await.expect_err("saga should fail");
        assert_eq!(failure.compensation_errors.len(), 1);
        assert_eq!(failure.compensation_errors[0].0, "create");
        let mapped = failure.into_mutation_error();
        assert!(matches!(
            mapped,
            MutationError::CompensationFailed { ref step, .. } if step == "create"
        ));
    }

    #[tokio::test]
    async fn test_without_compensation_leaves_completed_steps() {
        let (log, push) = trace();
        let push = Arc::new(push);
        let p1 = Arc::clone(&push);
        let p2 = Arc::clone(&push);

        let saga = Saga::new()
            .without_compensation()
            .step_with_compensation(
                "create",
                move |_ctx| {
                    p1("create");
                    async { Ok(json!({})) }
                },
                move |_ctx| {
                    p2("undo create");
                    async { Ok(()) }
                },
            )
            .step("fail", |_ctx| async { Err(gateway_down()) });

        let failure = saga.run().await.expect_err("saga should fail");
        assert_eq!(failure.failed_step, "fail");
        assert_eq!(*log.lock().unwrap(), vec!["create"]);
        assert!(matches!(
            failure.into_mutation_error(),
            MutationError::ChainFailed { .. }
        ));
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
