//! Billing workflow: a payable and its ledger entry, written as a chain.
//!
//! The ledger entry must reference the payable it settles, so the payable
//! is created first and its id flows into the ledger step. If the ledger
//! write fails the payable is deleted again, leaving the books balanced.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use voltaic_cache::QueryKey;
use voltaic_core::error::{GatewayError, VoltaicResult};
use voltaic_core::identity::RecordId;
use voltaic_core::record::{EntityKind, Record};
use voltaic_gateway::Gateway;
use voltaic_mutation::{MutationSpec, Saga};

pub const PAYABLE_STEP: &str = "payable";
pub const LEDGER_STEP: &str = "ledger";
/// Field on the ledger entry naming the payable it settles.
pub const PAYABLE_LINK_FIELD: &str = "payable_id";

/// The writes the billing chain needs from the gateway.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn create(&self, kind: EntityKind, fields: Map<String, Value>) -> VoltaicResult<Record>;
    async fn delete(&self, kind: EntityKind, id: RecordId) -> VoltaicResult<()>;
}

#[async_trait]
impl BillingStore for Gateway {
    async fn create(&self, kind: EntityKind, fields: Map<String, Value>) -> VoltaicResult<Record> {
        self.entity(kind).create(&Value::Object(fields)).await
    }

    async fn delete(&self, kind: EntityKind, id: RecordId) -> VoltaicResult<()> {
        self.entity(kind).delete(id).await
    }
}

pub struct BillingWorkflow {
    store: Arc<dyn BillingStore>,
}

impl BillingWorkflow {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Both collections the chain touches; every query under either
    /// prefix is stale once the chain settles.
    pub fn invalidation_targets() -> [QueryKey; 2] {
        [
            QueryKey::for_kind(EntityKind::Payable),
            QueryKey::for_kind(EntityKind::LedgerEntry),
        ]
    }

    /// Dispatch spec declaring the chain's invalidation set.
    pub fn mutation_spec(&self) -> MutationSpec {
        let mut spec = MutationSpec::new();
        for key in Self::invalidation_targets() {
            spec = spec.invalidates(key);
        }
        spec
    }

    /// The payable-then-ledger chain. The ledger step receives the
    /// created payable's id; compensation deletes the payable if the
    /// ledger write fails.
    pub fn payable_with_ledger(
        &self,
        payable: Map<String, Value>,
        ledger: Map<String, Value>,
    ) -> Saga {
        let create_store = Arc::clone(&self.store);
        let undo_store = Arc::clone(&self.store);
        let ledger_store = Arc::clone(&self.store);
        Saga::new()
            .step_with_compensation(
                PAYABLE_STEP,
                move |_ctx| {
                    let store = Arc::clone(&create_store);
                    let fields = payable.clone();
                    async move {
                        let record = store.create(EntityKind::Payable, fields).await?;
                        record_output(&record)
                    }
                },
                move |ctx| {
                    let store = Arc::clone(&undo_store);
                    async move {
                        match ctx.record_id(PAYABLE_STEP) {
                            Some(id) => store.delete(EntityKind::Payable, id).await,
                            None => Ok(()),
                        }
                    }
                },
            )
            .step(LEDGER_STEP, move |ctx| {
                let store = Arc::clone(&ledger_store);
                let mut fields = ledger.clone();
                async move {
                    let payable_id =
                        ctx.record_id(PAYABLE_STEP)
                            .ok_or_else(|| GatewayError::Decode {
                                message: "payable step produced no record id".to_string(),
                            })?;
                    fields.insert(
                        PAYABLE_LINK_FIELD.to_string(),
                        Value::String(payable_id.as_uuid().to_string()),
                    );
                    let record = store.create(EntityKind::LedgerEntry, fields).await?;
                    record_output(&record)
                }
            })
    }
}

fn record_output(record: &Record) -> VoltaicResult<Value> {
    serde_json::to_value(record).map_err(|e| {
        GatewayError::Decode {
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltaic_test_utils::MockGateway;

    struct Store(MockGateway);

    #[async_trait]
    impl BillingStore for Store {
        async fn create(
            &self,
            kind: EntityKind,
            fields: Map<String, Value>,
        ) -> VoltaicResult<Record> {
            self.0.create(kind, fields).map_err(Into::into)
        }

        async fn delete(&self, kind: EntityKind, id: RecordId) -> VoltaicResult<()> {
            self.0.delete(kind, id).map_err(Into::into)
        }
    }

    fn payable_fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("amount".to_string(), serde_json::json!(1250.0));
        fields
    }

    fn ledger_fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("entry_type".to_string(), serde_json::json!("debit"));
        fields
    }

    #[tokio::test]
    async fn test_ledger_entry_links_the_created_payable() {
        let gateway = MockGateway::new();
        let workflow = BillingWorkflow::new(Arc::new(Store(gateway.clone())));

        let ctx = workflow
            .payable_with_ledger(payable_fields(), ledger_fields())
            .run()
            .await
            .expect("chain should complete");

        let payable_id = ctx.record_id(PAYABLE_STEP).expect("payable id");
        let ledgers = gateway.list(EntityKind::LedgerEntry).unwrap();
        assert_eq!(ledgers.len(), 1);
        assert_eq!(
            ledgers[0].str_field(PAYABLE_LINK_FIELD),
            Some(payable_id.as_uuid().to_string().as_str())
        );
        assert_eq!(
            gateway.call_log(),
            vec!["create Payable", "create LedgerEntry"]
        );
    }

    #[tokio::test]
    async fn test_ledger_failure_deletes_the_payable() {
        let gateway = MockGateway::new();
        gateway.script_failure(
            "create LedgerEntry",
            voltaic_core::error::GatewayError::Transport {
                message: "connection reset".to_string(),
            },
        );
        let workflow = BillingWorkflow::new(Arc::new(Store(gateway.clone())));

        let failure = workflow
            .payable_with_ledger(payable_fields(), ledger_fields())
            .run()
            .await
            .expect_err("ledger write fails");

        assert_eq!(failure.failed_step, LEDGER_STEP);
        assert!(failure.compensation_errors.is_empty());
        assert_eq!(gateway.count(EntityKind::Payable), 0);
        assert_eq!(gateway.count(EntityKind::LedgerEntry), 0);
    }

    #[tokio::test]
    async fn test_failed_compensation_is_reported() {
        let gateway = MockGateway::new();
        gateway.script_failure(
            "create LedgerEntry",
            voltaic_core::error::GatewayError::Transport {
                message: "connection reset".to_string(),
            },
        );
        gateway.script_failure(
            "delete Payable",
            voltaic_core::error::GatewayError::RequestFailed {
                status: 500,
                message: "internal".to_string(),
            },
        );
        let workflow = BillingWorkflow::new(Arc::new(Store(gateway.clone())));

        let failure = workflow
            .payable_with_ledger(payable_fields(), ledger_fields())
            .run()
            .await
            .expect_err("ledger write fails");

        assert_eq!(failure.compensation_errors.len(), 1);
        assert_eq!(failure.compensation_errors[0].0, PAYABLE_STEP);
        // The payable is still there; the caller sees exactly why.
        assert_eq!(gateway.count(EntityKind::Payable), 1);
    }

    #[test]
    fn test_invalidation_targets_cover_both_collections() {
        let targets = BillingWorkflow::invalidation_targets();
        assert!(targets
            .iter()
            .any(|k| k.entity_kind() == Some(EntityKind::Payable)));
        assert!(targets
            .iter()
            .any(|k| k.entity_kind() == Some(EntityKind::LedgerEntry)));
    }
}
