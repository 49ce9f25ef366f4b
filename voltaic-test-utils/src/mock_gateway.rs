//! In-memory stand-in for the remote entity gateway.
//!
//! Holds one record list per entity kind and mimics the gateway's
//! create/update/delete/list semantics, including insertion order.
//! Failures can be scripted against a call prefix ("create LedgerEntry",
//! "delete Payable"), which is how saga tests make step two of a chain
//! fail after step one succeeds. Each scripted failure fires once.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use voltaic_core::error::GatewayError;
use voltaic_core::identity::RecordId;
use voltaic_core::record::{EntityKind, Record};

#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    records: HashMap<EntityKind, Vec<Record>>,
    scripted_failures: Vec<(String, GatewayError)>,
    calls: Vec<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a collection, preserving the given order.
    pub fn seed(&self, kind: EntityKind, records: Vec<Record>) {
        self.lock().records.entry(kind).or_default().extend(records);
    }

    /// Make the next call whose label starts with `call_prefix` fail.
    /// Labels are "verb Kind", e.g. `"create LedgerEntry"` or just
    /// `"list"` for any list.
    pub fn script_failure(&self, call_prefix: &str, error: GatewayError) {
        self.lock()
            .scripted_failures
            .push((call_prefix.to_string(), error));
    }

    pub fn list(&self, kind: EntityKind) -> Result<Vec<Record>, GatewayError> {
        let mut state = self.lock();
        state.begin_call(format!("list {kind}"))?;
        Ok(state.records.get(&kind).cloned().unwrap_or_default())
    }

    pub fn get(&self, kind: EntityKind, id: RecordId) -> Result<Record, GatewayError> {
        let mut state = self.lock();
        state.begin_call(format!("get {kind} {id}"))?;
        state
            .records
            .get(&kind)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned()
            .ok_or(GatewayError::NotFound {
                entity_kind: kind,
                id: id.as_uuid(),
            })
    }

    pub fn create(
        &self,
        kind: EntityKind,
        fields: Map<String, Value>,
    ) -> Result<Record, GatewayError> {
        let mut state = self.lock();
        state.begin_call(format!("create {kind}"))?;
        let record = Record::new(RecordId::now_v7(), fields);
        state.records.entry(kind).or_default().push(record.clone());
        Ok(record)
    }

    pub fn update(
        &self,
        kind: EntityKind,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> Result<Record, GatewayError> {
        let mut state = self.lock();
        state.begin_call(format!("update {kind} {id}"))?;
        let record = state
            .records
            .get_mut(&kind)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or(GatewayError::NotFound {
                entity_kind: kind,
                id: id.as_uuid(),
            })?;
        for (name, value) in fields {
            record.set_field(name, value);
        }
        record.updated_date = chrono::Utc::now();
        Ok(record.clone())
    }

    pub fn delete(&self, kind: EntityKind, id: RecordId) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.begin_call(format!("delete {kind} {id}"))?;
        let records = state.records.get_mut(&kind).ok_or(GatewayError::NotFound {
            entity_kind: kind,
            id: id.as_uuid(),
        })?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(GatewayError::NotFound {
                entity_kind: kind,
                id: id.as_uuid(),
            });
        }
        Ok(())
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.lock().records.get(&kind).map_or(0, Vec::len)
    }

    /// Every call made so far, in order, as "verb Kind [id]" strings.
    pub fn call_log(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MockState {
    fn begin_call(&mut self, label: String) -> Result<(), GatewayError> {
        let scripted = self
            .scripted_failures
            .iter()
            .position(|(prefix, _)| label.starts_with(prefix.as_str()));
        self.calls.push(label);
        match scripted {
            Some(index) => Err(self.scripted_failures.remove(index).1),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_tasks;

    #[test]
    fn test_create_then_list_preserves_order() {
        let gateway = MockGateway::new();
        let first = gateway
            .create(EntityKind::Task, Map::new())
            .expect("create");
        let second = gateway
            .create(EntityKind::Task, Map::new())
            .expect("create");
        let listed = gateway.list(EntityKind::Task).expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[test]
    fn test_scripted_failure_consumed_once() {
        let gateway = MockGateway::new();
        gateway.seed(EntityKind::Task, sample_tasks(2));
        gateway.script_failure(
            "list",
            GatewayError::Transport {
                message: "connection reset".to_string(),
            },
        );
        assert!(gateway.list(EntityKind::Task).is_err());
        assert_eq!(gateway.list(EntityKind::Task).unwrap().len(), 2);
    }

    #[test]
    fn test_update_missing_record_is_not_found() {
        let gateway = MockGateway::new();
        let result = gateway.update(EntityKind::Contract, RecordId::now_v7(), Map::new());
        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
    }

    #[test]
    fn test_delete_removes_only_the_target() {
        let gateway = MockGateway::new();
        gateway.seed(EntityKind::Task, sample_tasks(3));
        let victim = gateway.list(EntityKind::Task).unwrap()[1].id;
        gateway.delete(EntityKind::Task, victim).expect("delete");
        let remaining = gateway.list(EntityKind::Task).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.id != victim));
    }
}
