//! Schemaless gateway records and entity kinds.
//!
//! The remote gateway owns every record's shape; the client only reads named
//! fields off a JSON map and never enforces a schema. `Record` is the typed
//! envelope around that contract: a stable identity plus audit timestamps,
//! with everything else behind optional accessors.

use crate::identity::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity collections exposed by the gateway.
///
/// The variant names mirror the remote collection names; `as_str()` is the
/// wire form used in URLs and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Task,
    Contract,
    Subscription,
    PowerPlant,
    Invoice,
    Payable,
    LedgerEntry,
    Document,
    Customer,
    AllocationPlan,
    AutomationRule,
}

impl EntityKind {
    /// Wire name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Contract => "Contract",
            Self::Subscription => "Subscription",
            Self::PowerPlant => "PowerPlant",
            Self::Invoice => "Invoice",
            Self::Payable => "Payable",
            Self::LedgerEntry => "LedgerEntry",
            Self::Document => "Document",
            Self::Customer => "Customer",
            Self::AllocationPlan => "AllocationPlan",
            Self::AutomationRule => "AutomationRule",
        }
    }

    /// Parse a wire name back into a kind.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Task" => Some(Self::Task),
            "Contract" => Some(Self::Contract),
            "Subscription" => Some(Self::Subscription),
            "PowerPlant" => Some(Self::PowerPlant),
            "Invoice" => Some(Self::Invoice),
            "Payable" => Some(Self::Payable),
            "LedgerEntry" => Some(Self::LedgerEntry),
            "Document" => Some(Self::Document),
            "Customer" => Some(Self::Customer),
            "AllocationPlan" => Some(Self::AllocationPlan),
            "AutomationRule" => Some(Self::AutomationRule),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single gateway record: identity, audit metadata, and a schemaless
/// field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub created_date: Timestamp,
    pub updated_date: Timestamp,
    pub created_by: Option<String>,
    /// All remaining fields, exactly as the gateway returned them.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record with the given id and fields, stamping both audit
    /// timestamps to now.
    pub fn new(id: RecordId, fields: Map<String, Value>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            created_date: now,
            updated_date: now,
            created_by: None,
            fields,
        }
    }

    /// Raw field access.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Numeric field, if present and representable as f64.
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Boolean field, if present and a bool.
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// Set or replace a field value.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}
