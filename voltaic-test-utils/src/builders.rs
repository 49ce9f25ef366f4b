//! Fluent record construction for tests.

use serde_json::{Map, Value};
use voltaic_core::identity::RecordId;
use voltaic_core::record::Record;

pub struct RecordBuilder {
    id: RecordId,
    created_by: Option<String>,
    fields: Map<String, Value>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            id: RecordId::now_v7(),
            created_by: None,
            fields: Map::new(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn created_by(mut self, email: impl Into<String>) -> Self {
        self.created_by = Some(email.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Record {
        let mut record = Record::new(self.id, self.fields);
        record.created_by = self.created_by;
        record
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}
