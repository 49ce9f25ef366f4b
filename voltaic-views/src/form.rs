//! Dialog and form state shared by the entity pages.

use serde_json::{Map, Value};
use voltaic_core::error::ValidationError;
use voltaic_core::validation::field_is_present;

/// Whether a page's create/edit dialog is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Open,
}

impl DialogState {
    pub fn open(&mut self) {
        *self = DialogState::Open;
    }

    pub fn close(&mut self) {
        *self = DialogState::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DialogState::Open)
    }
}

/// Field values for one form, with the set of fields that must be filled
/// before submission.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: Map<String, Value>,
    required: Vec<String>,
}

impl FormState {
    pub fn new(required: &[&str]) -> Self {
        Self {
            values: Map::new(),
            required: required.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Clear all values, keeping the required-field set.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// All required-field violations at once, for inline display. Presence
    /// follows the same rule `require_fields` enforces at dispatch time.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        for field in &self.required {
            if !field_is_present(self.values.get(field)) {
                errors.push(ValidationError::RequiredFieldMissing {
                    field: field.clone(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The payload sent to the gateway on submit.
    pub fn to_payload(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dialog_toggles() {
        let mut dialog = DialogState::default();
        assert!(!dialog.is_open());
        dialog.open();
        assert!(dialog.is_open());
        dialog.close();
        assert!(!dialog.is_open());
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let mut form = FormState::new(&["title", "due_date", "assignee"]);
        form.set("title", "install meter");
        form.set("assignee", "   ");
        let errors = form.validate().expect_err("two fields missing");
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            &errors[0],
            ValidationError::RequiredFieldMissing { field } if field == "due_date"
        ));
    }

    #[test]
    fn test_complete_form_builds_payload() {
        let mut form = FormState::new(&["title"]);
        form.set("title", "read meter");
        form.set("priority", 2);
        assert!(form.validate().is_ok());
        assert_eq!(
            form.to_payload(),
            json!({ "title": "read meter", "priority": 2 })
        );
    }

    #[test]
    fn test_validate_agrees_with_dispatch_time_check() {
        use voltaic_core::validation::require_fields;

        let values = [
            json!(null),
            json!(""),
            json!("   "),
            json!("filled"),
            json!(0),
            json!(false),
        ];
        for value in values {
            let mut form = FormState::new(&["amount"]);
            form.set("amount", value);
            let payload = form.to_payload();
            assert_eq!(
                form.validate().is_ok(),
                require_fields(&payload, &["amount"]).is_ok(),
                "presence rules diverged for {payload}"
            );
        }
    }

    #[test]
    fn test_reset_keeps_required_set() {
        let mut form = FormState::new(&["title"]);
        form.set("title", "x");
        form.reset();
        assert!(form.validate().is_err());
    }
}
