//! Filter and sort expressions.
//!
//! One expression type serves both sides of the wire: it serializes into the
//! gateway's query object for server-side filtering, and it evaluates
//! client-side against already-cached records. Keeping the two in one type
//! is what lets the views layer push a search down to the gateway instead of
//! filtering a truncated page.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// Contains substring (case-insensitive, strings only)
    Contains,
    /// In list of values
    In,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against (JSON value for flexibility)
    pub value: Value,
}

impl FilterExpr {
    /// Create a new filter expression.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a contains filter.
    pub fn contains(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Contains, value)
    }

    /// Evaluate this expression against a record.
    ///
    /// A missing field matches nothing except `Ne`. Ordered comparisons
    /// apply only when both sides are numbers.
    pub fn matches(&self, record: &Record) -> bool {
        let field_value = record.field(&self.field);
        match self.operator {
            FilterOperator::Eq => field_value == Some(&self.value),
            FilterOperator::Ne => field_value != Some(&self.value),
            FilterOperator::Gt => compare_numbers(field_value, &self.value, |a, b| a > b),
            FilterOperator::Lt => compare_numbers(field_value, &self.value, |a, b| a < b),
            FilterOperator::Gte => compare_numbers(field_value, &self.value, |a, b| a >= b),
            FilterOperator::Lte => compare_numbers(field_value, &self.value, |a, b| a <= b),
            FilterOperator::Contains => match (field_value.and_then(Value::as_str), self.value.as_str()) {
                (Some(haystack), Some(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            FilterOperator::In => match (&self.value, field_value) {
                (Value::Array(options), Some(actual)) => options.contains(actual),
                _ => false,
            },
        }
    }
}

fn compare_numbers(field_value: Option<&Value>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (field_value.and_then(Value::as_f64), expected.as_f64()) {
        (Some(actual), Some(wanted)) => cmp(actual, wanted),
        _ => false,
    }
}

/// A conjunction of filter expressions.
///
/// Serializes as a list; the gateway treats the list as AND, matching the
/// original query-object contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    pub filters: Vec<FilterExpr>,
}

impl FilterSet {
    /// Empty filter set (matches every record).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expression to the conjunction.
    pub fn and(mut self, expr: FilterExpr) -> Self {
        self.filters.push(expr);
        self
    }

    /// True when every expression matches.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Apply the conjunction to a slice, preserving the slice's order.
    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort specification, serialized in the gateway's string form:
/// `"field"` ascending, `"-field"` descending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort on a field.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on a field.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parse the gateway string form.
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(field) => Self::descending(field),
            None => Self::ascending(spec),
        }
    }

    /// Render the gateway string form.
    pub fn to_wire(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.clone(),
            SortDirection::Descending => format!("-{}", self.field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RecordId;
    use serde_json::{json, Map};

    fn record(status: &str, priority: f64) -> Record {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("priority".to_string(), json!(priority));
        fields.insert("title".to_string(), json!("Install inverter at Plant A"));
        Record::new(RecordId::now_v7(), fields)
    }

    #[test]
    fn test_eq_filter() {
        let r = record("completed", 2.0);
        assert!(FilterExpr::eq("status", json!("completed")).matches(&r));
        assert!(!FilterExpr::eq("status", json!("pending")).matches(&r));
    }

    #[test]
    fn test_missing_field_only_matches_ne() {
        let r = record("completed", 2.0);
        assert!(!FilterExpr::eq("assignee", json!("ana")).matches(&r));
        assert!(FilterExpr::new("assignee", FilterOperator::Ne, json!("ana")).matches(&r));
        assert!(!FilterExpr::new("assignee", FilterOperator::Gt, json!(1)).matches(&r));
    }

    #[test]
    fn test_numeric_comparisons() {
        let r = record("pending", 3.0);
        assert!(FilterExpr::new("priority", FilterOperator::Gt, json!(2)).matches(&r));
        assert!(FilterExpr::new("priority", FilterOperator::Gte, json!(3)).matches(&r));
        assert!(!FilterExpr::new("priority", FilterOperator::Lt, json!(3)).matches(&r));
        // Non-numeric operand never matches an ordered comparison
        assert!(!FilterExpr::new("status", FilterOperator::Gt, json!(1)).matches(&r));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let r = record("pending", 1.0);
        assert!(FilterExpr::contains("title", json!("inverter")).matches(&r));
        assert!(FilterExpr::contains("title", json!("PLANT a")).matches(&r));
        assert!(!FilterExpr::contains("title", json!("turbine")).matches(&r));
    }

    #[test]
    fn test_in_filter() {
        let r = record("pending", 1.0);
        let expr = FilterExpr::new("status", FilterOperator::In, json!(["pending", "open"]));
        assert!(expr.matches(&r));
        let expr = FilterExpr::new("status", FilterOperator::In, json!(["completed"]));
        assert!(!expr.matches(&r));
    }

    #[test]
    fn test_filter_set_preserves_order() {
        let records = vec![record("completed", 1.0), record("pending", 2.0), record("completed", 3.0)];
        let set = FilterSet::new().and(FilterExpr::eq("status", json!("completed")));
        let matched = set.apply(&records);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].f64_field("priority"), Some(1.0));
        assert_eq!(matched[1].f64_field("priority"), Some(3.0));
    }

    #[test]
    fn test_sort_spec_wire_form() {
        assert_eq!(SortSpec::descending("created_date").to_wire(), "-created_date");
        assert_eq!(SortSpec::ascending("due_date").to_wire(), "due_date");
        assert_eq!(SortSpec::parse("-created_date"), SortSpec::descending("created_date"));
        assert_eq!(SortSpec::parse("name"), SortSpec::ascending("name"));
    }
}
