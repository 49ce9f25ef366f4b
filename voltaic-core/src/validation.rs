//! Client-side form validation helpers.
//!
//! These checks run before a mutation is dispatched and exist for user
//! feedback only; the gateway remains the authority on what it accepts.

use crate::error::{ValidationError, VoltaicResult};
use serde_json::Value;

/// Whether a payload value counts as filled in. Nulls, absent fields, and
/// blank strings are all "missing", matching how the dashboard forms treat
/// untouched inputs. This is the single definition of presence; form-level
/// validation reuses it.
pub fn field_is_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Null) | None => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Check that every named field is present and non-empty in a payload.
pub fn require_fields(payload: &Value, fields: &[&str]) -> VoltaicResult<()> {
    for field in fields {
        if !field_is_present(payload.get(field)) {
            return Err(ValidationError::RequiredFieldMissing {
                field: (*field).to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Validate that allocation (rateio) percentages sum to exactly 100.00.
///
/// The sum is rounded to two decimal places before comparison, so inputs
/// like `[33.33, 33.33, 33.34]` pass while `99.99` and `100.01` fail.
/// Negative or non-finite entries are rejected outright.
pub fn validate_allocation_percentages(percentages: &[f64]) -> VoltaicResult<()> {
    for (index, pct) in percentages.iter().enumerate() {
        if !pct.is_finite() || *pct < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("percentages[{}]", index),
                reason: "must be a non-negative number".to_string(),
            }
            .into());
        }
    }

    let sum: f64 = percentages.iter().sum();
    let rounded = (sum * 100.0).round() / 100.0;
    if (rounded - 100.0).abs() > f64::EPSILON * 100.0 {
        return Err(ValidationError::AllocationSumMismatch { sum: rounded }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoltaicError;
    use serde_json::json;

    #[test]
    fn test_require_fields_accepts_complete_payload() {
        let payload = json!({ "name": "Plant A", "capacity_kwp": 75.0 });
        assert!(require_fields(&payload, &["name", "capacity_kwp"]).is_ok());
    }

    #[test]
    fn test_require_fields_rejects_missing_and_blank() {
        let payload = json!({ "name": "  ", "capacity_kwp": null });
        for field in ["name", "capacity_kwp", "owner"] {
            let result = require_fields(&payload, &[field]);
            assert!(matches!(
                result,
                Err(VoltaicError::Validation(ValidationError::RequiredFieldMissing { field: f })) if f == field
            ));
        }
    }

    #[test]
    fn test_allocation_accepts_exact_boundary() {
        assert!(validate_allocation_percentages(&[40.0, 35.0, 25.0]).is_ok());
        assert!(validate_allocation_percentages(&[100.0]).is_ok());
        assert!(validate_allocation_percentages(&[33.33, 33.33, 33.34]).is_ok());
    }

    #[test]
    fn test_allocation_rejects_off_by_a_cent() {
        for sum in [&[40.0, 35.0, 24.99][..], &[40.0, 35.0, 25.01][..]] {
            let result = validate_allocation_percentages(sum);
            assert!(matches!(
                result,
                Err(VoltaicError::Validation(ValidationError::AllocationSumMismatch { .. }))
            ));
        }
    }

    #[test]
    fn test_allocation_rejects_negative_and_nan() {
        assert!(validate_allocation_percentages(&[110.0, -10.0]).is_err());
        assert!(validate_allocation_percentages(&[f64::NAN, 100.0]).is_err());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
