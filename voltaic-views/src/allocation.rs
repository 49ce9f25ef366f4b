//! Allocation (rateio) form.
//!
//! A plant's generated energy is split across beneficiary units by
//! percentage. Submission requires the percentages to sum to exactly
//! 100.00 at two decimal places.

use serde_json::{json, Value};
use voltaic_core::error::{ValidationError, VoltaicError};
use voltaic_core::validation::validate_allocation_percentages;

#[derive(Debug, Clone, PartialEq)]
pub struct BeneficiaryRow {
    pub unit: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AllocationForm {
    pub plant_name: String,
    pub rows: Vec<BeneficiaryRow>,
}

impl AllocationForm {
    pub fn new(plant_name: impl Into<String>) -> Self {
        Self {
            plant_name: plant_name.into(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, unit: impl Into<String>, percentage: f64) {
        self.rows.push(BeneficiaryRow {
            unit: unit.into(),
            percentage,
        });
    }

    pub fn remaining_percentage(&self) -> f64 {
        let assigned: f64 = self.rows.iter().map(|r| r.percentage).sum();
        let remaining = 100.0 - assigned;
        (remaining * 100.0).round() / 100.0
    }

    /// Every validation failure at once: required fields first, then the
    /// percentage sum.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.plant_name.trim().is_empty() {
            errors.push(ValidationError::RequiredFieldMissing {
                field: "plant_name".to_string(),
            });
        }
        if self.rows.is_empty() {
            errors.push(ValidationError::RequiredFieldMissing {
                field: "beneficiaries".to_string(),
            });
        }
        for (index, row) in self.rows.iter().enumerate() {
            if row.unit.trim().is_empty() {
                errors.push(ValidationError::RequiredFieldMissing {
                    field: format!("beneficiaries[{index}].unit"),
                });
            }
        }
        if !self.rows.is_empty() {
            let percentages: Vec<f64> = self.rows.iter().map(|r| r.percentage).collect();
            if let Err(VoltaicError::Validation(e)) =
                validate_allocation_percentages(&percentages)
            {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "plant_name": self.plant_name,
            "beneficiaries": self.rows.iter().map(|r| json!({
                "unit": r.unit,
                "percentage": r.percentage,
            })).collect::<Vec<_>>(),
        })
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use voltaic_test_utils::strategies::exact_percentage_split;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_exact_splits_always_submit(split in exact_percentage_split()) {
            let mut form = AllocationForm::new("UFV Horizonte");
            for (i, pct) in split.iter().enumerate() {
                form.add_row(format!("unit {i}"), *pct);
            }
            prop_assert!(form.validate().is_ok());
            prop_assert!(form.remaining_percentage().abs() < 0.005);
        }
    }
}
