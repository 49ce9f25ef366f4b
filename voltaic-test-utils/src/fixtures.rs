//! Canned records for the collections the views read.

use chrono::{Duration, Utc};
use serde_json::json;
use voltaic_core::record::Record;

use crate::builders::RecordBuilder;

pub const TASK_STATUSES: [&str; 3] = ["pending", "in_progress", "completed"];

pub fn task_with_status(status: &str) -> Record {
    RecordBuilder::new()
        .field("title", format!("task ({status})"))
        .field("status", status)
        .field(
            "due_date",
            (Utc::now() + Duration::days(7)).to_rfc3339(),
        )
        .build()
}

/// `n` tasks cycling through the known statuses, due one day apart.
pub fn sample_tasks(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            RecordBuilder::new()
                .field("title", format!("task {i}"))
                .field("status", TASK_STATUSES[i % TASK_STATUSES.len()])
                .field(
                    "due_date",
                    (Utc::now() + Duration::days(i as i64 - 2)).to_rfc3339(),
                )
                .build()
        })
        .collect()
}

pub fn contract(monthly_value: f64, status: &str) -> Record {
    RecordBuilder::new()
        .field("customer_name", "Fazenda Boa Vista")
        .field("status", status)
        .field("monthly_value", monthly_value)
        .build()
}

pub fn sample_contracts(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            contract(
                100.0 * (i + 1) as f64,
                if i % 4 == 3 { "cancelled" } else { "active" },
            )
        })
        .collect()
}

pub fn payable(amount: f64) -> Record {
    RecordBuilder::new()
        .field("description", "energy purchase")
        .field("amount", amount)
        .field("status", "open")
        .build()
}

/// An allocation plan with one beneficiary row per percentage.
pub fn allocation_plan(percentages: &[f64]) -> Record {
    let beneficiaries: Vec<_> = percentages
        .iter()
        .enumerate()
        .map(|(i, pct)| json!({ "unit": format!("unit {i}"), "percentage": pct }))
        .collect();
    RecordBuilder::new()
        .field("plant_name", "UFV Horizonte")
        .field("beneficiaries", beneficiaries)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_tasks_cycle_statuses() {
        let tasks = sample_tasks(6);
        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks[0].str_field("status"), Some("pending"));
        assert_eq!(tasks[4].str_field("status"), Some("in_progress"));
    }

    #[test]
    fn test_allocation_plan_keeps_row_order() {
        let plan = allocation_plan(&[60.0, 40.0]);
        let rows = plan.field("beneficiaries").unwrap().as_array().unwrap();
        assert_eq!(rows[0]["percentage"], json!(60.0));
        assert_eq!(rows[1]["percentage"], json!(40.0));
    }
}
