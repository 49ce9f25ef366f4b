//! Shared helpers for dashboard summary cards.

use voltaic_core::record::Record;

/// Part as a percentage of total, 0 when the total is 0.
pub fn percentage_of_total(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    (part / total) * 100.0
}

/// Sum of a numeric field per value of a grouping field, in order of
/// first appearance. Records missing either field are skipped.
pub fn group_totals(records: &[Record], group_field: &str, value_field: &str) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for record in records {
        let (Some(group), Some(value)) = (
            record.str_field(group_field),
            record.f64_field(value_field),
        ) else {
            continue;
        };
        match totals.iter_mut().find(|(name, _)| name == group) {
            Some((_, total)) => *total += value,
            None => totals.push((group.to_string(), value)),
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltaic_test_utils::RecordBuilder;

    #[test]
    fn test_percentage_of_total_handles_zero_total() {
        assert_eq!(percentage_of_total(5.0, 0.0), 0.0);
        assert!((percentage_of_total(25.0, 200.0) - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_group_totals_first_seen_order() {
        let records = vec![
            RecordBuilder::new()
                .field("plant", "Horizonte")
                .field("kwh", 120.0)
                .build(),
            RecordBuilder::new()
                .field("plant", "Aurora")
                .field("kwh", 80.0)
                .build(),
            RecordBuilder::new()
                .field("plant", "Horizonte")
                .field("kwh", 30.0)
                .build(),
            RecordBuilder::new().field("plant", "Sem Medidor").build(),
        ];
        assert_eq!(
            group_totals(&records, "plant", "kwh"),
            vec![("Horizonte".to_string(), 150.0), ("Aurora".to_string(), 80.0)]
        );
    }
}
