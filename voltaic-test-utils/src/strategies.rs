//! proptest generators for records and view inputs.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use voltaic_core::identity::RecordId;
use voltaic_core::record::Record;

use crate::fixtures::TASK_STATUSES;

pub fn status() -> impl Strategy<Value = &'static str> {
    prop::sample::select(&TASK_STATUSES[..])
}

/// Scalar field values of the shapes the gateway actually returns.
pub fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Field names that do not collide with the record envelope.
const RESERVED_FIELDS: [&str; 4] = ["id", "created_date", "updated_date", "created_by"];

/// Records with arbitrary string-keyed scalar fields.
pub fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map(
        "[a-z_]{1,12}".prop_filter("envelope field name", |name| {
            !RESERVED_FIELDS.contains(&name.as_str())
        }),
        field_value(),
        0..8,
    )
    .prop_map(|fields| {
        let mut map = Map::new();
        for (name, value) in fields {
            map.insert(name, value);
        }
        Record::new(RecordId::now_v7(), map)
    })
}

/// Percentage vectors that sum to exactly 100.00 at two decimal places.
///
/// Built from integer cent cut points so the sum is exact by
/// construction, no matter how many beneficiaries there are.
pub fn exact_percentage_split() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::btree_set(1u32..10_000, 0..5).prop_map(|cuts| {
        let mut cents = Vec::new();
        let mut previous = 0u32;
        for cut in cuts {
            cents.push(cut - previous);
            previous = cut;
        }
        cents.push(10_000 - previous);
        cents.into_iter().map(|c| f64::from(c) / 100.0).collect()
    })
}

/// Beneficiary rows paired with their percentages.
pub fn allocation_rows() -> impl Strategy<Value = Vec<Value>> {
    exact_percentage_split().prop_map(|split| {
        split
            .into_iter()
            .enumerate()
            .map(|(i, pct)| json!({ "unit": format!("unit {i}"), "percentage": pct }))
            .collect()
    })
}
