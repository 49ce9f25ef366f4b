//! Search over cached collections, and its server-side push-down.
//!
//! Client-side search only ever sees the page the cache holds; the
//! push-down form turns the same query into a gateway filter so matches
//! beyond the cached page are found too.

use voltaic_core::filter::{FilterExpr, FilterSet};
use voltaic_core::record::Record;

/// Hard cap on any pushed-down fetch.
pub const MAX_SEARCH_LIMIT: usize = 500;
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Case-insensitive substring match over every string field, preserving
/// collection order. A blank query matches everything.
pub fn search_records<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|record| {
            record
                .fields
                .values()
                .filter_map(|v| v.as_str())
                .any(|s| s.to_lowercase().contains(&needle))
        })
        .collect()
}

/// The same search as a server-side filter over named fields. The
/// gateway treats the set as a conjunction, so one field per query is
/// the common case.
pub fn push_down(fields: &[&str], query: &str) -> FilterSet {
    let needle = query.trim();
    let mut set = FilterSet::new();
    if needle.is_empty() {
        return set;
    }
    for field in fields {
        set = set.and(FilterExpr::contains(*field, needle.into()));
    }
    set
}

/// Clamp a requested fetch size to the search cap.
pub fn capped_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltaic_test_utils::RecordBuilder;

    fn customers() -> Vec<Record> {
        vec![
            RecordBuilder::new()
                .field("name", "Fazenda Boa Vista")
                .field("city", "Uberaba")
                .build(),
            RecordBuilder::new()
                .field("name", "Padaria Sol Nascente")
                .field("city", "Uberlândia")
                .build(),
            RecordBuilder::new()
                .field("name", "Mercado Central")
                .field("monthly_value", 420.0)
                .build(),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let records = customers();
        let hits = search_records(&records, "UBER");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].str_field("city"), Some("Uberaba"));
    }

    #[test]
    fn test_blank_query_matches_everything() {
        let records = customers();
        assert_eq!(search_records(&records, "   ").len(), 3);
    }

    #[test]
    fn test_numeric_fields_are_not_searched() {
        let records = customers();
        assert!(search_records(&records, "420").is_empty());
    }

    #[test]
    fn test_push_down_builds_contains_filter() {
        let set = push_down(&["name"], " sol ");
        assert_eq!(set.filters.len(), 1);
        let records = customers();
        let matched = set.apply(&records);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].str_field("name"), Some("Padaria Sol Nascente"));
    }

    #[test]
    fn test_blank_push_down_is_empty_filter() {
        assert!(push_down(&["name"], "").filters.is_empty());
    }

    #[test]
    fn test_limits_are_capped() {
        assert_eq!(capped_limit(None), DEFAULT_SEARCH_LIMIT);
        assert_eq!(capped_limit(Some(50)), 50);
        assert_eq!(capped_limit(Some(10_000)), MAX_SEARCH_LIMIT);
    }
}
