//! Cache keys for collection queries.
//!
//! A key names the entity kind a query reads plus the query shape
//! (filters, sort, limit) as ordered segments. Invalidation works on
//! prefixes: invalidating `Task` drops `Task/status=pending` too.

use std::fmt;
use voltaic_core::record::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    entity: String,
    segments: Vec<String>,
}

impl QueryKey {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            segments: Vec::new(),
        }
    }

    pub fn for_kind(kind: EntityKind) -> Self {
        Self::new(kind.as_str())
    }

    /// Append a query-shape segment, e.g. `status=pending` or `sort=-due_date`.
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn entity_kind(&self) -> Option<EntityKind> {
        EntityKind::parse(&self.entity)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `prefix` names this key's entity and a leading subset of
    /// its segments. Every key starts with its own entity-only key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.entity == prefix.entity
            && prefix.segments.len() <= self.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
