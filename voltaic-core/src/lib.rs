//! Voltaic Core - Data Types
//!
//! Pure data structures shared by every other crate: identities, the
//! schemaless gateway record, filter/sort expressions, validation helpers,
//! and the error taxonomy. No I/O lives here.

pub mod error;
pub mod filter;
pub mod identity;
pub mod record;
pub mod validation;

pub use error::{
    CacheError, ConfigError, GatewayError, MutationError, ValidationError, VoltaicError,
    VoltaicResult,
};
pub use filter::{FilterExpr, FilterOperator, FilterSet, SortDirection, SortSpec};
pub use identity::{ContentHash, RecordId, TenantId, Timestamp};
pub use record::{EntityKind, Record};
pub use validation::{field_is_present, require_fields, validate_allocation_percentages};
