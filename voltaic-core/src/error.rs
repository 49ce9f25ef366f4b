//! Error types for Voltaic operations

use crate::record::EntityKind;
use thiserror::Error;
use uuid::Uuid;

/// Remote gateway errors.
///
/// Variants carry owned strings rather than transport error types so the
/// cache can clone a failed fetch and replay it to every coalesced caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Gateway rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Could not decode gateway response: {message}")]
    Decode { message: String },

    #[error("Record not found: {entity_kind:?} with id {id}")]
    NotFound { entity_kind: EntityKind, id: Uuid },
}

/// Query cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Coalesced fetch for {key} was abandoned by its leader")]
    FetchAbandoned { key: String },

    #[error("Change journal error: {reason}")]
    JournalFailed { reason: String },
}

/// Mutation dispatch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("A mutation is already pending on this dispatcher")]
    AlreadyPending,

    #[error("Chained write failed at step {step}: {reason}")]
    ChainFailed { step: String, reason: String },

    #[error("Compensation failed for step {step}: {reason}")]
    CompensationFailed { step: String, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Allocation percentages sum to {sum:.2}, expected 100.00")]
    AllocationSumMismatch { sum: f64 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Could not read configuration: {reason}")]
    Unreadable { reason: String },
}

/// Master error type for all Voltaic errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VoltaicError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Voltaic operations.
pub type VoltaicResult<T> = Result<T, VoltaicError>;

// =============================================================================
// TESTS
// =============================================================================
