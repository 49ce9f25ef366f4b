//! Voltaic Gateway - HTTP client for the remote entity gateway.
//!
//! Everything the platform stores or computes lives behind the gateway's
//! REST contract; this crate is the only place that contract is spelled
//! out. Higher layers (cache, mutation, views) treat it as opaque.

pub mod client;
pub mod config;
pub mod types;

pub use client::{Auth, EntityHandle, Functions, Gateway, Integrations};
pub use config::{AuthConfig, GatewayConfig};
pub use types::{
    ApiErrorBody, CurrentUser, ExtractionResult, ExtractionStatus, InvokeResponse, LlmRequest,
    UploadedFile,
};
