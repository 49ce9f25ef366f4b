//! Voltaic Mutation - write dispatch between the views and the cache.
//!
//! Every user-initiated write goes through a [`Mutator`]: one pending
//! write per dispatcher, declared invalidation targets, lifecycle hooks
//! that fire only after the gateway settles, and cancellation scoped to
//! the caller. Multi-record writes run as compensating [`Saga`] chains.

pub mod dispatcher;
pub mod saga;

pub use dispatcher::{MutationOutcome, MutationSpec, Mutator, SagaOutcome};
pub use saga::{Saga, SagaContext, SagaFailure};
