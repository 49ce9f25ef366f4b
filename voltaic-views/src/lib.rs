//! Voltaic Views - page view-models over the cache and mutation layers.
//!
//! Each page binds a cached collection to its derived aggregates and
//! owns the dialog/form state for its mutations. Nothing here talks HTTP
//! directly; reads go through the query cache and writes through a
//! mutation dispatcher.

pub mod allocation;
pub mod billing;
pub mod contracts;
pub mod form;
pub mod search;
pub mod summary;
pub mod tasks;

pub use allocation::{AllocationForm, BeneficiaryRow};
pub use billing::{BillingStore, BillingWorkflow, LEDGER_STEP, PAYABLE_LINK_FIELD, PAYABLE_STEP};
pub use contracts::ContractSummary;
pub use form::{DialogState, FormState};
pub use search::{capped_limit, push_down, search_records, MAX_SEARCH_LIMIT};
pub use summary::{group_totals, percentage_of_total};
pub use tasks::TaskBoardView;
