//! Contract page aggregates.

use voltaic_core::record::Record;

pub const STATUS_FIELD: &str = "status";
pub const MONTHLY_VALUE_FIELD: &str = "monthly_value";
pub const ACTIVE_STATUS: &str = "active";

/// Summary cards over the cached contract collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractSummary {
    pub total: usize,
    pub active: usize,
    pub monthly_value_sum: f64,
    /// Mean over contracts that carry a monthly value; 0 when none do.
    pub monthly_value_average: f64,
}

impl ContractSummary {
    /// Single pass over the collection.
    pub fn summarize(contracts: &[Record]) -> Self {
        let mut summary = ContractSummary {
            total: contracts.len(),
            ..Default::default()
        };
        let mut valued = 0usize;
        for contract in contracts {
            if contract.str_field(STATUS_FIELD) == Some(ACTIVE_STATUS) {
                summary.active += 1;
            }
            if let Some(value) = contract.f64_field(MONTHLY_VALUE_FIELD) {
                summary.monthly_value_sum += value;
                valued += 1;
            }
        }
        if valued > 0 {
            summary.monthly_value_average = summary.monthly_value_sum / valued as f64;
        }
        summary
    }
}
