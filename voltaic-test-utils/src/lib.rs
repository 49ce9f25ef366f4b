//! Voltaic Test Utils - fixtures and fakes shared across the workspace.

pub mod builders;
pub mod fixtures;
pub mod mock_gateway;
pub mod strategies;

pub use builders::RecordBuilder;
pub use fixtures::{
    allocation_plan, contract, payable, sample_contracts, sample_tasks, task_with_status,
    TASK_STATUSES,
};
pub use mock_gateway::MockGateway;
