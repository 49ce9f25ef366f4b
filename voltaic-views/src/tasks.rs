//! Task board view-model.
//!
//! Status columns are exact-match slices of the cached collection, in the
//! collection's own order; a task whose status string is not one of the
//! column names simply appears in no column.

use chrono::DateTime;
use voltaic_core::identity::Timestamp;
use voltaic_core::record::Record;

pub const STATUS_FIELD: &str = "status";
pub const DUE_DATE_FIELD: &str = "due_date";
pub const COMPLETED_STATUS: &str = "completed";

pub struct TaskBoardView {
    tasks: Vec<Record>,
}

impl TaskBoardView {
    pub fn new(tasks: Vec<Record>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Record] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// One board column: tasks whose status equals `status` exactly, in
    /// collection order.
    pub fn with_status(&self, status: &str) -> Vec<&Record> {
        self.tasks
            .iter()
            .filter(|t| t.str_field(STATUS_FIELD) == Some(status))
            .collect()
    }

    /// Count per status, in order of first appearance.
    pub fn status_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for task in &self.tasks {
            let Some(status) = task.str_field(STATUS_FIELD) else {
                continue;
            };
            match counts.iter_mut().find(|(name, _)| name == status) {
                Some((_, count)) => *count += 1,
                None => counts.push((status.to_string(), 1)),
            }
        }
        counts
    }

    /// Uncompleted tasks whose due date is strictly before `reference`.
    /// Tasks without a parseable due date are never overdue.
    pub fn overdue(&self, reference: Timestamp) -> Vec<&Record> {
        self.tasks
            .iter()
            .filter(|t| t.str_field(STATUS_FIELD) != Some(COMPLETED_STATUS))
            .filter(|t| match due_date(t) {
                Some(due) => due < reference,
                None => false,
            })
            .collect()
    }
}

fn due_date(task: &Record) -> Option<Timestamp> {
    task.str_field(DUE_DATE_FIELD)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.to_utc())
}
