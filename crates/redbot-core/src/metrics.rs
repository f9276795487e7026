//! Aggregate metrics over accounts and tasks.

use std::collections::BTreeMap;

use crate::api::{ApiError, SessionSecurityClient};
use crate::models::{Account, Task, TaskStatus};

/// Bucket for accounts without a platform
const UNKNOWN_PLATFORM: &str = "Unknown";

/// Bucket for tasks without a type
const UNTYPED_TASK: &str = "Untyped";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total_accounts: usize,
    pub total_tasks: usize,
    pub by_status: StatusCounts,
    pub by_platform: BTreeMap<String, usize>,
    pub by_task_type: BTreeMap<String, usize>,
    /// Completed tasks as a rounded percentage of all tasks
    pub success_rate: u8,
}

impl Metrics {
    pub fn from_data(accounts: &[Account], tasks: &[Task]) -> Self {
        let mut by_status = StatusCounts::default();
        for task in tasks {
            match task.status_kind() {
                Some(TaskStatus::Completed) => by_status.completed += 1,
                Some(TaskStatus::Pending) => by_status.pending += 1,
                Some(TaskStatus::InProgress) => by_status.in_progress += 1,
                Some(TaskStatus::Failed) => by_status.failed += 1,
                None => {}
            }
        }

        Self {
            total_accounts: accounts.len(),
            total_tasks: tasks.len(),
            success_rate: success_rate(by_status.completed, tasks.len()),
            by_status,
            by_platform: count_by(accounts.iter().map(|a| a.platform.as_str()), UNKNOWN_PLATFORM),
            by_task_type: count_by(tasks.iter().map(|t| t.task_type.as_str()), UNTYPED_TASK),
        }
    }
}

fn count_by<'a>(keys: impl Iterator<Item = &'a str>, fallback: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        let key = if key.trim().is_empty() { fallback } else { key };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

fn success_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Fetch accounts and tasks concurrently and aggregate them.
pub async fn fetch_metrics(client: &SessionSecurityClient) -> Result<Metrics, ApiError> {
    let (accounts, tasks) = futures::try_join!(client.list_accounts(), client.list_tasks())?;
    Ok(Metrics::from_data(&accounts, &tasks))
}
