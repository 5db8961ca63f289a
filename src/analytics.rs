// src/analytics.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskStatus};

/// Per-user dashboard figures: status counts, total time, and hours per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Seconds across all tasks.
    pub total_time_spent: u64,
    pub trend: Vec<TrendPoint>,
}

/// Hours logged on tasks created on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub hours: f64,
}

pub fn summarize(tasks: &[Task]) -> TaskSummary {
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for task in tasks {
        let day = per_day.entry(task.created_at.date_naive()).or_default();
        *day = day.saturating_add(task.time_spent);
    }

    TaskSummary {
        total: tasks.len(),
        pending: count(TaskStatus::Pending),
        in_progress: count(TaskStatus::InProgress),
        completed: count(TaskStatus::Completed),
        total_time_spent: tasks
            .iter()
            .fold(0u64, |total, t| total.saturating_add(t.time_spent)),
        trend: per_day
            .into_iter()
            .map(|(date, seconds)| TrendPoint {
                date,
                hours: seconds as f64 / 3600.0,
            })
            .collect(),
    }
}
