use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "`{}` is not a valid status; expected one of pending, in-progress, completed",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "`{}` is not a valid priority; expected one of low, medium, high",
                    s
                ))
            })
    }
}

/// Parses a list filter: `all` (or nothing) means no filter.
pub fn parse_status_filter(raw: Option<&str>) -> ApiResult<Option<TaskStatus>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

/// A task as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
    /// Accumulated seconds.
    #[serde(default)]
    pub time_spent: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Raw body of `POST /api/tasks`. Everything is optional so that a missing
/// title surfaces as a validation message rather than a parse failure.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Seconds; fractional values are rounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A validated task that has no id or owner yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub notes: String,
    pub time_spent: u64,
    pub tags: Vec<String>,
}

impl CreateTaskRequest {
    pub fn validate(self) -> ApiResult<NewTask> {
        let title = validate_title(self.title.as_deref().unwrap_or_default())?;
        Ok(NewTask {
            title,
            status: parse_optional(self.status.as_deref())?.unwrap_or_default(),
            priority: parse_optional(self.priority.as_deref())?.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            time_spent: clamp_time_spent(self.time_spent.unwrap_or(0.0)),
            tags: clean_tags(self.tags.unwrap_or_default()),
        })
    }
}

impl NewTask {
    pub fn into_task(self, id: String, user_id: String, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            status: self.status,
            priority: self.priority,
            notes: self.notes,
            time_spent: self.time_spent,
            tags: self.tags,
            user_id,
            created_at,
        }
    }
}

/// Raw body of `PATCH /api/tasks/{id}`. Fields that are absent stay untouched;
/// owner, id and creation time cannot be changed and are ignored if sent.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Seconds; fractional values are rounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A validated partial update.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub time_spent: Option<u64>,
    pub tags: Option<Vec<String>>,
}

impl UpdateTaskRequest {
    pub fn validate(self) -> ApiResult<TaskChanges> {
        Ok(TaskChanges {
            title: self.title.as_deref().map(validate_title).transpose()?,
            status: parse_optional(self.status.as_deref())?,
            priority: parse_optional(self.priority.as_deref())?,
            notes: self.notes,
            time_spent: self.time_spent.map(clamp_time_spent),
            tags: self.tags.map(clean_tags),
        })
    }
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        *self == TaskChanges::default()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(time_spent) = self.time_spent {
            task.time_spent = time_spent;
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
    }
}

fn validate_title(raw: &str) -> ApiResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Task title is required"));
    }
    Ok(title.to_string())
}

fn parse_optional<T: FromStr<Err = ApiError>>(raw: Option<&str>) -> ApiResult<Option<T>> {
    raw.map(str::parse).transpose()
}

/// Largest `timeSpent` a stored task can hold (the range of a BSON int64).
pub const MAX_TIME_SPENT: u64 = i64::MAX as u64;

/// Rounds to whole seconds and keeps the result within `0..=MAX_TIME_SPENT`.
pub fn clamp_time_spent(seconds: f64) -> u64 {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0;
    }
    // `as` saturates at u64::MAX for out-of-range floats.
    (seconds.round() as u64).min(MAX_TIME_SPENT)
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
