//! UI state of the terminal client.
//!
//! The client is always in exactly one [`Mode`]. A timer and an open draft
//! never coexist, and every transition that ends a timer hands the elapsed
//! time back to the caller, which merges it into the task's `timeSpent`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CreateTaskRequest, Priority, Task, TaskStatus, UpdateTaskRequest};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("stop the running timer before editing tasks")]
    TimerRunning,
    #[error("a task draft is open; submit or cancel it first")]
    DraftOpen,
    #[error("no task draft is open")]
    NoDraft,
    #[error("Task title is required")]
    EmptyTitle,
    #[error("`{0}` is not a view; expected board or analytics")]
    UnknownView(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Board,
    Analytics,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Board => "board",
            View::Analytics => "analytics",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "board" => Ok(View::Board),
            "analytics" => Ok(View::Analytics),
            other => Err(StateError::UnknownView(other.to_string())),
        }
    }
}

/// Task fields being edited. `task_id` is `None` for a new task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub task_id: Option<String>,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub notes: String,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: Some(task.id.clone()),
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            notes: task.notes.clone(),
            tags: task.tags.clone(),
        }
    }
}

/// What a submitted draft turns into on the wire.
#[derive(Debug, Clone)]
pub enum SubmittedDraft {
    Create(CreateTaskRequest),
    Update { id: String, changes: UpdateTaskRequest },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub task_id: String,
    pub started_at: DateTime<Utc>,
}

impl ActiveTimer {
    pub fn elapsed(&self, now: DateTime<Utc>) -> ElapsedTime {
        // A clock that moved backwards counts as zero.
        let seconds = (now - self.started_at).num_seconds().max(0) as u64;
        ElapsedTime {
            task_id: self.task_id.clone(),
            seconds,
        }
    }
}

/// Seconds to add to a task's `timeSpent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElapsedTime {
    pub task_id: String,
    pub seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTransition {
    /// A timer started. `flushed` holds the time of the timer it replaced.
    Started { task_id: String, flushed: Option<ElapsedTime> },
    /// The running timer belonged to the requested task and was stopped.
    Stopped(ElapsedTime),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Mode {
    #[default]
    Idle,
    Editing { draft: TaskDraft },
    Timing { timer: ActiveTimer },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientState {
    pub mode: Mode,
    /// `None` shows every status.
    pub filter: Option<TaskStatus>,
    pub view: View,
}

impl ClientState {
    pub fn active_timer(&self) -> Option<&ActiveTimer> {
        match &self.mode {
            Mode::Timing { timer } => Some(timer),
            _ => None,
        }
    }

    /// Starts timing `task_id`, or stops it if it is the one already running.
    pub fn start_timer(
        &mut self,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TimerTransition, StateError> {
        let flushed = match &self.mode {
            Mode::Editing { .. } => return Err(StateError::DraftOpen),
            Mode::Timing { timer } if timer.task_id == task_id => {
                let elapsed = timer.elapsed(now);
                self.mode = Mode::Idle;
                return Ok(TimerTransition::Stopped(elapsed));
            }
            Mode::Timing { timer } => Some(timer.elapsed(now)),
            Mode::Idle => None,
        };

        self.mode = Mode::Timing {
            timer: ActiveTimer {
                task_id: task_id.to_string(),
                started_at: now,
            },
        };
        Ok(TimerTransition::Started {
            task_id: task_id.to_string(),
            flushed,
        })
    }

    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Option<ElapsedTime> {
        let elapsed = self.active_timer()?.elapsed(now);
        self.mode = Mode::Idle;
        Some(elapsed)
    }

    pub fn begin_create(&mut self) -> Result<(), StateError> {
        self.begin(TaskDraft::default())
    }

    pub fn begin_edit(&mut self, task: &Task) -> Result<(), StateError> {
        self.begin(TaskDraft::from_task(task))
    }

    // An abandoned draft is replaced rather than blocking new edits.
    fn begin(&mut self, draft: TaskDraft) -> Result<(), StateError> {
        if let Mode::Timing { .. } = self.mode {
            return Err(StateError::TimerRunning);
        }
        self.mode = Mode::Editing { draft };
        Ok(())
    }

    pub fn draft_mut(&mut self) -> Option<&mut TaskDraft> {
        match &mut self.mode {
            Mode::Editing { draft } => Some(draft),
            _ => None,
        }
    }

    /// Leaves editing mode. On an empty title the draft stays open.
    pub fn submit_draft(&mut self) -> Result<SubmittedDraft, StateError> {
        let draft = match &self.mode {
            Mode::Editing { draft } => draft,
            _ => return Err(StateError::NoDraft),
        };
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(StateError::EmptyTitle);
        }

        let submitted = match &draft.task_id {
            None => SubmittedDraft::Create(CreateTaskRequest {
                title: Some(title.to_string()),
                status: Some(draft.status.as_str().to_string()),
                priority: Some(draft.priority.as_str().to_string()),
                notes: Some(draft.notes.clone()),
                time_spent: None,
                tags: Some(draft.tags.clone()),
            }),
            Some(id) => SubmittedDraft::Update {
                id: id.clone(),
                changes: UpdateTaskRequest {
                    title: Some(title.to_string()),
                    status: Some(draft.status.as_str().to_string()),
                    priority: Some(draft.priority.as_str().to_string()),
                    notes: Some(draft.notes.clone()),
                    time_spent: None,
                    tags: Some(draft.tags.clone()),
                },
            },
        };
        self.mode = Mode::Idle;
        Ok(submitted)
    }

    pub fn cancel_draft(&mut self) {
        if let Mode::Editing { .. } = self.mode {
            self.mode = Mode::Idle;
        }
    }

    /// Drops the timer of a deleted task without reporting its time.
    pub fn task_deleted(&mut self, task_id: &str) -> bool {
        match self.active_timer() {
            Some(timer) if timer.task_id == task_id => {
                self.mode = Mode::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn visible<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|t| self.filter.map_or(true, |status| t.status == status))
            .collect()
    }
}
