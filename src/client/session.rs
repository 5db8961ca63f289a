//! Client workflows: each command of the terminal client as one operation over
//! the API and the local store.
//!
//! The persisted UI state only changes after the server accepted the matching
//! write, so a failed time merge leaves the timer running on disk.

use chrono::{DateTime, Utc};
use log::{debug, info};

use super::api::ApiClient;
use super::cache::{LocalStore, TaskListing};
use super::state::{ActiveTimer, ElapsedTime, SubmittedDraft, TimerTransition};
use super::ClientError;
use crate::analytics::{summarize, TaskSummary};
use crate::models::{PublicUser, Task, UpdateTaskRequest, MAX_TIME_SPENT};

/// Elapsed time that has been added to a task on the server.
#[derive(Debug, Clone)]
pub struct MergedTime {
    pub elapsed: ElapsedTime,
    pub task: Task,
}

#[derive(Debug, Clone)]
pub enum TimerOutcome {
    /// Timing `task`; `flushed` is the merge of the timer it replaced.
    Started {
        task: Task,
        flushed: Option<MergedTime>,
    },
    Stopped(MergedTime),
}

pub struct Session {
    api: ApiClient,
    store: LocalStore,
}

impl Session {
    pub fn new(api_url: &str, store: LocalStore) -> Self {
        let api = ApiClient::new(api_url).with_token(store.token().map(String::from));
        Self { api, store }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub fn is_logged_in(&self) -> bool {
        self.store.token().is_some()
    }

    pub fn require_login(&self) -> Result<(), ClientError> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(ClientError::NotLoggedIn)
        }
    }

    /// Drops a stored session the server no longer accepts.
    fn reject(&mut self, err: ClientError) -> ClientError {
        if err.is_unauthorized() && self.store.token().is_some() {
            info!("Server rejected the stored token, clearing the session");
            self.store.clear_session();
            if let Err(e) = self.store.save() {
                debug!("Could not clear rejected session: {}", e);
            }
            return ClientError::SessionExpired;
        }
        err
    }

    fn start_session(&mut self, auth: crate::auth::AuthResponse) -> Result<PublicUser, ClientError> {
        let user = auth.user.clone();
        self.api = self.api.clone().with_token(Some(auth.token.clone()));
        self.store.set_session(auth);
        self.store.save()?;
        Ok(user)
    }

    pub async fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: Option<&str>,
    ) -> Result<PublicUser, ClientError> {
        if confirm_password.is_some_and(|c| c != password) {
            return Err(ClientError::PasswordMismatch);
        }
        let auth = self.api.signup(name, email, password).await?;
        self.start_session(auth)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let auth = self.api.login(email, password).await?;
        self.start_session(auth)
    }

    /// Clears the session. Returns the timer that was discarded, if any.
    pub fn logout(&mut self) -> Result<Option<ActiveTimer>, ClientError> {
        let discarded = self.store.ui().active_timer().cloned();
        self.store.clear_session();
        self.api = self.api.clone().with_token(None);
        self.store.save()?;
        Ok(discarded)
    }

    /// The server's view of the user, or the cached details when offline.
    pub async fn whoami(&mut self) -> Result<PublicUser, ClientError> {
        self.require_login()?;
        match self.api.me().await {
            Ok(user) => Ok(user),
            Err(e) if e.is_offline() => self.store.user().cloned().ok_or(e),
            Err(e) => Err(self.reject(e)),
        }
    }

    pub fn update_profile(
        &mut self,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<PublicUser, ClientError> {
        let user = self.store.update_profile(name, email)?;
        self.store.save()?;
        Ok(user)
    }

    pub async fn fetch_tasks(&mut self) -> Result<TaskListing, ClientError> {
        self.require_login()?;
        let fetched = self.api.list_tasks(None).await;
        let listing = match self.store.reconcile(fetched, Utc::now()) {
            Ok(listing) => listing,
            Err(e) => return Err(self.reject(e)),
        };
        self.store.save()?;
        Ok(listing)
    }

    pub async fn find_task(&mut self, id: &str) -> Result<Task, ClientError> {
        let listing = self.fetch_tasks().await?;
        listing
            .tasks()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| ClientError::TaskNotFound(id.to_string()))
    }

    /// Sends a submitted draft as a create or an update.
    pub async fn submit(&mut self, submitted: SubmittedDraft) -> Result<Task, ClientError> {
        self.require_login()?;
        let result = match &submitted {
            SubmittedDraft::Create(request) => self.api.create_task(request).await,
            SubmittedDraft::Update { id, changes } => self.api.update_task(id, changes).await,
        };
        self.after_mutation(result)
    }

    pub async fn update(&mut self, id: &str, changes: UpdateTaskRequest) -> Result<Task, ClientError> {
        self.require_login()?;
        let result = self.api.update_task(id, &changes).await;
        self.after_mutation(result)
    }

    /// Deletes a task. The flag reports whether its running timer was dropped.
    pub async fn delete(&mut self, id: &str) -> Result<(Task, bool), ClientError> {
        self.require_login()?;
        let result = self.api.delete_task(id).await;
        let task = self.after_mutation(result)?;
        let cancelled = self.store.ui_mut().task_deleted(&task.id);
        self.store.save()?;
        Ok((task, cancelled))
    }

    fn after_mutation(&mut self, result: Result<Task, ClientError>) -> Result<Task, ClientError> {
        match result {
            Ok(task) => {
                self.store.invalidate_tasks();
                self.store.save()?;
                Ok(task)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    async fn merge_time(&mut self, elapsed: ElapsedTime) -> Result<MergedTime, ClientError> {
        let task = self.find_task(&elapsed.task_id).await?;
        let total = task
            .time_spent
            .saturating_add(elapsed.seconds)
            .min(MAX_TIME_SPENT);
        let changes = UpdateTaskRequest {
            time_spent: Some(total as f64),
            ..Default::default()
        };
        let task = self.update(&task.id, changes).await?;
        Ok(MergedTime { elapsed, task })
    }

    /// Starts timing `id`, or stops it when it is the running task.
    pub async fn toggle_timer(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<TimerOutcome, ClientError> {
        let task = self.find_task(id).await?;
        let mut next = self.store.ui().clone();
        let outcome = match next.start_timer(&task.id, now)? {
            TimerTransition::Started { flushed, .. } => {
                let flushed = match flushed {
                    Some(elapsed) => Some(self.merge_time(elapsed).await?),
                    None => None,
                };
                TimerOutcome::Started { task, flushed }
            }
            TimerTransition::Stopped(elapsed) => TimerOutcome::Stopped(self.merge_time(elapsed).await?),
        };
        *self.store.ui_mut() = next;
        self.store.save()?;
        Ok(outcome)
    }

    pub async fn stop_timer(&mut self, now: DateTime<Utc>) -> Result<Option<MergedTime>, ClientError> {
        self.require_login()?;
        let mut next = self.store.ui().clone();
        let Some(elapsed) = next.stop_timer(now) else {
            return Ok(None);
        };
        let merged = self.merge_time(elapsed).await?;
        *self.store.ui_mut() = next;
        self.store.save()?;
        Ok(Some(merged))
    }

    /// Server summary, or one computed over cached tasks when offline.
    pub async fn summary(&mut self) -> Result<TaskSummary, ClientError> {
        self.require_login()?;
        match self.api.summary().await {
            Ok(summary) => Ok(summary),
            Err(e) if e.is_offline() => {
                let listing = self.fetch_tasks().await?;
                Ok(summarize(listing.tasks()))
            }
            Err(e) => Err(self.reject(e)),
        }
    }
}
