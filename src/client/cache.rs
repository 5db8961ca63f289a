//! On-disk client state: session, cached task list and UI state.
//!
//! The server is authoritative. A successful fetch replaces the cached list,
//! a successful mutation invalidates it, and the cache is only read back when
//! the server cannot be reached.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::state::ClientState;
use super::ClientError;
use crate::auth::AuthResponse;
use crate::models::{PublicUser, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTasks {
    pub fetched_at: DateTime<Utc>,
    pub items: Vec<Task>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreData {
    token: Option<String>,
    user_details: Option<PublicUser>,
    tasks: Option<CachedTasks>,
    ui_state: ClientState,
}

/// Result of reconciling a fetch with the cache.
#[derive(Debug)]
pub enum TaskListing {
    Fresh(Vec<Task>),
    /// Served from the cache because the server was unreachable.
    Stale {
        tasks: Vec<Task>,
        fetched_at: DateTime<Utc>,
    },
}

impl TaskListing {
    pub fn tasks(&self) -> &[Task] {
        match self {
            TaskListing::Fresh(tasks) | TaskListing::Stale { tasks, .. } => tasks,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, TaskListing::Stale { .. })
    }
}

pub struct LocalStore {
    path: PathBuf,
    data: StoreData,
}

impl LocalStore {
    /// `<local data dir>/devtrack/state.json`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("devtrack"))
            .unwrap_or_else(|| PathBuf::from(".devtrack"))
            .join("state.json")
    }

    /// Loads the store, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting fresh", path.display());
                StoreData::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, data })
    }

    /// Writes a sibling temporary file and renames it over the store.
    pub fn save(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Option<&str> {
        self.data.token.as_deref()
    }

    pub fn user(&self) -> Option<&PublicUser> {
        self.data.user_details.as_ref()
    }

    pub fn set_session(&mut self, auth: AuthResponse) {
        self.data.token = Some(auth.token);
        self.data.user_details = Some(auth.user);
        // Another account's tasks must not leak into this session.
        self.data.tasks = None;
    }

    /// Merges edited profile fields into the cached user details. Local only.
    pub fn update_profile(
        &mut self,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<PublicUser, ClientError> {
        let user = self.data.user_details.as_mut().ok_or(ClientError::NotLoggedIn)?;
        if let Some(name) = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            user.name = name;
        }
        if let Some(email) = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
            user.email = email;
        }
        Ok(user.clone())
    }

    pub fn clear_session(&mut self) {
        self.data.token = None;
        self.data.user_details = None;
        self.data.tasks = None;
        self.data.ui_state = ClientState::default();
    }

    pub fn cached_tasks(&self) -> Option<&CachedTasks> {
        self.data.tasks.as_ref()
    }

    pub fn replace_tasks(&mut self, items: Vec<Task>, now: DateTime<Utc>) {
        self.data.tasks = Some(CachedTasks {
            fetched_at: now,
            items,
        });
    }

    pub fn invalidate_tasks(&mut self) {
        self.data.tasks = None;
    }

    /// Applies the reconciliation rule to the outcome of a full task fetch.
    pub fn reconcile(
        &mut self,
        fetched: Result<Vec<Task>, ClientError>,
        now: DateTime<Utc>,
    ) -> Result<TaskListing, ClientError> {
        match fetched {
            Ok(tasks) => {
                self.replace_tasks(tasks.clone(), now);
                Ok(TaskListing::Fresh(tasks))
            }
            Err(err) if err.is_offline() => match &self.data.tasks {
                Some(cached) => {
                    warn!("Server unreachable, using tasks cached at {}", cached.fetched_at);
                    Ok(TaskListing::Stale {
                        tasks: cached.items.clone(),
                        fetched_at: cached.fetched_at,
                    })
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    pub fn ui(&self) -> &ClientState {
        &self.data.ui_state
    }

    pub fn ui_mut(&mut self) -> &mut ClientState {
        &mut self.data.ui_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};
    use tempfile::TempDir;

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: "Write spec".into(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            notes: String::new(),
            time_spent: 0,
            tags: vec![],
            user_id: "u1".into(),
            created_at: Utc::now(),
        }
    }

    fn session() -> AuthResponse {
        AuthResponse {
            user: PublicUser {
                id: "u1".into(),
                name: "Ana".into(),
                email: "ana@x.com".into(),
            },
            token: "tok".into(),
        }
    }

    fn offline() -> ClientError {
        ClientError::Offline("connection refused".into())
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.token().is_none());
        assert!(store.cached_tasks().is_none());
    }

    #[test]
    fn session_and_cache_persist_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set_session(session());
        store.replace_tasks(vec![task("t1")], Utc::now());
        store.ui_mut().filter = Some(TaskStatus::Completed);
        store.save().unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.token(), Some("tok"));
        assert_eq!(reopened.user().unwrap().name, "Ana");
        assert_eq!(reopened.cached_tasks().unwrap().items.len(), 1);
        assert_eq!(reopened.ui().filter, Some(TaskStatus::Completed));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"userDetails\""));
        assert!(raw.contains("\"uiState\""));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(LocalStore::open(&path), Err(ClientError::Corrupt(_))));
    }

    #[test]
    fn fetch_replaces_and_offline_falls_back() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open(dir.path().join("state.json")).unwrap();

        assert!(store.reconcile(Err(offline()), Utc::now()).is_err());

        let listing = store.reconcile(Ok(vec![task("t1"), task("t2")]), Utc::now()).unwrap();
        assert!(!listing.is_stale());
        assert_eq!(listing.tasks().len(), 2);

        let listing = store.reconcile(Ok(vec![task("t3")]), Utc::now()).unwrap();
        assert_eq!(listing.tasks().len(), 1);

        let listing = store.reconcile(Err(offline()), Utc::now()).unwrap();
        assert!(listing.is_stale());
        assert_eq!(listing.tasks()[0].id, "t3");
    }

    #[test]
    fn server_errors_never_read_the_cache() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open(dir.path().join("state.json")).unwrap();
        store.replace_tasks(vec![task("t1")], Utc::now());

        let unauthorized = ClientError::Api {
            status: 401,
            message: "Please authenticate".into(),
        };
        let err = store.reconcile(Err(unauthorized), Utc::now()).unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn mutation_invalidates_and_logout_clears() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open(dir.path().join("state.json")).unwrap();
        store.set_session(session());
        store.replace_tasks(vec![task("t1")], Utc::now());

        store.invalidate_tasks();
        assert!(store.cached_tasks().is_none());

        store.replace_tasks(vec![task("t1")], Utc::now());
        store.clear_session();
        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert!(store.cached_tasks().is_none());
    }

    #[test]
    fn profile_edits_merge_into_cached_user() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        assert!(matches!(
            store.update_profile(Some("Ann".into()), None),
            Err(ClientError::NotLoggedIn)
        ));

        store.set_session(session());
        let user = store.update_profile(Some(" Ana Lima ".into()), Some("  ".into())).unwrap();
        assert_eq!(user.name, "Ana Lima");
        assert_eq!(user.email, "ana@x.com");
        assert_eq!(user.id, "u1");
        store.save().unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.user().unwrap().name, "Ana Lima");
        assert_eq!(reopened.token(), Some("tok"));
    }
}
