//! Runs the `devtrack-cli` binary against a state file in a temp dir.
//!
//! The API URL points at a port nothing listens on, so every server call is offline.

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use chrono::{Duration, Utc};
use predicates::prelude::*;
use tempfile::TempDir;

use devtrack::auth::AuthResponse;
use devtrack::client::state::View;
use devtrack::client::LocalStore;
use devtrack::models::{Priority, PublicUser, Task, TaskStatus};

const UNREACHABLE: &str = "http://127.0.0.1:9";

fn devtrack(state: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("devtrack-cli");
    cmd.env("DEVTRACK_STATE", state)
        .env("DEVTRACK_API_URL", UNREACHABLE);
    cmd
}

fn task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        title: format!("task {id}"),
        status: TaskStatus::Pending,
        priority: Priority::Medium,
        notes: String::new(),
        time_spent: 0,
        tags: vec![],
        user_id: "u1".into(),
        created_at: Utc::now(),
    }
}

/// A logged-in state file with two cached tasks, optionally timing `t1`.
fn seed_session(dir: &TempDir, timing: bool) -> std::path::PathBuf {
    let path = dir.path().join("state.json");
    let mut store = LocalStore::open(&path).unwrap();
    store.set_session(AuthResponse {
        user: PublicUser {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@x.com".into(),
        },
        token: "tok".into(),
    });
    store.replace_tasks(vec![task("t1"), task("t2")], Utc::now());
    if timing {
        store
            .ui_mut()
            .start_timer("t1", Utc::now() - Duration::minutes(30))
            .unwrap();
    }
    store.save().unwrap();
    path
}

mod logged_out {
    use super::*;

    #[test]
    fn bare_invocation_shows_the_landing_page() {
        let dir = TempDir::new().unwrap();
        devtrack(&dir.path().join("state.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains("DevTrack - track what you build"))
            .stdout(predicate::str::contains("devtrack-cli signup"));
    }

    #[test]
    fn signup_rejects_a_mismatched_confirmation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        devtrack(&path)
            .args(["signup", "--name", "Ana", "--email", "ana@x.com"])
            .args(["--password", "pw123", "--confirm-password", "pw124"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Passwords do not match"));
        assert!(!path.exists());
    }

    #[test]
    fn task_commands_need_a_login() {
        let dir = TempDir::new().unwrap();
        devtrack(&dir.path().join("state.json"))
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not logged in"));
    }

    #[test]
    fn filter_and_view_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        devtrack(&path)
            .args(["filter", "in-progress"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Filter: in-progress"));
        devtrack(&path)
            .args(["view", "analytics"])
            .assert()
            .success()
            .stdout(predicate::str::contains("DevTrack"));
        devtrack(&path)
            .args(["filter", "done"])
            .assert()
            .failure();

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.ui().filter, Some(TaskStatus::InProgress));
        assert_eq!(store.ui().view, View::Analytics);
    }
}

mod logged_in {
    use super::*;

    #[test]
    fn profile_updates_the_cached_user() {
        let dir = TempDir::new().unwrap();
        let path = seed_session(&dir, false);

        devtrack(&path)
            .args(["profile", "--name", "Ana Lima"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Profile: Ana Lima <ana@x.com>"));
        devtrack(&path).arg("profile").assert().failure();

        devtrack(&path)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("Ana Lima <ana@x.com> (u1)"));
        assert_eq!(LocalStore::open(&path).unwrap().user().unwrap().name, "Ana Lima");
    }

    #[test]
    fn offline_list_uses_the_cache() {
        let dir = TempDir::new().unwrap();
        let path = seed_session(&dir, false);

        devtrack(&path)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("task t1"))
            .stderr(predicate::str::contains("offline: showing tasks cached at"));
    }

    #[test]
    fn failed_stop_keeps_the_timer_running() {
        let dir = TempDir::new().unwrap();
        let path = seed_session(&dir, true);

        devtrack(&path)
            .args(["timer", "stop"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("server unreachable"));
        devtrack(&path)
            .args(["timer", "status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Timing t1"));

        devtrack(&path)
            .args(["timer", "start", "t2"])
            .assert()
            .failure();
        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.ui().active_timer().unwrap().task_id, "t1");
    }

    #[test]
    fn logout_discards_a_running_timer() {
        let dir = TempDir::new().unwrap();
        let path = seed_session(&dir, true);

        devtrack(&path)
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged out"))
            .stderr(predicate::str::contains("discarding the running timer"));

        let store = LocalStore::open(&path).unwrap();
        assert!(store.token().is_none());
        assert!(store.ui().active_timer().is_none());
    }
}
