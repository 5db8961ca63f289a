//! Terminal client: API wrapper, local cache, view state and rendering.

pub mod api;
pub mod cache;
pub mod session;
pub mod state;
pub mod view;

use thiserror::Error;

pub use api::ApiClient;
pub use cache::{LocalStore, TaskListing};
pub use session::Session;
pub use state::{ClientState, StateError};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// The server could not be reached at all.
    #[error("server unreachable: {0}")]
    Offline(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not logged in; run `devtrack-cli login` first")]
    NotLoggedIn,

    /// The server rejected the stored token; the session has been cleared.
    #[error("session expired; log in again")]
    SessionExpired,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("local store: {0}")]
    Io(#[from] std::io::Error),

    #[error("local store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] StateError),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, ClientError::Offline(_))
    }
}
