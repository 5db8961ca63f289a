// src/repository/mod.rs

//! Storage seams. Handlers only see these traits; the MongoDB binding backs
//! production and the in-memory binding backs tests and local runs.

mod memory;
mod mongo;

pub use memory::{InMemoryTasks, InMemoryUsers};
pub use mongo::{MongoTasks, MongoUsers};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTask, NewUser, Task, TaskChanges, TaskStatus, User};

#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique constraint rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`RepoError::Duplicate`] when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError>;
}

/// Every call is scoped by `owner`: a task owned by someone else behaves
/// exactly like a task that does not exist.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, owner: &str, task: NewTask) -> Result<Task, RepoError>;

    /// Most recent first.
    async fn list(&self, owner: &str, status: Option<TaskStatus>) -> Result<Vec<Task>, RepoError>;

    async fn update(
        &self,
        owner: &str,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, RepoError>;

    async fn delete(&self, owner: &str, id: &str) -> Result<Option<Task>, RepoError>;
}
