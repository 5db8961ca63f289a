// src/repository/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{RepoError, TaskRepository, UserRepository};
use crate::models::{NewTask, NewUser, Task, TaskChanges, TaskStatus, User};

/// Users kept in process memory. Data is lost on restart.
#[derive(Default)]
pub struct InMemoryUsers {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Duplicate(user.email));
        }

        let stored = User {
            id: ObjectId::new().to_hex(),
            name: user.name,
            email: user.email,
            password: user.password_hash,
        };
        users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

/// Tasks kept in process memory, in insertion order.
#[derive(Default)]
pub struct InMemoryTasks {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTasks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTasks {
    async fn insert(&self, owner: &str, task: NewTask) -> Result<Task, RepoError> {
        let stored = task.into_task(ObjectId::new().to_hex(), owner.to_string(), Utc::now());
        self.tasks.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, owner: &str, status: Option<TaskStatus>) -> Result<Vec<Task>, RepoError> {
        let tasks = self.tasks.read().await;
        // Newest insertion first so equal timestamps still come out most recent first.
        let mut owned: Vec<Task> = tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == owner)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(
        &self,
        owner: &str,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, RepoError> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id && t.user_id == owner) else {
            return Ok(None);
        };
        changes.apply(task);
        Ok(Some(task.clone()))
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<Option<Task>, RepoError> {
        let mut tasks = self.tasks.write().await;
        let position = tasks.iter().position(|t| t.id == id && t.user_id == owner);
        Ok(position.map(|i| tasks.remove(i)))
    }
}
