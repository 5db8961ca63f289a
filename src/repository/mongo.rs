// src/repository/mongo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::{debug, error};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection,
};
use serde::{Deserialize, Deserializer, Serialize};

use super::{RepoError, TaskRepository, UserRepository};
use crate::db::MongoDB;
use crate::models::{
    clamp_time_spent, NewTask, NewUser, Priority, Task, TaskChanges, TaskStatus, User,
};

const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for RepoError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
            if write_error.code == DUPLICATE_KEY {
                return RepoError::Duplicate(write_error.message.clone());
            }
        }
        error!("MongoDB error: {}", err);
        RepoError::Backend(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    password: String,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        User {
            id: doc.id.to_hex(),
            name: doc.name,
            email: doc.email,
            password: doc.password,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    status: TaskStatus,
    priority: Priority,
    #[serde(default)]
    notes: String,
    #[serde(default, deserialize_with = "seconds_from_number")]
    time_spent: i64,
    #[serde(default)]
    tags: Vec<String>,
    user_id: ObjectId,
    created_at: BsonDateTime,
}

// Older documents may hold `timeSpent` as a double.
fn seconds_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_time_spent(raw) as i64)
}

impl From<TaskDocument> for Task {
    fn from(doc: TaskDocument) -> Self {
        Task {
            id: doc.id.to_hex(),
            title: doc.title,
            status: doc.status,
            priority: doc.priority,
            notes: doc.notes,
            time_spent: doc.time_spent.max(0) as u64,
            tags: doc.tags,
            user_id: doc.user_id.to_hex(),
            created_at: DateTime::<Utc>::from_timestamp_millis(doc.created_at.timestamp_millis())
                .unwrap_or_default(),
        }
    }
}

// Ids arrive from URLs and tokens; anything that is not an ObjectId simply
// cannot match a stored document.
fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

pub struct MongoUsers {
    users: Collection<UserDocument>,
}

impl MongoUsers {
    pub fn new(mongodb: &MongoDB) -> Self {
        Self {
            users: mongodb.db.collection("users"),
        }
    }
}

#[async_trait]
impl UserRepository for MongoUsers {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let doc = UserDocument {
            id: ObjectId::new(),
            name: user.name,
            email: user.email,
            password: user.password_hash,
        };
        self.users.insert_one(&doc).await?;
        debug!("Inserted user {}", doc.id);
        Ok(doc.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let found = self.users.find_one(doc! { "email": email }).await?;
        Ok(found.map(User::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError> {
        let Some(object_id) = parse_id(id) else {
            return Ok(None);
        };
        let found = self.users.find_one(doc! { "_id": object_id }).await?;
        Ok(found.map(User::from))
    }
}

pub struct MongoTasks {
    tasks: Collection<TaskDocument>,
}

impl MongoTasks {
    pub fn new(mongodb: &MongoDB) -> Self {
        Self {
            tasks: mongodb.db.collection("tasks"),
        }
    }

    fn owned_filter(owner: &str, id: &str) -> Option<Document> {
        let id = parse_id(id)?;
        let owner = parse_id(owner)?;
        Some(doc! { "_id": id, "userId": owner })
    }
}

fn set_document(changes: &TaskChanges) -> Document {
    let mut set = Document::new();
    if let Some(title) = &changes.title {
        set.insert("title", title.as_str());
    }
    if let Some(status) = changes.status {
        set.insert("status", status.as_str());
    }
    if let Some(priority) = changes.priority {
        set.insert("priority", priority.as_str());
    }
    if let Some(notes) = &changes.notes {
        set.insert("notes", notes.as_str());
    }
    if let Some(time_spent) = changes.time_spent {
        set.insert("timeSpent", i64::try_from(time_spent).unwrap_or(i64::MAX));
    }
    if let Some(tags) = &changes.tags {
        set.insert("tags", tags.clone());
    }
    set
}

#[async_trait]
impl TaskRepository for MongoTasks {
    async fn insert(&self, owner: &str, task: NewTask) -> Result<Task, RepoError> {
        let user_id = parse_id(owner)
            .ok_or_else(|| RepoError::Backend(format!("invalid owner id {}", owner)))?;
        let doc = TaskDocument {
            id: ObjectId::new(),
            title: task.title,
            status: task.status,
            priority: task.priority,
            notes: task.notes,
            time_spent: i64::try_from(task.time_spent).unwrap_or(i64::MAX),
            tags: task.tags,
            user_id,
            created_at: BsonDateTime::from_millis(Utc::now().timestamp_millis()),
        };
        self.tasks.insert_one(&doc).await?;
        Ok(doc.into())
    }

    async fn list(&self, owner: &str, status: Option<TaskStatus>) -> Result<Vec<Task>, RepoError> {
        let Some(user_id) = parse_id(owner) else {
            return Ok(Vec::new());
        };
        let mut filter = doc! { "userId": user_id };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }

        let docs: Vec<TaskDocument> = self
            .tasks
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(Task::from).collect())
    }

    async fn update(
        &self,
        owner: &str,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, RepoError> {
        let Some(filter) = Self::owned_filter(owner, id) else {
            return Ok(None);
        };
        // MongoDB rejects an empty $set, so a no-op patch is just a scoped read.
        if changes.is_empty() {
            return Ok(self.tasks.find_one(filter).await?.map(Task::from));
        }

        let updated = self
            .tasks
            .find_one_and_update(filter, doc! { "$set": set_document(changes) })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Task::from))
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<Option<Task>, RepoError> {
        let Some(filter) = Self::owned_filter(owner, id) else {
            return Ok(None);
        };
        let deleted = self.tasks.find_one_and_delete(filter).await?;
        Ok(deleted.map(Task::from))
    }
}
