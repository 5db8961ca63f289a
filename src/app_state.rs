use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::db::MongoDB;
use crate::repository::{
    InMemoryTasks, InMemoryUsers, MongoTasks, MongoUsers, TaskRepository, UserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub config: Config,
}

impl AppState {
    /// Connects the storage backend named in the configuration.
    pub async fn init(config: Config) -> mongodb::error::Result<Self> {
        match &config.storage {
            StorageBackend::Mongo { uri, database_name } => {
                let mongodb = MongoDB::init(uri, database_name).await?;
                Ok(Self {
                    users: Arc::new(MongoUsers::new(&mongodb)),
                    tasks: Arc::new(MongoTasks::new(&mongodb)),
                    config,
                })
            }
            StorageBackend::Memory => Ok(Self::in_memory(config)),
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self {
            users: Arc::new(InMemoryUsers::new()),
            tasks: Arc::new(InMemoryTasks::new()),
            config,
        }
    }
}
