// src/db.rs

use log::info;
use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Database, IndexModel,
};

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> mongodb::error::Result<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        let mongodb = MongoDB { client, db };
        mongodb.ensure_indexes().await?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(mongodb)
    }

    /// Unique emails, and the owner/recency index the task listing runs on.
    async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.db
            .collection::<mongodb::bson::Document>("users")
            .create_index(unique_email)
            .await?;

        let by_owner = IndexModel::builder()
            .keys(doc! { "userId": 1, "createdAt": -1 })
            .build();
        self.db
            .collection::<mongodb::bson::Document>("tasks")
            .create_index(by_owner)
            .await?;
        Ok(())
    }
}
