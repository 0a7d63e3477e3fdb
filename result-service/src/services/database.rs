use crate::config::MongoConfig;
use crate::models::StoredResult;
use crate::services::ResultStore;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
    Client as MongoClient, Collection,
};
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Handle to the results collection.
///
/// Clones share one client. The client is created and pinged by the first
/// operation that needs it and then reused for the life of the process; a
/// failed attempt leaves the handle empty so a later request can retry.
#[derive(Clone)]
pub struct MongoDb {
    inner: Arc<Shared>,
}

struct Shared {
    config: MongoConfig,
    client: OnceCell<MongoClient>,
}

impl MongoDb {
    pub fn new(config: MongoConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                config,
                client: OnceCell::new(),
            }),
        }
    }

    pub async fn client(&self) -> Result<&MongoClient, AppError> {
        self.inner.client.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<MongoClient, AppError> {
        let config = &self.inner.config;
        tracing::info!(database = %config.database, "Connecting to MongoDB");

        let client = MongoClient::with_uri_str(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                AppError::from(e)
            })?;

        tracing::info!(database = %config.database, "Successfully connected to MongoDB");
        Ok(client)
    }

    /// Whether a client has been established yet.
    pub fn is_connected(&self) -> bool {
        self.inner.client.initialized()
    }

    pub fn config(&self) -> &MongoConfig {
        &self.inner.config
    }

    pub async fn collection<T: Send + Sync>(&self) -> Result<Collection<T>, AppError> {
        let config = &self.inner.config;
        Ok(self
            .client()
            .await?
            .database(&config.database)
            .collection(&config.collection))
    }
}

#[async_trait]
impl ResultStore for MongoDb {
    async fn insert(&self, result: &StoredResult) -> Result<Bson, AppError> {
        let outcome = self
            .collection::<StoredResult>()
            .await?
            .insert_one(result, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert result into database: {}", e);
                AppError::from(e)
            })?;

        Ok(outcome.inserted_id)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 }) // Newest first
            .limit(limit)
            .build();

        let cursor = self
            .collection::<Document>()
            .await?
            .find(None, find_options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query recent results: {}", e);
                AppError::from(e)
            })?;

        let documents: Vec<Document> = cursor.try_collect().await.map_err(AppError::from)?;
        Ok(documents)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client()
            .await?
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}
