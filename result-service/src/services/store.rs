use crate::models::StoredResult;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use service_core::error::AppError;

/// Persistence for submitted results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert one result and return the id the store assigned to it.
    async fn insert(&self, result: &StoredResult) -> Result<Bson, AppError>;

    /// Up to `limit` results, newest `createdAt` first.
    async fn recent(&self, limit: i64) -> Result<Vec<Document>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
