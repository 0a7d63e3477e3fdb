#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use result_service::config::{MongoConfig, ResultConfig};
use result_service::models::StoredResult;
use result_service::services::{MongoDb, ResultStore};
use result_service::startup::{router, AppState, Application, RESULT_PATH};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const BOUNDARY: &str = "----result-service-test-boundary";

/// Nothing listens on the discard port; server selection gives up quickly.
pub const UNREACHABLE_MONGODB_URI: &str =
    "mongodb://127.0.0.1:9/?serverSelectionTimeoutMS=300&connectTimeoutMS=300";

/// Store that keeps documents in memory, the way MongoDB would return them.
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<Vec<Document>>,
}

impl InMemoryStore {
    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn insert(&self, result: &StoredResult) -> Result<Bson, AppError> {
        let mut document = bson::to_document(result).map_err(|e| AppError::database("Database error", e))?;
        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert("_id", id.clone());
                id
            }
        };
        self.documents.lock().unwrap().push(document);
        Ok(id)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let mut documents = self.all();
        documents.sort_by_key(|document| {
            std::cmp::Reverse(
                document
                    .get_datetime("createdAt")
                    .map(|at| at.timestamp_millis())
                    .unwrap_or(i64::MIN),
            )
        });
        documents.truncate(limit as usize);
        Ok(documents)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Store whose every operation fails like a lost connection.
pub struct FailingStore;

#[async_trait]
impl ResultStore for FailingStore {
    async fn insert(&self, _result: &StoredResult) -> Result<Bson, AppError> {
        Err(AppError::database("Database error", anyhow::anyhow!("connection reset by peer")))
    }

    async fn recent(&self, _limit: i64) -> Result<Vec<Document>, AppError> {
        Err(AppError::database("Database error", anyhow::anyhow!("connection reset by peer")))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Err(AppError::database("Database error", anyhow::anyhow!("connection reset by peer")))
    }
}

pub fn test_config(uri: &str) -> ResultConfig {
    ResultConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            ..CoreConfig::default()
        },
        mongodb: MongoConfig::new(uri),
    }
}

pub fn app_with_store(store: Arc<dyn ResultStore>) -> axum::Router {
    router(AppState { store })
}

/// One part of a hand-built multipart body.
pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: Option<&'a str>,
        content: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn errores(content: &str) -> Part<'_> {
    Part::File {
        name: "errores",
        file_name: "log.txt",
        content_type: Some("text/plain"),
        content: content.as_bytes(),
    }
}

pub fn data(value: &str) -> Part<'_> {
    Part::Text {
        name: "data",
        value,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                content_type,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(content_type) = content_type {
                    body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(content);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn post_result(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(RESULT_PATH)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get_results() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(RESULT_PATH)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: MongoDb,
}

impl TestApp {
    /// Serve the real application against `uri` on a random port.
    pub async fn spawn(uri: &str, database: Option<&str>) -> Self {
        let mut config = test_config(uri);
        if let Some(database) = database {
            config.mongodb.database = database.to_string();
        }

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port, db }
    }

    pub fn result_url(&self) -> String {
        format!("{}{}", self.address, RESULT_PATH)
    }

    /// Drop the test database, if a connection was ever made.
    pub async fn cleanup(&self) {
        if let Ok(client) = self.db.client().await {
            let _ = client
                .database(&self.db.config().database)
                .drop(None)
                .await;
        }
    }
}

pub fn created_at_millis(document: &Document) -> i64 {
    document
        .get_datetime("createdAt")
        .map(|at| at.timestamp_millis())
        .unwrap_or_default()
}

pub fn id_filter(id: &Value) -> Document {
    match id.as_str().and_then(|hex| ObjectId::parse_str(hex).ok()) {
        Some(oid) => doc! { "_id": oid },
        None => doc! { "_id": bson::to_bson(id).unwrap_or(Bson::Null) },
    }
}
