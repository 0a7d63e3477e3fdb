use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Connection string used when `MONGODB_URI` is not set.
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
/// Database holding the submitted results. Not configurable at runtime.
pub const DATABASE_NAME: &str = "result-testing";
/// Collection holding the submitted results. Not configurable at runtime.
pub const COLLECTION_NAME: &str = "result";

#[derive(Debug, Clone, Deserialize)]
pub struct ResultConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: DATABASE_NAME.to_string(),
            collection: COLLECTION_NAME.to_string(),
        }
    }
}

impl ResultConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        Ok(ResultConfig {
            common: common_config,
            mongodb: MongoConfig::new(get_env("MONGODB_URI", DEFAULT_MONGODB_URI)),
        })
    }
}

fn get_env(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(val) if !val.is_empty() => val,
        _ => default.to_string(),
    }
}
