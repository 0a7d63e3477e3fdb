use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::borrow::Cow;
use thiserror::Error;

/// Multipart part carrying the uploaded error log.
pub const FILE_FIELD: &str = "errores";
/// Multipart part carrying the caller's JSON object.
pub const PAYLOAD_FIELD: &str = "data";

/// Keys written by the service on every stored result. Callers may not set them.
pub const RESERVED_FIELDS: [&str; 4] = ["errores", "fileInfo", "createdAt", "_insertedAt"];

/// Number of characters of `errores` echoed back after a write.
pub const PREVIEW_CHARS: usize = 200;

/// Client input failures, checked in declaration order before anything is stored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("File \"errores\" is required")]
    MissingFile,

    #[error("JSON data field \"data\" is required")]
    MissingPayload,

    #[error("Invalid JSON format in data field")]
    MalformedPayload,

    #[error("Field \"{0}\" is reserved and cannot be set in \"data\"")]
    ReservedField(String),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// File part as received, before it is decoded.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The two parts of a submission, each `None` when the form omitted it.
#[derive(Debug, Default)]
pub struct Submission {
    pub file: Option<UploadedFile>,
    pub payload: Option<String>,
}

impl Submission {
    /// Check presence, JSON syntax and key collisions, in that order. Any
    /// JSON value is accepted; see [`spread`] for how it becomes fields.
    pub fn validate(self) -> Result<(UploadedFile, Map<String, Value>), IngestError> {
        let file = self.file.ok_or(IngestError::MissingFile)?;

        let raw = self
            .payload
            .filter(|raw| !raw.is_empty())
            .ok_or(IngestError::MissingPayload)?;

        let value: Value =
            serde_json::from_str(&raw).map_err(|_| IngestError::MalformedPayload)?;

        let fields = spread(value);

        if let Some(reserved) = RESERVED_FIELDS
            .iter()
            .find(|name| fields.contains_key(**name))
        {
            return Err(IngestError::ReservedField((*reserved).to_string()));
        }

        Ok((file, fields))
    }
}

/// Turn the caller's JSON into top-level fields.
///
/// Objects keep their keys. Arrays and strings are keyed by index
/// (`"0"`, `"1"`, ...), one entry per element or character. `null`,
/// booleans and numbers contribute nothing. Integers above `i64::MAX` are
/// stored as doubles since BSON has no unsigned type.
pub fn spread(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields
            .into_iter()
            .map(|(key, value)| (key, to_storable(value)))
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), to_storable(item)))
            .collect(),
        Value::String(text) => text
            .chars()
            .enumerate()
            .map(|(index, c)| (index.to_string(), Value::String(c.to_string())))
            .collect(),
        Value::Null | Value::Bool(_) | Value::Number(_) => Map::new(),
    }
}

fn to_storable(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_u64() && n.as_i64().is_none() => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.into_iter().map(to_storable).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, to_storable(value)))
                .collect(),
        ),
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
}

/// A submission as persisted: the caller's keys first, then the fields
/// the service adds.
#[derive(Debug, Clone, Serialize)]
pub struct StoredResult {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub errores: String,
    #[serde(rename = "fileInfo")]
    pub file_info: FileInfo,
    #[serde(
        rename = "createdAt",
        with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "_insertedAt")]
    pub inserted_at: String,
}

impl StoredResult {
    pub fn new(fields: Map<String, Value>, file: UploadedFile) -> Self {
        Self::with_timestamp(fields, file, Utc::now())
    }

    pub fn with_timestamp(
        fields: Map<String, Value>,
        file: UploadedFile,
        now: DateTime<Utc>,
    ) -> Self {
        let file_info = FileInfo {
            file_name: file.file_name,
            file_size: file.bytes.len() as i64,
            file_type: file.content_type,
        };

        Self {
            fields,
            errores: String::from_utf8_lossy(&file.bytes).into_owned(),
            file_info,
            created_at: now,
            inserted_at: iso_timestamp(&now),
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, the resolution
/// MongoDB keeps for dates.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First `PREVIEW_CHARS` characters of `text` followed by `...`, or `text`
/// unchanged when it is not longer than that.
pub fn preview(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}
