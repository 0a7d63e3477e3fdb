use crate::models::{iso_timestamp, preview, FileInfo, StoredResult};
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Value};

/// A stored result as echoed back after a write, with `errores` shortened.
#[derive(Debug, Serialize)]
pub struct ResultView {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub errores: String,
    #[serde(rename = "fileInfo")]
    pub file_info: FileInfo,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "_insertedAt")]
    pub inserted_at: String,
}

impl ResultView {
    pub fn new(inserted_id: Value, result: &StoredResult) -> Self {
        // A caller-supplied `_id` is already part of `fields`.
        let id = (!result.fields.contains_key("_id")).then_some(inserted_id);

        Self {
            id,
            fields: result.fields.clone(),
            errores: preview(&result.errores).into_owned(),
            file_info: result.file_info.clone(),
            created_at: iso_timestamp(&result.created_at),
            inserted_at: result.inserted_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateResultResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "insertedId")]
    pub inserted_id: Value,
    pub data: ResultView,
}

impl CreateResultResponse {
    pub fn new(inserted_id: Bson, result: &StoredResult) -> Self {
        let inserted_id = bson_to_json(inserted_id);
        Self {
            success: true,
            message: "Data and file saved successfully".to_string(),
            data: ResultView::new(inserted_id.clone(), result),
            inserted_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResultsResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Value>,
}

impl From<Vec<Document>> for ListResultsResponse {
    fn from(documents: Vec<Document>) -> Self {
        let data: Vec<Value> = documents.into_iter().map(document_to_json).collect();
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Render a stored document as plain JSON: ObjectIds become hex strings and
/// dates ISO-8601 strings instead of extended-JSON wrappers.
pub fn document_to_json(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect(),
    )
}

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(at) => Value::String(iso_timestamp(&at.to_chrono())),
        Bson::Document(document) => document_to_json(document),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        // NaN and infinities have no JSON form.
        Bson::Double(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}
