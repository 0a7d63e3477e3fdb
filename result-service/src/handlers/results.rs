use crate::dtos::{CreateResultResponse, ListResultsResponse};
use crate::models::{StoredResult, Submission, UploadedFile, FILE_FIELD, PAYLOAD_FIELD};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use metrics::counter;
use service_core::error::AppError;

/// Maximum number of results returned by the listing.
pub const RECENT_LIMIT: i64 = 10;

const SAVE_FAILED: &str = "Failed to save data to database";
const RETRIEVE_FAILED: &str = "Failed to retrieve data from database";

pub async fn create_result(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Invalid multipart form data: {}", e))
    })?;

    let (file, fields) = read_submission(&mut multipart).await?.validate()?;
    let result = StoredResult::new(fields, file);

    tracing::info!(
        file_name = %result.file_info.file_name,
        size = result.file_info.file_size,
        fields = result.fields.len(),
        "Saving result"
    );

    let inserted_id = state.store.insert(&result).await.map_err(|e| {
        tracing::error!(error = %e, "Error saving data to MongoDB");
        counter!("results_failed_total", "operation" => "insert").increment(1);
        e.with_database_context(SAVE_FAILED)
    })?;

    counter!("results_saved_total").increment(1);
    tracing::info!(inserted_id = %inserted_id, "Result saved");

    Ok((
        StatusCode::CREATED,
        Json(CreateResultResponse::new(inserted_id, &result)),
    ))
}

pub async fn list_recent_results(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let documents = state.store.recent(RECENT_LIMIT).await.map_err(|e| {
        tracing::error!(error = %e, "Error retrieving data from MongoDB");
        counter!("results_failed_total", "operation" => "list").increment(1);
        e.with_database_context(RETRIEVE_FAILED)
    })?;

    Ok(Json(ListResultsResponse::from(documents)))
}

/// Collect the first `errores` file part and the first `data` part. Other
/// parts are skipped.
async fn read_submission(multipart: &mut Multipart) -> Result<Submission, AppError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            // A plain text part under the file name does not count as a file.
            Some(FILE_FIELD) if submission.file.is_none() && field.file_name().is_some() => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
                })?;

                submission.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some(PAYLOAD_FIELD) if submission.payload.is_none() => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read data field: {}", e))
                })?;
                submission.payload = Some(text);
            }
            _ => {}
        }
    }

    Ok(submission)
}
