use super::PNEUMONIA_ROUTE;
use crate::{
    error::ApiError,
    inference::{self, ImageUpload, InferenceError, PneumoniaPrediction},
    server::SharedState,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::time::Instant;
use tracing::instrument;

const FILE_FIELD: &str = "file";

async fn read_upload(multipart: &mut Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::Rejected {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        detail: format!("multipart field `{}` is required", FILE_FIELD),
    })
}

#[instrument(skip(state, multipart))]
pub async fn predict_pneumonia(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PneumoniaPrediction>, ApiError> {
    state.metrics.record_request(PNEUMONIA_ROUTE);
    // Checked before the body is buffered so an oversized upload cannot mask it.
    if !state.registry.pneumonia_ready() {
        return Err(InferenceError::ModelUnavailable("Model not loaded".to_string()).into());
    }
    let upload = read_upload(&mut multipart).await?;
    tracing::debug!(
        filename = ?upload.filename,
        content_type = %upload.content_type,
        size = upload.bytes.len(),
        "Received upload"
    );

    let registry = state.registry.clone();
    let start = Instant::now();
    let prediction =
        tokio::task::spawn_blocking(move || inference::predict_pneumonia(&registry, &upload))
            .await
            .map_err(|e| ApiError::Internal(format!("prediction task failed: {}", e)))??;

    state
        .metrics
        .record_prediction_duration(start.elapsed().as_millis() as u64, PNEUMONIA_ROUTE);
    state
        .metrics
        .record_prediction(PNEUMONIA_ROUTE, prediction.diagnosis.as_str());

    Ok(Json(prediction))
}
