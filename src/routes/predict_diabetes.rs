use super::DIABETES_ROUTE;
use crate::{
    error::ApiError,
    inference::{self, DiabetesInput, DiabetesPrediction},
    server::SharedState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;
use tracing::instrument;

#[instrument(skip(state, payload))]
pub async fn predict_diabetes(
    State(state): State<SharedState>,
    payload: Result<Json<DiabetesInput>, JsonRejection>,
) -> Result<Json<DiabetesPrediction>, ApiError> {
    state.metrics.record_request(DIABETES_ROUTE);
    let Json(input) = payload?;

    let registry = state.registry.clone();
    let start = Instant::now();
    let prediction =
        tokio::task::spawn_blocking(move || inference::predict_diabetes(&registry, &input))
            .await
            .map_err(|e| ApiError::Internal(format!("prediction task failed: {}", e)))??;

    state
        .metrics
        .record_prediction_duration(start.elapsed().as_millis() as u64, DIABETES_ROUTE);
    state
        .metrics
        .record_prediction(DIABETES_ROUTE, prediction.diagnosis.as_str());

    Ok(Json(prediction))
}
