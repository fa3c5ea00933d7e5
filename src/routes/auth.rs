use crate::{
    auth::{LoginRequest, RegisterRequest, TokenResponse},
    error::ApiError,
    server::SharedState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use tracing::instrument;

#[derive(Serialize)]
pub struct Registered {
    message: &'static str,
}

// Argon2 runs on the blocking pool.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Registered>, ApiError> {
    let Json(request) = payload?;
    let credentials = state.credentials.clone();

    tokio::task::spawn_blocking(move || credentials.register(request))
        .await
        .map_err(|e| ApiError::Internal(format!("registration task failed: {}", e)))??;

    Ok(Json(Registered {
        message: "Usuário registrado com sucesso",
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let credentials = state.credentials.clone();

    let token = tokio::task::spawn_blocking(move || credentials.login(request))
        .await
        .map_err(|e| ApiError::Internal(format!("login task failed: {}", e)))??;

    Ok(Json(token))
}
