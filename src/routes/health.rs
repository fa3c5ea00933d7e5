use crate::server::SharedState;
use axum::{extract::State, response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct ModelsLoaded {
    pneumonia: bool,
    diabetes: bool,
}

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    models_loaded: ModelsLoaded,
}

pub async fn healthcheck(State(state): State<SharedState>) -> impl IntoResponse {
    Json(Status {
        status: "ok".into(),
        models_loaded: ModelsLoaded {
            pneumonia: state.registry.pneumonia_ready(),
            diabetes: state.registry.diabetes_ready(),
        },
    })
}
