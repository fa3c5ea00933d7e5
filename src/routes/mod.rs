mod auth;
mod health;
mod index;
mod metrics;
mod predict_diabetes;
mod predict_pneumonia;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub const PNEUMONIA_ROUTE: &str = "/predict/pneumonia";
pub const DIABETES_ROUTE: &str = "/predict/diabetes";

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(index::index))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route(PNEUMONIA_ROUTE, post(predict_pneumonia::predict_pneumonia))
        .route(DIABETES_ROUTE, post(predict_diabetes::predict_diabetes))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}
