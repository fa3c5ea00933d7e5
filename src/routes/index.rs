use super::{DIABETES_ROUTE, PNEUMONIA_ROUTE};
use axum::{response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct ServiceInfo {
    message: &'static str,
    name: &'static str,
    version: &'static str,
    endpoints: BTreeMap<&'static str, &'static str>,
}

pub async fn index() -> impl IntoResponse {
    let endpoints = BTreeMap::from([
        (PNEUMONIA_ROUTE, "POST an X-ray image to get pneumonia prediction"),
        (DIABETES_ROUTE, "POST health metrics to get diabetes prediction"),
        ("/health", "Check if the API is running"),
        ("/metrics", "Prometheus metrics"),
        ("/register", "POST name, email and password to create an account"),
        ("/login", "POST email and password to get an access token"),
    ]);

    Json(ServiceInfo {
        message: "Welcome to the dIAgnostic API",
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
    })
}
