#![allow(dead_code)]

use axum::{body::Body, http::Response, Router};
use diagnostic_api::{
    auth::{CredentialService, InMemoryUserStore},
    config::{AuthConfig, ServerConfig},
    image_preprocessor::ImageTensor,
    model_service::{ClassPrediction, ClassPredictor, ModelError, Predictor},
    registry::ModelRegistry,
    scaler::FEATURE_COUNT,
    server::{build_router, SharedState},
    telemetry::Metrics,
};
use http_body_util::BodyExt;
use image::{DynamicImage, GrayImage, Luma};
use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

pub const BOUNDARY: &str = "diagnostic-test-boundary";

#[derive(Clone)]
pub struct MockPredictor {
    score: f32,
    calls: Arc<AtomicUsize>,
}

impl MockPredictor {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Predictor for MockPredictor {
    fn score(&self, _input: &ImageTensor) -> Result<f32, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }
}

#[derive(Clone)]
pub struct MockClassPredictor {
    prediction: ClassPrediction,
    calls: Arc<AtomicUsize>,
}

impl MockClassPredictor {
    pub fn new(label: i64, probability: f32) -> Self {
        Self {
            prediction: ClassPrediction { label, probability },
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassPredictor for MockClassPredictor {
    fn classify(&self, _features: &[f64; FEATURE_COUNT]) -> Result<ClassPrediction, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prediction)
    }
}

pub fn create_app(registry: ModelRegistry) -> Router {
    let auth_config = AuthConfig {
        secret_key: "integration-test-secret".to_string(),
        token_expiration_minutes: 60,
    };
    let server_config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_allowed_origins: Vec::new(),
        max_upload_bytes: 10 * 1024 * 1024,
    };
    let state = SharedState {
        registry: Arc::new(registry),
        credentials: Arc::new(CredentialService::new(
            Arc::new(InMemoryUserStore::new()),
            &auth_config,
        )),
        metrics: Arc::new(Metrics::new().unwrap()),
    };

    build_router(state, &server_config)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| Luma([((x ^ y) % 256) as u8]));
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
