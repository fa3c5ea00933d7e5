mod error;
mod ort_service;
mod routes;

pub mod app;
pub mod auth;
pub mod config;
pub mod image_preprocessor;
pub mod inference;
pub mod model_service;
pub mod registry;
pub mod scaler;
pub mod server;
pub mod telemetry;

pub use app::start_app;
