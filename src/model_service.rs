use crate::image_preprocessor::ImageTensor;
use crate::scaler::FEATURE_COUNT;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to build tensor: {0}")]
    Tensor(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to extract output `{name}`: {reason}")]
    Output { name: String, reason: String },
    #[error("unexpected model output: {0}")]
    InvalidOutput(String),
}

/// Output of a binary tabular classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPrediction {
    pub label: i64,
    /// Probability of the positive class (index 1 of the probability output).
    pub probability: f32,
}

/// A model producing a single probability score from an image tensor.
pub trait Predictor: Send + Sync + 'static {
    fn score(&self, input: &ImageTensor) -> Result<f32, ModelError>;
}

/// A model producing a class label and positive-class probability from
/// an already scaled feature vector.
pub trait ClassPredictor: Send + Sync + 'static {
    fn classify(&self, features: &[f64; FEATURE_COUNT]) -> Result<ClassPrediction, ModelError>;
}
