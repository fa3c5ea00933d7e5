use crate::{
    image_preprocessor::{is_image_content_type, preprocess_image},
    registry::{ModelRegistry, RegistryError},
    scaler::TabularFeatureVector,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Scores strictly above this value are classified as pneumonia.
pub const PNEUMONIA_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{0}")]
    ModelUnavailable(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Processing(String),
}

/// A buffered multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PneumoniaDiagnosis {
    Normal,
    Pneumonia,
}

impl PneumoniaDiagnosis {
    pub fn as_str(&self) -> &'static str {
        match self {
            PneumoniaDiagnosis::Normal => "NORMAL",
            PneumoniaDiagnosis::Pneumonia => "PNEUMONIA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PneumoniaPrediction {
    pub filename: Option<String>,
    pub diagnosis: PneumoniaDiagnosis,
    pub confidence: f32,
    pub raw_prediction: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiabetesDiagnosis {
    Negative,
    Positive,
}

impl DiabetesDiagnosis {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiabetesDiagnosis::Negative => "NEGATIVE",
            DiabetesDiagnosis::Positive => "POSITIVE",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DiabetesDiagnosis::Positive => "Diabetes detected",
            DiabetesDiagnosis::Negative => "No diabetes detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiabetesPrediction {
    pub diagnosis: DiabetesDiagnosis,
    pub probability: f32,
    pub message: String,
}

struct WholeNumberVisitor;

impl de::Visitor<'_> for WholeNumberVisitor {
    type Value = i64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        i64::try_from(value).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
        // 120.0 is accepted, 120.5 is not.
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(E::invalid_value(de::Unexpected::Float(value), &self))
        }
    }
}

fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    deserializer.deserialize_any(WholeNumberVisitor)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiabetesInput {
    #[serde(deserialize_with = "whole_number")]
    pub pregnancies: i64,
    #[serde(deserialize_with = "whole_number")]
    pub glucose: i64,
    #[serde(deserialize_with = "whole_number")]
    pub blood_pressure: i64,
    #[serde(deserialize_with = "whole_number")]
    pub skin_thickness: i64,
    #[serde(deserialize_with = "whole_number")]
    pub insulin: i64,
    pub bmi: f64,
    pub diabetes_pedigree: f64,
    #[serde(deserialize_with = "whole_number")]
    pub age: i64,
}

impl From<&DiabetesInput> for TabularFeatureVector {
    fn from(input: &DiabetesInput) -> Self {
        TabularFeatureVector::new([
            input.pregnancies as f64,
            input.glucose as f64,
            input.blood_pressure as f64,
            input.skin_thickness as f64,
            input.insulin as f64,
            input.bmi,
            input.diabetes_pedigree,
            input.age as f64,
        ])
    }
}

/// Maps a sigmoid score to a diagnosis and the confidence in that diagnosis.
pub fn interpret_score(score: f32) -> (PneumoniaDiagnosis, f32) {
    if score > PNEUMONIA_THRESHOLD {
        (PneumoniaDiagnosis::Pneumonia, score)
    } else {
        (PneumoniaDiagnosis::Normal, 1.0 - score)
    }
}

pub fn predict_pneumonia(
    registry: &ModelRegistry,
    upload: &ImageUpload,
) -> Result<PneumoniaPrediction, InferenceError> {
    let model = registry
        .image_classifier()
        .map_err(|_| InferenceError::ModelUnavailable("Model not loaded".to_string()))?;

    if !is_image_content_type(&upload.content_type) {
        return Err(InferenceError::InvalidInput("File must be an image".to_string()));
    }

    let processing =
        |cause: String| InferenceError::Processing(format!("Error processing image: {}", cause));

    let tensor = preprocess_image(&upload.bytes, &upload.content_type)
        .map_err(|e| processing(e.to_string()))?;
    let score = model.score(&tensor).map_err(|e| processing(e.to_string()))?;
    if !(0.0..=1.0).contains(&score) {
        return Err(processing(format!("score {} is outside [0, 1]", score)));
    }

    let (diagnosis, confidence) = interpret_score(score);
    tracing::debug!(?diagnosis, score, "pneumonia prediction");

    Ok(PneumoniaPrediction {
        filename: upload.filename.clone(),
        diagnosis,
        confidence,
        raw_prediction: score,
    })
}

pub fn predict_diabetes(
    registry: &ModelRegistry,
    input: &DiabetesInput,
) -> Result<DiabetesPrediction, InferenceError> {
    let unavailable = |_: RegistryError| {
        InferenceError::ModelUnavailable("Diabetes model or scaler not loaded".to_string())
    };
    let model = registry.tabular_classifier().map_err(unavailable)?;
    let scaler = registry.tabular_scaler().map_err(unavailable)?;

    let features = TabularFeatureVector::from(input);
    let scaled = scaler.transform(&features);

    let prediction = model.classify(scaled.values()).map_err(|e| {
        InferenceError::Processing(format!("Error processing diabetes prediction: {}", e))
    })?;
    if !(0.0..=1.0).contains(&prediction.probability) {
        return Err(InferenceError::Processing(format!(
            "Error processing diabetes prediction: probability {} is outside [0, 1]",
            prediction.probability
        )));
    }

    let diagnosis = if prediction.label == 1 {
        DiabetesDiagnosis::Positive
    } else {
        DiabetesDiagnosis::Negative
    };
    tracing::debug!(?diagnosis, probability = prediction.probability, "diabetes prediction");

    Ok(DiabetesPrediction {
        diagnosis,
        probability: prediction.probability,
        message: diagnosis.message().to_string(),
    })
}
