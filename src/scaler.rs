use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const FEATURE_COUNT: usize = 8;

/// Column order the scaler and the tabular classifier were fitted on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "pregnancies",
    "glucose",
    "blood_pressure",
    "skin_thickness",
    "insulin",
    "bmi",
    "diabetes_pedigree",
    "age",
];

#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("failed to read scaler artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scaler artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scaler `{field}` has {actual} values, expected {expected}")]
    Length {
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("scaler `{field}` has a non-finite value for `{feature}`")]
    NonFinite {
        field: &'static str,
        feature: &'static str,
    },
}

/// Feature values in `FEATURE_NAMES` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabularFeatureVector([f64; FEATURE_COUNT]);

impl TabularFeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Deserialize)]
struct ScalerArtifact {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Fitted standardization transform, `(x - mean) / scale` per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalerError> {
        let mean = to_fixed("mean", mean)?;
        let mut scale = to_fixed("scale", scale)?;
        // Constant features are left unscaled.
        for value in scale.iter_mut() {
            if *value == 0.0 {
                *value = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    /// Reads a JSON artifact of the form `{"mean": [..], "scale": [..]}`.
    pub fn from_file(path: &Path) -> Result<Self, ScalerError> {
        let raw = std::fs::read_to_string(path)?;
        let artifact: ScalerArtifact = serde_json::from_str(&raw)?;
        Self::new(artifact.mean, artifact.scale)
    }

    pub fn transform(&self, features: &TabularFeatureVector) -> TabularFeatureVector {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in features.values().iter().enumerate() {
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        TabularFeatureVector(scaled)
    }
}

fn to_fixed(field: &'static str, values: Vec<f64>) -> Result<[f64; FEATURE_COUNT], ScalerError> {
    let actual = values.len();
    let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| ScalerError::Length {
        field,
        actual,
        expected: FEATURE_COUNT,
    })?;
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ScalerError::NonFinite {
            field,
            feature: FEATURE_NAMES[index],
        });
    }
    Ok(values)
}
