use crate::{
    config::{ImageModelConfig, TabularModelConfig},
    image_preprocessor::ImageTensor,
    model_service::{ClassPrediction, ClassPredictor, ModelError, Predictor},
    scaler::FEATURE_COUNT,
};
use ndarray::Array;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    tensor::PrimitiveTensorElementType,
    value::{DynValue, TensorRef},
};
use parking_lot::Mutex;
use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Round-robin pool of sessions over the same ONNX graph. A run needs
/// exclusive access to its session, so each one sits behind its own lock.
struct SessionPool {
    sessions: Vec<Mutex<Session>>,
    counter: AtomicUsize,
}

impl SessionPool {
    fn new(path: &Path, num_instances: usize) -> Result<Self, ort::Error> {
        let num_instances = num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(path)?;
                Ok(Mutex::new(session))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions for {:?}", num_instances, path);

        Ok(Self {
            sessions,
            counter: AtomicUsize::new(0),
        })
    }

    fn with_session<R>(
        &self,
        f: impl FnOnce(&mut Session) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        tracing::debug!("Handling request with session {}", index);
        let mut session = self.sessions[index].lock();
        f(&mut session)
    }
}

fn tensor_data<'a, T: PrimitiveTensorElementType>(
    value: Option<&'a DynValue>,
    name: &str,
) -> Result<&'a [T], ModelError> {
    let value = value.ok_or_else(|| ModelError::Output {
        name: name.to_string(),
        reason: "no such output".to_string(),
    })?;
    let (_shape, data) = value
        .try_extract_tensor::<T>()
        .map_err(|e| ModelError::Output {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    Ok(data)
}

fn first_score(scores: &[f32]) -> Result<f32, ModelError> {
    scores
        .first()
        .copied()
        .ok_or_else(|| ModelError::InvalidOutput("empty score tensor".to_string()))
}

/// The positive class probability is the second column of the probability output.
fn class_prediction(labels: &[i64], probabilities: &[f32]) -> Result<ClassPrediction, ModelError> {
    let label = labels
        .first()
        .copied()
        .ok_or_else(|| ModelError::InvalidOutput("empty label tensor".to_string()))?;
    let probability = probabilities.get(1).copied().ok_or_else(|| {
        ModelError::InvalidOutput(format!(
            "expected at least 2 class probabilities, got {}",
            probabilities.len()
        ))
    })?;

    Ok(ClassPrediction { label, probability })
}

/// Binary image classifier exported to ONNX with a single sigmoid output.
pub struct OrtImageClassifier {
    pool: SessionPool,
    output_name: String,
}

impl OrtImageClassifier {
    pub fn new(path: &Path, model_config: &ImageModelConfig) -> Result<Self, ort::Error> {
        Ok(Self {
            pool: SessionPool::new(path, model_config.num_instances)?,
            output_name: model_config.output_name.clone(),
        })
    }
}

impl Predictor for OrtImageClassifier {
    fn score(&self, input: &ImageTensor) -> Result<f32, ModelError> {
        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| ModelError::Tensor(e.to_string()))?;

        self.pool.with_session(|session| {
            let outputs = session
                .run(ort::inputs![tensor_ref])
                .map_err(|e| ModelError::Inference(e.to_string()))?;

            let scores =
                tensor_data::<f32>(outputs.get(self.output_name.as_str()), &self.output_name)?;
            first_score(scores)
        })
    }
}

/// Tabular classifier exported with skl2onnx: an int64 label output and a
/// float `(1, n_classes)` probability output.
pub struct OrtTabularClassifier {
    pool: SessionPool,
    label_output: String,
    probabilities_output: String,
}

impl OrtTabularClassifier {
    pub fn new(path: &Path, model_config: &TabularModelConfig) -> Result<Self, ort::Error> {
        Ok(Self {
            pool: SessionPool::new(path, model_config.num_instances)?,
            label_output: model_config.label_output.clone(),
            probabilities_output: model_config.probabilities_output.clone(),
        })
    }
}

impl ClassPredictor for OrtTabularClassifier {
    fn classify(&self, features: &[f64; FEATURE_COUNT]) -> Result<ClassPrediction, ModelError> {
        let input = Array::from_shape_vec(
            (1, FEATURE_COUNT),
            features.iter().map(|v| *v as f32).collect(),
        )
        .map_err(|e| ModelError::Tensor(e.to_string()))?;
        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| ModelError::Tensor(e.to_string()))?;

        self.pool.with_session(|session| {
            let outputs = session
                .run(ort::inputs![tensor_ref])
                .map_err(|e| ModelError::Inference(e.to_string()))?;

            let labels =
                tensor_data::<i64>(outputs.get(self.label_output.as_str()), &self.label_output)?;
            let probabilities = tensor_data::<f32>(
                outputs.get(self.probabilities_output.as_str()),
                &self.probabilities_output,
            )?;
            class_prediction(labels, probabilities)
        })
    }
}
