use crate::{
    config::ModelsConfig,
    model_service::{ClassPredictor, Predictor},
    ort_service::{OrtImageClassifier, OrtTabularClassifier},
    scaler::StandardScaler,
};
use std::{fmt, path::Path};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ImageClassifier,
    TabularClassifier,
    TabularScaler,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::ImageClassifier,
        ArtifactKind::TabularClassifier,
        ArtifactKind::TabularScaler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::ImageClassifier => "image-classifier",
            ArtifactKind::TabularClassifier => "tabular-classifier",
            ArtifactKind::TabularScaler => "tabular-scaler",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Unloaded,
    Loaded,
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0} artifact is not loaded")]
    NotLoaded(ArtifactKind),
}

enum Slot<T: ?Sized> {
    Unloaded,
    Loaded(Box<T>),
    Failed(String),
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unloaded
    }
}

impl<T: ?Sized> Slot<T> {
    fn status(&self) -> ArtifactStatus {
        match self {
            Slot::Unloaded => ArtifactStatus::Unloaded,
            Slot::Loaded(_) => ArtifactStatus::Loaded,
            Slot::Failed(reason) => ArtifactStatus::Failed(reason.clone()),
        }
    }

    fn get(&self, kind: ArtifactKind) -> Result<&T, RegistryError> {
        match self {
            Slot::Loaded(artifact) => Ok(&**artifact),
            _ => Err(RegistryError::NotLoaded(kind)),
        }
    }
}

fn load_artifact<T: ?Sized, E: fmt::Display>(
    kind: ArtifactKind,
    path: &Path,
    load: impl FnOnce(&Path) -> Result<Box<T>, E>,
) -> Slot<T> {
    if !path.exists() {
        let reason = format!("artifact file not found: {}", path.display());
        tracing::error!(artifact = %kind, "Error loading model: {}", reason);
        return Slot::Failed(reason);
    }

    match load(path) {
        Ok(artifact) => {
            tracing::info!(artifact = %kind, "Loaded {:?}", path);
            Slot::Loaded(artifact)
        }
        Err(e) => {
            tracing::error!(artifact = %kind, "Error loading model from {:?}: {}", path, e);
            Slot::Failed(e.to_string())
        }
    }
}

/// Process-wide set of loaded artifacts. Populated once before the server
/// accepts traffic and only read afterwards.
pub struct ModelRegistry {
    image_classifier: Slot<dyn Predictor>,
    tabular_classifier: Slot<dyn ClassPredictor>,
    tabular_scaler: Slot<StandardScaler>,
}

impl ModelRegistry {
    /// Loads every artifact independently. A failure leaves only the
    /// affected artifact in the `Failed` state.
    pub fn load(models: &ModelsConfig) -> Self {
        let image_classifier = load_artifact(
            ArtifactKind::ImageClassifier,
            &models.pneumonia_path(),
            |path| {
                OrtImageClassifier::new(path, &models.pneumonia)
                    .map(|model| Box::new(model) as Box<dyn Predictor>)
            },
        );
        let tabular_classifier = load_artifact(
            ArtifactKind::TabularClassifier,
            &models.diabetes_path(),
            |path| {
                OrtTabularClassifier::new(path, &models.diabetes)
                    .map(|model| Box::new(model) as Box<dyn ClassPredictor>)
            },
        );
        let tabular_scaler = load_artifact(
            ArtifactKind::TabularScaler,
            &models.scaler_path(),
            |path| StandardScaler::from_file(path).map(Box::new),
        );

        Self {
            image_classifier,
            tabular_classifier,
            tabular_scaler,
        }
    }

    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    pub fn status(&self, kind: ArtifactKind) -> ArtifactStatus {
        match kind {
            ArtifactKind::ImageClassifier => self.image_classifier.status(),
            ArtifactKind::TabularClassifier => self.tabular_classifier.status(),
            ArtifactKind::TabularScaler => self.tabular_scaler.status(),
        }
    }

    pub fn is_ready(&self, kind: ArtifactKind) -> bool {
        self.status(kind) == ArtifactStatus::Loaded
    }

    pub fn pneumonia_ready(&self) -> bool {
        self.is_ready(ArtifactKind::ImageClassifier)
    }

    pub fn diabetes_ready(&self) -> bool {
        self.is_ready(ArtifactKind::TabularClassifier) && self.is_ready(ArtifactKind::TabularScaler)
    }

    pub fn image_classifier(&self) -> Result<&dyn Predictor, RegistryError> {
        self.image_classifier.get(ArtifactKind::ImageClassifier)
    }

    pub fn tabular_classifier(&self) -> Result<&dyn ClassPredictor, RegistryError> {
        self.tabular_classifier.get(ArtifactKind::TabularClassifier)
    }

    pub fn tabular_scaler(&self) -> Result<&StandardScaler, RegistryError> {
        self.tabular_scaler.get(ArtifactKind::TabularScaler)
    }
}

/// Assembles a registry from already constructed artifacts.
#[derive(Default)]
pub struct ModelRegistryBuilder {
    image_classifier: Slot<dyn Predictor>,
    tabular_classifier: Slot<dyn ClassPredictor>,
    tabular_scaler: Slot<StandardScaler>,
}

impl ModelRegistryBuilder {
    pub fn image_classifier(mut self, model: impl Predictor) -> Self {
        self.image_classifier = Slot::Loaded(Box::new(model));
        self
    }

    pub fn tabular_classifier(mut self, model: impl ClassPredictor) -> Self {
        self.tabular_classifier = Slot::Loaded(Box::new(model));
        self
    }

    pub fn tabular_scaler(mut self, scaler: StandardScaler) -> Self {
        self.tabular_scaler = Slot::Loaded(Box::new(scaler));
        self
    }

    pub fn failed(mut self, kind: ArtifactKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match kind {
            ArtifactKind::ImageClassifier => self.image_classifier = Slot::Failed(reason),
            ArtifactKind::TabularClassifier => self.tabular_classifier = Slot::Failed(reason),
            ArtifactKind::TabularScaler => self.tabular_scaler = Slot::Failed(reason),
        }
        self
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            image_classifier: self.image_classifier,
            tabular_classifier: self.tabular_classifier,
            tabular_scaler: self.tabular_scaler,
        }
    }
}
