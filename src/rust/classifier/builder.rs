use std::path::Path;
use std::sync::Arc;
use log::{info, warn, error};

use super::classifier::ClassifierBundle;
use super::encoder::{TextEncoder, TokenizerEncoder, DEFAULT_MAX_LENGTH};
use super::error::ClassifierError;
use super::labels::LabelRegistry;
use super::model::{OnnxModel, SequenceModel};
use crate::config::TriageConfig;
use crate::model_manager::ArtifactPaths;
use crate::routing::unrouted_labels;
use crate::runtime::RuntimeConfig;

/// Text used for the load-time probe pass that checks the model's output width.
const PROBE_TEXT: &str = "registry probe";

/// A builder for constructing a [`ClassifierBundle`] with a fluent interface.
///
/// Artifacts can come from a model directory, explicit file paths, or already constructed
/// components (for custom encoders and models).
#[derive(Default)]
pub struct ClassifierBuilder {
    labels: Option<LabelRegistry>,
    encoder: Option<Arc<dyn TextEncoder>>,
    model: Option<Arc<dyn SequenceModel>>,
    runtime_config: RuntimeConfig,
    max_length: Option<usize>,
    strict_routing: bool,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder with the runtime settings of `config` and its artifacts loaded.
    pub fn from_config(config: &TriageConfig) -> Result<Self, ClassifierError> {
        Self::new()
            .with_runtime_config(config.runtime.clone())
            .with_max_length(config.max_length)
            .with_strict_routing(config.strict_routing)
            .with_artifacts(&config.model_dir)
    }

    /// Sets the runtime configuration for ONNX model execution. Must precede artifact loading.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the encoded sequence length. Defaults to 128. Must precede artifact loading.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// When enabled, a registry label with no department route fails the build instead of
    /// logging a warning.
    pub fn with_strict_routing(mut self, strict: bool) -> Self {
        self.strict_routing = strict;
        self
    }

    /// Loads `model.onnx`, `tokenizer.json` and `labels.json` from `dir`.
    pub fn with_artifacts(self, dir: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let paths = ArtifactPaths::in_dir(dir.as_ref());
        self.with_custom_model(&paths.model, &paths.tokenizer, &paths.labels)
    }

    /// Loads the classifier from explicit artifact paths.
    ///
    /// # Errors
    /// - `ModelLoadError` if components are already set, a file is missing, or any artifact fails to load
    pub fn with_custom_model(
        mut self,
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
    ) -> Result<Self, ClassifierError> {
        if self.model.is_some() || self.encoder.is_some() || self.labels.is_some() {
            return Err(ClassifierError::ModelLoadError("Model, tokenizer and labels already set".to_string()));
        }
        let (model_path, tokenizer_path, labels_path) =
            (model_path.as_ref(), tokenizer_path.as_ref(), labels_path.as_ref());

        let labels = LabelRegistry::from_file(labels_path).map_err(|e| {
            error!("Failed to load labels: {}", e);
            e
        })?;
        info!("Loaded {} labels from {:?}", labels.class_count(), labels_path);

        let max_length = self.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let encoder = TokenizerEncoder::from_file(tokenizer_path, max_length).map_err(|e| {
            error!("Failed to load tokenizer: {}", e);
            e
        })?;
        info!("Tokenizer loaded successfully");

        let model = OnnxModel::from_file(model_path, &self.runtime_config).map_err(|e| {
            error!("Failed to load model: {}", e);
            e
        })?;

        self.labels = Some(labels);
        self.encoder = Some(Arc::new(encoder));
        self.model = Some(Arc::new(model));
        Ok(self)
    }

    pub fn with_labels(mut self, labels: LabelRegistry) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn TextEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn SequenceModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Builds and returns the final bundle.
    ///
    /// Runs one probe forward pass to confirm the model emits exactly one logit per label,
    /// then checks every label against the routing table.
    ///
    /// # Errors
    /// - `ModelLoadError` if a component is missing, the probe fails, the output width does not
    ///   match the label count, or strict routing finds an unrouted label
    pub fn build(self) -> Result<ClassifierBundle, ClassifierError> {
        let labels = self.labels
            .ok_or_else(|| ClassifierError::ModelLoadError("No label registry loaded".into()))?;
        let encoder = self.encoder
            .ok_or_else(|| ClassifierError::ModelLoadError("No tokenizer loaded".into()))?;
        let model = self.model
            .ok_or_else(|| ClassifierError::ModelLoadError("No model loaded".into()))?;

        if let Some(expected) = self.max_length {
            if encoder.max_length() != expected {
                return Err(ClassifierError::ModelLoadError(format!(
                    "Encoder length {} does not match configured length {}",
                    encoder.max_length(),
                    expected
                )));
            }
        }

        let probe = encoder.encode(PROBE_TEXT)
            .and_then(|input| model.logits(&input))
            .map_err(|e| ClassifierError::ModelLoadError(format!("Probe forward pass failed: {}", e)))?;
        if probe.len() != labels.class_count() {
            return Err(ClassifierError::ModelLoadError(format!(
                "Model outputs {} classes but the label registry holds {}",
                probe.len(),
                labels.class_count()
            )));
        }
        info!("Model output width matches {} labels", labels.class_count());

        let unrouted = unrouted_labels(labels.labels());
        if !unrouted.is_empty() {
            if self.strict_routing {
                return Err(ClassifierError::ModelLoadError(format!(
                    "Labels without a department route: {:?}",
                    unrouted
                )));
            }
            warn!("Labels without a department route will go to the Registry: {:?}", unrouted);
        }

        let device = model.device();
        Ok(ClassifierBundle {
            labels: Arc::new(labels),
            encoder,
            model,
            device,
        })
    }
}
