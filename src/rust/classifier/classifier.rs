use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use ndarray::Array1;
use log::{debug, info};
use serde::Serialize;

use super::encoder::TextEncoder;
use super::error::ClassifierError;
use super::labels::LabelRegistry;
use super::model::SequenceModel;
use super::normalize::normalize;
use super::utils::{argmax, softmax};
use crate::config::TriageConfig;
use crate::confidence::ConfidenceTier;
use crate::routing::{route_for, DepartmentRoute};
use crate::runtime::Device;

/// Outcome of classifying one email.
///
/// `probabilities` is in label-registry order and sums to 1 within float tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub category: String,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
    pub class_index: usize,
}

impl ClassificationResult {
    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }

    pub fn route(&self) -> DepartmentRoute {
        route_for(&self.category)
    }

    /// Pairs each probability with its label, highest first.
    pub fn ranked<'a>(&self, labels: &'a [String]) -> Vec<(&'a str, f32)> {
        let mut ranked: Vec<(&str, f32)> = labels
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// The inference boundary the presentation layer talks to.
pub trait EmailClassifier: Send + Sync {
    fn classify(&self, subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError>;

    /// Category names in model output order.
    ///
    /// # Errors
    /// - Whatever prevents the classifier from being available, typically `ModelLoadError`
    fn class_labels(&self) -> Result<Vec<String>, ClassifierError>;
}

/// The loaded inference artifacts: label registry, text encoder, classification model and
/// the compute device they run on.
///
/// Built once by [`ClassifierBuilder`](super::ClassifierBuilder) and never mutated afterwards.
/// The builder guarantees the model emits exactly one logit per registered label.
///
/// # Thread Safety
///
/// Every field is behind an `Arc` of a `Send + Sync` value, so a bundle can be shared across
/// threads and `classify` called concurrently:
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use std::thread;
/// use triage::{ClassifierBundle, TriageConfig};
///
/// let bundle = Arc::new(ClassifierBundle::load(&TriageConfig::from_env()?)?);
/// let worker = Arc::clone(&bundle);
/// thread::spawn(move || {
///     worker.classify("Hostel allocation", "Is there space next semester?").unwrap();
/// }).join().unwrap();
/// # Ok(())
/// # }
/// ```
pub struct ClassifierBundle {
    pub(crate) labels: Arc<LabelRegistry>,
    pub(crate) encoder: Arc<dyn TextEncoder>,
    pub(crate) model: Arc<dyn SequenceModel>,
    pub(crate) device: Device,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ClassifierBundle>();
    }
};

impl fmt::Debug for ClassifierBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierBundle")
            .field("labels", &self.labels.labels())
            .field("max_length", &self.encoder.max_length())
            .field("device", &self.device)
            .finish()
    }
}

impl ClassifierBundle {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Loads the bundle described by `config`. This is the expensive startup step.
    pub fn load(config: &TriageConfig) -> Result<Self, ClassifierError> {
        let start = Instant::now();
        let bundle = super::builder::ClassifierBuilder::from_config(config)?.build()?;
        info!(
            "Classifier loaded from {:?} on {} in {:.2?}",
            config.model_dir,
            bundle.device,
            start.elapsed()
        );
        Ok(bundle)
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Classifies an email from its subject and body.
    ///
    /// Subject and body are joined with a space, normalized, encoded to the fixed sequence
    /// length and run through one forward pass. The softmax of the logits gives the
    /// probability vector; its arg-max is the predicted class.
    ///
    /// # Errors
    /// - `EmptyInputError` if subject and body are both blank; nothing is encoded
    /// - `InferenceError` if encoding or the forward pass fails, or the logits are unusable
    pub fn classify(&self, subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError> {
        if subject.trim().is_empty() && body.trim().is_empty() {
            return Err(ClassifierError::EmptyInputError);
        }

        let start = Instant::now();
        let cleaned = normalize(&format!("{} {}", subject, body));
        let input = self.encoder.encode(&cleaned)?;
        debug!("Encoded {} real tokens into {} positions", input.real_tokens(), input.len());

        let logits = self.model.logits(&input)?;
        let result = self.interpret(&logits)?;
        debug!(
            "Classified as '{}' ({:.1}%) in {:.2?}",
            result.category,
            result.confidence * 100.0,
            start.elapsed()
        );
        Ok(result)
    }

    fn interpret(&self, logits: &Array1<f32>) -> Result<ClassificationResult, ClassifierError> {
        let count = self.labels.class_count();
        if logits.len() != count {
            return Err(ClassifierError::InferenceError(format!(
                "Model returned {} logits for {} labels",
                logits.len(),
                count
            )));
        }
        if logits.iter().any(|x| !x.is_finite()) {
            return Err(ClassifierError::InferenceError("Model returned non-finite logits".into()));
        }

        let probs = softmax(logits);
        let class_index = argmax(&probs)
            .ok_or_else(|| ClassifierError::InferenceError("Empty probability vector".into()))?;
        let category = self.labels.name_for_index(class_index)?.to_string();

        Ok(ClassificationResult {
            category,
            confidence: probs[class_index],
            probabilities: probs.to_vec(),
            class_index,
        })
    }
}

impl EmailClassifier for ClassifierBundle {
    fn classify(&self, subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError> {
        ClassifierBundle::classify(self, subject, body)
    }

    fn class_labels(&self) -> Result<Vec<String>, ClassifierError> {
        Ok(self.labels.labels().to_vec())
    }
}
