mod error;
mod encoder;
mod labels;
mod model;
mod normalize;
pub mod builder;
mod classifier;
mod utils;

pub use error::ClassifierError;
pub use encoder::{EncodedInput, TextEncoder, TokenizerEncoder, DEFAULT_MAX_LENGTH};
pub use labels::LabelRegistry;
pub use model::{OnnxModel, SequenceModel, REQUIRED_INPUTS};
pub use normalize::{normalize, normalize_opt};
pub use builder::ClassifierBuilder;
pub use classifier::{ClassificationResult, ClassifierBundle, EmailClassifier};

use crate::runtime::Device;

/// Information about the current state and configuration of a loaded bundle
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassifierInfo {
    /// Number of classes the model emits
    pub num_classes: usize,
    /// Labels of the classes, in model output order
    pub class_labels: Vec<String>,
    /// Encoded sequence length
    pub max_length: usize,
    /// Device the forward pass runs on
    pub device: Device,
}

impl ClassifierBundle {
    /// Returns information about the bundle's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            num_classes: self.labels.class_count(),
            class_labels: self.labels.labels().to_vec(),
            max_length: self.encoder.max_length(),
            device: self.device,
        }
    }
}
