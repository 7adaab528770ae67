use std::collections::HashMap;
use std::path::Path;
use ndarray::{Array1, Array2};
use ort::session::Session;
use ort::value::Tensor;
use log::{debug, info};

use super::encoder::EncodedInput;
use super::error::ClassifierError;
use crate::runtime::{create_session_builder, Device, RuntimeConfig};

/// Input names a sequence-classification export must declare.
pub const REQUIRED_INPUTS: [&str; 3] = ["input_ids", "attention_mask", "token_type_ids"];

/// One forward pass of a sequence classifier: fixed-length input in, raw logits out.
///
/// Implementations are shared read-only across requests and must be safe to call
/// concurrently.
pub trait SequenceModel: Send + Sync {
    /// Returns one logit per class.
    ///
    /// # Errors
    /// - `InferenceError` if the runtime or device fails
    fn logits(&self, input: &EncodedInput) -> Result<Array1<f32>, ClassifierError>;

    /// Compute device the model runs on.
    fn device(&self) -> Device {
        Device::Cpu
    }
}

/// [`SequenceModel`] running an ONNX export through ONNX Runtime.
///
/// The model is expected to:
/// - Accept `input_ids`, `attention_mask` and `token_type_ids`, each `[1, sequence_length]` i64
/// - Output logits of shape `[1, num_labels]` as its first output
///
/// On the pinned `ort` release `Session::run` takes `&self`, so one session serves several
/// threads at once without a lock.
#[derive(Debug)]
pub struct OnnxModel {
    session: Session,
    device: Device,
}

impl OnnxModel {
    /// Loads and validates an ONNX classifier on the device selected by `config`.
    ///
    /// # Errors
    /// - `ModelLoadError` if the file is missing, cannot be loaded, or lacks the required inputs
    pub fn from_file(path: impl AsRef<Path>, config: &RuntimeConfig) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::ModelLoadError(format!("Model file not found: {:?}", path)));
        }

        let (builder, device) = create_session_builder(config)?;
        let session = builder.commit_from_file(path)?;
        Self::validate_model(&session)?;
        info!("Model structure validated successfully ({:?}, device {})", path, device);

        Ok(Self { session, device })
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        let declared: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        for required in REQUIRED_INPUTS {
            if !declared.contains(&required) {
                return Err(ClassifierError::ModelLoadError(format!(
                    "Model is missing required input '{}' (declares {:?})",
                    required, declared
                )));
            }
        }

        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelLoadError(
                "Model must have at least 1 output for logits".to_string()
            ));
        }

        Ok(())
    }

    fn tensor(values: &[i64], name: &str) -> Result<Tensor<i64>, ClassifierError> {
        let array = Array2::from_shape_vec((1, values.len()), values.to_vec())
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to shape {}: {}", name, e)))?;
        let array_dyn = array.into_dyn();
        let standard = array_dyn.as_standard_layout();
        Tensor::from_array(&standard)
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to create {} tensor: {}", name, e)))
    }
}

impl SequenceModel for OnnxModel {
    fn logits(&self, input: &EncodedInput) -> Result<Array1<f32>, ClassifierError> {
        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Self::tensor(&input.input_ids, "input_ids")?);
        input_tensors.insert("attention_mask", Self::tensor(&input.attention_mask, "attention_mask")?);
        input_tensors.insert("token_type_ids", Self::tensor(&input.token_type_ids, "token_type_ids")?);

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to extract logits: {}", e)))?;

        let shape = output_tensor.shape().to_vec();
        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::InferenceError(
                format!("Expected logits of shape [1, num_labels], got {:?}", shape)
            ));
        }
        debug!("Forward pass produced {} logits", shape[1]);

        Ok(Array1::from_iter(output_tensor.iter().cloned()))
    }

    fn device(&self) -> Device {
        self.device
    }
}
