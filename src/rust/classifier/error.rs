use ort::Error as OrtError;

/// Represents the different types of errors that can occur while triaging an email.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// Model, tokenizer or label artifacts are missing or malformed. Fatal at startup.
    #[error("Model load error: {0}")]
    ModelLoadError(String),
    /// Both subject and body were blank. The caller should ask for text again.
    #[error("Empty input: enter a subject or email body before classifying")]
    EmptyInputError,
    /// Tokenizer, runtime or device failure while serving a single request.
    #[error("Inference error: {0}")]
    InferenceError(String),
    /// A class index outside the label registry was requested.
    #[error("Class index {index} out of range (registry holds {count} labels)")]
    OutOfRange { index: usize, count: usize },
    /// A label name that the registry does not contain was requested.
    #[error("Unknown label: {0}")]
    UnknownLabel(String),
    /// Invalid configuration supplied through the environment or builder.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ClassifierError {
    /// Whether the caller may retry or reprompt instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyInputError | Self::InferenceError(_))
    }
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoadError(err.to_string())
    }
}
