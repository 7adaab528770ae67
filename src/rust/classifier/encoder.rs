use std::path::Path;
use tokenizers::{PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::error::ClassifierError;

/// Sequence length the classifier was fine-tuned with.
pub const DEFAULT_MAX_LENGTH: usize = 128;

/// Fixed-length model input for a single text.
///
/// All three vectors have the same length. `attention_mask` is 1 for real tokens and 0 for
/// padding; `token_type_ids` is the segment id, all zeros for a single-segment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl EncodedInput {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of positions that carry real tokens.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Turns normalized text into fixed-length model input.
///
/// Implementations are loaded once and shared; `encode` must not reload anything.
pub trait TextEncoder: Send + Sync {
    /// Encodes `text` to exactly [`TextEncoder::max_length`] positions.
    ///
    /// # Errors
    /// - `InferenceError` if the text cannot be encoded
    fn encode(&self, text: &str) -> Result<EncodedInput, ClassifierError>;

    fn max_length(&self) -> usize;
}

/// [`TextEncoder`] backed by a HuggingFace `tokenizer.json`.
///
/// Truncation and fixed-length padding are configured once at load time, so every encoding
/// comes back with special tokens added and exactly `max_length` positions.
#[derive(Debug)]
pub struct TokenizerEncoder {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl TokenizerEncoder {
    /// Loads a tokenizer file and configures it for `max_length` positions.
    ///
    /// # Errors
    /// - `ModelLoadError` if the file is missing or malformed
    pub fn from_file(path: impl AsRef<Path>, max_length: usize) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::ModelLoadError(
                format!("Tokenizer file not found: {:?}", path)
            ));
        }
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| ClassifierError::ModelLoadError(format!("Failed to load tokenizer: {}", e)))?;
        Self::new(tokenizer, max_length)
    }

    /// Wraps an already constructed tokenizer, overriding its truncation and padding.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self, ClassifierError> {
        if max_length == 0 {
            return Err(ClassifierError::ConfigError("Max sequence length must be positive".into()));
        }

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| ClassifierError::ModelLoadError(format!("Failed to configure truncation: {}", e)))?;

        // Keep the pad token the tokenizer declares; only the length is ours.
        let mut padding = match tokenizer.get_padding() {
            Some(declared) => declared.clone(),
            None => {
                let (pad_id, pad_token) = ["[PAD]", "<pad>"]
                    .iter()
                    .find_map(|t| tokenizer.token_to_id(t).map(|id| (id, t.to_string())))
                    .unwrap_or((0, "[PAD]".to_string()));
                PaddingParams {
                    direction: PaddingDirection::Right,
                    pad_id,
                    pad_token,
                    ..Default::default()
                }
            }
        };
        padding.strategy = PaddingStrategy::Fixed(max_length);
        padding.pad_to_multiple_of = None;
        tokenizer.with_padding(Some(padding));

        Ok(Self { tokenizer, max_length })
    }

    /// Counts the tokens `text` produces before truncation and padding, special tokens excluded.
    ///
    /// Useful for spotting emails long enough to lose their tail to truncation.
    pub fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        let mut raw = self.tokenizer.clone();
        raw.with_padding(None);
        raw.with_truncation(None)
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))?;
        raw.encode(text, false)
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))
            .map(|encoding| encoding.get_ids().len())
    }
}

impl TextEncoder for TokenizerEncoder {
    fn encode(&self, text: &str) -> Result<EncodedInput, ClassifierError> {
        let encoding = self.tokenizer.encode(text, true)
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to tokenize input: {}", e)))?;

        let widen = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<i64>>();
        let encoded = EncodedInput {
            input_ids: widen(encoding.get_ids()),
            attention_mask: widen(encoding.get_attention_mask()),
            token_type_ids: widen(encoding.get_type_ids()),
        };

        if encoded.len() != self.max_length {
            return Err(ClassifierError::InferenceError(format!(
                "Tokenizer produced {} positions, expected {}",
                encoded.len(),
                self.max_length
            )));
        }
        Ok(encoded)
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}
