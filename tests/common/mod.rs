#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use ndarray::Array1;
use tokenizers::Tokenizer;
use triage::{
    Category, ClassifierBundle, ClassifierError, EncodedInput, LabelRegistry, SequenceModel,
    TextEncoder, TokenizerEncoder, DEFAULT_MAX_LENGTH,
};

/// Keywords that push the keyword model towards each category, in `Category::ALL` order.
pub const KEYWORDS: [&[&str]; 10] = [
    &["admission", "requirements", "apply"],
    &["fees", "payment", "bursary"],
    &["course", "registration", "enroll"],
    &["result", "grade", "results"],
    &["hostel", "accommodation", "room"],
    &["meeting", "appointment", "schedule"],
    &["transcript", "certificate"],
    &["complaint", "unfair", "rude"],
    &["information", "question"],
    &["staff", "contract", "salary"],
];

pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

pub fn labels() -> LabelRegistry {
    LabelRegistry::new(Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>()).unwrap()
}

/// Word-level vocabulary: `[PAD]`, `[UNK]`, then every keyword.
pub fn vocab() -> HashMap<String, u32> {
    let mut vocab = HashMap::new();
    vocab.insert("[PAD]".to_string(), 0);
    vocab.insert("[UNK]".to_string(), 1);
    for word in KEYWORDS.iter().flat_map(|words| words.iter()) {
        let next = vocab.len() as u32;
        vocab.entry(word.to_string()).or_insert(next);
    }
    vocab
}

pub fn tokenizer() -> Tokenizer {
    let json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab(), "unk_token": "[UNK]" }
    });
    Tokenizer::from_str(&json.to_string()).unwrap()
}

pub fn encoder() -> TokenizerEncoder {
    TokenizerEncoder::new(tokenizer(), DEFAULT_MAX_LENGTH).unwrap()
}

/// Scores each class by how many of its keywords appear among the real tokens.
pub struct KeywordModel {
    class_of: HashMap<i64, usize>,
}

impl KeywordModel {
    pub fn new() -> Self {
        let vocab = vocab();
        let mut class_of = HashMap::new();
        for (class, words) in KEYWORDS.iter().enumerate() {
            for word in words.iter() {
                class_of.insert(i64::from(vocab[*word]), class);
            }
        }
        Self { class_of }
    }
}

impl SequenceModel for KeywordModel {
    fn logits(&self, input: &EncodedInput) -> Result<Array1<f32>, ClassifierError> {
        let mut logits = Array1::zeros(KEYWORDS.len());
        for (id, mask) in input.input_ids.iter().zip(&input.attention_mask) {
            if *mask == 0 {
                continue;
            }
            if let Some(&class) = self.class_of.get(id) {
                logits[class] += 2.0;
            }
        }
        Ok(logits)
    }
}

/// Encoder that remembers every text it was asked to encode.
pub struct RecordingEncoder {
    inner: TokenizerEncoder,
    pub seen: Mutex<Vec<String>>,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self { inner: encoder(), seen: Mutex::new(Vec::new()) }
    }
}

impl TextEncoder for RecordingEncoder {
    fn encode(&self, text: &str) -> Result<EncodedInput, ClassifierError> {
        self.seen.lock().unwrap().push(text.to_string());
        self.inner.encode(text)
    }

    fn max_length(&self) -> usize {
        self.inner.max_length()
    }
}

pub fn keyword_bundle() -> ClassifierBundle {
    ClassifierBundle::builder()
        .with_labels(labels())
        .with_encoder(Arc::new(encoder()))
        .with_model(Arc::new(KeywordModel::new()))
        .build()
        .unwrap()
}
