use std::str::FromStr;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use tokenizers::Tokenizer;
use triage::shell::SAMPLE_EMAILS;
use triage::{
    normalize, Category, ClassifierBundle, ClassifierError, EncodedInput, LabelRegistry,
    SequenceModel, TextEncoder, TokenizerEncoder, DEFAULT_MAX_LENGTH,
};

const LONG_EMAIL: &str = "Dear Registry, I am writing about my <b>school fees</b> payment which I made \
    through https://portal.school.edu/pay last week. The bursary has not confirmed it and my \
    course registration is now blocked. Please reply to student.2024001@school.edu.ng or call \
    the hostel office. I also need a transcript for a scholarship application, and my grade for \
    Mathematics looks wrong on the results page at www.school.edu/results. Thank you.";

fn tokenizer() -> Tokenizer {
    let words = LONG_EMAIL
        .split_whitespace()
        .chain(SAMPLE_EMAILS.iter().flat_map(|s| s.body.split_whitespace()))
        .map(normalize)
        .filter(|w| !w.is_empty());
    let mut vocab = serde_json::Map::new();
    vocab.insert("[PAD]".into(), 0.into());
    vocab.insert("[UNK]".into(), 1.into());
    for word in words {
        let next = vocab.len();
        vocab.entry(word).or_insert(next.into());
    }

    let json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
    });
    Tokenizer::from_str(&json.to_string()).unwrap()
}

/// Sums token ids into one logit per class, enough to exercise the interpretation path.
struct HashModel;

impl SequenceModel for HashModel {
    fn logits(&self, input: &EncodedInput) -> Result<Array1<f32>, ClassifierError> {
        let mut logits = Array1::zeros(Category::ALL.len());
        for (id, mask) in input.input_ids.iter().zip(&input.attention_mask) {
            if *mask == 1 {
                logits[*id as usize % Category::ALL.len()] += 0.1;
            }
        }
        Ok(logits)
    }
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalization");
    group.sample_size(50);

    group.bench_function("short_text", |b| b.iter(|| normalize(black_box("Hostel Allocation Request"))));
    group.bench_function("long_text", |b| b.iter(|| normalize(black_box(LONG_EMAIL))));

    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let encoder = TokenizerEncoder::new(tokenizer(), DEFAULT_MAX_LENGTH).unwrap();
    let cleaned = normalize(LONG_EMAIL);
    let mut group = c.benchmark_group("Encoding");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("encode_long", |b| b.iter(|| encoder.encode(black_box(&cleaned)).unwrap()));
    group.bench_function("count_tokens_long", |b| {
        b.iter(|| encoder.count_tokens(black_box(&cleaned)).unwrap())
    });

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let labels = LabelRegistry::new(Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>()).unwrap();
    let bundle = ClassifierBundle::builder()
        .with_labels(labels)
        .with_encoder(Arc::new(TokenizerEncoder::new(tokenizer(), DEFAULT_MAX_LENGTH).unwrap()))
        .with_model(Arc::new(HashModel))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("Classification");
    group.sample_size(50);

    for (i, sample) in SAMPLE_EMAILS.iter().enumerate().take(2) {
        group.bench_function(format!("sample_{}", i + 1), |b| {
            b.iter(|| bundle.classify(black_box(sample.subject), black_box(sample.body)).unwrap())
        });
    }
    group.bench_function("long_email", |b| {
        b.iter(|| bundle.classify(black_box("Several issues"), black_box(LONG_EMAIL)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_normalization, bench_encoding, bench_classification);
criterion_main!(benches);
