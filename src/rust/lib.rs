//! Email triage for school registries.
//!
//! Classifies an email into one of ten administrative categories with a fine-tuned transformer
//! (ONNX Runtime + HuggingFace tokenizers), then recommends the department that should handle it
//! and a confidence tier for the prediction.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use triage::{ClassifierBundle, TriageConfig, route_for, tier_for};
//!
//! let bundle = ClassifierBundle::load(&TriageConfig::new("models/registry-triage"))?;
//! let result = bundle.classify(
//!     "Application for Computer Science Program",
//!     "What are the admission requirements and deadlines?",
//! )?;
//!
//! let route = route_for(&result.category);
//! println!("{} -> {} ({})", result.category, route.department, tier_for(result.confidence));
//! # Ok(())
//! # }
//! ```
//!
//! # Process-wide State
//!
//! Loading is expensive, so applications usually load once and share the bundle. The
//! [`global`] module does that behind a single-flight lock:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! triage::global::init(&triage::TriageConfig::from_env()?)?;
//! let result = triage::global::classify("Hostel Allocation Request", "Is a room available?")?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod confidence;
pub mod config;
pub mod global;
pub mod model_manager;
pub mod routing;
mod runtime;
pub mod shell;

pub use classifier::{
    normalize, normalize_opt, ClassificationResult, ClassifierBuilder, ClassifierBundle,
    ClassifierError, ClassifierInfo, EmailClassifier, EncodedInput, LabelRegistry, OnnxModel,
    SequenceModel, TextEncoder, TokenizerEncoder, DEFAULT_MAX_LENGTH,
};
pub use confidence::{tier_for, ConfidenceTier};
pub use config::TriageConfig;
pub use model_manager::{ArtifactManifest, ArtifactPaths, ModelError, ModelManager};
pub use routing::{route_for, Category, DepartmentRoute};
pub use runtime::{create_session_builder, resolve_device, Device, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
