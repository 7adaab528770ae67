//! Process-wide classifier state.
//!
//! The bundle is loaded lazily by the first caller and reused for the rest of the process.
//! A mutex held across the load makes it single-flight: concurrent first callers wait for
//! the one load in progress and then share its result. A failed load is not cached; the
//! error goes back to the caller and the next call tries again.
//!
//! Callers only see `classify`, the class labels, and the pure lookups re-exported from the
//! crate root. The bundle itself stays private to this module.

use std::sync::{Arc, Mutex, MutexGuard};
use lazy_static::lazy_static;
use log::{error, info};

use crate::classifier::{
    ClassificationResult, ClassifierBundle, ClassifierError, ClassifierInfo, EmailClassifier,
};
use crate::config::TriageConfig;

lazy_static! {
    static ref BUNDLE: Mutex<Option<Arc<ClassifierBundle>>> = Mutex::new(None);
}

// A panic inside a previous load leaves the slot empty, so a poisoned lock is still usable.
fn slot() -> MutexGuard<'static, Option<Arc<ClassifierBundle>>> {
    BUNDLE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the cached bundle, running `load` to create it if nothing is cached yet.
fn get_or_load<F>(load: F) -> Result<Arc<ClassifierBundle>, ClassifierError>
where
    F: FnOnce() -> Result<ClassifierBundle, ClassifierError>,
{
    let mut slot = slot();
    if let Some(bundle) = slot.as_ref() {
        return Ok(Arc::clone(bundle));
    }

    info!("Loading classifier bundle...");
    let bundle = Arc::new(load().map_err(|e| {
        error!("Classifier failed to load: {}", e);
        e
    })?);
    *slot = Some(Arc::clone(&bundle));
    Ok(bundle)
}

/// Loads the process-wide bundle from `config` unless one is already loaded.
///
/// Call this at startup so a `ModelLoadError` surfaces before any email is accepted.
pub fn init(config: &TriageConfig) -> Result<(), ClassifierError> {
    get_or_load(|| ClassifierBundle::load(config)).map(|_| ())
}

/// Loads the process-wide bundle with a custom loader, for bundles assembled from custom
/// encoders or models. Does nothing if a bundle is already loaded.
pub fn init_with<F>(load: F) -> Result<(), ClassifierError>
where
    F: FnOnce() -> Result<ClassifierBundle, ClassifierError>,
{
    get_or_load(load).map(|_| ())
}

pub fn is_initialized() -> bool {
    slot().is_some()
}

fn bundle() -> Result<Arc<ClassifierBundle>, ClassifierError> {
    get_or_load(|| ClassifierBundle::load(&TriageConfig::from_env()?))
}

/// Classifies an email with the process-wide bundle, loading it from the environment
/// configuration on first use.
///
/// Blank input is rejected before the bundle is touched, so it never triggers a load. The
/// lock is released before the forward pass, so loaded bundles serve concurrent calls.
pub fn classify(subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError> {
    if subject.trim().is_empty() && body.trim().is_empty() {
        return Err(ClassifierError::EmptyInputError);
    }
    bundle()?.classify(subject, body)
}

/// Category names of the process-wide bundle, in model output order.
pub fn class_labels() -> Result<Vec<String>, ClassifierError> {
    Ok(bundle()?.labels().labels().to_vec())
}

/// Summary of the process-wide bundle (labels, sequence length, device).
pub fn info() -> Result<ClassifierInfo, ClassifierError> {
    Ok(bundle()?.info())
}

/// [`EmailClassifier`] backed by the process-wide bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessClassifier;

impl EmailClassifier for ProcessClassifier {
    fn classify(&self, subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError> {
        classify(subject, body)
    }

    fn class_labels(&self) -> Result<Vec<String>, ClassifierError> {
        class_labels()
    }
}
