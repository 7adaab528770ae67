use std::env;
use std::path::PathBuf;

use crate::classifier::{ClassifierError, DEFAULT_MAX_LENGTH};
use crate::model_manager::ModelManager;
use crate::runtime::{Device, RuntimeConfig};

/// Everything needed to load a [`ClassifierBundle`](crate::ClassifierBundle).
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Directory holding `model.onnx`, `tokenizer.json` and `labels.json`
    pub model_dir: PathBuf,
    /// Encoded sequence length
    pub max_length: usize,
    pub runtime: RuntimeConfig,
    /// Fail the load when a label has no department route
    pub strict_routing: bool,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model_dir: ModelManager::get_default_models_dir(),
            max_length: DEFAULT_MAX_LENGTH,
            runtime: RuntimeConfig::default(),
            strict_routing: false,
        }
    }
}

impl TriageConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by the environment:
    /// - `TRIAGE_MODEL_DIR`: artifact directory
    /// - `TRIAGE_DEVICE`: `auto`, `cpu` or `cuda`
    /// - `TRIAGE_INTRA_THREADS`: ONNX Runtime intra-op threads
    /// - `TRIAGE_STRICT_ROUTING`: `1`/`true` to reject unrouted labels
    pub fn from_env() -> Result<Self, ClassifierError> {
        let mut config = Self::default();

        if let Ok(dir) = env::var("TRIAGE_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Ok(device) = env::var("TRIAGE_DEVICE") {
            config.runtime.device = device.parse::<Device>()?;
        }
        if let Ok(threads) = env::var("TRIAGE_INTRA_THREADS") {
            config.runtime.intra_threads = threads.trim().parse().map_err(|_| {
                ClassifierError::ConfigError(format!("TRIAGE_INTRA_THREADS is not a number: '{}'", threads))
            })?;
        }
        if let Ok(strict) = env::var("TRIAGE_STRICT_ROUTING") {
            config.strict_routing = parse_flag(&strict).ok_or_else(|| {
                ClassifierError::ConfigError(format!("TRIAGE_STRICT_ROUTING is not a boolean: '{}'", strict))
            })?;
        }

        Ok(config)
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.runtime.device = device;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TriageConfig::new("/srv/triage/models");
        assert_eq!(config.max_length, 128);
        assert_eq!(config.runtime.device, Device::Auto);
        assert!(!config.strict_routing);
        assert_eq!(config.model_dir, PathBuf::from("/srv/triage/models"));
    }

    #[test]
    fn test_from_env() {
        env::set_var("TRIAGE_MODEL_DIR", "/tmp/triage-env-test");
        env::set_var("TRIAGE_DEVICE", "cpu");
        env::set_var("TRIAGE_STRICT_ROUTING", "yes");
        let config = TriageConfig::from_env().unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/tmp/triage-env-test"));
        assert_eq!(config.runtime.device, Device::Cpu);
        assert!(config.strict_routing);

        env::set_var("TRIAGE_DEVICE", "abacus");
        assert!(matches!(TriageConfig::from_env(), Err(ClassifierError::ConfigError(_))));

        env::remove_var("TRIAGE_MODEL_DIR");
        env::remove_var("TRIAGE_DEVICE");
        env::remove_var("TRIAGE_STRICT_ROUTING");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
