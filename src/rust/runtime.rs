use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use log::{info, warn};
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Compute device for the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CUDA when its execution provider is available, otherwise CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
        }
    }
}

impl FromStr for Device {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(ClassifierError::ConfigError(format!(
                "Unknown device '{}' (expected auto, cpu or cuda)",
                other
            ))),
        }
    }
}

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
    pub device: Device,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
            device: Device::Auto,
        }
    }
}

impl RuntimeConfig {
    /// Same settings, pinned to `device`. Used to build a CPU fallback bundle.
    pub fn with_device(&self, device: Device) -> Self {
        Self { device, ..self.clone() }
    }
}

// GraphOptimizationLevel is not Clone
impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
            device: self.device,
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("triage")
        .commit()?;
    Ok(())
}

/// Initializes the ONNX Runtime environment once per process.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| ClassifierError::ModelLoadError(
            format!("Failed to initialize ONNX Runtime environment: {}", e)
        ))
}

fn cuda_available() -> bool {
    match CUDAExecutionProvider::default().is_available() {
        Ok(available) => available,
        Err(e) => {
            warn!("Could not query CUDA execution provider: {}", e);
            false
        }
    }
}

/// Picks the concrete device for `requested`.
///
/// # Errors
/// - `ModelLoadError` if CUDA was requested explicitly but is unavailable
pub fn resolve_device(requested: Device) -> Result<Device, ClassifierError> {
    match requested {
        Device::Cpu => Ok(Device::Cpu),
        Device::Cuda if cuda_available() => Ok(Device::Cuda),
        Device::Cuda => Err(ClassifierError::ModelLoadError(
            "CUDA device requested but the CUDA execution provider is unavailable".into()
        )),
        Device::Auto if cuda_available() => Ok(Device::Cuda),
        Device::Auto => {
            info!("CUDA unavailable, running on CPU");
            Ok(Device::Cpu)
        }
    }
}

fn base_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;
    Ok(builder)
}

/// Creates a session builder configured from `config`, returning the device it targets.
///
/// CUDA registration is strict: ONNX Runtime would otherwise log the failure and quietly run
/// on CPU. An explicit `Cuda` request fails to load; `Auto` falls back to a CPU builder.
///
/// # Errors
/// - `ModelLoadError` if the environment or builder cannot be set up, or CUDA was requested
///   explicitly and cannot be used
pub fn create_session_builder(config: &RuntimeConfig) -> Result<(SessionBuilder, Device), ClassifierError> {
    ensure_initialized()?;
    let device = resolve_device(config.device)?;
    let builder = base_builder(config)?;
    if device != Device::Cuda {
        return Ok((builder, Device::Cpu));
    }

    let cuda = CUDAExecutionProvider::default().build().error_on_failure();
    match builder.with_execution_providers([cuda]) {
        Ok(builder) => Ok((builder, Device::Cuda)),
        Err(e) if config.device == Device::Auto => {
            warn!("CUDA execution provider failed to register ({}), running on CPU", e);
            Ok((base_builder(config)?, Device::Cpu))
        }
        Err(e) => Err(ClassifierError::ModelLoadError(format!(
            "CUDA execution provider failed to register: {}",
            e
        ))),
    }
}
