use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use serde::Deserialize;
use sha2::{Sha256, Digest};

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const LABELS_FILE: &str = "labels.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifacts not present in {0}")]
    NotDownloaded(String),
    #[error("Manifest error: {0}")]
    ManifestError(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Locations of the three startup artifacts inside a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    pub labels: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model: dir.join(MODEL_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            labels: dir.join(LABELS_FILE),
        }
    }

    pub fn all_exist(&self) -> bool {
        self.model.exists() && self.tokenizer.exists() && self.labels.exists()
    }

    fn entries(&self) -> [(&'static str, &Path); 3] {
        [
            ("model", &self.model),
            ("tokenizer", &self.tokenizer),
            ("labels", &self.labels),
        ]
    }
}

/// Expected artifact hashes and an optional mirror to fetch them from (`manifest.json`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ArtifactManifest {
    /// Base URL; artifacts are fetched from `{base_url}/{file name}`
    #[serde(default)]
    pub base_url: Option<String>,
    pub model_sha256: String,
    pub tokenizer_sha256: String,
    pub labels_sha256: String,
}

impl ArtifactManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| ModelError::ManifestError(e.to_string()))
    }

    fn expected_hash(&self, file_type: &str) -> &str {
        match file_type {
            "model" => &self.model_sha256,
            "tokenizer" => &self.tokenizer_sha256,
            _ => &self.labels_sha256,
        }
    }

    fn url_for(&self, file_name: &str) -> Result<String, ModelError> {
        let base = self.base_url.as_deref().ok_or_else(|| {
            ModelError::ManifestError("Manifest has no base_url to download from".into())
        })?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), file_name))
    }
}

/// Provisions and verifies the artifacts in a model directory.
#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("TRIAGE_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("triage").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("triage").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("triage").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.models_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.models_dir.join(MANIFEST_FILE)
    }

    /// Reads `manifest.json` from the models directory, if there is one.
    pub fn load_manifest(&self) -> Result<Option<ArtifactManifest>, ModelError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        ArtifactManifest::from_file(&path).map(Some)
    }

    pub fn is_model_downloaded(&self) -> bool {
        let paths = self.paths();
        log::info!("Checking model artifacts in {:?}:", self.models_dir);
        for (file_type, path) in paths.entries() {
            log::info!("  {} path: {:?} (exists: {})", file_type, path, path.exists());
        }
        paths.all_exist()
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::debug!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks every artifact exists and matches its manifest hash.
    pub fn verify_model(&self, manifest: &ArtifactManifest) -> Result<bool, ModelError> {
        let paths = self.paths();
        if !paths.all_exist() {
            log::info!("One or more artifacts do not exist");
            return Ok(false);
        }

        for (file_type, path) in paths.entries() {
            let ok = self.verify_file(path, manifest.expected_hash(file_type))?;
            log::info!("  {} hash verification: {}", file_type, ok);
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Downloads every missing or corrupt artifact from the manifest's `base_url`.
    ///
    /// Concurrent calls on clones of the same manager are serialized. Each file is fetched to
    /// `<name>.part` and only renamed into place once its hash matches, so a failure leaves the
    /// already verified artifacts untouched.
    pub async fn download_model(&self, manifest: &ArtifactManifest) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;
        fs::create_dir_all(&self.models_dir)?;

        let paths = self.paths();
        for (file_type, path) in paths.entries() {
            let expected = manifest.expected_hash(file_type);
            if path.exists() && self.verify_file(path, expected)? {
                log::info!("Existing {} file verified successfully", file_type);
                continue;
            }
            if path.exists() {
                log::warn!("{} file verification failed, redownloading", file_type);
            }

            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let result = match manifest.url_for(file_name) {
                Ok(url) => self.download_and_verify_file(&url, path, expected, file_type).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::error!("Failed to set up {} file: {}", file_type, e);
                return Err(e);
            }
        }

        log::info!("Model artifacts ready to use");
        Ok(())
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ModelError> {
        let partial = partial_path(path);
        let result = match self.fetch_to(url, &partial, expected_hash, file_type).await {
            Ok(()) => fs::rename(&partial, path).map_err(ModelError::from),
            Err(e) => Err(e),
        };

        if result.is_err() && partial.exists() {
            if let Err(e) = fs::remove_file(&partial) {
                log::error!("Failed to remove partial download {:?}: {}", partial, e);
            }
        }
        if result.is_ok() {
            log::info!("{} file downloaded and verified successfully", file_type);
        }
        result
    }

    async fn fetch_to(
        &self,
        url: &str,
        partial: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ModelError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, partial);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = sha256_hex(&bytes);
        if !hash.eq_ignore_ascii_case(expected_hash) {
            log::error!("{} hash mismatch: expected {}, got {}", file_type, expected_hash, hash);
            return Err(ModelError::HashMismatch {
                file_type: file_type.to_string(),
                expected: expected_hash.to_string(),
                actual: hash,
            });
        }

        fs::write(partial, &bytes)?;
        if !self.verify_file(partial, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }
        Ok(())
    }

    /// Ensures the artifacts are present and verified, downloading when they are not.
    pub async fn ensure_model_downloaded(&self, manifest: &ArtifactManifest) -> Result<(), ModelError> {
        if self.verify_model(manifest)? {
            log::info!("Model verification successful");
            return Ok(());
        }
        log::info!("Model artifacts missing or unverified, downloading...");
        self.download_model(manifest).await
    }
}

/// `model.onnx` downloads to `model.onnx.part` until verified.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
