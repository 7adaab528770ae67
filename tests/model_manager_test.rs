use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use triage::{ArtifactManifest, ArtifactPaths, ModelError, ModelManager};

fn hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

const MODEL: &[u8] = b"not really onnx";
const TOKENIZER: &[u8] = b"{\"model\": {}}";
const LABELS: &[u8] = b"[\"Complaints\", \"Staff Matters\"]";

fn write_artifacts(dir: &Path) {
    let paths = ArtifactPaths::in_dir(dir);
    fs::write(&paths.model, MODEL).unwrap();
    fs::write(&paths.tokenizer, TOKENIZER).unwrap();
    fs::write(&paths.labels, LABELS).unwrap();
}

fn manifest(base_url: Option<&str>) -> ArtifactManifest {
    ArtifactManifest {
        base_url: base_url.map(str::to_string),
        model_sha256: hash(MODEL),
        tokenizer_sha256: hash(TOKENIZER),
        labels_sha256: hash(LABELS),
    }
}

#[test]
fn test_paths_and_presence() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    assert!(!manager.is_model_downloaded());

    write_artifacts(dir.path());
    assert!(manager.is_model_downloaded());
    assert_eq!(manager.paths().labels, dir.path().join("labels.json"));
}

#[test]
fn test_verify_model_detects_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    let manifest = manifest(None);

    // Test verification of non-existent model
    assert!(!manager.verify_model(&manifest).unwrap());

    write_artifacts(dir.path());
    assert!(manager.verify_model(&manifest).unwrap());

    // Corrupt file and verify
    fs::write(manager.paths().tokenizer, "corrupted data").unwrap();
    assert!(!manager.verify_model(&manifest).unwrap());
}

#[test]
fn test_load_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    assert!(manager.load_manifest().unwrap().is_none());

    fs::write(
        manager.manifest_path(),
        format!(
            r#"{{"base_url": "https://mirror.example/triage", "model_sha256": "{}", "tokenizer_sha256": "{}", "labels_sha256": "{}"}}"#,
            hash(MODEL),
            hash(TOKENIZER),
            hash(LABELS)
        ),
    )
    .unwrap();
    let loaded = manager.load_manifest().unwrap().unwrap();
    assert_eq!(loaded, manifest(Some("https://mirror.example/triage")));

    fs::write(manager.manifest_path(), "{}").unwrap();
    assert!(matches!(manager.load_manifest(), Err(ModelError::ManifestError(_))));
}

#[tokio::test]
async fn test_ensure_verified_artifacts_skips_download() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let manager = ModelManager::new(dir.path()).unwrap();

    // No base_url: any download attempt would fail
    manager.ensure_model_downloaded(&manifest(None)).await.unwrap();
    assert!(manager.is_model_downloaded());
}

#[tokio::test]
async fn test_failed_download_keeps_verified_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let manager = ModelManager::new(dir.path()).unwrap();
    fs::write(manager.paths().tokenizer, "corrupted data").unwrap();

    let err = manager.ensure_model_downloaded(&manifest(None)).await.unwrap_err();
    assert!(matches!(err, ModelError::ManifestError(_)));

    let paths = manager.paths();
    assert_eq!(fs::read(&paths.model).unwrap(), MODEL);
    assert_eq!(fs::read(&paths.labels).unwrap(), LABELS);
    // The corrupt file is only replaced by a verified download
    assert_eq!(fs::read(&paths.tokenizer).unwrap(), b"corrupted data");
}

#[tokio::test]
async fn test_unreachable_mirror_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let manager = ModelManager::new(dir.path()).unwrap();
    fs::remove_file(manager.paths().labels).unwrap();

    let err = manager
        .download_model(&manifest(Some("http://127.0.0.1:9/triage")))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::DownloadError(_)));

    assert!(manager.paths().model.exists());
    assert!(manager.paths().tokenizer.exists());
    assert!(!manager.paths().labels.exists());
    assert!(!dir.path().join("labels.json.part").exists());
}

#[test]
fn test_download_without_base_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    let result = tokio_test::block_on(manager.ensure_model_downloaded(&manifest(None)));
    assert!(matches!(result, Err(ModelError::ManifestError(_))));
    assert!(!manager.is_model_downloaded());
}
