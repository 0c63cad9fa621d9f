//! Model file management: download from `HuggingFace` and path resolution.

use std::path::{Path, PathBuf};

#[cfg(feature = "whisper")]
use crate::types::{ResultExt, TranscriptionError};
#[cfg(feature = "whisper")]
use tracing::{debug, info};

/// `HuggingFace` repository hosting the GGML whisper weights.
pub const HF_REPO: &str = "ggerganov/whisper.cpp";

/// Model names known to exist in [`HF_REPO`].
///
/// Any other name is still attempted verbatim; this list only drives
/// the startup warning for likely typos.
pub const KNOWN_MODELS: &[&str] = &[
    "tiny",
    "tiny.en",
    "base",
    "base.en",
    "small",
    "small.en",
    "medium",
    "medium.en",
    "large-v3",
    "large-v3-turbo",
];

/// GGML file name for a model (`base` → `ggml-base.bin`).
pub fn model_filename(name: &str) -> String {
    format!("ggml-{name}.bin")
}

/// Full path of a model file under `dir`.
pub fn model_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(model_filename(name))
}

/// Default model cache directory under `~/.sussurro/models/`.
pub fn default_model_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".sussurro").join("models")
}

/// Check if the model file exists locally.
pub fn is_model_cached(dir: impl AsRef<Path>, name: &str) -> bool {
    model_path(dir, name).exists()
}

/// Download the model file from `HuggingFace` if not already cached.
///
/// Returns the local path of the model file. hf-hub uses sync HTTP, so the
/// download runs on the blocking thread pool.
#[cfg(feature = "whisper")]
pub async fn ensure_model(
    dir: impl AsRef<Path>,
    name: &str,
) -> Result<PathBuf, TranscriptionError> {
    let target = model_path(&dir, name);

    if target.exists() {
        debug!("model already cached at {}", target.display());
        return Ok(target);
    }

    let filename = model_filename(name);
    info!("downloading {filename} from {HF_REPO}...");
    std::fs::create_dir_all(dir.as_ref()).map_err(TranscriptionError::Io)?;

    let dest = target.clone();
    tokio::task::spawn_blocking(move || download_model_file(&filename, &dest))
        .await
        .model("task join")??;

    Ok(target)
}

#[cfg(feature = "whisper")]
fn download_model_file(filename: &str, target: &Path) -> Result<(), TranscriptionError> {
    let api = hf_hub::api::sync::Api::new().model("HF API init")?;
    let repo = api.model(HF_REPO.to_string());

    match repo.get(filename) {
        Ok(cached_path) => {
            // hf-hub caches to its own dir; copy to our model dir
            if cached_path != target {
                let _ =
                    std::fs::copy(&cached_path, target).model(&format!("copy {filename}"))?;
            }
            info!("model ready at {}", target.display());
            Ok(())
        }
        Err(e) => Err(TranscriptionError::ModelNotAvailable(format!(
            "download failed for {filename}: {e}"
        ))),
    }
}
