//! Whisper inference engine backed by whisper.cpp.
//!
//! Requires the `whisper` feature (and cmake for the native build). One
//! [`WhisperEngine`] holds the loaded model for the process lifetime; each
//! transcription runs on a fresh whisper state. Model access is serialized
//! through a mutex, so concurrent callers queue rather than contend inside
//! whisper.cpp.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

use crate::audio;
use crate::transcriber::Transcriber;
use crate::types::{ResultExt, Segment, Transcript, TranscriptionError};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Engine construction settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the GGML model file.
    pub model_path: PathBuf,
    /// Language code to force (e.g. "pt"); `None` lets the model detect.
    pub language: Option<String>,
    /// Inference thread count; `None` lets whisper.cpp pick.
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: crate::model::model_path(crate::model::default_model_dir(), "base"),
            language: None,
            threads: None,
        }
    }
}

/// Long-lived whisper.cpp engine.
pub struct WhisperEngine {
    context: Mutex<WhisperContext>,
    config: EngineConfig,
    model_name: String,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Model name from a GGML file path (`/x/ggml-base.bin` → `base`).
fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.strip_prefix("ggml-").unwrap_or(s))
        .unwrap_or("unknown")
        .to_string()
}

impl WhisperEngine {
    /// Load the model weights at `config.model_path`.
    pub fn load(config: EngineConfig) -> Result<Self, TranscriptionError> {
        // Route whisper.cpp's stderr chatter through the log hooks (once).
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(TranscriptionError::ModelNotAvailable(format!(
                "model file not found: {}",
                config.model_path.display()
            )));
        }

        let model_name = model_name_from_path(&config.model_path);

        let path = config.model_path.to_str().ok_or_else(|| {
            TranscriptionError::ModelNotAvailable("invalid UTF-8 in model path".into())
        })?;
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .model("load whisper model")?;

        info!(model = %model_name, "whisper model loaded");
        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run inference over decoded samples.
    fn run(&self, samples: &[f32], duration_seconds: f64) -> Result<Transcript, TranscriptionError> {
        let context = self.context.lock().inference("context lock")?;
        let mut state = context.create_state().inference("create state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(self.config.language.as_deref());
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        // Keep whisper.cpp off stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let _ = state.full(params, samples).inference("whisper full")?;

        let lang_id = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(lang_id).unwrap_or("").to_string();

        let mut text = String::new();
        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let segment_text = segment.to_string();
            text.push_str(&segment_text);
            // Segment timestamps are in centiseconds (10ms units)
            segments.push(Segment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text: segment_text.trim().to_string(),
            });
        }

        Ok(Transcript {
            text: text.trim().to_string(),
            language,
            duration_seconds,
            segments,
        })
    }
}

impl Transcriber for WhisperEngine {
    fn transcribe_file(&self, path: &Path) -> Result<Transcript, TranscriptionError> {
        let buffer = audio::load_wav(path)?;
        debug!(
            duration_secs = buffer.duration_seconds,
            samples = buffer.samples.len(),
            "audio decoded"
        );
        self.run(&buffer.samples, buffer.duration_seconds)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}
