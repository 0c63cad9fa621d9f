//! The [`Transcriber`] trait, the seam between HTTP serving and inference.
//!
//! The server depends only on this trait, so the long-lived engine is
//! injected at startup and swapped for a mock in tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::types::{Segment, Transcript, TranscriptionError};

/// Speech-to-text over a staged audio file.
///
/// Implementations are blocking and CPU-bound; callers running inside an
/// async runtime are expected to dispatch onto a blocking thread pool.
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `path`.
    fn transcribe_file(&self, path: &Path) -> Result<Transcript, TranscriptionError>;

    /// Name of the loaded model.
    fn model_name(&self) -> &str;

    /// Whether the engine can serve transcriptions.
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> so shared engines satisfy generic bounds.
impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe_file(&self, path: &Path) -> Result<Transcript, TranscriptionError> {
        (**self).transcribe_file(path)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Failure modes a [`MockTranscriber`] can be configured to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Simulate undecodable audio input.
    AudioDecode,
    /// Simulate a model execution failure.
    Inference,
    /// Simulate a missing model.
    ModelNotAvailable,
}

/// Mock transcriber for testing the HTTP layer without a model.
#[derive(Debug)]
pub struct MockTranscriber {
    model_name: String,
    text: String,
    language: String,
    failure: Option<MockFailure>,
    echo_file: bool,
    seen_paths: Mutex<Vec<PathBuf>>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            text: "mock transcription".to_string(),
            language: "en".to_string(),
            failure: None,
            echo_file: false,
            seen_paths: Mutex::new(Vec::new()),
        }
    }

    /// Configure the mock to return a specific transcript text.
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Configure the mock to fail with the given mode on every call.
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Configure the mock to return the staged file's contents as the
    /// transcript text. Lets tests prove which bytes a request staged.
    pub fn echoing_file(mut self) -> Self {
        self.echo_file = true;
        self
    }

    /// Paths passed to [`Transcriber::transcribe_file`] so far.
    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen_paths
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe_file(&self, path: &Path) -> Result<Transcript, TranscriptionError> {
        if let Ok(mut paths) = self.seen_paths.lock() {
            paths.push(path.to_path_buf());
        }

        if let Some(failure) = self.failure {
            return Err(match failure {
                MockFailure::AudioDecode => {
                    TranscriptionError::AudioDecode("mock decode failure".into())
                }
                MockFailure::Inference => {
                    TranscriptionError::Inference("mock inference failure".into())
                }
                MockFailure::ModelNotAvailable => {
                    TranscriptionError::ModelNotAvailable("mock model missing".into())
                }
            });
        }

        let text = if self.echo_file {
            String::from_utf8_lossy(&std::fs::read(path)?).into_owned()
        } else {
            self.text.clone()
        };

        Ok(Transcript {
            segments: vec![Segment {
                start: 0.0,
                end: 1.0,
                text: text.clone(),
            }],
            text,
            language: self.language.clone(),
            duration_seconds: 1.0,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        self.failure.is_none()
    }
}
