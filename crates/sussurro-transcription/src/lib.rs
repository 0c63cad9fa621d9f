//! Speech-to-text engine built on whisper.cpp GGML models.
//!
//! # Architecture
//!
//! ```text
//! WAV bytes → hound decode → downmix to mono → resample to 16kHz f32
//! → whisper.cpp (via whisper-rs, greedy sampling) → segments
//! → full text + per-segment timestamps
//! ```
//!
//! The [`Transcriber`] trait is the seam the HTTP layer depends on, so the
//! server never names a concrete engine. The native [`engine::WhisperEngine`]
//! requires the `whisper` feature (and cmake for the whisper.cpp build);
//! without it the crate still provides audio decoding, model path management,
//! and the trait itself.
//!
//! ## Crate Position
//!
//! Standalone (no sussurro crate dependencies).
//! Depended on by: sussurro-server.

// Always available (no heavy deps)
pub mod audio;
pub mod model;
pub mod transcriber;
pub mod types;

// Feature-gated (requires whisper-rs)
#[cfg(feature = "whisper")]
pub mod engine;

pub use transcriber::Transcriber;
pub use types::{ResultExt, Segment, Transcript, TranscriptionError};
#[cfg(feature = "whisper")]
pub use engine::{EngineConfig, WhisperEngine};
