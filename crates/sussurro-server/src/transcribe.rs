//! `POST /transcribe` handler: multipart upload, staged to disk, transcribed.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::response::Json;
use metrics::{counter, histogram};
use serde::Serialize;
use sussurro_transcription::{Transcriber, Transcript};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::{
    TRANSCRIBE_AUDIO_SECONDS, TRANSCRIBE_DURATION_SECONDS, TRANSCRIBE_ERRORS_TOTAL,
    TRANSCRIBE_REQUESTS_TOTAL, TRANSCRIBE_UPLOAD_BYTES,
};
use crate::server::AppState;

/// Typed response for `POST /transcribe`.
#[derive(Debug, Clone, Serialize)]
pub struct TranscribeResponse {
    /// Full transcript text.
    pub text: String,
    /// Detected (or forced) language code.
    pub language: String,
    /// Length of the decoded audio in seconds.
    pub duration_seconds: f64,
    /// Wall-clock processing time.
    pub processing_time_ms: u64,
    /// Name of the model that produced the transcript.
    pub model: String,
    /// Time-aligned transcript segments.
    pub segments: Vec<SegmentResponse>,
}

/// One time-aligned segment in the response.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentResponse {
    /// Segment start in seconds.
    pub start: f64,
    /// Segment end in seconds.
    pub end: f64,
    /// Segment text.
    pub text: String,
}

/// `POST /transcribe`: multipart audio upload in, transcript JSON out.
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let started = Instant::now();
    let result = handle_upload(&state, multipart).await;
    histogram!(TRANSCRIBE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

    match &result {
        Ok(resp) => {
            counter!(TRANSCRIBE_REQUESTS_TOTAL, "status" => "ok").increment(1);
            histogram!(TRANSCRIBE_AUDIO_SECONDS).record(resp.duration_seconds);
        }
        Err(err) => {
            counter!(TRANSCRIBE_REQUESTS_TOTAL, "status" => "error").increment(1);
            counter!(TRANSCRIBE_ERRORS_TOTAL, "code" => err.code()).increment(1);
        }
    }
    result.map(Json)
}

async fn handle_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<TranscribeResponse, ApiError> {
    let request_id = Uuid::now_v7();
    let started = Instant::now();

    let upload = read_audio_field(&mut multipart).await?;
    let size = upload.bytes.len() as u64;
    if upload.bytes.is_empty() {
        return Err(ApiError::InvalidInput {
            message: "audio payload is empty".into(),
        });
    }
    if size > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge {
            size,
            max: state.config.max_upload_bytes,
        });
    }

    info!(
        %request_id,
        size_bytes = size,
        filename = upload.filename.as_deref().unwrap_or("-"),
        "audio upload received"
    );
    histogram!(TRANSCRIBE_UPLOAD_BYTES).record(size as f64);

    let engine = state.engine.clone();
    let suffix = staging_suffix(upload.filename.as_deref());
    let bytes = upload.bytes;
    let transcript =
        tokio::task::spawn_blocking(move || stage_and_transcribe(engine.as_ref(), &bytes, &suffix))
            .await
            .map_err(|e| ApiError::Inference {
                message: format!("transcription task failed: {e}"),
            })??;

    let processing_time_ms = started.elapsed().as_millis() as u64;
    info!(
        %request_id,
        chars = transcript.text.len(),
        language = %transcript.language,
        elapsed_ms = processing_time_ms,
        "transcription complete"
    );

    Ok(build_response(
        transcript,
        state.engine.model_name(),
        processing_time_ms,
    ))
}

struct AudioUpload {
    bytes: Bytes,
    filename: Option<String>,
}

/// Pull the audio part out of the multipart body.
///
/// Prefers the field named `file`; otherwise takes the first field that
/// carries a filename.
async fn read_audio_field(multipart: &mut Multipart) -> Result<AudioUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput {
            message: format!("malformed multipart body: {e}"),
        })?
    {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| ApiError::InvalidInput {
            message: format!("could not read upload: {e}"),
        })?;
        return Ok(AudioUpload { bytes, filename });
    }

    Err(ApiError::InvalidInput {
        message: "no audio file in request (expected multipart field \"file\")".into(),
    })
}

/// Suffix for the staging file, taken from the uploaded filename.
///
/// Decoders pick the container format by extension, so an `.m4a` upload must
/// not be staged as `.wav`. Falls back to `.wav` when the name has no usable
/// extension.
fn staging_suffix(filename: Option<&str>) -> String {
    let ext = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match ext {
        Some(ext) => format!(".{}", ext.to_ascii_lowercase()),
        None => ".wav".into(),
    }
}

/// Write the upload to a uniquely named temp file and run the engine on it.
///
/// `NamedTempFile` removes the file when the guard drops, so every exit from
/// this function (success, decode failure, inference failure, panic) leaves
/// no staged file behind.
fn stage_and_transcribe(
    engine: &dyn Transcriber,
    bytes: &[u8],
    suffix: &str,
) -> Result<Transcript, ApiError> {
    let mut staged = tempfile::Builder::new()
        .prefix("sussurro-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| ApiError::Storage {
            message: format!("create staging file: {e}"),
        })?;

    staged.write_all(bytes).map_err(|e| ApiError::Storage {
        message: format!("write staging file: {e}"),
    })?;
    staged.flush().map_err(|e| ApiError::Storage {
        message: format!("flush staging file: {e}"),
    })?;

    debug!(path = %staged.path().display(), "upload staged");
    let transcript = engine.transcribe_file(staged.path())?;
    Ok(transcript)
}

fn build_response(
    transcript: Transcript,
    model: &str,
    processing_time_ms: u64,
) -> TranscribeResponse {
    TranscribeResponse {
        text: transcript.text,
        language: transcript.language,
        duration_seconds: transcript.duration_seconds,
        processing_time_ms,
        model: model.to_string(),
        segments: transcript
            .segments
            .into_iter()
            .map(|s| SegmentResponse {
                start: s.start,
                end: s.end,
                text: s.text,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sussurro_transcription::transcriber::{MockFailure, MockTranscriber};
    use sussurro_transcription::Segment;

    // ── staging_suffix tests ──

    #[test]
    fn suffix_from_filename_extension() {
        assert_eq!(staging_suffix(Some("clip.wav")), ".wav");
        assert_eq!(staging_suffix(Some("memo.m4a")), ".m4a");
        assert_eq!(staging_suffix(Some("song.flac")), ".flac");
    }

    #[test]
    fn suffix_is_lowercased() {
        assert_eq!(staging_suffix(Some("CLIP.WAV")), ".wav");
        assert_eq!(staging_suffix(Some("Memo.M4A")), ".m4a");
    }

    #[test]
    fn suffix_defaults_to_wav() {
        assert_eq!(staging_suffix(None), ".wav");
        assert_eq!(staging_suffix(Some("noext")), ".wav");
        assert_eq!(staging_suffix(Some("trailing.")), ".wav");
    }

    #[test]
    fn suffix_rejects_suspicious_extensions() {
        // Too long or non-alphanumeric extensions fall back to .wav
        assert_eq!(staging_suffix(Some("x.verylongext")), ".wav");
        assert_eq!(staging_suffix(Some("x.w~v")), ".wav");
    }

    // ── response shape tests ──

    #[test]
    fn response_serializes_snake_case() {
        let resp = build_response(
            Transcript {
                text: "hello world".into(),
                language: "en".into(),
                duration_seconds: 2.5,
                segments: vec![Segment {
                    start: 0.0,
                    end: 2.5,
                    text: "hello world".into(),
                }],
            },
            "base",
            120,
        );
        let val = serde_json::to_value(&resp).unwrap();
        assert_eq!(val["text"], "hello world");
        assert_eq!(val["language"], "en");
        assert_eq!(val["duration_seconds"], 2.5);
        assert_eq!(val["processing_time_ms"], 120);
        assert_eq!(val["model"], "base");
        assert_eq!(val["segments"][0]["start"], 0.0);
        assert_eq!(val["segments"][0]["end"], 2.5);
        assert_eq!(val["segments"][0]["text"], "hello world");
        // No camelCase keys on this wire contract
        assert!(val.get("durationSeconds").is_none());
        assert!(val.get("processingTimeMs").is_none());
    }

    // ── stage_and_transcribe tests ──

    #[test]
    fn staging_produces_transcript_and_cleans_up() {
        let mock = MockTranscriber::new("stub").with_text("transcribed");
        let transcript = stage_and_transcribe(&mock, b"fake-audio-bytes", ".wav").unwrap();
        assert_eq!(transcript.text, "transcribed");

        let paths = mock.seen_paths();
        assert_eq!(paths.len(), 1);
        assert!(
            !paths[0].exists(),
            "staged file must be gone after success: {}",
            paths[0].display()
        );
    }

    #[test]
    fn staged_file_has_prefix_and_suffix() {
        let mock = MockTranscriber::new("stub");
        let _ = stage_and_transcribe(&mock, b"bytes", ".m4a").unwrap();

        let paths = mock.seen_paths();
        let name = paths[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("sussurro-"), "got: {name}");
        assert!(name.ends_with(".m4a"), "got: {name}");
    }

    #[test]
    fn staged_file_existed_during_transcription() {
        // The echoing mock reads the staged file, so a non-empty transcript
        // proves the bytes were on disk while the engine ran.
        let mock = MockTranscriber::new("stub").echoing_file();
        let transcript = stage_and_transcribe(&mock, b"on-disk-content", ".wav").unwrap();
        assert_eq!(transcript.text, "on-disk-content");
        assert!(!mock.seen_paths()[0].exists());
    }

    #[test]
    fn cleanup_happens_on_inference_failure() {
        let mock = MockTranscriber::new("stub").with_failure(MockFailure::Inference);
        let err = stage_and_transcribe(&mock, b"bytes", ".wav").unwrap_err();
        assert!(matches!(err, ApiError::Inference { .. }));

        let paths = mock.seen_paths();
        assert_eq!(paths.len(), 1);
        assert!(
            !paths[0].exists(),
            "staged file must be gone after failure: {}",
            paths[0].display()
        );
    }

    #[test]
    fn cleanup_happens_on_decode_failure() {
        let mock = MockTranscriber::new("stub").with_failure(MockFailure::AudioDecode);
        let err = stage_and_transcribe(&mock, b"not really audio", ".wav").unwrap_err();
        assert!(matches!(err, ApiError::AudioDecode { .. }));
        assert!(!mock.seen_paths()[0].exists());
    }

    #[test]
    fn engine_unavailable_maps_through() {
        let mock = MockTranscriber::new("stub").with_failure(MockFailure::ModelNotAvailable);
        let err = stage_and_transcribe(&mock, b"bytes", ".wav").unwrap_err();
        assert!(matches!(err, ApiError::EngineUnavailable { .. }));
    }

    #[test]
    fn sequential_uploads_do_not_share_staging_files() {
        let mock = MockTranscriber::new("stub").echoing_file();

        let first = stage_and_transcribe(&mock, b"first payload", ".wav").unwrap();
        let second = stage_and_transcribe(&mock, b"second payload", ".wav").unwrap();

        assert_eq!(first.text, "first payload");
        assert_eq!(second.text, "second payload");

        let paths = mock.seen_paths();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1], "each upload gets its own file");
    }

    #[tokio::test]
    async fn concurrent_uploads_do_not_cross_contaminate() {
        let mock = std::sync::Arc::new(MockTranscriber::new("stub").echoing_file());

        let a = {
            let mock = mock.clone();
            tokio::task::spawn_blocking(move || {
                stage_and_transcribe(mock.as_ref(), b"payload-alpha", ".wav")
            })
        };
        let b = {
            let mock = mock.clone();
            tokio::task::spawn_blocking(move || {
                stage_and_transcribe(mock.as_ref(), b"payload-bravo", ".wav")
            })
        };

        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap().unwrap().text, "payload-alpha");
        assert_eq!(b.unwrap().unwrap().text, "payload-bravo");

        for path in mock.seen_paths() {
            assert!(!path.exists());
        }
    }
}
