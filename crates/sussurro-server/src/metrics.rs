//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// Transcription requests total (counter, labels: status).
pub const TRANSCRIBE_REQUESTS_TOTAL: &str = "transcribe_requests_total";
/// Transcription errors total (counter, labels: code).
pub const TRANSCRIBE_ERRORS_TOTAL: &str = "transcribe_errors_total";
/// End-to-end request duration seconds (histogram).
pub const TRANSCRIBE_DURATION_SECONDS: &str = "transcribe_duration_seconds";
/// Uploaded payload size in bytes (histogram).
pub const TRANSCRIBE_UPLOAD_BYTES: &str = "transcribe_upload_bytes";
/// Decoded audio length in seconds (histogram).
pub const TRANSCRIBE_AUDIO_SECONDS: &str = "transcribe_audio_seconds";
