//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Name of the loaded model.
    pub model: String,
    /// Whether the engine can serve transcriptions.
    pub engine_ready: bool,
}

/// Build a health response from live state.
pub fn health_check(start_time: Instant, model: &str, engine_ready: bool) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        model: model.to_string(),
        engine_ready,
    }
}
