//! `SussurroServer`: Axum HTTP server wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use sussurro_transcription::Transcriber;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::transcribe;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Transcription engine shared across requests.
    pub engine: Arc<dyn Transcriber>,
    /// Server configuration.
    pub config: ServerConfig,
    /// When the server started.
    pub start_time: Instant,
    /// Handle for rendering the `/metrics` endpoint.
    pub metrics: PrometheusHandle,
}

/// The transcription HTTP server.
pub struct SussurroServer {
    config: ServerConfig,
    engine: Arc<dyn Transcriber>,
    shutdown: CancellationToken,
    start_time: Instant,
    metrics: PrometheusHandle,
}

impl SussurroServer {
    /// Create a new server around an already-loaded engine.
    pub fn new(
        config: ServerConfig,
        engine: Arc<dyn Transcriber>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            config,
            engine,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        // Upload cap is enforced in the handler; the body limit just needs
        // headroom for multipart framing on top of it.
        let body_limit = usize::try_from(self.config.max_upload_bytes.saturating_add(1024 * 1024))
            .unwrap_or(usize::MAX);

        Router::new()
            .route("/transcribe", post(transcribe::transcribe))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and start serving. Returns the bound address and the serve task.
    ///
    /// The task runs until [`shutdown`](Self::shutdown) is called, then
    /// finishes draining in-flight requests.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let local_addr = listener.local_addr()?;

        let app = self.router();
        let token = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server exited with error");
            }
        });

        info!(addr = %local_addr, "listening");
        Ok((local_addr, handle))
    }

    /// Request graceful shutdown of the serve task.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.shutdown.cancel();
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(
        state.start_time,
        state.engine.model_name(),
        state.engine.is_ready(),
    );
    Json(resp)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    crate::metrics::render(&state.metrics)
}
