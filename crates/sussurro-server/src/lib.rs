//! # sussurro-server
//!
//! Axum HTTP server for audio transcription.
//!
//! - `POST /transcribe`: multipart audio upload, staged to a temp file and
//!   run through the shared [`Transcriber`](sussurro_transcription::Transcriber)
//! - `GET /health`: liveness plus engine readiness
//! - `GET /metrics`: Prometheus exposition
//! - Permissive CORS, request tracing, graceful shutdown via `CancellationToken`
//!
//! The engine is injected at construction and shared behind an `Arc`, so
//! tests swap in a stub without touching the HTTP layer.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod server;
pub mod transcribe;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, SussurroServer};
