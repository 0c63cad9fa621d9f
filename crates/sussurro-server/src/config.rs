//! Server configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default port when neither a flag nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Default cap on uploaded audio size.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024; // 50 MB

/// Configuration for the transcription server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8080`; `0` auto-assigns).
    pub port: u16,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Default config with the port taken from the `PORT` env var when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_port_var(std::env::var("PORT").ok());
        config
    }

    /// Apply a `PORT`-style value, keeping the current port when the value
    /// is missing or unparseable.
    fn apply_port_var(&mut self, value: Option<String>) {
        match value.as_deref() {
            None => {}
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => {
                    warn!(value = raw, "ignoring unparseable PORT value");
                }
            },
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
