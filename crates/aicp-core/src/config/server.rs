//! HTTP server configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8000"
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Sessions inactive for longer than this are purged.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,

    /// Expose `GET /api/sessions` (development only).
    #[serde(default)]
    pub expose_sessions: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_ttl_hours: default_session_ttl_hours(),
            expose_sessions: false,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_session_ttl_hours() -> u64 {
    24
}
