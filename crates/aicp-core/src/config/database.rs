//! Database connection configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, require_env};

/// Configuration for the relational executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL. Prefer `url_env` so credentials stay out of files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Environment variable containing the connection URL.
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Per-statement timeout in seconds, enforced by the database.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            url_env: default_url_env(),
            max_connections: default_max_connections(),
            statement_timeout_secs: default_statement_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve the connection URL, preferring an explicit value over the environment.
    pub fn connection_string(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        require_env(&self.url_env)
    }
}

fn default_url_env() -> String {
    "DB_URI".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_statement_timeout() -> u64 {
    30
}
