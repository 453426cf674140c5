//! Configuration types for the AICP query gateway.
//!
//! Configuration is loaded from a single YAML file (`aicp.yaml` by default).
//! Every field has a default so an empty file is a valid configuration; secrets
//! such as the database URL and the LLM API key are read from the environment.

pub mod access;
pub mod database;
pub mod limits;
pub mod llm;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use access::AccessConfig;
pub use database::DatabaseConfig;
pub use limits::LimitsConfig;
pub use llm::LlmConfig;
pub use server::ServerConfig;

use crate::HARD_MAX_RESULT_ROWS;

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Relational database connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Text-generation service.
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Row caps and prompt/summary size limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Patient table and scope columns used by the policy layer.
    #[serde(default)]
    pub access: AccessConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortalConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load from `path`, or start from defaults when no path is given, then
    /// apply environment overrides and validate. A named file that does not
    /// exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                return Err(ConfigError::Config(format!(
                    "config file {} does not exist",
                    p.display()
                )));
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `AICP_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("AICP_DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(bind) = lookup("AICP_BIND") {
            self.server.bind = bind;
        }
        if let Some(model) = lookup("AICP_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("AICP_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.limits.max_result_rows;
        if max == 0 || max > HARD_MAX_RESULT_ROWS {
            return Err(ConfigError::Config(format!(
                "limits.max_result_rows must be between 1 and {}, got {}",
                HARD_MAX_RESULT_ROWS, max
            )));
        }
        if self.access.patient_table.trim().is_empty() {
            return Err(ConfigError::Config(
                "access.patient_table must not be empty".to_string(),
            ));
        }
        if self.server.session_ttl_hours == 0 {
            return Err(ConfigError::Config(
                "server.session_ttl_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read a required environment variable.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnv(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = PortalConfig::from_yaml("").unwrap();
        assert_eq!(config.limits.max_result_rows, 1000);
        assert_eq!(config.access.schema, "dbo");
        assert_eq!(config.access.patient_table, "patients");
        assert_eq!(config.server.session_ttl_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r#"
limits:
  preview_rows: 5
llm:
  model: gpt-4.1
"#;
        let config = PortalConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limits.preview_rows, 5);
        assert_eq!(config.limits.max_result_rows, 1000);
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn row_cap_above_hard_bound_is_invalid() {
        let config = PortalConfig::from_yaml("limits:\n  max_result_rows: 5000\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_result_rows"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = PortalConfig::default();
        let env: HashMap<&str, &str> = [
            ("AICP_DATABASE_URL", "postgres://u@h/db"),
            ("AICP_BIND", "127.0.0.1:9000"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.database.url.as_deref(), Some("postgres://u@h/db"));
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.llm.model, LlmConfig::default().model);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  bind: \"0.0.0.0:9999\"\n  expose_sessions: true").unwrap();

        let config = PortalConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9999");
        assert!(config.server.expose_sessions);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = PortalConfig::load(Some(Path::new("/nonexistent/aicp.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }
}
