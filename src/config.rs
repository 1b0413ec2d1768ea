//! Server configuration.
//!
//! Loaded from an optional YAML file; every field has a default so a bare
//! `todo-api` invocation works. The token secret can also come from the
//! `TODO_API_SECRET` environment variable, which wins over the file.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the configured token secret.
pub const SECRET_ENV_VAR: &str = "TODO_API_SECRET";

/// Fallback secret for local development only.
const DEV_SECRET: &str = "insecure-dev-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub bind: String,
    /// Listen port.
    pub port: u16,
    /// Database file path. Defaults to `~/.todo-api/todo.db`.
    pub database: Option<PathBuf>,
    /// HMAC secret for bearer tokens.
    pub token_secret: Option<String>,
    /// Token lifetime in hours.
    pub token_ttl_hours: i64,
    /// Reference UTC offset (hours) for calendar-date filters.
    pub utc_offset_hours: i32,
    /// Page size used when the listing request does not specify one.
    pub default_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            database: None,
            token_secret: None,
            token_ttl_hours: 2,
            utc_offset_hours: 0,
            default_page_size: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location `~/.todo-api/config.yaml` is used when present, otherwise
    /// the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read_file(path),
            None => {
                let default_path = config_dir().map(|d| d.join("config.yaml"));
                match default_path {
                    Some(p) if p.exists() => Self::read_file(&p),
                    _ => Ok(Self::default()),
                }
            }
        }
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Effective database path.
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("todo.db")
        })
    }

    /// Effective token secret: env var, then config, then a dev fallback
    /// that logs a warning.
    pub fn token_secret(&self) -> String {
        if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
            if !secret.is_empty() {
                return secret;
            }
        }
        if let Some(secret) = &self.token_secret {
            return secret.clone();
        }
        warn!(
            "no token secret configured; using an insecure development \
             default (set {} or token_secret in the config file)",
            SECRET_ENV_VAR
        );
        DEV_SECRET.to_string()
    }

    /// Reference offset for due-date filtering.
    pub fn reference_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".todo-api"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.reference_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_partial_yaml_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 9999\nutc_offset_hours: -3").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.reference_offset().local_minus_utc(), -3 * 3600);
        // Untouched fields keep their defaults
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.token_ttl_hours, 2);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        assert!(ServerConfig::load(Some(Path::new("/nonexistent/config.yaml"))).is_err());
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let config = ServerConfig {
            utc_offset_hours: 99,
            ..Default::default()
        };
        assert_eq!(config.reference_offset().local_minus_utc(), 0);
    }
}
