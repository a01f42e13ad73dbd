//! # Configuration
//!
//! Layered server configuration. Later layers win:
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config audioly.toml`)
//! 3. `AUDIOLY_*` environment variables
//! 4. Command line flags
//!
//! ## Example file
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! database = "/var/lib/audioly/audioly.redb"
//! media_dir = "/var/lib/audioly/media"
//! media_base_url = "https://audioly.example/media"
//! tokens_file = "/etc/audioly/tokens.toml"
//! rate_limit = 200
//! ```

use audioly_core::SocialError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database file.
    #[default]
    Redb,
    /// Volatile, for development and tests.
    Memory,
}

impl FromStr for Backend {
    type Err = SocialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Self::Redb),
            "memory" => Ok(Self::Memory),
            other => Err(SocialError::InvalidInput(format!(
                "unknown backend '{}' (expected 'redb' or 'memory')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path to the redb database file.
    pub database: PathBuf,
    pub backend: Backend,
    /// Root directory of the local object store.
    pub media_dir: PathBuf,
    /// Public base URL for stored media. Derived from host and port if unset.
    pub media_base_url: Option<String>,
    /// TOML file mapping bearer tokens to user ids.
    pub tokens_file: Option<PathBuf>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Comma-separated allowed origins, or "*". Localhost only when unset.
    pub cors_origins: Option<String>,
    /// How long a request may wait for the store lock.
    pub store_timeout_ms: u64,
    /// Request body limit (uploads carry base64 payloads).
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("audioly.redb"),
            backend: Backend::Redb,
            media_dir: PathBuf::from("media"),
            media_base_url: None,
            tokens_file: None,
            rate_limit: 100,
            cors_origins: None,
            store_timeout_ms: 5_000,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, SocialError> {
    raw.trim()
        .parse()
        .map_err(|_| SocialError::InvalidInput(format!("{} has an invalid value: '{}'", key, raw)))
}

impl Config {
    /// Parse a TOML document on top of the defaults.
    pub fn from_toml(text: &str) -> Result<Self, SocialError> {
        toml::from_str(text).map_err(|e| SocialError::InvalidInput(format!("config: {}", e)))
    }

    /// Read a TOML file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self, SocialError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SocialError::InvalidInput(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SocialError::InvalidInput(format!(
                "config '{}' exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            SocialError::InvalidInput(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SocialError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `AUDIOLY_*` overrides read through `lookup`.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SocialError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AUDIOLY_HOST") {
            self.host = v;
        }
        if let Some(v) = get("AUDIOLY_PORT") {
            self.port = parse_env("AUDIOLY_PORT", &v)?;
        }
        if let Some(v) = get("AUDIOLY_DATABASE") {
            self.database = PathBuf::from(v);
        }
        if let Some(v) = get("AUDIOLY_BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = get("AUDIOLY_MEDIA_DIR") {
            self.media_dir = PathBuf::from(v);
        }
        if let Some(v) = get("AUDIOLY_MEDIA_BASE_URL") {
            self.media_base_url = Some(v);
        }
        if let Some(v) = get("AUDIOLY_TOKENS_FILE") {
            self.tokens_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("AUDIOLY_RATE_LIMIT") {
            self.rate_limit = parse_env("AUDIOLY_RATE_LIMIT", &v)?;
        }
        if let Some(v) = get("AUDIOLY_CORS_ORIGINS") {
            self.cors_origins = Some(v);
        }
        if let Some(v) = get("AUDIOLY_STORE_TIMEOUT_MS") {
            self.store_timeout_ms = parse_env("AUDIOLY_STORE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("AUDIOLY_MAX_BODY_BYTES") {
            self.max_body_bytes = parse_env("AUDIOLY_MAX_BODY_BYTES", &v)?;
        }
        Ok(())
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for media links, without a trailing slash.
    pub fn media_url(&self) -> String {
        match &self.media_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}/media", self.host, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Redb);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.media_url(), "http://127.0.0.1:8080/media");
    }

    #[test]
    fn file_overrides_defaults_partially() {
        let config = Config::from_toml("port = 9000\nbackend = \"memory\"\n").expect("parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(Config::from_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::from_toml("port = 9000").expect("parse");
        let env: HashMap<&str, &str> = [
            ("AUDIOLY_PORT", "7000"),
            ("AUDIOLY_BACKEND", "Memory"),
            ("AUDIOLY_MEDIA_BASE_URL", "https://cdn.test/media/"),
            ("AUDIOLY_HOST", "   "),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_from(|key| env.get(key).map(|v| (*v).to_string()))
            .expect("apply");
        assert_eq!(config.port, 7000);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.media_url(), "https://cdn.test/media");
    }

    #[test]
    fn invalid_env_value_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_env_from(|key| {
            (key == "AUDIOLY_RATE_LIMIT").then(|| "fast".to_string())
        });
        assert!(matches!(result, Err(SocialError::InvalidInput(_))));
    }
}
