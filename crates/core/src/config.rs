//! Client configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `KUTEERA__*` environment variables.

use crate::error::CoreResult;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KuteeraConfig {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Session lifecycle settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Persistent storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Site origin, e.g. `https://kuteerakitchen.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Prefix under which the backend API is proxied
    #[serde(default = "default_backend_prefix")]
    pub backend_prefix: String,
    /// Request timeout in seconds. Unset means requests never time out.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// How the customer guard treats an identity already held in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Validate the cached identity's role locally without a network call
    #[default]
    TrustCached,
    /// Fetch `/auth/me` on every check, like the admin guard
    AlwaysRevalidate,
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long before expiry the warning fires
    #[serde(default = "default_warning_lead")]
    pub warning_lead_secs: u64,
    /// Customer guard identity policy
    #[serde(default)]
    pub customer_identity: IdentityPolicy,
}

/// Persistent storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Session file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write logs to a file in the data directory
    #[serde(default = "default_true")]
    pub file: bool,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_backend_prefix() -> String {
    "/api/backend".to_string()
}

fn default_user_agent() -> String {
    concat!("kuteera-client/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_warning_lead() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            backend_prefix: default_backend_prefix(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warning_lead_secs: default_warning_lead(),
            customer_identity: IdentityPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_true(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl SessionConfig {
    pub const fn warning_lead(&self) -> Duration {
        Duration::from_secs(self.warning_lead_secs)
    }
}

impl StorageConfig {
    /// Resolved session file path.
    ///
    /// An explicit `path` wins, then `session.json` in `data_dir`, then the
    /// platform data directory.
    pub fn resolve_path(&self, data_dir: Option<&Path>) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            data_dir.map_or_else(
                || {
                    dirs::data_dir()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join("kuteera")
                        .join("session.json")
                },
                |dir| dir.join("session.json"),
            )
        })
    }
}

impl KuteeraConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value fails to parse
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        } else if Path::new("kuteera.toml").exists() {
            builder = builder.add_source(File::with_name("kuteera.toml").required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("KUTEERA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KuteeraConfig::default();
        assert_eq!(config.api.backend_prefix, "/api/backend");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.session.warning_lead(), Duration::from_secs(120));
        assert_eq!(config.session.customer_identity, IdentityPolicy::TrustCached);
        assert!(config.storage.resolve_path(None).ends_with("kuteera/session.json"));
    }

    #[test]
    fn test_session_path_resolution() {
        let mut storage = StorageConfig::default();
        assert_eq!(
            storage.resolve_path(Some(Path::new("/tmp/kuteera-state"))),
            PathBuf::from("/tmp/kuteera-state/session.json")
        );

        storage.path = Some(PathBuf::from("/srv/kuteera/session.json"));
        assert_eq!(
            storage.resolve_path(Some(Path::new("/tmp/kuteera-state"))),
            PathBuf::from("/srv/kuteera/session.json")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kuteera.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://kuteerakitchen.com"
timeout_secs = 15

[session]
warning_lead_secs = 60
customer_identity = "always_revalidate"
"#,
        )
        .unwrap();

        let config = KuteeraConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://kuteerakitchen.com");
        assert_eq!(config.api.backend_prefix, "/api/backend");
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.session.warning_lead_secs, 60);
        assert_eq!(
            config.session.customer_identity,
            IdentityPolicy::AlwaysRevalidate
        );
        assert_eq!(config.logging.level, "info");
    }
}
