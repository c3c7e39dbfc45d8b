//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LARDER_*)
//! 2. TOML config file (if LARDER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LARDER_*)
/// 2. TOML config file (if LARDER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployed version string; names the current cache generation.
    ///
    /// Bumping it is the sole trigger for generational replacement.
    /// Set via LARDER_VERSION environment variable. Required.
    #[serde(default)]
    pub version: String,

    /// Upstream origin relative assets resolve against, e.g.
    /// `http://localhost:3000`.
    ///
    /// Set via LARDER_UPSTREAM environment variable. Required.
    #[serde(default)]
    pub upstream: String,

    /// Address the gateway listens on.
    ///
    /// Set via LARDER_LISTEN environment variable.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Ordered list of request targets precached on install.
    ///
    /// Relative paths resolve against `upstream`; absolute http(s) URLs
    /// are taken as-is.
    #[serde(default)]
    pub manifest: Vec<String>,

    /// Optional manifest target served when a cache miss cannot reach the
    /// network. Must itself be listed in the manifest.
    #[serde(default)]
    pub offline_fallback: Option<String>,

    /// Extra origins the gateway may fetch from, beyond the upstream and
    /// the manifest entries' origins.
    ///
    /// Set via LARDER_ALLOW_ORIGINS environment variable (comma-separated).
    #[serde(default)]
    pub allow_origins: Vec<String>,

    /// Path to the SQLite cache database.
    ///
    /// Set via LARDER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for upstream requests.
    ///
    /// Set via LARDER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via LARDER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via LARDER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow on upstream fetches.
    ///
    /// Set via LARDER_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_listen() -> String {
    "127.0.0.1:8399".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./larder-cache.sqlite")
}

fn default_user_agent() -> String {
    "larder/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            upstream: String::new(),
            listen: default_listen(),
            manifest: Vec::new(),
            offline_fallback: None,
            allow_origins: Vec::new(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed upstream origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `upstream` is not an http(s)
    /// origin URL.
    pub fn upstream_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.upstream)
            .map_err(|e| ConfigError::Invalid { field: "upstream".into(), reason: e.to_string() })?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::Invalid {
                    field: "upstream".into(),
                    reason: format!("unsupported scheme: {scheme}"),
                });
            }
        }

        if url.host_str().is_none() {
            return Err(ConfigError::Invalid { field: "upstream".into(), reason: "missing host".into() });
        }

        Ok(url)
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `listen` is not a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::Invalid { field: "listen".into(), reason: "not a socket address".into() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LARDER_`
    /// 2. TOML file from `LARDER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LARDER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LARDER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
