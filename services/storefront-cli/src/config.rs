//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Tokens come only from STOREFRONT_TOKEN / STOREFRONT_REFRESH_TOKEN and
//! are never read from the TOML file.

use common::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ACCESS_TOKEN_ENV: &str = "STOREFRONT_TOKEN";
pub const REFRESH_TOKEN_ENV: &str = "STOREFRONT_REFRESH_TOKEN";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Storefront API settings
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Token lifetimes and the profile cache
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,
    /// JSON file holding the cached profile
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    #[serde(default = "default_cache_key")]
    pub cache_key: String,
    #[serde(skip)]
    pub access_token: Option<SecretString>,
    #[serde(skip)]
    pub refresh_token: Option<SecretString>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            cache_file: default_cache_file(),
            cache_key: default_cache_key(),
            access_token: None,
            refresh_token: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_access_ttl() -> u64 {
    storefront_auth::DEFAULT_ACCESS_TOKEN_TTL_SECS
}

fn default_refresh_ttl() -> u64 {
    storefront_auth::DEFAULT_REFRESH_TOKEN_TTL_SECS
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("storefront-session.json")
}

fn default_cache_key() -> String {
    storefront_auth::USER_CACHE_KEY.to_owned()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        config.session.access_token = token_from_env(ACCESS_TOKEN_ENV);
        config.session.refresh_token = token_from_env(REFRESH_TOKEN_ENV);

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(common::Error::InvalidField {
                field: "backend.base_url",
                reason: format!(
                    "must start with http:// or https://, got: {}",
                    self.backend.base_url
                ),
            });
        }

        if self.backend.timeout_secs == 0 {
            return Err(common::Error::InvalidField {
                field: "backend.timeout_secs",
                reason: "must be greater than 0".into(),
            });
        }

        if self.session.access_token_ttl_secs == 0 {
            return Err(common::Error::InvalidField {
                field: "session.access_token_ttl_secs",
                reason: "must be greater than 0".into(),
            });
        }

        if self.session.refresh_token_ttl_secs == 0 {
            return Err(common::Error::InvalidField {
                field: "session.refresh_token_ttl_secs",
                reason: "must be greater than 0".into(),
            });
        }

        if self.session.cache_key.trim().is_empty() {
            return Err(common::Error::Config("session.cache_key must not be empty".into()));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("storefront.toml")
    }
}

fn token_from_env(key: &str) -> Option<SecretString> {
    std::env::var(key)
        .ok()
        .map(SecretString::from)
        .filter(|t| !t.is_blank())
}
