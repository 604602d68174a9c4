//! Runtime configuration.
//!
//! Server settings are loaded once at startup. The API key is different: it is
//! read through an [`ApiKeyProvider`] on every request so a missing secret is
//! detected per call instead of being frozen into the process at boot.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOGO_PATH: &str = "logo.png";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a valid port number, got '{0}'")]
    InvalidPort(String),
}

/// Source of the shared API secret.
pub trait ApiKeyProvider {
    /// Current expected key, or `None` when the server has none configured.
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvApiKeyProvider {
    var: String,
}

impl EnvApiKeyProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvApiKeyProvider {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_ENV)
    }
}

impl ApiKeyProvider for EnvApiKeyProvider {
    fn api_key(&self) -> Option<String> {
        env::var(&self.var).ok().filter(|key| !key.is_empty())
    }
}

/// Fixed key, mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticApiKeyProvider(Option<String>);

impl StaticApiKeyProvider {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn unset() -> Self {
        Self(None)
    }
}

impl ApiKeyProvider for StaticApiKeyProvider {
    fn api_key(&self) -> Option<String> {
        self.0.clone().filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub output_dir: PathBuf,
    pub logo_path: PathBuf,
    /// Name of the environment variable that holds the API key.
    pub api_key_env: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            logo_path: PathBuf::from(DEFAULT_LOGO_PATH),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment. `.env` is loaded by the
    /// caller before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };

        let cors_allowed_origins = non_empty("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port,
            output_dir: non_empty("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            logo_path: non_empty("LOGO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.logo_path),
            api_key_env: non_empty("API_KEY_ENV").unwrap_or(defaults.api_key_env),
            cors_allowed_origins,
        })
    }

    pub fn api_key_provider(&self) -> EnvApiKeyProvider {
        EnvApiKeyProvider::new(self.api_key_env.clone())
    }
}
