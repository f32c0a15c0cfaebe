//! Configuration for the console client.
//!
//! Settings come from environment variables first (`STRATUS_API_URL`,
//! `STRATUS_TOKEN`), falling back to a YAML config file in the platform
//! config directory.

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

/// Production API endpoint, used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://api.stratus.cloud";

/// Bearer token for the support API.
///
/// The token is an explicit parameter to every operation that talks to the
/// backend; nothing in this crate holds it as ambient state. The secret is
/// redacted from `Debug` output.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&"[REDACTED]").finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the console API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Bearer token for the support API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Config {
    /// Get the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("cloud", "stratus", "stratus").map(|d| d.config_dir().join("config.yaml"))
    }

    /// Load configuration from file, or return default if not found.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Config::default());
        };
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            ConsoleError::Config("could not determine a config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Resolve the API base URL: environment variable, then config file,
    /// then the production default.
    pub fn api_url(&self) -> String {
        if let Ok(url) = env::var("STRATUS_API_URL") {
            if !url.is_empty() {
                return url;
            }
        }

        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Resolve the bearer token from the environment or the config file.
    pub fn auth_token(&self) -> Option<AuthToken> {
        if let Ok(token) = env::var("STRATUS_TOKEN") {
            if !token.is_empty() {
                return Some(AuthToken::new(token));
            }
        }

        self.token.clone().map(AuthToken::new)
    }
}
