//! Configuration management for the Draft Email MCP Server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, DraftMailError, Result};

/// File name of the OAuth client secrets downloaded from Google Cloud
pub const CLIENT_SECRETS_FILE: &str = "credentials.json";

/// File name of the stored OAuth token
pub const TOKEN_FILE: &str = "token.json";

/// Configuration for the Draft Email MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to OAuth client secrets
    pub oauth_path: PathBuf,

    /// Path to the stored token (access/refresh tokens)
    pub token_path: PathBuf,

    /// OAuth callback URL
    pub oauth_callback_url: String,

    /// OAuth callback port
    pub oauth_callback_port: u16,

    /// Gmail API base URL
    pub api_base_url: String,

    /// Gmail API scopes
    pub scopes: Vec<String>,
}

impl Config {
    /// Create a new configuration rooted at `~/.draft-email-mcp`
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self::from_dir(config_dir))
    }

    /// Create a configuration rooted at an explicit directory.
    ///
    /// Environment overrides still apply.
    pub fn from_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();

        let oauth_path = std::env::var("GOOGLE_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join(CLIENT_SECRETS_FILE));

        let token_path = std::env::var("GOOGLE_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join(TOKEN_FILE));

        let oauth_callback_port = std::env::var("GMAIL_OAUTH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let oauth_callback_url = format!("http://localhost:{}/oauth2callback", oauth_callback_port);

        let api_base_url = std::env::var("GMAIL_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| gmail::API_BASE_URL.to_string());

        Self {
            config_dir,
            oauth_path,
            token_path,
            oauth_callback_url,
            oauth_callback_port,
            api_base_url,
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.compose".to_string(),
            ],
        }
    }

    /// Get the configuration directory, creating it if necessary
    fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| {
                DraftMailError::Config(ConfigError::DirNotFound {
                    path: "~".to_string(),
                })
            })?
            .join(".draft-email-mcp");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|_| {
                DraftMailError::Config(ConfigError::DirCreationFailed {
                    path: config_dir.display().to_string(),
                })
            })?;
        }

        Ok(config_dir)
    }

    /// Check if the OAuth client secrets file exists
    pub fn oauth_keys_exist(&self) -> bool {
        self.oauth_path.exists()
    }

    /// Check if a stored token exists
    pub fn token_exists(&self) -> bool {
        self.token_path.exists()
    }

    /// Copy client secrets from `dir` into place if none are configured yet.
    ///
    /// Returns whether a file was copied.
    pub fn adopt_oauth_keys_from(&self, dir: &Path) -> Result<bool> {
        let local_oauth = dir.join(CLIENT_SECRETS_FILE);

        if local_oauth.exists() && !self.oauth_keys_exist() {
            std::fs::copy(&local_oauth, &self.oauth_path)?;
            tracing::info!(
                "Copied {} into {}",
                local_oauth.display(),
                self.oauth_path.display()
            );
            return Ok(true);
        }

        Ok(false)
    }

    /// Try to find client secrets in the current directory
    pub fn find_and_copy_oauth_keys(&self) -> Result<bool> {
        let cwd = std::env::current_dir()?;
        self.adopt_oauth_keys_from(&cwd)
    }
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// System label IDs
    pub mod labels {
        pub const INBOX: &str = "INBOX";
        pub const UNREAD: &str = "UNREAD";
    }
}
