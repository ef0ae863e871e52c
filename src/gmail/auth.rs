//! OAuth session acquisition for the Gmail API
//!
//! The mail client only ever sees a [`Session`]: an immutable bearer token
//! handed out by a [`SessionSource`]. [`Authenticator`] is the OAuth-backed
//! source and handles:
//! - Loading client secrets
//! - Interactive browser-based consent
//! - Token storage and refresh

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AuthError, DraftMailError, Result};

/// Tokens this close to expiry (seconds) are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 300;

/// An authenticated handle for the mail provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    /// Expiry timestamp (Unix seconds)
    expires_at: Option<i64>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Whether the session is expired or about to expire at `now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at
            .map(|expiry| expiry - now < EXPIRY_MARGIN_SECS)
            .unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Something that can hand out a ready-to-use [`Session`]
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Acquire a session, refreshing credentials if needed
    async fn acquire(&self) -> Result<Session>;

    /// Called after the provider rejected a session so the next
    /// [`acquire`](SessionSource::acquire) does not hand out the same token.
    async fn invalidate(&self) {}
}

/// A fixed token, for tools and tests that already hold one
#[derive(Debug, Clone)]
pub struct StaticSession(pub Session);

#[async_trait]
impl SessionSource for StaticSession {
    async fn acquire(&self) -> Result<Session> {
        Ok(self.0.clone())
    }
}

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Auth URI
    pub auth_uri: String,

    /// Token URI
    pub token_uri: String,
}

/// Client secrets file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

/// Stored token file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,
}

impl StoredCredentials {
    fn session(&self) -> Session {
        Session::new(self.access_token.clone(), self.expiry_date)
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

/// OAuth authenticator
pub struct Authenticator {
    /// Configuration
    config: Config,

    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    keys: OAuthKeys,

    /// Current credentials (tokens)
    credentials: Arc<RwLock<Option<StoredCredentials>>>,
}

impl Authenticator {
    /// Create a new authenticator
    pub async fn new(config: Config) -> Result<Self> {
        config.find_and_copy_oauth_keys()?;
        Self::with_keys_file(config).await
    }

    /// Create an authenticator without looking for client secrets in the
    /// working directory
    pub async fn with_keys_file(config: Config) -> Result<Self> {
        let keys = Self::load_oauth_keys(&config.oauth_path)?;

        let auth = Self {
            config,
            http_client: reqwest::Client::new(),
            keys,
            credentials: Arc::new(RwLock::new(None)),
        };

        if auth.config.token_exists() {
            match auth.load_credentials().await {
                Ok(creds) => *auth.credentials.write().await = Some(creds),
                Err(e) => tracing::warn!(
                    "Ignoring unreadable token file {}: {}",
                    auth.config.token_path.display(),
                    e
                ),
            }
        }

        Ok(auth)
    }

    /// Load client secrets from file
    fn load_oauth_keys(path: &Path) -> Result<OAuthKeys> {
        if !path.exists() {
            return Err(DraftMailError::Auth(AuthError::KeysFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile = serde_json::from_str(&content)?;

        keys_file
            .installed
            .ok_or(DraftMailError::Auth(AuthError::InvalidKeysFormat))
    }

    /// Load stored credentials from file
    async fn load_credentials(&self) -> Result<StoredCredentials> {
        let content = tokio::fs::read_to_string(&self.config.token_path).await?;
        let creds: StoredCredentials = serde_json::from_str(&content)?;
        Ok(creds)
    }

    /// Save credentials to file
    async fn save_credentials(&self, credentials: &StoredCredentials) -> Result<()> {
        let content = serde_json::to_string_pretty(credentials)?;
        tokio::fs::write(&self.config.token_path, content).await?;
        Ok(())
    }

    /// Check if we have credentials
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Refresh the access token using the refresh token
    async fn refresh(&self) -> Result<StoredCredentials> {
        let refresh_token = self
            .credentials
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .ok_or_else(|| {
                DraftMailError::Auth(AuthError::TokenRefreshFailed {
                    message: "No refresh token available".to_string(),
                })
            })?;

        tracing::debug!("Refreshing access token");

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DraftMailError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let new_credentials = StoredCredentials {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            token_type: token_response.token_type,
            expiry_date: token_response.expires_in.map(|e| unix_now() + e),
            scope: token_response.scope,
        };

        self.save_credentials(&new_credentials).await?;
        *self.credentials.write().await = Some(new_credentials.clone());

        Ok(new_credentials)
    }

    /// Generate the authorization URL
    pub fn generate_auth_url(&self) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(&self.config.oauth_callback_url),
            urlencoding::encode(&scopes)
        )
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<StoredCredentials> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.oauth_callback_url.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DraftMailError::Auth(AuthError::TokenExchangeFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let credentials = StoredCredentials {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            token_type: token_response.token_type,
            expiry_date: token_response.expires_in.map(|e| unix_now() + e),
            scope: token_response.scope,
        };

        self.save_credentials(&credentials).await?;
        *self.credentials.write().await = Some(credentials.clone());

        Ok(credentials)
    }

    /// Run interactive consent flow with a local HTTP callback server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use tokio::sync::oneshot;

        let auth_url = self.generate_auth_url();
        eprintln!("\nPlease visit this URL to authenticate:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            tracing::warn!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            let Some(code) = params.get("code") else {
                return Html("<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>");
            };
            if let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(code.clone());
            }
            Html("<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>")
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!(
            "Waiting for authentication callback on port {}",
            self.config.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    return Err(DraftMailError::Auth(AuthError::CallbackError {
                        message: e.to_string(),
                    }));
                }
            }
            code = rx => {
                let code = code.map_err(|_| DraftMailError::Auth(AuthError::NoAuthCode))?;
                tracing::info!("Received authorization code, exchanging for tokens");
                self.exchange_code(&code).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SessionSource for Authenticator {
    async fn acquire(&self) -> Result<Session> {
        let current = self.credentials.read().await.clone();

        match current {
            Some(creds) if !creds.session().is_expired() => Ok(creds.session()),
            Some(_) => Ok(self.refresh().await?.session()),
            None => Err(DraftMailError::Auth(AuthError::CredentialsNotFound {
                path: self.config.token_path.display().to_string(),
            })),
        }
    }

    async fn invalidate(&self) {
        // Force a refresh on the next acquire
        if let Some(creds) = self.credentials.write().await.as_mut() {
            creds.expiry_date = Some(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS_JSON: &str = r#"{
        "installed": {
            "client_id": "test-client-id",
            "client_secret": "test-secret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::from_dir(dir);
        config.oauth_path = dir.join("credentials.json");
        config.token_path = dir.join("token.json");
        config
    }

    #[test]
    fn test_oauth_keys_deserialize() {
        let keys_file: OAuthKeysFile = serde_json::from_str(KEYS_JSON).unwrap();
        assert!(keys_file.installed.is_some());
        assert_eq!(keys_file.installed.unwrap().client_id, "test-client-id");
    }

    #[test]
    fn test_web_keys_deserialize() {
        let json = KEYS_JSON.replace("installed", "web");
        let keys_file: OAuthKeysFile = serde_json::from_str(&json).unwrap();
        assert!(keys_file.installed.is_some());
    }

    #[test]
    fn test_session_expiry() {
        let session = Session::new("tok", Some(1_000));
        assert!(session.is_expired_at(1_000));
        assert!(session.is_expired_at(800));
        assert!(!session.is_expired_at(600));
        assert!(!Session::new("tok", None).is_expired_at(i64::MAX));
    }

    #[tokio::test]
    async fn test_missing_keys_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Authenticator::with_keys_file(config_in(dir.path())).await;
        assert!(matches!(
            result,
            Err(DraftMailError::Auth(AuthError::KeysFileNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_acquire_from_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.oauth_path, KEYS_JSON).unwrap();

        let creds = StoredCredentials {
            access_token: "stored-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            token_type: "Bearer".to_string(),
            expiry_date: Some(unix_now() + 3600),
            scope: String::new(),
        };
        std::fs::write(&config.token_path, serde_json::to_string(&creds).unwrap()).unwrap();

        let auth = Authenticator::with_keys_file(config).await.unwrap();
        assert!(auth.is_authenticated().await);
        let session = auth.acquire().await.unwrap();
        assert_eq!(session.access_token(), "stored-token");
    }

    #[tokio::test]
    async fn test_acquire_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.oauth_path, KEYS_JSON).unwrap();

        let auth = Authenticator::with_keys_file(config).await.unwrap();
        assert!(!auth.is_authenticated().await);
        assert!(matches!(
            auth.acquire().await,
            Err(DraftMailError::Auth(AuthError::CredentialsNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_auth_url_contains_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.oauth_path, KEYS_JSON).unwrap();

        let auth = Authenticator::with_keys_file(config).await.unwrap();
        let url = auth.generate_auth_url();
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("gmail.compose"));
        assert!(url.contains("access_type=offline"));
    }
}
