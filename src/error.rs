//! Error types for the Draft Email MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.
//! Every error maps onto one [`ErrorKind`], which is what the tool gateway and
//! its tests reason about.

use thiserror::Error;

/// Main error type for the Draft Email MCP Server
#[derive(Error, Debug)]
pub enum DraftMailError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Mail provider errors
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool invocation errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification of a [`DraftMailError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The invocation named a tool that is not registered
    UnknownTool,
    /// A required tool argument was absent
    MissingArgument,
    /// A tool argument was present but unusable
    InvalidArgument,
    /// A fetched email lacked a required header
    HeaderMissing,
    /// The mail provider (or its auth endpoint) failed
    Upstream,
    /// Local failure: filesystem, configuration, serialization
    Internal,
}

impl DraftMailError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DraftMailError::Tool(ToolError::UnknownTool { .. }) => ErrorKind::UnknownTool,
            DraftMailError::Tool(ToolError::MissingArgument { .. }) => ErrorKind::MissingArgument,
            DraftMailError::Tool(ToolError::InvalidArgument { .. }) => ErrorKind::InvalidArgument,
            DraftMailError::Mail(MailError::HeaderMissing { .. }) => ErrorKind::HeaderMissing,
            DraftMailError::Mail(_) | DraftMailError::Auth(_) | DraftMailError::Http(_) => {
                ErrorKind::Upstream
            }
            DraftMailError::Config(_) | DraftMailError::Io(_) | DraftMailError::Json(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth client secrets file not found: {path}")]
    KeysFileNotFound { path: String },

    #[error("Invalid OAuth client secrets format: expected 'installed' or 'web' credentials")]
    InvalidKeysFormat,

    #[error("Token file not found: {path}")]
    CredentialsNotFound { path: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },
}

/// Mail provider errors
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Message {message_id} has no {header} header")]
    HeaderMissing { message_id: String, header: String },

    #[error("Session rejected by provider ({status}); it will be re-acquired on the next call")]
    Unauthorized { status: u16 },

    #[error("API request failed: {message}")]
    RequestFailed { message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },
}

/// Tool invocation errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Missing required argument '{argument}' for tool {tool}")]
    MissingArgument { tool: String, argument: String },

    #[error("Invalid arguments for tool {tool}: {message}")]
    InvalidArgument { tool: String, message: String },
}

/// Result type alias for Draft Email MCP operations
pub type Result<T> = std::result::Result<T, DraftMailError>;
