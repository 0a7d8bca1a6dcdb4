//! Error taxonomy for backend calls
//!
//! Each capability fails with its own error type so that callers can apply
//! the right policy: transport failures during bootstrap are fatal until
//! retried, auth failures are shown verbatim, a missing profile row is an
//! expected condition, and other store failures are logged and absorbed.

use thiserror::Error;

/// PostgREST code for "a single row was requested but none matched"
pub const NOT_FOUND_CODE: &str = "PGRST116";

/// Error reported by a backend endpoint with HTTP status and message
///
/// # Examples
/// ```
/// use backend_client::error::ApiError;
///
/// let error = ApiError::new(406, "PGRST116", "JSON object requested, multiple (or no) rows returned");
/// assert_eq!(error.status(), 406);
/// assert!(error.is_not_found());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code (0 when the request never reached the server)
    status: u16,
    /// Backend error code (e.g. "PGRST116", "invalid_credentials")
    code: String,
    /// Human-readable error message
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the backend error code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this is the distinguished "no row" error
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND_CODE
    }

    /// Check if this is a network-related error
    pub fn is_network_error(&self) -> bool {
        matches!(self.status, 0 | 408 | 429 | 500 | 502 | 503 | 504)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} ({}): {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Failure to reach the backend or to read what it returned
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Request could not be sent or no response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an error status
    #[error("API error: {0}")]
    Api(ApiError),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Locally persisted session could not be read or written
    #[error("Session persistence error: {0}")]
    Persistence(String),
}

/// Result type for transport-level operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Authentication failure (sign-in, sign-up, OTP, sign-out)
///
/// The message is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthError {
    /// Message reported by the Auth Service
    pub message: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
}

impl AuthError {
    /// Create an auth error without an HTTP status
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Create an auth error carrying the response status
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Api(api) => AuthError::with_status(api.status(), api.message()),
            other => AuthError::new(other.to_string()),
        }
    }
}

/// Profile Store failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No row matched the requested user id
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// Backend rejected the query or insert
    #[error("Store error ({code}): {message}")]
    Backend {
        /// Backend error code
        code: String,
        /// Backend message
        message: String,
    },

    /// Request could not be completed
    #[error("Store transport error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Whether this is the expected "no profile yet" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Message suitable for an inline alert
    pub fn message(&self) -> &str {
        match self {
            StoreError::NotFound(message)
            | StoreError::Backend { message, .. }
            | StoreError::Transport(message) => message,
        }
    }
}

impl From<TransportError> for StoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Api(api) if api.is_not_found() => {
                StoreError::NotFound(api.message().to_string())
            }
            TransportError::Api(api) => StoreError::Backend {
                code: api.code().to_string(),
                message: api.message().to_string(),
            },
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// Invalid or missing backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("Missing required environment variables: {0}")]
    Missing(String),

    /// A value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    Invalid {
        /// Variable name
        key: String,
        /// Offending value
        value: String,
    },
}
