//! Error types for the core library.

use thiserror::Error;

/// Slack error codes that mean "no such user" rather than a failed call.
const NOT_FOUND_CODES: &[&str] = &["user_not_found", "users_not_found"];

/// Core library error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration-related error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A path resolution or validation error.
    #[error("path error: {0}")]
    Path(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// No token is configured.
    #[error("no token configured - run 'slackasme auth login' or set SLACK_USER_TOKEN")]
    TokenNotFound,

    /// The HTTP transport failed (network, timeout, non-success status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The Slack Web API answered with `ok: false`.
    #[error("Slack API error in {method}: {code}")]
    Slack {
        /// API method that was called, e.g. `users.info`.
        method: String,
        /// Error code from the response body, e.g. `user_not_found`.
        code: String,
    },

    /// User input failed validation.
    #[error("{0}")]
    Validation(String),

    /// A generic error for other cases.
    #[error("error: {0}")]
    Other(String),
}

impl CoreError {
    /// Returns the Slack error code if this is an API-level error.
    #[must_use]
    pub fn slack_code(&self) -> Option<&str> {
        match self {
            Self::Slack { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether this error is Slack reporting an unknown user ID or email.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.slack_code()
            .is_some_and(|code| NOT_FOUND_CODES.contains(&code))
    }
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;
