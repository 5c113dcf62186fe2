//! Error types for the integrity client

use thiserror::Error;

use crate::batch::InvalidTransition;

/// Client-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Client error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No response was received (connect failure, timeout, broken body)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The service answered with a failure status, an error payload, or a
    /// body that could not be decoded
    #[error("Server error: {0}")]
    Server(String),

    /// A submission is already outstanding on this surface
    #[error("Another {0} is already in flight")]
    Busy(&'static str),

    #[error("Batch must contain at least one file")]
    EmptyBatch,

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Invalid state transition: {0}")]
    State(#[from] InvalidTransition),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Credential-related failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No live credential: never logged in, logged out, or invalidated
    #[error("not logged in")]
    NoSession,

    /// An authenticated call was refused; the credential is no longer usable
    #[error("credential rejected: {0}")]
    Rejected(String),

    #[error("invalid username or password")]
    BadCredentials,

    #[error("account is inactive")]
    AccountInactive,

    /// Login could not reach the service or got no usable answer
    #[error("service unavailable: {0}")]
    Unreachable(String),
}

impl Error {
    /// Whether this error fails an in-flight batch as a whole.
    ///
    /// Only failures that prevent any response from being reconciled qualify.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Auth(_) | Self::Server(_))
    }

    /// Whether the credential used for the call must be discarded
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Auth(AuthError::Rejected(_)))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Request URLs are dropped from the message; login carries the password in
/// its query string.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            Error::Server(format!("malformed response: {}", err))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_abort_classification() {
        assert!(Error::Transport("connection refused".into()).aborts_batch());
        assert!(Error::Auth(AuthError::NoSession).aborts_batch());
        assert!(!Error::Busy("batch upload").aborts_batch());
        assert!(!Error::EmptyBatch.aborts_batch());
    }

    #[test]
    fn test_rejection_detection() {
        assert!(Error::Auth(AuthError::Rejected("Token expired".into())).is_rejection());
        assert!(!Error::Auth(AuthError::BadCredentials).is_rejection());
        assert!(!Error::Transport("timeout".into()).is_rejection());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::Auth(AuthError::Rejected("Token expired".into())).to_string(),
            "Authentication error: credential rejected: Token expired"
        );
        assert_eq!(Error::Busy("verification").to_string(), "Another verification is already in flight");
    }
}
