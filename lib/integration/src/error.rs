//! Error types for the integration crate.
//!
//! Errors are carried as rootcause reports:
//! - `CalendarError`: Errors from calendar backend operations
//! - `CredentialError`: Errors obtaining an access token

use std::fmt;

/// Errors from calendar backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Connection to the service failed.
    ConnectionFailed { reason: String },
    /// The service rejected our credentials.
    AuthenticationFailed { reason: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The request was rejected as invalid.
    InvalidParameters { operation: String, reason: String },
    /// The event does not exist.
    NotFound { event_id: String },
    /// Unexpected status or payload.
    ProtocolError { reason: String },
    /// Timeout waiting for response.
    Timeout,
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => {
                write!(f, "connection failed: {reason}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "authentication failed: {reason}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidParameters { operation, reason } => {
                write!(f, "invalid parameters for '{operation}': {reason}")
            }
            Self::NotFound { event_id } => {
                write!(f, "event not found: {event_id}")
            }
            Self::ProtocolError { reason } => {
                write!(f, "protocol error: {reason}")
            }
            Self::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for CalendarError {}

/// Errors obtaining an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// A required credential field is empty.
    Missing { field: &'static str },
    /// A configured URL is invalid.
    InvalidUrl { reason: String },
    /// The token endpoint refused the refresh.
    RefreshFailed { reason: String },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => {
                write!(f, "credential field '{field}' is empty")
            }
            Self::InvalidUrl { reason } => {
                write!(f, "invalid token URL: {reason}")
            }
            Self::RefreshFailed { reason } => {
                write!(f, "token refresh failed: {reason}")
            }
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<CredentialError> for CalendarError {
    fn from(err: CredentialError) -> Self {
        Self::AuthenticationFailed {
            reason: err.to_string(),
        }
    }
}
