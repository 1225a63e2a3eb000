//! Domain errors for the LIFF auth guard.

use liff_auth_sdk::ResolverError;

/// Errors that cross the guard boundary.
///
/// Only infrastructure failures are represented here: a rejected or expired
/// token, or an unknown user, is the normal unauthenticated outcome.
#[derive(thiserror::Error, Debug)]
pub enum GuardError {
    #[error("identity verification unavailable: {0}")]
    Unavailable(String),

    #[error("user store unavailable: {0}")]
    Store(String),

    #[error("session token error: {0}")]
    Session(#[from] SessionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResolverError> for GuardError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::StoreUnavailable(msg) => Self::Store(msg),
            ResolverError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl GuardError {
    /// Whether the host should answer with a "service unavailable" status.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Store(_))
    }
}

/// Errors from issuing or decoding application session tokens.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token expired")]
    Expired,

    #[error("invalid session token: {0}")]
    Invalid(String),

    #[error("failed to issue session token: {0}")]
    Encode(String),

    #[error("session tokens are not configured")]
    Disabled,
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(e.to_string()),
        }
    }
}
