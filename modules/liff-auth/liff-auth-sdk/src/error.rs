//! Error types shared by verifier, resolver and store implementations.

use thiserror::Error;

/// Errors returned by an [`IdentityVerifier`](crate::IdentityVerifier).
///
/// `Invalid` and `Expired` are normal "not authenticated" outcomes, while
/// `Unreachable` is an infrastructure failure the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No token was supplied.
    #[error("empty token")]
    EmptyToken,

    /// The provider rejected the token signature or format.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// The token is past its expiry.
    #[error("token expired")]
    Expired,

    /// The provider could not be reached or did not answer in time.
    #[error("verification service unreachable: {0}")]
    Unreachable(String),
}

impl VerificationError {
    /// Whether this error is transient and the call may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Errors returned by a [`UserStore`](crate::UserStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),

    #[error("user store error: {0}")]
    Internal(String),
}

/// Errors returned by a [`UserResolver`](crate::UserResolver).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    #[error("user store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ResolverError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}
