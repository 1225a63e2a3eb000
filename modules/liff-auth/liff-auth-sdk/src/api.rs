//! Capability traits consumed by the auth guard.
//!
//! All three traits are shared across concurrent requests behind an `Arc`,
//! so implementations must be stateless or internally synchronized.

use async_trait::async_trait;

use crate::error::{ResolverError, StoreError, VerificationError};
use crate::models::{Credentials, ExternalIdentity, User, UserId};

/// Verifies a bearer token against an external identity provider.
///
/// ```ignore
/// let identity = verifier.verify(token).await?;
/// let user = resolver.find_by_external_id(&identity.external_id).await?;
/// ```
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a raw bearer token (without the scheme prefix).
    ///
    /// # Errors
    ///
    /// - `EmptyToken` if `token` is empty (caller error)
    /// - `Invalid` if the provider rejected the signature or format
    /// - `Expired` if the token is past its expiry
    /// - `Unreachable` if the provider could not be reached in time
    async fn verify(&self, token: &str) -> Result<ExternalIdentity, VerificationError>;
}

/// Maps identities and credential sets to application users.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Find the user whose external-id field equals `external_id`.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the backing store failed. A missing user is `Ok(None)`.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, ResolverError>;

    /// Find a user by primary key.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the backing store failed. A missing user is `Ok(None)`.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, ResolverError>;

    /// Find a user matching every identifier in `credentials`.
    ///
    /// The password is never used as a lookup key.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the backing store failed. A missing user is `Ok(None)`.
    async fn find_by_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<User>, ResolverError>;

    /// Check the password in `credentials` against the stored hash of `user`.
    fn validate_credentials(&self, user: &User, credentials: &Credentials) -> bool;
}

/// Minimal persistence contract.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Return the first record whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the store cannot be reached.
    async fn find_one(&self, field: &str, value: &str) -> Result<Option<User>, StoreError>;

    /// Return the record with primary key `id`.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the store cannot be reached.
    async fn find_by_key(&self, id: UserId) -> Result<Option<User>, StoreError>;
}
