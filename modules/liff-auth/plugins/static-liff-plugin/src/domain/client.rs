//! Client implementation for the static LIFF auth plugin.
//!
//! Implements `IdentityVerifier` using the domain service.

use async_trait::async_trait;
use liff_auth_sdk::{ExternalIdentity, IdentityVerifier, VerificationError};

use super::service::Service;

#[async_trait]
impl IdentityVerifier for Service {
    async fn verify(&self, token: &str) -> Result<ExternalIdentity, VerificationError> {
        let result = Service::verify(self, token);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "static verifier rejected token");
        }
        result
    }
}
