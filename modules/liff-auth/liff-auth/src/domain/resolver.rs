//! Store-backed user resolver.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use liff_auth_sdk::{Credentials, ResolverError, User, UserId, UserResolver, UserStore};
use secrecy::ExposeSecret;

use crate::config::FieldsConfig;

/// Resolves users through a [`UserStore`] using the configured field names.
pub struct StoreUserResolver {
    store: Arc<dyn UserStore>,
    fields: FieldsConfig,
}

impl StoreUserResolver {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, fields: FieldsConfig) -> Self {
        Self { store, fields }
    }

    #[must_use]
    pub fn fields(&self) -> &FieldsConfig {
        &self.fields
    }
}

#[async_trait]
impl UserResolver for StoreUserResolver {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, ResolverError> {
        Ok(self.store.find_one(&self.fields.liff_id, external_id).await?)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, ResolverError> {
        Ok(self.store.find_by_key(id).await?)
    }

    async fn find_by_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<User>, ResolverError> {
        let mut identifiers = credentials
            .identifiers
            .iter()
            .filter(|(field, _)| **field != self.fields.password);

        let Some((field, value)) = identifiers.next() else {
            return Ok(None);
        };

        let Some(user) = self.store.find_one(field, value).await? else {
            return Ok(None);
        };

        let all_match = identifiers.all(|(field, value)| user.field(field) == Some(value.as_str()));
        Ok(all_match.then_some(user))
    }

    fn validate_credentials(&self, user: &User, credentials: &Credentials) -> bool {
        let Some(stored) = user.field(&self.fields.password) else {
            return false;
        };
        verify_password(stored, credentials.password.expose_secret())
    }
}

/// Hash a password into an Argon2id PHC string suitable for the password field.
///
/// # Errors
///
/// `Internal` if the OS random source or the hasher fails.
pub fn hash_password(password: &str) -> Result<String, ResolverError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| ResolverError::Internal(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| ResolverError::Internal(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ResolverError::Internal(e.to_string()))
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}
