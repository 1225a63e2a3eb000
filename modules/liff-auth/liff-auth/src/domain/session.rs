//! Application session tokens.
//!
//! After a successful login the guard hands out an HS256 JWT that the client
//! sends back on later requests instead of re-verifying its LIFF token.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use liff_auth_sdk::{User, UserId};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::error::SessionError;
use crate::config::SessionConfig;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User primary key.
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
    /// LIFF subject id the session was established with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liff: Option<String>,
}

impl SessionClaims {
    /// Parse the user id from `sub`.
    ///
    /// # Errors
    ///
    /// `Invalid` if `sub` is not a user id.
    pub fn user_id(&self) -> Result<UserId, SessionError> {
        self.sub
            .parse()
            .map_err(|_| SessionError::Invalid(format!("malformed subject '{}'", self.sub)))
    }
}

/// Issues and decodes session tokens with a shared secret.
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
    issuer: String,
}

impl SessionTokens {
    #[must_use]
    pub fn new(cfg: &SessionConfig) -> Self {
        let secret = cfg.secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: cfg.ttl_secs,
            issuer: cfg.issuer.clone(),
        }
    }

    /// Issue a token for `user`, valid from now for the configured TTL.
    ///
    /// # Errors
    ///
    /// `Encode` if signing fails.
    pub fn issue(&self, user: &User, liff_id: Option<&str>) -> Result<String, SessionError> {
        self.issue_at(user, liff_id, jsonwebtoken::get_current_timestamp())
    }

    /// Issue a token as if the current time were `now` (seconds since epoch).
    ///
    /// # Errors
    ///
    /// `Encode` if signing fails.
    pub fn issue_at(
        &self,
        user: &User,
        liff_id: Option<&str>,
        now: u64,
    ) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: user.id.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
            iss: self.issuer.clone(),
            liff: liff_id.map(str::to_owned),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Encode(e.to_string()))
    }

    /// Validate signature, issuer and expiry, and return the claims.
    ///
    /// # Errors
    ///
    /// `Expired` past expiry, `Invalid` for anything else.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn tokens() -> SessionTokens {
        SessionTokens::new(&SessionConfig::new(SECRET))
    }

    #[test]
    fn issued_token_decodes_to_user() {
        let tokens = tokens();
        let user = User::new(7).with_field("liff_id", "U123");

        let token = tokens.issue(&user, Some("U123")).unwrap();
        let claims = tokens.decode(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.liff.as_deref(), Some("U123"));
        assert_eq!(claims.iss, "liff-auth");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = tokens();
        let now = jsonwebtoken::get_current_timestamp();

        let token = tokens.issue_at(&User::new(7), None, now - 7200).unwrap();
        assert_eq!(tokens.decode(&token), Err(SessionError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = SessionTokens::new(&SessionConfig::new("ffffffffffffffffffffffffffffffff"));
        let token = other.issue(&User::new(7), None).unwrap();

        assert!(matches!(
            tokens().decode(&token),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn token_from_other_issuer_is_invalid() {
        let mut cfg = SessionConfig::new(SECRET);
        cfg.issuer = "someone-else".to_owned();
        let token = SessionTokens::new(&cfg).issue(&User::new(7), None).unwrap();

        assert!(matches!(
            tokens().decode(&token),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            tokens().decode("not-a-jwt"),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_subject_is_rejected() {
        let claims = SessionClaims {
            sub: "abc".to_owned(),
            iat: 0,
            exp: 1,
            iss: "liff-auth".to_owned(),
            liff: None,
        };
        assert!(claims.user_id().is_err());
    }
}
