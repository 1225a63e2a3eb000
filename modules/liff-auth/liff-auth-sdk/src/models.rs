//! Domain models for the LIFF auth guard.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Primary key of an application user.
pub type UserId = i64;

/// Identity produced by a successful token verification.
///
/// Lives only for the duration of one resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Stable subject identifier issued by the provider (the LIFF `sub` claim).
    pub external_id: String,
    /// Every verified claim, stringified.
    pub raw_claims: BTreeMap<String, String>,
}

impl ExternalIdentity {
    #[must_use]
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            raw_claims: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_claims.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.raw_claims.get(name).map(String::as_str)
    }

    /// Display name, when the `profile` scope was granted.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.claim("name")
    }

    /// Profile image URL, when the `profile` scope was granted.
    #[must_use]
    pub fn picture(&self) -> Option<&str> {
        self.claim("picture")
    }

    /// Email address, when the `email` scope was granted.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.claim("email")
    }
}

/// Application user record as returned by a [`UserStore`](crate::UserStore).
///
/// Column names are configurable, so attributes are kept as a field map
/// rather than typed members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl User {
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Standard credential set: lookup identifiers plus a password.
///
/// Deserializes from a flat object such as
/// `{"email": "a@example.com", "password": "secret"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub password: SecretString,
    #[serde(flatten)]
    pub identifiers: BTreeMap<String, String>,
}

impl Credentials {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: SecretString::from(password.into()),
            identifiers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.identifiers.insert(field.into(), value.into());
        self
    }
}
