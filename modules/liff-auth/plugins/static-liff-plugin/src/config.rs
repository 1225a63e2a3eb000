//! Configuration for the static LIFF auth plugin.

use std::collections::BTreeMap;

use serde::Deserialize;

/// External id returned in `accept_all` mode when none is configured.
pub const DEFAULT_EXTERNAL_ID: &str = "U00000000000000000000000000000000";

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticLiffPluginConfig {
    /// Verification mode.
    pub mode: VerifyMode,

    /// Identity returned in `accept_all` mode.
    pub default_identity: IdentityConfig,

    /// Static token-to-identity mappings for `static_tokens` mode.
    pub tokens: Vec<TokenMapping>,

    /// Tokens rejected as expired in either mode.
    pub expired_tokens: Vec<String>,
}

/// Verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    /// Map specific tokens to specific identities.
    #[default]
    StaticTokens,
    /// Accept any non-empty token and return the default identity.
    AcceptAll,
}

/// Identity returned for a matched token.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// LIFF subject id.
    pub external_id: String,

    /// Extra claims such as `name`, `picture` or `email`.
    pub claims: BTreeMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            external_id: DEFAULT_EXTERNAL_ID.to_owned(),
            claims: BTreeMap::new(),
        }
    }
}

/// Maps a static token to a specific identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenMapping {
    /// The bearer token value to match.
    pub token: String,
    /// The identity to return when this token is presented.
    pub identity: IdentityConfig,
}

impl TokenMapping {
    #[must_use]
    pub fn new(token: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identity: IdentityConfig {
                external_id: external_id.into(),
                claims: BTreeMap::new(),
            },
        }
    }
}
