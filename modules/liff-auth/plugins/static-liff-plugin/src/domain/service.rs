//! Service implementation for the static LIFF auth plugin.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use liff_auth_sdk::{ExternalIdentity, VerificationError};

use crate::config::{IdentityConfig, StaticLiffPluginConfig, VerifyMode};

/// Static identity verifier.
///
/// Provides token-to-identity mapping based on configuration mode:
/// - `static_tokens`: Specific tokens map to specific identities
/// - `accept_all`: Any non-empty token maps to the default identity
///
/// An outage can be simulated with [`Service::set_reachable`] to exercise
/// retry paths.
pub struct Service {
    mode: VerifyMode,
    default_identity: IdentityConfig,
    token_map: HashMap<String, IdentityConfig>,
    expired: HashSet<String>,
    reachable: AtomicBool,
    calls: AtomicUsize,
}

impl Service {
    /// Create a service from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: &StaticLiffPluginConfig) -> Self {
        let token_map: HashMap<String, IdentityConfig> = cfg
            .tokens
            .iter()
            .map(|m| (m.token.clone(), m.identity.clone()))
            .collect();

        Self {
            mode: cfg.mode,
            default_identity: cfg.default_identity.clone(),
            token_map,
            expired: cfg.expired_tokens.iter().cloned().collect(),
            reachable: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Verify a token against the static mapping.
    ///
    /// # Errors
    ///
    /// - `EmptyToken` for an empty token
    /// - `Unreachable` while an outage is simulated
    /// - `Expired` for tokens listed in `expired_tokens`
    /// - `Invalid` for unknown tokens in `static_tokens` mode
    pub fn verify(&self, token: &str) -> Result<ExternalIdentity, VerificationError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if token.is_empty() {
            return Err(VerificationError::EmptyToken);
        }
        if !self.reachable.load(Ordering::Acquire) {
            return Err(VerificationError::Unreachable(
                "static verifier outage".to_owned(),
            ));
        }
        if self.expired.contains(token) {
            return Err(VerificationError::Expired);
        }

        let identity = match self.mode {
            VerifyMode::AcceptAll => &self.default_identity,
            VerifyMode::StaticTokens => self
                .token_map
                .get(token)
                .ok_or_else(|| VerificationError::Invalid("unknown token".to_owned()))?,
        };

        Ok(build_identity(identity))
    }

    /// Toggle the simulated provider outage.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// Number of verification calls served so far, including failed ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

fn build_identity(identity: &IdentityConfig) -> ExternalIdentity {
    let mut result = ExternalIdentity::new(identity.external_id.clone());
    result.raw_claims.clone_from(&identity.claims);
    result
        .raw_claims
        .insert("sub".to_owned(), identity.external_id.clone());
    result
}
