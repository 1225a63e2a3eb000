#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Guard behaviour across requests sharing one verifier and one store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use liff_auth::config::FieldsConfig;
use liff_auth::{AuthGuard, GuardError, GuardState, RequestCredentials, StoreUserResolver};
use liff_auth_sdk::{ExternalIdentity, IdentityVerifier, User, UserResolver, VerificationError};
use static_liff_plugin::config::{StaticLiffPluginConfig, TokenMapping};
use static_liff_plugin::{InMemoryUserStore, StaticIdentityVerifier};

/// Verifier that answers after a per-token delay, to interleave requests.
struct SlowVerifier {
    inner: StaticIdentityVerifier,
}

#[async_trait]
impl IdentityVerifier for SlowVerifier {
    async fn verify(&self, token: &str) -> Result<ExternalIdentity, VerificationError> {
        let delay = if token == "tok-alice" { 50 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.verify(token)
    }
}

fn static_verifier() -> StaticIdentityVerifier {
    StaticIdentityVerifier::from_config(&StaticLiffPluginConfig {
        tokens: vec![
            TokenMapping::new("tok-alice", "U-alice"),
            TokenMapping::new("tok-bob", "U-bob"),
            TokenMapping::new("tok-ghost", "U-ghost"),
        ],
        ..StaticLiffPluginConfig::default()
    })
}

fn store() -> Arc<InMemoryUserStore> {
    Arc::new(InMemoryUserStore::with_users([
        User::new(1).with_field("liff_id", "U-alice"),
        User::new(2).with_field("liff_id", "U-bob"),
    ]))
}

fn resolver(store: Arc<InMemoryUserStore>) -> Arc<dyn UserResolver> {
    Arc::new(StoreUserResolver::new(store, FieldsConfig::default()))
}

fn bearer(token: &str) -> RequestCredentials {
    RequestCredentials::anonymous().with_bearer(token)
}

#[tokio::test]
async fn concurrent_requests_do_not_share_state() {
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(SlowVerifier {
        inner: static_verifier(),
    });
    let resolver = resolver(store());

    let mut alice = AuthGuard::new("liff", verifier.clone(), resolver.clone(), bearer("tok-alice"));
    let mut bob = AuthGuard::new("liff", verifier.clone(), resolver.clone(), bearer("tok-bob"));
    let mut nobody = AuthGuard::new("liff", verifier, resolver, bearer("tok-bad"));

    let (a, b, n) = tokio::join!(alice.id(), bob.id(), nobody.id());

    assert_eq!(a.unwrap(), Some(1));
    assert_eq!(b.unwrap(), Some(2));
    assert_eq!(n.unwrap(), None);
    assert!(matches!(alice.state(), GuardState::Resolved(u) if u.id == 1));
    assert!(matches!(bob.state(), GuardState::Resolved(u) if u.id == 2));
    assert_eq!(nobody.state(), &GuardState::Unauthenticated);
}

#[tokio::test]
async fn spawned_requests_resolve_their_own_users() {
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(SlowVerifier {
        inner: static_verifier(),
    });
    let resolver = resolver(store());

    let handles: Vec<_> = ["tok-alice", "tok-bob", "tok-ghost", "tok-alice"]
        .into_iter()
        .map(|token| {
            let mut guard = AuthGuard::new("liff", verifier.clone(), resolver.clone(), bearer(token));
            tokio::spawn(async move { guard.id().await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(ids, [Some(1), Some(2), None, Some(1)]);
}

#[tokio::test]
async fn logout_in_one_request_leaves_others_resolved() {
    let verifier = Arc::new(static_verifier());
    let resolver = resolver(store());

    let mut first = AuthGuard::new("liff", verifier.clone(), resolver.clone(), bearer("tok-alice"));
    let mut second = AuthGuard::new("liff", verifier.clone(), resolver, bearer("tok-alice"));
    first.check().await.unwrap();
    second.check().await.unwrap();

    first.logout();

    assert_eq!(first.state(), &GuardState::Unauthenticated);
    assert!(matches!(second.state(), GuardState::Resolved(u) if u.id == 1));
    assert_eq!(second.id().await.unwrap(), Some(1));
    assert_eq!(verifier.calls(), 2);
}

#[tokio::test]
async fn outage_is_retried_within_the_same_request() {
    let verifier = Arc::new(static_verifier());
    let store = store();
    let mut guard = AuthGuard::new("liff", verifier.clone(), resolver(store.clone()), bearer("tok-bob"));

    verifier.set_reachable(false);
    assert!(guard.check().await.unwrap_err().is_unavailable());
    assert_eq!(guard.state(), &GuardState::Unchecked);

    verifier.set_reachable(true);
    store.set_available(false);
    assert!(matches!(guard.check().await.unwrap_err(), GuardError::Store(_)));
    assert_eq!(guard.state(), &GuardState::Unchecked);

    store.set_available(true);
    assert_eq!(guard.id().await.unwrap(), Some(2));
    assert_eq!(verifier.calls(), 3);
}

#[tokio::test]
async fn user_added_after_rejection_is_seen_by_next_request() {
    let verifier = Arc::new(static_verifier());
    let store = store();
    let resolver = resolver(store.clone());

    let mut before = AuthGuard::new("liff", verifier.clone(), resolver.clone(), bearer("tok-ghost"));
    assert_eq!(before.id().await.unwrap(), None);

    store.insert(User::new(3).with_field("liff_id", "U-ghost"));

    // The memoized outcome of the first request is unaffected.
    assert_eq!(before.id().await.unwrap(), None);

    let mut after = AuthGuard::new("liff", verifier, resolver, bearer("tok-ghost"));
    assert_eq!(after.id().await.unwrap(), Some(3));
}
