#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the LINE verification endpoint adapter.
//!
//! The endpoint is replaced with an `httpmock` server so that status and body
//! mapping can be exercised without network access.

use std::time::Duration;

use httpmock::prelude::*;
use liff_auth::config::VerificationConfig;
use liff_auth::LineIdTokenVerifier;
use liff_auth_sdk::{IdentityVerifier, VerificationError};
use serde_json::json;

const CHANNEL_ID: &str = "1657000000";

fn verifier_for(server: &MockServer, timeout_ms: u64) -> LineIdTokenVerifier {
    LineIdTokenVerifier::new(&VerificationConfig {
        endpoint: server.url("/oauth2/v2.1/verify"),
        client_id: CHANNEL_ID.to_owned(),
        timeout_ms,
    })
    .unwrap()
}

#[tokio::test]
async fn accepted_token_yields_identity() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth2/v2.1/verify")
                .header("content-type", "application/x-www-form-urlencoded");
            then.status(200).json_body(json!({
                "iss": "https://access.line.me",
                "sub": "U123",
                "aud": CHANNEL_ID,
                "exp": 1_700_000_000,
                "iat": 1_699_996_400,
                "name": "Taro",
                "picture": "https://profile.line-scdn.net/abc",
                "email": "taro@example.com",
            }));
        })
        .await;

    let identity = verifier_for(&server, 2_000).verify("tok-abc").await.unwrap();

    mock.assert_async().await;
    assert_eq!(identity.external_id, "U123");
    assert_eq!(identity.name(), Some("Taro"));
    assert_eq!(identity.email(), Some("taro@example.com"));
    assert_eq!(identity.claim("aud"), Some(CHANNEL_ID));
}

#[tokio::test]
async fn expired_token_is_reported_as_expired() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth2/v2.1/verify");
            then.status(400).json_body(json!({
                "error": "invalid_request",
                "error_description": "IdToken expired.",
            }));
        })
        .await;

    let err = verifier_for(&server, 2_000).verify("tok-old").await.unwrap_err();
    assert_eq!(err, VerificationError::Expired);
}

#[tokio::test]
async fn rejected_token_is_invalid() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth2/v2.1/verify");
            then.status(400).json_body(json!({
                "error": "invalid_request",
                "error_description": "Invalid IdToken.",
            }));
        })
        .await;

    let err = verifier_for(&server, 2_000).verify("tok-bad").await.unwrap_err();
    assert_eq!(err, VerificationError::Invalid("Invalid IdToken.".to_owned()));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn rejection_without_body_is_invalid() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth2/v2.1/verify");
            then.status(401).body("nope");
        })
        .await;

    let err = verifier_for(&server, 2_000).verify("tok-bad").await.unwrap_err();
    assert!(matches!(err, VerificationError::Invalid(_)));
}

#[tokio::test]
async fn server_errors_are_unreachable() {
    for status in [500, 503, 429] {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/v2.1/verify");
                then.status(status);
            })
            .await;

        let err = verifier_for(&server, 2_000).verify("tok-abc").await.unwrap_err();
        assert!(
            matches!(err, VerificationError::Unreachable(_)),
            "status {status} mapped to {err}"
        );
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn slow_endpoint_times_out_as_unreachable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth2/v2.1/verify");
            then.status(200)
                .json_body(json!({ "sub": "U123" }))
                .delay(Duration::from_millis(1_500));
        })
        .await;

    let err = verifier_for(&server, 100).verify("tok-abc").await.unwrap_err();
    assert!(matches!(err, VerificationError::Unreachable(_)));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let verifier = LineIdTokenVerifier::new(&VerificationConfig {
        endpoint: "http://127.0.0.1:9/oauth2/v2.1/verify".to_owned(),
        client_id: CHANNEL_ID.to_owned(),
        timeout_ms: 1_000,
    })
    .unwrap();

    let err = verifier.verify("tok-abc").await.unwrap_err();
    assert!(matches!(err, VerificationError::Unreachable(_)));
}

#[tokio::test]
async fn empty_token_is_rejected_locally() {
    // Nothing listens here; reaching the network would report Unreachable.
    let verifier = LineIdTokenVerifier::new(&VerificationConfig {
        endpoint: "http://127.0.0.1:9/oauth2/v2.1/verify".to_owned(),
        client_id: CHANNEL_ID.to_owned(),
        timeout_ms: 1_000,
    })
    .unwrap();

    let err = verifier.verify("").await.unwrap_err();
    assert_eq!(err, VerificationError::EmptyToken);
}

#[tokio::test]
async fn success_without_subject_is_invalid() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth2/v2.1/verify");
            then.status(200).json_body(json!({ "iss": "https://access.line.me" }));
        })
        .await;

    let err = verifier_for(&server, 2_000).verify("tok-abc").await.unwrap_err();
    assert!(matches!(err, VerificationError::Invalid(_)));
}
