//! `IdentityVerifier` backed by the LINE ID token verification endpoint.

use std::time::Duration;

use async_trait::async_trait;
use liff_auth_sdk::{ExternalIdentity, IdentityVerifier, VerificationError};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{ConfigError, VerificationConfig};

/// Posts `id_token` and `client_id` to the verification endpoint and maps the
/// answer to an [`ExternalIdentity`].
///
/// Stateless apart from the pooled HTTP client, so one instance serves all
/// requests.
pub struct LineIdTokenVerifier {
    client: reqwest::Client,
    endpoint: Url,
    client_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl LineIdTokenVerifier {
    /// Build the verifier and its HTTP client.
    ///
    /// # Errors
    ///
    /// `Invalid` if `client_id` is empty, the endpoint is not a URL, or the
    /// HTTP client cannot be built.
    pub fn new(cfg: &VerificationConfig) -> Result<Self, ConfigError> {
        if cfg.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "verification.client_id",
                reason: "must be set to the LIFF channel id".to_owned(),
            });
        }
        let endpoint = Url::parse(&cfg.endpoint).map_err(|e| ConfigError::Invalid {
            field: "verification.endpoint",
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "verification",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            client_id: cfg.client_id.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl IdentityVerifier for LineIdTokenVerifier {
    async fn verify(&self, token: &str) -> Result<ExternalIdentity, VerificationError> {
        if token.is_empty() {
            return Err(VerificationError::EmptyToken);
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("id_token", token), ("client_id", self.client_id.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VerificationError::Unreachable(format!(
                "verification endpoint answered {status}"
            )));
        }
        if status.is_client_error() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(rejection(status, body));
        }
        if !status.is_success() {
            return Err(VerificationError::Invalid(format!(
                "unexpected verification status {status}"
            )));
        }

        let claims: Map<String, Value> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(&e)
            } else {
                VerificationError::Invalid(format!("malformed verification response: {e}"))
            }
        })?;
        identity_from_claims(claims)
    }
}

fn transport_error(e: &reqwest::Error) -> VerificationError {
    tracing::warn!(error = %e, timeout = e.is_timeout(), "LIFF verification call failed");
    VerificationError::Unreachable(e.to_string())
}

fn rejection(status: StatusCode, body: ErrorBody) -> VerificationError {
    let description = body
        .error_description
        .or(body.error)
        .unwrap_or_else(|| status.to_string());
    if description.to_ascii_lowercase().contains("expired") {
        VerificationError::Expired
    } else {
        VerificationError::Invalid(description)
    }
}

fn identity_from_claims(claims: Map<String, Value>) -> Result<ExternalIdentity, VerificationError> {
    let external_id = match claims.get("sub") {
        Some(Value::String(sub)) if !sub.is_empty() => sub.clone(),
        _ => {
            return Err(VerificationError::Invalid(
                "verified claims carry no subject".to_owned(),
            ));
        }
    };

    let mut identity = ExternalIdentity::new(external_id);
    for (name, value) in claims {
        if let Some(rendered) = render_claim(value) {
            identity.raw_claims.insert(name, rendered);
        }
    }
    Ok(identity)
}

fn render_claim(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(render_claim)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other @ (Value::Bool(_) | Value::Number(_) | Value::Object(_)) => Some(other.to_string()),
    }
}
