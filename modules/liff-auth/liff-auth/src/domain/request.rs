//! Credentials carried by one incoming request.

use http::HeaderMap;
use secrecy::SecretString;

use crate::config::TokenConfig;

/// Bearer and session credentials read from a request.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    bearer: Option<SecretString>,
    session: Option<SecretString>,
}

impl RequestCredentials {
    /// A request without any credential.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = non_empty(token.into());
        self
    }

    #[must_use]
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = non_empty(token.into());
        self
    }

    /// Read credentials from request headers using the configured locations.
    ///
    /// The scheme prefix is matched case-insensitively; a header whose value
    /// does not start with the scheme is ignored.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, cfg: &TokenConfig) -> Self {
        let bearer = header_str(headers, &cfg.header)
            .and_then(|value| strip_scheme(value, &cfg.scheme))
            .and_then(|token| non_empty(token.to_owned()));
        let session = header_str(headers, &cfg.session_header)
            .and_then(|value| non_empty(value.trim().to_owned()));

        Self { bearer, session }
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&SecretString> {
        self.bearer.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> Option<&SecretString> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.bearer.is_none() && self.session.is_none()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let value = value.trim();
    if scheme.is_empty() {
        return Some(value);
    }
    let (prefix, rest) = value.split_at_checked(scheme.len())?;
    if !prefix.eq_ignore_ascii_case(scheme) || !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim())
}

fn non_empty(value: String) -> Option<SecretString> {
    if value.is_empty() {
        None
    } else {
        Some(SecretString::from(value))
    }
}
