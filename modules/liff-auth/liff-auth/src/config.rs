//! Configuration for the LIFF auth guard.
//!
//! Defaults come from `Default`/serde defaults, then an optional YAML file,
//! then `LIFF_AUTH__*` environment variables (`__` separates nesting levels).
//! The merged configuration is validated once and is read-only afterwards.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

/// Environment prefix, e.g. `LIFF_AUTH__VERIFICATION__CLIENT_ID`.
pub const ENV_PREFIX: &str = "LIFF_AUTH__";

/// LINE ID token verification endpoint.
pub const DEFAULT_VERIFY_ENDPOINT: &str = "https://api.line.me/oauth2/v2.1/verify";

/// Minimum length of the HS256 session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiffAuthConfig {
    /// Name under which the guard is registered.
    pub guard: String,

    /// Column names in the user store.
    pub fields: FieldsConfig,

    /// Where credentials are read from on incoming requests.
    pub token: TokenConfig,

    /// Outbound LIFF verification call.
    pub verification: VerificationConfig,

    /// Application session tokens. Disabled when absent.
    pub session: Option<SessionConfig>,
}

impl Default for LiffAuthConfig {
    fn default() -> Self {
        Self {
            guard: "liff".to_owned(),
            fields: FieldsConfig::default(),
            token: TokenConfig::default(),
            verification: VerificationConfig::default(),
            session: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldsConfig {
    /// Field holding the LIFF subject id.
    pub liff_id: String,
    /// Field holding the Argon2 PHC password hash.
    pub password: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            liff_id: "liff_id".to_owned(),
            password: "password".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenConfig {
    /// Header carrying the LIFF ID token.
    pub header: String,
    /// Scheme prefix stripped from `header`; empty means the raw header value.
    pub scheme: String,
    /// Header carrying the application session token.
    pub session_header: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            header: "authorization".to_owned(),
            scheme: "Bearer".to_owned(),
            session_header: "x-session-token".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationConfig {
    pub endpoint: String,
    /// LIFF channel id, sent as `client_id`. Channel ids are numeric, so
    /// numbers are accepted too.
    #[serde(deserialize_with = "string_or_number")]
    pub client_id: String,
    /// Upper bound for one verification call.
    pub timeout_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VERIFY_ENDPOINT.to_owned(),
            client_id: String::new(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// HS256 signing secret.
    pub secret: SecretString,
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_session_issuer")]
    pub issuer: String,
}

impl SessionConfig {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            ttl_secs: default_session_ttl(),
            issuer: default_session_issuer(),
        }
    }
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_session_issuer() -> String {
    "liff-auth".to_owned()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

impl LiffAuthConfig {
    /// Layered providers: optional YAML file, then environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration from file and environment.
    ///
    /// # Errors
    ///
    /// `Load` if a provider cannot be parsed, `Invalid` if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(path))
    }

    /// Extract and validate configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// `Load` if extraction fails, `Invalid` if validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let cfg: Self = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guard.trim().is_empty() {
            return Err(ConfigError::invalid("guard", "must not be empty"));
        }
        if self.fields.liff_id.trim().is_empty() {
            return Err(ConfigError::invalid("fields.liff_id", "must not be empty"));
        }
        if self.fields.password.trim().is_empty() {
            return Err(ConfigError::invalid("fields.password", "must not be empty"));
        }
        validate_header("token.header", &self.token.header)?;
        validate_header("token.session_header", &self.token.session_header)?;
        if self.token.header.eq_ignore_ascii_case(&self.token.session_header) {
            return Err(ConfigError::invalid(
                "token.session_header",
                "must differ from token.header",
            ));
        }
        if self.verification.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "verification.timeout_ms",
                "must be greater than zero",
            ));
        }
        reqwest::Url::parse(&self.verification.endpoint)
            .map_err(|e| ConfigError::invalid("verification.endpoint", e.to_string()))?;

        if let Some(session) = &self.session {
            if session.secret.expose_secret().len() < MIN_SESSION_SECRET_LEN {
                return Err(ConfigError::invalid(
                    "session.secret",
                    format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
                ));
            }
            if session.ttl_secs == 0 {
                return Err(ConfigError::invalid(
                    "session.ttl_secs",
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

fn validate_header(field: &'static str, name: &str) -> Result<(), ConfigError> {
    http::HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(field, e.to_string()))
}
