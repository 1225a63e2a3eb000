//! LIFF Auth Module
//!
//! Request-scoped authentication guard for LINE LIFF ID tokens. Each request
//! gets a fresh [`AuthGuard`] that verifies the bearer token at most once,
//! resolves the local user through a [`UserResolver`](liff_auth_sdk::UserResolver)
//! and memoizes the outcome.
//!
//! Wiring happens once at startup through [`LiffAuth::builder`]; the
//! [`axum_ext`] module plugs the guard into an axum router.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod axum_ext;
pub mod config;
pub mod domain;
pub mod infra;
pub mod registry;

pub use config::{ConfigError, LiffAuthConfig};
pub use domain::{
    AuthGuard, Authenticated, GuardError, GuardState, RequestCredentials, SessionError,
    SessionTokens, StoreUserResolver, hash_password,
};
pub use infra::LineIdTokenVerifier;
pub use registry::{
    BootstrapError, GuardFactory, GuardRegistry, LiffAuth, LiffAuthBuilder, RegistryError,
};
