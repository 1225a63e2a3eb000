#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static LIFF Auth Plugin
//!
//! Provides a config-driven [`IdentityVerifier`](liff_auth_sdk::IdentityVerifier)
//! and an in-memory [`UserStore`](liff_auth_sdk::UserStore) for development and testing.
//!
//! ## Modes
//!
//! - **`static_tokens`** (default): Maps specific tokens to specific external identities.
//!   Tokens listed in `expired_tokens` are reported as expired.
//!
//! - **`accept_all`**: Accepts any non-empty token and returns the default identity.
//!
//! ## Configuration
//!
//! ```yaml
//! mode: static_tokens
//! default_identity:
//!   external_id: "U00000000000000000000000000000000"
//!   claims: {}
//! tokens:
//!   - token: "tok-abc"
//!     identity:
//!       external_id: "U123"
//!       claims: { name: "Taro" }
//! expired_tokens: ["tok-old"]
//! ```

pub mod config;
pub mod domain;

pub use domain::{InMemoryUserStore, Service as StaticIdentityVerifier};
