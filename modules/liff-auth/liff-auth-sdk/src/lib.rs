//! LIFF Auth SDK
//!
//! This crate provides the public contracts of the LIFF auth guard:
//!
//! - [`IdentityVerifier`] - Verifies a bearer token against an external capability
//! - [`UserResolver`] - Maps a verified identity or a credential set to a local user
//! - [`UserStore`] - Minimal lookup contract the resolver needs from persistence
//! - [`ExternalIdentity`], [`User`], [`Credentials`] - Models
//! - [`VerificationError`], [`ResolverError`], [`StoreError`] - Error types
//!
//! ## Usage
//!
//! Implementations are wired by constructor injection at startup:
//!
//! ```ignore
//! use liff_auth_sdk::IdentityVerifier;
//!
//! let verifier: Arc<dyn IdentityVerifier> = Arc::new(LineIdTokenVerifier::new(&cfg)?);
//! let identity = verifier.verify("eyJhbGciOi...").await?;
//! println!("{}", identity.external_id);
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use api::{IdentityVerifier, UserResolver, UserStore};
pub use error::{ResolverError, StoreError, VerificationError};
pub use models::{Credentials, ExternalIdentity, User, UserId};
