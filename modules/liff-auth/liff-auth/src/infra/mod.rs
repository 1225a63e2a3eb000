//! Infrastructure adapters.

pub mod line_verifier;

pub use line_verifier::LineIdTokenVerifier;
