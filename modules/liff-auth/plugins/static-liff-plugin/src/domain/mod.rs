//! Domain layer for the static LIFF auth plugin.

pub mod client;
pub mod service;
pub mod store;

pub use service::Service;
pub use store::InMemoryUserStore;
