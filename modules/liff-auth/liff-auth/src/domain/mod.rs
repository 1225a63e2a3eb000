//! Domain layer for the LIFF auth guard.

pub mod error;
pub mod guard;
pub mod request;
pub mod resolver;
pub mod session;

pub use error::{GuardError, SessionError};
pub use guard::{AuthGuard, Authenticated, GuardState};
pub use request::RequestCredentials;
pub use resolver::{StoreUserResolver, hash_password};
pub use session::{SessionClaims, SessionTokens};
