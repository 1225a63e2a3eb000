//! Per-request authentication guard.
//!
//! ```text
//! Unchecked ──check()──> Verifying ──> Resolved(User)
//!                                  └──> Unauthenticated
//! ```
//!
//! The outcome is memoized until the request changes (`set_request`) or the
//! caller logs out. Infrastructure failures are returned as errors and leave
//! the guard unchecked so the next call retries.

use std::fmt;
use std::sync::Arc;

use liff_auth_sdk::{
    Credentials, ExternalIdentity, IdentityVerifier, User, UserId, UserResolver, VerificationError,
};
use secrecy::ExposeSecret;

use super::error::{GuardError, SessionError};
use super::request::RequestCredentials;
use super::session::SessionTokens;

/// Authentication state of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// No verification attempted yet.
    Unchecked,
    /// A check is in flight. Left behind only when that check was cancelled,
    /// in which case it counts as unchecked.
    Verifying,
    Resolved(User),
    Unauthenticated,
}

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub user: User,
    /// Application session token, when sessions are configured.
    pub session_token: Option<String>,
}

pub struct AuthGuard {
    name: String,
    verifier: Arc<dyn IdentityVerifier>,
    resolver: Arc<dyn UserResolver>,
    sessions: Option<Arc<SessionTokens>>,
    request: RequestCredentials,
    state: GuardState,
    token_checked: bool,
    identity: Option<ExternalIdentity>,
}

impl fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGuard")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("token_checked", &self.token_checked)
            .field("sessions", &self.sessions.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthGuard {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        verifier: Arc<dyn IdentityVerifier>,
        resolver: Arc<dyn UserResolver>,
        request: RequestCredentials,
    ) -> Self {
        Self {
            name: name.into(),
            verifier,
            resolver,
            sessions: None,
            request,
            state: GuardState::Unchecked,
            token_checked: false,
            identity: None,
        }
    }

    /// Enable application session tokens for this guard.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionTokens>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Identity verified during this request, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&ExternalIdentity> {
        self.identity.as_ref()
    }

    /// Bind the guard to a new request. Any memoized outcome is discarded.
    pub fn set_request(&mut self, request: RequestCredentials) {
        self.request = request;
        self.reset(GuardState::Unchecked);
    }

    /// Resolve the user of the current request, at most once.
    ///
    /// Rejected or expired tokens and unknown users yield `Ok(None)` and are
    /// memoized. Failures to reach the verifier or the store are returned as
    /// errors and are not memoized.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the verifier is unreachable, `Store` if the user store
    /// is unavailable.
    #[tracing::instrument(skip_all, fields(guard = %self.name))]
    pub async fn check(&mut self) -> Result<Option<User>, GuardError> {
        if self.token_checked {
            return Ok(self.cached_user().cloned());
        }

        self.state = GuardState::Verifying;
        match self.resolve().await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = user.id, "request authenticated");
                self.state = GuardState::Resolved(user.clone());
                self.token_checked = true;
                Ok(Some(user))
            }
            Ok(None) => {
                self.state = GuardState::Unauthenticated;
                self.token_checked = true;
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "authentication check failed");
                self.reset(GuardState::Unchecked);
                Err(e)
            }
        }
    }

    /// The authenticated user, running [`check`](Self::check) if needed.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn user(&mut self) -> Result<Option<User>, GuardError> {
        self.check().await
    }

    /// Id of the authenticated user.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn id(&mut self) -> Result<Option<UserId>, GuardError> {
        Ok(self.check().await?.map(|u| u.id))
    }

    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn is_authenticated(&mut self) -> Result<bool, GuardError> {
        Ok(self.check().await?.is_some())
    }

    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn is_guest(&mut self) -> Result<bool, GuardError> {
        Ok(self.check().await?.is_none())
    }

    /// Check a credential set without changing the guard state.
    ///
    /// # Errors
    ///
    /// `Store` if the user store is unavailable.
    pub async fn validate(&self, credentials: &Credentials) -> Result<bool, GuardError> {
        Ok(self.user_for_credentials(credentials).await?.is_some())
    }

    /// Log in with a credential set.
    ///
    /// Returns `None` and leaves the state untouched when the credentials are
    /// wrong.
    ///
    /// # Errors
    ///
    /// `Store` if the user store is unavailable, `Session` if a session token
    /// cannot be issued.
    pub async fn attempt(
        &mut self,
        credentials: &Credentials,
    ) -> Result<Option<Authenticated>, GuardError> {
        match self.user_for_credentials(credentials).await? {
            Some(user) => self.login(user).map(Some),
            None => {
                tracing::debug!(guard = %self.name, "credential attempt rejected");
                Ok(None)
            }
        }
    }

    /// Log in with a LIFF ID token, replacing the request credentials.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check), plus `Session` if a session token
    /// cannot be issued.
    pub async fn attempt_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Authenticated>, GuardError> {
        self.set_request(RequestCredentials::anonymous().with_bearer(token));
        match self.check().await? {
            Some(user) => self.login(user).map(Some),
            None => Ok(None),
        }
    }

    /// Authenticate `user` for the rest of the request, bypassing verification.
    ///
    /// The session token carries the LIFF id only when this request's verified
    /// identity resolved to `user`; any other identity is dropped.
    ///
    /// # Errors
    ///
    /// `Session` if a session token cannot be issued; the state is unchanged.
    pub fn login(&mut self, user: User) -> Result<Authenticated, GuardError> {
        let liff_id = self.linked_identity(&user).map(|i| i.external_id.as_str());
        let linked = liff_id.is_some();
        let session_token = match &self.sessions {
            Some(sessions) => Some(sessions.issue(&user, liff_id)?),
            None => None,
        };

        tracing::info!(guard = %self.name, user_id = user.id, "user logged in");
        if !linked {
            self.identity = None;
        }
        self.state = GuardState::Resolved(user.clone());
        self.token_checked = true;
        Ok(Authenticated {
            user,
            session_token,
        })
    }

    /// Drop the authenticated user. A later `check` verifies the request again.
    pub fn logout(&mut self) {
        if let GuardState::Resolved(user) = &self.state {
            tracing::info!(guard = %self.name, user_id = user.id, "user logged out");
        }
        self.reset(GuardState::Unauthenticated);
    }

    /// Issue a fresh session token for the authenticated user.
    ///
    /// # Errors
    ///
    /// `Session(Disabled)` without session configuration, plus the errors of
    /// [`check`](Self::check).
    pub async fn refresh(&mut self) -> Result<Option<String>, GuardError> {
        let Some(sessions) = self.sessions.clone() else {
            return Err(SessionError::Disabled.into());
        };
        let Some(user) = self.check().await? else {
            return Ok(None);
        };
        let liff_id = self.linked_identity(&user).map(|i| i.external_id.as_str());
        Ok(Some(sessions.issue(&user, liff_id)?))
    }

    fn cached_user(&self) -> Option<&User> {
        match &self.state {
            GuardState::Resolved(user) => Some(user),
            GuardState::Unchecked | GuardState::Verifying | GuardState::Unauthenticated => None,
        }
    }

    /// The verified identity, only when it resolved to `user` in this request.
    fn linked_identity(&self, user: &User) -> Option<&ExternalIdentity> {
        match &self.state {
            GuardState::Resolved(current) if self.token_checked && current.id == user.id => {
                self.identity.as_ref()
            }
            _ => None,
        }
    }

    async fn user_for_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<User>, GuardError> {
        let Some(user) = self.resolver.find_by_credentials(credentials).await? else {
            return Ok(None);
        };
        Ok(self
            .resolver
            .validate_credentials(&user, credentials)
            .then_some(user))
    }

    fn reset(&mut self, state: GuardState) {
        self.state = state;
        self.token_checked = false;
        self.identity = None;
    }

    async fn resolve(&mut self) -> Result<Option<User>, GuardError> {
        if let Some(user) = self.resolve_session().await? {
            return Ok(Some(user));
        }

        let Some(token) = self.request.bearer() else {
            tracing::debug!("no credentials on request");
            return Ok(None);
        };

        let identity = match self.verifier.verify(token.expose_secret()).await {
            Ok(identity) => identity,
            Err(VerificationError::Unreachable(msg)) => return Err(GuardError::Unavailable(msg)),
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                return Ok(None);
            }
        };

        let user = self
            .resolver
            .find_by_external_id(&identity.external_id)
            .await?;
        if user.is_none() {
            tracing::debug!(
                external_id = %identity.external_id,
                "no user linked to verified identity"
            );
        }
        self.identity = Some(identity);
        Ok(user)
    }

    async fn resolve_session(&self) -> Result<Option<User>, GuardError> {
        let (Some(sessions), Some(token)) = (&self.sessions, self.request.session()) else {
            return Ok(None);
        };

        let user_id = match sessions
            .decode(token.expose_secret())
            .and_then(|claims| claims.user_id())
        {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                return Ok(None);
            }
        };

        Ok(self.resolver.find_by_id(user_id).await?)
    }
}
