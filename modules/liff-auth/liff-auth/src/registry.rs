//! Guard registry and startup wiring.
//!
//! [`LiffAuth::builder`] validates the merged configuration, constructs the
//! verifier and resolver once for the application lifetime, and registers a
//! guard factory under the configured name. Request handlers then ask the
//! registry for a fresh guard per request.

use std::collections::BTreeMap;
use std::sync::Arc;

use liff_auth_sdk::{IdentityVerifier, UserResolver, UserStore};
use tracing::info;

use crate::config::{ConfigError, LiffAuthConfig};
use crate::domain::{AuthGuard, RequestCredentials, SessionTokens, StoreUserResolver};
use crate::infra::LineIdTokenVerifier;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("guard '{0}' is already registered")]
    DuplicateGuard(String),

    #[error("guard '{0}' is not registered")]
    UnknownGuard(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no user store configured")]
    MissingUserStore,
}

/// Creates a guard bound to one request.
pub trait GuardFactory: Send + Sync {
    fn create(&self, request: RequestCredentials) -> AuthGuard;
}

impl<F> GuardFactory for F
where
    F: Fn(RequestCredentials) -> AuthGuard + Send + Sync,
{
    fn create(&self, request: RequestCredentials) -> AuthGuard {
        self(request)
    }
}

/// Named guard factories.
#[derive(Default)]
pub struct GuardRegistry {
    factories: BTreeMap<String, Arc<dyn GuardFactory>>,
}

impl GuardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`.
    ///
    /// # Errors
    ///
    /// `DuplicateGuard` if the name is taken.
    pub fn extend(
        &mut self,
        name: impl Into<String>,
        factory: Arc<dyn GuardFactory>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::DuplicateGuard(name));
        }
        info!(guard = %name, "registered auth guard");
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Create a guard for one request.
    ///
    /// # Errors
    ///
    /// `UnknownGuard` if nothing is registered under `name`.
    pub fn guard(
        &self,
        name: &str,
        request: RequestCredentials,
    ) -> Result<AuthGuard, RegistryError> {
        self.factories
            .get(name)
            .map(|factory| factory.create(request))
            .ok_or_else(|| RegistryError::UnknownGuard(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

/// Application-lifetime auth wiring.
pub struct LiffAuth {
    config: Arc<LiffAuthConfig>,
    verifier: Arc<dyn IdentityVerifier>,
    resolver: Arc<dyn UserResolver>,
    registry: GuardRegistry,
}

impl LiffAuth {
    #[must_use]
    pub fn builder(config: LiffAuthConfig) -> LiffAuthBuilder {
        LiffAuthBuilder {
            config,
            verifier: None,
            store: None,
            registry: GuardRegistry::new(),
        }
    }

    /// The merged configuration, read-only.
    #[must_use]
    pub fn config(&self) -> &LiffAuthConfig {
        &self.config
    }

    /// The shared verifier singleton.
    #[must_use]
    pub fn verifier(&self) -> Arc<dyn IdentityVerifier> {
        self.verifier.clone()
    }

    #[must_use]
    pub fn resolver(&self) -> Arc<dyn UserResolver> {
        self.resolver.clone()
    }

    #[must_use]
    pub fn registry(&self) -> &GuardRegistry {
        &self.registry
    }

    /// Create a guard for `request` under the configured default name.
    ///
    /// # Errors
    ///
    /// `UnknownGuard` if no guard is registered under the default name.
    pub fn guard(&self, request: RequestCredentials) -> Result<AuthGuard, RegistryError> {
        self.registry.guard(&self.config.guard, request)
    }
}

pub struct LiffAuthBuilder {
    config: LiffAuthConfig,
    verifier: Option<Arc<dyn IdentityVerifier>>,
    store: Option<Arc<dyn UserStore>>,
    registry: GuardRegistry,
}

impl LiffAuthBuilder {
    /// Use a custom verifier instead of the LINE endpoint.
    #[must_use]
    pub fn verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    #[must_use]
    pub fn user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an additional guard next to the default one.
    ///
    /// # Errors
    ///
    /// `DuplicateGuard` if the name is taken.
    pub fn extend(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn GuardFactory>,
    ) -> Result<Self, RegistryError> {
        self.registry.extend(name, factory)?;
        Ok(self)
    }

    /// Validate configuration and wire the default guard.
    ///
    /// # Errors
    ///
    /// `Config` for invalid configuration, `MissingUserStore` without a store,
    /// `Registry` if the default guard name was already taken.
    pub fn build(self) -> Result<LiffAuth, BootstrapError> {
        let Self {
            config,
            verifier,
            store,
            mut registry,
        } = self;

        config.validate()?;
        let store = store.ok_or(BootstrapError::MissingUserStore)?;

        let verifier: Arc<dyn IdentityVerifier> = match verifier {
            Some(verifier) => verifier,
            None => Arc::new(LineIdTokenVerifier::new(&config.verification)?),
        };
        let resolver: Arc<dyn UserResolver> =
            Arc::new(StoreUserResolver::new(store, config.fields.clone()));
        let sessions = config
            .session
            .as_ref()
            .map(|cfg| Arc::new(SessionTokens::new(cfg)));

        let factory = {
            let name = config.guard.clone();
            let verifier = verifier.clone();
            let resolver = resolver.clone();
            move |request: RequestCredentials| {
                let guard = AuthGuard::new(name.clone(), verifier.clone(), resolver.clone(), request);
                match &sessions {
                    Some(sessions) => guard.with_sessions(sessions.clone()),
                    None => guard,
                }
            }
        };
        registry.extend(config.guard.clone(), Arc::new(factory))?;

        info!(
            guard = %config.guard,
            liff_id_field = %config.fields.liff_id,
            sessions = config.session.is_some(),
            "LIFF auth initialized"
        );

        Ok(LiffAuth {
            config: Arc::new(config),
            verifier,
            resolver,
            registry,
        })
    }
}
