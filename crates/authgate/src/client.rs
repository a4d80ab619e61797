//! `AuthClient` builder and handle.
//!
//! This is the entry point for host applications. It ties together all
//! the layers: guards → session store → navigation, instantiated once
//! per application lifetime and shared by reference.

use std::sync::Arc;

use authgate_guard::{
    BreakerConfig, BreakerStatus, CircuitBreaker, LoopConfig, LoopDetector,
    LoopStatus, StateStorage,
};
use authgate_nav::{spawn_guard, GuardConfig, GuardHandle, Route};
use authgate_session::{
    spawn_store, AuthBackend, Credentials, Navigator, Notifier,
    ProfileService, RecoveryCoordinator, SessionState, StoreConfig,
    StoreHandle,
};
use authgate_token::UserId;
use tokio::sync::watch;

use crate::AuthGateError;

/// Builder for configuring and starting an Authgate client.
///
/// Configuration is set on the builder; the collaborators are supplied
/// to [`build`](Self::build), which spawns the session store actor.
/// Must be called from within a Tokio runtime.
///
/// # Example
///
/// ```rust,ignore
/// use authgate::prelude::*;
///
/// let client = AuthClientBuilder::new()
///     .login_path("/login")
///     .home_path("/dashboard")
///     .build(backend, profiles, storage, navigator, notifier);
/// let mut state = client.state();
/// ```
pub struct AuthClientBuilder {
    store_config: StoreConfig,
    breaker_config: BreakerConfig,
    loop_config: LoopConfig,
    guard_config: GuardConfig,
}

impl AuthClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            store_config: StoreConfig::default(),
            breaker_config: BreakerConfig::default(),
            loop_config: LoopConfig::default(),
            guard_config: GuardConfig::default(),
        }
    }

    /// Sets the login route (default `/login`). Used by the navigation
    /// guard and by recovery's hard navigation.
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.guard_config.login_path = path.into();
        self
    }

    /// Sets the default signed-in landing route (default `/`).
    pub fn home_path(mut self, path: impl Into<String>) -> Self {
        self.guard_config.home_path = path.into();
        self
    }

    /// Replaces the session store configuration.
    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// Replaces the circuit breaker configuration.
    pub fn breaker_config(mut self, config: BreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Replaces the loop detector configuration.
    pub fn loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = config;
        self
    }

    /// Replaces the navigation guard configuration. Overrides any
    /// earlier [`login_path`](Self::login_path) /
    /// [`home_path`](Self::home_path) call.
    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.guard_config = config;
        self
    }

    /// Assembles the layers and spawns the session store actor.
    pub fn build<B, P>(
        self,
        backend: Arc<B>,
        profiles: Arc<P>,
        storage: Arc<dyn StateStorage>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> AuthClient
    where
        B: AuthBackend,
        P: ProfileService,
    {
        let breaker = Arc::new(CircuitBreaker::new(
            storage.clone(),
            self.breaker_config,
        ));
        let loops = Arc::new(LoopDetector::new(self.loop_config));
        let recovery = RecoveryCoordinator::new(
            breaker.clone(),
            loops.clone(),
            storage.clone(),
            backend.clone(),
            navigator.clone(),
            self.guard_config.login_path.clone(),
        );
        let store = spawn_store(
            backend,
            profiles,
            storage,
            breaker.clone(),
            recovery,
            notifier.clone(),
            self.store_config,
        );

        AuthClient {
            store,
            breaker,
            loops,
            navigator,
            notifier,
            guard_config: self.guard_config,
        }
    }
}

impl Default for AuthClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running Authgate client. Cheap to clone; one per
/// application, shared by reference to every consumer.
#[derive(Clone)]
pub struct AuthClient {
    store: StoreHandle,
    breaker: Arc<CircuitBreaker>,
    loops: Arc<LoopDetector>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    guard_config: GuardConfig,
}

impl AuthClient {
    /// Starts building a client.
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::new()
    }

    /// A subscription to committed session states.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.store.state()
    }

    /// The current committed session state.
    pub fn current(&self) -> SessionState {
        self.store.current()
    }

    /// Attempts a sign-in. Refused locally while the breaker is open.
    pub async fn sign_in(
        &self,
        credentials: Credentials,
    ) -> Result<(), AuthGateError> {
        self.store
            .sign_in(credentials)
            .await
            .map_err(AuthGateError::from)
    }

    /// Signs out, locally even if the backend is unreachable.
    pub async fn sign_out(&self) -> Result<(), AuthGateError> {
        self.store.sign_out().await.map_err(AuthGateError::from)
    }

    /// Starts impersonating `target` (administrator only).
    pub async fn impersonate(
        &self,
        target: UserId,
    ) -> Result<(), AuthGateError> {
        self.store
            .impersonate(target)
            .await
            .map_err(AuthGateError::from)
    }

    /// Ends impersonation, restoring the administrator's identity.
    pub async fn end_impersonation(&self) -> Result<(), AuthGateError> {
        self.store
            .end_impersonation()
            .await
            .map_err(AuthGateError::from)
    }

    /// Runs the full recovery sequence; returns best-effort success.
    pub async fn recover(&self) -> bool {
        self.store.recover().await
    }

    /// Tells the store the page became visible again.
    pub async fn page_visible(&self) {
        self.store.page_visible().await;
    }

    /// Read-only breaker state, for countdown display. Display only —
    /// the store remains the sole consumer that acts on it.
    pub fn breaker_status(&self) -> BreakerStatus {
        self.breaker.status()
    }

    /// Read-only loop detector state, for diagnostics display.
    pub fn loop_status(&self) -> LoopStatus {
        self.loops.status()
    }

    /// Mounts a navigation guard for the active route. Call
    /// [`GuardHandle::stop`] when the route unmounts.
    pub fn guard(&self, route: Route) -> GuardHandle {
        spawn_guard(
            route,
            self.store.state(),
            self.loops.clone(),
            self.navigator.clone(),
            self.notifier.clone(),
            self.guard_config.clone(),
        )
    }

    /// Stops the session store actor. The client is unusable afterward.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}
