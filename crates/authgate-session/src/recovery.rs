//! The recovery coordinator: the big red "start over" button.
//!
//! When the client has wedged itself — corrupted persisted state, a
//! breaker stuck open against a now-working backend, a session the
//! backend no longer recognizes — incremental fixes stop being worth
//! it. Recovery resets everything, and every step is independently
//! fault-tolerant: a failure in one step is logged and the sequence
//! continues, because the final hard navigation discards the page and
//! all its in-memory state anyway.

use std::sync::Arc;

use authgate_guard::{keys, CircuitBreaker, LoopDetector, StateStorage};
use tracing::{info, warn};

use crate::{AuthBackend, Navigator};

/// Orchestrates a full reset of session-related client state.
///
/// Step order (spread across the methods below so the session store can
/// interleave its own transition):
///
/// 1. Force-close the circuit breaker and clear the loop detector.
/// 2. Best-effort backend sign-out, ignoring network failure.
/// 3. Purge every persisted key this system owns.
/// 4. (The store commits `Unauthenticated` here.)
/// 5. Hard-navigate to the login route unless already there.
///
/// [`recover`](Self::recover) runs 1–3 and 5 for standalone use; the
/// store's `Recover` command is the normal entry point, which keeps the
/// state transition serialized with every other transition.
pub struct RecoveryCoordinator<B> {
    breaker: Arc<CircuitBreaker>,
    loops: Arc<LoopDetector>,
    storage: Arc<dyn StateStorage>,
    backend: Arc<B>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl<B: AuthBackend> RecoveryCoordinator<B> {
    pub fn new(
        breaker: Arc<CircuitBreaker>,
        loops: Arc<LoopDetector>,
        storage: Arc<dyn StateStorage>,
        backend: Arc<B>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            breaker,
            loops,
            storage,
            backend,
            navigator,
            login_path: login_path.into(),
        }
    }

    /// Runs the full reset and reports best-effort success.
    ///
    /// Returns `true` if the storage purge succeeded completely OR the
    /// hard navigation was issued — the reload is the ultimate reset,
    /// so an inaccessible storage does not make recovery a failure.
    pub async fn recover(&self) -> bool {
        info!("recovery started");
        self.close_guards();
        self.backend_sign_out().await;
        let purged = self.purge_storage();
        let navigated = self.redirect_to_login();
        purged || navigated
    }

    /// Step 1: force-close the breaker, clear redirect history.
    pub(crate) fn close_guards(&self) {
        self.breaker.reset();
        self.loops.reset();
    }

    /// Step 2: tell the backend, but don't let it stop us.
    pub(crate) async fn backend_sign_out(&self) {
        if let Err(error) = self.backend.sign_out().await {
            warn!(%error, "backend sign-out failed during recovery, continuing");
        }
    }

    /// Step 3: purge every owned key. Each key is attempted even if an
    /// earlier one fails. Returns `true` only if all succeeded.
    pub(crate) fn purge_storage(&self) -> bool {
        let mut all_purged = true;
        for key in keys::OWNED {
            if let Err(error) = self.storage.remove(key) {
                warn!(key, %error, "failed to purge key during recovery");
                all_purged = false;
            }
        }
        all_purged
    }

    /// Step 5: hard navigation to login, unless already there.
    /// Returns `true` if a navigation was issued.
    pub(crate) fn redirect_to_login(&self) -> bool {
        if self.navigator.current_path() == self.login_path {
            return false;
        }
        info!(to = %self.login_path, "recovery issuing hard navigation");
        self.navigator.hard_navigate(&self.login_path);
        true
    }
}
