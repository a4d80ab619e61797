//! The session store actor: the state machine that owns "signed in".
//!
//! Session truth arrives from several asynchronous directions at once —
//! boot-time restoration, manual sign-in, backend push notifications,
//! page visibility changes — and they race. The store serializes all of
//! them through one actor task, so exactly one transition is considered
//! at a time and subscribers only ever see committed states.
//!
//! # Stability policy (debounce-with-memory)
//!
//! Some backends emit a transient "signed out" in the middle of a token
//! refresh. Believing it immediately would bounce a legitimately
//! signed-in user to the login page. So a proposal that would *lower*
//! the current state is parked for a short stability window and
//! discarded if a contradicting higher proposal arrives first. Three
//! things skip the window: upgrades, `Error` transitions, and the
//! user's own sign-out — clicking "sign out" is not a blip.
//!
//! # Supersession
//!
//! Profile fetches run as spawned tasks tagged with a generation
//! number. Any newer inbound event bumps the generation; a stale
//! fetch's result is dropped when it arrives. Nothing is force-killed —
//! the abandoned task finishes and its result is simply a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use authgate_guard::{keys, CircuitBreaker, StateStorage};
use authgate_token::{
    is_stale, unix_now, validate, validate_at, UserId, DEFAULT_MAX_TOKEN_AGE,
};
use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    AuthBackend, BackendError, BackendEvent, Credentials, Notice, Notifier,
    Profile, ProfileService, RecoveryCoordinator, Role, SessionError,
    SessionRecord, SessionState,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a downgrade proposal is parked before it commits.
    pub stability_window: Duration,

    /// Tokens whose `iat` is older than this get refreshed when the
    /// page becomes visible, even if they are technically unexpired.
    pub max_token_age: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stability_window: Duration::from_secs(1),
            max_token_age: DEFAULT_MAX_TOKEN_AGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and internal messages
// ---------------------------------------------------------------------------

/// Operations sent to the store actor through its channel.
///
/// The `oneshot::Sender` in most variants is the reply channel — the
/// handle sends a command and awaits the response.
pub(crate) enum StoreCommand {
    SignIn {
        credentials: Credentials,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SignOut {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Impersonate {
        target: UserId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    EndImpersonation {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Recover {
        reply: oneshot::Sender<bool>,
    },
    /// The page became visible again; re-check token freshness.
    PageVisible,
    Shutdown,
}

/// The result of a spawned profile fetch, tagged with the generation it
/// was started under.
struct ProfileFetch {
    generation: u64,
    record: SessionRecord,
    outcome: Result<Option<Profile>, BackendError>,
}

/// A downgrade held for the stability window.
struct PendingTransition {
    state: SessionState,
    deadline: Instant,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to the running store actor. Cheap to clone.
#[derive(Clone)]
pub struct StoreHandle {
    commands: mpsc::Sender<StoreCommand>,
    state: watch::Receiver<SessionState>,
}

impl StoreHandle {
    /// A fresh subscription to committed session states.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// The current committed state.
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Attempts a sign-in. Refused locally (no network call) while the
    /// circuit breaker is open.
    pub async fn sign_in(
        &self,
        credentials: Credentials,
    ) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::SignIn { credentials, reply })
            .await
    }

    /// Signs out. Always succeeds locally, even if the backend call
    /// fails — an unreachable backend must not trap the user in a
    /// session.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::SignOut { reply }).await
    }

    /// Starts impersonating `target`. Requires the administrator role.
    pub async fn impersonate(
        &self,
        target: UserId,
    ) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::Impersonate { target, reply })
            .await
    }

    /// Ends impersonation and restores the administrator's identity.
    pub async fn end_impersonation(&self) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::EndImpersonation { reply })
            .await
    }

    /// Runs the full recovery sequence. Returns best-effort success.
    pub async fn recover(&self) -> bool {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(StoreCommand::Recover { reply })
            .await
            .is_err()
        {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Notifies the store that the page became visible again.
    pub async fn page_visible(&self) {
        let _ = self.commands.send(StoreCommand::PageVisible).await;
    }

    /// Stops the actor. Pending timers are dropped with it.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(StoreCommand::Shutdown).await;
    }

    async fn request(
        &self,
        command: impl FnOnce(
            oneshot::Sender<Result<(), SessionError>>,
        ) -> StoreCommand,
    ) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::StoreClosed)?;
        response.await.map_err(|_| SessionError::StoreClosed)?
    }
}

/// Spawns the store actor and returns a handle to it.
///
/// Subscribes to the backend's session-change channel before the actor
/// starts, so no notification can slip past during startup.
pub fn spawn_store<B, P>(
    backend: Arc<B>,
    profiles: Arc<P>,
    storage: Arc<dyn StateStorage>,
    breaker: Arc<CircuitBreaker>,
    recovery: RecoveryCoordinator<B>,
    notifier: Arc<dyn Notifier>,
    config: StoreConfig,
) -> StoreHandle
where
    B: AuthBackend,
    P: ProfileService,
{
    let (commands, cmd_rx) = mpsc::channel(32);
    let (state_tx, state_rx) = watch::channel(SessionState::Loading);
    let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
    let events = backend.subscribe();

    let actor = StoreActor {
        backend,
        profiles,
        storage,
        breaker,
        recovery,
        notifier,
        config,
        state_tx,
        cmd_rx,
        events,
        fetch_tx,
        fetch_rx,
        generation: 0,
        pending: None,
        profile_cache: HashMap::new(),
    };

    tokio::spawn(actor.run());

    StoreHandle {
        commands,
        state: state_rx,
    }
}

// ---------------------------------------------------------------------------
// The actor
// ---------------------------------------------------------------------------

struct StoreActor<B: AuthBackend, P: ProfileService> {
    backend: Arc<B>,
    profiles: Arc<P>,
    storage: Arc<dyn StateStorage>,
    breaker: Arc<CircuitBreaker>,
    recovery: RecoveryCoordinator<B>,
    notifier: Arc<dyn Notifier>,
    config: StoreConfig,
    state_tx: watch::Sender<SessionState>,
    cmd_rx: mpsc::Receiver<StoreCommand>,
    events: mpsc::UnboundedReceiver<BackendEvent>,
    fetch_tx: mpsc::UnboundedSender<ProfileFetch>,
    fetch_rx: mpsc::UnboundedReceiver<ProfileFetch>,
    /// Bumped on every inbound event that starts or supersedes a fetch.
    generation: u64,
    /// At most one downgrade can be parked at a time.
    pending: Option<PendingTransition>,
    /// Profiles already fetched this session, by user.
    profile_cache: HashMap<UserId, Profile>,
}

impl<B: AuthBackend, P: ProfileService> StoreActor<B, P> {
    async fn run(mut self) {
        info!("session store started");
        self.boot().await;

        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        None | Some(StoreCommand::Shutdown) => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                Some(event) = self.events.recv() => {
                    self.handle_event(event);
                }
                Some(fetch) = self.fetch_rx.recv() => {
                    self.handle_fetch(fetch);
                }
                () = wait_until(deadline) => {
                    self.commit_pending();
                }
            }
        }

        info!("session store stopped");
    }

    // -- Boot --------------------------------------------------------------

    /// Determines the initial state: restore a persisted session, ask
    /// the backend, or settle on `Unauthenticated`.
    async fn boot(&mut self) {
        if let Some(record) = self.restore_persisted() {
            if let Some(profile) = self.load_cached_profile(&record.user_id) {
                debug!(user_id = %record.user_id, "restored session and cached profile");
                self.profile_cache
                    .insert(profile.user_id.clone(), profile.clone());
                self.commit(SessionState::Authenticated { record, profile });
            } else {
                self.start_profile_fetch(record);
            }
            return;
        }

        match self.backend.get_session().await {
            Ok(Some(record)) => match validate(&record.access_token) {
                Ok(_) => self.adopt_session(record),
                Err(error) => {
                    warn!(%error, "backend session failed validation at boot");
                    self.commit(SessionState::Unauthenticated);
                }
            },
            Ok(None) => self.commit(SessionState::Unauthenticated),
            Err(error) => {
                // No local session and the backend is unreachable:
                // there is nothing to protect, so signed-out it is.
                warn!(%error, "session check failed at boot, treating as signed out");
                self.commit(SessionState::Unauthenticated);
            }
        }
    }

    /// Reads the persisted session record, discarding anything
    /// unreadable or structurally invalid. A corrupted token is treated
    /// as absence of a session — no breaker penalty, it was never the
    /// user's doing.
    fn restore_persisted(&mut self) -> Option<SessionRecord> {
        let raw = match self.storage.get(keys::SESSION_RECORD) {
            Ok(value) => value?,
            Err(error) => {
                warn!(%error, "storage unreadable at boot");
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "discarding unreadable session record");
                self.purge_session_keys();
                return None;
            }
        };

        match validate(&record.access_token) {
            Ok(_) => Some(record),
            Err(error) => {
                info!(%error, "persisted token no longer valid, clearing");
                self.purge_session_keys();
                None
            }
        }
    }

    // -- Command handling --------------------------------------------------

    async fn handle_command(&mut self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::SignIn { credentials, reply } => {
                let result = self.handle_sign_in(credentials).await;
                let _ = reply.send(result);
            }
            StoreCommand::SignOut { reply } => {
                let result = self.handle_sign_out().await;
                let _ = reply.send(result);
            }
            StoreCommand::Impersonate { target, reply } => {
                let result = self.handle_impersonate(target).await;
                let _ = reply.send(result);
            }
            StoreCommand::EndImpersonation { reply } => {
                let result = self.handle_end_impersonation().await;
                let _ = reply.send(result);
            }
            StoreCommand::Recover { reply } => {
                let result = self.handle_recover().await;
                let _ = reply.send(result);
            }
            StoreCommand::PageVisible => self.handle_page_visible().await,
            // Shutdown is intercepted in run() before dispatch.
            StoreCommand::Shutdown => {}
        }
    }

    async fn handle_sign_in(
        &mut self,
        credentials: Credentials,
    ) -> Result<(), SessionError> {
        let breaker_status = self.breaker.status();
        if breaker_status.open {
            let remaining_secs = breaker_status.remaining_secs();
            debug!(remaining_secs, "sign-in refused, circuit breaker open");
            self.notifier.notify(Notice::warning(format!(
                "Too many failed sign-in attempts. Try again in {remaining_secs} seconds."
            )));
            return Err(SessionError::CooldownActive {
                remaining_secs,
                reason: breaker_status.reason,
            });
        }

        match self.backend.sign_in(&credentials).await {
            Ok(record) => {
                if let Err(error) = validate(&record.access_token) {
                    // The backend handed us a malformed token. Not the
                    // user's failure — no breaker penalty.
                    warn!(%error, "sign-in returned a token that fails validation");
                    return Err(SessionError::Backend(error.to_string()));
                }
                self.breaker.record_success();
                info!(user_id = %record.user_id, "sign-in succeeded");
                self.notifier.notify(Notice::success("Signed in."));
                self.adopt_session(record);
                Ok(())
            }
            Err(BackendError::Terminal(cause)) => {
                warn!(%cause, "backend reported a terminal auth error");
                self.commit(SessionState::Error {
                    cause: cause.clone(),
                });
                Err(SessionError::Backend(cause))
            }
            Err(error) => {
                let failure = SessionError::from(error);
                let status =
                    self.breaker.record_failure(&failure.to_string());
                if status.open {
                    self.notifier.notify(Notice::warning(format!(
                        "Too many failed sign-in attempts. Try again in {} seconds.",
                        status.remaining_secs()
                    )));
                } else {
                    self.notifier.notify(Notice::error(failure.to_string()));
                }
                Err(failure)
            }
        }
    }

    async fn handle_sign_out(&mut self) -> Result<(), SessionError> {
        if let Err(error) = self.backend.sign_out().await {
            warn!(%error, "backend sign-out failed, signing out locally anyway");
        }
        self.profile_cache.clear();
        self.generation += 1; // abandon any in-flight fetch
        // Explicit sign-out bypasses the stability window: the user
        // asked for this, it is not a refresh blip.
        self.commit(SessionState::Unauthenticated);
        Ok(())
    }

    async fn handle_impersonate(
        &mut self,
        target: UserId,
    ) -> Result<(), SessionError> {
        let current = self.state_tx.borrow().clone();
        match current {
            SessionState::Authenticated { record, profile } => {
                if !profile.role.allows(Role::Admin) {
                    return Err(SessionError::NotPermitted);
                }

                let span = impersonation_id();
                info!(
                    admin = %profile.user_id,
                    target = %target,
                    impersonation = %span,
                    "starting impersonation"
                );

                let target_record = self
                    .backend
                    .impersonate(&target)
                    .await
                    .map_err(SessionError::from)?;
                validate(&target_record.access_token)
                    .map_err(|e| SessionError::Backend(e.to_string()))?;

                let target_profile =
                    match self.profiles.get_profile(&target).await {
                        Ok(Some(profile)) => profile,
                        Ok(None) => {
                            return Err(SessionError::ProfileUnavailable(
                                format!("no profile for {target}"),
                            ));
                        }
                        Err(error) => {
                            return Err(SessionError::ProfileUnavailable(
                                error.to_string(),
                            ));
                        }
                    };

                self.profile_cache
                    .insert(target.clone(), target_profile.clone());
                self.commit(SessionState::Impersonating {
                    record: target_record,
                    profile: target_profile,
                    original: Box::new((record, profile)),
                });
                Ok(())
            }
            SessionState::Impersonating { .. } => {
                Err(SessionError::AlreadyImpersonating)
            }
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    async fn handle_end_impersonation(
        &mut self,
    ) -> Result<(), SessionError> {
        let current = self.state_tx.borrow().clone();
        let SessionState::Impersonating { original, .. } = current else {
            return Err(SessionError::NotImpersonating);
        };

        if let Err(error) = self.backend.end_impersonation().await {
            warn!(%error, "backend end-impersonation failed, restoring locally anyway");
        }

        let (record, profile) = *original;
        if validate(&record.access_token).is_ok() {
            info!(user_id = %record.user_id, "impersonation ended, identity restored");
            self.commit(SessionState::Authenticated { record, profile });
            return Ok(());
        }

        // The administrator's own token aged out while impersonating.
        debug!("administrator token expired during impersonation, refreshing");
        match self.backend.refresh_session().await {
            Ok(Some(fresh)) if validate(&fresh.access_token).is_ok() => {
                self.commit(SessionState::Authenticated {
                    record: fresh,
                    profile,
                });
                Ok(())
            }
            Ok(_) => {
                let cause =
                    "could not restore administrator session".to_string();
                self.commit(SessionState::Error {
                    cause: cause.clone(),
                });
                Err(SessionError::Backend(cause))
            }
            Err(error) => {
                self.commit(SessionState::Error {
                    cause: format!(
                        "could not restore administrator session: {error}"
                    ),
                });
                Err(SessionError::from(error))
            }
        }
    }

    async fn handle_recover(&mut self) -> bool {
        info!("recovery requested");
        self.recovery.close_guards();
        self.recovery.backend_sign_out().await;
        let purged = self.recovery.purge_storage();
        self.profile_cache.clear();
        self.generation += 1;
        self.commit(SessionState::Unauthenticated);
        let navigated = self.recovery.redirect_to_login();
        purged || navigated
    }

    /// The page became visible again. After a long device sleep the
    /// token may be expired or suspiciously old; refresh it in the
    /// background. A failed refresh goes to `Error` — never silently to
    /// `Unauthenticated`.
    async fn handle_page_visible(&mut self) {
        let record = match self.state_tx.borrow().record() {
            Some(record) => record.clone(),
            None => return,
        };

        let now = unix_now();
        let needs_refresh = match validate_at(&record.access_token, now) {
            Ok(claims) => is_stale(&claims, now, self.config.max_token_age),
            Err(_) => true,
        };
        if !needs_refresh {
            return;
        }

        debug!("token expired or stale after wake, refreshing");
        match self.backend.refresh_session().await {
            Ok(Some(fresh)) if validate(&fresh.access_token).is_ok() => {
                self.adopt_session(fresh);
            }
            Ok(Some(_)) => {
                self.commit(SessionState::Error {
                    cause: "refresh returned an invalid token".into(),
                });
            }
            Ok(None) => {
                self.commit(SessionState::Error {
                    cause: "session lost during refresh".into(),
                });
            }
            Err(error) => {
                warn!(%error, "background refresh failed");
                self.commit(SessionState::Error {
                    cause: format!("background refresh failed: {error}"),
                });
            }
        }
    }

    // -- Backend events ----------------------------------------------------

    fn handle_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::SignedIn(record)
            | BackendEvent::TokenRefreshed(record) => {
                match validate(&record.access_token) {
                    Ok(_) => self.adopt_session(record),
                    Err(error) => {
                        warn!(%error, "ignoring session event with invalid token");
                    }
                }
            }
            BackendEvent::SignedOut => {
                self.propose_downgrade(SessionState::Unauthenticated);
            }
        }
    }

    /// A validated record arrived (sign-in, boot, push, refresh).
    /// Commit immediately if the profile is already known; otherwise
    /// start a generation-tagged fetch.
    fn adopt_session(&mut self, record: SessionRecord) {
        let current = self.state_tx.borrow().clone();
        match current {
            SessionState::Impersonating {
                record: active,
                profile,
                original,
            } => {
                if profile.user_id == record.user_id {
                    // Token refresh for the impersonated session.
                    self.commit(SessionState::Impersonating {
                        record,
                        profile,
                        original,
                    });
                } else if original.0.user_id == record.user_id {
                    // Refresh of the retained administrator session:
                    // fold it into the kept identity, stay impersonating.
                    let admin_profile = original.1;
                    self.commit(SessionState::Impersonating {
                        record: active,
                        profile,
                        original: Box::new((record, admin_profile)),
                    });
                } else {
                    // A different user signed in underneath us.
                    self.adopt_fresh(record);
                }
            }
            _ => self.adopt_fresh(record),
        }
    }

    fn adopt_fresh(&mut self, record: SessionRecord) {
        if let Some(profile) =
            self.profile_cache.get(&record.user_id).cloned()
        {
            self.commit(SessionState::Authenticated { record, profile });
        } else {
            self.start_profile_fetch(record);
        }
    }

    fn start_profile_fetch(&mut self, record: SessionRecord) {
        // Fresh session evidence contradicts any parked downgrade.
        self.pending = None;
        self.generation += 1;
        let generation = self.generation;
        debug!(user_id = %record.user_id, generation, "fetching profile");

        let profiles = Arc::clone(&self.profiles);
        let results = self.fetch_tx.clone();
        tokio::spawn(async move {
            let outcome = profiles.get_profile(&record.user_id).await;
            // Receiver gone means the store shut down mid-fetch.
            let _ = results.send(ProfileFetch {
                generation,
                record,
                outcome,
            });
        });
    }

    fn handle_fetch(&mut self, fetch: ProfileFetch) {
        if fetch.generation != self.generation {
            debug!(
                generation = fetch.generation,
                current = self.generation,
                "discarding superseded profile fetch"
            );
            return;
        }

        match fetch.outcome {
            Ok(Some(profile)) => {
                self.profile_cache
                    .insert(profile.user_id.clone(), profile.clone());
                self.commit(SessionState::Authenticated {
                    record: fetch.record,
                    profile,
                });
            }
            Ok(None) => {
                warn!(user_id = %fetch.record.user_id, "no profile for signed-in user");
                self.commit(SessionState::Error {
                    cause: "profile not found for signed-in user".into(),
                });
            }
            Err(error) => {
                warn!(%error, "profile fetch failed");
                self.commit(SessionState::Error {
                    cause: format!("profile fetch failed: {error}"),
                });
            }
        }
    }

    // -- Transitions -------------------------------------------------------

    /// Routes a proposal through the stability policy: a downgrade from
    /// a signed-in state is parked; everything else commits now.
    fn propose_downgrade(&mut self, next: SessionState) {
        let current = self.state_tx.borrow().status();
        if current.is_signed_in()
            && next.status().rank() < current.rank()
        {
            debug!(
                from = %current,
                to = %next.status(),
                window_ms = self.config.stability_window.as_millis() as u64,
                "parking downgrade for stability window"
            );
            self.pending = Some(PendingTransition {
                state: next,
                deadline: Instant::now() + self.config.stability_window,
            });
        } else {
            self.commit(next);
        }
    }

    fn commit_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("stability window elapsed, committing parked transition");
            self.commit(pending.state);
        }
    }

    /// Applies a state, keeping persisted storage in sync and clearing
    /// any parked downgrade (a commit at this point either IS the
    /// parked transition or contradicts it).
    fn commit(&mut self, next: SessionState) {
        self.pending = None;

        match &next {
            SessionState::Authenticated { record, profile }
            | SessionState::Impersonating {
                record, profile, ..
            } => {
                self.persist_record(record);
                self.persist_profile(profile);
            }
            SessionState::Unauthenticated => self.purge_session_keys(),
            SessionState::Loading | SessionState::Error { .. } => {}
        }

        let from = self.state_tx.borrow().status();
        let to = next.status();
        if from != to {
            info!(%from, %to, "session state changed");
        }
        self.state_tx.send_replace(next);
    }

    // -- Persistence -------------------------------------------------------

    fn persist_record(&self, record: &SessionRecord) {
        if let Ok(raw) = serde_json::to_string(record) {
            if let Err(error) = self.storage.set(keys::SESSION_RECORD, &raw)
            {
                warn!(%error, "session record not persisted");
            }
        }
    }

    fn persist_profile(&self, profile: &Profile) {
        if let Ok(raw) = serde_json::to_string(profile) {
            if let Err(error) = self.storage.set(keys::PROFILE_CACHE, &raw)
            {
                warn!(%error, "profile cache not persisted");
            }
        }
    }

    fn purge_session_keys(&self) {
        for key in [keys::SESSION_RECORD, keys::PROFILE_CACHE] {
            if let Err(error) = self.storage.remove(key) {
                warn!(key, %error, "failed to purge session key");
            }
        }
    }

    fn load_cached_profile(&self, user_id: &UserId) -> Option<Profile> {
        let raw = self.storage.get(keys::PROFILE_CACHE).ok()??;
        let profile: Profile = serde_json::from_str(&raw).ok()?;
        // A cached profile for a different user is stale, not useful.
        (profile.user_id == *user_id).then_some(profile)
    }
}

/// Sleeps until `deadline`, or forever when there is none — the
/// pend-forever branch lets `select!` ignore the stability timer while
/// nothing is parked.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Random 16-character hex id correlating the start and end of an
/// impersonation span in logs.
fn impersonation_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
