//! The collaborator seams: backend, profiles, navigation, notifications.
//!
//! Authgate does not implement authentication, profile lookup, routing,
//! or toasts — the host application (or its SDKs) does. These traits
//! define WHAT each collaborator can do without specifying HOW, which
//! lets production wire a real identity SDK, the demo wire an in-process
//! fake, and every test wire a scripted mock, all without touching the
//! state machine.

use std::fmt;

use authgate_token::UserId;
use tokio::sync::mpsc;

use crate::{Profile, SessionRecord};

// ---------------------------------------------------------------------------
// Backend authentication service
// ---------------------------------------------------------------------------

/// Sign-in credentials as entered by the user.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Debug deliberately omits the password so credentials can appear in
/// logs without leaking secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a backend call failed. The distinction matters: invalid
/// credentials and network failures are circuit-breaker material with
/// different user messaging; a terminal error ends the session
/// conversation entirely.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The backend rejected the credentials.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The call never completed — connectivity, timeout, DNS.
    #[error("network error: {0}")]
    Network(String),

    /// The backend reported an unrecoverable auth error (revoked
    /// client, disabled account, protocol violation).
    #[error("terminal auth error: {0}")]
    Terminal(String),

    /// Anything else the backend reported.
    #[error("{0}")]
    Other(String),
}

/// A push notification from the backend's session-change channel.
///
/// These arrive for logins, logouts, and token refreshes from ANY
/// source — this tab, another tab, or the backend's own refresh timer.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// A session was established.
    SignedIn(SessionRecord),

    /// The session ended. Note that some backends emit this
    /// transiently in the middle of a token refresh — which is exactly
    /// why the store holds it for a stability window before believing it.
    SignedOut,

    /// The session's tokens were replaced.
    TokenRefreshed(SessionRecord),
}

/// The identity backend, as this client sees it: five opaque RPCs and a
/// push channel.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` — the backend handle is shared across the
/// store actor and spawned fetch tasks for the application's lifetime.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges credentials for a session.
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<SessionRecord, BackendError>> + Send;

    /// Ends the current session on the backend.
    fn sign_out(
        &self,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Asks the backend whether a session currently exists.
    fn get_session(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, BackendError>> + Send;

    /// Exchanges the refresh token for fresh session tokens.
    fn refresh_session(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, BackendError>> + Send;

    /// Issues a session scoped to `target`, for administrator support
    /// flows. The caller keeps its own record for later restoration.
    fn impersonate(
        &self,
        target: &UserId,
    ) -> impl std::future::Future<Output = Result<SessionRecord, BackendError>> + Send;

    /// Tells the backend the impersonation session is over.
    fn end_impersonation(
        &self,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Returns the session-change notification channel.
    ///
    /// Called exactly once, when the store starts. Dropping the
    /// receiver (store shutdown) is the unsubscribe.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<BackendEvent>;
}

// ---------------------------------------------------------------------------
// Profile service
// ---------------------------------------------------------------------------

/// Fetches application-level user attributes.
///
/// Fetched once per session establishment and cached; `Ok(None)` means
/// the user authenticated but has no profile row, which the store
/// treats as an unrecoverable error.
pub trait ProfileService: Send + Sync + 'static {
    fn get_profile(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<Profile>, BackendError>> + Send;
}

// ---------------------------------------------------------------------------
// Navigation controller
// ---------------------------------------------------------------------------

/// Options for an in-app navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing.
    pub replace: bool,

    /// The path the user originally asked for, carried along so it can
    /// be restored after sign-in.
    pub return_to: Option<String>,
}

/// The host application's router.
///
/// Object-safe and synchronous: navigation is a fire-and-forget
/// instruction to the host, not something this library awaits.
pub trait Navigator: Send + Sync {
    /// In-app route change.
    fn navigate(&self, path: &str, options: NavigateOptions);

    /// Full document reload to `url`, discarding all in-memory state.
    /// Recovery uses this; ordinary flows never should.
    fn hard_navigate(&self, url: &str);

    /// The currently active path.
    fn current_path(&self) -> String;

    /// The `return_to` carried by the current route's state, if any.
    fn current_return_to(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// User-facing notification channel
// ---------------------------------------------------------------------------

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient toast/banner message. Fire-and-forget: there is no
/// acknowledgment contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Where user-facing notices go.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            email: "user@example.com".into(),
            password: "hunter2".into(),
        };

        let debug = format!("{credentials:?}");

        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_notice_constructors_set_level() {
        assert_eq!(Notice::info("a").level, NoticeLevel::Info);
        assert_eq!(Notice::success("b").level, NoticeLevel::Success);
        assert_eq!(Notice::warning("c").level, NoticeLevel::Warning);
        assert_eq!(Notice::error("d").level, NoticeLevel::Error);
    }
}
