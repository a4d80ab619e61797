//! Error types for the session layer.

use crate::BackendError;

/// Errors the session store reports to its callers.
///
/// These cover the operations a host application invokes: sign-in,
/// sign-out, impersonation. Internal state transitions never surface as
/// errors — they surface as [`SessionState`](crate::SessionState)
/// values on the watch channel.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The circuit breaker is open; no network call was made.
    /// Surface the remaining seconds to the user as a countdown.
    #[error("too many failed attempts, retry in {remaining_secs}s")]
    CooldownActive {
        remaining_secs: u64,
        reason: Option<String>,
    },

    /// The backend rejected the credentials.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The backend call failed to complete.
    #[error("network error: {0}")]
    Network(String),

    /// The backend failed in some other way.
    #[error("backend error: {0}")]
    Backend(String),

    /// The user authenticated but their profile could not be loaded.
    #[error("profile unavailable: {0}")]
    ProfileUnavailable(String),

    /// The operation requires a signed-in session.
    #[error("not signed in")]
    NotAuthenticated,

    /// The operation requires the administrator role.
    #[error("requires administrator role")]
    NotPermitted,

    /// Impersonation was requested while already impersonating.
    #[error("already impersonating another user")]
    AlreadyImpersonating,

    /// End-impersonation was requested outside an impersonation session.
    #[error("not impersonating")]
    NotImpersonating,

    /// The store actor is gone (application teardown).
    #[error("session store is no longer running")]
    StoreClosed,
}

impl From<BackendError> for SessionError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::InvalidCredentials => Self::InvalidCredentials,
            BackendError::Network(cause) => Self::Network(cause),
            BackendError::Terminal(cause) | BackendError::Other(cause) => {
                Self::Backend(cause)
            }
        }
    }
}
