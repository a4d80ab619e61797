//! Unified error type for the Authgate facade.

use authgate_guard::StorageError;
use authgate_session::SessionError;
use authgate_token::InvalidToken;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `authgate` meta-crate, callers deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute auto-generates `From` impls, so the `?` operator
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthGateError {
    /// A token failed structural validation.
    #[error(transparent)]
    Token(#[from] InvalidToken),

    /// Persisted client storage was unavailable.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A session-level error (sign-in, impersonation, store lifecycle).
    #[error(transparent)]
    Session(#[from] SessionError),
}
