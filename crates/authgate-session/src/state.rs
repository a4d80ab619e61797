//! The observable session state and its ordering.

use std::fmt;

use crate::{Profile, SessionRecord};

/// The session state machine's current position, with everything a
/// consumer needs to render it.
///
/// Carrying the record and profile inside the variants makes the
/// central invariant structural: there is no way to be `Authenticated`
/// without a record, because the variant won't construct without one.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Boot-time determination in progress. Nothing is known yet;
    /// consumers should render an interstitial, not redirect.
    Loading,

    /// No session. The only state a user can sign in from.
    Unauthenticated,

    /// A live session with a loaded profile.
    Authenticated {
        record: SessionRecord,
        profile: Profile,
    },

    /// An administrator is working as another user. `record` and
    /// `profile` describe the impersonated user; `original` retains the
    /// administrator's own identity for restoration.
    Impersonating {
        record: SessionRecord,
        profile: Profile,
        original: Box<(SessionRecord, Profile)>,
    },

    /// Something unrecoverable happened (profile fetch failed, refresh
    /// failed, terminal backend error). The only way forward is
    /// recovery; the cause is for display.
    Error { cause: String },
}

impl SessionState {
    /// The payload-free status, for comparisons and display.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Loading => SessionStatus::Loading,
            Self::Unauthenticated => SessionStatus::Unauthenticated,
            Self::Authenticated { .. } => SessionStatus::Authenticated,
            Self::Impersonating { .. } => SessionStatus::Impersonating,
            Self::Error { .. } => SessionStatus::Error,
        }
    }

    /// The active session record, if signed in.
    pub fn record(&self) -> Option<&SessionRecord> {
        match self {
            Self::Authenticated { record, .. }
            | Self::Impersonating { record, .. } => Some(record),
            _ => None,
        }
    }

    /// The active profile, if signed in.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated { profile, .. }
            | Self::Impersonating { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

/// The five observable statuses. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
    Error,
    Impersonating,
}

impl SessionStatus {
    /// Ordering used by the stability policy: a transition proposal to
    /// a lower rank than the current state is a "downgrade" and gets
    /// held for the stability window. Both signed-in statuses rank
    /// equally — swapping between them is never a downgrade.
    pub fn rank(self) -> u8 {
        match self {
            Self::Unauthenticated | Self::Error => 0,
            Self::Loading => 1,
            Self::Authenticated | Self::Impersonating => 2,
        }
    }

    /// Whether a user is signed in (normally or via impersonation).
    pub fn is_signed_in(self) -> bool {
        matches!(self, Self::Authenticated | Self::Impersonating)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Error => write!(f, "error"),
            Self::Impersonating => write!(f, "impersonating"),
        }
    }
}
