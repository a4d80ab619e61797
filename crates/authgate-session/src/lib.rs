//! Session lifecycle management for Authgate.
//!
//! This crate is the heart of the system: a state-machine actor that
//! reconciles asynchronous, out-of-order events — backend session
//! notifications, manual sign-in, boot-time restoration, page
//! visibility changes — into one consistent, race-free answer to
//! "is the user signed in right now?".
//!
//! 1. **Collaborator seams** — the [`AuthBackend`], [`ProfileService`],
//!    [`Navigator`] and [`Notifier`] traits. The backend is an opaque
//!    RPC peer; this crate never sees a wire format.
//! 2. **The store** — [`spawn_store`] launches the actor; a
//!    [`StoreHandle`] sends it operations and a `watch` channel
//!    publishes every committed [`SessionState`].
//! 3. **Recovery** — [`RecoveryCoordinator`] resets everything back to
//!    a clean signed-out state when the client has wedged itself.
//!
//! # How it fits in the stack
//!
//! ```text
//! Navigation layer (above)  ← renders/redirects based on published state
//!     ↕
//! Session layer (this crate)  ← owns the state machine and all persistence
//!     ↕
//! Guard layer (below)  ← circuit breaker consulted before each sign-in
//! ```
//!
//! # The one rule that matters
//!
//! An authenticated user is never signed out by a flaky network. Leaving
//! `Authenticated` happens on explicit sign-out, on a backend signed-out
//! notification that survives the stability window, or through recovery —
//! a failed background refresh lands in `Error`, where the user keeps
//! their session and gets a recovery affordance instead.

mod error;
mod profile;
mod record;
mod recovery;
mod state;
mod store;
mod traits;

pub use error::SessionError;
pub use profile::{Profile, Role};
pub use record::SessionRecord;
pub use recovery::RecoveryCoordinator;
pub use state::{SessionState, SessionStatus};
pub use store::{spawn_store, StoreConfig, StoreHandle};
pub use traits::{
    AuthBackend, BackendError, BackendEvent, Credentials, NavigateOptions,
    Navigator, Notice, NoticeLevel, Notifier, ProfileService,
};
