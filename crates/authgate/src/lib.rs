//! # Authgate
//!
//! Client-side authentication session lifecycle for browser-style
//! applications: a race-free session state machine, a persisted circuit
//! breaker for failing sign-ins, a redirect-loop detector, structural
//! token validation, route guarding, and a recovery path that can reset
//! a wedged client.
//!
//! The identity backend, profile service, router, storage, and toast
//! channel are all traits the host application implements — Authgate
//! owns the *coordination*, not the collaborators.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use authgate::prelude::*;
//!
//! let client = AuthClient::builder()
//!     .login_path("/login")
//!     .build(backend, profiles, storage, navigator, notifier);
//!
//! // Subscribe to session state:
//! let mut state = client.state();
//!
//! // Guard the active route:
//! let guard = client.guard(Route::protected("/tickets"));
//! // render guard.current() ...
//! ```

mod client;
mod error;

pub use client::{AuthClient, AuthClientBuilder};
pub use error::AuthGateError;

// Re-export the sub-crate surface so hosts depend on one crate.
pub use authgate_guard::{
    keys, BreakerConfig, BreakerStatus, CircuitBreaker, LoopConfig,
    LoopDetector, LoopStatus, MemoryStorage, StateStorage, StorageError,
};
pub use authgate_nav::{
    evaluate, GuardConfig, GuardDecision, GuardHandle, GuardView, Route,
    RouteRequirement,
};
pub use authgate_session::{
    AuthBackend, BackendError, BackendEvent, Credentials, NavigateOptions,
    Navigator, Notice, NoticeLevel, Notifier, Profile, ProfileService,
    Role, SessionError, SessionRecord, SessionState, SessionStatus,
    StoreConfig,
};
pub use authgate_token::{
    is_stale, validate, validate_at, InvalidToken, TokenClaims, UserId,
};

/// Everything a typical host application needs.
pub mod prelude {
    pub use crate::{
        AuthBackend, AuthClient, AuthClientBuilder, AuthGateError,
        BackendError, BackendEvent, Credentials, GuardView, MemoryStorage,
        NavigateOptions, Navigator, Notice, NoticeLevel, Notifier, Profile,
        ProfileService, Role, Route, RouteRequirement, SessionRecord,
        SessionState, SessionStatus, StateStorage, UserId,
    };
}
