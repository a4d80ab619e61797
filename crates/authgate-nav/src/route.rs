//! Route descriptions and guard configuration.

use std::time::Duration;

use authgate_session::Role;

/// What a route demands of the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRequirement {
    /// Anyone, signed in or not. The login route itself is public.
    Public,

    /// Any signed-in user.
    Authenticated,

    /// A signed-in user whose role satisfies the given one.
    Role(Role),
}

/// One route as the guard sees it: a path and a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub requirement: RouteRequirement,
}

impl Route {
    /// A route anyone may visit.
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requirement: RouteRequirement::Public,
        }
    }

    /// A route requiring any signed-in user.
    pub fn protected(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requirement: RouteRequirement::Authenticated,
        }
    }

    /// A route requiring a specific role.
    pub fn role_gated(path: impl Into<String>, role: Role) -> Self {
        Self {
            path: path.into(),
            requirement: RouteRequirement::Role(role),
        }
    }
}

/// Tunables for the navigation guard.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Where unauthenticated visitors are sent.
    pub login_path: String,

    /// Where signed-in visitors land by default.
    pub home_path: String,

    /// How long a redirect is parked before it commits, absorbing any
    /// state flips already in flight.
    pub redirect_debounce: Duration,

    /// Extra random delay (0..max) added to each debounce, to
    /// desynchronize guards mounted at the same instant. Off by default.
    pub redirect_jitter: Option<Duration>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".into(),
            home_path: "/".into(),
            redirect_debounce: Duration::from_millis(300),
            redirect_jitter: None,
        }
    }
}
