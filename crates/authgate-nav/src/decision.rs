//! The pure routing decision.
//!
//! Everything timing-related (debounce, loop suppression) lives in the
//! guard actor; the decision itself is a synchronous function of the
//! committed session state and the route, which makes the whole table
//! unit-testable without a runtime.

use authgate_session::{Profile, SessionState};

use crate::{GuardConfig, Route, RouteRequirement};

/// What the guard should do for a route, given a session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the route's content.
    Render,

    /// Render a transient loading view; do not redirect while the
    /// session determination is still in flight.
    Interstitial,

    /// Send the visitor to login, remembering where they were headed.
    RedirectToLogin { return_to: String },

    /// Send the visitor to `path` — used to bounce signed-in users off
    /// the login route, back to what they originally asked for.
    RedirectTo { path: String },

    /// Signed in, but the role requirement failed: send home with a
    /// denial notice.
    Denied,

    /// The session is in the error state: render the recovery
    /// affordance regardless of route.
    Recovery,
}

/// Decides what to do for `route` under `state`.
///
/// `return_to` is the originally-requested path carried by the current
/// route's navigation state, if any — captured when an earlier guard
/// redirected to login.
pub fn evaluate(
    state: &SessionState,
    route: &Route,
    return_to: Option<&str>,
    config: &GuardConfig,
) -> GuardDecision {
    match state {
        SessionState::Loading => GuardDecision::Interstitial,
        SessionState::Error { .. } => GuardDecision::Recovery,
        SessionState::Unauthenticated => match route.requirement {
            RouteRequirement::Public => GuardDecision::Render,
            _ => GuardDecision::RedirectToLogin {
                return_to: route.path.clone(),
            },
        },
        SessionState::Authenticated { profile, .. } => {
            signed_in(profile, false, route, return_to, config)
        }
        SessionState::Impersonating { profile, .. } => {
            signed_in(profile, true, route, return_to, config)
        }
    }
}

fn signed_in(
    profile: &Profile,
    impersonating: bool,
    route: &Route,
    return_to: Option<&str>,
    config: &GuardConfig,
) -> GuardDecision {
    // A signed-in user has no business on the login route: send them
    // to wherever they were originally headed, or home.
    if route.path == config.login_path {
        return GuardDecision::RedirectTo {
            path: return_to.unwrap_or(&config.home_path).to_owned(),
        };
    }

    if let RouteRequirement::Role(required) = &route.requirement {
        // Impersonation intentionally narrows privilege: support staff
        // should see exactly what the impersonated user sees, so the
        // denial path is skipped rather than bouncing them home.
        if !impersonating && !profile.role.allows(*required) {
            return GuardDecision::Denied;
        }
    }

    GuardDecision::Render
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_session::{Role, SessionRecord};
    use authgate_token::UserId;

    fn record(user: &str) -> SessionRecord {
        SessionRecord {
            access_token: "a.b.c".into(),
            refresh_token: "r".into(),
            issued_at: 0,
            expires_at: i64::MAX,
            user_id: UserId::from(user),
        }
    }

    fn profile(user: &str, role: Role) -> Profile {
        Profile {
            user_id: UserId::from(user),
            role,
            display_name: user.into(),
            locale: "en-US".into(),
            company_id: None,
        }
    }

    fn authenticated(role: Role) -> SessionState {
        SessionState::Authenticated {
            record: record("u-1"),
            profile: profile("u-1", role),
        }
    }

    fn impersonating(role: Role) -> SessionState {
        SessionState::Impersonating {
            record: record("u-2"),
            profile: profile("u-2", role),
            original: Box::new((record("u-1"), profile("u-1", Role::Admin))),
        }
    }

    fn config() -> GuardConfig {
        GuardConfig::default()
    }

    // =====================================================================
    // Loading and error states dominate everything
    // =====================================================================

    #[test]
    fn test_evaluate_loading_renders_interstitial_everywhere() {
        for route in [
            Route::public("/login"),
            Route::protected("/tickets"),
            Route::role_gated("/builder", Role::Admin),
        ] {
            assert_eq!(
                evaluate(&SessionState::Loading, &route, None, &config()),
                GuardDecision::Interstitial
            );
        }
    }

    #[test]
    fn test_evaluate_error_state_shows_recovery_everywhere() {
        let error = SessionState::Error { cause: "x".into() };
        for route in [Route::public("/login"), Route::protected("/tickets")] {
            assert_eq!(
                evaluate(&error, &route, None, &config()),
                GuardDecision::Recovery
            );
        }
    }

    // =====================================================================
    // Unauthenticated
    // =====================================================================

    #[test]
    fn test_evaluate_unauthenticated_renders_public_route() {
        assert_eq!(
            evaluate(
                &SessionState::Unauthenticated,
                &Route::public("/login"),
                None,
                &config()
            ),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_evaluate_unauthenticated_protected_redirects_with_path() {
        assert_eq!(
            evaluate(
                &SessionState::Unauthenticated,
                &Route::protected("/tickets/42"),
                None,
                &config()
            ),
            GuardDecision::RedirectToLogin {
                return_to: "/tickets/42".into()
            }
        );
    }

    #[test]
    fn test_evaluate_unauthenticated_role_gated_redirects_to_login() {
        assert!(matches!(
            evaluate(
                &SessionState::Unauthenticated,
                &Route::role_gated("/builder", Role::Admin),
                None,
                &config()
            ),
            GuardDecision::RedirectToLogin { .. }
        ));
    }

    // =====================================================================
    // Signed in
    // =====================================================================

    #[test]
    fn test_evaluate_signed_in_renders_protected_route() {
        assert_eq!(
            evaluate(
                &authenticated(Role::Customer),
                &Route::protected("/tickets"),
                None,
                &config()
            ),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_evaluate_signed_in_on_login_redirects_home() {
        assert_eq!(
            evaluate(
                &authenticated(Role::Customer),
                &Route::public("/login"),
                None,
                &config()
            ),
            GuardDecision::RedirectTo { path: "/".into() }
        );
    }

    #[test]
    fn test_evaluate_signed_in_on_login_prefers_captured_path() {
        assert_eq!(
            evaluate(
                &authenticated(Role::Customer),
                &Route::public("/login"),
                Some("/tickets/42"),
                &config()
            ),
            GuardDecision::RedirectTo {
                path: "/tickets/42".into()
            }
        );
    }

    #[test]
    fn test_evaluate_role_requirement_denies_lower_role() {
        assert_eq!(
            evaluate(
                &authenticated(Role::Agent),
                &Route::role_gated("/builder", Role::Admin),
                None,
                &config()
            ),
            GuardDecision::Denied
        );
    }

    #[test]
    fn test_evaluate_role_requirement_admits_sufficient_role() {
        assert_eq!(
            evaluate(
                &authenticated(Role::Admin),
                &Route::role_gated("/builder", Role::Admin),
                None,
                &config()
            ),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_evaluate_role_check_skipped_while_impersonating() {
        // An admin impersonating a customer keeps access to the page
        // they navigated from — support flows see what the user sees.
        assert_eq!(
            evaluate(
                &impersonating(Role::Customer),
                &Route::role_gated("/builder", Role::Admin),
                None,
                &config()
            ),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_evaluate_impersonating_on_login_redirects() {
        assert!(matches!(
            evaluate(
                &impersonating(Role::Customer),
                &Route::public("/login"),
                None,
                &config()
            ),
            GuardDecision::RedirectTo { .. }
        ));
    }
}
