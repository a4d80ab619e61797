//! Integration tests for the route guard actor: debouncing, loop
//! suppression, and role denial, on the paused Tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use authgate_guard::{LoopConfig, LoopDetector};
use authgate_nav::{spawn_guard, GuardConfig, GuardHandle, GuardView, Route};
use authgate_session::{
    NavigateOptions, Navigator, Notice, Notifier, Profile, Role,
    SessionRecord, SessionState,
};
use authgate_token::UserId;
use tokio::sync::watch;
use tokio::time::sleep;

// =========================================================================
// State helpers
// =========================================================================

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

// =========================================================================
// Mock navigation and notifications
// =========================================================================

struct RecordingNavigator {
    navigations: Mutex<Vec<(String, NavigateOptions)>>,
    return_to: Mutex<Option<String>>,
}

impl RecordingNavigator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            navigations: Mutex::new(Vec::new()),
            return_to: Mutex::new(None),
        })
    }

    fn count(&self) -> usize {
        self.navigations.lock().unwrap().len()
    }

    fn last(&self) -> Option<(String, NavigateOptions)> {
        self.navigations.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, options: NavigateOptions) {
        self.navigations
            .lock()
            .unwrap()
            .push((path.to_owned(), options));
    }
    fn hard_navigate(&self, url: &str) {
        self.navigations
            .lock()
            .unwrap()
            .push((format!("hard:{url}"), NavigateOptions::default()));
    }
    fn current_path(&self) -> String {
        "/tickets".into()
    }
    fn current_return_to(&self) -> Option<String> {
        self.return_to.lock().unwrap().clone()
    }
}

struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            notices: Mutex::new(Vec::new()),
        })
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// =========================================================================
// Harness
// =========================================================================

struct Mounted {
    guard: GuardHandle,
    states: watch::Sender<SessionState>,
    navigator: Arc<RecordingNavigator>,
    notifier: Arc<RecordingNotifier>,
}

fn mount(route: Route, initial: SessionState) -> Mounted {
    mount_with(route, initial, Arc::new(LoopDetector::default()))
}

fn mount_with(
    route: Route,
    initial: SessionState,
    loops: Arc<LoopDetector>,
) -> Mounted {
    let (states, states_rx) = watch::channel(initial);
    let navigator = RecordingNavigator::new();
    let notifier = RecordingNotifier::new();
    let guard = spawn_guard(
        route,
        states_rx,
        loops,
        navigator.clone(),
        notifier.clone(),
        GuardConfig::default(),
    );
    Mounted {
        guard,
        states,
        navigator,
        notifier,
    }
}

/// Enough paused-clock time for any debounce to elapse.
async fn settle() {
    sleep(Duration::from_secs(1)).await;
}

// =========================================================================
// Rendering without redirects
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_loading_state_renders_interstitial_and_never_redirects() {
    let mounted = mount(Route::protected("/tickets"), SessionState::Loading);

    settle().await;

    assert_eq!(mounted.guard.current(), GuardView::Loading);
    assert_eq!(mounted.navigator.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_signed_in_protected_route_renders_content() {
    let mounted = mount(
        Route::protected("/tickets"),
        authenticated(Role::Customer),
    );

    settle().await;

    assert_eq!(mounted.guard.current(), GuardView::Content);
    assert_eq!(mounted.navigator.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_error_state_shows_recovery_affordance() {
    let mounted = mount(
        Route::protected("/tickets"),
        SessionState::Error {
            cause: "profile fetch failed".into(),
        },
    );

    settle().await;

    assert_eq!(mounted.guard.current(), GuardView::Recovery);
    assert_eq!(mounted.navigator.count(), 0);
}

// =========================================================================
// Debounced redirects
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_protected_route_redirects_once_with_path() {
    let mounted = mount(
        Route::protected("/tickets"),
        SessionState::Unauthenticated,
    );

    settle().await;

    let (path, options) = mounted.navigator.last().expect("one redirect");
    assert_eq!(path, "/login");
    assert!(options.replace);
    assert_eq!(options.return_to.as_deref(), Some("/tickets"));
    assert_eq!(mounted.navigator.count(), 1, "exactly one redirect");
}

#[tokio::test(start_paused = true)]
async fn test_redirect_not_committed_before_debounce() {
    let mounted = mount(
        Route::protected("/tickets"),
        SessionState::Unauthenticated,
    );

    // 100ms in: the redirect is parked, not committed.
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        mounted.guard.current(),
        GuardView::Redirecting {
            to: "/login".into()
        }
    );
    assert_eq!(mounted.navigator.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_state_flip_cancels_pending_redirect() {
    let mounted = mount(
        Route::protected("/tickets"),
        SessionState::Unauthenticated,
    );

    // Before the debounce elapses, the session turns out to be live.
    sleep(Duration::from_millis(100)).await;
    mounted
        .states
        .send(authenticated(Role::Customer))
        .unwrap();
    settle().await;

    assert_eq!(mounted.guard.current(), GuardView::Content);
    assert_eq!(
        mounted.navigator.count(),
        0,
        "the absorbed flip must cancel the redirect"
    );
}

#[tokio::test(start_paused = true)]
async fn test_signed_in_login_route_redirects_to_captured_path() {
    let mounted = mount(Route::public("/login"), SessionState::Loading);
    *mounted.navigator.return_to.lock().unwrap() =
        Some("/tickets/42".into());

    mounted
        .states
        .send(authenticated(Role::Customer))
        .unwrap();
    settle().await;

    let (path, _) = mounted.navigator.last().expect("one redirect");
    assert_eq!(path, "/tickets/42");
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_redirect() {
    let mounted = mount(
        Route::protected("/tickets"),
        SessionState::Unauthenticated,
    );

    sleep(Duration::from_millis(50)).await;
    mounted.guard.stop().await;
    settle().await;

    assert_eq!(mounted.navigator.count(), 0);
}

// =========================================================================
// Role gating
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_role_denial_redirects_home_with_notice() {
    let mounted = mount(
        Route::role_gated("/builder", Role::Admin),
        authenticated(Role::Agent),
    );

    settle().await;

    assert_eq!(mounted.guard.current(), GuardView::Denied);
    let (path, _) = mounted.navigator.last().expect("redirected home");
    assert_eq!(path, "/");
    let notices = mounted.notifier.notices.lock().unwrap();
    assert!(
        notices.iter().any(|n| n.message.contains("access")),
        "the user must be told why they were bounced"
    );
}

#[tokio::test(start_paused = true)]
async fn test_role_denial_skipped_while_impersonating() {
    let mounted = mount(
        Route::role_gated("/builder", Role::Admin),
        impersonating(Role::Customer),
    );

    settle().await;

    assert_eq!(mounted.guard.current(), GuardView::Content);
    assert_eq!(mounted.navigator.count(), 0);
}

// =========================================================================
// Loop suppression
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_flagged_loop_suppresses_redirect() {
    // A detector that flags on the very first redirect.
    let loops = Arc::new(LoopDetector::new(LoopConfig {
        redirect_threshold: 1,
        ..LoopConfig::default()
    }));
    let mounted = mount_with(
        Route::protected("/tickets"),
        SessionState::Unauthenticated,
        loops,
    );

    settle().await;

    assert_eq!(
        mounted.guard.current(),
        GuardView::LoopHalted { signed_in: false }
    );
    assert_eq!(mounted.navigator.count(), 0, "redirect suppressed");
    let notices = mounted.notifier.notices.lock().unwrap();
    assert!(!notices.is_empty(), "the pause is surfaced to the user");
}

#[tokio::test(start_paused = true)]
async fn test_alternating_redirect_storm_is_halted_on_the_fifth() {
    // Scenario: the session determination oscillates, so the guard on
    // the protected route and the guard on the login route take turns
    // redirecting. The shared detector must stop the storm at five.
    let loops = Arc::new(LoopDetector::default());
    let tickets = mount_with(
        Route::protected("/tickets"),
        SessionState::Unauthenticated,
        loops.clone(),
    );
    let login = mount_with(
        Route::public("/login"),
        SessionState::Unauthenticated,
        loops,
    );

    // Each mount has its own state channel; mirror every flip into
    // both so the guards oscillate together, trading redirects.
    let mut signed_in = false;
    for _ in 0..6 {
        sleep(Duration::from_millis(400)).await;
        signed_in = !signed_in;
        let next = if signed_in {
            authenticated(Role::Customer)
        } else {
            SessionState::Unauthenticated
        };
        tickets.states.send(next.clone()).unwrap();
        login.states.send(next).unwrap();
    }
    sleep(Duration::from_secs(1)).await;

    let total = tickets.navigator.count() + login.navigator.count();
    assert_eq!(total, 4, "redirects past the threshold must be suppressed");
    // The storm's last suppressed redirect leaves that guard showing
    // the halt affordance instead of navigating yet again.
    assert_eq!(
        tickets.guard.current(),
        GuardView::LoopHalted { signed_in: false }
    );
}
