//! A scripted console walkthrough of the Authgate session lifecycle.
//!
//! Wires an [`AuthClient`] against an in-process mock identity backend
//! and a println router, then plays out the interesting paths:
//! boot with no session, a guarded route bouncing to login, the circuit
//! breaker opening after repeated failures, recovery, a successful
//! sign-in restoring the originally requested path, and impersonation.
//!
//! Run with `RUST_LOG=debug` to watch the state machine's internals.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use authgate::prelude::*;
use authgate::BreakerConfig;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

// =========================================================================
// Mock identity backend
// =========================================================================

/// Mints a structurally valid token for `sub`, good for an hour. The
/// validator only checks structure and expiry, so the signature segment
/// is a stand-in.
fn mint_token(sub: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "sub": sub, "iat": now, "exp": now + 3600 })
            .to_string(),
    );
    format!("demo.{payload}.sig")
}

fn mint_record(sub: &str) -> SessionRecord {
    SessionRecord::from_tokens(mint_token(sub), "demo-refresh")
        .expect("freshly minted token is valid")
}

/// One hard-coded admin account, plus impersonation support.
struct DemoBackend {
    events: Mutex<Option<mpsc::UnboundedReceiver<BackendEvent>>>,
}

impl DemoBackend {
    fn new() -> Arc<Self> {
        let (_tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            events: Mutex::new(Some(rx)),
        })
    }
}

impl AuthBackend for DemoBackend {
    async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionRecord, BackendError> {
        if credentials.email == "dana@example.com"
            && credentials.password == "correct-horse"
        {
            Ok(mint_record("admin-dana"))
        } else {
            Err(BackendError::InvalidCredentials)
        }
    }
    async fn sign_out(&self) -> Result<(), BackendError> {
        Ok(())
    }
    async fn get_session(&self) -> Result<Option<SessionRecord>, BackendError> {
        Ok(None)
    }
    async fn refresh_session(
        &self,
    ) -> Result<Option<SessionRecord>, BackendError> {
        Ok(None)
    }
    async fn impersonate(
        &self,
        target: &UserId,
    ) -> Result<SessionRecord, BackendError> {
        Ok(mint_record(&target.0))
    }
    async fn end_impersonation(&self) -> Result<(), BackendError> {
        Ok(())
    }
    fn subscribe(&self) -> mpsc::UnboundedReceiver<BackendEvent> {
        self.events.lock().unwrap().take().expect("subscribed once")
    }
}

struct DemoProfiles;

impl ProfileService for DemoProfiles {
    async fn get_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Profile>, BackendError> {
        let (role, name) = if user_id.0.starts_with("admin-") {
            (Role::Admin, "Dana (support)")
        } else {
            (Role::Customer, "Demo customer")
        };
        Ok(Some(Profile {
            user_id: user_id.clone(),
            role,
            display_name: name.into(),
            locale: "en-US".into(),
            company_id: Some("acme".into()),
        }))
    }
}

// =========================================================================
// Console router and toasts
// =========================================================================

struct ConsoleRouter {
    path: Mutex<String>,
    return_to: Mutex<Option<String>>,
}

impl ConsoleRouter {
    fn at(path: &str) -> Arc<Self> {
        Arc::new(Self {
            path: Mutex::new(path.to_owned()),
            return_to: Mutex::new(None),
        })
    }
}

impl Navigator for ConsoleRouter {
    fn navigate(&self, path: &str, options: NavigateOptions) {
        println!("  [router] navigate → {path}");
        *self.path.lock().unwrap() = path.to_owned();
        *self.return_to.lock().unwrap() = options.return_to;
    }
    fn hard_navigate(&self, url: &str) {
        println!("  [router] HARD RELOAD → {url}");
        *self.path.lock().unwrap() = url.to_owned();
        *self.return_to.lock().unwrap() = None;
    }
    fn current_path(&self) -> String {
        self.path.lock().unwrap().clone()
    }
    fn current_return_to(&self) -> Option<String> {
        self.return_to.lock().unwrap().clone()
    }
}

struct ConsoleToasts;

impl Notifier for ConsoleToasts {
    fn notify(&self, notice: Notice) {
        println!("  [toast:{:?}] {}", notice.level, notice.message);
    }
}

// =========================================================================
// The walkthrough
// =========================================================================

async fn wait_for(client: &AuthClient, status: SessionStatus) {
    let mut state = client.state();
    while state.borrow().status() != status {
        state.changed().await.expect("store alive");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let router = ConsoleRouter::at("/tickets/42");
    let client = AuthClient::builder()
        // A short cooldown so the demo's countdown is watchable.
        .breaker_config(BreakerConfig {
            cooldown: Duration::from_secs(90),
            ..BreakerConfig::default()
        })
        .build(
            DemoBackend::new(),
            Arc::new(DemoProfiles),
            Arc::new(MemoryStorage::new()),
            router.clone(),
            Arc::new(ConsoleToasts),
        );

    println!("== boot: no stored session, visiting {}", router.current_path());
    wait_for(&client, SessionStatus::Unauthenticated).await;

    println!("== mounting guard on the protected route");
    let guard = client.guard(Route::protected("/tickets/42"));
    sleep(Duration::from_millis(500)).await;
    guard.stop().await;

    println!("== three failed sign-in attempts");
    let mut bad = VecDeque::from(["hunter2", "hunter3", "hunter4"]);
    while let Some(password) = bad.pop_front() {
        let result = client
            .sign_in(Credentials {
                email: "dana@example.com".into(),
                password: password.into(),
            })
            .await;
        println!("  attempt with '{password}': {result:?}");
    }

    println!("== fourth attempt is blocked locally");
    let blocked = client
        .sign_in(Credentials {
            email: "dana@example.com".into(),
            password: "hunter5".into(),
        })
        .await;
    println!("  {blocked:?}");
    let status = client.breaker_status();
    println!(
        "  breaker open={} remaining={}s",
        status.open,
        status.remaining_secs()
    );

    println!("== recovery resets the wedged client");
    let recovered = client.recover().await;
    println!(
        "  recovered={recovered}, breaker open={}",
        client.breaker_status().open
    );

    println!("== signing in for real from {}", router.current_path());
    let login_guard = client.guard(Route::public("/login"));
    client
        .sign_in(Credentials {
            email: "dana@example.com".into(),
            password: "correct-horse".into(),
        })
        .await
        .expect("demo credentials are valid");
    wait_for(&client, SessionStatus::Authenticated).await;
    sleep(Duration::from_millis(500)).await;
    println!("  now at {}", router.current_path());
    login_guard.stop().await;

    println!("== impersonating a customer for support");
    client
        .impersonate(UserId::from("u-customer-7"))
        .await
        .expect("admins may impersonate");
    let profile = client.current().profile().cloned();
    println!(
        "  acting as: {}",
        profile.map_or("?".into(), |p| p.display_name)
    );

    client.end_impersonation().await.expect("restores admin");
    println!(
        "  restored: {}",
        client
            .current()
            .profile()
            .map_or("?".into(), |p| p.display_name.clone())
    );

    println!("== signing out");
    client.sign_out().await.expect("local sign-out");
    wait_for(&client, SessionStatus::Unauthenticated).await;
    client.shutdown().await;
    println!("== done");
}
