//! The route guard actor: decisions plus timing.
//!
//! One guard per mounted route. It subscribes to the session store's
//! committed states, re-evaluates on every change, and publishes a
//! [`GuardView`] for the host to render. Redirects are never issued
//! directly from a state change — they are parked for a debounce window
//! first, and the loop detector gets the final word at commit time.

use std::sync::Arc;

use authgate_guard::LoopDetector;
use authgate_session::{
    NavigateOptions, Navigator, Notice, Notifier, SessionState,
};
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::debug;

use crate::{evaluate, GuardConfig, GuardDecision, Route};

/// What the host should render for this route right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Session determination in flight: show the interstitial.
    Loading,

    /// Show the route's protected content.
    Content,

    /// A redirect is pending or was just issued.
    Redirecting { to: String },

    /// Role check failed; the user is being sent home.
    Denied,

    /// The session is in the error state: show the recovery affordance.
    Recovery,

    /// A redirect loop was detected and navigation paused. `signed_in`
    /// picks the affordance: "you appear to be signed in — continue"
    /// versus the recovery reset.
    LoopHalted { signed_in: bool },
}

/// Commands to a running guard. Shutdown is the only one: everything
/// else the guard learns by watching session state.
enum GuardCommand {
    Shutdown,
}

/// Handle to a mounted route guard.
pub struct GuardHandle {
    views: watch::Receiver<GuardView>,
    commands: mpsc::Sender<GuardCommand>,
}

impl GuardHandle {
    /// A subscription to the guard's view.
    pub fn view(&self) -> watch::Receiver<GuardView> {
        self.views.clone()
    }

    /// The current view.
    pub fn current(&self) -> GuardView {
        self.views.borrow().clone()
    }

    /// Unmounts the guard: cancels any pending redirect timer and ends
    /// the actor task.
    pub async fn stop(&self) {
        let _ = self.commands.send(GuardCommand::Shutdown).await;
    }
}

/// Spawns a guard actor for one route.
pub fn spawn_guard(
    route: Route,
    states: watch::Receiver<SessionState>,
    loops: Arc<LoopDetector>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: GuardConfig,
) -> GuardHandle {
    let (views, views_rx) = watch::channel(GuardView::Loading);
    let (commands, cmd_rx) = mpsc::channel(4);

    let actor = GuardActor {
        route,
        states,
        loops,
        navigator,
        notifier,
        config,
        views,
        cmd_rx,
        pending: None,
    };

    tokio::spawn(actor.run());

    GuardHandle {
        views: views_rx,
        commands,
    }
}

/// A redirect parked for the debounce window.
struct PendingRedirect {
    target: String,
    options: NavigateOptions,
    /// Whether to attach the access-denied notice at commit time.
    denial: bool,
    deadline: Instant,
}

struct GuardActor {
    route: Route,
    states: watch::Receiver<SessionState>,
    loops: Arc<LoopDetector>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: GuardConfig,
    views: watch::Sender<GuardView>,
    cmd_rx: mpsc::Receiver<GuardCommand>,
    /// At most one redirect may be pending; a newer decision replaces it.
    pending: Option<PendingRedirect>,
}

impl GuardActor {
    async fn run(mut self) {
        debug!(route = %self.route.path, "route guard mounted");
        self.reevaluate();

        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);
            tokio::select! {
                changed = self.states.changed() => {
                    // The store shutting down unmounts the guard too.
                    if changed.is_err() {
                        break;
                    }
                    self.reevaluate();
                }
                cmd = self.cmd_rx.recv() => {
                    // Shutdown, or the handle was dropped. Either way the
                    // pending timer dies with the actor.
                    let _ = cmd;
                    break;
                }
                () = wait_until(deadline) => {
                    self.commit_redirect();
                }
            }
        }

        debug!(route = %self.route.path, "route guard unmounted");
    }

    /// Maps the current session state to a view, scheduling or
    /// cancelling the pending redirect as needed.
    fn reevaluate(&mut self) {
        let state = self.states.borrow_and_update().clone();
        let return_to = self.navigator.current_return_to();
        let decision =
            evaluate(&state, &self.route, return_to.as_deref(), &self.config);

        match decision {
            GuardDecision::Render => {
                self.pending = None;
                self.publish(GuardView::Content);
            }
            GuardDecision::Interstitial => {
                self.pending = None;
                self.publish(GuardView::Loading);
            }
            GuardDecision::Recovery => {
                self.pending = None;
                self.publish(GuardView::Recovery);
            }
            GuardDecision::Denied => {
                let home = self.config.home_path.clone();
                self.schedule(
                    home,
                    NavigateOptions {
                        replace: true,
                        return_to: None,
                    },
                    true,
                );
                self.publish(GuardView::Denied);
            }
            GuardDecision::RedirectToLogin { return_to } => {
                let target = self.config.login_path.clone();
                self.schedule(
                    target.clone(),
                    NavigateOptions {
                        replace: true,
                        return_to: Some(return_to),
                    },
                    false,
                );
                self.publish(GuardView::Redirecting { to: target });
            }
            GuardDecision::RedirectTo { path } => {
                self.schedule(
                    path.clone(),
                    NavigateOptions {
                        replace: true,
                        return_to: None,
                    },
                    false,
                );
                self.publish(GuardView::Redirecting { to: path });
            }
        }
    }

    /// Parks a redirect for the debounce window, replacing any prior
    /// pending one.
    fn schedule(
        &mut self,
        target: String,
        options: NavigateOptions,
        denial: bool,
    ) {
        let mut delay = self.config.redirect_debounce;
        if let Some(max) = self.config.redirect_jitter {
            let max_us = max.as_micros() as u64;
            if max_us > 0 {
                let us = rand::rng().random_range(0..max_us);
                delay += std::time::Duration::from_micros(us);
            }
        }

        debug!(
            route = %self.route.path,
            to = %target,
            delay_ms = delay.as_millis() as u64,
            "redirect parked"
        );
        self.pending = Some(PendingRedirect {
            target,
            options,
            denial,
            deadline: Instant::now() + delay,
        });
    }

    /// The debounce elapsed with no contradicting state: navigate,
    /// unless the loop detector says this is a storm.
    fn commit_redirect(&mut self) {
        let Some(redirect) = self.pending.take() else {
            return;
        };

        if self.loops.record_redirect() {
            let signed_in = self.states.borrow().status().is_signed_in();
            self.notifier.notify(Notice::warning(
                "Too many redirects — automatic navigation paused.",
            ));
            self.publish(GuardView::LoopHalted { signed_in });
            return;
        }

        if redirect.denial {
            self.notifier.notify(Notice::error(
                "You do not have access to that page.",
            ));
        }

        debug!(route = %self.route.path, to = %redirect.target, "redirect committed");
        self.navigator.navigate(&redirect.target, redirect.options);
    }

    fn publish(&self, view: GuardView) {
        self.views.send_replace(view);
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
