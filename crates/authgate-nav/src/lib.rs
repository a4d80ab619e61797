//! Route-level navigation guarding for Authgate.
//!
//! For each active route, exactly one of four things should happen:
//! render the protected content, render a transient loading view,
//! redirect to login (carrying the requested path), or redirect home.
//! This crate makes that call — and makes it *safely*, because the naive
//! version of this logic is how redirect storms are born.
//!
//! Two defenses wrap every redirect:
//!
//! - a **debounce**: the navigation is parked briefly so a state flip
//!   already in flight can cancel it, and only one redirect can be
//!   pending per guard at a time;
//! - the **loop detector**: consulted at commit time; a flagged loop
//!   suppresses the redirect and surfaces a manual affordance instead.
//!
//! # How it fits in the stack
//!
//! ```text
//! Host UI (above)  ← renders whatever GuardView says
//!     ↕
//! Navigation layer (this crate)  ← decides render/redirect per route
//!     ↕
//! Session layer (below)  ← publishes committed session states
//! ```

mod decision;
mod guard;
mod route;

pub use decision::{evaluate, GuardDecision};
pub use guard::{spawn_guard, GuardHandle, GuardView};
pub use route::{GuardConfig, Route, RouteRequirement};
