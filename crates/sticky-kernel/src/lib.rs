//! `sticky-kernel` – Presence & Timing
//!
//! Decides *whether* content is shown; the perception crate decides *where*.
//!
//! # Modules
//!
//! - [`presence`] – [`PresenceStateMachine`][presence::PresenceStateMachine]:
//!   the Hidden / Tracking / Holding / Frozen machine. Every input returns the
//!   ordered [`PresenceEffect`][presence::PresenceEffect]s to apply.
//! - [`hold_timer`] – [`HoldTimer`][hold_timer::HoldTimer]: cancellable
//!   one-shot countdown with per-arming handles, polled once per tick.
//! - [`start_gate`] – [`StartGate`][start_gate::StartGate]: shared one-time
//!   latch set by the user's start gesture.

pub mod hold_timer;
pub mod presence;
pub mod start_gate;

pub use hold_timer::{HoldTimer, TimerHandle};
pub use presence::{PresenceEffect, PresenceStateMachine};
pub use start_gate::StartGate;
