//! [`PresenceStateMachine`] – decides when attached content is shown.
//!
//! The machine is driven by three inputs: tracking `found`, tracking `lost`
//! and the passage of time (checked with [`PresenceStateMachine::poll`]).
//! It never touches a node itself. Each input returns the ordered list of
//! [`PresenceEffect`]s the caller must apply, which keeps the transition
//! table testable without any collaborator.
//!
//! ```text
//!   Hidden ──found*──▶ Tracking ──lost──▶ Holding ──expiry──▶ Hidden | Frozen
//!                         ▲                  │                          │
//!                         └──────found───────┴───────────found──────────┘
//! ```
//! `*` only once the experience has started.
//!
//! # Example
//!
//! ```
//! use sticky_kernel::presence::{PresenceEffect, PresenceStateMachine};
//! use sticky_types::{PresenceState, ReparentFrame, TerminalPolicy};
//!
//! let mut sm = PresenceStateMachine::new(
//!     TerminalPolicy::Hide,
//!     10_000.0,
//!     ReparentFrame::ViewerRelative,
//!     false,
//! );
//!
//! assert!(sm.on_found(0.0, true).contains(&PresenceEffect::SetVisible(true)));
//! sm.on_lost(1_000.0);
//! assert_eq!(sm.state(), PresenceState::Holding);
//!
//! assert!(sm.poll(10_999.0).is_empty());
//! assert_eq!(sm.poll(11_000.0), vec![PresenceEffect::SetVisible(false)]);
//! assert_eq!(sm.state(), PresenceState::Hidden);
//! ```

use sticky_types::{AnchorConfig, FeedbackCue, PresenceState, ReparentFrame, TerminalPolicy};
use tracing::{debug, info};

use crate::hold_timer::{HoldTimer, TimerHandle};

// ────────────────────────────────────────────────────────────────────────────
// Effects
// ────────────────────────────────────────────────────────────────────────────

/// A side effect requested by a presence transition, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEffect {
    /// A running hold countdown was cancelled.
    CancelHold,
    /// The hold countdown was armed.
    ArmHold,
    /// The pose filter must snap to the next sample.
    ResetSnap,
    SetVisible(bool),
    Feedback(FeedbackCue),
    Reparent(ReparentFrame),
    /// Position the node for reading in its new frame.
    PlaceForReading,
    EnableGestures,
    /// Leave manual mode; gesture baselines are discarded.
    DisableGestures,
}

// ────────────────────────────────────────────────────────────────────────────
// PresenceStateMachine
// ────────────────────────────────────────────────────────────────────────────

/// Hidden / Tracking / Holding / Frozen state machine with an owned
/// [`HoldTimer`].
#[derive(Debug)]
pub struct PresenceStateMachine {
    state: PresenceState,
    policy: TerminalPolicy,
    hold_ms: f64,
    freeze_frame: ReparentFrame,
    lost_feedback: bool,
    timer: HoldTimer,
    /// Arming made by the last `lost`; every cancel goes through it.
    hold: Option<TimerHandle>,
}

impl PresenceStateMachine {
    pub fn new(
        policy: TerminalPolicy,
        hold_ms: f64,
        freeze_frame: ReparentFrame,
        lost_feedback: bool,
    ) -> Self {
        Self {
            state: PresenceState::Hidden,
            policy,
            hold_ms,
            freeze_frame,
            lost_feedback,
            timer: HoldTimer::new(),
            hold: None,
        }
    }

    /// Build from the presence-related fields of an (already sanitized)
    /// [`AnchorConfig`].
    pub fn from_config(config: &AnchorConfig) -> Self {
        Self::new(
            config.terminal_policy,
            config.hold_ms,
            config.freeze_frame,
            config.lost_feedback,
        )
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn policy(&self) -> TerminalPolicy {
        self.policy
    }

    /// Milliseconds until the hold expires, while Holding.
    pub fn hold_remaining_ms(&self, now_ms: f64) -> Option<f64> {
        self.timer.remaining_ms(now_ms)
    }

    /// The tracked marker was (re)acquired.
    ///
    /// From Hidden this requires `started`; from any other state
    /// re-acquisition is immediate.
    pub fn on_found(&mut self, now_ms: f64, started: bool) -> Vec<PresenceEffect> {
        let mut effects = Vec::new();
        match self.state {
            PresenceState::Tracking => {
                debug!("found while already tracking, ignored");
                return effects;
            }
            PresenceState::Hidden if !started => {
                debug!("found before experience start, ignored");
                return effects;
            }
            PresenceState::Hidden => {
                if self.cancel_hold() {
                    effects.push(PresenceEffect::CancelHold);
                }
                effects.push(PresenceEffect::ResetSnap);
                effects.push(PresenceEffect::SetVisible(true));
            }
            PresenceState::Holding => {
                if self.cancel_hold() {
                    effects.push(PresenceEffect::CancelHold);
                }
                effects.push(PresenceEffect::ResetSnap);
            }
            PresenceState::Frozen => {
                effects.push(PresenceEffect::DisableGestures);
                effects.push(PresenceEffect::Reparent(ReparentFrame::Tracked));
                effects.push(PresenceEffect::ResetSnap);
            }
        }
        effects.push(PresenceEffect::Feedback(FeedbackCue::Show));
        self.transition(PresenceState::Tracking, now_ms);
        effects
    }

    /// The tracked marker was lost. Only meaningful while Tracking.
    pub fn on_lost(&mut self, now_ms: f64) -> Vec<PresenceEffect> {
        if self.state != PresenceState::Tracking {
            debug!(state = %self.state, "lost while not tracking, ignored");
            return Vec::new();
        }
        self.hold = Some(self.timer.arm(now_ms, self.hold_ms));
        let mut effects = vec![PresenceEffect::ArmHold];
        if self.lost_feedback {
            effects.push(PresenceEffect::Feedback(FeedbackCue::LostPulse));
        }
        self.transition(PresenceState::Holding, now_ms);
        effects
    }

    /// Check the hold countdown. Applies the terminal policy exactly once
    /// when the hold expires.
    pub fn poll(&mut self, now_ms: f64) -> Vec<PresenceEffect> {
        if self.state != PresenceState::Holding || !self.timer.poll(now_ms) {
            return Vec::new();
        }
        self.hold = None;
        match self.policy {
            TerminalPolicy::Hide => {
                self.transition(PresenceState::Hidden, now_ms);
                vec![PresenceEffect::SetVisible(false)]
            }
            TerminalPolicy::Freeze => {
                self.transition(PresenceState::Frozen, now_ms);
                vec![
                    PresenceEffect::Reparent(self.freeze_frame),
                    PresenceEffect::PlaceForReading,
                    PresenceEffect::EnableGestures,
                ]
            }
        }
    }

    /// Tear down: cancel any countdown and return to Hidden.
    pub fn reset(&mut self) -> Vec<PresenceEffect> {
        let mut effects = Vec::new();
        if self.cancel_hold() {
            effects.push(PresenceEffect::CancelHold);
        }
        if self.state == PresenceState::Frozen {
            effects.push(PresenceEffect::DisableGestures);
            effects.push(PresenceEffect::Reparent(ReparentFrame::Tracked));
        }
        if self.state.is_visible() {
            effects.push(PresenceEffect::SetVisible(false));
        }
        self.state = PresenceState::Hidden;
        effects
    }

    fn cancel_hold(&mut self) -> bool {
        self.hold
            .take()
            .is_some_and(|handle| self.timer.cancel_handle(handle))
    }

    fn transition(&mut self, to: PresenceState, now_ms: f64) {
        info!(from = %self.state, to = %to, now_ms, "presence transition");
        self.state = to;
    }
}
