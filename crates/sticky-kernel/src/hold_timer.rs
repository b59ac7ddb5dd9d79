//! [`HoldTimer`] – cancellable one-shot deadline for the hold period.
//!
//! The timer is armed when tracking is lost and polled once per tick. It
//! never runs on its own: expiry is only ever observed through
//! [`HoldTimer::poll`], so a cancellation made while handling a `found`
//! event always happens-before the next expiry check.
//!
//! Every arming yields a [`TimerHandle`]. [`HoldTimer::cancel_handle`] only
//! cancels the arming the handle belongs to, so a stale handle held by an
//! older callback cannot cancel a newer countdown.
//!
//! # Example
//!
//! ```
//! use sticky_kernel::hold_timer::HoldTimer;
//!
//! let mut timer = HoldTimer::new();
//! timer.arm(0.0, 10_000.0);
//!
//! assert!(!timer.poll(9_999.0));
//! assert!(timer.poll(10_001.0)); // fires once …
//! assert!(!timer.poll(10_002.0)); // … and only once
//! ```

/// Identifies one arming of a [`HoldTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Armed {
    handle: TimerHandle,
    deadline_ms: f64,
}

/// One-shot countdown measured against caller-supplied timestamps (ms).
#[derive(Debug, Default)]
pub struct HoldTimer {
    armed: Option<Armed>,
    generation: u64,
}

impl HoldTimer {
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer to expire `hold_ms` after `now_ms`.
    ///
    /// Re-arming replaces any previous deadline and invalidates its handle.
    /// Negative or non-finite durations count as 0.
    pub fn arm(&mut self, now_ms: f64, hold_ms: f64) -> TimerHandle {
        let hold_ms = if hold_ms.is_finite() { hold_ms.max(0.0) } else { 0.0 };
        self.generation += 1;
        let handle = TimerHandle(self.generation);
        self.armed = Some(Armed {
            handle,
            deadline_ms: now_ms + hold_ms,
        });
        handle
    }

    /// Disarm the timer. Returns `true` if a countdown was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    /// Disarm only if `handle` is the current arming.
    pub fn cancel_handle(&mut self, handle: TimerHandle) -> bool {
        match self.armed {
            Some(a) if a.handle == handle => self.cancel(),
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Milliseconds left before expiry, or `None` when disarmed.
    pub fn remaining_ms(&self, now_ms: f64) -> Option<f64> {
        self.armed.map(|a| (a.deadline_ms - now_ms).max(0.0))
    }

    /// Return `true` exactly once, on the first poll at or after the deadline;
    /// the timer disarms itself when it fires.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.armed {
            Some(a) if now_ms >= a.deadline_ms => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}
