//! [`StartGate`] – the one-time "experience started" latch.
//!
//! Tracking events are ignored until the user has performed the start
//! gesture (which is also what unlocks audio/video playback in a browser
//! host). The gate is a cheaply cloneable shared flag: the UI layer keeps
//! one clone to open it, every anchor keeps another to read it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Shared, one-way start latch.
#[derive(Debug, Clone, Default)]
pub struct StartGate {
    started: Arc<AtomicBool>,
}

impl StartGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Returns `true` only for the call that opened it.
    pub fn open(&self) -> bool {
        let opened = !self.started.swap(true, Ordering::SeqCst);
        if opened {
            info!("experience started");
        }
        opened
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        assert!(!StartGate::new().has_started());
    }

    #[test]
    fn open_is_one_time() {
        let gate = StartGate::new();
        assert!(gate.open());
        assert!(!gate.open());
        assert!(gate.has_started());
    }

    #[test]
    fn clones_share_state() {
        let ui = StartGate::new();
        let anchor = ui.clone();
        ui.open();
        assert!(anchor.has_started());
    }
}
