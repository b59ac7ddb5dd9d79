//! Pose Stabilization Filter.
//!
//! Converts noisy, intermittent marker poses into a stable transform using
//! frame-rate-independent exponential smoothing.
//!
//! Each channel (position, rotation, scale) is blended toward the latest
//! sample with a per-frame weight derived from a configured gain:
//!
//! ```text
//! k = 1 − (1 − gain)^(dt / 16.666)        dt ≥ 16.666 ms
//! ```
//!
//! so the smoothing time constant is the same at 30, 60 or 120 Hz. Position
//! and scale are lerped by `k`, rotation is slerped by `k`.
//!
//! Two behaviours sit on top of the smoothing:
//!
//! - **Snap** – the first update after (re)acquisition copies the sample
//!   verbatim, so content appears in the right place on the very first frame
//!   instead of sliding in from a stale pose.
//! - **Freeze on loss** – an update without a sample changes nothing; the
//!   last transform stands until tracking returns.
//!
//! # Example
//!
//! ```rust
//! use sticky_perception::pose_filter::{Gains, PoseFilter};
//! use sticky_types::{PoseSample, Vec3};
//!
//! let gains = Gains::new(0.15, 0.2, 0.15);
//! let mut filter = PoseFilter::new();
//!
//! // First sample snaps.
//! filter.update(Some(&PoseSample::at(Vec3::zero(), 0.0)), 16.666, gains);
//!
//! // Second sample is approached by 15 % in one nominal frame.
//! let t = filter.update(Some(&PoseSample::at(Vec3::new(1.0, 0.0, 0.0), 16.666)), 16.666, gains);
//! assert!((t.position.x - 0.15).abs() < 1e-5);
//! ```

use sticky_types::config::MAX_GAIN;
use sticky_types::{AnchorConfig, PoseSample, StabilizedTransform};
use tracing::debug;

use crate::sample_gate;

/// Duration of one nominal 60 Hz frame, in milliseconds.
pub const NOMINAL_FRAME_MS: f32 = 16.666;

// ────────────────────────────────────────────────────────────────────────────
// Gains
// ────────────────────────────────────────────────────────────────────────────

/// Per-channel smoothing gains, each in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub pos: f32,
    pub rot: f32,
    pub scl: f32,
}

impl Gains {
    pub fn new(pos: f32, rot: f32, scl: f32) -> Self {
        Self { pos, rot, scl }
    }

    /// Copy with every gain clamped to `[0, 1)`. NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self::new(clamp_gain(self.pos), clamp_gain(self.rot), clamp_gain(self.scl))
    }
}

impl From<&AnchorConfig> for Gains {
    fn from(cfg: &AnchorConfig) -> Self {
        Self::new(cfg.pos_gain, cfg.rot_gain, cfg.scl_gain)
    }
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() { 0.0 } else { gain.clamp(0.0, MAX_GAIN) }
}

/// Blend weight for one update of `dt_ms` with the given `gain`.
///
/// `dt_ms` is raised to one nominal frame so a long stall cannot push the
/// weight past what the exponent allows; a non-finite `dt_ms` counts as one
/// nominal frame. A gain of exactly 0 turns smoothing off (`k = 1`).
pub fn frame_blend(gain: f32, dt_ms: f32) -> f32 {
    let gain = clamp_gain(gain);
    if gain == 0.0 {
        return 1.0;
    }
    let dt = if dt_ms.is_finite() {
        dt_ms.max(NOMINAL_FRAME_MS)
    } else {
        NOMINAL_FRAME_MS
    };
    (1.0 - (1.0 - gain).powf(dt / NOMINAL_FRAME_MS)).clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// PoseFilter
// ────────────────────────────────────────────────────────────────────────────

/// Whether the acquisition snap has happened since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterState {
    pub snapped: bool,
}

/// Exponential pose smoother with snap-on-acquire and freeze-on-loss.
///
/// One instance per tracked anchor. Call [`PoseFilter::reset_snap`] whenever
/// tracking (re)acquires, then [`PoseFilter::update`] once per tick.
#[derive(Debug, Clone, Default)]
pub struct PoseFilter {
    transform: StabilizedTransform,
    state: FilterState,
}

impl PoseFilter {
    /// A filter at the identity transform, waiting for its first snap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the filter by one tick.
    ///
    /// - `sample` – the current raw pose, or `None` when not tracking.
    /// - `dt_ms` – time since the previous tick.
    /// - `gains` – per-channel gains; clamped to `[0, 1)` before use.
    ///
    /// Degenerate samples are dropped and treated like `None`. Returns the
    /// current stabilized transform.
    pub fn update(
        &mut self,
        sample: Option<&PoseSample>,
        dt_ms: f32,
        gains: Gains,
    ) -> StabilizedTransform {
        let Some(raw) = sample else {
            return self.transform;
        };
        let sample = match sample_gate::admit(raw) {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, timestamp_ms = raw.timestamp_ms, "dropping pose sample");
                return self.transform;
            }
        };

        if !self.state.snapped {
            self.transform = StabilizedTransform::from(&sample);
            self.state.snapped = true;
            return self.transform;
        }

        let gains = gains.clamped();
        let k_pos = frame_blend(gains.pos, dt_ms);
        let k_rot = frame_blend(gains.rot, dt_ms);
        let k_scl = frame_blend(gains.scl, dt_ms);

        let t = &mut self.transform;
        t.position = t.position.lerp(sample.position, k_pos);
        t.rotation = t.rotation.slerp(sample.rotation, k_rot).normalize();
        t.scale = t.scale.lerp(sample.scale, k_scl);

        self.transform
    }

    /// Arm the snap so the next admitted sample is copied verbatim.
    pub fn reset_snap(&mut self) {
        self.state.snapped = false;
    }

    /// Back to the identity transform, unsnapped.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The last stabilized transform.
    pub fn transform(&self) -> StabilizedTransform {
        self.transform
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn is_snapped(&self) -> bool {
        self.state.snapped
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
