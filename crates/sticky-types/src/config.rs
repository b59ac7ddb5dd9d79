//! Per-anchor tuning surface.
//!
//! [`AnchorConfig`] is deserialised from TOML by the CLI and handed to each
//! anchor instance. Bad values are never fatal: [`AnchorConfig::validate`]
//! reports the first problem so it can be logged, and
//! [`AnchorConfig::sanitized`] returns the clamped copy that is actually used.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::{ReparentFrame, StickyError, TerminalPolicy};

/// Largest accepted smoothing gain. Keeps `1 − gain` strictly positive.
pub const MAX_GAIN: f32 = 1.0 - 1e-6;

/// Smallest accepted lower bound for the pinch scale range.
pub const MIN_PINCH_SCALE: f32 = 1e-3;

/// Tuning for one tracked anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Position smoothing gain, `[0, 1)`.
    pub pos_gain: f32,
    /// Rotation smoothing gain, `[0, 1)`.
    pub rot_gain: f32,
    /// Scale smoothing gain, `[0, 1)`.
    pub scl_gain: f32,
    /// How long content stays visible after tracking loss, in milliseconds.
    pub hold_ms: f64,
    /// Replace the tracked rotation with one that faces the viewer.
    pub face_viewer: bool,
    /// When facing the viewer, keep the horizon level.
    pub lock_roll: bool,
    /// What happens when the hold period runs out.
    pub terminal_policy: TerminalPolicy,
    /// Absolute `[min, max]` scale reachable by pinching in reading mode.
    pub pinch_scale_range: [f32; 2],
    /// Play a short pop-out cue on the node when tracking is lost.
    pub lost_feedback: bool,
    /// Frame the content is reparented to when frozen for reading.
    pub freeze_frame: ReparentFrame,
    /// Placement of frozen content inside a viewer-relative frame.
    pub reading_offset: Vec3,
    /// Local-plane distance per screen pixel of drag, at scale 1.
    pub pan_speed: f32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            pos_gain: 0.15,
            rot_gain: 0.20,
            scl_gain: 0.15,
            hold_ms: 10_000.0,
            face_viewer: false,
            lock_roll: true,
            terminal_policy: TerminalPolicy::Hide,
            pinch_scale_range: [0.3, 6.0],
            lost_feedback: true,
            freeze_frame: ReparentFrame::ViewerRelative,
            reading_offset: Vec3::new(0.0, 0.0, -1.5),
            pan_speed: 0.002,
        }
    }
}

impl AnchorConfig {
    /// Return the first invalid field, or `Ok(())` when every value is usable
    /// as-is.
    pub fn validate(&self) -> Result<(), StickyError> {
        for (field, gain) in [
            ("pos_gain", self.pos_gain),
            ("rot_gain", self.rot_gain),
            ("scl_gain", self.scl_gain),
        ] {
            if !gain.is_finite() || !(0.0..1.0).contains(&gain) {
                return Err(invalid(field, format!("{gain} is outside [0, 1)")));
            }
        }
        if !self.hold_ms.is_finite() || self.hold_ms < 0.0 {
            return Err(invalid("hold_ms", format!("{} must be >= 0", self.hold_ms)));
        }
        let [min, max] = self.pinch_scale_range;
        if !min.is_finite() || !max.is_finite() || min < MIN_PINCH_SCALE || min > max {
            return Err(invalid(
                "pinch_scale_range",
                format!("[{min}, {max}] is not a positive ascending range"),
            ));
        }
        if self.freeze_frame == ReparentFrame::Tracked {
            return Err(invalid(
                "freeze_frame",
                "frozen content cannot stay parented to the tracked frame".to_string(),
            ));
        }
        if !self.reading_offset.is_finite() {
            return Err(invalid("reading_offset", "must be finite".to_string()));
        }
        if !self.pan_speed.is_finite() || self.pan_speed < 0.0 {
            return Err(invalid("pan_speed", format!("{} must be >= 0", self.pan_speed)));
        }
        Ok(())
    }

    /// Clamp every field to its nearest valid value. Non-finite values fall
    /// back to the default for that field.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let gain = |g: f32, fallback: f32| {
            if g.is_finite() { g.clamp(0.0, MAX_GAIN) } else { fallback }
        };

        let hold_ms = if self.hold_ms.is_finite() {
            self.hold_ms.max(0.0)
        } else {
            defaults.hold_ms
        };

        let [mut min, mut max] = self.pinch_scale_range;
        if !min.is_finite() || !max.is_finite() {
            [min, max] = defaults.pinch_scale_range;
        }
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        let min = min.max(MIN_PINCH_SCALE);
        let max = max.max(min);

        let freeze_frame = match self.freeze_frame {
            ReparentFrame::Tracked => defaults.freeze_frame,
            other => other,
        };

        Self {
            pos_gain: gain(self.pos_gain, defaults.pos_gain),
            rot_gain: gain(self.rot_gain, defaults.rot_gain),
            scl_gain: gain(self.scl_gain, defaults.scl_gain),
            hold_ms,
            face_viewer: self.face_viewer,
            lock_roll: self.lock_roll,
            terminal_policy: self.terminal_policy,
            pinch_scale_range: [min, max],
            lost_feedback: self.lost_feedback,
            freeze_frame,
            reading_offset: if self.reading_offset.is_finite() {
                self.reading_offset
            } else {
                defaults.reading_offset
            },
            pan_speed: if self.pan_speed.is_finite() {
                self.pan_speed.max(0.0)
            } else {
                defaults.pan_speed
            },
        }
    }
}

fn invalid(field: &str, details: String) -> StickyError {
    StickyError::InvalidConfig {
        field: field.to_string(),
        details,
    }
}
