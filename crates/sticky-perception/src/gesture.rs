//! Reading-mode gesture controller.
//!
//! While content is frozen for reading, pointer contacts move and resize it:
//!
//! - **One contact** – incremental drag. Each screen-pixel of movement shifts
//!   the content on its local plane by `pan_speed × current_scale`, so the
//!   perceived speed stays proportionate to the current zoom. Screen +y points
//!   down, local +y points up.
//! - **Two contacts** – pinch. The ratio between the current finger distance
//!   and the distance at pinch start scales the content uniformly, clamped to
//!   an absolute `[min, max]` range. Content that starts outside the range
//!   keeps its scale until a pinch moves it; a pinch never pushes it further
//!   out.
//!
//! Adding or lifting a finger (or a different finger taking over) re-captures
//! the baseline for the new gesture instead of producing a jump.
//!
//! # Example
//!
//! ```rust
//! use sticky_perception::gesture::GestureController;
//! use sticky_types::{Contact, Vec2};
//!
//! let mut gestures = GestureController::new(0.002, [0.3, 6.0]);
//! gestures.enable(Vec2::zero(), 1.0);
//!
//! // Pinch start at 100 px apart, then spread to 200 px: scale doubles.
//! gestures.handle_contacts(&[Contact::new(1, 0.0, 0.0), Contact::new(2, 100.0, 0.0)]);
//! let adj = gestures
//!     .handle_contacts(&[Contact::new(1, 0.0, 0.0), Contact::new(2, 200.0, 0.0)])
//!     .unwrap();
//! assert!((adj.scale - 2.0).abs() < 1e-5);
//! ```

use sticky_types::{AnchorConfig, Contact, Vec2};
use tracing::trace;

/// Default local-plane distance per screen pixel at scale 1.
pub const DEFAULT_PAN_SPEED: f32 = 0.002;

/// Default absolute pinch scale range.
pub const DEFAULT_SCALE_RANGE: [f32; 2] = [0.3, 6.0];

/// Finger separation (px) below which a pinch baseline is not trusted.
const MIN_PINCH_DISTANCE_PX: f32 = 1.0;

/// Which gesture the current contacts form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    None,
    Pan,
    Pinch,
}

/// Baselines of the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureState {
    pub mode: GestureMode,
    /// Contact ids driving the gesture (one for pan, two for pinch).
    pub anchor_fingers: [Option<u64>; 2],
    /// Content scale when the pinch started.
    pub base_scale: f32,
    /// Last seen screen position of the panning finger.
    pub base_position: Vec2,
    /// Finger distance when the pinch started.
    pub pinch_start_distance: f32,
}

/// Manual placement of frozen content: a position on its local plane and a
/// uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualAdjustment {
    pub position: Vec2,
    pub scale: f32,
}

/// Converts pointer contacts into [`ManualAdjustment`]s while enabled.
#[derive(Debug, Clone)]
pub struct GestureController {
    enabled: bool,
    pan_speed: f32,
    scale_range: [f32; 2],
    state: GestureState,
    current: ManualAdjustment,
}

impl GestureController {
    /// Create a disabled controller.
    ///
    /// `scale_range` is sorted and its lower bound kept positive; a negative
    /// or non-finite `pan_speed` falls back to [`DEFAULT_PAN_SPEED`].
    pub fn new(pan_speed: f32, scale_range: [f32; 2]) -> Self {
        let [a, b] = scale_range;
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let min = if min.is_finite() { min.max(1e-3) } else { DEFAULT_SCALE_RANGE[0] };
        let max = if max.is_finite() { max.max(min) } else { DEFAULT_SCALE_RANGE[1].max(min) };
        let pan_speed = if pan_speed.is_finite() && pan_speed >= 0.0 {
            pan_speed
        } else {
            DEFAULT_PAN_SPEED
        };
        Self {
            enabled: false,
            pan_speed,
            scale_range: [min, max],
            state: GestureState::default(),
            current: ManualAdjustment {
                position: Vec2::zero(),
                scale: 1.0_f32.clamp(min, max),
            },
        }
    }

    pub fn from_config(cfg: &AnchorConfig) -> Self {
        Self::new(cfg.pan_speed, cfg.pinch_scale_range)
    }

    /// Start accepting gestures from the given placement.
    ///
    /// `scale` is taken as is, even outside the pinch range, so enabling
    /// never moves the content. A non-finite or non-positive scale starts
    /// from 1 clamped into the range.
    pub fn enable(&mut self, position: Vec2, scale: f32) {
        let [min, max] = self.scale_range;
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0_f32.clamp(min, max) };
        self.enabled = true;
        self.state = GestureState::default();
        self.current = ManualAdjustment { position, scale };
    }

    /// Stop accepting gestures and discard every baseline.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.state = GestureState::default();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn scale_range(&self) -> [f32; 2] {
        self.scale_range
    }

    /// Current manual placement, or `None` when disabled.
    pub fn adjustment(&self) -> Option<ManualAdjustment> {
        self.enabled.then_some(self.current)
    }

    /// Feed the full list of active contacts for one input frame.
    ///
    /// Returns the new placement when it changed, `None` otherwise (disabled,
    /// baseline captured, or no movement). Contacts with non-finite positions
    /// are ignored; beyond two contacts only the first two count.
    pub fn handle_contacts(&mut self, contacts: &[Contact]) -> Option<ManualAdjustment> {
        if !self.enabled {
            return None;
        }

        let mut live = contacts.iter().filter(|c| c.position.is_finite());
        match (live.next(), live.next()) {
            (None, _) => {
                self.state = GestureState::default();
                None
            }
            (Some(finger), None) => self.pan(finger),
            (Some(a), Some(b)) => self.pinch(a, b),
        }
    }

    fn pan(&mut self, finger: &Contact) -> Option<ManualAdjustment> {
        let continuing = self.state.mode == GestureMode::Pan
            && self.state.anchor_fingers[0] == Some(finger.id);
        if !continuing {
            trace!(finger = finger.id, "pan baseline captured");
            self.state = GestureState {
                mode: GestureMode::Pan,
                anchor_fingers: [Some(finger.id), None],
                base_scale: self.current.scale,
                base_position: finger.position,
                pinch_start_distance: 0.0,
            };
            return None;
        }

        let delta = finger.position.sub(self.state.base_position);
        self.state.base_position = finger.position;
        if delta.x == 0.0 && delta.y == 0.0 {
            return None;
        }

        let k = self.pan_speed * self.current.scale;
        self.current.position = self
            .current
            .position
            .add(Vec2::new(delta.x * k, -delta.y * k));
        Some(self.current)
    }

    fn pinch(&mut self, a: &Contact, b: &Contact) -> Option<ManualAdjustment> {
        let distance = a.position.distance(b.position);
        let fingers = self.state.anchor_fingers;
        let same_fingers = fingers == [Some(a.id), Some(b.id)] || fingers == [Some(b.id), Some(a.id)];
        let continuing = self.state.mode == GestureMode::Pinch
            && same_fingers
            && self.state.pinch_start_distance >= MIN_PINCH_DISTANCE_PX;

        if !continuing {
            trace!(fingers = ?(a.id, b.id), distance, "pinch baseline captured");
            self.state = GestureState {
                mode: GestureMode::Pinch,
                anchor_fingers: [Some(a.id), Some(b.id)],
                base_scale: self.current.scale,
                base_position: a.position,
                pinch_start_distance: distance,
            };
            return None;
        }

        // Widen the bounds to the baseline so out-of-range content does not
        // jump on the first move.
        let base = self.state.base_scale;
        let [min, max] = self.scale_range;
        let ratio = distance / self.state.pinch_start_distance;
        let scale = (base * ratio).clamp(min.min(base), max.max(base));
        if !scale.is_finite() || scale == self.current.scale {
            return None;
        }
        self.current.scale = scale;
        Some(self.current)
    }
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(DEFAULT_PAN_SPEED, DEFAULT_SCALE_RANGE)
    }
}
