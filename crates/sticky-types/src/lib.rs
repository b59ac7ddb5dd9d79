//! `sticky-types` – shared vocabulary of the anchor engine.
//!
//! Every other crate in the workspace depends on this one for the pose and
//! presence types, the bus event envelope, configuration, and the common
//! error enum.

pub mod config;
pub mod math;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use config::AnchorConfig;
pub use math::{Quat, Vec2, Vec3};

/// One raw world-space pose reading for a tracked marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Tracker clock, milliseconds.
    pub timestamp_ms: f64,
}

impl PoseSample {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3, timestamp_ms: f64) -> Self {
        Self {
            position,
            rotation,
            scale,
            timestamp_ms,
        }
    }

    /// A unit-scale, unrotated sample at `position`.
    pub fn at(position: Vec3, timestamp_ms: f64) -> Self {
        Self::new(position, Quat::identity(), Vec3::splat(1.0), timestamp_ms)
    }
}

/// The smoothed transform applied to attached content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizedTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl StabilizedTransform {
    /// Origin, no rotation, unit scale.
    pub fn identity() -> Self {
        Self {
            position: Vec3::zero(),
            rotation: Quat::identity(),
            scale: Vec3::splat(1.0),
        }
    }
}

impl Default for StabilizedTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<&PoseSample> for StabilizedTransform {
    fn from(sample: &PoseSample) -> Self {
        Self {
            position: sample.position,
            rotation: sample.rotation,
            scale: sample.scale,
        }
    }
}

/// Visibility state of the content attached to one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    /// Not shown. Initial state, and the end of the `hide` terminal policy.
    #[default]
    Hidden,
    /// Marker in view; the pose filter drives the node.
    Tracking,
    /// Marker lost recently; content stays at its last pose until the hold
    /// timer expires.
    Holding,
    /// Content detached from the marker and adjustable by gestures.
    Frozen,
}

impl PresenceState {
    /// Whether content is shown in this state.
    pub fn is_visible(self) -> bool {
        !matches!(self, PresenceState::Hidden)
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceState::Hidden => write!(f, "hidden"),
            PresenceState::Tracking => write!(f, "tracking"),
            PresenceState::Holding => write!(f, "holding"),
            PresenceState::Frozen => write!(f, "frozen"),
        }
    }
}

/// What happens once the hold period after a tracking loss runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TerminalPolicy {
    /// Hide the content.
    #[default]
    Hide,
    /// Keep the content up in a stable place for reading, with gestures.
    Freeze,
}

/// Parent frame the attached node hangs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReparentFrame {
    /// Driven by the filtered marker pose.
    #[default]
    Tracked,
    /// Fixed relative to the viewer (camera rig).
    ViewerRelative,
    /// Fixed in world space where the content last was.
    WorldFixed,
}

/// Short presentation cues a node may animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackCue {
    /// Content (re)appears; typically a pop-in.
    Show,
    /// Tracking just dropped; typically a brief pop-out that settles back.
    LostPulse,
}

/// One active pointer contact, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable for the lifetime of the touch.
    pub id: u64,
    pub position: Vec2,
}

impl Contact {
    pub fn new(id: u64, x: f32, y: f32) -> Self {
        Self {
            id,
            position: Vec2::new(x, y),
        }
    }
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"sticky-hal::sim"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current wall-clock time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// The tracker acquired marker `target`.
    TrackingFound { target: u32 },
    /// The tracker lost marker `target`.
    TrackingLost { target: u32 },
    /// The full list of currently active pointer contacts.
    ContactsChanged(Vec<Contact>),
    /// The one-time user "start" gesture happened.
    ExperienceStarted,
    /// An anchor changed presence state.
    PresenceChanged {
        target: u32,
        from: PresenceState,
        to: PresenceState,
    },
}

/// Error type shared across the workspace. None of these are fatal to the
/// engine; they are reported and then degraded.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StickyError {
    #[error("Invalid configuration for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Degenerate pose sample: {0}")]
    DegenerateSample(String),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    #[error("Event bus error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_hidden_is_invisible() {
        assert!(!PresenceState::Hidden.is_visible());
        assert!(PresenceState::Tracking.is_visible());
        assert!(PresenceState::Holding.is_visible());
        assert!(PresenceState::Frozen.is_visible());
    }

    #[test]
    fn policy_and_frame_serialise_as_config_strings() {
        assert_eq!(serde_json::to_string(&TerminalPolicy::Freeze).unwrap(), "\"freeze\"");
        assert_eq!(
            serde_json::to_string(&ReparentFrame::ViewerRelative).unwrap(),
            "\"viewer-relative\""
        );
        let back: ReparentFrame = serde_json::from_str("\"world-fixed\"").unwrap();
        assert_eq!(back, ReparentFrame::WorldFixed);
    }

    #[test]
    fn transform_from_sample_copies_channels() {
        let sample = PoseSample::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::up(), 0.5),
            Vec3::splat(2.0),
            16.0,
        );
        let t = StabilizedTransform::from(&sample);
        assert_eq!(t.position, sample.position);
        assert_eq!(t.rotation, sample.rotation);
        assert_eq!(t.scale, sample.scale);
    }

    #[test]
    fn presence_event_roundtrip() {
        let event = Event::new(
            "sticky-runtime::anchor",
            EventPayload::PresenceChanged {
                target: 2,
                from: PresenceState::Holding,
                to: PresenceState::Frozen,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert!(matches!(
            back.payload,
            EventPayload::PresenceChanged { target: 2, to: PresenceState::Frozen, .. }
        ));
    }

    #[test]
    fn sticky_error_display() {
        let err = StickyError::InvalidConfig {
            field: "hold_ms".to_string(),
            details: "-1 must be >= 0".to_string(),
        };
        assert!(err.to_string().contains("hold_ms"));
        assert!(StickyError::Channel("closed".into()).to_string().contains("closed"));
    }
}
