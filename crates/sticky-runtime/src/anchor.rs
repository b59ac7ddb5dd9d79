//! [`AnchorInstance`] – one tracked marker and the content attached to it.
//!
//! Every piece of per-anchor state lives here: the pose filter, the presence
//! state machine (with its hold timer), the gesture controller, the bus
//! subscriptions and the two collaborators. Nothing is global, so any number
//! of anchors can share one bus and one [`StartGate`].
//!
//! # Tick order
//!
//! [`AnchorInstance::tick`] runs, in order:
//!
//! 1. drain the tracking subscription (`found` / `lost` for this target),
//! 2. drain the pointer subscription (gestures, only while Frozen),
//! 3. poll the hold timer,
//! 4. while Tracking, pull a pose, filter it, apply the billboard override
//!    and write the node transform.
//!
//! A `found` drained in step 1 cancels the hold before step 3 looks at it,
//! so a re-acquisition in the same frame as the deadline always wins.
//!
//! # Example
//!
//! ```
//! use sticky_hal::sim::{SimNode, SimTracker};
//! use sticky_kernel::StartGate;
//! use sticky_runtime::anchor::AnchorInstance;
//! use sticky_types::{AnchorConfig, PoseSample, PresenceState, Vec3};
//!
//! let gate = StartGate::new();
//! let tracker = SimTracker::new(0);
//! let node = SimNode::new("poster");
//! let mut anchor = AnchorInstance::new("poster", 0, AnchorConfig::default(), gate.clone())
//!     .with_source(Box::new(tracker.clone()))
//!     .with_node(Box::new(node.clone()));
//!
//! gate.open();
//! tracker.set_pose(Some(PoseSample::at(Vec3::new(0.0, 0.0, -2.0), 0.0)));
//! anchor.handle_found(0.0);
//! anchor.tick(16.0, 16.0);
//!
//! assert_eq!(anchor.state(), PresenceState::Tracking);
//! assert!(node.is_visible());
//! assert_eq!(node.transform().position, Vec3::new(0.0, 0.0, -2.0));
//! ```

use serde::Serialize;
use sticky_hal::{AttachedNode, TrackingSource};
use sticky_kernel::{PresenceEffect, PresenceStateMachine, StartGate};
use sticky_middleware::{EventBus, Subscription, Topic};
use sticky_perception::{BillboardConstraint, Gains, GestureController, ManualAdjustment, PoseFilter};
use sticky_types::{
    AnchorConfig, Contact, Event, EventPayload, PresenceState, Quat, ReparentFrame,
    StabilizedTransform, StickyError, Vec2, Vec3,
};
use tracing::{debug, trace, warn};

// ────────────────────────────────────────────────────────────────────────────
// Reading placement
// ────────────────────────────────────────────────────────────────────────────

/// Where frozen content sits in its reading frame before any gesture.
#[derive(Debug, Clone, Copy)]
struct ReadingPlacement {
    origin: StabilizedTransform,
    /// Uniform scale the gesture controller starts from.
    base_scale: f32,
}

impl ReadingPlacement {
    fn new(origin: StabilizedTransform) -> Self {
        let s = origin.scale;
        let mean = (s.x.abs() + s.y.abs() + s.z.abs()) / 3.0;
        Self {
            origin,
            base_scale: if mean.is_finite() && mean > 0.0 { mean } else { 1.0 },
        }
    }

    /// Pan on the content's own plane; scale uniformly relative to the
    /// origin so the aspect ratio is kept.
    fn adjusted(&self, adj: ManualAdjustment) -> StabilizedTransform {
        let offset = self
            .origin
            .rotation
            .rotate(Vec3::new(adj.position.x, adj.position.y, 0.0));
        StabilizedTransform {
            position: self.origin.position.add(offset),
            rotation: self.origin.rotation,
            scale: self.origin.scale.scale(adj.scale / self.base_scale),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

/// Serializable view of an anchor, for logs and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AnchorSnapshot {
    pub name: String,
    pub target: u32,
    pub state: PresenceState,
    pub transform: StabilizedTransform,
    pub hold_remaining_ms: Option<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// AnchorInstance
// ────────────────────────────────────────────────────────────────────────────

/// Owned state and per-tick pipeline for one anchor.
pub struct AnchorInstance {
    name: String,
    target: u32,
    config: AnchorConfig,
    gains: Gains,
    filter: PoseFilter,
    presence: PresenceStateMachine,
    gestures: GestureController,
    reading: Option<ReadingPlacement>,
    gate: StartGate,
    source: Option<Box<dyn TrackingSource>>,
    node: Option<Box<dyn AttachedNode>>,
    bus: Option<EventBus>,
    tracking_sub: Option<Subscription>,
    pointer_sub: Option<Subscription>,
    last_written: StabilizedTransform,
    warned_missing_source: bool,
}

impl AnchorInstance {
    /// Create an anchor following marker `target`.
    ///
    /// An invalid `config` is reported once at `warn` and clamped.
    pub fn new(name: impl Into<String>, target: u32, config: AnchorConfig, gate: StartGate) -> Self {
        let name = name.into();
        if let Err(e) = config.validate() {
            warn!(anchor = %name, error = %e, "invalid anchor configuration, clamping");
        }
        let config = config.sanitized();
        Self {
            target,
            gains: Gains::from(&config),
            filter: PoseFilter::new(),
            presence: PresenceStateMachine::from_config(&config),
            gestures: GestureController::from_config(&config),
            reading: None,
            gate,
            source: None,
            node: None,
            bus: None,
            tracking_sub: None,
            pointer_sub: None,
            last_written: StabilizedTransform::identity(),
            warned_missing_source: false,
            config,
            name,
        }
    }

    /// Attach the tracking collaborator.
    ///
    /// A source following a different marker is refused with a `warn`; the
    /// anchor then behaves as if no source were attached.
    pub fn with_source(mut self, source: Box<dyn TrackingSource>) -> Self {
        if source.target() != self.target {
            warn!(
                anchor = %self.name,
                target = self.target,
                source_target = source.target(),
                "tracking source follows another marker, not attached"
            );
            return self;
        }
        self.source = Some(source);
        self
    }

    /// Attach the content node.
    pub fn with_node(mut self, node: Box<dyn AttachedNode>) -> Self {
        self.node = Some(node);
        self
    }

    /// Subscribe to tracking and pointer traffic on `bus` and publish
    /// presence transitions to it.
    pub fn with_bus(mut self, bus: &EventBus) -> Self {
        self.tracking_sub = Some(bus.subscribe_to(Topic::Tracking));
        self.pointer_sub = Some(bus.subscribe_to(Topic::Pointer));
        self.bus = Some(bus.clone());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// The sanitized configuration actually in use.
    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    pub fn state(&self) -> PresenceState {
        self.presence.state()
    }

    /// The transform most recently written to the node.
    pub fn transform(&self) -> StabilizedTransform {
        self.last_written
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    pub fn snapshot(&self, now_ms: f64) -> AnchorSnapshot {
        AnchorSnapshot {
            name: self.name.clone(),
            target: self.target,
            state: self.presence.state(),
            transform: self.last_written,
            hold_remaining_ms: self.presence.hold_remaining_ms(now_ms),
        }
    }

    // -----------------------------------------------------------------------
    // Frame pipeline
    // -----------------------------------------------------------------------

    /// Advance the anchor by one frame.
    ///
    /// `now_ms` is the frame timestamp, `dt_ms` the time since the previous
    /// frame.
    pub fn tick(&mut self, now_ms: f64, dt_ms: f32) {
        let tracking = self.tracking_sub.as_mut().map(Subscription::drain).unwrap_or_default();
        for event in tracking {
            match event.payload {
                EventPayload::TrackingFound { target } if target == self.target => {
                    self.handle_found(now_ms)
                }
                EventPayload::TrackingLost { target } if target == self.target => {
                    self.handle_lost(now_ms)
                }
                _ => {}
            }
        }

        let pointer = self.pointer_sub.as_mut().map(Subscription::drain).unwrap_or_default();
        for event in pointer {
            if let EventPayload::ContactsChanged(contacts) = event.payload {
                self.handle_contacts(&contacts);
            }
        }

        let from = self.presence.state();
        let effects = self.presence.poll(now_ms);
        self.apply(from, effects, now_ms);

        if self.presence.state() == PresenceState::Tracking {
            self.follow(dt_ms);
        }
    }

    /// The marker was acquired. Hosts without a bus call this directly.
    pub fn handle_found(&mut self, now_ms: f64) {
        let from = self.presence.state();
        let effects = self.presence.on_found(now_ms, self.gate.has_started());
        self.apply(from, effects, now_ms);
    }

    /// The marker was lost. Hosts without a bus call this directly.
    pub fn handle_lost(&mut self, now_ms: f64) {
        let from = self.presence.state();
        let effects = self.presence.on_lost(now_ms);
        self.apply(from, effects, now_ms);
    }

    /// Feed the active pointer contacts. Ignored unless Frozen.
    pub fn handle_contacts(&mut self, contacts: &[Contact]) {
        if self.presence.state() != PresenceState::Frozen {
            trace!(anchor = %self.name, "contacts outside reading mode, ignored");
            return;
        }
        let (Some(adj), Some(reading)) = (self.gestures.handle_contacts(contacts), self.reading)
        else {
            return;
        };
        let transform = reading.adjusted(adj);
        self.write_transform(transform);
    }

    /// Tear the anchor down: hide the node, cancel any hold and drop the bus
    /// subscriptions.
    pub fn teardown(&mut self, now_ms: f64) {
        let from = self.presence.state();
        let effects = self.presence.reset();
        self.apply(from, effects, now_ms);
        self.filter.reset();
        self.tracking_sub = None;
        self.pointer_sub = None;
        debug!(anchor = %self.name, "anchor torn down");
    }

    fn follow(&mut self, dt_ms: f32) {
        let Some(source) = self.source.as_ref() else {
            if !self.warned_missing_source {
                warn!(anchor = %self.name, error = %StickyError::MissingCollaborator("tracking source".into()), "skipping pose update");
                self.warned_missing_source = true;
            }
            return;
        };

        let sample = source.current_world_pose();
        let mut out = self.filter.update(sample.as_ref(), dt_ms, self.gains);
        if !self.filter.is_snapped() {
            // Re-acquired but no usable sample yet: keep the node where it is.
            return;
        }

        if self.config.face_viewer {
            let viewer = source.viewer_world_position();
            if let Some(rotation) =
                BillboardConstraint::try_apply(out.position, viewer, self.config.lock_roll)
            {
                out.rotation = rotation;
            }
        }
        self.write_transform(out);
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    fn apply(&mut self, from: PresenceState, effects: Vec<PresenceEffect>, now_ms: f64) {
        if effects.is_empty() {
            return;
        }
        for effect in effects {
            match effect {
                PresenceEffect::CancelHold => {
                    debug!(anchor = %self.name, "hold cancelled")
                }
                PresenceEffect::ArmHold => {
                    debug!(anchor = %self.name, hold_ms = self.config.hold_ms, "hold armed")
                }
                PresenceEffect::ResetSnap => self.filter.reset_snap(),
                PresenceEffect::SetVisible(visible) => {
                    self.node_call("set_visible", |n| n.set_visible(visible))
                }
                PresenceEffect::Feedback(cue) => {
                    self.node_call("play_feedback", |n| n.play_feedback(cue))
                }
                PresenceEffect::Reparent(frame) => {
                    self.node_call("reparent", |n| n.reparent(frame))
                }
                PresenceEffect::PlaceForReading => self.place_for_reading(),
                PresenceEffect::EnableGestures => {
                    let base = self.reading.map_or(1.0, |r| r.base_scale);
                    self.gestures.enable(Vec2::zero(), base);
                }
                PresenceEffect::DisableGestures => {
                    self.gestures.disable();
                    self.reading = None;
                }
            }
        }
        self.publish_transition(from, now_ms);
    }

    fn place_for_reading(&mut self) {
        let origin = match self.config.freeze_frame {
            ReparentFrame::ViewerRelative => StabilizedTransform {
                position: self.config.reading_offset,
                rotation: Quat::identity(),
                scale: self.last_written.scale,
            },
            ReparentFrame::WorldFixed | ReparentFrame::Tracked => self.last_written,
        };
        self.reading = Some(ReadingPlacement::new(origin));
        self.write_transform(origin);
    }

    fn write_transform(&mut self, transform: StabilizedTransform) {
        self.last_written = transform;
        self.node_call("set_transform", |n| n.set_transform(&transform));
    }

    fn node_call<F>(&mut self, call: &str, f: F)
    where
        F: FnOnce(&mut dyn AttachedNode) -> Result<(), StickyError>,
    {
        match self.node.as_deref_mut() {
            Some(node) => {
                if let Err(e) = f(&mut *node) {
                    warn!(anchor = %self.name, node = node.id(), call, error = %e, "node call failed");
                }
            }
            None => trace!(anchor = %self.name, call, "no node attached"),
        }
    }

    fn publish_transition(&self, from: PresenceState, now_ms: f64) {
        let to = self.presence.state();
        if from == to {
            return;
        }
        let Some(bus) = self.bus.as_ref() else {
            return;
        };
        let event = Event::new(
            format!("anchor::{}", self.name),
            EventPayload::PresenceChanged {
                target: self.target,
                from,
                to,
            },
        );
        if let Err(e) = bus.publish_to(Topic::Presence, event) {
            warn!(anchor = %self.name, now_ms, error = %e, "failed to publish presence change");
        }
    }
}

impl std::fmt::Debug for AnchorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorInstance")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("state", &self.presence.state())
            .field("has_source", &self.source.is_some())
            .field("has_node", &self.node.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticky_hal::sim::{SimNode, SimTracker};
    use sticky_types::{FeedbackCue, PoseSample, TerminalPolicy};

    struct Rig {
        gate: StartGate,
        tracker: SimTracker,
        node: SimNode,
        anchor: AnchorInstance,
    }

    fn rig(config: AnchorConfig) -> Rig {
        let gate = StartGate::new();
        let tracker = SimTracker::new(0);
        let node = SimNode::new("poster");
        let anchor = AnchorInstance::new("poster", 0, config, gate.clone())
            .with_source(Box::new(tracker.clone()))
            .with_node(Box::new(node.clone()));
        Rig {
            gate,
            tracker,
            node,
            anchor,
        }
    }

    fn at(x: f32, y: f32, z: f32) -> PoseSample {
        PoseSample::at(Vec3::new(x, y, z), 0.0)
    }

    #[test]
    fn found_before_start_keeps_hidden() {
        let mut r = rig(AnchorConfig::default());
        r.tracker.set_pose(Some(at(0.0, 0.0, -1.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(16.0, 16.0);
        assert_eq!(r.anchor.state(), PresenceState::Hidden);
        assert!(!r.node.is_visible());
        assert_eq!(r.node.transform_writes(), 0, "no transform writes while hidden");
    }

    #[test]
    fn first_sample_snaps_then_smooths() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.tracker.set_pose(Some(at(0.0, 0.0, 0.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.666);
        assert_eq!(r.node.transform().position, Vec3::zero());

        r.tracker.set_pose(Some(at(1.0, 0.0, 0.0)));
        r.anchor.tick(16.666, 16.666);
        assert!((r.node.transform().position.x - 0.15).abs() < 1e-4);
        assert_eq!(r.node.feedback(), vec![FeedbackCue::Show]);
    }

    #[test]
    fn holding_freezes_transform() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.tracker.set_pose(Some(at(0.5, 0.5, -1.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        r.anchor.handle_lost(100.0);

        let writes = r.node.transform_writes();
        let frozen = r.node.transform();
        r.tracker.set_pose(Some(at(9.0, 9.0, 9.0)));
        for i in 1..10 {
            r.anchor.tick(100.0 + 16.0 * i as f64, 16.0);
        }
        assert_eq!(r.anchor.state(), PresenceState::Holding);
        assert_eq!(r.node.transform(), frozen);
        assert_eq!(r.node.transform_writes(), writes);
        assert!(r.node.is_visible());
    }

    #[test]
    fn hold_expiry_hides_node() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.tracker.set_pose(Some(at(0.0, 0.0, -1.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        r.anchor.handle_lost(1_000.0);

        r.anchor.tick(10_999.0, 16.0);
        assert!(r.node.is_visible());
        r.anchor.tick(11_001.0, 16.0);
        assert!(!r.node.is_visible());
        assert_eq!(r.anchor.state(), PresenceState::Hidden);
    }

    #[test]
    fn reacquire_snaps_to_new_pose() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.tracker.set_pose(Some(at(0.0, 0.0, 0.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        r.anchor.handle_lost(10.0);

        r.tracker.set_pose(Some(at(3.0, 0.0, 0.0)));
        r.anchor.handle_found(500.0);
        r.anchor.tick(516.0, 16.0);
        assert_eq!(r.node.transform().position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn face_viewer_overrides_rotation_only() {
        let config = AnchorConfig {
            face_viewer: true,
            ..AnchorConfig::default()
        };
        let mut r = rig(config);
        r.gate.open();
        r.tracker.set_viewer(Vec3::new(0.0, 0.0, 5.0));
        let tilted = PoseSample::new(
            Vec3::zero(),
            Quat::from_axis_angle(Vec3::up(), 1.0),
            Vec3::splat(1.0),
            0.0,
        );
        r.tracker.set_pose(Some(tilted));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);

        let t = r.node.transform();
        assert!(t.rotation.rotate(Vec3::forward()).distance(Vec3::forward()) < 1e-4);
        assert_eq!(t.position, Vec3::zero());
    }

    #[test]
    fn freeze_policy_places_for_reading_and_accepts_gestures() {
        let config = AnchorConfig {
            terminal_policy: TerminalPolicy::Freeze,
            hold_ms: 100.0,
            ..AnchorConfig::default()
        };
        let mut r = rig(config);
        r.gate.open();
        r.tracker.set_pose(Some(at(0.0, 0.0, -3.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        r.anchor.handle_lost(0.0);
        r.anchor.tick(100.0, 16.0);

        assert_eq!(r.anchor.state(), PresenceState::Frozen);
        assert_eq!(r.node.frame(), ReparentFrame::ViewerRelative);
        assert_eq!(r.node.transform().position, Vec3::new(0.0, 0.0, -1.5));
        assert!(r.node.is_visible());
        assert!(r.anchor.gestures().is_enabled());

        // Drag 100 px right and 50 px down at scale 1.
        r.anchor.handle_contacts(&[Contact::new(1, 0.0, 0.0)]);
        r.anchor.handle_contacts(&[Contact::new(1, 100.0, 50.0)]);
        let p = r.node.transform().position;
        assert!((p.x - 0.2).abs() < 1e-5);
        assert!((p.y + 0.1).abs() < 1e-5);

        // Pinch way out: clamped at 6x.
        r.anchor.handle_contacts(&[Contact::new(1, 0.0, 0.0), Contact::new(2, 10.0, 0.0)]);
        r.anchor.handle_contacts(&[Contact::new(1, 0.0, 0.0), Contact::new(2, 1000.0, 0.0)]);
        assert!((r.node.transform().scale.x - 6.0).abs() < 1e-4);
    }

    #[test]
    fn drag_keeps_scale_of_content_frozen_outside_pinch_range() {
        for size in [0.1_f32, 10.0] {
            let config = AnchorConfig {
                terminal_policy: TerminalPolicy::Freeze,
                freeze_frame: ReparentFrame::WorldFixed,
                hold_ms: 0.0,
                ..AnchorConfig::default()
            };
            let mut r = rig(config);
            r.gate.open();
            let sample = PoseSample::new(
                Vec3::new(0.0, 0.0, -2.0),
                Quat::identity(),
                Vec3::splat(size),
                0.0,
            );
            r.tracker.set_pose(Some(sample));
            r.anchor.handle_found(0.0);
            r.anchor.tick(0.0, 16.0);
            r.anchor.handle_lost(0.0);
            r.anchor.tick(16.0, 16.0);
            assert_eq!(r.anchor.state(), PresenceState::Frozen);
            assert_eq!(r.node.transform().scale, Vec3::splat(size));

            r.anchor.handle_contacts(&[Contact::new(1, 0.0, 0.0)]);
            r.anchor.handle_contacts(&[Contact::new(1, 1.0, 0.0)]);
            let t = r.node.transform();
            assert_eq!(t.scale, Vec3::splat(size), "drag rescaled content of size {size}");
            // One pixel at pan_speed 0.002, proportional to the real scale.
            assert!((t.position.x - 0.002 * size).abs() < 1e-5);
        }
    }

    #[test]
    fn found_while_frozen_returns_to_tracked_frame() {
        let config = AnchorConfig {
            terminal_policy: TerminalPolicy::Freeze,
            hold_ms: 0.0,
            ..AnchorConfig::default()
        };
        let mut r = rig(config);
        r.gate.open();
        r.tracker.set_pose(Some(at(0.0, 0.0, -3.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        r.anchor.handle_lost(0.0);
        r.anchor.tick(16.0, 16.0);
        assert_eq!(r.anchor.state(), PresenceState::Frozen);

        r.tracker.set_pose(Some(at(1.0, 1.0, -2.0)));
        r.anchor.handle_found(32.0);
        r.anchor.tick(48.0, 16.0);
        assert_eq!(r.node.frame(), ReparentFrame::Tracked);
        assert!(!r.anchor.gestures().is_enabled());
        assert_eq!(r.node.transform().position, Vec3::new(1.0, 1.0, -2.0));
    }

    #[test]
    fn contacts_outside_frozen_are_ignored() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.tracker.set_pose(Some(at(0.0, 0.0, -1.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        let before = r.node.transform_writes();
        r.anchor.handle_contacts(&[Contact::new(1, 0.0, 0.0)]);
        r.anchor.handle_contacts(&[Contact::new(1, 50.0, 0.0)]);
        assert_eq!(r.node.transform_writes(), before);
    }

    #[test]
    fn missing_source_is_a_no_op() {
        let gate = StartGate::new();
        gate.open();
        let node = SimNode::new("orphan");
        let mut anchor = AnchorInstance::new("orphan", 0, AnchorConfig::default(), gate)
            .with_node(Box::new(node.clone()));
        anchor.handle_found(0.0);
        anchor.tick(16.0, 16.0);
        anchor.tick(32.0, 16.0);
        assert!(node.is_visible());
        assert_eq!(node.transform_writes(), 0);
    }

    #[test]
    fn source_for_another_marker_is_refused() {
        let gate = StartGate::new();
        let tracker = SimTracker::new(5);
        let node = SimNode::new("poster");
        let mut anchor = AnchorInstance::new("poster", 0, AnchorConfig::default(), gate.clone())
            .with_source(Box::new(tracker.clone()))
            .with_node(Box::new(node.clone()));
        gate.open();
        tracker.set_pose(Some(at(1.0, 2.0, 3.0)));
        anchor.handle_found(0.0);
        anchor.tick(16.0, 16.0);
        assert_eq!(anchor.state(), PresenceState::Tracking);
        assert_eq!(node.transform_writes(), 0, "pose from marker 5 must not drive anchor 0");
    }

    #[test]
    fn missing_node_does_not_panic() {
        let gate = StartGate::new();
        gate.open();
        let tracker = SimTracker::new(0);
        tracker.set_pose(Some(at(0.0, 0.0, -1.0)));
        let mut anchor = AnchorInstance::new("headless", 0, AnchorConfig::default(), gate)
            .with_source(Box::new(tracker));
        anchor.handle_found(0.0);
        anchor.tick(16.0, 16.0);
        assert_eq!(anchor.transform().position, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn degenerate_samples_are_skipped() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.tracker.set_pose(Some(at(1.0, 0.0, 0.0)));
        r.anchor.handle_found(0.0);
        r.anchor.tick(0.0, 16.0);
        r.tracker.set_pose(Some(at(f32::NAN, 0.0, 0.0)));
        r.anchor.tick(16.0, 16.0);
        assert_eq!(r.node.transform().position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn invalid_config_is_clamped() {
        let config = AnchorConfig {
            pos_gain: 3.0,
            hold_ms: -5.0,
            ..AnchorConfig::default()
        };
        let r = rig(config);
        assert!(r.anchor.config().validate().is_ok());
        assert!(r.anchor.config().pos_gain < 1.0);
        assert!(r.anchor.config().hold_ms >= 0.0);
    }

    #[test]
    fn bus_events_drive_presence_and_publish_changes() {
        let bus = EventBus::default();
        let mut presence = bus.subscribe_to(Topic::Presence);
        let gate = StartGate::new();
        gate.open();
        let tracker = SimTracker::new(4);
        tracker.set_pose(Some(at(0.0, 0.0, -1.0)));
        let node = SimNode::new("poster");
        let mut anchor = AnchorInstance::new("poster", 4, AnchorConfig::default(), gate)
            .with_source(Box::new(tracker))
            .with_node(Box::new(node.clone()))
            .with_bus(&bus);

        // Another marker's event is ignored.
        bus.publish_to(Topic::Tracking, Event::new("t", EventPayload::TrackingFound { target: 1 }))
            .unwrap();
        anchor.tick(0.0, 16.0);
        assert_eq!(anchor.state(), PresenceState::Hidden);

        bus.publish_to(Topic::Tracking, Event::new("t", EventPayload::TrackingFound { target: 4 }))
            .unwrap();
        anchor.tick(16.0, 16.0);
        assert_eq!(anchor.state(), PresenceState::Tracking);
        assert!(node.is_visible());

        let changes = presence.drain();
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            changes[0].payload,
            EventPayload::PresenceChanged {
                target: 4,
                from: PresenceState::Hidden,
                to: PresenceState::Tracking
            }
        ));
    }

    #[test]
    fn found_in_same_frame_as_deadline_wins() {
        let bus = EventBus::default();
        let gate = StartGate::new();
        gate.open();
        let tracker = SimTracker::new(0);
        tracker.set_pose(Some(at(0.0, 0.0, -1.0)));
        let node = SimNode::new("poster");
        let mut anchor = AnchorInstance::new("poster", 0, AnchorConfig::default(), gate)
            .with_source(Box::new(tracker))
            .with_node(Box::new(node.clone()))
            .with_bus(&bus);

        anchor.handle_found(0.0);
        anchor.tick(0.0, 16.0);
        anchor.handle_lost(0.0);
        bus.publish_to(Topic::Tracking, Event::new("t", EventPayload::TrackingFound { target: 0 }))
            .unwrap();
        anchor.tick(10_000.0, 16.0);
        assert_eq!(anchor.state(), PresenceState::Tracking);
        assert!(node.is_visible());
    }

    #[test]
    fn teardown_hides_and_unsubscribes() {
        let bus = EventBus::default();
        let mut r = rig(AnchorConfig::default());
        r.anchor = r.anchor.with_bus(&bus);
        assert_eq!(bus.subscriber_count(Topic::Tracking), 1);
        r.gate.open();
        r.anchor.handle_found(0.0);
        assert!(r.node.is_visible());

        r.anchor.teardown(10.0);
        assert!(!r.node.is_visible());
        assert_eq!(r.anchor.state(), PresenceState::Hidden);
        assert_eq!(bus.subscriber_count(Topic::Tracking), 0);
        assert_eq!(bus.subscriber_count(Topic::Pointer), 0);
    }

    #[test]
    fn snapshot_reports_hold_countdown() {
        let mut r = rig(AnchorConfig::default());
        r.gate.open();
        r.anchor.handle_found(0.0);
        r.anchor.handle_lost(0.0);
        let snap = r.anchor.snapshot(4_000.0);
        assert_eq!(snap.state, PresenceState::Holding);
        assert_eq!(snap.hold_remaining_ms, Some(6_000.0));
        assert_eq!(snap.name, "poster");

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "holding");
        assert_eq!(json["target"], 0);
    }
}
