//! [`Stage`] – a set of anchors sharing one bus and one start gate.
//!
//! The host publishes tracker and pointer traffic on the stage's bus and
//! calls [`Stage::tick`] once per rendered frame. `ExperienceStarted` on the
//! lifecycle topic opens the shared [`StartGate`] before any anchor drains
//! its tracking events, so a start and a `found` arriving in the same frame
//! are handled in that order.
//!
//! # Example
//!
//! ```
//! use sticky_hal::sim::{SimNode, SimTracker};
//! use sticky_middleware::Topic;
//! use sticky_runtime::stage::Stage;
//! use sticky_types::{AnchorConfig, Event, EventPayload, PresenceState};
//!
//! let mut stage = Stage::default();
//! stage.add_anchor(
//!     "poster",
//!     0,
//!     AnchorConfig::default(),
//!     Box::new(SimTracker::new(0)),
//!     Box::new(SimNode::new("poster")),
//! );
//!
//! let bus = stage.bus().clone();
//! bus.publish_to(Topic::Lifecycle, Event::new("ui", EventPayload::ExperienceStarted)).unwrap();
//! bus.publish_to(Topic::Tracking, Event::new("tracker", EventPayload::TrackingFound { target: 0 })).unwrap();
//! stage.tick(0.0, 16.0);
//!
//! assert_eq!(stage.anchor("poster").map(|a| a.state()), Some(PresenceState::Tracking));
//! ```

use sticky_hal::{AttachedNode, TrackingSource};
use sticky_kernel::StartGate;
use sticky_middleware::{EventBus, Subscription, Topic};
use sticky_types::{AnchorConfig, EventPayload};
use tracing::{debug, info};

use crate::anchor::{AnchorInstance, AnchorSnapshot};

/// Anchors driven together, frame by frame.
#[derive(Debug)]
pub struct Stage {
    bus: EventBus,
    gate: StartGate,
    lifecycle: Subscription,
    anchors: Vec<AnchorInstance>,
    now_ms: f64,
}

impl Stage {
    /// Create an empty stage on `bus`.
    pub fn new(bus: EventBus) -> Self {
        let lifecycle = bus.subscribe_to(Topic::Lifecycle);
        Self {
            bus,
            gate: StartGate::new(),
            lifecycle,
            anchors: Vec::new(),
            now_ms: 0.0,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The shared start gate. Hosts that do not route the start gesture over
    /// the bus can open it directly.
    pub fn gate(&self) -> &StartGate {
        &self.gate
    }

    /// Timestamp of the last tick.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Add an anchor wired to this stage's bus and gate.
    pub fn add_anchor(
        &mut self,
        name: impl Into<String>,
        target: u32,
        config: AnchorConfig,
        source: Box<dyn TrackingSource>,
        node: Box<dyn AttachedNode>,
    ) -> &mut AnchorInstance {
        let anchor = AnchorInstance::new(name, target, config, self.gate.clone())
            .with_source(source)
            .with_node(node)
            .with_bus(&self.bus);
        info!(anchor = anchor.name(), target, "anchor added");
        self.anchors.push(anchor);
        let last = self.anchors.len() - 1;
        &mut self.anchors[last]
    }

    /// Tear down and remove the anchor called `name`. Returns `false` if no
    /// such anchor exists.
    pub fn remove_anchor(&mut self, name: &str) -> bool {
        let Some(index) = self.anchors.iter().position(|a| a.name() == name) else {
            return false;
        };
        let mut anchor = self.anchors.remove(index);
        anchor.teardown(self.now_ms);
        true
    }

    pub fn anchor(&self, name: &str) -> Option<&AnchorInstance> {
        self.anchors.iter().find(|a| a.name() == name)
    }

    pub fn anchor_mut(&mut self, name: &str) -> Option<&mut AnchorInstance> {
        self.anchors.iter_mut().find(|a| a.name() == name)
    }

    pub fn anchors(&self) -> &[AnchorInstance] {
        &self.anchors
    }

    /// Advance every anchor by one frame.
    pub fn tick(&mut self, now_ms: f64, dt_ms: f32) {
        self.now_ms = now_ms;
        for event in self.lifecycle.drain() {
            if matches!(event.payload, EventPayload::ExperienceStarted) && !self.gate.open() {
                debug!("duplicate experience start ignored");
            }
        }
        for anchor in &mut self.anchors {
            anchor.tick(now_ms, dt_ms);
        }
    }

    /// Snapshots of every anchor at the last tick.
    pub fn snapshots(&self) -> Vec<AnchorSnapshot> {
        self.anchors.iter().map(|a| a.snapshot(self.now_ms)).collect()
    }

    /// Tear down every anchor.
    pub fn shutdown(&mut self) {
        for anchor in &mut self.anchors {
            anchor.teardown(self.now_ms);
        }
        self.anchors.clear();
        info!("stage shut down");
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticky_hal::sim::{SimNode, SimTracker};
    use sticky_types::{Event, PoseSample, PresenceState, Vec3};

    fn publish(stage: &Stage, topic: Topic, payload: EventPayload) {
        stage
            .bus()
            .publish_to(topic, Event::new("test", payload))
            .expect("publish must succeed");
    }

    fn stage_with(targets: &[u32]) -> (Stage, Vec<SimTracker>, Vec<SimNode>) {
        let mut stage = Stage::default();
        let mut trackers = Vec::new();
        let mut nodes = Vec::new();
        for &t in targets {
            let tracker = SimTracker::new(t);
            tracker.set_pose(Some(PoseSample::at(Vec3::new(t as f32, 0.0, -1.0), 0.0)));
            let node = SimNode::new(format!("node-{t}"));
            stage.add_anchor(
                format!("anchor-{t}"),
                t,
                AnchorConfig::default(),
                Box::new(tracker.clone()),
                Box::new(node.clone()),
            );
            trackers.push(tracker);
            nodes.push(node);
        }
        (stage, trackers, nodes)
    }

    #[test]
    fn found_is_ignored_until_started() {
        let (mut stage, _trackers, nodes) = stage_with(&[0]);
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 0 });
        stage.tick(0.0, 16.0);
        assert!(!nodes[0].is_visible());
        assert!(!stage.gate().has_started());
    }

    #[test]
    fn start_and_found_in_same_frame() {
        let (mut stage, _trackers, nodes) = stage_with(&[0]);
        publish(&stage, Topic::Lifecycle, EventPayload::ExperienceStarted);
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 0 });
        stage.tick(0.0, 16.0);
        assert!(stage.gate().has_started());
        assert!(nodes[0].is_visible());
    }

    #[test]
    fn anchors_only_react_to_their_target() {
        let (mut stage, _trackers, nodes) = stage_with(&[0, 1]);
        stage.gate().open();
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 1 });
        stage.tick(0.0, 16.0);
        assert!(!nodes[0].is_visible());
        assert!(nodes[1].is_visible());
        assert_eq!(nodes[1].transform().position, Vec3::new(1.0, 0.0, -1.0));

        let states: Vec<_> = stage.snapshots().into_iter().map(|s| s.state).collect();
        assert_eq!(states, vec![PresenceState::Hidden, PresenceState::Tracking]);
    }

    #[test]
    fn independent_hold_timers() {
        let (mut stage, _trackers, nodes) = stage_with(&[0, 1]);
        stage.gate().open();
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 0 });
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 1 });
        stage.tick(0.0, 16.0);
        publish(&stage, Topic::Tracking, EventPayload::TrackingLost { target: 0 });
        stage.tick(1_000.0, 16.0);
        publish(&stage, Topic::Tracking, EventPayload::TrackingLost { target: 1 });
        stage.tick(5_000.0, 16.0);

        stage.tick(11_000.0, 16.0);
        assert!(!nodes[0].is_visible());
        assert!(nodes[1].is_visible());
        stage.tick(15_000.0, 16.0);
        assert!(!nodes[1].is_visible());
    }

    #[test]
    fn remove_anchor_tears_down() {
        let (mut stage, _trackers, nodes) = stage_with(&[0]);
        stage.gate().open();
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 0 });
        stage.tick(0.0, 16.0);
        assert!(nodes[0].is_visible());

        assert!(stage.remove_anchor("anchor-0"));
        assert!(!nodes[0].is_visible());
        assert!(!stage.remove_anchor("anchor-0"));
        assert_eq!(stage.bus().subscriber_count(Topic::Tracking), 0);
    }

    #[test]
    fn shutdown_hides_everything() {
        let (mut stage, _trackers, nodes) = stage_with(&[0, 1]);
        stage.gate().open();
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 0 });
        publish(&stage, Topic::Tracking, EventPayload::TrackingFound { target: 1 });
        stage.tick(0.0, 16.0);
        stage.shutdown();
        assert!(stage.anchors().is_empty());
        assert!(nodes.iter().all(|n| !n.is_visible()));
    }
}
