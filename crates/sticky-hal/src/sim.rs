//! In-process simulated collaborators for headless tests and replay.
//!
//! [`SimTracker`] and [`SimNode`] keep their state behind an
//! `Arc<Mutex<_>>`, so a test can hand a boxed clone to an anchor and keep
//! another clone as a probe: the probe drives the tracker and inspects what
//! the engine wrote to the node.
//!
//! # Example
//!
//! ```rust
//! use sticky_hal::sim::{SimNode, SimTracker};
//! use sticky_hal::{AttachedNode, TrackingSource};
//! use sticky_types::{PoseSample, Vec3};
//!
//! let tracker = SimTracker::new(0);
//! let boxed: Box<dyn TrackingSource> = Box::new(tracker.clone());
//! assert!(boxed.current_world_pose().is_none());
//!
//! tracker.set_pose(Some(PoseSample::at(Vec3::new(0.0, 0.0, -1.0), 0.0)));
//! assert!(boxed.current_world_pose().is_some());
//!
//! let node = SimNode::new("poster");
//! let mut boxed_node: Box<dyn AttachedNode> = Box::new(node.clone());
//! boxed_node.set_visible(true).expect("sim node never fails");
//! assert!(node.is_visible());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use sticky_types::{
    FeedbackCue, PoseSample, ReparentFrame, StabilizedTransform, StickyError, Vec3,
};

use crate::node::AttachedNode;
use crate::tracking::TrackingSource;

// ────────────────────────────────────────────────────────────────────────────
// Stub tracker
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TrackerState {
    pose: Option<PoseSample>,
    viewer: Vec3,
}

/// A simulated tracker whose pose and viewer position are set by the test.
#[derive(Debug, Clone)]
pub struct SimTracker {
    target: u32,
    state: Arc<Mutex<TrackerState>>,
}

impl SimTracker {
    /// Create a tracker for marker `target` with no pose and the viewer at
    /// the origin.
    pub fn new(target: u32) -> Self {
        Self {
            target,
            state: Arc::new(Mutex::new(TrackerState::default())),
        }
    }

    /// Set (or clear) the pose returned by the next
    /// [`current_world_pose`][TrackingSource::current_world_pose] call.
    pub fn set_pose(&self, pose: Option<PoseSample>) {
        self.state.lock().pose = pose;
    }

    pub fn set_viewer(&self, position: Vec3) {
        self.state.lock().viewer = position;
    }
}

impl TrackingSource for SimTracker {
    fn target(&self) -> u32 {
        self.target
    }

    fn current_world_pose(&self) -> Option<PoseSample> {
        self.state.lock().pose
    }

    fn viewer_world_position(&self) -> Vec3 {
        self.state.lock().viewer
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub node
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct NodeState {
    transform: StabilizedTransform,
    visible: bool,
    frame: ReparentFrame,
    transform_writes: usize,
    feedback: Vec<FeedbackCue>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            transform: StabilizedTransform::identity(),
            visible: false,
            frame: ReparentFrame::Tracked,
            transform_writes: 0,
            feedback: Vec::new(),
        }
    }
}

/// A simulated content node that records every call it receives.
/// Always succeeds.
#[derive(Debug, Clone)]
pub struct SimNode {
    id: String,
    state: Arc<Mutex<NodeState>>,
}

impl SimNode {
    /// Create a hidden node parented to the tracked frame.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(NodeState::default())),
        }
    }

    /// Last transform written to the node.
    pub fn transform(&self) -> StabilizedTransform {
        self.state.lock().transform
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Current parent frame.
    pub fn frame(&self) -> ReparentFrame {
        self.state.lock().frame
    }

    /// Number of `set_transform` calls received so far.
    pub fn transform_writes(&self) -> usize {
        self.state.lock().transform_writes
    }

    /// Feedback cues played so far, oldest first.
    pub fn feedback(&self) -> Vec<FeedbackCue> {
        self.state.lock().feedback.clone()
    }
}

impl AttachedNode for SimNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_transform(&mut self, transform: &StabilizedTransform) -> Result<(), StickyError> {
        let mut state = self.state.lock();
        state.transform = *transform;
        state.transform_writes += 1;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), StickyError> {
        debug!(node = %self.id, visible, "sim node visibility");
        self.state.lock().visible = visible;
        Ok(())
    }

    fn reparent(&mut self, frame: ReparentFrame) -> Result<(), StickyError> {
        debug!(node = %self.id, ?frame, "sim node reparented");
        self.state.lock().frame = frame;
        Ok(())
    }

    fn play_feedback(&mut self, cue: FeedbackCue) -> Result<(), StickyError> {
        self.state.lock().feedback.push(cue);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticky_types::Quat;

    #[test]
    fn tracker_clones_share_pose() {
        let probe = SimTracker::new(2);
        let source: Box<dyn TrackingSource> = Box::new(probe.clone());
        assert_eq!(source.target(), 2);
        assert!(source.current_world_pose().is_none());

        let pose = PoseSample::new(Vec3::new(0.0, 1.0, -2.0), Quat::identity(), Vec3::splat(1.0), 5.0);
        probe.set_pose(Some(pose));
        probe.set_viewer(Vec3::new(0.0, 1.6, 0.0));
        assert_eq!(source.current_world_pose(), Some(pose));
        assert_eq!(source.viewer_world_position(), Vec3::new(0.0, 1.6, 0.0));

        probe.set_pose(None);
        assert!(source.current_world_pose().is_none());
    }

    #[test]
    fn node_records_calls() {
        let probe = SimNode::new("poster");
        let mut node: Box<dyn AttachedNode> = Box::new(probe.clone());
        assert_eq!(node.id(), "poster");
        assert!(!probe.is_visible());

        let t = StabilizedTransform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::identity(),
            scale: Vec3::splat(2.0),
        };
        node.set_transform(&t).unwrap();
        node.set_visible(true).unwrap();
        node.reparent(ReparentFrame::ViewerRelative).unwrap();
        node.play_feedback(FeedbackCue::LostPulse).unwrap();

        assert_eq!(probe.transform(), t);
        assert_eq!(probe.transform_writes(), 1);
        assert!(probe.is_visible());
        assert_eq!(probe.frame(), ReparentFrame::ViewerRelative);
        assert_eq!(probe.feedback(), vec![FeedbackCue::LostPulse]);
    }
}
