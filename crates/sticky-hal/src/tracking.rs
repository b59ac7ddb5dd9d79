//! Generic `TrackingSource` trait for marker trackers.
//!
//! `found` / `lost` notifications travel over the event bus; this trait only
//! covers the per-tick pull of the current pose, which is read once per
//! frame while the marker is tracked.

use sticky_types::{PoseSample, Vec3};

/// A source of world-space pose samples for one tracked marker.
pub trait TrackingSource: Send {
    /// Index of the marker this source follows. Bus events carrying a
    /// different target are not meant for this source's anchor.
    fn target(&self) -> u32;

    /// Latest world-space pose of the marker, or `None` when no sample is
    /// available this frame.
    fn current_world_pose(&self) -> Option<PoseSample>;

    /// World-space position of the viewer (camera).
    fn viewer_world_position(&self) -> Vec3;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticky_types::Quat;

    /// Fixed-pose source used only for tests.
    struct StaticSource {
        pose: PoseSample,
    }

    impl TrackingSource for StaticSource {
        fn target(&self) -> u32 {
            3
        }

        fn current_world_pose(&self) -> Option<PoseSample> {
            Some(self.pose)
        }

        fn viewer_world_position(&self) -> Vec3 {
            Vec3::zero()
        }
    }

    #[test]
    fn trait_is_object_safe() {
        let pose = PoseSample::new(Vec3::new(1.0, 2.0, 3.0), Quat::identity(), Vec3::splat(1.0), 0.0);
        let source: Box<dyn TrackingSource> = Box::new(StaticSource { pose });
        assert_eq!(source.target(), 3);
        assert_eq!(source.current_world_pose(), Some(pose));
    }
}
