//! Billboard constraint – orient content toward the viewer.
//!
//! The constraint computes a rotation whose local forward axis (+Z) points
//! from the content toward the viewer. With roll lock enabled the rotation is
//! decomposed into yaw / pitch / roll about world up (+Y) and rebuilt with
//! zero roll, so text and video keep a level horizon however the viewer moves.
//!
//! It only ever replaces the rotation channel of the filter output; position
//! and scale keep their own smoothing. The constraint holds no state.

use sticky_types::{Quat, Vec3};

/// Stateless viewer-facing rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillboardConstraint;

impl BillboardConstraint {
    /// Rotation facing `viewer_position` from `base_position`.
    ///
    /// Returns `None` when the two positions coincide (or are not finite), as
    /// there is no direction to face.
    pub fn try_apply(base_position: Vec3, viewer_position: Vec3, lock_roll: bool) -> Option<Quat> {
        let dir = viewer_position.sub(base_position).try_normalize()?;
        let facing = Quat::from_rotation_arc(Vec3::forward(), dir);
        if !lock_roll {
            return Some(facing);
        }
        let (yaw, pitch, _roll) = facing.to_euler_yxz();
        Some(Quat::from_euler_yxz(yaw, pitch, 0.0))
    }

    /// Like [`BillboardConstraint::try_apply`], falling back to identity when
    /// no direction exists.
    pub fn apply(base_position: Vec3, viewer_position: Vec3, lock_roll: bool) -> Quat {
        Self::try_apply(base_position, viewer_position, lock_roll).unwrap_or_else(Quat::identity)
    }
}
