//! Degenerate-sample rejection.
//!
//! Trackers occasionally emit garbage (NaN from a failed decomposition, a
//! collapsed scale when the marker is seen edge-on). Such a sample must not
//! reach the filter, where it would corrupt the stabilized transform for
//! every later frame. [`admit`] accepts a sample only when every channel is
//! finite and non-degenerate, and hands back a copy with a unit rotation.

use sticky_types::{PoseSample, StickyError};

/// Any scale axis with a smaller magnitude than this is treated as collapsed.
pub const MIN_SCALE: f32 = 1e-6;

/// Validate `sample` and return it with its rotation normalised.
///
/// # Errors
///
/// Returns [`StickyError::DegenerateSample`] for non-finite components, a
/// zero-length rotation, or a collapsed scale axis.
pub fn admit(sample: &PoseSample) -> Result<PoseSample, StickyError> {
    if !sample.position.is_finite() {
        return Err(degenerate("position is not finite"));
    }
    if !sample.scale.is_finite() {
        return Err(degenerate("scale is not finite"));
    }
    let s = sample.scale;
    if s.x.abs() < MIN_SCALE || s.y.abs() < MIN_SCALE || s.z.abs() < MIN_SCALE {
        return Err(degenerate("scale has a zero-length axis"));
    }
    let rotation = sample
        .rotation
        .try_normalize()
        .ok_or_else(|| degenerate("rotation is zero-length or not finite"))?;

    Ok(PoseSample {
        rotation,
        ..*sample
    })
}

fn degenerate(what: &str) -> StickyError {
    StickyError::DegenerateSample(what.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticky_types::{Quat, Vec3};

    #[test]
    fn well_formed_sample_is_admitted_with_unit_rotation() {
        let sample = PoseSample::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::new(2.0, 0.0, 0.0, 0.0),
            Vec3::splat(1.0),
            0.0,
        );
        let out = admit(&sample).unwrap();
        assert_eq!(out.position, sample.position);
        assert!((out.rotation.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nan_position_is_rejected() {
        let sample = PoseSample::at(Vec3::new(f32::NAN, 0.0, 0.0), 0.0);
        assert!(matches!(admit(&sample), Err(StickyError::DegenerateSample(_))));
    }

    #[test]
    fn infinite_scale_is_rejected() {
        let mut sample = PoseSample::at(Vec3::zero(), 0.0);
        sample.scale = Vec3::new(1.0, f32::INFINITY, 1.0);
        assert!(admit(&sample).is_err());
    }

    #[test]
    fn collapsed_scale_axis_is_rejected() {
        let mut sample = PoseSample::at(Vec3::zero(), 0.0);
        sample.scale = Vec3::new(1.0, 0.0, 1.0);
        assert!(admit(&sample).is_err());
    }

    #[test]
    fn zero_rotation_is_rejected() {
        let mut sample = PoseSample::at(Vec3::zero(), 0.0);
        sample.rotation = Quat::new(0.0, 0.0, 0.0, 0.0);
        assert!(admit(&sample).is_err());
    }

    #[test]
    fn mirrored_scale_is_admitted() {
        let mut sample = PoseSample::at(Vec3::zero(), 0.0);
        sample.scale = Vec3::new(-1.0, 1.0, 1.0);
        assert!(admit(&sample).is_ok());
    }
}
