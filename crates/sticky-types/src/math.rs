//! Small value types for 2-D / 3-D math.
//!
//! Only what the pose pipeline needs: component-wise vector arithmetic,
//! linear interpolation, and unit quaternions (w, x, y, z convention) with
//! Hamilton product, spherical interpolation and YXZ Euler conversion.
//!
//! # Example
//!
//! ```rust
//! use sticky_types::math::{Quat, Vec3};
//! use std::f32::consts::FRAC_PI_2;
//!
//! // 90° about +Y turns +Z into +X.
//! let q = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2);
//! let v = q.rotate(Vec3::new(0.0, 0.0, 1.0));
//! assert!((v.x - 1.0).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

/// Squared-length threshold below which a vector or quaternion is treated as
/// having no direction.
pub const EPSILON_SQ: f32 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Vec2
// ────────────────────────────────────────────────────────────────────────────

/// A 2-D vector, used for screen-space contact positions and local-plane
/// offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector (positions, scales, directions).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// All three components set to `v`.
    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// World up (+Y).
    pub fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Local forward (+Z).
    pub fn forward() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector in the same direction, or `None` for a (near-)zero vector.
    pub fn try_normalize(self) -> Option<Self> {
        let len_sq = self.length_squared();
        if len_sq <= EPSILON_SQ || !len_sq.is_finite() {
            return None;
        }
        Some(self.scale(1.0 / len_sq.sqrt()))
    }

    /// Linear interpolation: `self + (other − self) · t`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quat
// ────────────────────────────────────────────────────────────────────────────

/// A rotation quaternion (w, x, y, z convention).
///
/// Constructors that build rotations return unit quaternions; values coming
/// from outside (tracker samples, config files) should be passed through
/// [`Quat::try_normalize`] first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    /// Create a quaternion from raw components.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about `axis`. A zero axis yields identity.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        match axis.try_normalize() {
            Some(a) => {
                let (s, c) = (angle_rad * 0.5).sin_cos();
                Self::new(c, a.x * s, a.y * s, a.z * s)
            }
            None => Self::identity(),
        }
    }

    /// Shortest-arc rotation taking unit vector `from` onto unit vector `to`.
    ///
    /// Antiparallel inputs rotate half a turn about the axis closest to world
    /// up that is perpendicular to `from`.
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let d = from.dot(to);
        if d < -1.0 + 1e-6 {
            // Any axis perpendicular to `from` works; prefer the one closest to up.
            let up = Vec3::up();
            let axis = up
                .sub(from.scale(up.dot(from)))
                .try_normalize()
                .unwrap_or_else(|| Vec3::new(1.0, 0.0, 0.0).cross(from));
            return Self::from_axis_angle(axis, std::f32::consts::PI);
        }
        let c = from.cross(to);
        Self::new(1.0 + d, c.x, c.y, c.z).normalize()
    }

    /// Build from intrinsic Y-X-Z Euler angles (yaw about Y, then pitch about
    /// the rotated X, then roll about the rotated Z).
    pub fn from_euler_yxz(yaw: f32, pitch: f32, roll: f32) -> Self {
        let (s1, c1) = (pitch * 0.5).sin_cos();
        let (s2, c2) = (yaw * 0.5).sin_cos();
        let (s3, c3) = (roll * 0.5).sin_cos();
        Self::new(
            c1 * c2 * c3 + s1 * s2 * s3,
            s1 * c2 * c3 + c1 * s2 * s3,
            c1 * s2 * c3 - s1 * c2 * s3,
            c1 * c2 * s3 - s1 * s2 * c3,
        )
    }

    /// Decompose into `(yaw, pitch, roll)` in the Y-X-Z order used by
    /// [`Quat::from_euler_yxz`].
    ///
    /// At gimbal lock (pitch = ±90°) roll is folded into yaw and reported as 0.
    pub fn to_euler_yxz(self) -> (f32, f32, f32) {
        let (x2, y2, z2) = (self.x + self.x, self.y + self.y, self.z + self.z);
        let (xx, xy, xz) = (self.x * x2, self.x * y2, self.x * z2);
        let (yy, yz, zz) = (self.y * y2, self.y * z2, self.z * z2);
        let (wx, wy, wz) = (self.w * x2, self.w * y2, self.w * z2);

        let m11 = 1.0 - (yy + zz);
        let m13 = xz + wy;
        let m21 = xy + wz;
        let m22 = 1.0 - (xx + zz);
        let m23 = yz - wx;
        let m31 = xz - wy;
        let m33 = 1.0 - (xx + yy);

        let pitch = (-m23.clamp(-1.0, 1.0)).asin();
        if m23.abs() < 0.999_999 {
            (m13.atan2(m33), pitch, m21.atan2(m22))
        } else {
            ((-m31).atan2(m11), pitch, 0.0)
        }
    }

    /// Hamilton product: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let r = self.mul(p).mul(self.conjugate());
        Vec3::new(r.x, r.y, r.z)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn norm_squared(self) -> f32 {
        self.dot(self)
    }

    /// Unit quaternion in the same direction, or `None` for a (near-)zero or
    /// non-finite quaternion.
    pub fn try_normalize(self) -> Option<Self> {
        let n = self.norm_squared();
        if n <= EPSILON_SQ || !n.is_finite() {
            return None;
        }
        let inv = 1.0 / n.sqrt();
        Some(Self::new(self.w * inv, self.x * inv, self.y * inv, self.z * inv))
    }

    /// Normalised copy; degenerate input collapses to identity.
    pub fn normalize(self) -> Self {
        self.try_normalize().unwrap_or_else(Self::identity)
    }

    /// Spherical linear interpolation along the shorter arc.
    ///
    /// Falls back to normalised lerp when the inputs are nearly parallel.
    pub fn slerp(self, other: Self, t: f32) -> Self {
        let mut dot = self.dot(other);
        let other = if dot < 0.0 {
            dot = -dot;
            Self::new(-other.w, -other.x, -other.y, -other.z)
        } else {
            other
        };

        if dot > 0.9995 {
            return Self::new(
                self.w + (other.w - self.w) * t,
                self.x + (other.x - self.x) * t,
                self.y + (other.y - self.y) * t,
                self.z + (other.z - self.z) * t,
            )
            .normalize();
        }

        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta_0 = theta_0.sin();
        let s0 = (theta_0 - theta).sin() / sin_theta_0;
        let s1 = theta.sin() / sin_theta_0;

        Self::new(
            self.w * s0 + other.w * s1,
            self.x * s0 + other.x * s1,
            self.y * s0 + other.y * s1,
            self.z * s0 + other.z * s1,
        )
    }

    /// Angle in radians between two unit rotations (0 ..= π).
    pub fn angle_to(self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        2.0 * d.acos()
    }

    pub fn is_finite(self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
