//! Scaled rigid transform and the small vector/quaternion helpers shared by
//! every solver.
//!
//! [`Transform`] applies scale, then rotation, then translation. Composition
//! multiplies scale component-wise and is therefore only exact for uniform
//! scale; point mapping through [`Transform::inverse_transform_point`] is
//! exact for any scale.

use std::ops::Mul;

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Tolerance below which lengths and squared norms are treated as zero.
pub const EPSILON: f32 = 1.0e-6;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Position, orientation, and non-uniform scale of a bone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Translation and rotation with unit scale.
    pub fn from_parts(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self::new(translation, rotation, Vector3::repeat(1.0))
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self::from_parts(translation, UnitQuaternion::identity())
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self::from_parts(Vector3::zeros(), rotation)
    }

    /// Map a point from this transform's local space to its parent space.
    pub fn transform_point(&self, point: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * point.component_mul(&self.scale) + self.translation
    }

    /// Map a point from parent space into this transform's local space.
    ///
    /// Exact for non-uniform scale; components along a near-zero scale axis
    /// collapse to zero.
    pub fn inverse_transform_point(&self, point: &Vector3<f32>) -> Vector3<f32> {
        let unrotated = self.rotation.inverse() * (point - self.translation);
        unrotated.component_mul(&recip_guarded(&self.scale))
    }

    /// Rotate and scale a direction vector (no translation).
    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * vector.component_mul(&self.scale)
    }

    /// Rotate a direction vector, ignoring scale.
    pub fn rotate_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * vector
    }

    pub fn unit_x(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    pub fn unit_y(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    pub fn unit_z(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }

    /// Component-wise inverse. Exact for uniform scale.
    pub fn inverse(&self) -> Self {
        let inv_scale = recip_guarded(&self.scale);
        let inv_rotation = self.rotation.inverse();
        let inv_translation = inv_rotation * (-self.translation).component_mul(&inv_scale);
        Self {
            translation: inv_translation,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// Interpolate between two transforms: lerp translation and scale, slerp
    /// rotation. `t = 0` yields `a`, `t = 1` yields `b`.
    pub fn blend(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            translation: a.translation.lerp(&b.translation, t),
            rotation: slerp(&a.rotation, &b.rotation, t),
            scale: a.scale.lerp(&b.scale, t),
        }
    }
}

impl From<UnitQuaternion<f32>> for Transform {
    fn from(rotation: UnitQuaternion<f32>) -> Self {
        Self::from_rotation(rotation)
    }
}

/// `parent * child` maps child-local coordinates through the child into the
/// parent's parent space.
impl Mul for Transform {
    type Output = Self;

    fn mul(self, child: Self) -> Self {
        Self {
            translation: self.transform_point(&child.translation),
            rotation: self.rotation * child.rotation,
            scale: self.scale.component_mul(&child.scale),
        }
    }
}

// ---------------------------------------------------------------------------
// Vector / quaternion helpers
// ---------------------------------------------------------------------------

/// Component-wise reciprocal; near-zero components map to zero.
fn recip_guarded(scale: &Vector3<f32>) -> Vector3<f32> {
    scale.map(|s| if s.abs() <= EPSILON { 0.0 } else { 1.0 / s })
}

/// Shortest-arc rotation taking `from` to `to`.
///
/// Degenerate inputs (either vector near zero) yield identity; antiparallel
/// vectors yield a half-turn about an arbitrary perpendicular axis.
pub fn rotation_between(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    if from.norm_squared() <= EPSILON || to.norm_squared() <= EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        let reference = if from.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let perpendicular = from.cross(&reference);
        if perpendicular.norm_squared() <= EPSILON {
            return UnitQuaternion::identity();
        }
        UnitQuaternion::from_axis_angle(
            &Unit::new_normalize(perpendicular),
            std::f32::consts::PI,
        )
    })
}

/// Remove from `vector` its component along the unit `normal`.
pub fn plane_project(vector: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    vector - normal * vector.dot(normal)
}

/// Normalize, or return the zero vector when the input is near zero.
pub fn safe_normal(vector: &Vector3<f32>) -> Vector3<f32> {
    vector
        .try_normalize(EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

/// Normalize, or fall back to the supplied direction.
pub fn normal_or(vector: &Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    vector.try_normalize(EPSILON).unwrap_or(fallback)
}

/// Clamp a vector's magnitude to at most `max`.
pub fn clamp_norm(vector: &Vector3<f32>, max: f32) -> Vector3<f32> {
    let norm_sq = vector.norm_squared();
    if norm_sq > max * max {
        vector * (max / norm_sq.sqrt())
    } else {
        *vector
    }
}

/// Rotation about `axis_degrees.normalize()` by `axis_degrees.norm()` degrees.
/// Near-zero vectors yield identity.
pub fn axis_angle_degrees(axis_degrees: &Vector3<f32>) -> UnitQuaternion<f32> {
    let angle = axis_degrees.norm();
    if angle <= EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(*axis_degrees), angle.to_radians())
}

/// Rotation about `axis` (not necessarily unit) by `angle` radians. A zero
/// axis yields identity; a non-unit axis attenuates the rotation towards
/// identity in proportion to its length.
pub fn axis_angle_or_identity(axis: &Vector3<f32>, angle: f32) -> UnitQuaternion<f32> {
    if axis.norm_squared() <= EPSILON {
        return UnitQuaternion::identity();
    }
    let half = angle * 0.5;
    UnitQuaternion::new_normalize(Quaternion::from_parts(half.cos(), axis * half.sin()))
}

/// Slerp that falls back to the nearer endpoint for antipodal rotations.
pub fn slerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    a.try_slerp(b, t, EPSILON)
        .unwrap_or(if t < 0.5 { *a } else { *b })
}

/// Hermite smoothstep of `x` clamped to `[edge0, edge1]`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if (edge1 - edge0).abs() <= EPSILON {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn transform_point_applies_scale_rotation_translation() {
        let t = Transform::new(
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            Vector3::new(2.0, 1.0, 1.0),
        );
        // (1,0,0) scaled to (2,0,0), rotated to (0,2,0), translated.
        let p = t.transform_point(&Vector3::x());
        assert_relative_eq!(p, Vector3::new(1.0, 4.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn inverse_transform_point_roundtrips_nonuniform_scale() {
        let t = Transform::new(
            Vector3::new(-2.0, 0.5, 4.0),
            UnitQuaternion::from_euler_angles(0.3, -0.8, 1.1),
            Vector3::new(2.0, 3.0, 0.5),
        );
        let p = Vector3::new(1.2, -3.4, 0.7);
        let roundtrip = t.inverse_transform_point(&t.transform_point(&p));
        assert_relative_eq!(roundtrip, p, epsilon = 1e-4);
    }

    #[test]
    fn compose_matches_sequential_application() {
        let parent = Transform::new(
            Vector3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            Vector3::repeat(1.0),
        );
        let child = Transform::from_translation(Vector3::new(2.0, 0.0, 0.0));
        let composed = parent * child;
        let p = Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(
            composed.transform_point(&p),
            parent.transform_point(&child.transform_point(&p)),
            epsilon = 1e-5
        );
    }

    #[test]
    fn inverse_composes_to_identity_for_uniform_scale() {
        let t = Transform::new(
            Vector3::new(3.0, -1.0, 2.0),
            UnitQuaternion::from_euler_angles(0.5, 0.25, -0.75),
            Vector3::repeat(2.0),
        );
        let id = t.inverse() * t;
        assert_relative_eq!(id.translation, Vector3::zeros(), epsilon = 1e-4);
        assert_relative_eq!(id.rotation.angle(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(id.scale, Vector3::repeat(1.0), epsilon = 1e-5);
    }

    #[test]
    fn blend_hits_both_endpoints() {
        let a = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));
        let b = Transform::new(
            Vector3::new(3.0, 2.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0),
            Vector3::repeat(2.0),
        );
        let at_a = Transform::blend(&a, &b, 0.0);
        let at_b = Transform::blend(&a, &b, 1.0);
        assert_relative_eq!(at_a.translation, a.translation, epsilon = 1e-6);
        assert_relative_eq!(at_b.translation, b.translation, epsilon = 1e-6);
        assert_relative_eq!(at_b.rotation.angle(), 1.0, epsilon = 1e-5);
        let mid = Transform::blend(&a, &b, 0.5);
        assert_relative_eq!(mid.translation, Vector3::new(2.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn rotation_between_maps_from_onto_to() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let to = Vector3::new(0.0, 3.0, 0.0);
        let q = rotation_between(&from, &to);
        assert_relative_eq!(q * from, Vector3::y(), epsilon = 1e-5);
    }

    #[test]
    fn rotation_between_antiparallel_is_half_turn() {
        let from = Vector3::new(0.0, 2.0, 0.0);
        let q = rotation_between(&from, &-from);
        assert_relative_eq!(q.angle(), PI, epsilon = 1e-4);
        assert_relative_eq!(q * from, -from, epsilon = 1e-4);
    }

    #[test]
    fn rotation_between_zero_vector_is_identity() {
        let q = rotation_between(&Vector3::zeros(), &Vector3::x());
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn plane_project_removes_normal_component() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let projected = plane_project(&v, &Vector3::z());
        assert_relative_eq!(projected, Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(projected.dot(&Vector3::z()), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn clamp_norm_caps_long_vectors_only() {
        let long = Vector3::new(3.0, 4.0, 0.0);
        assert_relative_eq!(clamp_norm(&long, 2.5).norm(), 2.5, epsilon = 1e-5);
        let short = Vector3::new(0.3, 0.4, 0.0);
        assert_relative_eq!(clamp_norm(&short, 2.5), short, epsilon = 1e-6);
    }

    #[test]
    fn axis_angle_degrees_encodes_angle_in_length() {
        let q = axis_angle_degrees(&Vector3::new(0.0, 0.0, 90.0));
        assert_relative_eq!(q.angle(), FRAC_PI_2, epsilon = 1e-5);
        assert_relative_eq!(q * Vector3::x(), Vector3::y(), epsilon = 1e-5);
        let id = axis_angle_degrees(&Vector3::zeros());
        assert_relative_eq!(id.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn axis_angle_or_identity_attenuates_short_axes() {
        let full = axis_angle_or_identity(&Vector3::z(), 1.0);
        assert_relative_eq!(full.angle(), 1.0, epsilon = 1e-5);
        let attenuated = axis_angle_or_identity(&(Vector3::z() * 0.5), 1.0);
        assert!(attenuated.angle() < full.angle());
        assert!(attenuated.angle() > 0.0);
        let none = axis_angle_or_identity(&Vector3::zeros(), 1.0);
        assert_relative_eq!(none.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn smoothstep_endpoints_and_midpoint() {
        assert_relative_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_relative_eq!(smoothstep(0.0, 1.0, 0.0), 0.0);
        assert_relative_eq!(smoothstep(0.0, 1.0, 0.5), 0.5, epsilon = 1e-6);
        assert_relative_eq!(smoothstep(0.0, 1.0, 1.0), 1.0);
        assert_relative_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
    }
}
