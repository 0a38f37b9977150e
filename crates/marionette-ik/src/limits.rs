//! Smooth scalar and rotation limits.
//!
//! Hard clamps snap when an input crosses the limit; these saturate
//! continuously instead, which keeps per-frame joint corrections stable when
//! a target drifts past a constraint.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use marionette_core::transform::EPSILON;

/// Map `value` into `(-limit, limit)` with a sigmoid saturation.
///
/// Odd and monotonic in `value`; approaches ±`limit` asymptotically. A
/// near-zero limit clamps to zero.
pub fn soft_limit(value: f32, limit: f32) -> f32 {
    if limit.abs() <= EPSILON {
        return 0.0;
    }
    limit * 2.0 * (1.0 / (1.0 + (-value * 2.0 / limit).exp()) - 0.5)
}

/// Gaussian activation: 1 at zero, falling off with `value²/variance`.
pub fn bell_curve(value: f32, variance: f32) -> f32 {
    if variance.abs() <= EPSILON {
        return if value.abs() <= EPSILON { 1.0 } else { 0.0 };
    }
    (value * value / -variance).exp()
}

/// [`bell_curve`] over the distance between two points, without the square
/// root.
pub fn distance_bell_curve(
    location: &Vector3<f32>,
    reference: &Vector3<f32>,
    variance: f32,
) -> f32 {
    if variance.abs() <= EPSILON {
        let delta = reference - location;
        return if delta.norm_squared() <= EPSILON {
            1.0
        } else {
            0.0
        };
    }
    ((reference - location).norm_squared() / -variance).exp()
}

fn limited_w(w: f32, limit: f32, soft: bool) -> f32 {
    let cos_half = (limit * 0.5).cos();
    if soft {
        1.0 - soft_limit(1.0 - w.signum() * w, 1.0 - cos_half)
    } else {
        cos_half.max(w)
    }
}

fn assemble(axis: &Vector3<f32>, w: f32, axis_norm_sq: f32) -> UnitQuaternion<f32> {
    let vector_sq = 1.0 - w * w;
    if vector_sq <= EPSILON || axis_norm_sq <= EPSILON {
        return UnitQuaternion::identity();
    }
    let rescale = (vector_sq / axis_norm_sq).sqrt();
    UnitQuaternion::new_unchecked(Quaternion::new(
        w,
        axis.x * rescale,
        axis.y * rescale,
        axis.z * rescale,
    ))
}

/// Cap a rotation's angle at `limit` radians, keeping its axis.
///
/// With `soft` the cap saturates smoothly as the input angle grows; without
/// it the scalar part is hard-clamped. Near-identity rotations come back as
/// identity.
pub fn limit_rotation(quat: &UnitQuaternion<f32>, limit: f32, soft: bool) -> UnitQuaternion<f32> {
    let axis = Vector3::new(quat.i, quat.j, quat.k);
    let axis_norm_sq = axis.norm_squared();
    let w = limited_w(quat.w, limit, soft);
    assemble(&axis, w, axis_norm_sq)
}

/// [`limit_rotation`] with the limit itself interpolated between `min` and
/// `max` by how well the rotation axis aligns with `axis`.
///
/// Aligned rotations get `max`, opposed rotations get `min`; used for
/// direction-dependent avoidance limits.
pub fn limit_rotation_around_axis(
    quat: &UnitQuaternion<f32>,
    axis: &Vector3<f32>,
    min: f32,
    max: f32,
    soft: bool,
) -> UnitQuaternion<f32> {
    let rotation_axis = Vector3::new(quat.i, quat.j, quat.k);
    let axis_norm_sq = rotation_axis.norm_squared();
    if axis_norm_sq <= EPSILON {
        return UnitQuaternion::identity();
    }

    let alignment = axis.dot(&(rotation_axis / axis_norm_sq.sqrt()));
    let limit = min + (max - min) * ((1.0 + alignment) * 0.5);

    let w = limited_w(quat.w, limit, soft);
    assemble(&rotation_axis, w, axis_norm_sq)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
