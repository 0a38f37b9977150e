//! Evenly distributed neck bend and twist.
//!
//! Decomposes the reorientation of the chain's end towards a target into a
//! bend (forward axis onto the target direction) and a twist (up axis onto
//! the target's up, around the target direction), soft-limits both, and
//! applies the same per-segment fraction to every bone while re-deriving
//! each child from its local offset so the increments compound along the
//! chain.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use marionette_core::debug::color;
use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{axis_angle_or_identity, safe_normal};
use marionette_core::types::{Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::limits::soft_limit;

fn default_intensity() -> f32 {
    0.75
}
fn default_bend_angle_limit() -> f32 {
    90.0
}
fn default_twist_angle_limit() -> f32 {
    75.0
}
fn default_forward_axis() -> Vector3<f32> {
    Vector3::x()
}
fn default_up_axis() -> Vector3<f32> {
    Vector3::z()
}

/// Parameters for the neck solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeckIk {
    /// Bend intensity applied to the chain.
    #[serde(default = "default_intensity")]
    pub intensity: f32,

    /// Max bending angle in degrees.
    #[serde(default = "default_bend_angle_limit")]
    pub bend_angle_limit: f32,

    /// Max twist angle in degrees.
    #[serde(default = "default_twist_angle_limit")]
    pub twist_angle_limit: f32,

    /// Local forward direction of the end bone.
    #[serde(default = "default_forward_axis")]
    pub forward_axis: Vector3<f32>,

    /// Local up direction of the end bone.
    #[serde(default = "default_up_axis")]
    pub up_axis: Vector3<f32>,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for NeckIk {
    fn default() -> Self {
        Self {
            intensity: default_intensity(),
            bend_angle_limit: default_bend_angle_limit(),
            twist_angle_limit: default_twist_angle_limit(),
            forward_axis: default_forward_axis(),
            up_axis: default_up_axis(),
            propagation: Propagation::default(),
        }
    }
}

impl NeckIk {
    /// Turn the chain towards `objective`, splitting the bend and twist
    /// evenly over the segments.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<(), SolveError> {
        validate_chain(ctx.hierarchy, chain, 2)?;

        let count = chain.len();
        let effector = objective.effector();
        let ee_up = objective.up();

        let last = ctx.hierarchy.global_transform(chain[count - 1]);
        let target_direction = safe_normal(&(effector.translation - last.translation));
        let current_forward = last.rotate_vector(&self.forward_axis);
        let current_up = last.rotate_vector(&self.up_axis);

        let segments = (count - 1) as f32;

        // Bend: forward axis onto the target direction.
        let bend_axis = safe_normal(&current_forward.cross(&target_direction));
        let bend_angle = soft_limit(
            current_forward
                .dot(&target_direction)
                .clamp(-1.0, 1.0)
                .acos(),
            self.bend_angle_limit.to_radians(),
        );
        let bend_segment =
            axis_angle_or_identity(&bend_axis, bend_angle * self.intensity / segments);
        let full_bend = axis_angle_or_identity(&bend_axis, bend_angle * self.intensity);

        // Twist: the fully-bent up axis onto the target's up, restricted to
        // the component around the target direction.
        let twist_up = full_bend * current_up;
        let twist_axis =
            target_direction * safe_normal(&twist_up.cross(&ee_up)).dot(&target_direction);
        let twist_angle = soft_limit(
            twist_up.dot(&ee_up).clamp(-1.0, 1.0).acos(),
            self.twist_angle_limit.to_radians(),
        );
        let twist_segment =
            axis_angle_or_identity(&twist_axis, twist_angle * self.intensity / segments);

        let first_location = ctx.hierarchy.global_transform(chain[0]).translation;
        ctx.draw_line(
            first_location,
            first_location + twist_up * 20.0,
            color::RED,
            0.2,
        );
        ctx.draw_line(
            first_location,
            first_location + ee_up * 20.0,
            color::GREEN,
            0.2,
        );
        ctx.draw_line(
            first_location,
            first_location + twist_axis * 20.0,
            color::BLUE,
            0.5,
        );

        // Apply the same increment to every bone, compounding through the
        // stored local offsets.
        let mut transform = ctx.hierarchy.global_transform(chain[0]);
        for index in 1..count {
            let local = ctx.hierarchy.local_transform(chain[index]);

            transform.rotation = twist_segment * bend_segment * transform.rotation;
            ctx.hierarchy
                .set_global_transform(chain[index - 1], transform, false);

            transform = transform * local;
        }
        ctx.hierarchy.set_global_transform(
            chain[count - 1],
            transform,
            self.propagation.endpoints(),
        );

        ctx.draw_line(
            transform.translation,
            transform.translation + ee_up * 20.0,
            color::BLUE,
            0.5,
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marionette_core::Hierarchy;
    use marionette_test_utils::{positions, straight_chain};

    #[test]
    fn full_intensity_aims_the_end_forward_axis() {
        let (mut skeleton, ids) = straight_chain(3, Vector3::new(1.0, 0.0, 0.0));
        let last_before = skeleton.global_transform(*ids.last().unwrap()).translation;
        // Mild turn so the soft limit barely attenuates.
        let target = Vector3::new(5.0, 1.5, 0.0);
        let expected_direction = (target - last_before).normalize();
        let params = NeckIk {
            intensity: 1.0,
            ..NeckIk::default()
        };
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(target),
            )
            .unwrap();

        let last = skeleton.global_transform(*ids.last().unwrap());
        let forward = last.rotate_vector(&Vector3::x());
        assert!(
            forward.dot(&expected_direction) > 0.999,
            "forward {forward} vs {expected_direction}"
        );
    }

    #[test]
    fn increments_are_identical_per_segment() {
        let (mut skeleton, ids) = straight_chain(3, Vector3::new(1.0, 0.0, 0.0));
        let params = NeckIk {
            intensity: 1.0,
            ..NeckIk::default()
        };
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::new(4.0, 2.0, 0.0)),
            )
            .unwrap();

        let first = skeleton.global_transform(ids[0]).rotation;
        let second = skeleton.global_transform(ids[1]).rotation;
        // The second bone carries exactly one more increment than the first.
        assert_relative_eq!(second.angle(), first.angle() * 2.0, epsilon = 1e-4);
    }

    #[test]
    fn bends_compound_through_the_chain() {
        let (mut skeleton, ids) = straight_chain(4, Vector3::new(1.0, 0.0, 0.0));
        let params = NeckIk {
            intensity: 1.0,
            ..NeckIk::default()
        };
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::new(2.0, 3.0, 0.0)),
            )
            .unwrap();

        // Each joint curls further off the original axis than its parent.
        let p = positions(&skeleton, &ids);
        assert!(p[1].y > 0.0);
        assert!(p[2].y > p[1].y + 1e-4);
        assert!(p[3].y > p[2].y + 1e-4);
    }

    #[test]
    fn zero_intensity_leaves_the_pose_unchanged() {
        let (mut skeleton, ids) = straight_chain(3, Vector3::new(1.0, 0.0, 0.0));
        let before = positions(&skeleton, &ids);
        let params = NeckIk {
            intensity: 0.0,
            ..NeckIk::default()
        };
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::new(0.0, 5.0, 0.0)),
            )
            .unwrap();

        let after = positions(&skeleton, &ids);
        for (b, a) in before.iter().zip(&after) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn short_chain_is_rejected() {
        let (mut skeleton, ids) = straight_chain(1, Vector3::x());
        let err = NeckIk::default()
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::x()),
            )
            .unwrap_err();
        assert_eq!(err, SolveError::ChainTooShort { required: 2, got: 1 });
    }
}
