//! Analytic arm IK without a clavicle.
//!
//! A two-bone solve from shoulder to hand that keeps the elbow direction
//! continuous as the target moves: the rest-pose elbow offset is carried
//! into the current objective frame instead of being re-derived from the
//! live pose, and the hand's orientation feeds an alignment term so elbow
//! twist follows hand twist.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use marionette_core::debug::color;
use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{
    axis_angle_degrees, normal_or, plane_project, rotation_between, safe_normal, Transform,
    EPSILON,
};
use marionette_core::types::{BendScale, Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::bend::bend_towards;
use crate::triangle;

fn default_min_elbow_angle() -> f32 {
    25.0
}
fn default_elbow_alignment_axis() -> Vector3<f32> {
    Vector3::x()
}
fn default_elbow_offset() -> Vector3<f32> {
    Vector3::zeros()
}
fn default_customization() -> Vector2<f32> {
    Vector2::new(1.0, 1.0)
}

/// Parameters for the arm solver. Chain: shoulder, elbow, hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmIk {
    /// Minimum elbow angle in degrees; bounds how far the arm may fold.
    #[serde(default = "default_min_elbow_angle")]
    pub min_elbow_angle: f32,

    /// Objective axis to use for elbow alignment.
    #[serde(default = "default_elbow_alignment_axis")]
    pub elbow_alignment_axis: Vector3<f32>,

    /// Offset rotation for the elbow direction, axis times degrees.
    #[serde(default = "default_elbow_offset")]
    pub elbow_offset: Vector3<f32>,

    /// Per-segment length customisation factors.
    #[serde(default = "default_customization")]
    pub customization: Vector2<f32>,

    /// How to scale the bones.
    #[serde(default)]
    pub scale: BendScale,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for ArmIk {
    fn default() -> Self {
        Self {
            min_elbow_angle: default_min_elbow_angle(),
            elbow_alignment_axis: default_elbow_alignment_axis(),
            elbow_offset: default_elbow_offset(),
            customization: default_customization(),
            scale: BendScale::default(),
            propagation: Propagation::default(),
        }
    }
}

impl ArmIk {
    /// Solve the chain onto `objective`, pinning the hand to the (reach-
    /// clamped) objective. Returns the stretch ratio: clamped reach over
    /// rest-pose reach, 1.0 when unstretched.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<f32, SolveError> {
        validate_chain(ctx.hierarchy, chain, 3)?;

        let effector = objective.effector();
        let ee_forward = objective.forward();
        let ee_location = effector.translation;

        let initial_shoulder = ctx.hierarchy.initial_global_transform(chain[0]);
        let initial_elbow = ctx.hierarchy.initial_global_transform(chain[1]);
        let initial_hand = ctx.hierarchy.initial_global_transform(chain[2]);

        let lengths = Vector2::new(
            (initial_shoulder.translation - initial_elbow.translation).norm()
                * self.customization.x,
            (initial_elbow.translation - initial_hand.translation).norm() * self.customization.y,
        );
        if lengths.x + lengths.y <= EPSILON {
            log::warn!("total rest-pose chain length is zero");
            return Err(SolveError::ZeroChainLength);
        }

        let initial_elbow_delta = initial_elbow.translation - initial_shoulder.translation;
        let initial_hand_delta = initial_hand.translation - initial_shoulder.translation;
        let initial_hand_normal = normal_or(&initial_hand_delta, Vector3::z());

        let shoulder_location = ctx.hierarchy.global_transform(chain[0]).translation;

        // Closest approach allowed by the minimum elbow angle.
        let cos_min_elbow = self.min_elbow_angle.to_radians().cos();
        let min_distance = (lengths.x * lengths.x + lengths.y * lengths.y
            - 2.0 * lengths.x * lengths.y * cos_min_elbow)
            .max(0.0)
            .sqrt();

        let delta = ee_location - shoulder_location;
        let norm = delta.norm();
        let normal = if norm > EPSILON {
            delta / norm
        } else {
            initial_hand_normal
        };
        let distance = norm.max(min_distance);
        let location = shoulder_location + normal * distance;

        // Carry the rest-pose elbow offset into the objective frame so the
        // bend direction stays stable while the target rotates around the
        // shoulder.
        let arm_rotation =
            rotation_between(&initial_hand_normal, &normal) * axis_angle_degrees(&self.elbow_offset);
        let initial_arm_delta = plane_project(&initial_elbow_delta, &initial_hand_normal);
        let arm_direction = safe_normal(&(arm_rotation * initial_arm_delta));

        ctx.draw_line(
            shoulder_location,
            shoulder_location + arm_direction * 50.0,
            color::WHITE,
            0.5,
        );

        let ee_alignment = objective.target.rotate_vector(&self.elbow_alignment_axis);
        let hand_alignment =
            ee_forward * ee_alignment.dot(&normal) - ee_alignment * ee_forward.dot(&normal);
        let lower_direction = safe_normal(&plane_project(
            &(hand_alignment * lengths.y + arm_direction * lengths.x),
            &normal,
        ));

        ctx.draw_line(
            location,
            location + hand_alignment * 30.0,
            color::BLACK,
            0.5,
        );

        let apex = triangle::solve(lengths.x, lengths.y, distance);
        let elbow_location =
            shoulder_location + normal * apex.foot + lower_direction * apex.height;

        ctx.draw_line(shoulder_location, elbow_location, color::RED, 1.0);
        ctx.draw_line(elbow_location, location, color::YELLOW, 1.0);

        let interior = self.propagation.interior();
        bend_towards(
            &mut *ctx.hierarchy,
            chain[0],
            chain[1],
            &elbow_location,
            self.scale,
            interior,
            1.0,
        );
        bend_towards(
            &mut *ctx.hierarchy,
            chain[1],
            chain[2],
            &location,
            self.scale,
            interior,
            1.0,
        );

        let end = Transform::new(location, effector.rotation, initial_hand.scale);
        ctx.hierarchy
            .set_global_transform(chain[2], end, self.propagation.endpoints());

        let rest_reach = initial_hand_delta.norm();
        Ok(if rest_reach > EPSILON {
            distance / rest_reach
        } else {
            1.0
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
