//! Arm IK for chains that start at a clavicle bone.
//!
//! The clavicle swings towards the objective within a configured angle
//! budget, simulating shoulder movement, before the remaining three bones
//! run the standard two-bone arm solve. The swing can be biased
//! exponentially towards a direction in clavicle space, which makes raises
//! (shrugs) cheaper than forward reaches.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use marionette_core::debug::color;
use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{
    normal_or, plane_project, rotation_between, safe_normal, Transform, EPSILON,
};
use marionette_core::types::{BendScale, Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::bend::bend_towards;
use crate::triangle;

fn default_min_elbow_angle() -> f32 {
    25.0
}
fn default_max_clavicle_angle() -> f32 {
    10.0
}
fn default_clavicle_bias() -> Vector3<f32> {
    Vector3::zeros()
}
fn default_elbow_alignment_axis() -> Vector3<f32> {
    Vector3::x()
}
fn default_customization() -> Vector3<f32> {
    Vector3::new(1.0, 1.0, 1.0)
}

/// Parameters for the clavicle arm solver. Chain: clavicle, shoulder, elbow,
/// hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClavicleIk {
    /// Minimum elbow angle in degrees.
    #[serde(default = "default_min_elbow_angle")]
    pub min_elbow_angle: f32,

    /// Maximum clavicle swing in degrees (at most 90).
    #[serde(default = "default_max_clavicle_angle")]
    pub max_clavicle_angle: f32,

    /// Exponential bias for the swing budget, in clavicle bone space.
    #[serde(default = "default_clavicle_bias")]
    pub clavicle_bias: Vector3<f32>,

    /// Objective axis to use for elbow alignment.
    #[serde(default = "default_elbow_alignment_axis")]
    pub elbow_alignment_axis: Vector3<f32>,

    /// Per-segment length customisation factors.
    #[serde(default = "default_customization")]
    pub customization: Vector3<f32>,

    /// How to scale the bones.
    #[serde(default)]
    pub scale: BendScale,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for ClavicleIk {
    fn default() -> Self {
        Self {
            min_elbow_angle: default_min_elbow_angle(),
            max_clavicle_angle: default_max_clavicle_angle(),
            clavicle_bias: default_clavicle_bias(),
            elbow_alignment_axis: default_elbow_alignment_axis(),
            customization: default_customization(),
            scale: BendScale::default(),
            propagation: Propagation::default(),
        }
    }
}

impl ClavicleIk {
    /// Solve the chain onto `objective`. Returns the stretch ratio of the
    /// arm portion: clamped reach over rest-pose reach.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<f32, SolveError> {
        validate_chain(ctx.hierarchy, chain, 4)?;

        let effector = objective.effector();
        let ee_forward = objective.forward();
        let ee_location = effector.translation;

        let initial_clavicle = ctx.hierarchy.initial_global_transform(chain[0]);
        let initial_shoulder = ctx.hierarchy.initial_global_transform(chain[1]);
        let initial_elbow = ctx.hierarchy.initial_global_transform(chain[2]);
        let initial_hand = ctx.hierarchy.initial_global_transform(chain[3]);

        let lengths = Vector3::new(
            (initial_clavicle.translation - initial_shoulder.translation).norm()
                * self.customization.x,
            (initial_shoulder.translation - initial_elbow.translation).norm()
                * self.customization.y,
            (initial_elbow.translation - initial_hand.translation).norm() * self.customization.z,
        );
        if lengths.y + lengths.z <= EPSILON {
            log::warn!("total rest-pose chain length is zero");
            return Err(SolveError::ZeroChainLength);
        }

        let initial_elbow_delta = initial_elbow.translation - initial_shoulder.translation;
        let initial_hand_delta = initial_hand.translation - initial_shoulder.translation;
        let initial_hand_normal = normal_or(&initial_hand_delta, Vector3::z());

        // Swing the clavicle towards the objective.
        let clavicle = ctx.hierarchy.global_transform(chain[0]);
        let shoulder = ctx.hierarchy.global_transform(chain[1]);
        let clavicle_shoulder_delta = shoulder.translation - clavicle.translation;
        let clavicle_shoulder_normal = normal_or(&clavicle_shoulder_delta, initial_hand_normal);
        let clavicle_objective_normal =
            normal_or(&(ee_location - clavicle.translation), clavicle_shoulder_normal);

        let max_clavicle_radians = self.max_clavicle_angle.to_radians();
        let clavicle_orthogonal = safe_normal(&plane_project(
            &clavicle_objective_normal,
            &clavicle_shoulder_normal,
        ));

        let max_arm_length = lengths.y + lengths.z;
        let swing_intensity =
            (1.0 - clavicle_shoulder_normal.dot(&clavicle_objective_normal)).min(1.0);
        let reach_factor =
            ((shoulder.translation - ee_location).norm() / max_arm_length).min(1.0);
        let bias_vector = clavicle.rotate_vector(&self.clavicle_bias);
        let bias_intensity = bias_vector.dot(&clavicle_objective_normal).exp();
        let clavicle_sin =
            (max_clavicle_radians * bias_intensity).sin() * swing_intensity * reach_factor;
        let swung_normal = clavicle_shoulder_normal
            * (1.0 - clavicle_sin * clavicle_sin).max(0.0).sqrt()
            + clavicle_orthogonal * clavicle_sin;
        let clavicle_location = clavicle.translation + swung_normal * lengths.x;

        ctx.draw_line(
            clavicle.translation,
            clavicle.translation + bias_vector * 30.0,
            color::WHITE,
            0.5,
        );
        ctx.draw_line(
            clavicle.translation,
            clavicle.translation + clavicle_orthogonal * 30.0,
            color::BLUE,
            0.3,
        );
        ctx.draw_line(
            clavicle.translation,
            clavicle.translation + clavicle_shoulder_normal * 30.0,
            color::GREEN,
            0.3,
        );

        // Closest approach allowed by the minimum elbow angle, on the two
        // segments adjoining the elbow.
        let cos_min_elbow = self.min_elbow_angle.to_radians().cos();
        let min_distance = (lengths.y * lengths.y + lengths.z * lengths.z
            - 2.0 * lengths.y * lengths.z * cos_min_elbow)
            .max(0.0)
            .sqrt();

        let delta = ee_location - clavicle_location;
        let norm = delta.norm();
        let normal = if norm > EPSILON {
            delta / norm
        } else {
            initial_hand_normal
        };
        let distance = norm.max(min_distance);
        let location = clavicle_location + normal * distance;

        let arm_rotation = rotation_between(&initial_hand_normal, &normal);
        let initial_arm_delta = plane_project(&initial_elbow_delta, &initial_hand_normal);
        let arm_direction = safe_normal(&(arm_rotation * initial_arm_delta));

        ctx.draw_line(
            clavicle_location,
            clavicle_location + arm_direction * 50.0,
            color::WHITE,
            0.5,
        );

        let ee_alignment = objective.target.rotate_vector(&self.elbow_alignment_axis);
        let hand_alignment =
            ee_forward * ee_alignment.dot(&normal) - ee_alignment * ee_forward.dot(&normal);
        let lower_direction = safe_normal(&plane_project(
            &(hand_alignment * lengths.z + arm_direction * lengths.y),
            &normal,
        ));

        let apex = triangle::solve(lengths.y, lengths.z, distance);
        let elbow_location =
            clavicle_location + normal * apex.foot + lower_direction * apex.height;

        ctx.draw_line(clavicle_location, elbow_location, color::RED, 1.0);
        ctx.draw_line(elbow_location, location, color::YELLOW, 1.0);

        let interior = self.propagation.interior();
        bend_towards(
            &mut *ctx.hierarchy,
            chain[0],
            chain[1],
            &clavicle_location,
            self.scale,
            interior,
            1.0,
        );
        bend_towards(
            &mut *ctx.hierarchy,
            chain[1],
            chain[2],
            &elbow_location,
            self.scale,
            interior,
            1.0,
        );
        bend_towards(
            &mut *ctx.hierarchy,
            chain[2],
            chain[3],
            &location,
            self.scale,
            interior,
            1.0,
        );

        let end = Transform::new(location, effector.rotation, initial_hand.scale);
        ctx.hierarchy
            .set_global_transform(chain[3], end, self.propagation.endpoints());

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
