//! Digitigrade leg IK.
//!
//! Four-bone leg (hip, knee, ankle, foot) solved as two nested triangle
//! decompositions: ankle against the hip–knee hypotenuse, then knee against
//! the hip–ankle line. A standing-bend exponent drops the ankle towards the
//! objective line as the leg straightens, which gives the toe-down look of
//! a digitigrade stance at full extension.

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

fn default_min_knee_angle() -> f32 {
    25.0
}
fn default_min_ankle_angle() -> f32 {
    25.0
}
fn default_standing_bend() -> f32 {
    3.0
}
fn default_direction_weight() -> f32 {
    1.0
}
fn default_customization() -> Vector3<f32> {
    Vector3::new(1.0, 1.0, 1.0)
}
fn default_scale() -> BendScale {
    BendScale::None
}

/// Parameters for the digitigrade leg solver. Chain: hip, knee, ankle, foot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitigradeIk {
    /// Minimum knee angle in degrees.
    #[serde(default = "default_min_knee_angle")]
    pub min_knee_angle: f32,

    /// Minimum ankle angle in degrees.
    #[serde(default = "default_min_ankle_angle")]
    pub min_ankle_angle: f32,

    /// Exponent blending the ankle height to zero as the leg stretches.
    #[serde(default = "default_standing_bend")]
    pub standing_bend: f32,

    /// How much the ankle direction follows the hip direction.
    #[serde(default = "default_direction_weight")]
    pub ankle_knee_direction_weight: f32,

    /// How much the knee direction follows the hip direction.
    #[serde(default = "default_direction_weight")]
    pub knee_hip_direction_weight: f32,

    /// Per-segment length customisation factors.
    #[serde(default = "default_customization")]
    pub customization: Vector3<f32>,

    /// How to scale the bones.
    #[serde(default = "default_scale")]
    pub scale: BendScale,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for DigitigradeIk {
    fn default() -> Self {
        Self {
            min_knee_angle: default_min_knee_angle(),
            min_ankle_angle: default_min_ankle_angle(),
            standing_bend: default_standing_bend(),
            ankle_knee_direction_weight: default_direction_weight(),
            knee_hip_direction_weight: default_direction_weight(),
            customization: default_customization(),
            scale: default_scale(),
            propagation: Propagation::default(),
        }
    }
}

impl DigitigradeIk {
    /// Solve the chain onto `objective`, pinning the foot to the (reach-
    /// clamped) objective. Returns the stretch ratio against the rest-pose
    /// hip-to-foot reach.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<f32, SolveError> {
        validate_chain(ctx.hierarchy, chain, 4)?;

        let effector = objective.effector();
        let ee_forward = objective.forward();
        let ee_up = objective.up();

        let initial_hip = ctx.hierarchy.initial_global_transform(chain[0]);
        let initial_knee = ctx.hierarchy.initial_global_transform(chain[1]);
        let initial_ankle = ctx.hierarchy.initial_global_transform(chain[2]);
        let initial_foot = ctx.hierarchy.initial_global_transform(chain[3]);

        let lengths = Vector3::new(
            (initial_hip.translation - initial_knee.translation).norm() * self.customization.x,
            (initial_knee.translation - initial_ankle.translation).norm() * self.customization.y,
            (initial_ankle.translation - initial_foot.translation).norm() * self.customization.z,
        );
        if lengths.x + lengths.y + lengths.z <= EPSILON {
            log::warn!("total rest-pose chain length is zero");
            return Err(SolveError::ZeroChainLength);
        }

        let initial_ankle_delta = initial_ankle.translation - initial_hip.translation;
        let initial_knee_delta = initial_knee.translation - initial_hip.translation;
        let initial_foot_delta = initial_foot.translation - initial_hip.translation;
        let initial_foot_normal = normal_or(&initial_foot_delta, Vector3::z());

        let hip_location = ctx.hierarchy.global_transform(chain[0]).translation;
        let delta = effector.translation - hip_location;
        let norm = delta.norm();
        let normal = if norm > EPSILON {
            delta / norm
        } else {
            initial_foot_normal
        };

        // Hip-to-ankle hypotenuse at the minimum knee angle.
        let cos_min_knee = self.min_knee_angle.to_radians().cos();
        let hypotenuse_sq = (lengths.x * lengths.x + lengths.y * lengths.y
            - 2.0 * lengths.x * lengths.y * cos_min_knee)
            .max(0.0);
        let hypotenuse = hypotenuse_sq.sqrt();

        // Fold the minimum ankle angle on top to get the closest approach of
        // the whole leg.
        let min_heel_radians = if hypotenuse * lengths.y > EPSILON {
            ((hypotenuse_sq + lengths.y * lengths.y - lengths.x * lengths.x)
                / (2.0 * hypotenuse * lengths.y))
                .clamp(-1.0, 1.0)
                .acos()
        } else {
            0.0
        };
        let cos_min_heel = (min_heel_radians + self.min_ankle_angle.to_radians()).cos();
        let min_distance = (hypotenuse_sq + lengths.z * lengths.z
            - 2.0 * hypotenuse * lengths.z * cos_min_heel)
            .max(0.0)
            .sqrt();

        let distance = norm.max(min_distance);
        let location = hip_location + normal * distance;

        // Rest-pose knee offset carried into the objective frame.
        let leg_rotation = rotation_between(&initial_foot_normal, &normal);
        let initial_knee_direction =
            plane_project(&(initial_knee_delta - initial_ankle_delta), &initial_foot_normal);
        let leg_direction = safe_normal(&(leg_rotation * initial_knee_direction));

        ctx.draw_line(
            hip_location,
            hip_location + leg_direction * 50.0,
            color::WHITE,
            0.5,
        );

        let foot_direction =
            -ee_forward * ee_up.dot(&normal) + ee_up * ee_forward.dot(&normal);
        let lower_direction = safe_normal(&plane_project(
            &(foot_direction * (lengths.x + lengths.y)
                + leg_direction * lengths.z * self.ankle_knee_direction_weight),
            &normal,
        ));

        ctx.draw_line(
            location,
            location + foot_direction * 50.0,
            color::BLACK,
            0.5,
        );

        // Ankle height at closest approach, faded out as the leg stretches.
        let heel = triangle::solve(lengths.z, hypotenuse, min_distance);
        let max_chain_length = lengths.x + lengths.y + lengths.z;
        let stretch_range = max_chain_length - min_distance;
        let distance_ratio = if stretch_range > EPSILON {
            (distance - min_distance) / stretch_range
        } else {
            1.0
        };
        let final_height =
            heel.height * (1.0 - distance_ratio.min(1.0).powf(self.standing_bend));

        let ankle_delta = lower_direction * final_height + normal * heel.foot;
        let ankle_location = location
            - safe_normal(&ankle_delta) * lengths.z * distance_ratio.max(1.0);
        let upper_delta = ankle_location - hip_location;
        let upper_distance = upper_delta.norm();
        let upper_normal = if upper_distance > EPSILON {
            upper_delta / upper_distance
        } else {
            normal
        };

        ctx.draw_line(location, location + ankle_delta, color::BLUE, 0.5);

        let knee = triangle::solve(lengths.x, lengths.y, upper_distance);
        let upper_direction = safe_normal(&plane_project(
            &(lower_direction * lengths.x * self.knee_hip_direction_weight
                + leg_direction * lengths.y),
            &upper_normal,
        ));
        let knee_location =
            hip_location + upper_normal * knee.foot + upper_direction * knee.height;

        ctx.draw_line(hip_location, ankle_location, color::RED, 1.0);
        ctx.draw_line(hip_location, location, color::YELLOW, 1.0);
        ctx.draw_point(knee_location, color::WHITE, 3.0);

        let interior = self.propagation.interior();
        bend_towards(
            &mut *ctx.hierarchy,
            chain[0],
            chain[1],
            &knee_location,
            self.scale,
            interior,
            1.0,
        );
        bend_towards(
            &mut *ctx.hierarchy,
            chain[1],
            chain[2],
            &ankle_location,
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

        let foot = Transform::new(location, effector.rotation, initial_foot.scale);
        ctx.hierarchy
            .set_global_transform(chain[3], foot, self.propagation.endpoints());

        let rest_reach = initial_foot_delta.norm();
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
