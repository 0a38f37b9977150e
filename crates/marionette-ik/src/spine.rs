//! Double-anchored spine IK.
//!
//! Builds two one-sided chains — one propagated forward from the start bone,
//! one backward from the end target, each assuming rest-pose local offsets —
//! and collapses them with a position-weighted blend. Iterations then run a
//! cone-limited forward and backward reaching sweep against the blended
//! chain and re-blend, and a final straightening pass re-derives interior
//! rotations from the blended positions.

use serde::{Deserialize, Serialize};

use nalgebra::Vector3;

use marionette_core::debug::color;
use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{
    axis_angle_degrees, clamp_norm, rotation_between, Transform,
};
use marionette_core::types::{Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::fabrik::soft_rotate;
use crate::limits::limit_rotation;

fn default_angle_limit() -> f32 {
    30.0
}
fn default_limit_bias() -> Vector3<f32> {
    Vector3::zeros()
}
fn default_limit_radius() -> f32 {
    0.0
}
fn default_iterations() -> u32 {
    10
}

/// Constraint properties of one chain end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectorSettings {
    /// Max angle change per segment during this end's sweep, in degrees.
    #[serde(default = "default_angle_limit")]
    pub angle_limit: f32,

    /// Cone bias for this end's seed orientation, axis times degrees.
    #[serde(default = "default_limit_bias")]
    pub limit_bias: Vector3<f32>,

    /// Cone radius for this end's seed orientation, in degrees.
    #[serde(default = "default_limit_radius")]
    pub limit_radius: f32,
}

impl Default for EffectorSettings {
    fn default() -> Self {
        Self {
            angle_limit: default_angle_limit(),
            limit_bias: default_limit_bias(),
            limit_radius: default_limit_radius(),
        }
    }
}

/// Parameters for the spine solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpineIk {
    /// Constraints at the chain's first bone.
    #[serde(default)]
    pub anchor: EffectorSettings,

    /// Constraints at the chain's last bone.
    #[serde(default)]
    pub objective: EffectorSettings,

    /// Bending iterations.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for SpineIk {
    fn default() -> Self {
        Self {
            anchor: EffectorSettings::default(),
            objective: EffectorSettings::default(),
            iterations: default_iterations(),
            propagation: Propagation::default(),
        }
    }
}

/// Collapse the two one-sided chains into `transforms`, favouring `a` near
/// the start and `b` near the end. `bias` shifts the crossover curve.
fn weighted_mean(
    ctx: &mut SolveContext,
    transforms: &mut [Transform],
    a: &[Transform],
    b: &[Transform],
    bias: f32,
) {
    let count = transforms.len();
    transforms[0] = a[0];
    transforms[count - 1] = b[count - 1];

    for index in 1..count - 1 {
        let ratio = index as f32 / (count - 1) as f32;
        let square_in = ratio * ratio;
        let square_out = 1.0 - (1.0 - ratio) * (1.0 - ratio);
        let weight = square_in + (square_out - square_in) * bias;
        transforms[index] = Transform::blend(&a[index], &b[index], weight);

        ctx.draw_point(transforms[index].translation, color::YELLOW, 5.0);
    }
}

/// Rotate interior bones so their rest-pose child offsets line up with the
/// blended positions.
fn straighten(transforms: &mut [Transform], rest: &[Transform]) {
    let count = transforms.len();
    for index in 1..count - 1 {
        let target = transforms[index].inverse_transform_point(&transforms[index + 1].translation);
        let rotation = rotation_between(&rest[index + 1].translation, &target);
        transforms[index].rotation = transforms[index].rotation * rotation;
    }
}

impl SpineIk {
    /// Solve the chain between its current start transform and `objective`.
    /// Both endpoints are written back exactly; interior bones take the
    /// blended, straightened pose.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<(), SolveError> {
        validate_chain(ctx.hierarchy, chain, 2)?;

        let count = chain.len();
        let start = ctx.hierarchy.global_transform(chain[0]);
        let target = objective.effector();

        let rest: Vec<Transform> = chain
            .iter()
            .map(|&bone| ctx.hierarchy.initial_local_transform(bone))
            .collect();
        let mut transforms: Vec<Transform> = chain
            .iter()
            .map(|&bone| ctx.hierarchy.global_transform(bone))
            .collect();

        // Seed orientations: each anchor leans towards the chain's current
        // end orientation by a cone-limited amount around a biased axis.
        let mut start_chain = vec![start; count];
        let mut end_chain = vec![target; count];

        let start_offset = axis_angle_degrees(&self.anchor.limit_bias);
        let start_limited = limit_rotation(
            &(start_offset * start.rotation.inverse() * transforms[count - 1].rotation),
            self.anchor.limit_radius.to_radians(),
            true,
        );
        start_chain[0].rotation = start.rotation * start_offset.inverse() * start_limited;

        let end_offset = axis_angle_degrees(&self.objective.limit_bias);
        let end_limited = limit_rotation(
            &(end_offset * target.rotation.inverse() * transforms[count - 1].rotation),
            self.objective.limit_radius.to_radians(),
            true,
        );
        end_chain[count - 1].rotation = target.rotation * end_offset.inverse() * end_limited;

        // One-sided chains assuming rest-pose offsets from each anchor.
        for index in 1..count {
            start_chain[index] = start_chain[index - 1] * rest[index];
            end_chain[count - index - 1] = end_chain[count - index] * rest[count - index].inverse();

            ctx.draw_point(start_chain[index].translation, color::RED, 5.0);
            ctx.draw_point(end_chain[count - index - 1].translation, color::BLUE, 5.0);
        }

        weighted_mean(ctx, &mut transforms, &start_chain, &end_chain, 0.0);

        let max_anchor_radians = self.anchor.angle_limit.to_radians();
        let max_objective_radians = self.objective.angle_limit.to_radians();
        for _ in 0..self.iterations {
            // Forward reaching sweep from the start anchor. Segment reach is
            // clamped to the blended chain's current spacing so lengths
            // adapt smoothly.
            for index in 1..count {
                let mut regular = rest[index];
                let spacing = (transforms[index].translation
                    - transforms[index - 1].translation)
                    .norm();
                regular.translation = clamp_norm(&regular.translation, spacing);

                let rotation = soft_rotate(
                    &regular,
                    &start_chain[index - 1],
                    &transforms[index],
                    max_anchor_radians,
                );
                start_chain[index] =
                    start_chain[index - 1] * Transform::from(rotation) * regular;

                ctx.draw_point(start_chain[index].translation, color::WHITE, 7.5);
            }

            // Backward reaching sweep from the end target.
            for index in (1..count).rev() {
                let mut regular = rest[index];
                let spacing = (transforms[index].translation
                    - transforms[index - 1].translation)
                    .norm();
                regular.translation = clamp_norm(&regular.translation, spacing);

                let regular_inverse = regular.inverse();
                let rotation = soft_rotate(
                    &regular_inverse,
                    &end_chain[index],
                    &transforms[index - 1],
                    max_objective_radians,
                );
                end_chain[index - 1] =
                    end_chain[index] * Transform::from(rotation) * regular_inverse;

                ctx.draw_point(end_chain[index - 1].translation, color::BLACK, 7.5);
            }

            // Collapse both sweeps, weighting the directions equally.
            weighted_mean(ctx, &mut transforms, &start_chain, &end_chain, 1.0);
        }

        straighten(&mut transforms, &rest);

        transforms[0] = start;
        transforms[count - 1] = target;

        ctx.hierarchy
            .set_global_transform(chain[0], transforms[0], self.propagation.endpoints());
        for index in 1..count - 1 {
            ctx.hierarchy.set_global_transform(
                chain[index],
                transforms[index],
                self.propagation.interior(),
            );
        }
        ctx.hierarchy.set_global_transform(
            chain[count - 1],
            transforms[count - 1],
            self.propagation.endpoints(),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
