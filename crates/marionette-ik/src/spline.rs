//! Chain placement along a blended spline.
//!
//! Lays the chain along a smoothstep-blended double-lerp curve between the
//! chain's current root and the objective, walking bones by rest-pose arc
//! length. Purely geometric: no angle limits, no stretch resistance, the
//! curve is always reached exactly.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use marionette_core::debug::color;
use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{slerp, smoothstep, EPSILON};
use marionette_core::types::{BendScale, Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::bend::bend_towards;

fn default_tangent_start() -> Vector3<f32> {
    Vector3::x()
}
fn default_tangent_end() -> Vector3<f32> {
    -Vector3::x()
}
fn default_rotate_with_tangent() -> f32 {
    1.0
}
fn default_position_along_spline() -> f32 {
    1.0
}
fn default_bend() -> f32 {
    1.0
}

/// Parameters for the spline chain solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineIk {
    /// Starting direction of the chain.
    #[serde(default = "default_tangent_start")]
    pub tangent_start: Vector3<f32>,

    /// Ending direction of the chain.
    #[serde(default = "default_tangent_end")]
    pub tangent_end: Vector3<f32>,

    /// How much the last bone rotates with the curve tangent instead of the
    /// objective.
    #[serde(default = "default_rotate_with_tangent")]
    pub rotate_with_tangent: f32,

    /// Where along the curve the chain ends, 0 for the start and 1 for the
    /// objective.
    #[serde(default = "default_position_along_spline")]
    pub position_along_spline: f32,

    /// Bendiness of the chain: tangent anchors scale with the distance
    /// between the curve ends times this factor.
    #[serde(default = "default_bend")]
    pub bend: f32,

    /// How to scale the bones.
    #[serde(default)]
    pub scale: BendScale,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for SplineIk {
    fn default() -> Self {
        Self {
            tangent_start: default_tangent_start(),
            tangent_end: default_tangent_end(),
            rotate_with_tangent: default_rotate_with_tangent(),
            position_along_spline: default_position_along_spline(),
            bend: default_bend(),
            scale: BendScale::default(),
            propagation: Propagation::default(),
        }
    }
}

impl SplineIk {
    /// Place the chain along the curve towards `objective`.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<(), SolveError> {
        validate_chain(ctx.hierarchy, chain, 2)?;

        let count = chain.len();
        let last = chain[count - 1];

        // Rest-pose arc lengths.
        let mut lengths = vec![0.0_f32; count - 1];
        let mut total_length = 0.0;
        let mut current = ctx
            .hierarchy
            .initial_global_transform(chain[0])
            .translation;
        for index in 1..count {
            let next = ctx
                .hierarchy
                .initial_global_transform(chain[index])
                .translation;
            let length = (current - next).norm();
            lengths[index - 1] = length;
            total_length += length;
            current = next;
        }

        if total_length <= EPSILON {
            log::warn!("total rest-pose chain length is zero");
            return Err(SolveError::ZeroChainLength);
        }

        let mut end_target = objective.effector();
        end_target.scale = ctx.hierarchy.initial_global_transform(last).scale;

        let inv_total_length = self.position_along_spline / total_length;

        // Curve between the current root and the end target, with tangent
        // anchors scaled by their separation.
        let origin = ctx.hierarchy.global_transform(chain[0]).translation;
        let target_distance = (origin - end_target.translation).norm();
        let start_anchor = origin + self.tangent_start * (target_distance * self.bend);
        let end_anchor = end_target.translation + self.tangent_end * (target_distance * self.bend);
        let curve = |alpha: f32| -> Vector3<f32> {
            origin.lerp(&start_anchor, alpha).lerp(
                &end_anchor.lerp(&end_target.translation, alpha),
                smoothstep(0.0, 1.0, alpha),
            )
        };

        let interior = self.propagation.interior();
        let mut fraction = 0.0;
        for index in 1..count {
            let next_fraction = fraction + lengths[index - 1] * inv_total_length;
            let next_location = curve(next_fraction);
            fraction = next_fraction;

            ctx.draw_point(next_location, color::RED, 2.0);

            bend_towards(
                &mut *ctx.hierarchy,
                chain[index - 1],
                chain[index],
                &next_location,
                self.scale,
                interior,
                1.0,
            );
        }

        // The last bone blends between tangent-implied and objective
        // rotation and takes the objective's scale.
        let mut end = ctx.hierarchy.global_transform(last);
        end.rotation = slerp(&end_target.rotation, &end.rotation, self.rotate_with_tangent);
        end.scale = objective.target.scale;
        ctx.hierarchy
            .set_global_transform(last, end, self.propagation.endpoints());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
