//! Analytic IK for a single hinge joint.
//!
//! The simplest two-bone solve: place the hinge apex with one triangle
//! decomposition in the plane spanned by the objective direction and a
//! configured hinge direction, then bend both segments onto it.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use marionette_core::debug::color;
use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{normal_or, plane_project, safe_normal, Transform, EPSILON};
use marionette_core::types::{BendScale, Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::bend::bend_towards;
use crate::triangle;

fn default_target_length() -> f32 {
    1.0
}
fn default_customization() -> Vector2<f32> {
    Vector2::new(1.0, 1.0)
}
fn default_direction() -> Vector3<f32> {
    Vector3::x()
}

/// Parameters for the hinge solver. Chain: hinge root, hinge joint, end bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HingeIk {
    /// Desired length of this chain as a ratio of the rest-pose length.
    #[serde(default = "default_target_length")]
    pub target_length: f32,

    /// Per-segment length customisation factors.
    #[serde(default = "default_customization")]
    pub customization: Vector2<f32>,

    /// Direction the hinge apex opens towards.
    #[serde(default = "default_direction")]
    pub direction: Vector3<f32>,

    /// How to scale the bones.
    #[serde(default)]
    pub scale: BendScale,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for HingeIk {
    fn default() -> Self {
        Self {
            target_length: default_target_length(),
            customization: default_customization(),
            direction: default_direction(),
            scale: BendScale::default(),
            propagation: Propagation::default(),
        }
    }
}

impl HingeIk {
    /// Solve the chain onto `objective`. The end bone is pinned to the
    /// objective location with the effector rotation; the apex position
    /// degrades to the length-proportional point on the root–objective line
    /// when the target is out of reach.
    pub fn solve(
        &self,
        ctx: &mut SolveContext,
        chain: &[BoneId],
        objective: &Objective,
    ) -> Result<(), SolveError> {
        validate_chain(ctx.hierarchy, chain, 3)?;

        let effector = objective.effector();

        let initial_root = ctx.hierarchy.initial_global_transform(chain[0]);
        let initial_joint = ctx.hierarchy.initial_global_transform(chain[1]);
        let initial_end = ctx.hierarchy.initial_global_transform(chain[2]);

        let mut lengths = Vector2::new(
            (initial_root.translation - initial_joint.translation).norm() * self.customization.x,
            (initial_joint.translation - initial_end.translation).norm() * self.customization.y,
        );
        if lengths.x + lengths.y <= EPSILON {
            log::warn!("total rest-pose chain length is zero");
            return Err(SolveError::ZeroChainLength);
        }
        lengths *= self.target_length;

        let root = ctx.hierarchy.global_transform(chain[0]);
        let rest_normal = normal_or(
            &(initial_end.translation - initial_root.translation),
            Vector3::z(),
        );

        let delta = objective.target.translation - root.translation;
        let norm = delta.norm();
        let normal = if norm > EPSILON { delta / norm } else { rest_normal };

        let hinge_direction = safe_normal(&plane_project(&self.direction, &normal));

        let apex = triangle::solve(lengths.x, lengths.y, norm);
        let hinge_location =
            root.translation + normal * apex.foot + hinge_direction * apex.height;

        ctx.draw_line(
            root.translation + normal * apex.foot,
            hinge_location,
            color::YELLOW,
            1.0,
        );
        ctx.draw_line(
            objective.target.translation,
            root.translation,
            color::YELLOW,
            0.5,
        );

        let interior = self.propagation.interior();
        bend_towards(
            &mut *ctx.hierarchy,
            chain[0],
            chain[1],
            &hinge_location,
            self.scale,
            interior,
            1.0,
        );
        bend_towards(
            &mut *ctx.hierarchy,
            chain[1],
            chain[2],
            &objective.target.translation,
            self.scale,
            interior,
            1.0,
        );

        let end = Transform::new(
            objective.target.translation,
            effector.rotation,
            initial_end.scale,
        );
        ctx.hierarchy
            .set_global_transform(chain[2], end, self.propagation.endpoints());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
