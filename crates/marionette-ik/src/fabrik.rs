//! Forward-and-backward reaching IK with a per-segment swing cone.
//!
//! Each pass descends the chain placing joints towards their current
//! children, then ascends from the pinned end target applying the symmetric
//! correction. Every aim rotation is measured against the rest-pose local
//! offset and soft-limited, so a segment can never swing further than the
//! configured cone no matter how many iterations run.

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use marionette_core::hierarchy::{validate_chain, BoneId};
use marionette_core::transform::{rotation_between, Transform};
use marionette_core::types::{Objective, Propagation};
use marionette_core::{SolveContext, SolveError};

use crate::limits::soft_limit;

fn default_max_angle() -> f32 {
    20.0
}
fn default_iterations() -> u32 {
    10
}

/// Parameters for the cone-constrained FABRIK solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConeFabrik {
    /// Max angle change per segment, in degrees.
    #[serde(default = "default_max_angle")]
    pub max_angle: f32,

    /// Number of forward/backward passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default)]
    pub propagation: Propagation,
}

impl Default for ConeFabrik {
    fn default() -> Self {
        Self {
            max_angle: default_max_angle(),
            iterations: default_iterations(),
            propagation: Propagation::default(),
        }
    }
}

/// Soft-limited rotation aiming the rest offset `local` at `anchor`'s
/// position, measured in `transform`'s space.
pub(crate) fn soft_rotate(
    local: &Transform,
    transform: &Transform,
    anchor: &Transform,
    max_angle: f32,
) -> UnitQuaternion<f32> {
    let rotation = rotation_between(
        &local.translation,
        &transform.inverse_transform_point(&anchor.translation),
    );
    let angle = soft_limit(rotation.angle(), max_angle);
    match rotation.axis() {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle),
        None => UnitQuaternion::identity(),
    }
}

impl ConeFabrik {
    /// Iterate the chain towards `objective`. The first bone stays pinned to
    /// its current transform; the last bone lands on the effector target
    /// whenever the cones allow it and otherwise stops where the constrained
    /// chain ends.
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

        let mut transforms: Vec<Transform> = chain
            .iter()
            .map(|&bone| ctx.hierarchy.global_transform(bone))
            .collect();
        let rest: Vec<Transform> = chain
            .iter()
            .map(|&bone| ctx.hierarchy.initial_local_transform(bone))
            .collect();

        let max_radians = self.max_angle.to_radians();
        let mut forward = vec![Transform::identity(); count];

        for _ in 0..self.iterations {
            // Descend: place each joint from the start anchor, aiming at the
            // child's position from the previous sweep.
            forward[0] = start;
            for i in 0..count - 1 {
                transforms[i] = forward[i];
                let rotation = soft_rotate(&rest[i + 1], &forward[i], &transforms[i + 1], max_radians);
                forward[i + 1] = forward[i] * Transform::from(rotation) * rest[i + 1];
            }

            // Ascend: pull the chain back onto the end target with the
            // symmetric correction.
            let mut backward = target;
            for i in (0..count - 1).rev() {
                transforms[i + 1] = backward;
                let rotation = soft_rotate(
                    &rest[i + 1].inverse(),
                    &backward,
                    &transforms[i],
                    max_radians,
                );
                backward = backward * Transform::from(rotation) * rest[i + 1].inverse();
            }
            transforms[0] = backward;
        }

        // Recompose from the pinned start so written segments keep their
        // rest lengths and stay inside the cone.
        transforms[0] = start;
        for i in 0..count - 1 {
            let rotation = soft_rotate(&rest[i + 1], &transforms[i], &transforms[i + 1], max_radians);
            transforms[i + 1] = transforms[i] * Transform::from(rotation) * rest[i + 1];
        }

        ctx.hierarchy.set_global_transform(
            chain[0],
            transforms[0],
            self.propagation.endpoints(),
        );
        for i in 1..count - 1 {
            ctx.hierarchy.set_global_transform(
                chain[i],
                transforms[i],
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marionette_core::Hierarchy;
    use marionette_test_utils::{positions, straight_chain};
    use nalgebra::Vector3;

    #[test]
    fn generous_cone_converges_onto_the_target() {
        let (mut skeleton, ids) = straight_chain(5, Vector3::new(2.0, 0.0, 0.0));
        let params = ConeFabrik {
            max_angle: 180.0,
            iterations: 50,
            ..ConeFabrik::default()
        };
        let target = Vector3::new(5.0, 3.0, 0.0);
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(target),
            )
            .unwrap();

        let tip = skeleton.global_transform(*ids.last().unwrap()).translation;
        // The soft limit always undershoots slightly, so convergence is to a
        // small neighbourhood rather than machine precision.
        assert!((tip - target).norm() < 0.25, "tip stopped at {tip}");
    }

    #[test]
    fn segments_keep_their_rest_length() {
        let (mut skeleton, ids) = straight_chain(5, Vector3::new(2.0, 0.0, 0.0));
        let params = ConeFabrik {
            max_angle: 180.0,
            iterations: 20,
            ..ConeFabrik::default()
        };
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::new(3.0, 4.0, 1.0)),
            )
            .unwrap();

        let p = positions(&skeleton, &ids);
        for pair in p.windows(2) {
            assert_relative_eq!((pair[1] - pair[0]).norm(), 2.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn tight_cone_limits_every_segment_swing() {
        let (mut skeleton, ids) = straight_chain(5, Vector3::new(2.0, 0.0, 0.0));
        let params = ConeFabrik {
            max_angle: 1.0,
            iterations: 20,
            ..ConeFabrik::default()
        };
        // Perpendicular target: would need sharp bending.
        let target = Vector3::new(0.0, 4.0, 0.0);
        params
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(target),
            )
            .unwrap();

        let tip = skeleton.global_transform(*ids.last().unwrap()).translation;
        assert!((tip - target).norm() > 1.0, "tip unexpectedly reached {tip}");

        // No written segment deviates from its rest offset by more than the
        // cone.
        let limit = 1.0_f32.to_radians() + 1e-3;
        for pair in ids.windows(2) {
            let local = skeleton.local_transform(pair[1]);
            let rest = skeleton.initial_local_transform(pair[1]);
            let angle = local
                .translation
                .angle(&rest.translation);
            assert!(angle <= limit, "segment swung {angle} > {limit}");
        }
    }

    #[test]
    fn start_bone_stays_pinned() {
        let (mut skeleton, ids) = straight_chain(4, Vector3::new(2.0, 0.0, 0.0));
        let before = skeleton.global_transform(ids[0]);
        ConeFabrik::default()
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::new(2.0, 2.0, 0.0)),
            )
            .unwrap();
        let after = skeleton.global_transform(ids[0]);
        assert_relative_eq!(after.translation, before.translation, epsilon = 1e-6);
    }

    #[test]
    fn short_chain_is_rejected() {
        let (mut skeleton, ids) = straight_chain(1, Vector3::x());
        let err = ConeFabrik::default()
            .solve(
                &mut SolveContext::new(&mut skeleton),
                &ids,
                &Objective::from_translation(Vector3::x()),
            )
            .unwrap_err();
        assert_eq!(err, SolveError::ChainTooShort { required: 2, got: 1 });
    }
}
