//! Bend a bone so its child reaches a target location.
//!
//! The shared propagation primitive of every chain solver: rotate a bone so
//! the direction to its child matches the (blended) direction to a target,
//! then write the bone and, depending on policy, the child.

use nalgebra::Vector3;

use marionette_core::hierarchy::{BoneId, Hierarchy};
use marionette_core::transform::{rotation_between, Transform, EPSILON};
use marionette_core::types::BendScale;

/// Rotate `bone` towards placing `child` at `target` and write the results.
///
/// `intensity` blends between the current child direction (0) and the full
/// target direction (1). Under [`BendScale::Stretch`] the bone is
/// additionally scaled along the child's local offset axis so the rendered
/// segment spans the target distance. Returns the bone's new global
/// transform so callers can chain segments without re-reading the host.
pub fn bend_towards(
    hierarchy: &mut dyn Hierarchy,
    bone: BoneId,
    child: BoneId,
    target: &Vector3<f32>,
    scale: BendScale,
    propagate: bool,
    intensity: f32,
) -> Transform {
    let mut transform = hierarchy.global_transform(bone);
    let local = hierarchy.local_transform(child);

    // Rotate to match.
    let location = transform.translation;
    let current_delta = transform.rotate_vector(&local.translation);
    let target_delta = current_delta.lerp(&(target - location), intensity);
    let rotation = rotation_between(&current_delta, &target_delta);
    transform.rotation = rotation * transform.rotation;

    match scale {
        BendScale::Default => {
            // Propagation here covers any other children attached to the
            // bone; the chain child itself is written explicitly below.
            hierarchy.set_global_transform(bone, transform, propagate);

            let mut next = transform * local;
            next.translation = location + target_delta;
            hierarchy.set_global_transform(child, next, propagate);
        }
        BendScale::None => {
            hierarchy.set_global_transform(bone, transform, propagate);

            // Result is identical if propagation is on.
            if !propagate {
                hierarchy.set_global_transform(child, transform * local, false);
            }
        }
        BendScale::Stretch => {
            // Scale the bone so the segment spans the target distance.
            let segment_length = transform.transform_vector(&local.translation).norm();
            if segment_length > EPSILON {
                let axis_scale = target_delta.norm() / segment_length - 1.0;
                let local_axis = local
                    .translation
                    .try_normalize(EPSILON)
                    .unwrap_or_else(Vector3::zeros)
                    .abs();
                transform.scale = transform
                    .scale
                    .component_mul(&(Vector3::repeat(1.0) + axis_scale * local_axis));
            }
            hierarchy.set_global_transform(bone, transform, propagate);

            if !propagate {
                hierarchy.set_global_transform(child, transform * local, false);
            }
        }
    }
    transform
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marionette_test_utils::straight_chain;

    #[test]
    fn target_at_child_is_a_fixed_point() {
        for scale in [BendScale::Default, BendScale::None, BendScale::Stretch] {
            let (mut skeleton, ids) = straight_chain(2, Vector3::new(2.0, 0.0, 0.0));
            let bone_before = skeleton.global_transform(ids[0]);
            let child_before = skeleton.global_transform(ids[1]);

            bend_towards(
                &mut skeleton,
                ids[0],
                ids[1],
                &child_before.translation,
                scale,
                false,
                1.0,
            );

            let bone_after = skeleton.global_transform(ids[0]);
            let child_after = skeleton.global_transform(ids[1]);
            assert_relative_eq!(
                bone_after.translation,
                bone_before.translation,
                epsilon = 1e-5
            );
            assert_relative_eq!(bone_after.rotation.angle(), 0.0, epsilon = 1e-4);
            assert_relative_eq!(bone_after.scale, bone_before.scale, epsilon = 1e-4);
            assert_relative_eq!(
                child_after.translation,
                child_before.translation,
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn default_policy_places_child_at_target() {
        let (mut skeleton, ids) = straight_chain(2, Vector3::new(2.0, 0.0, 0.0));
        let target = Vector3::new(0.0, 2.0, 0.0);
        let returned = bend_towards(
            &mut skeleton,
            ids[0],
            ids[1],
            &target,
            BendScale::Default,
            false,
            1.0,
        );

        let child = skeleton.global_transform(ids[1]);
        assert_relative_eq!(child.translation, target, epsilon = 1e-5);
        // Returned transform matches what was written for the bone.
        let bone = skeleton.global_transform(ids[0]);
        assert_relative_eq!(bone.translation, returned.translation, epsilon = 1e-6);
        assert_relative_eq!(bone.rotation.angle(), returned.rotation.angle(), epsilon = 1e-6);
        // The bone now aims +Y.
        assert_relative_eq!(
            bone.rotate_vector(&Vector3::x()),
            Vector3::y(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn none_policy_keeps_segment_length() {
        let (mut skeleton, ids) = straight_chain(2, Vector3::new(2.0, 0.0, 0.0));
        // Target further away than the segment; without stretching the child
        // lands at segment length along the target direction.
        let target = Vector3::new(0.0, 6.0, 0.0);
        bend_towards(
            &mut skeleton,
            ids[0],
            ids[1],
            &target,
            BendScale::None,
            false,
            1.0,
        );

        let child = skeleton.global_transform(ids[1]);
        assert_relative_eq!(
            child.translation,
            Vector3::new(0.0, 2.0, 0.0),
            epsilon = 1e-5
        );
        assert_relative_eq!(skeleton.global_transform(ids[0]).scale.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn stretch_policy_scales_bone_to_reach() {
        let (mut skeleton, ids) = straight_chain(2, Vector3::new(2.0, 0.0, 0.0));
        let target = Vector3::new(4.0, 0.0, 0.0);
        bend_towards(
            &mut skeleton,
            ids[0],
            ids[1],
            &target,
            BendScale::Stretch,
            false,
            1.0,
        );

        let bone = skeleton.global_transform(ids[0]);
        assert_relative_eq!(bone.scale.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(bone.scale.y, 1.0, epsilon = 1e-6);
        let child = skeleton.global_transform(ids[1]);
        assert_relative_eq!(child.translation, target, epsilon = 1e-4);
    }

    #[test]
    fn half_intensity_bends_halfway() {
        let (mut skeleton, ids) = straight_chain(2, Vector3::new(2.0, 0.0, 0.0));
        let target = Vector3::new(0.0, 2.0, 0.0);
        bend_towards(
            &mut skeleton,
            ids[0],
            ids[1],
            &target,
            BendScale::Default,
            false,
            0.5,
        );

        let child = skeleton.global_transform(ids[1]);
        // Blend of the current offset (2,0,0) and target delta (0,2,0).
        assert_relative_eq!(
            child.translation,
            Vector3::new(1.0, 1.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn propagation_carries_grandchildren() {
        let (mut skeleton, ids) = straight_chain(3, Vector3::new(2.0, 0.0, 0.0));
        let target = Vector3::new(0.0, 2.0, 0.0);
        bend_towards(
            &mut skeleton,
            ids[0],
            ids[1],
            &target,
            BendScale::None,
            true,
            1.0,
        );

        let tip = skeleton.global_transform(ids[2]);
        assert_relative_eq!(tip.translation, Vector3::new(0.0, 4.0, 0.0), epsilon = 1e-4);
    }
}
