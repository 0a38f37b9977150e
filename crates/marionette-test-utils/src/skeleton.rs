//! In-memory bone hierarchy.
//!
//! Stores initial and current transforms per bone and keeps locals in sync
//! with global writes, mirroring what a host scene graph does. Writes with
//! `propagate` recompute descendant globals from their locals; writes without
//! leave children stale until they are written themselves, which is exactly
//! the contract solvers are expected to handle.

use nalgebra::Vector3;

use marionette_core::hierarchy::{BoneId, Hierarchy};
use marionette_core::transform::Transform;

struct Bone {
    name: String,
    parent: Option<BoneId>,
    children: Vec<BoneId>,
    local: Transform,
    global: Transform,
    initial_local: Transform,
    initial_global: Transform,
}

/// A self-contained skeleton for tests.
#[derive(Default)]
pub struct TestSkeleton {
    bones: Vec<Bone>,
}

impl TestSkeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone under `parent` with the given local rest transform. The
    /// current pose starts at the rest pose.
    pub fn add_bone(&mut self, name: &str, parent: Option<BoneId>, local: Transform) -> BoneId {
        let global = match parent {
            Some(p) => self.bones[p.0 as usize].global * local,
            None => local,
        };
        let id = BoneId(self.bones.len() as u32);
        if let Some(p) = parent {
            self.bones[p.0 as usize].children.push(id);
        }
        self.bones.push(Bone {
            name: name.to_owned(),
            parent,
            children: Vec::new(),
            local,
            global,
            initial_local: local,
            initial_global: global,
        });
        id
    }

    pub fn bone_by_name(&self, name: &str) -> Option<BoneId> {
        self.bones
            .iter()
            .position(|b| b.name == name)
            .map(|i| BoneId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    fn recompute_descendants(&mut self, root: BoneId) {
        let mut stack: Vec<BoneId> = self.bones[root.0 as usize].children.clone();
        while let Some(id) = stack.pop() {
            let parent = self.bones[id.0 as usize].parent.expect("non-root bone");
            let parent_global = self.bones[parent.0 as usize].global;
            let bone = &mut self.bones[id.0 as usize];
            bone.global = parent_global * bone.local;
            stack.extend(self.bones[id.0 as usize].children.iter().copied());
        }
    }
}

impl Hierarchy for TestSkeleton {
    fn global_transform(&self, bone: BoneId) -> Transform {
        self.bones[bone.0 as usize].global
    }

    fn initial_global_transform(&self, bone: BoneId) -> Transform {
        self.bones[bone.0 as usize].initial_global
    }

    fn local_transform(&self, bone: BoneId) -> Transform {
        self.bones[bone.0 as usize].local
    }

    fn initial_local_transform(&self, bone: BoneId) -> Transform {
        self.bones[bone.0 as usize].initial_local
    }

    fn set_global_transform(&mut self, bone: BoneId, transform: Transform, propagate: bool) {
        let parent_global = self.bones[bone.0 as usize]
            .parent
            .map(|p| self.bones[p.0 as usize].global)
            .unwrap_or_else(Transform::identity);
        let entry = &mut self.bones[bone.0 as usize];
        entry.global = transform;
        entry.local = parent_global.inverse() * transform;
        if propagate {
            self.recompute_descendants(bone);
        }
    }

    fn parent(&self, bone: BoneId) -> Option<BoneId> {
        self.bones[bone.0 as usize].parent
    }

    fn contains(&self, bone: BoneId) -> bool {
        (bone.0 as usize) < self.bones.len()
    }
}

/// Build a chain of `count` bones, each offset from its parent by `step`.
/// The root sits at the origin with identity rotation.
pub fn straight_chain(count: usize, step: Vector3<f32>) -> (TestSkeleton, Vec<BoneId>) {
    let mut skeleton = TestSkeleton::new();
    let mut ids = Vec::with_capacity(count);
    let mut parent = None;
    for i in 0..count {
        let local = if i == 0 {
            Transform::identity()
        } else {
            Transform::from_translation(step)
        };
        let id = skeleton.add_bone(&format!("bone_{i}"), parent, local);
        ids.push(id);
        parent = Some(id);
    }
    (skeleton, ids)
}

/// Current global positions of the given bones.
pub fn positions(skeleton: &TestSkeleton, bones: &[BoneId]) -> Vec<Vector3<f32>> {
    bones
        .iter()
        .map(|&b| skeleton.global_transform(b).translation)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn straight_chain_accumulates_steps() {
        let (skeleton, ids) = straight_chain(4, Vector3::new(2.0, 0.0, 0.0));
        let p = positions(&skeleton, &ids);
        assert_relative_eq!(p[0], Vector3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(p[3], Vector3::new(6.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn set_global_updates_local_against_parent() {
        let (mut skeleton, ids) = straight_chain(2, Vector3::new(1.0, 0.0, 0.0));
        let moved = Transform::from_translation(Vector3::new(0.0, 3.0, 0.0));
        skeleton.set_global_transform(ids[1], moved, false);
        let local = skeleton.local_transform(ids[1]);
        assert_relative_eq!(local.translation, Vector3::new(0.0, 3.0, 0.0), epsilon = 1e-5);
        // Initial transforms stay at the rest pose.
        assert_relative_eq!(
            skeleton.initial_local_transform(ids[1]).translation,
            Vector3::new(1.0, 0.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn propagation_recomputes_descendants() {
        let (mut skeleton, ids) = straight_chain(3, Vector3::new(1.0, 0.0, 0.0));
        let rotated = Transform::from_rotation(UnitQuaternion::from_axis_angle(
            &Vector3::z_axis(),
            FRAC_PI_2,
        ));
        skeleton.set_global_transform(ids[0], rotated, true);
        let p = positions(&skeleton, &ids);
        assert_relative_eq!(p[1], Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(p[2], Vector3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn writes_without_propagation_leave_children_stale() {
        let (mut skeleton, ids) = straight_chain(3, Vector3::new(1.0, 0.0, 0.0));
        let moved = Transform::from_translation(Vector3::new(0.0, 5.0, 0.0));
        skeleton.set_global_transform(ids[0], moved, false);
        let p = positions(&skeleton, &ids);
        assert_relative_eq!(p[1], Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn bone_by_name_finds_bones() {
        let (skeleton, ids) = straight_chain(2, Vector3::x());
        assert_eq!(skeleton.bone_by_name("bone_1"), Some(ids[1]));
        assert_eq!(skeleton.bone_by_name("missing"), None);
    }
}
