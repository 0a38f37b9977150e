//! Collaborator interface to the host skeleton.
//!
//! Solvers never own bone storage. They read and write global transforms
//! through [`Hierarchy`] by opaque [`BoneId`], one chain per evaluation, and
//! leave parent/child bookkeeping (resolution, caching, propagation cost) to
//! the host.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// BoneId
// ---------------------------------------------------------------------------

/// Opaque, host-assigned identifier of a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoneId(pub u32);

impl fmt::Display for BoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bone#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Host-owned bone storage.
///
/// `initial_*` queries reflect the bind-time rest pose and must stay stable
/// for the whole evaluation; `global_transform` reflects the current frame
/// after all upstream writes. Passing an id for which [`Hierarchy::contains`]
/// is false to any other method may panic, host-dependent.
pub trait Hierarchy {
    fn global_transform(&self, bone: BoneId) -> Transform;
    fn initial_global_transform(&self, bone: BoneId) -> Transform;
    fn local_transform(&self, bone: BoneId) -> Transform;
    fn initial_local_transform(&self, bone: BoneId) -> Transform;

    /// Write a bone's global transform. With `propagate` the host recomputes
    /// descendant globals from their locals before returning.
    fn set_global_transform(&mut self, bone: BoneId, transform: Transform, propagate: bool);

    fn parent(&self, bone: BoneId) -> Option<BoneId>;
    fn contains(&self, bone: BoneId) -> bool;
}

/// Check a chain's length and id resolvability before any transform write.
///
/// Failures are reported once through the `log` warning channel and returned
/// as a [`SolveError`]; callers skip the evaluation without touching the
/// hierarchy.
pub fn validate_chain(
    hierarchy: &dyn Hierarchy,
    chain: &[BoneId],
    min_len: usize,
) -> Result<(), SolveError> {
    if chain.len() < min_len {
        log::warn!("chain has to have length at least {min_len}, got {}", chain.len());
        return Err(SolveError::ChainTooShort {
            required: min_len,
            got: chain.len(),
        });
    }
    for &bone in chain {
        if !hierarchy.contains(bone) {
            log::warn!("{bone} is not part of the hierarchy");
            return Err(SolveError::UnresolvedBone(bone));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyHierarchy;

    impl Hierarchy for EmptyHierarchy {
        fn global_transform(&self, _: BoneId) -> Transform {
            Transform::identity()
        }
        fn initial_global_transform(&self, _: BoneId) -> Transform {
            Transform::identity()
        }
        fn local_transform(&self, _: BoneId) -> Transform {
            Transform::identity()
        }
        fn initial_local_transform(&self, _: BoneId) -> Transform {
            Transform::identity()
        }
        fn set_global_transform(&mut self, _: BoneId, _: Transform, _: bool) {}
        fn parent(&self, _: BoneId) -> Option<BoneId> {
            None
        }
        fn contains(&self, _: BoneId) -> bool {
            false
        }
    }

    #[test]
    fn validate_rejects_short_chain() {
        let err = validate_chain(&EmptyHierarchy, &[BoneId(0)], 2).unwrap_err();
        assert_eq!(err, SolveError::ChainTooShort { required: 2, got: 1 });
    }

    #[test]
    fn validate_rejects_unresolved_bone() {
        let err = validate_chain(&EmptyHierarchy, &[BoneId(0), BoneId(1)], 2).unwrap_err();
        assert_eq!(err, SolveError::UnresolvedBone(BoneId(0)));
    }

    #[test]
    fn bone_id_display() {
        assert_eq!(BoneId(7).to_string(), "bone#7");
    }
}
