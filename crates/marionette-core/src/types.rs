//! Shared value types passed into every solver.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

/// How much of the downstream hierarchy the host recomputes after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Don't propagate to children.
    Off,
    /// Only propagate below the last bone of the chain (fast).
    OnlyLast,
    /// Propagate below every written bone (slowest).
    #[default]
    All,
}

impl Propagation {
    /// Whether writes to interior chain bones propagate.
    pub fn interior(self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether writes to the chain's first and last bones propagate.
    pub fn endpoints(self) -> bool {
        !matches!(self, Self::Off)
    }
}

// ---------------------------------------------------------------------------
// BendScale
// ---------------------------------------------------------------------------

/// How bend propagation treats bone scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BendScale {
    /// Keep scale and write the child explicitly from its local transform.
    #[default]
    Default,
    /// Rotation only; the child follows via host propagation when enabled.
    None,
    /// Stretch the parent along the child offset axis until the rendered
    /// segment reaches the target.
    Stretch,
}

// ---------------------------------------------------------------------------
// Objective
// ---------------------------------------------------------------------------

/// Target pose for the end of a chain, with an optional local offset applied
/// on top of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub target: Transform,
    pub offset_rotation: UnitQuaternion<f32>,
    pub offset_translation: Vector3<f32>,
}

impl Objective {
    pub fn new(target: Transform) -> Self {
        Self {
            target,
            offset_rotation: UnitQuaternion::identity(),
            offset_translation: Vector3::zeros(),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self::new(Transform::from_translation(translation))
    }

    pub fn with_offset(
        target: Transform,
        offset_rotation: UnitQuaternion<f32>,
        offset_translation: Vector3<f32>,
    ) -> Self {
        Self {
            target,
            offset_rotation,
            offset_translation,
        }
    }

    /// The effective end-effector target: offset composed under the target.
    pub fn effector(&self) -> Transform {
        self.target * Transform::from_parts(self.offset_translation, self.offset_rotation)
    }

    /// Forward axis of the target basis.
    pub fn forward(&self) -> Vector3<f32> {
        self.target.unit_y()
    }

    /// Right axis of the target basis.
    pub fn right(&self) -> Vector3<f32> {
        -self.target.unit_x()
    }

    /// Up axis of the target basis.
    pub fn up(&self) -> Vector3<f32> {
        self.target.unit_z()
    }
}
