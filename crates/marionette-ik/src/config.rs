//! Data-driven rig configuration.
//!
//! A rig file is a TOML document mapping entry names to a bone-name list and
//! a tagged solver parameter table. Bone-name resolution to
//! [`BoneId`](marionette_core::BoneId)s stays host-side; loading validates
//! everything that can be checked without a hierarchy.
//!
//! ```toml
//! [solvers.left_arm]
//! bones = ["clavicle_l", "upperarm_l", "lowerarm_l", "hand_l"]
//! type = "clavicle"
//! max_clavicle_angle = 12.0
//!
//! [solvers.spine]
//! bones = ["pelvis", "spine_01", "spine_02", "spine_03", "chest"]
//! type = "spine"
//! iterations = 8
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use marionette_core::ConfigError;

use crate::{
    ArmIk, ClavicleIk, ConeFabrik, DigitigradeIk, HingeIk, NeckIk, SpineIk, SplineIk,
};

/// Tagged solver parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolverParams {
    Hinge(HingeIk),
    Arm(ArmIk),
    Clavicle(ClavicleIk),
    Digitigrade(DigitigradeIk),
    Fabrik(ConeFabrik),
    Spine(SpineIk),
    Spline(SplineIk),
    Neck(NeckIk),
}

impl SolverParams {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hinge(_) => "hinge",
            Self::Arm(_) => "arm",
            Self::Clavicle(_) => "clavicle",
            Self::Digitigrade(_) => "digitigrade",
            Self::Fabrik(_) => "fabrik",
            Self::Spine(_) => "spine",
            Self::Spline(_) => "spline",
            Self::Neck(_) => "neck",
        }
    }

    /// Minimum chain length this solver accepts.
    pub fn min_chain_len(&self) -> usize {
        match self {
            Self::Hinge(_) | Self::Arm(_) => 3,
            Self::Clavicle(_) | Self::Digitigrade(_) => 4,
            Self::Fabrik(_) | Self::Spine(_) | Self::Spline(_) | Self::Neck(_) => 2,
        }
    }
}

/// One configured chain: bone names in parent→child order plus solver
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigEntry {
    pub bones: Vec<String>,
    #[serde(flatten)]
    pub solver: SolverParams,
}

/// A full rig description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub solvers: BTreeMap<String, RigEntry>,
}

impl RigConfig {
    /// Parse and validate a rig from TOML text.
    pub fn from_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a rig file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_str(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, entry) in &self.solvers {
            let required = entry.solver.min_chain_len();
            if entry.bones.len() < required {
                return Err(ConfigError::InvalidValue {
                    field: format!("solvers.{name}.bones"),
                    message: format!(
                        "{} solver needs at least {required} bones, got {}",
                        entry.solver.kind(),
                        entry.bones.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
