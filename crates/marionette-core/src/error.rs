use thiserror::Error;

use crate::hierarchy::BoneId;

/// Top-level error type for the marionette workspace.
#[derive(Debug, Error)]
pub enum RigError {
    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Per-evaluation configuration failures.
///
/// Copy + static payloads for cheap propagation in the per-frame path. A
/// solver returning one of these has written no transforms; geometric
/// degeneracies never surface here, they fall back to documented results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("chain needs at least {required} bones, got {got}")]
    ChainTooShort { required: usize, got: usize },

    #[error("total rest-pose chain length is zero")]
    ZeroChainLength,

    #[error("{0} cannot be resolved in the hierarchy")]
    UnresolvedBone(BoneId),
}

/// Rig-file loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
