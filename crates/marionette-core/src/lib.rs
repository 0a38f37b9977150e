// marionette-core: Transforms, hierarchy interface, and shared types for the
// marionette IK solvers.

pub mod context;
pub mod debug;
pub mod error;
pub mod hierarchy;
pub mod transform;
pub mod types;

pub use context::SolveContext;
pub use debug::{DebugDraw, DebugSettings};
pub use error::{ConfigError, RigError, SolveError};
pub use hierarchy::{BoneId, Hierarchy};
pub use transform::Transform;
pub use types::{BendScale, Objective, Propagation};
