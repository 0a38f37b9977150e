//! Inverse kinematics solvers for skeletal character animation.
//!
//! Closed-form two-bone solvers (hinge, arm, clavicle, digitigrade), a
//! cone-constrained FABRIK, a double-anchored spine solver, spline chain
//! placement, and an evenly-distributed neck bend/twist. Every solver reads
//! and writes bone transforms through the host's
//! [`Hierarchy`](marionette_core::Hierarchy) and is re-evaluated once per
//! chain per frame.
//!
//! # Architecture
//!
//! ```text
//! Hierarchy ──► rest-pose snapshot ──► solver algebra ──► transform writes
//!                                          │
//!                  triangle / limits / bend_towards (shared primitives)
//! ```
//!
//! Solvers are parameter structs with a single `solve` entry point taking a
//! [`SolveContext`](marionette_core::SolveContext), the chain (parent→child
//! bone ids), and an [`Objective`](marionette_core::Objective). Configuration
//! failures are warned once and returned as
//! [`SolveError`](marionette_core::SolveError) without touching the
//! hierarchy; geometric degeneracies fall back to documented deterministic
//! results so every frame produces a pose.

pub mod arm;
pub mod bend;
pub mod clavicle;
pub mod config;
pub mod digitigrade;
pub mod fabrik;
pub mod hinge;
pub mod limits;
pub mod neck;
pub mod spine;
pub mod spline;
pub mod triangle;

pub use arm::ArmIk;
pub use bend::bend_towards;
pub use clavicle::ClavicleIk;
pub use config::{RigConfig, RigEntry, SolverParams};
pub use digitigrade::DigitigradeIk;
pub use fabrik::ConeFabrik;
pub use hinge::HingeIk;
pub use neck::NeckIk;
pub use spine::{EffectorSettings, SpineIk};
pub use spline::SplineIk;
pub use triangle::TriangleSolution;
