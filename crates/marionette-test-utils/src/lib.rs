//! Shared test fixtures for marionette crates.
//!
//! Provides an in-memory [`Hierarchy`](marionette_core::Hierarchy)
//! implementation and chain builders so solver tests don't need a host
//! engine.

pub mod skeleton;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use skeleton::{positions, straight_chain, TestSkeleton};
