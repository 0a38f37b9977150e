//! Optional debug-draw collection.
//!
//! Solvers emit lines and points describing their intermediate geometry when
//! a sink is attached; no solver result depends on whether one is.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// RGBA color, linear components in `[0, 1]`.
pub type Color = [f32; 4];

pub mod color {
    use super::Color;

    pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
    pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];
    pub const RED: Color = [1.0, 0.0, 0.0, 1.0];
    pub const GREEN: Color = [0.0, 1.0, 0.0, 1.0];
    pub const BLUE: Color = [0.0, 0.0, 1.0, 1.0];
    pub const YELLOW: Color = [1.0, 1.0, 0.0, 1.0];
}

// ---------------------------------------------------------------------------
// DebugSettings
// ---------------------------------------------------------------------------

/// Cosmetic controls for debug drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebugSettings {
    /// If enabled debug information will be drawn.
    #[serde(default)]
    pub enabled: bool,
    /// The size of the debug drawing information.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

const fn default_scale() -> f32 {
    1.0
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: default_scale(),
        }
    }
}

// ---------------------------------------------------------------------------
// DebugDraw
// ---------------------------------------------------------------------------

/// Sink for solver debug geometry.
pub trait DebugDraw {
    fn line(&mut self, from: Vector3<f32>, to: Vector3<f32>, color: Color, thickness: f32);
    fn point(&mut self, location: Vector3<f32>, size: f32, color: Color);
}

/// A [`DebugDraw`] that records everything it is given, for tests and
/// offline inspection.
#[derive(Debug, Default)]
pub struct DebugBuffer {
    pub lines: Vec<(Vector3<f32>, Vector3<f32>, Color, f32)>,
    pub points: Vec<(Vector3<f32>, f32, Color)>,
}

impl DebugBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.points.clear();
    }
}

impl DebugDraw for DebugBuffer {
    fn line(&mut self, from: Vector3<f32>, to: Vector3<f32>, color: Color, thickness: f32) {
        self.lines.push((from, to, color, thickness));
    }

    fn point(&mut self, location: Vector3<f32>, size: f32, color: Color) {
        self.points.push((location, size, color));
    }
}
