//! Per-evaluation context handed to every solver.

use nalgebra::Vector3;

use crate::debug::{Color, DebugDraw, DebugSettings};
use crate::hierarchy::Hierarchy;

/// Bundles the host hierarchy with the optional debug sink for the duration
/// of one solver evaluation.
pub struct SolveContext<'a> {
    pub hierarchy: &'a mut dyn Hierarchy,
    pub draw: Option<&'a mut dyn DebugDraw>,
    pub debug: DebugSettings,
}

impl<'a> SolveContext<'a> {
    pub fn new(hierarchy: &'a mut dyn Hierarchy) -> Self {
        Self {
            hierarchy,
            draw: None,
            debug: DebugSettings::default(),
        }
    }

    pub fn with_draw(
        hierarchy: &'a mut dyn Hierarchy,
        draw: &'a mut dyn DebugDraw,
        debug: DebugSettings,
    ) -> Self {
        Self {
            hierarchy,
            draw: Some(draw),
            debug,
        }
    }

    /// Emit a debug line; `scale` is a factor on the configured draw scale.
    /// No-op when debugging is disabled or no sink is attached.
    pub fn draw_line(&mut self, from: Vector3<f32>, to: Vector3<f32>, color: Color, scale: f32) {
        if !self.debug.enabled {
            return;
        }
        let thickness = self.debug.scale * scale;
        if let Some(draw) = self.draw.as_deref_mut() {
            draw.line(from, to, color, thickness);
        }
    }

    /// Emit a debug point; `scale` is a factor on the configured draw scale.
    pub fn draw_point(&mut self, location: Vector3<f32>, color: Color, scale: f32) {
        if !self.debug.enabled {
            return;
        }
        let size = self.debug.scale * scale;
        if let Some(draw) = self.draw.as_deref_mut() {
            draw.point(location, size, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{color, DebugBuffer};
    use crate::hierarchy::BoneId;
    use crate::transform::Transform;

    struct NullHierarchy;

    impl Hierarchy for NullHierarchy {
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
            true
        }
    }

    #[test]
    fn draw_is_gated_on_enabled_flag() {
        let mut hierarchy = NullHierarchy;
        let mut buffer = DebugBuffer::new();
        let mut ctx = SolveContext::with_draw(
            &mut hierarchy,
            &mut buffer,
            DebugSettings {
                enabled: false,
                scale: 1.0,
            },
        );
        ctx.draw_line(Vector3::zeros(), Vector3::x(), color::RED, 1.0);
        drop(ctx);
        assert!(buffer.lines.is_empty());
    }

    #[test]
    fn draw_scales_by_settings() {
        let mut hierarchy = NullHierarchy;
        let mut buffer = DebugBuffer::new();
        let mut ctx = SolveContext::with_draw(
            &mut hierarchy,
            &mut buffer,
            DebugSettings {
                enabled: true,
                scale: 2.0,
            },
        );
        ctx.draw_line(Vector3::zeros(), Vector3::x(), color::YELLOW, 0.5);
        ctx.draw_point(Vector3::y(), color::WHITE, 3.0);
        drop(ctx);
        assert_eq!(buffer.lines[0].3, 1.0);
        assert_eq!(buffer.points[0].1, 6.0);
    }
}
