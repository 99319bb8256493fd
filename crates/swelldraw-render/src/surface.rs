//! Drawing surface abstraction.
//!
//! A [`Surface`] is the small slice of a 2D canvas context the scene passes
//! need: a save/restore state stack with a current transform, line dash and
//! global alpha, path stroking and filling, and compositing another surface.
//! Transform helpers post-multiply, like a canvas context.

use kurbo::{Affine, BezPath, Rect, Vec2};
use peniko::Color;

/// Per-surface drawing state saved by [`Surface::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub transform: Affine,
    pub line_dash: Vec<f64>,
    pub global_alpha: f64,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            line_dash: Vec::new(),
            global_alpha: 1.0,
        }
    }
}

/// Save/restore stack shared by the backends.
#[derive(Debug, Clone, Default)]
pub struct StateStack {
    current: SurfaceState,
    saved: Vec<SurfaceState>,
}

impl StateStack {
    pub fn current(&self) -> &SurfaceState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut SurfaceState {
        &mut self.current
    }

    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Unbalanced restores are ignored, as on a canvas.
    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }

    pub fn reset(&mut self) {
        self.current = SurfaceState::default();
        self.saved.clear();
    }
}

/// A raster target in device pixels.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resize the backing store. Clears contents and state.
    fn set_size(&mut self, width: u32, height: u32);

    fn state(&self) -> &StateStack;
    fn state_mut(&mut self) -> &mut StateStack;

    fn save(&mut self) {
        self.state_mut().save();
    }

    fn restore(&mut self) {
        self.state_mut().restore();
    }

    fn transform(&self) -> Affine {
        self.state().current().transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state_mut().current_mut().transform = transform;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let transform = self.transform() * Affine::translate(Vec2::new(dx, dy));
        self.set_transform(transform);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        let transform = self.transform() * Affine::scale_non_uniform(sx, sy);
        self.set_transform(transform);
    }

    /// Empty pattern means solid lines.
    fn set_line_dash(&mut self, dash: &[f64]) {
        self.state_mut().current_mut().line_dash = dash.to_vec();
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.state_mut().current_mut().global_alpha = alpha.clamp(0.0, 1.0);
    }

    /// Clear `rect` (in current user space) to transparent.
    fn clear_rect(&mut self, rect: Rect);

    /// Stroke with round caps and joins.
    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64);

    fn fill_path(&mut self, path: &BezPath, color: Color);

    /// Composite `source` scaled into `dest` (current user space).
    fn draw_surface(&mut self, source: &Self, dest: Rect);

    /// Device-space bounds of the whole surface.
    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }
}

/// Creates offscreen surfaces. May refuse, e.g. for oversized requests.
pub trait SurfaceFactory {
    type Surface: Surface;

    fn create_surface(&self, width: u32, height: u32) -> Option<Self::Surface>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_stack_restores_saved_state() {
        let mut stack = StateStack::default();
        stack.current_mut().global_alpha = 0.5;
        stack.save();
        stack.current_mut().global_alpha = 0.1;
        stack.current_mut().line_dash = vec![1.0, 2.0];
        stack.restore();
        assert_eq!(stack.current().global_alpha, 0.5);
        assert!(stack.current().line_dash.is_empty());

        stack.restore();
        assert_eq!(stack.current().global_alpha, 0.5);
    }
}
