//! Canvas setup shared by the scene passes.

use crate::surface::Surface;
use kurbo::{Affine, Rect};

/// Canvas size in CSS pixels for a device-pixel surface rendered at `scale`.
pub fn get_normalized_canvas_dimensions<S: Surface>(surface: &S, scale: f64) -> (f64, f64) {
    (surface.width() as f64 / scale, surface.height() as f64 / scale)
}

/// Reset the transform, apply `scale` and clear the normalized area.
pub fn bootstrap_canvas<S: Surface>(surface: &mut S, scale: f64, normalized_width: f64, normalized_height: f64) {
    surface.set_transform(Affine::IDENTITY);
    surface.scale(scale, scale);
    surface.clear_rect(Rect::new(0.0, 0.0, normalized_width, normalized_height));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, RecordingSurface};

    #[test]
    fn test_bootstrap_clears_whole_surface() {
        let mut surface = RecordingSurface::new(200, 100);
        surface.translate(30.0, 30.0);
        let (w, h) = get_normalized_canvas_dimensions(&surface, 2.0);
        assert_eq!((w, h), (100.0, 50.0));

        bootstrap_canvas(&mut surface, 2.0, w, h);
        assert_eq!(surface.transform(), Affine::scale(2.0));
        assert!(matches!(surface.commands(), [DrawCommand::Clear { .. }]));
    }
}
