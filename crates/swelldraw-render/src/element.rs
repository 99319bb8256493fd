//! Per-element offscreen canvases and element drawing.
//!
//! Each element's shape is rasterized once into a padded offscreen surface
//! sized for the current zoom and device pixel ratio, then composited into
//! the scene canvas on every frame. Entries are evicted whenever the
//! element's shape is, and regenerated when the zoom changes.

use crate::renderer::RenderError;
use crate::surface::{Surface, SurfaceFactory};
use kurbo::Rect;
use std::collections::HashMap;
use swelldraw_core::rough::{Drawable, OpSetKind};
use swelldraw_core::{AppState, Element, ElementCache, ElementId, ElementType, NormalizedZoom, ShapeCache};

/// Padding around the shape inside its canvas, in device pixels at zoom 1.
pub const CANVAS_PADDING: f64 = 20.0;
/// Maximum canvas area in pixels.
pub const AREA_LIMIT: f64 = 16_777_216.0;
/// Maximum canvas side length in pixels.
pub const WIDTH_HEIGHT_LIMIT: f64 = 32_767.0;

/// Size of an element canvas and the zoom actually used to render it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

/// Canvas size for `element` at `zoom`, reducing the scale until the canvas
/// fits both the side length and the area limits.
pub fn capped_element_canvas_size(element: &Element, zoom: NormalizedZoom, device_pixel_ratio: f64) -> CanvasSize {
    let padding = CANVAS_PADDING;
    let width = element.width() * device_pixel_ratio + padding * 2.0;
    let height = element.height() * device_pixel_ratio + padding * 2.0;

    let mut scale = zoom.value();
    if width * scale > WIDTH_HEIGHT_LIMIT || height * scale > WIDTH_HEIGHT_LIMIT {
        scale = (WIDTH_HEIGHT_LIMIT / width).min(WIDTH_HEIGHT_LIMIT / height);
    }
    if width * height * scale * scale > AREA_LIMIT {
        scale = (AREA_LIMIT / (width * height)).sqrt();
    }

    CanvasSize {
        width: (width * scale).floor().max(0.0) as u32,
        height: (height * scale).floor().max(0.0) as u32,
        scale,
    }
}

/// A rasterized element.
#[derive(Debug, Clone)]
pub struct ElementWithCanvas<S> {
    pub surface: S,
    /// Zoom the shape was rendered at, after capping.
    pub scale: f64,
    /// Zoom the entry was created for.
    pub zoom: NormalizedZoom,
}

/// Element canvases keyed by element id.
#[derive(Debug, Clone)]
pub struct ElementCanvasCache<S> {
    entries: HashMap<ElementId, ElementWithCanvas<S>>,
}

impl<S> Default for ElementCanvasCache<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: Surface> ElementCanvasCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ElementId) -> Option<&ElementWithCanvas<S>> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The element's canvas, rendering it on a miss or when `zoom` changed.
    ///
    /// `Ok(None)` means the element has no drawable canvas (zero size, or
    /// the factory refused the surface).
    pub fn generate_element_with_canvas<F>(
        &mut self,
        element: &Element,
        drawable: &Drawable,
        factory: &F,
        zoom: NormalizedZoom,
        device_pixel_ratio: f64,
    ) -> Result<Option<&ElementWithCanvas<S>>, RenderError>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let id = element.id();
        if self.entries.get(id).is_some_and(|entry| entry.zoom != zoom) {
            log::trace!("Zoom changed, regenerating canvas for {}", id);
            self.entries.remove(id);
        }

        if !self.entries.contains_key(id) {
            match generate_element_canvas(element, drawable, factory, zoom, device_pixel_ratio)? {
                Some(entry) => {
                    self.entries.insert(id.clone(), entry);
                }
                None => return Ok(None),
            }
        }
        Ok(self.entries.get(id))
    }
}

impl<S> ElementCache for ElementCanvasCache<S> {
    fn evict(&mut self, id: &ElementId) {
        self.entries.remove(id);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Rasterize `drawable` into a fresh padded surface.
pub fn generate_element_canvas<F: SurfaceFactory>(
    element: &Element,
    drawable: &Drawable,
    factory: &F,
    zoom: NormalizedZoom,
    device_pixel_ratio: f64,
) -> Result<Option<ElementWithCanvas<F::Surface>>, RenderError> {
    let size = capped_element_canvas_size(element, zoom, device_pixel_ratio);
    if size.width == 0 || size.height == 0 {
        log::warn!("Element {} has an empty canvas, skipping", element.id());
        return Ok(None);
    }
    let Some(mut surface) = factory.create_surface(size.width, size.height) else {
        log::warn!(
            "No {}x{} canvas available for element {}",
            size.width,
            size.height,
            element.id()
        );
        return Ok(None);
    };

    surface.save();
    surface.translate(CANVAS_PADDING * size.scale, CANVAS_PADDING * size.scale);
    surface.scale(device_pixel_ratio * size.scale, device_pixel_ratio * size.scale);
    let drawn = draw_element_on_canvas(element, drawable, &mut surface);
    surface.restore();
    drawn?;

    Ok(Some(ElementWithCanvas {
        surface,
        scale: size.scale,
        zoom,
    }))
}

/// Paint the element's shape in element-local coordinates.
pub fn draw_element_on_canvas<S: Surface>(
    element: &Element,
    drawable: &Drawable,
    surface: &mut S,
) -> Result<(), RenderError> {
    match element.element_type() {
        ElementType::Rectangle | ElementType::Diamond | ElementType::Ellipse => {
            draw_drawable(drawable, surface);
            Ok(())
        }
        other => Err(RenderError::UnsupportedElementType(other)),
    }
}

fn draw_drawable<S: Surface>(drawable: &Drawable, surface: &mut S) {
    let options = &drawable.options;
    for set in &drawable.sets {
        match set.kind {
            OpSetKind::Path => {
                surface.save();
                if let Some(dash) = options.stroke_line_dash {
                    surface.set_line_dash(&dash);
                }
                surface.stroke_path(&set.path, options.stroke, options.stroke_width);
                surface.restore();
            }
            OpSetKind::FillPath => {
                if let Some(fill) = options.fill {
                    surface.fill_path(&set.path, fill);
                }
            }
            OpSetKind::FillSketch => {
                if let Some(fill) = options.fill {
                    surface.stroke_path(&set.path, fill, options.effective_fill_weight());
                }
            }
        }
    }
}

/// Composite an element canvas at the element's scene position. Expects
/// `surface` to be in zoomed scene space scaled by the device pixel ratio.
pub fn draw_element_from_canvas<S: Surface>(
    entry: &ElementWithCanvas<S>,
    element: &Element,
    surface: &mut S,
    app_state: &AppState,
    device_pixel_ratio: f64,
) {
    let [x1, y1, ..] = element.absolute_coords();
    let x = (x1 + app_state.scroll_x) * device_pixel_ratio - CANVAS_PADDING;
    let y = (y1 + app_state.scroll_y) * device_pixel_ratio - CANVAS_PADDING;
    let width = entry.surface.width() as f64 / entry.scale;
    let height = entry.surface.height() as f64 / entry.scale;

    surface.save();
    surface.scale(1.0 / device_pixel_ratio, 1.0 / device_pixel_ratio);
    surface.set_global_alpha(element.opacity() / 100.0);
    surface.draw_surface(&entry.surface, Rect::new(x, y, x + width, y + height));
    surface.restore();
}

/// Draw one element through its cached shape and canvas. Types without a
/// canvas representation draw nothing.
pub fn render_element<F: SurfaceFactory>(
    element: &Element,
    shapes: &mut ShapeCache<ElementCanvasCache<F::Surface>>,
    factory: &F,
    surface: &mut F::Surface,
    app_state: &AppState,
    device_pixel_ratio: f64,
) -> Result<(), RenderError> {
    match element.element_type() {
        ElementType::Rectangle | ElementType::Diamond | ElementType::Ellipse => {
            let Some(drawable) = shapes.generate_element_shape(element)? else {
                return Ok(());
            };
            let canvases = shapes.dependent_mut();
            if let Some(entry) =
                canvases.generate_element_with_canvas(element, &drawable, factory, app_state.zoom, device_pixel_ratio)?
            {
                draw_element_from_canvas(entry, element, surface, app_state, device_pixel_ratio);
            }
            Ok(())
        }
        ElementType::Selection => Ok(()),
    }
}
