//! Shape cache and per-type shape generation.

use crate::color::{is_transparent, parse_color};
use crate::element::{Element, ElementId, ElementType, StrokeStyle, roughness};
use crate::mutation::ElementCache;
use crate::rough::{Drawable, RoughError, RoughGenerator, RoughOptions, dash_array_dashed, dash_array_dotted};
use kurbo::Point;
use peniko::Color;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Shape generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("Unsupported element type for shape generation: {0}")]
    UnsupportedElementType(ElementType),
    #[error(transparent)]
    Rough(#[from] RoughError),
}

/// A cached shape. `None` means no shape applies to the element, which is a
/// valid cached answer and is not regenerated.
pub type ElementShape = Option<Rc<Drawable>>;

/// Generated shapes keyed by element id.
///
/// `D` is the cache derived from these shapes (the rasterized element
/// canvases). Whenever a shape is dropped or regenerated the dependent entry
/// for that element is evicted too.
#[derive(Debug)]
pub struct ShapeCache<D: ElementCache = ()> {
    generator: RoughGenerator,
    cache: HashMap<ElementId, ElementShape>,
    dependent: D,
}

impl<D: ElementCache + Default> Default for ShapeCache<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: ElementCache> ShapeCache<D> {
    pub fn new(dependent: D) -> Self {
        Self {
            generator: RoughGenerator::new(),
            cache: HashMap::new(),
            dependent,
        }
    }

    /// The cached shape, or `None` when nothing is cached. Never computes.
    pub fn get(&self, id: &ElementId) -> Option<&ElementShape> {
        self.cache.get(id)
    }

    pub fn set(&mut self, id: &ElementId, shape: ElementShape) {
        self.cache.insert(id.clone(), shape);
    }

    /// Drop the element's shape and its dependent entry.
    pub fn delete(&mut self, id: &ElementId) -> Option<ElementShape> {
        self.dependent.evict(id);
        self.cache.remove(id)
    }

    /// The cached shape, generating and caching it on a miss.
    pub fn generate_element_shape(&mut self, element: &Element) -> Result<ElementShape, ShapeError> {
        if let Some(shape) = self.cache.get(element.id()) {
            return Ok(shape.clone());
        }

        self.dependent.evict(element.id());

        let shape = generate_shape(element, &self.generator)?.map(Rc::new);
        log::debug!(
            "Generated {} shape for element {}",
            element.element_type(),
            element.id()
        );
        self.cache.insert(element.id().clone(), shape.clone());
        Ok(shape)
    }

    /// Drop every shape and every dependent entry.
    pub fn destroy(&mut self) {
        self.cache.clear();
        self.dependent.clear();
    }

    pub fn dependent(&self) -> &D {
        &self.dependent
    }

    pub fn dependent_mut(&mut self) -> &mut D {
        &mut self.dependent
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<D: ElementCache> ElementCache for ShapeCache<D> {
    fn evict(&mut self, id: &ElementId) {
        self.delete(id);
    }

    fn clear(&mut self) {
        self.destroy();
    }
}

/// Generate a fresh shape in element-local coordinates. Elements with
/// non-finite geometry get no shape.
fn generate_shape(element: &Element, generator: &RoughGenerator) -> Result<Option<Drawable>, ShapeError> {
    let options = generate_rough_options(element)?;
    let (w, h) = (element.width(), element.height());
    if !w.is_finite() || !h.is_finite() {
        return Ok(None);
    }

    let drawable = match element.element_type() {
        ElementType::Rectangle => generator.rectangle(0.0, 0.0, w, h, &options)?,
        ElementType::Diamond => {
            let points = [
                Point::new(w / 2.0, 0.0),
                Point::new(w, h / 2.0),
                Point::new(w / 2.0, h),
                Point::new(0.0, h / 2.0),
            ];
            generator.polygon(&points, &options)?
        }
        ElementType::Ellipse => generator.ellipse(w / 2.0, h / 2.0, w, h, &options)?,
        other => return Err(ShapeError::UnsupportedElementType(other)),
    };
    Ok(Some(drawable))
}

/// Rough options derived from an element's style.
pub fn generate_rough_options(element: &Element) -> Result<RoughOptions, ShapeError> {
    let stroke_width = element.stroke_width();
    let solid = element.stroke_style() == StrokeStyle::Solid;

    let mut options = RoughOptions {
        seed: element.seed(),
        stroke_line_dash: match element.stroke_style() {
            StrokeStyle::Solid => None,
            StrokeStyle::Dashed => Some(dash_array_dashed(stroke_width)),
            StrokeStyle::Dotted => Some(dash_array_dotted(stroke_width)),
        },
        // Overlaid strokes would double up the dashes.
        disable_multi_stroke: !solid,
        stroke_width: if solid { stroke_width } else { stroke_width + 0.5 },
        fill_weight: stroke_width / 2.0,
        hachure_gap: stroke_width * 4.0,
        roughness: adjust_roughness(element),
        stroke: parse_color(element.stroke_color()).unwrap_or(Color::from_rgba8(0, 0, 0, 255)),
        preserve_vertices: element.roughness() < roughness::CARTOONIST,
        ..RoughOptions::default()
    };

    match element.element_type() {
        ElementType::Rectangle | ElementType::Diamond | ElementType::Ellipse => {
            options.fill_style = element.fill_style();
            options.fill = if is_transparent(element.background_color()) {
                None
            } else {
                parse_color(element.background_color())
            };
            if element.element_type() == ElementType::Ellipse {
                options.curve_fitting = 1.0;
            }
            Ok(options)
        }
        other => Err(ShapeError::UnsupportedElementType(other)),
    }
}

/// Damp roughness for small elements: full roughness only once the short
/// side reaches 20 and the long side 50.
pub fn adjust_roughness(element: &Element) -> f64 {
    let roughness = element.roughness();
    let max_size = element.width().max(element.height());
    let min_size = element.width().min(element.height());

    if min_size >= 20.0 && max_size >= 50.0 {
        return roughness;
    }

    let divisor = if max_size < 10.0 { 3.0 } else { 2.0 };
    (roughness / divisor).min(2.5)
}
