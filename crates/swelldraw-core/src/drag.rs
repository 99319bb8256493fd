//! Sizing a newly created element while the pointer drags.

use crate::element::ElementId;
use crate::mutation::{ElementCache, ElementUpdate};
use crate::scene::{Scene, SceneError};
use kurbo::{Point, Vec2};

/// One drag step for the element under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DragNewElement {
    pub new_element: ElementId,
    /// Where the pointer went down, in scene coordinates.
    pub origin: Point,
    /// Current pointer, in scene coordinates.
    pub pointer: Point,
    pub width: f64,
    pub height: f64,
    pub origin_offset: Option<Vec2>,
}

impl DragNewElement {
    /// A drag step whose extents are the pointer's distance from the origin.
    pub fn from_pointer(new_element: ElementId, origin: Point, pointer: Point) -> Self {
        Self {
            new_element,
            origin,
            pointer,
            width: (pointer.x - origin.x).abs(),
            height: (pointer.y - origin.y).abs(),
            origin_offset: None,
        }
    }

    pub fn with_origin_offset(mut self, offset: Vec2) -> Self {
        self.origin_offset = Some(offset);
        self
    }
}

/// Resize the new element so it spans from the origin to the pointer,
/// flipping the anchor on each axis the pointer has crossed.
///
/// Zero-area drags are ignored. Returns whether the element changed.
pub fn drag_new_element(
    scene: &mut Scene,
    caches: &mut dyn ElementCache,
    drag: &DragNewElement,
) -> Result<bool, SceneError> {
    if drag.width == 0.0 || drag.height == 0.0 {
        return Ok(false);
    }

    let new_x = if drag.pointer.x < drag.origin.x {
        drag.origin.x - drag.width
    } else {
        drag.origin.x
    };
    let new_y = if drag.pointer.y < drag.origin.y {
        drag.origin.y - drag.height
    } else {
        drag.origin.y
    };
    let offset = drag.origin_offset.unwrap_or(Vec2::ZERO);

    let updates = ElementUpdate::new()
        .with_position(new_x + offset.x, new_y + offset.y)
        .with_size(drag.width, drag.height);
    let previous_version = scene
        .get_element(&drag.new_element)
        .map(|element| element.version())
        .ok_or_else(|| SceneError::UnknownElement(drag.new_element.clone()))?;
    let element = scene.mutate_element(&drag.new_element, updates, caches)?;
    Ok(element.version() != previous_version)
}
