//! Render errors and the renderable-elements projector.

use std::collections::HashSet;
use std::rc::Rc;
use swelldraw_core::{ElementId, ElementType, Scene, SceneError, ShapeError};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unsupported element type for drawing: {0}")]
    UnsupportedElementType(ElementType),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("Surface error: cannot allocate {width}x{height}")]
    SurfaceUnavailable { width: u32, height: u32 },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Elements the static pass paints, in scene order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderableElements {
    elements: HashSet<ElementId>,
    visible_elements: Vec<ElementId>,
}

impl RenderableElements {
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains(id)
    }

    pub fn visible_elements(&self) -> &[ElementId] {
        &self.visible_elements
    }

    pub fn len(&self) -> usize {
        self.visible_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_elements.is_empty()
    }
}

/// Projects the scene into the elements the static pass should paint.
///
/// The result is memoized on the new-element id alone. Scene changes are not
/// observed: callers must [`clear`](Self::clear) whenever the scene mutates.
#[derive(Debug, Default)]
pub struct Renderer {
    memo: Option<(Option<ElementId>, Rc<RenderableElements>)>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-deleted elements minus the one being drawn.
    pub fn get_renderable_elements(&mut self, scene: &Scene, new_element: Option<&ElementId>) -> Rc<RenderableElements> {
        match &self.memo {
            Some((key, result)) if key.as_ref() == new_element => return Rc::clone(result),
            _ => {}
        }

        let mut renderable = RenderableElements::default();
        for element in scene.get_non_deleted_elements() {
            let id = element.id();
            if Some(id) == new_element {
                continue;
            }
            renderable.elements.insert(id.clone());
            renderable.visible_elements.push(id.clone());
        }
        log::trace!("Projected {} renderable elements", renderable.len());

        let result = Rc::new(renderable);
        self.memo = Some((new_element.cloned(), Rc::clone(&result)));
        result
    }

    /// Forget the memoized projection.
    pub fn clear(&mut self) {
        self.memo = None;
    }

    pub fn destroy(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swelldraw_core::{ElementUpdate, Environment, NewElement};

    fn scene() -> Scene {
        let mut scene = Scene::with_environment(Environment::deterministic(11));
        for id in ["a", "b", "c"] {
            let element = NewElement::new(ElementType::Rectangle, 0.0, 0.0)
                .with_id(id)
                .with_size(10.0, 10.0)
                .build(scene.environment_mut());
            scene.insert_element(element).unwrap();
        }
        scene
    }

    fn ids(renderable: &RenderableElements) -> Vec<&str> {
        renderable.visible_elements().iter().map(ElementId::as_str).collect()
    }

    #[test]
    fn test_new_element_is_excluded() {
        let scene = scene();
        let mut renderer = Renderer::new();
        let renderable = renderer.get_renderable_elements(&scene, Some(&"b".into()));
        assert_eq!(ids(&renderable), vec!["a", "c"]);
        assert!(!renderable.contains(&"b".into()));
    }

    #[test]
    fn test_projection_is_memoized_on_new_element() {
        let mut scene = scene();
        let mut renderer = Renderer::new();
        let first = renderer.get_renderable_elements(&scene, None);
        let second = renderer.get_renderable_elements(&scene, None);
        assert!(Rc::ptr_eq(&first, &second));

        scene
            .mutate_element(&"a".into(), ElementUpdate::new().with_deleted(true), &mut ())
            .unwrap();
        let stale = renderer.get_renderable_elements(&scene, None);
        assert_eq!(stale.len(), 3);

        renderer.clear();
        let fresh = renderer.get_renderable_elements(&scene, None);
        assert_eq!(ids(&fresh), vec!["b", "c"]);
    }

    #[test]
    fn test_changing_new_element_recomputes() {
        let scene = scene();
        let mut renderer = Renderer::new();
        let all = renderer.get_renderable_elements(&scene, None);
        let without_c = renderer.get_renderable_elements(&scene, Some(&"c".into()));
        assert!(!Rc::ptr_eq(&all, &without_c));
        assert_eq!(ids(&without_c), vec!["a", "b"]);
    }
}
