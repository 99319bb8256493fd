//! Interactive pass: only the element under construction.

use crate::element::{ElementCanvasCache, render_element};
use crate::helpers::{bootstrap_canvas, get_normalized_canvas_dimensions};
use crate::renderer::RenderError;
use crate::surface::{Surface, SurfaceFactory};
use swelldraw_core::{AppState, Scene, ShapeCache};

pub struct NewElementSceneRenderConfig<'a, F: SurfaceFactory> {
    pub scene: &'a Scene,
    pub shapes: &'a mut ShapeCache<ElementCanvasCache<F::Surface>>,
    pub factory: &'a F,
    pub app_state: &'a AppState,
    pub scale: f64,
}

/// Clear the interactive canvas and draw `app_state.new_element`, if any.
/// Selection marquees are left to the interaction layer.
pub fn render_new_element_scene<F: SurfaceFactory>(
    canvas: &mut F::Surface,
    config: NewElementSceneRenderConfig<'_, F>,
) -> Result<(), RenderError> {
    let NewElementSceneRenderConfig {
        scene,
        shapes,
        factory,
        app_state,
        scale,
    } = config;

    let (normalized_width, normalized_height) = get_normalized_canvas_dimensions(canvas, scale);
    bootstrap_canvas(canvas, scale, normalized_width, normalized_height);

    let zoom = app_state.zoom.value();
    canvas.scale(zoom, zoom);

    let Some(id) = &app_state.new_element else {
        return Ok(());
    };
    let Some(element) = scene.get_non_deleted_element(id) else {
        log::trace!("New element {} is not in the scene", id);
        return Ok(());
    };
    if element.element_type().is_selection() {
        return Ok(());
    }
    render_element(&element, shapes, factory, canvas, app_state, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, RecordingFactory, RecordingSurface};
    use swelldraw_core::{ElementType, Environment, NewElement};

    fn render(scene: &Scene, app_state: &AppState) -> RecordingSurface {
        let factory = RecordingFactory::default();
        let mut shapes = ShapeCache::default();
        let mut canvas = RecordingSurface::new(200, 200);
        render_new_element_scene(
            &mut canvas,
            NewElementSceneRenderConfig {
                scene,
                shapes: &mut shapes,
                factory: &factory,
                app_state,
                scale: 1.0,
            },
        )
        .unwrap();
        canvas
    }

    fn scene_with(element_type: ElementType) -> Scene {
        let mut scene = Scene::with_environment(Environment::deterministic(8));
        let element = NewElement::new(element_type, 10.0, 10.0)
            .with_id("new")
            .with_size(40.0, 40.0)
            .build(scene.environment_mut());
        scene.insert_element(element).unwrap();
        scene
    }

    #[test]
    fn test_draws_only_new_element() {
        let scene = scene_with(ElementType::Ellipse);
        let mut app_state = AppState::new(200.0, 200.0);
        app_state.new_element = Some("new".into());
        let canvas = render(&scene, &app_state);
        assert_eq!(canvas.composites().count(), 1);
        assert!(matches!(canvas.commands()[0], DrawCommand::Clear { .. }));
    }

    #[test]
    fn test_without_new_element_only_clears() {
        let scene = scene_with(ElementType::Ellipse);
        let canvas = render(&scene, &AppState::new(200.0, 200.0));
        assert!(matches!(canvas.commands(), [DrawCommand::Clear { .. }]));
    }

    #[test]
    fn test_selection_marquee_is_skipped() {
        let scene = scene_with(ElementType::Selection);
        let mut app_state = AppState::new(200.0, 200.0);
        app_state.new_element = Some("new".into());
        let canvas = render(&scene, &app_state);
        assert_eq!(canvas.composites().count(), 0);
    }
}
