//! Static pass: background grid and every finished element.

use crate::element::{ElementCanvasCache, render_element};
use crate::helpers::{bootstrap_canvas, get_normalized_canvas_dimensions};
use crate::renderer::{RenderError, RenderableElements};
use crate::surface::{Surface, SurfaceFactory};
use kurbo::{BezPath, Point};
use peniko::Color;
use swelldraw_core::{AppState, Scene, ShapeCache};

const GRID_LINE_COLOR: Color = Color::from_rgba8(0xe5, 0xe5, 0xe5, 0xff);
const GRID_BOLD_LINE_COLOR: Color = Color::from_rgba8(0xdd, 0xdd, 0xdd, 0xff);
/// Below this on-screen grid size only bold lines are drawn.
const MIN_REGULAR_GRID_SIZE: f64 = 10.0;

/// Everything the static pass reads.
pub struct StaticSceneRenderConfig<'a, F: SurfaceFactory> {
    pub scene: &'a Scene,
    pub renderable: &'a RenderableElements,
    pub shapes: &'a mut ShapeCache<ElementCanvasCache<F::Surface>>,
    pub factory: &'a F,
    pub app_state: &'a AppState,
    /// Device pixel ratio.
    pub scale: f64,
}

/// Round half up, as JavaScript's `Math.round` does.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn is_bold_line(position: f64, scroll: f64, grid_size: f64, grid_step: u32) -> bool {
    grid_step > 1 && round_half_up(position - scroll) % (grid_step as f64 * grid_size) == 0.0
}

fn stroke_grid_line<S: Surface>(surface: &mut S, from: Point, to: Point, bold: bool, zoom: f64) {
    let line_width = (1.0 / zoom).min(if bold { 4.0 } else { 1.0 });
    let space_width = 1.0 / zoom;

    surface.save();
    if bold {
        surface.set_line_dash(&[]);
    } else {
        surface.set_line_dash(&[line_width * 3.0, space_width + (line_width + space_width)]);
    }
    let mut path = BezPath::new();
    path.move_to(from);
    path.line_to(to);
    let color = if bold { GRID_BOLD_LINE_COLOR } else { GRID_LINE_COLOR };
    surface.stroke_path(&path, color, line_width);
    surface.restore();
}

/// Stroke the background grid over a `width` x `height` area in scene
/// units. Every `grid_step`-th line is bold; regular lines are skipped once
/// the on-screen grid gets too dense.
#[allow(clippy::too_many_arguments)]
pub fn stroke_grid<S: Surface>(
    surface: &mut S,
    grid_size: f64,
    grid_step: u32,
    scroll_x: f64,
    scroll_y: f64,
    zoom: f64,
    width: f64,
    height: f64,
) {
    if grid_size.is_nan() || grid_size <= 0.0 || !width.is_finite() || !height.is_finite() {
        return;
    }
    let offset_x = (scroll_x % grid_size) - grid_size;
    let offset_y = (scroll_y % grid_size) - grid_size;
    let actual_grid_size = grid_size * zoom;

    surface.save();

    // Align 1px lines to the pixel grid.
    if zoom == 1.0 {
        let nudge = |offset: f64| if offset % 1.0 != 0.0 { 0.0 } else { 0.5 };
        surface.translate(nudge(offset_x), nudge(offset_y));
    }

    let mut x = offset_x;
    while x < offset_x + width + grid_size * 2.0 {
        let bold = is_bold_line(x, scroll_x, grid_size, grid_step);
        if bold || actual_grid_size >= MIN_REGULAR_GRID_SIZE {
            let bottom = (offset_y + height + grid_size * 2.0).ceil();
            stroke_grid_line(
                surface,
                Point::new(x, offset_y - grid_size),
                Point::new(x, bottom),
                bold,
                zoom,
            );
        }
        x += grid_size;
    }

    let mut y = offset_y;
    while y < offset_y + height + grid_size * 2.0 {
        let bold = is_bold_line(y, scroll_y, grid_size, grid_step);
        if bold || actual_grid_size >= MIN_REGULAR_GRID_SIZE {
            let right = (offset_x + width + grid_size * 2.0).ceil();
            stroke_grid_line(
                surface,
                Point::new(offset_x - grid_size, y),
                Point::new(right, y),
                bold,
                zoom,
            );
        }
        y += grid_size;
    }

    surface.restore();
}

/// Clear the canvas, then paint the grid and every renderable element.
/// The first element that fails to render aborts the pass.
pub fn render_static_scene<F: SurfaceFactory>(
    canvas: &mut F::Surface,
    config: StaticSceneRenderConfig<'_, F>,
) -> Result<(), RenderError> {
    let StaticSceneRenderConfig {
        scene,
        renderable,
        shapes,
        factory,
        app_state,
        scale,
    } = config;

    let (normalized_width, normalized_height) = get_normalized_canvas_dimensions(canvas, scale);
    bootstrap_canvas(canvas, scale, normalized_width, normalized_height);

    let zoom = app_state.zoom.value();
    canvas.scale(zoom, zoom);

    stroke_grid(
        canvas,
        app_state.grid_size,
        app_state.grid_step,
        app_state.scroll_x,
        app_state.scroll_y,
        zoom,
        normalized_width / zoom,
        normalized_height / zoom,
    );

    for id in renderable.visible_elements() {
        let Some(element) = scene.get_non_deleted_element(id) else {
            continue;
        };
        render_element(&element, shapes, factory, canvas, app_state, scale)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, RecordingFactory, RecordingSurface};
    use crate::renderer::Renderer;
    use kurbo::PathEl;
    use swelldraw_core::{ElementType, Environment, NewElement, NormalizedZoom};

    fn stroke_lines(surface: &RecordingSurface) -> Vec<(Point, Point, f64, Color, Vec<f64>)> {
        surface
            .strokes()
            .filter_map(|cmd| match cmd {
                DrawCommand::Stroke {
                    path,
                    color,
                    width,
                    dash,
                    ..
                } => {
                    let points: Vec<Point> = path
                        .elements()
                        .iter()
                        .filter_map(|el| match el {
                            PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(*p),
                            _ => None,
                        })
                        .collect();
                    Some((points[0], points[1], *width, *color, dash.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_grid_lines_and_bold_every_step() {
        let mut surface = RecordingSurface::new(100, 100);
        stroke_grid(&mut surface, 20.0, 5, 0.0, 0.0, 1.0, 100.0, 100.0);
        let lines = stroke_lines(&surface);

        let vertical: Vec<_> = lines.iter().filter(|(a, b, ..)| a.x == b.x).collect();
        // x from -20 while x < 120.
        assert_eq!(vertical.len(), 7);
        assert_eq!(vertical[0].0, Point::new(-20.0, -40.0));
        assert_eq!(vertical[0].1, Point::new(-20.0, 120.0));

        let bold: Vec<f64> = vertical
            .iter()
            .filter(|(.., color, _)| *color == GRID_BOLD_LINE_COLOR)
            .map(|(a, ..)| a.x)
            .collect();
        assert_eq!(bold, vec![0.0, 100.0]);
        for (_, _, width, color, dash) in &lines {
            assert_eq!(*width, 1.0);
            if *color == GRID_BOLD_LINE_COLOR {
                assert!(dash.is_empty());
            } else {
                assert_eq!(dash, &vec![3.0, 3.0]);
            }
        }
    }

    #[test]
    fn test_grid_pixel_alignment_at_zoom_one() {
        let mut surface = RecordingSurface::new(100, 100);
        stroke_grid(&mut surface, 20.0, 5, 0.0, 0.0, 1.0, 40.0, 40.0);
        match surface.strokes().next() {
            Some(DrawCommand::Stroke { transform, .. }) => {
                assert_eq!(*transform * Point::ZERO, Point::new(0.5, 0.5));
            }
            other => panic!("expected stroke, got {other:?}"),
        }

        let mut fractional = RecordingSurface::new(100, 100);
        stroke_grid(&mut fractional, 20.0, 5, 0.5, 0.0, 1.0, 40.0, 40.0);
        match fractional.strokes().next() {
            Some(DrawCommand::Stroke { transform, .. }) => {
                assert_eq!(*transform * Point::ZERO, Point::new(0.0, 0.5));
            }
            other => panic!("expected stroke, got {other:?}"),
        }
    }

    #[test]
    fn test_dense_grid_draws_only_bold_lines() {
        let mut surface = RecordingSurface::new(100, 100);
        stroke_grid(&mut surface, 20.0, 5, 0.0, 0.0, 0.25, 400.0, 400.0);
        let lines = stroke_lines(&surface);
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|(.., color, _)| *color == GRID_BOLD_LINE_COLOR));
    }

    #[test]
    fn test_static_scene_paints_grid_then_elements() {
        let mut scene = Scene::with_environment(Environment::deterministic(9));
        for (id, x) in [("a", 0.0), ("b", 50.0)] {
            let element = NewElement::new(ElementType::Diamond, x, 0.0)
                .with_id(id)
                .with_size(30.0, 30.0)
                .build(scene.environment_mut());
            scene.insert_element(element).unwrap();
        }
        let mut renderer = Renderer::new();
        let renderable = renderer.get_renderable_elements(&scene, Some(&"b".into()));
        let factory = RecordingFactory::default();
        let mut shapes = ShapeCache::default();
        let mut app_state = AppState::new(200.0, 100.0);
        app_state.zoom = NormalizedZoom::new(2.0);
        let mut canvas = RecordingSurface::new(400, 200);
        canvas.stroke_path(&BezPath::new(), Color::from_rgba8(0, 0, 0, 255), 1.0);

        render_static_scene(
            &mut canvas,
            StaticSceneRenderConfig {
                scene: &scene,
                renderable: &renderable,
                shapes: &mut shapes,
                factory: &factory,
                app_state: &app_state,
                scale: 2.0,
            },
        )
        .unwrap();

        let commands = canvas.commands();
        assert!(matches!(commands[0], DrawCommand::Clear { .. }));
        assert!(matches!(commands.last(), Some(DrawCommand::DrawSurface { .. })));
        assert_eq!(canvas.composites().count(), 1);
        assert_eq!(factory.created(), 1);
        assert!(shapes.get(&"b".into()).is_none());
    }

    #[test]
    fn test_selection_marquee_is_not_painted() {
        let mut scene = Scene::with_environment(Environment::deterministic(3));
        let marquee = NewElement::new(ElementType::Selection, 0.0, 0.0)
            .with_id("marquee")
            .with_size(30.0, 30.0)
            .build(scene.environment_mut());
        scene.insert_element(marquee).unwrap();
        let mut renderer = Renderer::new();
        let renderable = renderer.get_renderable_elements(&scene, None);
        let factory = RecordingFactory::default();
        let mut shapes = ShapeCache::default();
        let app_state = AppState::new(100.0, 100.0);
        let mut canvas = RecordingSurface::new(100, 100);

        let result = render_static_scene(
            &mut canvas,
            StaticSceneRenderConfig {
                scene: &scene,
                renderable: &renderable,
                shapes: &mut shapes,
                factory: &factory,
                app_state: &app_state,
                scale: 1.0,
            },
        );
        assert!(result.is_ok());
        assert_eq!(canvas.composites().count(), 0);
        assert!(shapes.is_empty());
    }
}
