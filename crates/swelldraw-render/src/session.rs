//! A drawing session: one document's scene, caches and render passes.
//!
//! The session owns everything with a lifecycle: the [`Scene`], the shape
//! cache and the element canvases derived from it, the renderable-elements
//! projector, the two render throttles, the [`AppState`] and the static and
//! interactive canvases. The host feeds it pointer events and calls
//! [`DrawingSession::on_animation_frame`] once per display frame.

use crate::element::ElementCanvasCache;
use crate::new_element_scene::{NewElementSceneRenderConfig, render_new_element_scene};
use crate::renderer::{RenderError, RenderResult, Renderer};
use crate::static_scene::{StaticSceneRenderConfig, render_static_scene};
use crate::surface::{Surface, SurfaceFactory};
use crate::throttle::FrameThrottle;
use kurbo::{Point, Vec2};
use std::cell::Cell;
use std::rc::Rc;
use swelldraw_core::{
    AppState, DragNewElement, Element, ElementId, ElementType, ElementUpdate, Environment, NewElement,
    OpaqueFieldPolicy, Scene, SceneError, ShapeCache, Subscription, ToolType, drag_new_element,
    viewport_coords_to_scene_coords,
};

/// Session-wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub device_pixel_ratio: f64,
    /// Throttled renders always paint the latest request.
    pub trailing: bool,
    pub policy: OpaqueFieldPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            trailing: true,
            policy: OpaqueFieldPolicy::default(),
        }
    }
}

/// Arguments captured when a render is requested.
#[derive(Debug, Clone, PartialEq)]
struct FrameArgs {
    app_state: AppState,
    scale: f64,
}

/// Which passes painted during a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub static_scene: bool,
    pub new_element_scene: bool,
}

pub struct DrawingSession<F: SurfaceFactory> {
    scene: Scene,
    shapes: ShapeCache<ElementCanvasCache<F::Surface>>,
    renderer: Renderer,
    factory: F,
    app_state: AppState,
    config: SessionConfig,
    static_canvas: F::Surface,
    interactive_canvas: F::Surface,
    static_throttle: FrameThrottle<FrameArgs>,
    new_element_throttle: FrameThrottle<FrameArgs>,
    scene_changed: Rc<Cell<bool>>,
    subscription: Option<Subscription>,
    drag_origin: Option<Point>,
}

fn device_size(app_state: &AppState, device_pixel_ratio: f64) -> (u32, u32) {
    let size = |css: f64| (css * device_pixel_ratio).floor().max(1.0) as u32;
    (size(app_state.width), size(app_state.height))
}

fn create_canvas<F: SurfaceFactory>(factory: &F, (width, height): (u32, u32)) -> RenderResult<F::Surface> {
    factory
        .create_surface(width, height)
        .ok_or(RenderError::SurfaceUnavailable { width, height })
}

impl<F: SurfaceFactory> DrawingSession<F> {
    pub fn new(factory: F, app_state: AppState, config: SessionConfig) -> RenderResult<Self> {
        Self::with_scene(factory, Scene::new(), app_state, config)
    }

    /// Start a session over an existing scene.
    pub fn with_scene(factory: F, scene: Scene, app_state: AppState, config: SessionConfig) -> RenderResult<Self> {
        let mut scene = scene.with_policy(config.policy);
        let size = device_size(&app_state, config.device_pixel_ratio);
        let static_canvas = create_canvas(&factory, size)?;
        let interactive_canvas = create_canvas(&factory, size)?;

        let scene_changed = Rc::new(Cell::new(true));
        let flag = Rc::clone(&scene_changed);
        let subscription = scene.on_update(Rc::new(move || flag.set(true)))?;

        log::debug!(
            "Started drawing session {}x{} at dpr {}",
            size.0,
            size.1,
            config.device_pixel_ratio
        );
        Ok(Self {
            scene,
            shapes: ShapeCache::default(),
            renderer: Renderer::new(),
            factory,
            app_state,
            config,
            static_canvas,
            interactive_canvas,
            static_throttle: FrameThrottle::new(config.trailing),
            new_element_throttle: FrameThrottle::new(config.trailing),
            scene_changed,
            subscription: Some(subscription),
            drag_origin: None,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        self.scene.environment_mut()
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    pub fn shapes(&self) -> &ShapeCache<ElementCanvasCache<F::Surface>> {
        &self.shapes
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn static_canvas(&self) -> &F::Surface {
        &self.static_canvas
    }

    pub fn interactive_canvas(&self) -> &F::Surface {
        &self.interactive_canvas
    }

    pub fn set_active_tool(&mut self, tool: ToolType) {
        self.app_state.active_tool = tool;
    }

    /// Scroll by a delta in viewport pixels.
    pub fn scroll_by(&mut self, delta: Vec2) {
        self.app_state.pan(delta);
        self.request_full_render();
    }

    pub fn zoom_at(&mut self, viewport_point: Point, factor: f64) {
        self.app_state.zoom_at(viewport_point, factor);
        self.request_full_render();
    }

    /// Resize the viewport (CSS pixels). Both canvases are reallocated.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.app_state.width = width;
        self.app_state.height = height;
        let (w, h) = device_size(&self.app_state, self.config.device_pixel_ratio);
        self.static_canvas.set_size(w, h);
        self.interactive_canvas.set_size(w, h);
        self.request_full_render();
    }

    pub fn insert_element(&mut self, element: Element) -> RenderResult<()> {
        self.scene.insert_element(element)?;
        self.request_static_render();
        Ok(())
    }

    /// Swap in a new element list. Every cached shape and canvas is dropped.
    pub fn replace_all_elements(&mut self, elements: Vec<Element>) -> RenderResult<()> {
        self.scene.replace_all_elements(elements)?;
        self.shapes.destroy();
        self.request_static_render();
        Ok(())
    }

    /// Pointer down at a client position. Shape tools start a new element;
    /// the selection tool creates nothing.
    pub fn pointer_down(&mut self, client: Point) -> RenderResult<Option<ElementId>> {
        let origin = viewport_coords_to_scene_coords(client, &self.app_state);
        match self.app_state.active_tool.element_type() {
            ElementType::Selection => Ok(None),
            element_type => self.create_generic_element(element_type, origin).map(Some),
        }
    }

    pub fn pointer_move(&mut self, client: Point) -> RenderResult<bool> {
        let pointer = viewport_coords_to_scene_coords(client, &self.app_state);
        self.drag_new_element(pointer)
    }

    pub fn pointer_up(&mut self) -> RenderResult<Option<ElementId>> {
        self.finish_new_element()
    }

    /// Insert a zero-sized element at `origin` and make it the new element.
    pub fn create_generic_element(&mut self, element_type: ElementType, origin: Point) -> RenderResult<ElementId> {
        let element = NewElement::new(element_type, origin.x, origin.y).build(self.scene.environment_mut());
        let id = element.id().clone();
        self.scene.insert_element(element)?;

        log::debug!("Started new {} element {}", element_type, id);
        self.app_state.new_element = Some(id.clone());
        self.drag_origin = Some(origin);
        self.request_new_element_render();
        Ok(id)
    }

    /// Stretch the new element from the drag origin to `pointer` (scene
    /// coordinates). Returns whether the element changed.
    pub fn drag_new_element(&mut self, pointer: Point) -> RenderResult<bool> {
        let (Some(id), Some(origin)) = (self.app_state.new_element.clone(), self.drag_origin) else {
            return Ok(false);
        };
        let drag = DragNewElement::from_pointer(id, origin, pointer);
        let changed = drag_new_element(&mut self.scene, &mut self.shapes, &drag)?;
        if changed {
            self.request_new_element_render();
        }
        Ok(changed)
    }

    /// Finish the new element: normalize its geometry and hand it over to
    /// the static layer. Elements that never got an area are deleted.
    pub fn finish_new_element(&mut self) -> RenderResult<Option<ElementId>> {
        self.drag_origin = None;
        let Some(id) = self.app_state.new_element.take() else {
            return Ok(None);
        };
        let element = self
            .scene
            .get_element(&id)
            .ok_or_else(|| SceneError::UnknownElement(id.clone()))?;

        let updates = if element.width() == 0.0 || element.height() == 0.0 {
            log::debug!("Discarding empty element {}", id);
            ElementUpdate::new().with_deleted(true)
        } else if !element.has_normalized_dimensions() {
            let dims = element.normalized_dimensions();
            ElementUpdate::new()
                .with_position(dims.x, dims.y)
                .with_size(dims.width, dims.height)
        } else {
            ElementUpdate::new()
        };
        if !updates.is_empty() {
            self.scene.mutate_element(&id, updates, &mut self.shapes)?;
        }

        self.request_full_render();
        Ok(Some(id))
    }

    /// Apply `updates` to an element. Style fields the shape depends on
    /// evict its shape and canvas, since the mutation engine only evicts on
    /// resize. Returns whether the element changed.
    pub fn update_element_style(&mut self, id: &ElementId, updates: ElementUpdate) -> RenderResult<bool> {
        let touches_style = updates.touches_shape_style();
        let before = self
            .scene
            .get_element(id)
            .map(|element| element.version())
            .ok_or_else(|| SceneError::UnknownElement(id.clone()))?;

        let after = self.scene.mutate_element(id, updates, &mut self.shapes)?.version();
        let changed = after != before;
        if changed && touches_style {
            self.shapes.delete(id);
        }
        if changed {
            self.request_full_render();
        }
        Ok(changed)
    }

    fn frame_args(&self) -> FrameArgs {
        FrameArgs {
            app_state: self.app_state.clone(),
            scale: self.config.device_pixel_ratio,
        }
    }

    fn request_static_render(&mut self) {
        let args = self.frame_args();
        self.static_throttle.request(args);
    }

    fn request_new_element_render(&mut self) {
        let args = self.frame_args();
        self.new_element_throttle.request(args);
    }

    fn request_full_render(&mut self) {
        self.request_static_render();
        self.request_new_element_render();
    }

    /// Paint the static layer now, or on the next frame when `throttle`.
    pub fn render_static_scene(&mut self, throttle: bool) -> RenderResult<()> {
        if throttle {
            self.request_static_render();
            return Ok(());
        }
        let args = self.frame_args();
        self.paint_static(&args)
    }

    /// Paint the interactive layer now, or on the next frame when `throttle`.
    pub fn render_new_element_scene(&mut self, throttle: bool) -> RenderResult<()> {
        if throttle {
            self.request_new_element_render();
            return Ok(());
        }
        let args = self.frame_args();
        self.paint_new_element(&args)
    }

    /// Run whatever render is due this frame.
    pub fn on_animation_frame(&mut self) -> RenderResult<FrameReport> {
        let mut report = FrameReport::default();
        if let Some(args) = self.static_throttle.take_frame() {
            self.paint_static(&args)?;
            report.static_scene = true;
        }
        if let Some(args) = self.new_element_throttle.take_frame() {
            self.paint_new_element(&args)?;
            report.new_element_scene = true;
        }
        Ok(report)
    }

    /// Paint pending renders immediately instead of waiting for a frame.
    pub fn flush(&mut self) -> RenderResult<FrameReport> {
        let mut report = FrameReport::default();
        if let Some(args) = self.static_throttle.flush() {
            self.paint_static(&args)?;
            report.static_scene = true;
        }
        if let Some(args) = self.new_element_throttle.flush() {
            self.paint_new_element(&args)?;
            report.new_element_scene = true;
        }
        log::trace!("Flushed renders: {:?}", report);
        Ok(report)
    }

    pub fn has_pending_frame(&self) -> bool {
        self.static_throttle.is_pending() || self.new_element_throttle.is_pending()
    }

    fn paint_static(&mut self, args: &FrameArgs) -> RenderResult<()> {
        if self.scene_changed.replace(false) {
            self.renderer.clear();
        }
        let renderable = self
            .renderer
            .get_renderable_elements(&self.scene, args.app_state.new_element.as_ref());
        render_static_scene(
            &mut self.static_canvas,
            StaticSceneRenderConfig {
                scene: &self.scene,
                renderable: &renderable,
                shapes: &mut self.shapes,
                factory: &self.factory,
                app_state: &args.app_state,
                scale: args.scale,
            },
        )
    }

    fn paint_new_element(&mut self, args: &FrameArgs) -> RenderResult<()> {
        render_new_element_scene(
            &mut self.interactive_canvas,
            NewElementSceneRenderConfig {
                scene: &self.scene,
                shapes: &mut self.shapes,
                factory: &self.factory,
                app_state: &args.app_state,
                scale: args.scale,
            },
        )
    }

    /// Drop pending renders, caches, subscriptions and every element.
    pub fn destroy(&mut self) {
        self.static_throttle.cancel();
        self.new_element_throttle.cancel();
        if let Some(subscription) = self.subscription.take() {
            if let Err(err) = self.scene.unsubscribe(&subscription) {
                log::warn!("Session subscription already removed: {}", err);
            }
        }
        self.renderer.destroy();
        self.shapes.destroy();
        self.scene.destroy();
        self.app_state.new_element = None;
        self.drag_origin = None;
        log::debug!("Destroyed drawing session");
    }
}
