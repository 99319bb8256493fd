//! Vello surface backend.
//!
//! Each surface builds a `vello::Scene` in device space. Draw calls are also
//! kept as resolved ops so a surface can be composited into another with a
//! global alpha applied to its colours.

use crate::surface::{StateStack, Surface, SurfaceFactory};
use kurbo::{Affine, BezPath, Cap, Join, Rect, Stroke, Vec2};
use peniko::{Color, Fill};
use swelldraw_core::color::with_opacity;
use vello::Scene;

#[derive(Debug, Clone)]
enum VelloOp {
    Fill {
        path: BezPath,
        transform: Affine,
        color: Color,
    },
    Stroke {
        path: BezPath,
        transform: Affine,
        color: Color,
        stroke: Stroke,
    },
}

impl VelloOp {
    fn encode(&self, scene: &mut Scene) {
        match self {
            VelloOp::Fill { path, transform, color } => {
                scene.fill(Fill::NonZero, *transform, *color, None, path);
            }
            VelloOp::Stroke {
                path,
                transform,
                color,
                stroke,
            } => {
                scene.stroke(stroke, *transform, *color, None, path);
            }
        }
    }

    fn composited(&self, outer: Affine, alpha: f64) -> Self {
        match self {
            VelloOp::Fill { path, transform, color } => VelloOp::Fill {
                path: path.clone(),
                transform: outer * *transform,
                color: with_opacity(*color, alpha),
            },
            VelloOp::Stroke {
                path,
                transform,
                color,
                stroke,
            } => VelloOp::Stroke {
                path: path.clone(),
                transform: outer * *transform,
                color: with_opacity(*color, alpha),
                stroke: stroke.clone(),
            },
        }
    }
}

/// A surface backed by a vello scene.
pub struct VelloSurface {
    width: u32,
    height: u32,
    state: StateStack,
    scene: Scene,
    ops: Vec<VelloOp>,
}

impl VelloSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: StateStack::default(),
            scene: Scene::new(),
            ops: Vec::new(),
        }
    }

    /// The encoded scene, ready to hand to a `vello::Renderer`.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    fn reset(&mut self) {
        self.scene.reset();
        self.ops.clear();
    }

    fn push(&mut self, op: VelloOp) {
        op.encode(&mut self.scene);
        self.ops.push(op);
    }
}

impl Surface for VelloSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.state.reset();
        self.reset();
    }

    fn state(&self) -> &StateStack {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StateStack {
        &mut self.state
    }

    fn clear_rect(&mut self, rect: Rect) {
        let device = self.transform().transform_rect_bbox(rect);
        if device.contains_rect(self.bounds()) {
            self.reset();
        } else {
            // Scenes are append-only; partial clears only happen on full
            // repaints, which start with a full clear anyway.
            log::trace!("Ignoring partial clear {:?}", device);
        }
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64) {
        let current = self.state.current();
        let mut stroke = Stroke::new(width).with_caps(Cap::Round).with_join(Join::Round);
        if !current.line_dash.is_empty() {
            stroke = stroke.with_dashes(0.0, current.line_dash.iter().copied());
        }
        let op = VelloOp::Stroke {
            path: path.clone(),
            transform: current.transform,
            color: with_opacity(color, current.global_alpha),
            stroke,
        };
        self.push(op);
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        let current = self.state.current();
        let op = VelloOp::Fill {
            path: path.clone(),
            transform: current.transform,
            color: with_opacity(color, current.global_alpha),
        };
        self.push(op);
    }

    fn draw_surface(&mut self, source: &Self, dest: Rect) {
        if source.width == 0 || source.height == 0 {
            return;
        }
        let placement = self.transform()
            * Affine::translate(Vec2::new(dest.x0, dest.y0))
            * Affine::scale_non_uniform(
                dest.width() / source.width as f64,
                dest.height() / source.height as f64,
            );
        let alpha = self.state.current().global_alpha;

        if alpha >= 1.0 {
            self.scene.append(&source.scene, Some(placement));
            self.ops.extend(source.ops.iter().map(|op| op.composited(placement, 1.0)));
        } else {
            for op in &source.ops {
                self.push(op.composited(placement, alpha));
            }
        }
    }
}

/// Creates [`VelloSurface`]s within the GPU texture size limit.
#[derive(Debug, Clone, Copy)]
pub struct VelloSurfaceFactory {
    pub max_dimension: u32,
}

impl Default for VelloSurfaceFactory {
    fn default() -> Self {
        Self {
            max_dimension: crate::element::WIDTH_HEIGHT_LIMIT as u32,
        }
    }
}

impl SurfaceFactory for VelloSurfaceFactory {
    type Surface = VelloSurface;

    fn create_surface(&self, width: u32, height: u32) -> Option<VelloSurface> {
        if width == 0 || height == 0 || width > self.max_dimension || height > self.max_dimension {
            log::warn!("Refusing {}x{} vello surface", width, height);
            return None;
        }
        Some(VelloSurface::new(width, height))
    }
}
