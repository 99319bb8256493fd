//! Display-list surface backend.
//!
//! Records every draw call with its resolved device transform. Used for
//! headless sessions and for asserting what the passes paint.

use crate::surface::{StateStack, Surface, SurfaceFactory};
use kurbo::{Affine, BezPath, Rect};
use peniko::Color;
use std::cell::Cell;
use swelldraw_core::color::with_opacity;

/// One recorded draw call. Colours already carry the global alpha.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        rect: Rect,
        transform: Affine,
    },
    Stroke {
        path: BezPath,
        transform: Affine,
        color: Color,
        width: f64,
        dash: Vec<f64>,
    },
    Fill {
        path: BezPath,
        transform: Affine,
        color: Color,
    },
    DrawSurface {
        /// Source surface size in device pixels.
        source_size: (u32, u32),
        source_commands: usize,
        dest: Rect,
        transform: Affine,
        alpha: f64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    state: StateStack,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn strokes(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Stroke { .. }))
    }

    pub fn composites(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::DrawSurface { .. }))
    }

    fn alpha(&self) -> f64 {
        self.state.current().global_alpha
    }
}

impl Surface for RecordingSurface {
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
        self.commands.clear();
    }

    fn state(&self) -> &StateStack {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StateStack {
        &mut self.state
    }

    fn clear_rect(&mut self, rect: Rect) {
        let transform = self.transform();
        let device = transform.transform_rect_bbox(rect);
        if device.contains_rect(self.bounds()) {
            // Everything underneath is gone.
            self.commands.clear();
        }
        self.commands.push(DrawCommand::Clear { rect, transform });
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64) {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            transform: self.transform(),
            color: with_opacity(color, self.alpha()),
            width,
            dash: self.state.current().line_dash.clone(),
        });
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.commands.push(DrawCommand::Fill {
            path: path.clone(),
            transform: self.transform(),
            color: with_opacity(color, self.alpha()),
        });
    }

    fn draw_surface(&mut self, source: &Self, dest: Rect) {
        self.commands.push(DrawCommand::DrawSurface {
            source_size: (source.width, source.height),
            source_commands: source.commands.len(),
            dest,
            transform: self.transform(),
            alpha: self.alpha(),
        });
    }
}

/// Creates [`RecordingSurface`]s up to a maximum side length.
#[derive(Debug)]
pub struct RecordingFactory {
    max_dimension: u32,
    created: Cell<usize>,
}

impl RecordingFactory {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            created: Cell::new(0),
        }
    }

    /// Number of surfaces handed out so far.
    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl Default for RecordingFactory {
    fn default() -> Self {
        Self::new(crate::element::WIDTH_HEIGHT_LIMIT as u32)
    }
}

impl SurfaceFactory for RecordingFactory {
    type Surface = RecordingSurface;

    fn create_surface(&self, width: u32, height: u32) -> Option<RecordingSurface> {
        if width == 0 || height == 0 || width > self.max_dimension || height > self.max_dimension {
            log::warn!("Refusing {}x{} surface", width, height);
            return None;
        }
        self.created.set(self.created.get() + 1);
        Some(RecordingSurface::new(width, height))
    }
}
