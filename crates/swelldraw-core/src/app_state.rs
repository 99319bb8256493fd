//! Viewport, zoom and tool state consumed by rendering and interaction.

use crate::element::{ElementId, ElementType};
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 30.0;
pub const DEFAULT_GRID_SIZE: f64 = 20.0;
pub const DEFAULT_GRID_STEP: u32 = 5;

/// A zoom factor known to lie in `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct NormalizedZoom(f64);

impl NormalizedZoom {
    /// Clamp `value` into range. Non-finite values become 1.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(MIN_ZOOM, MAX_ZOOM))
        } else {
            Self(1.0)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for NormalizedZoom {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f64> for NormalizedZoom {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<NormalizedZoom> for f64 {
    fn from(value: NormalizedZoom) -> Self {
        value.0
    }
}

/// Tool selected in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    #[default]
    Selection,
    Rectangle,
    Diamond,
    Ellipse,
}

impl ToolType {
    /// The element type this tool creates on pointer down.
    pub fn element_type(self) -> ElementType {
        match self {
            ToolType::Selection => ElementType::Selection,
            ToolType::Rectangle => ElementType::Rectangle,
            ToolType::Diamond => ElementType::Diamond,
            ToolType::Ellipse => ElementType::Ellipse,
        }
    }
}

/// Application state read by the render passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Viewport size in CSS pixels.
    pub width: f64,
    pub height: f64,
    /// Canvas position within the page.
    pub offset_left: f64,
    pub offset_top: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub zoom: NormalizedZoom,
    pub grid_size: f64,
    pub grid_step: u32,
    pub active_tool: ToolType,
    /// Element currently being drawn, excluded from the static pass.
    pub new_element: Option<ElementId>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            offset_left: 0.0,
            offset_top: 0.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            zoom: NormalizedZoom::default(),
            grid_size: DEFAULT_GRID_SIZE,
            grid_step: DEFAULT_GRID_STEP,
            active_tool: ToolType::default(),
            new_element: None,
        }
    }
}

impl AppState {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Scene to viewport transform.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom.value()) * Affine::translate(Vec2::new(self.scroll_x, self.scroll_y))
    }

    pub fn scene_to_viewport(&self, point: Point) -> Point {
        self.transform() * point
    }

    /// Scroll by a delta in viewport pixels.
    pub fn pan(&mut self, delta: Vec2) {
        let zoom = self.zoom.value();
        self.scroll_x += delta.x / zoom;
        self.scroll_y += delta.y / zoom;
    }

    /// Zoom by `factor`, keeping the viewport point under the cursor fixed.
    pub fn zoom_at(&mut self, viewport_point: Point, factor: f64) {
        let new_zoom = NormalizedZoom::new(self.zoom.value() * factor);
        if (new_zoom.value() - self.zoom.value()).abs() < f64::EPSILON {
            return;
        }
        let local = Point::new(viewport_point.x - self.offset_left, viewport_point.y - self.offset_top);
        let anchor = viewport_coords_to_scene_coords(viewport_point, self);

        self.zoom = new_zoom;
        self.scroll_x = local.x / new_zoom.value() - anchor.x;
        self.scroll_y = local.y / new_zoom.value() - anchor.y;
    }
}

/// Convert a client (page) position to scene coordinates.
pub fn viewport_coords_to_scene_coords(client: Point, state: &AppState) -> Point {
    let zoom = state.zoom.value();
    Point::new(
        (client.x - state.offset_left) / zoom - state.scroll_x,
        (client.y - state.offset_top) / zoom - state.scroll_y,
    )
}
