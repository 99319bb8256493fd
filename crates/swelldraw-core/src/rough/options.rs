//! Options controlling hand-drawn shape generation.

use crate::element::FillStyle;
use peniko::Color;

/// Rough generation options.
///
/// Negative `fill_weight` and `hachure_gap` mean "derive from the stroke
/// width" (half of it and four times it respectively).
#[derive(Debug, Clone, PartialEq)]
pub struct RoughOptions {
    /// Seeds the jitter. Zero is treated as one.
    pub seed: u32,
    pub roughness: f64,
    pub bowing: f64,
    pub max_randomness_offset: f64,
    pub stroke: Color,
    pub stroke_width: f64,
    /// `[dash, gap]` for non-solid outlines.
    pub stroke_line_dash: Option<[f64; 2]>,
    pub fill: Option<Color>,
    pub fill_style: FillStyle,
    pub fill_weight: f64,
    /// Degrees.
    pub hachure_angle: f64,
    pub hachure_gap: f64,
    pub curve_fitting: f64,
    pub curve_tightness: f64,
    pub curve_step_count: f64,
    pub disable_multi_stroke: bool,
    pub disable_multi_stroke_fill: bool,
    /// Keep path endpoints exactly on their vertices.
    pub preserve_vertices: bool,
}

impl Default for RoughOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            roughness: 1.0,
            bowing: 1.0,
            max_randomness_offset: 2.0,
            stroke: Color::from_rgba8(0, 0, 0, 255),
            stroke_width: 1.0,
            stroke_line_dash: None,
            fill: None,
            fill_style: FillStyle::Hachure,
            fill_weight: -1.0,
            hachure_angle: -41.0,
            hachure_gap: -1.0,
            curve_fitting: 0.95,
            curve_tightness: 0.0,
            curve_step_count: 9.0,
            disable_multi_stroke: false,
            disable_multi_stroke_fill: false,
            preserve_vertices: false,
        }
    }
}

impl RoughOptions {
    /// Stroke width for hachure/zigzag fill lines.
    pub fn effective_fill_weight(&self) -> f64 {
        if self.fill_weight < 0.0 {
            self.stroke_width / 2.0
        } else {
            self.fill_weight
        }
    }
}

/// Dash pattern for dashed outlines.
pub fn dash_array_dashed(stroke_width: f64) -> [f64; 2] {
    [8.0, 8.0 + stroke_width]
}

/// Dash pattern for dotted outlines.
pub fn dash_array_dotted(stroke_width: f64) -> [f64; 2] {
    [1.5, 6.0 + stroke_width]
}
