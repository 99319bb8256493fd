//! Adapter over `roughr`: builds its options from [`RoughOptions`] and turns
//! the op-sets it produces into kurbo paths.

use super::{Drawable, OpSet, OpSetKind, RoughError, RoughOptions};
use crate::element::FillStyle;
use euclid::default::Point2D;
use kurbo::{BezPath, Point};
use roughr::core::{self as rough_core, Op, OpSetType, OpType, Options, OptionsBuilder};
use roughr::generator::Generator;

/// Builds [`Drawable`]s from primitive geometry.
#[derive(Default)]
pub struct RoughGenerator {
    inner: Generator,
}

impl std::fmt::Debug for RoughGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoughGenerator").finish_non_exhaustive()
    }
}

impl RoughGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rectangle(
        &self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: &RoughOptions,
    ) -> Result<Drawable, RoughError> {
        let rough = roughr_options(options)?;
        let drawable = self.inner.rectangle::<f64>(x, y, width, height, &Some(rough));
        Ok(convert_drawable(&drawable, options))
    }

    /// Closed polygon through `points`.
    pub fn polygon(&self, points: &[Point], options: &RoughOptions) -> Result<Drawable, RoughError> {
        let rough = roughr_options(options)?;
        let points: Vec<Point2D<f64>> = points.iter().map(|p| Point2D::new(p.x, p.y)).collect();
        let drawable = self.inner.polygon::<f64>(&points, &Some(rough));
        Ok(convert_drawable(&drawable, options))
    }

    /// Ellipse centred on `(cx, cy)`.
    pub fn ellipse(
        &self,
        cx: f64,
        cy: f64,
        width: f64,
        height: f64,
        options: &RoughOptions,
    ) -> Result<Drawable, RoughError> {
        let rough = roughr_options(options)?;
        let drawable = self.inner.ellipse::<f64>(cx, cy, width, height, &Some(rough));
        Ok(convert_drawable(&drawable, options))
    }
}

fn roughr_fill_style(fill_style: FillStyle) -> rough_core::FillStyle {
    match fill_style {
        FillStyle::Hachure => rough_core::FillStyle::Hachure,
        FillStyle::CrossHatch => rough_core::FillStyle::CrossHatch,
        FillStyle::Solid => rough_core::FillStyle::Solid,
        FillStyle::Zigzag => rough_core::FillStyle::ZigZag,
    }
}

fn roughr_options(options: &RoughOptions) -> Result<Options, RoughError> {
    let mut builder = OptionsBuilder::default();
    builder
        .seed(u64::from(options.seed.max(1)))
        .roughness(options.roughness as f32)
        .bowing(options.bowing as f32)
        .max_randomness_offset(options.max_randomness_offset as f32)
        .stroke_width(options.stroke_width as f32)
        .fill_style(roughr_fill_style(options.fill_style))
        .fill_weight(options.fill_weight as f32)
        .hachure_angle(options.hachure_angle as f32)
        .hachure_gap(options.hachure_gap as f32)
        .curve_fitting(options.curve_fitting as f32)
        .curve_tightness(options.curve_tightness as f32)
        .curve_step_count(options.curve_step_count as f32)
        .disable_multi_stroke(options.disable_multi_stroke)
        .disable_multi_stroke_fill(options.disable_multi_stroke_fill)
        .preserve_vertices(options.preserve_vertices);
    if let Some(dash) = options.stroke_line_dash {
        builder.stroke_line_dash(dash.to_vec());
    }

    let mut rough = builder.build().map_err(|err| RoughError::Options(err.to_string()))?;
    // Only the presence of a fill matters to generation; colours are
    // applied when the op-sets are painted.
    rough.fill = if options.fill.is_some() {
        rough.stroke.clone()
    } else {
        None
    };
    Ok(rough)
}

fn convert_drawable(drawable: &rough_core::Drawable<f64>, options: &RoughOptions) -> Drawable {
    let sets = drawable
        .sets
        .iter()
        .map(|set| OpSet {
            kind: match set.op_set_type {
                OpSetType::Path => OpSetKind::Path,
                OpSetType::FillPath => OpSetKind::FillPath,
                OpSetType::FillSketch => OpSetKind::FillSketch,
            },
            path: ops_to_path(&set.ops),
        })
        .collect();
    Drawable {
        options: options.clone(),
        sets,
    }
}

/// Convert `roughr` ops to a path. Ops with too little data are skipped.
fn ops_to_path(ops: &[Op<f64>]) -> BezPath {
    let mut path = BezPath::new();
    let mut started = false;
    for op in ops {
        match (&op.op, op.data.as_slice()) {
            (OpType::Move, [x, y, ..]) => {
                path.move_to((*x, *y));
                started = true;
            }
            (OpType::LineTo, [x, y, ..]) if started => path.line_to((*x, *y)),
            (OpType::BCurveTo, [x1, y1, x2, y2, x, y, ..]) if started => {
                path.curve_to((*x1, *y1), (*x2, *y2), (*x, *y));
            }
            _ => log::trace!("Skipping malformed rough op"),
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{PathEl, Shape};
    use peniko::Color;

    fn options(seed: u32) -> RoughOptions {
        RoughOptions {
            seed,
            ..RoughOptions::default()
        }
    }

    #[test]
    fn test_rectangle_is_deterministic_per_seed() {
        let generator = RoughGenerator::new();
        let a = generator.rectangle(0.0, 0.0, 100.0, 50.0, &options(7)).unwrap();
        let b = generator.rectangle(0.0, 0.0, 100.0, 50.0, &options(7)).unwrap();
        let c = generator.rectangle(0.0, 0.0, 100.0, 50.0, &options(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.sets, c.sets);
    }

    #[test]
    fn test_unfilled_shape_is_outline_only() {
        let generator = RoughGenerator::new();
        let drawable = generator.rectangle(0.0, 0.0, 100.0, 50.0, &options(1)).unwrap();
        assert_eq!(drawable.sets.len(), 1);
        assert_eq!(drawable.sets[0].kind, OpSetKind::Path);
        assert!(!drawable.sets[0].path.elements().is_empty());
    }

    #[test]
    fn test_fill_is_painted_before_outline() {
        let generator = RoughGenerator::new();
        let solid = RoughOptions {
            fill: Some(Color::from_rgba8(255, 0, 0, 255)),
            fill_style: FillStyle::Solid,
            ..options(2)
        };
        let drawable = generator.rectangle(0.0, 0.0, 40.0, 40.0, &solid).unwrap();
        let kinds: Vec<_> = drawable.sets.iter().map(|set| set.kind).collect();
        assert_eq!(kinds, vec![OpSetKind::FillPath, OpSetKind::Path]);

        let hachure = RoughOptions {
            fill_style: FillStyle::Hachure,
            ..solid
        };
        let drawable = generator.rectangle(0.0, 0.0, 40.0, 40.0, &hachure).unwrap();
        assert_eq!(drawable.sets[0].kind, OpSetKind::FillSketch);
        assert_eq!(drawable.sets.last().map(|set| set.kind), Some(OpSetKind::Path));
    }

    #[test]
    fn test_ellipse_stays_near_its_bounds() {
        let generator = RoughGenerator::new();
        let drawable = generator.ellipse(50.0, 25.0, 100.0, 50.0, &options(11)).unwrap();
        let bbox = drawable.sets[0].path.bounding_box();
        assert!(bbox.x0 > -10.0 && bbox.x1 < 110.0);
        assert!(bbox.y0 > -10.0 && bbox.y1 < 60.0);
        assert!(bbox.width() > 80.0);
    }

    #[test]
    fn test_polygon_outline_covers_vertices() {
        let generator = RoughGenerator::new();
        let points = [
            Point::new(50.0, 0.0),
            Point::new(100.0, 40.0),
            Point::new(50.0, 80.0),
            Point::new(0.0, 40.0),
        ];
        let drawable = generator.polygon(&points, &options(4)).unwrap();
        let bbox = drawable.sets[0].path.bounding_box();
        assert!(bbox.width() > 90.0 && bbox.height() > 70.0);
    }

    #[test]
    fn test_ops_convert_to_path_elements() {
        let ops = vec![
            Op {
                op: OpType::Move,
                data: vec![1.0, 2.0],
            },
            Op {
                op: OpType::BCurveTo,
                data: vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            },
            Op {
                op: OpType::LineTo,
                data: vec![9.0],
            },
            Op {
                op: OpType::LineTo,
                data: vec![9.0, 10.0],
            },
        ];
        let path = ops_to_path(&ops);
        assert_eq!(
            path.elements(),
            &[
                PathEl::MoveTo(Point::new(1.0, 2.0)),
                PathEl::CurveTo(Point::new(3.0, 4.0), Point::new(5.0, 6.0), Point::new(7.0, 8.0)),
                PathEl::LineTo(Point::new(9.0, 10.0)),
            ]
        );
    }

    #[test]
    fn test_lines_before_a_move_are_dropped() {
        let ops = vec![Op {
            op: OpType::LineTo,
            data: vec![1.0, 1.0],
        }];
        assert!(ops_to_path(&ops).elements().is_empty());
    }
}
