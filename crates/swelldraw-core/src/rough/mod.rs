//! Hand-drawn ("rough") shape generation.
//!
//! Shapes are generated by `roughr` and come out as [`Drawable`]s: a list of
//! kurbo op-sets plus the options that produced them. Output is a pure
//! function of the geometry and the options, seed included, so regenerating
//! an unchanged element yields the same paths.

mod generator;
mod options;

pub use generator::RoughGenerator;
pub use options::{RoughOptions, dash_array_dashed, dash_array_dotted};

use kurbo::BezPath;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoughError {
    #[error("Invalid rough options: {0}")]
    Options(String),
}

/// What an op-set paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpSetKind {
    /// Outline strokes, painted with the stroke colour and width.
    Path,
    /// Solid fill area.
    FillPath,
    /// Hachure, cross-hatch or zigzag strokes, painted with the fill colour
    /// at the fill weight.
    FillSketch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpSet {
    pub kind: OpSetKind,
    pub path: BezPath,
}

/// A generated shape, in element-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub options: RoughOptions,
    /// Paint order: fill first, outline last.
    pub sets: Vec<OpSet>,
}

impl Drawable {
    pub fn outline(&self) -> impl Iterator<Item = &OpSet> {
        self.sets.iter().filter(|set| set.kind == OpSetKind::Path)
    }
}
