//! Element data contract.
//!
//! Elements are plain records. Their fields are readable everywhere but only
//! writable inside this crate, where the mutation engine keeps `version`,
//! `version_nonce` and `updated` honest.

use crate::environment::Environment;
use crate::fractional_index::FractionalIndex;
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use uuid::Uuid;

/// Element kinds known to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Selection marquee. Never rendered through the shape pipeline.
    Selection,
    Rectangle,
    Diamond,
    Ellipse,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Selection => "selection",
            ElementType::Rectangle => "rectangle",
            ElementType::Diamond => "diamond",
            ElementType::Ellipse => "ellipse",
        }
    }

    pub fn is_selection(self) -> bool {
        self == ElementType::Selection
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill pattern for closed shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillStyle {
    Hachure,
    CrossHatch,
    #[default]
    Solid,
    Zigzag,
}

/// Outline stroke style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Named roughness levels.
pub mod roughness {
    pub const ARCHITECT: f64 = 0.0;
    pub const ARTIST: f64 = 1.0;
    pub const CARTOONIST: f64 = 2.0;
}

/// Stable element identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// A fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

pub type GroupId = String;

/// Style defaults applied to newly constructed elements.
#[derive(Debug, Clone, Copy)]
pub struct ElementDefaults {
    pub stroke_color: &'static str,
    pub background_color: &'static str,
    pub fill_style: FillStyle,
    pub stroke_width: f64,
    pub stroke_style: StrokeStyle,
    pub roughness: f64,
    pub opacity: f64,
    pub locked: bool,
}

pub const DEFAULT_ELEMENT_PROPS: ElementDefaults = ElementDefaults {
    stroke_color: "#000",
    background_color: "transparent",
    fill_style: FillStyle::Solid,
    stroke_width: 2.0,
    stroke_style: StrokeStyle::Solid,
    roughness: roughness::ARTIST,
    opacity: 100.0,
    locked: false,
};

/// A drawable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub(crate) id: ElementId,
    #[serde(rename = "type")]
    pub(crate) element_type: ElementType,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) stroke_color: String,
    pub(crate) background_color: String,
    pub(crate) fill_style: FillStyle,
    pub(crate) stroke_width: f64,
    pub(crate) stroke_style: StrokeStyle,
    pub(crate) roughness: f64,
    pub(crate) opacity: f64,
    /// Fixes the hand-drawn randomness so re-renders are pixel stable.
    pub(crate) seed: u32,
    /// Incremented once per accepted mutation.
    pub(crate) version: u32,
    /// Regenerated on every accepted mutation; breaks `version` ties.
    pub(crate) version_nonce: u32,
    /// Render order key. `None` only before the element joins a scene.
    pub(crate) index: Option<FractionalIndex>,
    pub(crate) is_deleted: bool,
    /// Deepest group first.
    pub(crate) group_ids: Vec<GroupId>,
    pub(crate) frame_id: Option<ElementId>,
    /// Epoch milliseconds of the last accepted mutation.
    pub(crate) updated: i64,
    pub(crate) link: Option<String>,
    pub(crate) locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) custom_data: Option<serde_json::Value>,
}

impl Element {
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn stroke_color(&self) -> &str {
        &self.stroke_color
    }

    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    pub fn fill_style(&self) -> FillStyle {
        self.fill_style
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        self.stroke_style
    }

    pub fn roughness(&self) -> f64 {
        self.roughness
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn version_nonce(&self) -> u32 {
        self.version_nonce
    }

    pub fn index(&self) -> Option<&FractionalIndex> {
        self.index.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn group_ids(&self) -> &[GroupId] {
        &self.group_ids
    }

    pub fn frame_id(&self) -> Option<&ElementId> {
        self.frame_id.as_ref()
    }

    pub fn updated(&self) -> i64 {
        self.updated
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn custom_data(&self) -> Option<&serde_json::Value> {
        self.custom_data.as_ref()
    }

    /// `[x1, y1, x2, y2, cx, cy]` in scene coordinates.
    pub fn absolute_coords(&self) -> [f64; 6] {
        [
            self.x,
            self.y,
            self.x + self.width,
            self.y + self.height,
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
        ]
    }

    /// Axis-aligned bounds after normalization.
    pub fn bounds(&self) -> Rect {
        let n = self.normalized_dimensions();
        Rect::new(n.x, n.y, n.x + n.width, n.y + n.height)
    }

    pub fn normalized_dimensions(&self) -> NormalizedDimensions {
        get_normalized_dimensions(self.x, self.y, self.width, self.height)
    }

    pub fn has_normalized_dimensions(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }

    /// Which of two replicas of the same element wins reconciliation.
    ///
    /// Higher `version` wins; on a tie the lower `version_nonce` wins, so
    /// every replica picks the same side regardless of arrival order.
    pub fn supersedes(&self, other: &Element) -> bool {
        match self.version.cmp(&other.version) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.version_nonce < other.version_nonce,
        }
    }
}

/// Geometry with non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedDimensions {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Flip negative extents so that `width >= 0` and `height >= 0`, moving the
/// origin to keep the covered area unchanged.
pub fn get_normalized_dimensions(x: f64, y: f64, width: f64, height: f64) -> NormalizedDimensions {
    let mut dims = NormalizedDimensions { x, y, width, height };

    if width < 0.0 {
        dims.width = width.abs();
        dims.x = x - dims.width;
    }

    if height < 0.0 {
        dims.height = height.abs();
        dims.y = y - dims.height;
    }

    dims
}

/// Construction options for a new element.
///
/// Only the type and origin are required; everything else falls back to
/// [`DEFAULT_ELEMENT_PROPS`] or to the environment (seed, nonce, timestamp).
#[derive(Debug, Clone)]
pub struct NewElement {
    element_type: ElementType,
    x: f64,
    y: f64,
    id: Option<ElementId>,
    width: f64,
    height: f64,
    stroke_color: String,
    background_color: String,
    fill_style: FillStyle,
    stroke_width: f64,
    stroke_style: StrokeStyle,
    roughness: f64,
    opacity: f64,
    seed: Option<u32>,
    version: Option<u32>,
    version_nonce: Option<u32>,
    index: Option<FractionalIndex>,
    group_ids: Vec<GroupId>,
    frame_id: Option<ElementId>,
    link: Option<String>,
    locked: bool,
    custom_data: Option<serde_json::Value>,
}

impl NewElement {
    pub fn new(element_type: ElementType, x: f64, y: f64) -> Self {
        let defaults = DEFAULT_ELEMENT_PROPS;
        Self {
            element_type,
            x,
            y,
            id: None,
            width: 0.0,
            height: 0.0,
            stroke_color: defaults.stroke_color.to_string(),
            background_color: defaults.background_color.to_string(),
            fill_style: defaults.fill_style,
            stroke_width: defaults.stroke_width,
            stroke_style: defaults.stroke_style,
            roughness: defaults.roughness,
            opacity: defaults.opacity,
            seed: None,
            version: None,
            version_nonce: None,
            index: None,
            group_ids: Vec::new(),
            frame_id: None,
            link: None,
            locked: defaults.locked,
            custom_data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_stroke_color(mut self, color: impl Into<String>) -> Self {
        self.stroke_color = color.into();
        self
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = color.into();
        self
    }

    pub fn with_fill_style(mut self, fill_style: FillStyle) -> Self {
        self.fill_style = fill_style;
        self
    }

    pub fn with_stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = stroke_width;
        self
    }

    pub fn with_stroke_style(mut self, stroke_style: StrokeStyle) -> Self {
        self.stroke_style = stroke_style;
        self
    }

    pub fn with_roughness(mut self, roughness: f64) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_version_nonce(mut self, version_nonce: u32) -> Self {
        self.version_nonce = Some(version_nonce);
        self
    }

    pub fn with_index(mut self, index: FractionalIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_group_ids(mut self, group_ids: Vec<GroupId>) -> Self {
        self.group_ids = group_ids;
        self
    }

    pub fn with_frame_id(mut self, frame_id: Option<ElementId>) -> Self {
        self.frame_id = frame_id;
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_custom_data(mut self, custom_data: serde_json::Value) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    /// Build the element, drawing seed, nonce and timestamp from `env`.
    pub fn build(self, env: &mut Environment) -> Element {
        Element {
            id: self.id.unwrap_or_default(),
            element_type: self.element_type,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            stroke_color: self.stroke_color,
            background_color: self.background_color,
            fill_style: self.fill_style,
            stroke_width: self.stroke_width,
            stroke_style: self.stroke_style,
            roughness: self.roughness,
            opacity: self.opacity,
            seed: self.seed.unwrap_or_else(|| env.random_integer()),
            version: self.version.filter(|v| *v > 0).unwrap_or(1),
            version_nonce: self.version_nonce.unwrap_or_else(|| env.random_integer()),
            index: self.index,
            is_deleted: false,
            group_ids: self.group_ids,
            frame_id: self.frame_id,
            updated: env.now(),
            link: self.link,
            locked: self.locked,
            custom_data: self.custom_data,
        }
    }
}

/// An element that belongs to a scene and therefore carries an index.
///
/// Only the scene constructs these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrderedElement(Element);

impl OrderedElement {
    pub(crate) fn new(element: Element) -> Option<Self> {
        element.index.is_some().then_some(Self(element))
    }

    /// The render order key, guaranteed present.
    pub fn index(&self) -> &FractionalIndex {
        match &self.0.index {
            Some(index) => index,
            None => unreachable!("ordered element {} lost its index", self.0.id),
        }
    }

    pub fn element(&self) -> &Element {
        &self.0
    }

    pub(crate) fn element_mut(&mut self) -> &mut Element {
        &mut self.0
    }

    pub fn into_inner(self) -> Element {
        self.0
    }
}

impl Deref for OrderedElement {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.0
    }
}

/// Borrowed view of a scene element known not to be deleted.
#[derive(Debug, Clone, Copy)]
pub struct NonDeleted<'a>(&'a OrderedElement);

impl<'a> NonDeleted<'a> {
    pub(crate) fn new(element: &'a OrderedElement) -> Option<Self> {
        (!element.is_deleted).then_some(Self(element))
    }

    pub fn get(self) -> &'a OrderedElement {
        self.0
    }
}

impl Deref for NonDeleted<'_> {
    type Target = OrderedElement;

    fn deref(&self) -> &OrderedElement {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DETERMINISTIC_TIMESTAMP;

    #[test]
    fn test_new_element_is_fully_defaulted() {
        let mut env = Environment::deterministic(3);
        let element = NewElement::new(ElementType::Rectangle, 10.0, 20.0).build(&mut env);

        assert_eq!(element.element_type(), ElementType::Rectangle);
        assert_eq!(element.x(), 10.0);
        assert_eq!(element.y(), 20.0);
        assert_eq!(element.width(), 0.0);
        assert_eq!(element.stroke_color(), DEFAULT_ELEMENT_PROPS.stroke_color);
        assert_eq!(element.background_color(), "transparent");
        assert_eq!(element.fill_style(), FillStyle::Solid);
        assert_eq!(element.stroke_width(), 2.0);
        assert_eq!(element.opacity(), 100.0);
        assert_eq!(element.version(), 1);
        assert_eq!(element.updated(), DETERMINISTIC_TIMESTAMP);
        assert!(!element.is_deleted());
        assert!(element.index().is_none());
        assert!(element.frame_id().is_none());
        assert!(!element.id().as_str().is_empty());
    }

    #[test]
    fn test_seed_and_nonce_come_from_environment() {
        let a = NewElement::new(ElementType::Ellipse, 0.0, 0.0).build(&mut Environment::deterministic(9));
        let b = NewElement::new(ElementType::Ellipse, 0.0, 0.0).build(&mut Environment::deterministic(9));
        assert_eq!(a.seed(), b.seed());
        assert_eq!(a.version_nonce(), b.version_nonce());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_explicit_overrides_win() {
        let mut env = Environment::deterministic(1);
        let element = NewElement::new(ElementType::Diamond, 0.0, 0.0)
            .with_id("d1")
            .with_seed(5)
            .with_version(7)
            .with_version_nonce(11)
            .build(&mut env);
        assert_eq!(element.id().as_str(), "d1");
        assert_eq!(element.seed(), 5);
        assert_eq!(element.version(), 7);
        assert_eq!(element.version_nonce(), 11);
    }

    #[test]
    fn test_normalized_dimensions_flip_negative_extents() {
        let dims = get_normalized_dimensions(100.0, 50.0, -40.0, -10.0);
        assert_eq!(dims, NormalizedDimensions { x: 60.0, y: 40.0, width: 40.0, height: 10.0 });

        let untouched = get_normalized_dimensions(1.0, 2.0, 3.0, 4.0);
        assert_eq!(untouched, NormalizedDimensions { x: 1.0, y: 2.0, width: 3.0, height: 4.0 });
    }

    #[test]
    fn test_absolute_coords() {
        let mut env = Environment::deterministic(1);
        let element = NewElement::new(ElementType::Rectangle, 10.0, 20.0)
            .with_size(100.0, 50.0)
            .build(&mut env);
        assert_eq!(element.absolute_coords(), [10.0, 20.0, 110.0, 70.0, 60.0, 45.0]);
    }

    #[test]
    fn test_supersedes_uses_version_then_lower_nonce() {
        let mut env = Environment::deterministic(1);
        let base = NewElement::new(ElementType::Rectangle, 0.0, 0.0).with_id("e");
        let newer = base.clone().with_version(3).with_version_nonce(50).build(&mut env);
        let older = base.clone().with_version(2).with_version_nonce(1).build(&mut env);
        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));

        let low_nonce = base.clone().with_version(3).with_version_nonce(10).build(&mut env);
        assert!(low_nonce.supersedes(&newer));
        assert!(!newer.supersedes(&low_nonce));
    }

    #[test]
    fn test_serialized_field_names_follow_element_contract() {
        let mut env = Environment::deterministic(1);
        let element = NewElement::new(ElementType::Rectangle, 0.0, 0.0)
            .with_fill_style(FillStyle::CrossHatch)
            .build(&mut env);
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["type"], "rectangle");
        assert_eq!(json["fillStyle"], "cross-hatch");
        assert!(json.get("versionNonce").is_some());
        assert!(json.get("isDeleted").is_some());
    }

    #[test]
    fn test_ordered_requires_index() {
        let mut env = Environment::deterministic(1);
        let element = NewElement::new(ElementType::Rectangle, 0.0, 0.0).build(&mut env);
        assert!(OrderedElement::new(element.clone()).is_none());

        let indexed = NewElement::new(ElementType::Rectangle, 0.0, 0.0)
            .with_index(FractionalIndex::first())
            .build(&mut env);
        let ordered = OrderedElement::new(indexed).unwrap();
        assert_eq!(ordered.index(), &FractionalIndex::first());
    }
}
