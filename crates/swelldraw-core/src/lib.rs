//! SwellDraw Core Library
//!
//! Platform-agnostic element model, mutation engine, shape cache and scene
//! for the SwellDraw drawing surface.

pub mod app_state;
pub mod color;
pub mod drag;
pub mod element;
pub mod environment;
pub mod fractional_index;
pub mod mutation;
pub mod rough;
pub mod scene;
pub mod shape;

pub use app_state::{AppState, NormalizedZoom, ToolType, viewport_coords_to_scene_coords};
pub use drag::{DragNewElement, drag_new_element};
pub use element::{
    DEFAULT_ELEMENT_PROPS, Element, ElementId, ElementType, FillStyle, NewElement, NonDeleted, OrderedElement,
    StrokeStyle, get_normalized_dimensions,
};
pub use environment::{Clock, Environment, FixedClock, RandomSource, SeededRandom, SystemClock};
pub use fractional_index::{FractionalIndex, IndexError, generate_key_between};
pub use mutation::{ElementCache, ElementUpdate, OpaqueFieldPolicy, mutate_element};
pub use scene::{NonDeletedElementsMap, Scene, SceneError, Subscription, UpdateCallback};
pub use shape::{ElementShape, ShapeCache, ShapeError};
