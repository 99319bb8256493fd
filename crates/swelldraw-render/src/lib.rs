//! SwellDraw Render Library
//!
//! Element canvas cache, static and interactive scene passes, frame
//! throttling and the drawing session. Passes draw onto a [`Surface`]; the
//! recording backend is always available and the Vello backend is behind the
//! `vello-renderer` feature.

pub mod element;
pub mod helpers;
pub mod new_element_scene;
pub mod recording;
mod renderer;
pub mod session;
pub mod static_scene;
pub mod surface;
pub mod throttle;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use element::{ElementCanvasCache, ElementWithCanvas, render_element};
pub use recording::{DrawCommand, RecordingFactory, RecordingSurface};
pub use renderer::{RenderError, RenderResult, RenderableElements, Renderer};
pub use session::{DrawingSession, FrameReport, SessionConfig};
pub use surface::{Surface, SurfaceFactory, SurfaceState};
pub use throttle::FrameThrottle;

#[cfg(feature = "vello-renderer")]
pub use vello_impl::{VelloSurface, VelloSurfaceFactory};
