//! SwellDraw headless shell.
//!
//! Drives a drawing session with a scripted pointer sequence: one element
//! per shape tool, a style change and a zoom, painting frames along the way.

use kurbo::Point;
use swelldraw_core::{AppState, Element, ElementUpdate, FillStyle, ToolType};
use swelldraw_render::{DrawingSession, RecordingFactory, RenderError, SessionConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What the scripted session produced.
#[derive(Debug)]
pub struct DemoReport {
    pub elements: Vec<Element>,
    pub frames: usize,
    pub static_commands: usize,
    pub canvases_created: usize,
}

impl DemoReport {
    pub fn elements_json(&self) -> Result<String, DemoError> {
        Ok(serde_json::to_string_pretty(&self.elements)?)
    }
}

/// Viewport and device settings for the scripted run.
#[derive(Debug, Clone, Copy)]
pub struct DemoConfig {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            device_pixel_ratio: 2.0,
        }
    }
}

const STROKES: [(ToolType, (f64, f64), (f64, f64)); 3] = [
    (ToolType::Rectangle, (100.0, 100.0), (260.0, 200.0)),
    (ToolType::Diamond, (420.0, 120.0), (320.0, 260.0)),
    (ToolType::Ellipse, (200.0, 300.0), (380.0, 420.0)),
];

pub fn run_demo(config: DemoConfig) -> Result<DemoReport, DemoError> {
    let session_config = SessionConfig {
        device_pixel_ratio: config.device_pixel_ratio,
        ..SessionConfig::default()
    };
    let mut session = DrawingSession::new(
        RecordingFactory::default(),
        AppState::new(config.width, config.height),
        session_config,
    )?;
    let mut frames = 0;

    for (tool, (down_x, down_y), (up_x, up_y)) in STROKES {
        session.set_active_tool(tool);
        session.pointer_down(Point::new(down_x, down_y))?;
        for step in 1..=4 {
            let t = step as f64 / 4.0;
            let pointer = Point::new(down_x + (up_x - down_x) * t, down_y + (up_y - down_y) * t);
            session.pointer_move(pointer)?;
            if session.on_animation_frame()? != Default::default() {
                frames += 1;
            }
        }
        if let Some(id) = session.pointer_up()? {
            log::info!("Drew {:?} element {}", tool, id);
        }
    }

    let first = session.scene().get_elements_including_deleted().first().map(|e| e.id().clone());
    if let Some(id) = first {
        session.update_element_style(
            &id,
            ElementUpdate::new()
                .with_background_color("#a5d8ff")
                .with_fill_style(FillStyle::Hachure),
        )?;
    }
    session.zoom_at(Point::new(config.width / 2.0, config.height / 2.0), 1.5);

    while session.has_pending_frame() {
        session.on_animation_frame()?;
        frames += 1;
    }
    session.flush()?;

    let report = DemoReport {
        elements: session
            .scene()
            .get_non_deleted_elements()
            .iter()
            .map(|element| element.element().clone())
            .collect(),
        frames,
        static_commands: session.static_canvas().commands().len(),
        canvases_created: session.factory().created(),
    };
    session.destroy();
    Ok(report)
}
