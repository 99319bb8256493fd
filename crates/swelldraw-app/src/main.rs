//! Main application entry point.

use swelldraw_app::{DemoConfig, run_demo};

fn main() {
    env_logger::init();
    log::info!("Starting SwellDraw");

    let report = match run_demo(DemoConfig::default()) {
        Ok(report) => report,
        Err(err) => {
            log::error!("Scripted session failed: {}", err);
            std::process::exit(1);
        }
    };
    log::info!(
        "Painted {} frames, {} static draw commands, {} canvases",
        report.frames,
        report.static_commands,
        report.canvases_created
    );

    match report.elements_json() {
        Ok(json) => println!("{json}"),
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}
