//! tweakview: a GLB viewer with live transform controls.
//!
//! The model is fetched once at startup. Sliders, number fields and an
//! on-screen gizmo all edit the same transform; the binding controller keeps
//! them in agreement. The current view can be exported as a one page PDF.

mod app;
mod assets;
mod binding;
mod config;
mod export;
mod grid;
mod render;
mod scene;
mod ui;

use clap::Parser;
use config::{Cli, ViewerConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = match ViewerConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(2);
        }
    };

    log::info!("tweakview {}", env!("CARGO_PKG_VERSION"));
    log::info!("   Press ESC or close window to exit");

    if let Err(err) = app::run(config) {
        log::error!("{}", err);
        std::process::exit(1);
    }
    log::info!("Goodbye");
}
