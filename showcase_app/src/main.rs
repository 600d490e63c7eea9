//! Realistic render showcase
//!
//! A flight helmet and a hamburger in a textured corner, lit by an HDR
//! environment and one shadow-casting directional light, with orbit controls
//! and a keyboard-driven debug panel.
//!
//! Usage: `realistic_showcase [config.toml|config.ron]`

mod bootstrap;
mod host;
mod panel_bindings;
mod scene_config;

use std::path::PathBuf;
use std::time::Duration;

use render_engine::config::Config;
use render_engine::debug::PanelOverlay;
use render_engine::foundation::logging;
use render_engine::frame_loop::{run_frame_loop, StopFlag};
use render_engine::render::{SoftwareRasterizer, Viewport};
use render_engine::window::Window;

use crate::bootstrap::{Showcase, ShowcaseError};
use crate::host::{HeadlessHost, PresentingHost, WindowHost};
use crate::scene_config::SceneConfig;

/// Panel text height in screen units
const OVERLAY_FONT_SIZE: f32 = 14.0;

fn run_windowed(config: &SceneConfig) -> Result<u64, ShowcaseError> {
    let settings = &config.window;
    let window = Window::new(&settings.title, settings.width, settings.height)?;
    let presenter = window.presenter()?;
    let stop = StopFlag::new();
    let window_host = WindowHost::new(window, stop.clone());

    let viewport = window_host.viewport();
    let backend = SoftwareRasterizer::new(viewport.width, viewport.height);
    let mut app = Showcase::bootstrap(config, viewport, Box::new(backend))?;

    let overlay = match PanelOverlay::with_builtin_font(OVERLAY_FONT_SIZE * app.state.renderer.pixel_ratio()) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("Panel overlay disabled: {}", err);
            None
        }
    };
    let mut host = PresentingHost::new(window_host, presenter, overlay);

    log::info!("Controls: drag to orbit, right-drag to pan, scroll to zoom");
    log::info!("Panel: Tab/Shift+Tab select, Up/Down step, PageUp/PageDown x10, Space toggle, P print, Esc quit");
    run_frame_loop(&mut host, &mut app, &stop, Showcase::frame)
}

fn run_headless(config: &SceneConfig) -> Result<u64, ShowcaseError> {
    let run = &config.run;
    let viewport = Viewport::new(config.window.width, config.window.height, run.device_pixel_ratio);
    let backend = SoftwareRasterizer::new(viewport.width, viewport.height);
    let mut app = Showcase::bootstrap(config, viewport, Box::new(backend))?;

    let wait = Duration::try_from_secs_f32(run.asset_wait_secs.max(0.0)).unwrap_or(Duration::ZERO);
    let completed = app.loader.wait_all(&mut app.state, wait);
    log::info!("{} asset load(s) finished before the first frame", completed);

    let mut host = HeadlessHost::new(run.frames);
    let frames = run_frame_loop(&mut host, &mut app, &StopFlag::new(), Showcase::frame)?;

    let info = app.state.renderer.info();
    let (width, height) = app.state.renderer.drawing_buffer_size();
    log::info!(
        "Rendered {} frames at {}x{}: {} draws, {} triangles, {} shadow maps",
        frames,
        width,
        height,
        info.draw_calls,
        info.triangles,
        info.shadow_maps
    );
    Ok(frames)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {panic_info}");

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }

        if let Some(payload) = panic_info.payload().downcast_ref::<&str>() {
            eprintln!("Panic message: {payload}");
        } else if let Some(payload) = panic_info.payload().downcast_ref::<String>() {
            eprintln!("Panic message: {payload}");
        }
    }));

    logging::init(log::LevelFilter::Info);
    log::info!("Starting realistic render showcase");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = SceneConfig::load_or_default(config_path.as_deref()).map_err(ShowcaseError::from)?;

    let result = if config.run.headless {
        run_headless(&config)
    } else {
        run_windowed(&config)
    };

    match result {
        Ok(frames) => {
            log::info!("Showcase finished after {} frames", frames);
            Ok(())
        }
        Err(e) => {
            log::error!("Showcase error: {}", e);
            Err(e.into())
        }
    }
}
