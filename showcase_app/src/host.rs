//! Frame hosts
//!
//! [`WindowHost`] paces frames to the monitor refresh rate and turns window
//! events into resizes, orbit input and panel edits. [`HeadlessHost`] grants
//! a fixed number of frames and nothing else. [`PresentingHost`] wraps either
//! and hands every finished frame, with the panel overlay drawn on top, to a
//! [`Presenter`].

use glfw::{Action, Key, Modifiers, MouseButton, WindowEvent};
use render_engine::controls::PointerButton;
use render_engine::debug::{OverlayLine, PanelOverlay};
use render_engine::foundation::time::{FramePacer, Timer};
use render_engine::frame_loop::{FrameHost, FrameSignal, StopFlag};
use render_engine::render::backend::BackendResult;
use render_engine::render::{FrameImage, Presenter, Viewport};
use render_engine::window::Window;

use crate::bootstrap::Showcase;

/// Panel steps applied by PageUp / PageDown
const COARSE_STEPS: i32 = 10;

/// Grants refreshes until `frames` ticks have run
///
/// The loop always runs at least one tick, so `frames == 0` behaves like 1.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    frames: u32,
    ticks: u32,
}

impl HeadlessHost {
    /// Host for `frames` ticks
    pub fn new(frames: u32) -> Self {
        Self { frames, ticks: 0 }
    }
}

impl<C> FrameHost<C> for HeadlessHost {
    fn request_frame(&mut self, _ctx: &mut C) -> FrameSignal {
        self.ticks += 1;
        if self.ticks >= self.frames {
            FrameSignal::Stop
        } else {
            FrameSignal::Continue
        }
    }
}

/// Presents each finished frame, then defers to the wrapped host
pub struct PresentingHost<H, P> {
    // Dropped before `inner` so a window surface goes before its window
    presenter: P,
    inner: H,
    overlay: Option<PanelOverlay>,
    timer: Timer,
    scratch: Vec<u8>,
    presented: u64,
}

impl<H, P: Presenter> PresentingHost<H, P> {
    /// Wrap `inner`; without an overlay frames are presented untouched
    pub fn new(inner: H, presenter: P, overlay: Option<PanelOverlay>) -> Self {
        Self {
            inner,
            presenter,
            overlay,
            timer: Timer::new(),
            scratch: Vec::new(),
            presented: 0,
        }
    }

    /// The presenter frames are handed to
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Frames presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn overlay_lines(&self, app: &Showcase) -> Vec<OverlayLine> {
        let info = app.state.renderer.info();
        let mut lines = PanelOverlay::panel_lines(&app.panel, &app.state);
        lines.push(OverlayLine::new(format!(
            "{:.1} fps  {} draws  {} triangles",
            self.timer.average_fps(),
            info.draw_calls,
            info.triangles
        )));
        lines
    }

    /// Copy the backend's pixels, draw the overlay and present
    ///
    /// Returns `false` when the backend keeps no pixels.
    fn present(&mut self, app: &Showcase) -> BackendResult<bool> {
        let Some((width, height, pixels)) = app.state.renderer.backend().read_pixels() else {
            return Ok(false);
        };
        self.scratch.clear();
        self.scratch.extend_from_slice(pixels);

        if let Some(overlay) = &self.overlay {
            let lines = self.overlay_lines(app);
            overlay.draw(&mut self.scratch, width, height, &lines);
        }

        let frame = FrameImage::new(width, height, &self.scratch)?;
        self.presenter.present(&frame)?;
        self.presented += 1;
        Ok(true)
    }
}

impl<H, P> FrameHost<Showcase> for PresentingHost<H, P>
where
    H: FrameHost<Showcase>,
    P: Presenter,
{
    fn request_frame(&mut self, app: &mut Showcase) -> FrameSignal {
        self.timer.update();
        if let Err(err) = self.present(app) {
            log::warn!("Frame {} not presented: {}", self.presented + 1, err);
        }
        self.inner.request_frame(app)
    }
}

/// Interactive host driven by a GLFW window
pub struct WindowHost {
    window: Window,
    pacer: FramePacer,
    stop: StopFlag,
}

impl WindowHost {
    /// Wrap `window`; closing it also sets `stop`
    pub fn new(mut window: Window, stop: StopFlag) -> Self {
        let refresh = window.refresh_rate();
        log::info!("Pacing frames to {} Hz", refresh);
        Self {
            window,
            pacer: FramePacer::from_refresh_rate(refresh),
            stop,
        }
    }

    /// Viewport matching the current window
    pub fn viewport(&self) -> Viewport {
        let (width, height) = self.window.size();
        Viewport::new(width, height, self.window.device_pixel_ratio())
    }

    fn handle_event(&mut self, app: &mut Showcase, event: WindowEvent) {
        match event {
            WindowEvent::Close => self.stop.stop(),
            WindowEvent::Size(width, height) => {
                // Minimised windows report 0x0; keep the last usable size
                if width > 0 && height > 0 {
                    self.resize(app);
                }
            }
            WindowEvent::ContentScale(..) => self.resize(app),
            WindowEvent::CursorPos(x, y) => {
                let state = &mut app.state;
                state.controls.pointer_move(x as f32, y as f32, &state.camera);
            }
            WindowEvent::MouseButton(button, Action::Press, _) => {
                let (x, y) = self.window.cursor_pos();
                let button = match button {
                    MouseButton::Button1 => PointerButton::Left,
                    MouseButton::Button2 => PointerButton::Right,
                    MouseButton::Button3 => PointerButton::Middle,
                    _ => return,
                };
                app.state.controls.pointer_down(button, x as f32, y as f32);
            }
            WindowEvent::MouseButton(_, Action::Release, _) => app.state.controls.pointer_up(),
            WindowEvent::Scroll(_, dy) => app.state.controls.wheel(-dy as f32),
            WindowEvent::Key(key, _, Action::Press | Action::Repeat, mods) => self.handle_key(app, key, mods),
            _ => {}
        }
    }

    fn handle_key(&mut self, app: &mut Showcase, key: Key, mods: Modifiers) {
        let steps = match key {
            Key::Escape => {
                self.stop.stop();
                return;
            }
            Key::Tab => {
                if mods.contains(Modifiers::Shift) {
                    app.panel.select_prev();
                } else {
                    app.panel.select_next();
                }
                log::info!("Panel: selected {}", app.panel.selected().unwrap_or("-"));
                return;
            }
            Key::P => {
                println!("{}", app.panel.describe(&app.state));
                return;
            }
            Key::Up | Key::Space => 1,
            Key::Down => -1,
            Key::PageUp => COARSE_STEPS,
            Key::PageDown => -COARSE_STEPS,
            _ => return,
        };

        match app.panel.nudge(&mut app.state, steps) {
            Ok(Some(value)) => log::info!("Panel: {} = {}", app.panel.selected().unwrap_or("-"), value),
            Ok(None) => {}
            Err(err) => log::warn!("Panel edit rejected: {}", err),
        }
    }

    fn resize(&mut self, app: &mut Showcase) {
        let viewport = self.viewport();
        if let Err(err) = app.resize(viewport) {
            log::error!("Resize to {}x{} failed: {}", viewport.width, viewport.height, err);
        }
    }
}

impl FrameHost<Showcase> for WindowHost {
    fn request_frame(&mut self, app: &mut Showcase) -> FrameSignal {
        self.pacer.wait_next();

        self.window.poll_events();
        let events: Vec<WindowEvent> = self.window.flush_events().map(|(_, event)| event).collect();
        for event in events {
            self.handle_event(app, event);
        }

        if self.window.should_close() || self.stop.is_stopped() {
            FrameSignal::Stop
        } else {
            FrameSignal::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_engine::frame_loop::run_frame_loop;
    use render_engine::render::{RecordingPresenter, SoftwareRasterizer};

    use crate::scene_config::SceneConfig;

    fn showcase(name: &str, viewport: Viewport) -> Showcase {
        let root = std::env::temp_dir().join(format!("showcase_present_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let mut config = SceneConfig::default();
        config.assets.root = root;
        let backend = SoftwareRasterizer::new(viewport.width, viewport.height);
        Showcase::bootstrap(&config, viewport, Box::new(backend)).unwrap()
    }

    fn rendered(app: &Showcase) -> Vec<u8> {
        let (_, _, pixels) = app.state.renderer.backend().read_pixels().unwrap();
        pixels.to_vec()
    }

    #[test]
    fn test_headless_host_grants_exact_frame_count() {
        let mut host = HeadlessHost::new(3);
        let mut ctx = ();
        let signals: Vec<FrameSignal> = (0..3).map(|_| host.request_frame(&mut ctx)).collect();
        assert_eq!(signals, [FrameSignal::Continue, FrameSignal::Continue, FrameSignal::Stop]);
    }

    #[test]
    fn test_every_rendered_frame_is_presented() {
        let mut app = showcase("every", Viewport::new(96, 64, 1.0));
        let mut host = PresentingHost::new(HeadlessHost::new(4), RecordingPresenter::new(), None);

        let frames = run_frame_loop(&mut host, &mut app, &StopFlag::new(), Showcase::frame).unwrap();

        assert_eq!(frames, 4);
        assert_eq!(host.presented(), 4);
        assert_eq!(host.presenter().sizes(), &[(96, 64); 4]);
        assert_eq!(host.presenter().last_frame().unwrap().pixels, rendered(&app).as_slice());
    }

    #[test]
    fn test_presented_size_follows_resize() {
        let mut app = showcase("resize", Viewport::new(96, 64, 1.0));
        let mut host = PresentingHost::new(HeadlessHost::new(10), RecordingPresenter::new(), None);

        app.frame().unwrap();
        host.request_frame(&mut app);
        app.resize(Viewport::new(48, 32, 1.5)).unwrap();
        app.frame().unwrap();
        host.request_frame(&mut app);

        assert_eq!(host.presenter().sizes(), &[(96, 64), (72, 48)]);
        assert_eq!(app.state.renderer.drawing_buffer_size(), (72, 48));
    }

    #[test]
    fn test_overlay_is_drawn_over_presented_frame() {
        let (width, height) = (320, 240);
        let mut app = showcase("overlay", Viewport::new(width, height, 1.0));
        let overlay = PanelOverlay::with_builtin_font(8.0).unwrap();
        let mut host = PresentingHost::new(HeadlessHost::new(1), RecordingPresenter::new(), Some(overlay));

        let frames = run_frame_loop(&mut host, &mut app, &StopFlag::new(), Showcase::frame).unwrap();
        assert_eq!(frames, 1);

        let rendered = rendered(&app);
        let presented = host.presenter().last_frame().unwrap();
        assert_ne!(presented.pixels, rendered.as_slice());

        // Panel sits top-right; the bottom-left corner is the rendered scene
        let offset = |x: u32, y: u32| ((y * width + x) * 4) as usize;
        let corner = offset(0, height - 1);
        assert_eq!(&presented.pixels[corner..corner + 4], &rendered[corner..corner + 4]);
        let changed = (0..width)
            .map(|x| offset(x, height / 4))
            .filter(|&o| presented.pixels[o..o + 4] != rendered[o..o + 4])
            .count();
        assert!(changed > 0);
    }
}
