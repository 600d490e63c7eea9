//! GLFW window management
//!
//! Creates a resizable window without a client API and exposes the event
//! queue, sizes and the display properties the renderer needs (content scale
//! for the pixel ratio, monitor refresh rate for frame pacing). Finished
//! frames reach the screen through a [`WindowPresenter`], a softbuffer
//! surface sharing the GLFW window.

use std::num::NonZeroU32;
use std::rc::Rc;

use thiserror::Error;

use crate::render::backend::{BackendResult, RenderError};
use crate::render::present::{pack_xrgb, FrameImage, Presenter};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialised
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// No presentation surface could be attached to the window
    #[error("Presentation surface creation failed: {0}")]
    PresentationFailed(String),
}

/// Result alias for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Refresh rate assumed when the monitor does not report one
pub const DEFAULT_REFRESH_RATE: u32 = 60;

type SharedWindow = Rc<glfw::PWindow>;

/// GLFW window wrapper
pub struct Window {
    glfw: glfw::Glfw,
    window: SharedWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window").field("size", &self.size()).finish_non_exhaustive()
    }
}

impl Window {
    /// Open a window of `width` x `height` screen units
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|err| WindowError::InitializationFailed(format!("{err:?}")))?;

        // Frames are produced by the engine backend, not a GL context
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_size_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_content_scale_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_mouse_button_polling(true);
        window.set_scroll_polling(true);

        log::info!("Created window '{}' ({}x{})", title, width, height);
        Ok(Self { glfw, window: Rc::new(window), events })
    }

    /// Attach a presentation surface to this window
    pub fn presenter(&self) -> WindowResult<WindowPresenter> {
        let context = softbuffer::Context::new(Rc::clone(&self.window))
            .map_err(|err| WindowError::PresentationFailed(err.to_string()))?;
        let surface = softbuffer::Surface::new(&context, Rc::clone(&self.window))
            .map_err(|err| WindowError::PresentationFailed(err.to_string()))?;
        log::debug!("Attached software presentation surface");
        Ok(WindowPresenter { surface, size: None })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Pump the platform event queue
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain queued events
    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Window size in screen units
    pub fn size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Ratio of physical pixels to screen units
    pub fn device_pixel_ratio(&self) -> f32 {
        let (scale_x, scale_y) = self.window.get_content_scale();
        scale_x.max(scale_y).max(1.0)
    }

    /// Cursor position in screen units
    pub fn cursor_pos(&self) -> (f64, f64) {
        self.window.get_cursor_pos()
    }

    /// Refresh rate of the primary monitor
    pub fn refresh_rate(&mut self) -> u32 {
        self.glfw
            .with_primary_monitor(|_, monitor| {
                monitor
                    .and_then(|m| m.get_video_mode())
                    .map(|mode| mode.refresh_rate)
            })
            .filter(|&hz| hz > 0)
            .unwrap_or(DEFAULT_REFRESH_RATE)
    }
}

/// Copies finished frames into the window through softbuffer
pub struct WindowPresenter {
    surface: softbuffer::Surface<SharedWindow, SharedWindow>,
    size: Option<(u32, u32)>,
}

impl std::fmt::Debug for WindowPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowPresenter").field("size", &self.size).finish_non_exhaustive()
    }
}

fn surface_error(err: softbuffer::SoftBufferError) -> RenderError {
    RenderError::BackendError(format!("presentation surface: {err}"))
}

impl Presenter for WindowPresenter {
    fn present(&mut self, frame: &FrameImage<'_>) -> BackendResult<()> {
        let size = (frame.width, frame.height);
        if self.size != Some(size) {
            let (Some(width), Some(height)) = (NonZeroU32::new(frame.width), NonZeroU32::new(frame.height)) else {
                return Err(RenderError::InvalidSize { width: frame.width, height: frame.height });
            };
            self.surface.resize(width, height).map_err(surface_error)?;
            self.size = Some(size);
            log::debug!("Presentation surface resized to {}x{}", frame.width, frame.height);
        }

        let mut buffer = self.surface.buffer_mut().map_err(surface_error)?;
        for (dst, src) in buffer.iter_mut().zip(frame.pixels.chunks_exact(4)) {
            *dst = pack_xrgb([src[0], src[1], src[2], src[3]]);
        }
        buffer.present().map_err(surface_error)
    }
}
