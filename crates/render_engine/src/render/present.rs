//! Frame presentation
//!
//! A [`Presenter`] puts a finished RGBA8 image on screen. The window-backed
//! presenter lives in [`crate::window`]; [`RecordingPresenter`] keeps what it
//! was handed, for headless runs and tests.

use crate::render::backend::{BackendResult, RenderError};

/// A finished frame: tightly packed RGBA8, row 0 at the top
#[derive(Debug, Clone, Copy)]
pub struct FrameImage<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height * 4` bytes
    pub pixels: &'a [u8],
}

impl<'a> FrameImage<'a> {
    /// Wrap `pixels`, checking the length matches the size
    pub fn new(width: u32, height: u32, pixels: &'a [u8]) -> BackendResult<Self> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
            return Err(RenderError::InvalidSize { width, height });
        }
        Ok(Self { width, height, pixels })
    }

    /// RGBA of one pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.pixels.get(offset..offset + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

/// Pack an RGBA8 pixel as `0x00RRGGBB`, the layout window surfaces expect
pub const fn pack_xrgb(pixel: [u8; 4]) -> u32 {
    ((pixel[0] as u32) << 16) | ((pixel[1] as u32) << 8) | pixel[2] as u32
}

/// Anything that can show a finished frame
pub trait Presenter {
    /// Show `frame`, replacing the previous one
    fn present(&mut self, frame: &FrameImage<'_>) -> BackendResult<()>;
}

/// Presenter that keeps the sizes it was handed and a copy of the last image
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    sizes: Vec<(u32, u32)>,
    last: Vec<u8>,
}

impl RecordingPresenter {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of every presented frame, oldest first
    pub fn sizes(&self) -> &[(u32, u32)] {
        &self.sizes
    }

    /// Number of frames presented
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Last presented image
    pub fn last_frame(&self) -> Option<FrameImage<'_>> {
        let &(width, height) = self.sizes.last()?;
        FrameImage::new(width, height, &self.last).ok()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, frame: &FrameImage<'_>) -> BackendResult<()> {
        self.sizes.push((frame.width, frame.height));
        self.last.clear();
        self.last.extend_from_slice(frame.pixels);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_image_checks_length() {
        let pixels = vec![0u8; 2 * 3 * 4];
        assert!(FrameImage::new(2, 3, &pixels).is_ok());
        assert!(matches!(
            FrameImage::new(3, 3, &pixels),
            Err(RenderError::InvalidSize { width: 3, height: 3 })
        ));
        assert!(FrameImage::new(0, 0, &[]).is_err());
    }

    #[test]
    fn test_pack_xrgb_drops_alpha() {
        assert_eq!(pack_xrgb([0x12, 0x34, 0x56, 0x78]), 0x0012_3456);
        assert_eq!(pack_xrgb([255, 255, 255, 0]), 0x00ff_ffff);
    }

    #[test]
    fn test_recording_presenter_keeps_last_frame() {
        let mut presenter = RecordingPresenter::new();
        let red = [255u8, 0, 0, 255].repeat(4);
        let blue = [0u8, 0, 0xff, 255].repeat(4);
        presenter.present(&FrameImage::new(2, 2, &red).unwrap()).unwrap();
        presenter.present(&FrameImage::new(4, 1, &blue).unwrap()).unwrap();

        assert_eq!(presenter.sizes(), &[(2, 2), (4, 1)]);
        let last = presenter.last_frame().unwrap();
        assert_eq!(last.pixel(3, 0), Some([0, 0, 0xff, 255]));
        assert_eq!(last.pixel(0, 1), None);
    }
}
