//! On-screen rendition of the debug panel
//!
//! Draws text lines into a finished RGBA8 frame: a translucent box anchored
//! to the top-right corner, one row per line, with the selected row on a
//! highlighted band.

use crate::debug::font::{FontAtlas, FontResult};
use crate::debug::panel::{DebugPanel, PanelEntry};

const BACKGROUND: [u8; 3] = [16, 18, 24];
const BACKGROUND_ALPHA: f32 = 0.72;
const HIGHLIGHT: [u8; 3] = [62, 92, 150];
const HIGHLIGHT_ALPHA: f32 = 0.9;
const TEXT: [u8; 3] = [236, 236, 236];

/// One row of overlay text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLine {
    /// Text to draw
    pub text: String,
    /// Draw the row on the highlight band
    pub highlight: bool,
}

impl OverlayLine {
    /// Plain row
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), highlight: false }
    }
}

impl From<&PanelEntry> for OverlayLine {
    fn from(entry: &PanelEntry) -> Self {
        Self { text: entry.to_string(), highlight: entry.selected }
    }
}

/// Pixel rectangle covered by the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width, clipped to the frame
    pub width: u32,
    /// Height, clipped to the frame
    pub height: u32,
}

impl OverlayRect {
    /// Whether pixel `(x, y)` lies inside
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Text overlay drawn over finished frames
#[derive(Debug)]
pub struct PanelOverlay {
    font: FontAtlas,
    margin: u32,
    padding: u32,
}

impl PanelOverlay {
    /// Overlay using `font`, spacing scaled to its size
    pub fn new(font: FontAtlas) -> Self {
        let size = font.size();
        Self {
            margin: (size * 0.75).round() as u32,
            padding: (size * 0.5).round() as u32,
            font,
        }
    }

    /// Overlay using the bundled font at `size` pixels
    pub fn with_builtin_font(size: f32) -> FontResult<Self> {
        Ok(Self::new(FontAtlas::builtin(size)?))
    }

    /// Title row followed by one row per control, the selected one highlighted
    pub fn panel_lines<C: 'static>(panel: &DebugPanel<C>, ctx: &C) -> Vec<OverlayLine> {
        std::iter::once(OverlayLine::new(format!("[{}]", panel.title())))
            .chain(panel.entries(ctx).iter().map(OverlayLine::from))
            .collect()
    }

    fn line_height(&self) -> u32 {
        self.font.line_height().ceil().max(1.0) as u32
    }

    /// Draw `lines` into a `width` x `height` RGBA8 frame
    ///
    /// Returns the covered rectangle, or `None` when nothing was drawn.
    pub fn draw(&self, pixels: &mut [u8], width: u32, height: u32, lines: &[OverlayLine]) -> Option<OverlayRect> {
        if lines.is_empty() || width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
            return None;
        }

        let line_height = self.line_height();
        let text_width = lines
            .iter()
            .map(|line| self.font.measure(&line.text))
            .fold(0.0_f32, f32::max)
            .ceil() as u32;
        let box_width = text_width + 2 * self.padding;
        let box_height = lines.len() as u32 * line_height + 2 * self.padding;

        let x = width.saturating_sub(box_width + self.margin);
        let y = self.margin.min(height - 1);
        let rect = OverlayRect {
            x,
            y,
            width: box_width.min(width - x),
            height: box_height.min(height - y),
        };

        let mut canvas = Canvas { pixels, width, clip: rect };
        canvas.fill(rect.x, rect.y, box_width, box_height, BACKGROUND, BACKGROUND_ALPHA);

        for (row, line) in lines.iter().enumerate() {
            let top = rect.y + self.padding + row as u32 * line_height;
            if line.highlight {
                canvas.fill(rect.x, top, box_width, line_height, HIGHLIGHT, HIGHLIGHT_ALPHA);
            }
            let baseline = top as f32 + self.font.ascent();
            self.draw_text(&mut canvas, (rect.x + self.padding) as f32, baseline, &line.text);
        }

        Some(rect)
    }

    fn draw_text(&self, canvas: &mut Canvas<'_>, mut pen_x: f32, baseline: f32, text: &str) {
        for ch in text.chars() {
            let Some(glyph) = self.font.glyph(ch) else { continue };
            let left = (pen_x.round() as i64) + i64::from(glyph.xmin);
            let top = baseline.round() as i64 - glyph.height as i64 - i64::from(glyph.ymin);
            for (i, &coverage) in glyph.coverage.iter().enumerate() {
                if coverage == 0 {
                    continue;
                }
                let gx = left + (i % glyph.width) as i64;
                let gy = top + (i / glyph.width) as i64;
                canvas.blend(gx, gy, TEXT, f32::from(coverage) / 255.0);
            }
            pen_x += glyph.advance;
        }
    }
}

/// RGBA8 frame with blending clipped to one rectangle
struct Canvas<'a> {
    pixels: &'a mut [u8],
    width: u32,
    clip: OverlayRect,
}

impl Canvas<'_> {
    fn fill(&mut self, x: u32, y: u32, width: u32, height: u32, color: [u8; 3], alpha: f32) {
        for py in y..y.saturating_add(height) {
            for px in x..x.saturating_add(width) {
                self.blend(i64::from(px), i64::from(py), color, alpha);
            }
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: [u8; 3], alpha: f32) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else { return };
        if !self.clip.contains(x, y) {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let Some(dst) = self.pixels.get_mut(offset..offset + 4) else { return };
        for (d, &c) in dst.iter_mut().zip(&color) {
            let value = f32::from(*d) + (f32::from(c) - f32::from(*d)) * alpha;
            *d = value.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = 255;
    }
}
