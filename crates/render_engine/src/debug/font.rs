//! Glyph cache for on-screen text
//!
//! Rasterizes printable ASCII once with `fontdue` and keeps the coverage
//! bitmaps for the debug overlay to blend into a frame.

use std::collections::HashMap;

use fontdue::{Font, FontSettings};

/// Result type for font operations
pub type FontResult<T> = Result<T, FontError>;

/// Errors that can occur during font operations
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// Failed to load font from file or data
    #[error("Failed to load font: {0}")]
    LoadError(String),

    /// Requested size is not a positive pixel height
    #[error("Invalid font size {0}")]
    InvalidSize(f32),
}

/// Monospace font bundled with the engine
const BUILTIN_FONT: &[u8] = include_bytes!("../../resources/fonts/DejaVuSansMono.ttf");

/// Shown for characters outside the cache
const FALLBACK: char = '?';

/// One rasterized character
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Bitmap width in pixels
    pub width: usize,
    /// Bitmap height in pixels
    pub height: usize,
    /// Offset of the bitmap's left edge from the pen position
    pub xmin: i32,
    /// Offset of the bitmap's bottom edge above the baseline
    pub ymin: i32,
    /// Horizontal pen advance
    pub advance: f32,
    /// Row-major coverage, 0 = empty, 255 = solid
    pub coverage: Vec<u8>,
}

/// Printable ASCII rasterized at one pixel size
pub struct FontAtlas {
    size: f32,
    ascent: f32,
    line_height: f32,
    glyphs: HashMap<char, Glyph>,
}

impl std::fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAtlas")
            .field("size", &self.size)
            .field("glyphs", &self.glyphs.len())
            .finish_non_exhaustive()
    }
}

impl FontAtlas {
    /// Rasterize TrueType/OpenType `font_data` at `size` pixels
    pub fn new(font_data: &[u8], size: f32) -> FontResult<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(FontError::InvalidSize(size));
        }
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| FontError::LoadError(format!("fontdue error: {e}")))?;

        let (ascent, line_height) = font
            .horizontal_line_metrics(size)
            .map_or((size * 0.8, size * 1.2), |m| (m.ascent, m.new_line_size));

        let glyphs: HashMap<char, Glyph> = (' '..='~')
            .map(|ch| {
                let (metrics, coverage) = font.rasterize(ch, size);
                let glyph = Glyph {
                    width: metrics.width,
                    height: metrics.height,
                    xmin: metrics.xmin,
                    ymin: metrics.ymin,
                    advance: metrics.advance_width,
                    coverage,
                };
                (ch, glyph)
            })
            .collect();

        log::debug!("Rasterized {} glyphs at {}px", glyphs.len(), size);
        Ok(Self { size, ascent, line_height, glyphs })
    }

    /// The bundled monospace font at `size` pixels
    pub fn builtin(size: f32) -> FontResult<Self> {
        Self::new(BUILTIN_FONT, size)
    }

    /// Pixel size the glyphs were rasterized at
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Distance from the top of a line to its baseline
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// Baseline-to-baseline distance
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Glyph for `ch`, or the fallback glyph for anything uncached
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&FALLBACK))
    }

    /// Pen advance of `text` in pixels
    pub fn measure(&self, text: &str) -> f32 {
        text.chars().filter_map(|ch| self.glyph(ch)).map(|g| g.advance).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_font_caches_printable_ascii() {
        let atlas = FontAtlas::builtin(16.0).unwrap();
        assert_eq!(atlas.glyphs.len(), 95);

        let a = atlas.glyph('A').unwrap();
        assert!(a.width > 0 && a.height > 0);
        assert_eq!(a.coverage.len(), a.width * a.height);
        assert!(a.coverage.iter().any(|&c| c > 128));

        let space = atlas.glyph(' ').unwrap();
        assert!(space.coverage.iter().all(|&c| c == 0));
        assert!(space.advance > 0.0);
    }

    #[test]
    fn test_uncached_characters_fall_back() {
        let atlas = FontAtlas::builtin(16.0).unwrap();
        let fallback = atlas.glyph('?').unwrap().coverage.clone();
        assert_eq!(atlas.glyph('\u{263a}').unwrap().coverage, fallback);
    }

    #[test]
    fn test_monospace_measure() {
        let atlas = FontAtlas::builtin(20.0).unwrap();
        let one = atlas.measure("x");
        assert!(one > 0.0);
        approx::assert_relative_eq!(atlas.measure("intensity"), one * 9.0, epsilon = 1e-3);
        assert!(atlas.line_height() > atlas.ascent());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(FontAtlas::new(b"not a font", 16.0), Err(FontError::LoadError(_))));
        assert!(matches!(FontAtlas::builtin(0.0), Err(FontError::InvalidSize(_))));
        assert!(FontAtlas::builtin(f32::NAN).is_err());
    }
}
