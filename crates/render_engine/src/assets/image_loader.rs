//! Image loading utilities for texture data
//!
//! Provides PNG, JPEG and Radiance HDR decoding for textures and
//! environment maps.

use std::path::Path;

use crate::assets::AssetError;

/// Decoded 8-bit image ready for sampling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data, row 0 at the top
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels (always 4 for RGBA)
    pub channels: u8,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading image from: {:?}", path);

        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Self::from_bytes(&bytes).map_err(|err| err.with_path(path))?;

        log::info!("Loaded image {}x{} from {:?}", image.width, image.height, path);
        Ok(image)
    }

    /// Load image from memory, format guessed from the content
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes).map_err(|source| AssetError::Image {
            path: Path::new("<memory>").to_path_buf(),
            source,
        })?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();
        log::debug!("Decoded image {}x{} from memory", width, height);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
            channels: 4,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Decoded floating-point RGB image, used for environment maps
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Linear RGB texels, row-major, row 0 at the top
    pub pixels: Vec<[f32; 3]>,
}

impl HdrImage {
    /// Load a Radiance `.hdr` (or any decodable image) from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading HDR image from: {:?}", path);

        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Self::from_bytes(&bytes).map_err(|err| err.with_path(path))?;

        log::info!("Loaded HDR image {}x{} from {:?}", image.width, image.height, path);
        Ok(image)
    }

    /// Decode from memory; 8-bit formats are normalized to `[0, 1]`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes).map_err(|source| AssetError::Image {
            path: Path::new("<memory>").to_path_buf(),
            source,
        })?;

        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.pixels().map(|p| p.0).collect();
        Ok(Self { width, height, pixels })
    }

    /// Texel at (`x`, `y`)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::hdr::HdrEncoder, ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.channels, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_png_from_bytes() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        source.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let decoded = ImageData::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(&decoded.data[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_hdr_from_bytes_keeps_range() {
        let pixels = vec![Rgb([4.0_f32, 2.0, 0.5]); 4];
        let mut bytes = Vec::new();
        HdrEncoder::new(&mut bytes).encode(&pixels, 2, 2).unwrap();

        let decoded = HdrImage::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 2));
        let [r, g, b] = decoded.pixel(1, 1).unwrap();
        assert!((r - 4.0).abs() < 0.05 && (g - 2.0).abs() < 0.05 && (b - 0.5).abs() < 0.05);
        assert!(decoded.pixel(2, 0).is_none());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(ImageData::from_bytes(b"not an image"), Err(AssetError::Image { .. })));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ImageData::from_file("does/not/exist.png").unwrap_err();
        assert!(matches!(&err, AssetError::Io { path, .. } if path.ends_with("exist.png")));
    }
}
