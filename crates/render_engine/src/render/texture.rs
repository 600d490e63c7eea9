//! Textures and the texture store
//!
//! A texture is registered as soon as a load is issued and receives its pixels
//! when the load completes, so materials can reference it immediately. Until
//! then sampling returns `None` and shading falls back to the material's
//! scalar factors.

use slotmap::SlotMap;

use crate::assets::ImageData;
use crate::foundation::math::{Vec2, Vec4};
use crate::render::color::srgb_to_linear;

slotmap::new_key_type! {
    /// Handle to a texture inside a [`TextureStore`]
    pub struct TextureHandle;
}

/// How stored texel values should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Raw data, sampled as-is
    #[default]
    None,
    /// sRGB-encoded colour, decoded to linear when sampled
    Srgb,
    /// Already linear colour
    LinearSrgb,
}

/// A 2D texture, possibly still waiting for its image
#[derive(Debug, Clone)]
pub struct Texture {
    /// Source path or label, for diagnostics
    pub name: String,
    /// Interpretation of the RGB channels
    pub color_space: ColorSpace,
    /// Whether v=0 addresses the bottom image row
    pub flip_y: bool,
    image: Option<ImageData>,
    version: u32,
}

impl Texture {
    /// Create a texture with no image yet
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color_space: ColorSpace::None,
            flip_y: true,
            image: None,
            version: 0,
        }
    }

    /// Create a texture from an already decoded image
    pub fn from_image(name: impl Into<String>, image: ImageData) -> Self {
        let mut texture = Self::pending(name);
        texture.set_image(image);
        texture
    }

    /// Install pixels and bump the version
    pub fn set_image(&mut self, image: ImageData) {
        self.image = Some(image);
        self.version += 1;
    }

    /// Decoded image, if loaded
    pub fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    /// Whether the image has arrived
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Number of times the image has been replaced
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Bilinear sample with repeat wrapping
    ///
    /// Returns RGBA in `[0, 1]`. RGB is decoded to linear before filtering
    /// when the colour space is sRGB.
    pub fn sample(&self, uv: Vec2) -> Option<Vec4> {
        let image = self.image.as_ref()?;
        if image.width == 0 || image.height == 0 {
            return None;
        }

        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        let v = if self.flip_y { 1.0 - v } else { v };

        // Texel centres sit at half-integer coordinates
        let x = u * image.width as f32 - 0.5;
        let y = v * image.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);

        let wrap = |i: f32, size: u32| (i as i64).rem_euclid(i64::from(size)) as u32;
        let (left, right) = (wrap(x0, image.width), wrap(x0 + 1.0, image.width));
        let (top, bottom) = (wrap(y0, image.height), wrap(y0 + 1.0, image.height));

        let upper = self.texel(image, left, top)?.lerp(&self.texel(image, right, top)?, fx);
        let lower = self.texel(image, left, bottom)?.lerp(&self.texel(image, right, bottom)?, fx);
        Some(upper.lerp(&lower, fy))
    }

    fn texel(&self, image: &ImageData, x: u32, y: u32) -> Option<Vec4> {
        let offset = ((y * image.width + x) * 4) as usize;
        let texel = image.data.get(offset..offset + 4)?;

        let channel = |value: u8| f32::from(value) / 255.0;
        let (r, g, b) = (channel(texel[0]), channel(texel[1]), channel(texel[2]));
        let rgb = match self.color_space {
            ColorSpace::Srgb => (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b)),
            ColorSpace::None | ColorSpace::LinearSrgb => (r, g, b),
        };
        Some(Vec4::new(rgb.0, rgb.1, rgb.2, channel(texel[3])))
    }
}

/// Owner of every texture in a scene
#[derive(Debug, Default)]
pub struct TextureStore {
    textures: SlotMap<TextureHandle, Texture>,
}

impl TextureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture and return its handle
    pub fn insert(&mut self, texture: Texture) -> TextureHandle {
        self.textures.insert(texture)
    }

    /// Register a texture whose image will arrive later
    pub fn reserve(&mut self, name: impl Into<String>, color_space: ColorSpace) -> TextureHandle {
        let mut texture = Texture::pending(name);
        texture.color_space = color_space;
        self.textures.insert(texture)
    }

    /// Deliver the image for a reserved texture; returns false for unknown handles
    pub fn fulfill(&mut self, handle: TextureHandle, image: ImageData) -> bool {
        match self.textures.get_mut(handle) {
            Some(texture) => {
                log::debug!("Texture '{}' ready ({}x{})", texture.name, image.width, image.height);
                texture.set_image(image);
                true
            }
            None => false,
        }
    }

    /// Look up a texture
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    /// Look up a texture mutably
    pub fn get_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        self.textures.get_mut(handle)
    }

    /// Sample through an optional handle
    pub fn sample(&self, handle: Option<TextureHandle>, uv: Vec2) -> Option<Vec4> {
        self.textures.get(handle?)?.sample(uv)
    }

    /// Number of registered textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether no textures are registered
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Number of textures still waiting for their image
    pub fn pending_count(&self) -> usize {
        self.textures.values().filter(|t| !t.is_loaded()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_row_image() -> ImageData {
        // Top row red, bottom row blue
        ImageData {
            data: vec![255, 0, 0, 255, 255, 0, 0, 255, 0, 0, 255, 255, 0, 0, 255, 255],
            width: 2,
            height: 2,
            channels: 4,
        }
    }

    #[test]
    fn test_pending_texture_samples_nothing() {
        let mut store = TextureStore::new();
        let handle = store.reserve("wall", ColorSpace::Srgb);
        assert_eq!(store.pending_count(), 1);
        assert!(store.sample(Some(handle), Vec2::new(0.5, 0.5)).is_none());

        assert!(store.fulfill(handle, two_row_image()));
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.get(handle).unwrap().version(), 1);
    }

    #[test]
    fn test_flip_y_addresses_bottom_row_at_v_zero() {
        let mut texture = Texture::from_image("rows", two_row_image());
        let bottom = texture.sample(Vec2::new(0.25, 0.25)).unwrap();
        assert_relative_eq!(bottom, Vec4::new(0.0, 0.0, 1.0, 1.0), epsilon = 1e-6);

        texture.flip_y = false;
        let top = texture.sample(Vec2::new(0.25, 0.25)).unwrap();
        assert_relative_eq!(top, Vec4::new(1.0, 0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_bilinear_blends_between_texel_centres() {
        let mut texture = Texture::from_image("rows", two_row_image());
        texture.flip_y = false;

        let between = texture.sample(Vec2::new(0.25, 0.5)).unwrap();
        assert_relative_eq!(between, Vec4::new(0.5, 0.0, 0.5, 1.0), epsilon = 1e-6);

        let quarter = texture.sample(Vec2::new(0.25, 0.375)).unwrap();
        assert_relative_eq!(quarter, Vec4::new(0.75, 0.0, 0.25, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_srgb_decoding() {
        let grey = ImageData::solid_color(1, 1, [128, 128, 128, 255]);
        let mut texture = Texture::from_image("grey", grey);

        let raw = texture.sample(Vec2::zeros()).unwrap();
        assert_relative_eq!(raw.x, 128.0 / 255.0, epsilon = 1e-6);

        texture.color_space = ColorSpace::Srgb;
        let decoded = texture.sample(Vec2::zeros()).unwrap();
        assert_relative_eq!(decoded.x, srgb_to_linear(128.0 / 255.0), epsilon = 1e-6);
        assert!(decoded.x < raw.x);
    }

    #[test]
    fn test_repeat_wrapping() {
        let texture = Texture::from_image("rows", two_row_image());
        let wrapped = texture.sample(Vec2::new(1.25, 1.1)).unwrap();
        let direct = texture.sample(Vec2::new(0.25, 0.1)).unwrap();
        assert_relative_eq!(wrapped, direct, epsilon = 1e-6);
    }
}
