//! Colour values
//!
//! Colours are stored as linear-light RGB so lighting math can use them
//! directly. Hex and CSS notations are interpreted as sRGB and converted on
//! the way in and out, so `Color::from_hex(h).to_hex() == h` for every 24-bit
//! value.

use crate::foundation::math::Vec3;

/// Linear-light RGB colour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red component (linear)
    pub r: f32,
    /// Green component (linear)
    pub g: f32,
    /// Blue component (linear)
    pub b: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0 };

    /// Black
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };

    /// Create a colour from linear components
    pub const fn linear(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a colour from a 24-bit sRGB hex value (`0xRRGGBB`)
    pub fn from_hex(hex: u32) -> Self {
        let mut color = Self::BLACK;
        color.set_hex(hex);
        color
    }

    /// Parse a CSS-style `#rrggbb` or `#rgb` string
    pub fn from_css(text: &str) -> Option<Self> {
        let digits = text.trim().strip_prefix('#')?;
        let hex = match digits.len() {
            6 => u32::from_str_radix(digits, 16).ok()?,
            3 => {
                let short = u32::from_str_radix(digits, 16).ok()?;
                let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
                (r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11)
            }
            _ => return None,
        };
        Some(Self::from_hex(hex))
    }

    /// Overwrite this colour with a 24-bit sRGB hex value
    pub fn set_hex(&mut self, hex: u32) {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        self.r = channel(16);
        self.g = channel(8);
        self.b = channel(0);
    }

    /// Encode this colour as a 24-bit sRGB hex value
    pub fn to_hex(&self) -> u32 {
        let channel = |value: f32| (linear_to_srgb(value).clamp(0.0, 1.0) * 255.0).round() as u32;
        channel(self.r) << 16 | channel(self.g) << 8 | channel(self.b)
    }

    /// Format as a CSS `#rrggbb` string
    pub fn to_css(&self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    /// Components as a vector for lighting math
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// Hue, saturation and lightness of the sRGB-encoded colour, each in `[0, 1]`
    pub fn to_hsl(&self) -> (f32, f32, f32) {
        let r = linear_to_srgb(self.r).clamp(0.0, 1.0);
        let g = linear_to_srgb(self.g).clamp(0.0, 1.0);
        let b = linear_to_srgb(self.b).clamp(0.0, 1.0);

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (min + max) * 0.5;

        if (max - min).abs() <= f32::EPSILON {
            return (0.0, 0.0, lightness);
        }

        let delta = max - min;
        let saturation = if lightness <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        let hue = if (max - r).abs() <= f32::EPSILON {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if (max - g).abs() <= f32::EPSILON {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        (hue / 6.0, saturation, lightness)
    }

    /// Set from sRGB hue, saturation and lightness
    pub fn set_hsl(&mut self, hue: f32, saturation: f32, lightness: f32) {
        let hue = hue.rem_euclid(1.0);
        let saturation = saturation.clamp(0.0, 1.0);
        let lightness = lightness.clamp(0.0, 1.0);

        let (r, g, b) = if saturation == 0.0 {
            (lightness, lightness, lightness)
        } else {
            let p = if lightness <= 0.5 {
                lightness * (1.0 + saturation)
            } else {
                lightness + saturation - lightness * saturation
            };
            let q = 2.0 * lightness - p;
            (
                hue_to_rgb(q, p, hue + 1.0 / 3.0),
                hue_to_rgb(q, p, hue),
                hue_to_rgb(q, p, hue - 1.0 / 3.0),
            )
        };

        self.r = srgb_to_linear(r);
        self.g = srgb_to_linear(g);
        self.b = srgb_to_linear(b);
    }

    /// Shift hue, saturation and lightness by the given offsets
    pub fn offset_hsl(&mut self, hue: f32, saturation: f32, lightness: f32) {
        let (h, s, l) = self.to_hsl();
        self.set_hsl(h + hue, s + saturation, l + lightness);
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// sRGB transfer function: encoded value to linear light
pub fn srgb_to_linear(value: f32) -> f32 {
    if value < 0.04045 {
        value * 0.077_399_38
    } else {
        (value * 0.947_867_3 + 0.052_132_7).powf(2.4)
    }
}

/// Inverse sRGB transfer function: linear light to encoded value
pub fn linear_to_srgb(value: f32) -> f32 {
    if value < 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(0.416_666_66) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hex_round_trip() {
        for hex in [0x000000, 0xffffff, 0xff00ff, 0x336699, 0x010203, 0x7f7f7f, 0xfedcba] {
            assert_eq!(Color::from_hex(hex).to_hex(), hex, "hex {:06x}", hex);
        }
    }

    #[test]
    fn test_every_channel_value_round_trips() {
        for value in 0..=255u32 {
            let hex = value << 16 | (255 - value) << 8 | value;
            assert_eq!(Color::from_hex(hex).to_hex(), hex);
        }
    }

    #[test]
    fn test_magenta_is_linear() {
        let magenta = Color::from_css("#ff00ff").unwrap();
        assert_relative_eq!(magenta.r, 1.0, epsilon = 1e-6);
        assert_relative_eq!(magenta.g, 0.0, epsilon = 1e-6);
        assert_relative_eq!(magenta.b, 1.0, epsilon = 1e-6);
        assert_eq!(magenta.to_css(), "#ff00ff");
    }

    #[test]
    fn test_css_short_form_and_rejects() {
        assert_eq!(Color::from_css("#f0f").map(|c| c.to_hex()), Some(0xff00ff));
        assert!(Color::from_css("ff00ff").is_none());
        assert!(Color::from_css("#12345").is_none());
    }

    #[test]
    fn test_hsl_offset_rotates_hue() {
        let mut red = Color::from_hex(0xff0000);
        red.offset_hsl(1.0 / 3.0, 0.0, 0.0);
        assert_eq!(red.to_hex(), 0x00ff00);

        let (h, s, l) = Color::from_hex(0x0000ff).to_hsl();
        assert_relative_eq!(h, 2.0 / 3.0, epsilon = 1e-5);
        assert_relative_eq!(s, 1.0, epsilon = 1e-5);
        assert_relative_eq!(l, 0.5, epsilon = 1e-5);
    }
}
