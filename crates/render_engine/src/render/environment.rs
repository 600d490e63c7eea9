//! Equirectangular environment maps
//!
//! An HDR panorama used both as the visible background and as the source of
//! ambient image-based lighting.

use crate::assets::HdrImage;
use crate::foundation::math::{constants::PI, Vec3};

/// How an environment image is projected onto the sphere of directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvironmentMapping {
    /// Latitude/longitude panorama sampled by reflection direction
    #[default]
    EquirectangularReflection,
}

/// Linear HDR radiance addressed by world direction
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    /// Source path or label
    pub name: String,
    /// Projection of the image
    pub mapping: EnvironmentMapping,
    image: HdrImage,
    average: Vec3,
}

impl EnvironmentMap {
    /// Wrap a decoded HDR panorama
    pub fn equirectangular(name: impl Into<String>, image: HdrImage) -> Self {
        let average = average_of(&image);
        Self {
            name: name.into(),
            mapping: EnvironmentMapping::EquirectangularReflection,
            image,
            average,
        }
    }

    /// Panorama dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    /// Mean radiance over all texels, used as the diffuse ambient term
    pub fn average_radiance(&self) -> Vec3 {
        self.average
    }

    /// Radiance arriving from `direction` (need not be normalized)
    pub fn sample_direction(&self, direction: Vec3) -> Vec3 {
        let (width, height) = (self.image.width, self.image.height);
        if width == 0 || height == 0 {
            return Vec3::zeros();
        }
        let Some(dir) = direction.try_normalize(f32::EPSILON) else {
            return self.average;
        };

        let u = dir.z.atan2(dir.x) / (2.0 * PI) + 0.5;
        let v = dir.y.clamp(-1.0, 1.0).asin() / PI + 0.5;

        let x = ((u * width as f32) as u32).min(width - 1);
        let y = (((1.0 - v) * height as f32) as u32).min(height - 1);
        self.image.pixel(x, y).map_or(self.average, Vec3::from)
    }
}

fn average_of(image: &HdrImage) -> Vec3 {
    if image.pixels.is_empty() {
        return Vec3::zeros();
    }
    let sum = image
        .pixels
        .iter()
        .fold(Vec3::zeros(), |acc, p| acc + Vec3::from(*p));
    sum / image.pixels.len() as f32
}
