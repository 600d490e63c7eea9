//! Physically based surface material

use crate::render::{texture::TextureHandle, Color};

/// Metallic-roughness surface description
///
/// Scalar factors multiply the matching texture channel when a map is set.
/// AO, roughness and metalness maps follow the packed ARM layout: ambient
/// occlusion in red, roughness in green, metalness in blue. All three may
/// point at the same texture.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    /// Label for diagnostics
    pub name: String,
    /// Base colour (linear)
    pub color: Color,
    /// Perceptual roughness in `[0, 1]`
    pub roughness: f32,
    /// Metalness in `[0, 1]`
    pub metalness: f32,
    /// Strength of the ambient occlusion map
    pub ao_map_intensity: f32,
    /// Base colour map
    pub map: Option<TextureHandle>,
    /// Tangent-space normal map
    pub normal_map: Option<TextureHandle>,
    /// Ambient occlusion map (red channel)
    pub ao_map: Option<TextureHandle>,
    /// Roughness map (green channel)
    pub roughness_map: Option<TextureHandle>,
    /// Metalness map (blue channel)
    pub metalness_map: Option<TextureHandle>,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            name: String::from("standard"),
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 0.0,
            ao_map_intensity: 1.0,
            map: None,
            normal_map: None,
            ao_map: None,
            roughness_map: None,
            metalness_map: None,
        }
    }
}

impl StandardMaterial {
    /// Create a white, fully rough dielectric
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the base colour
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set roughness and metalness factors
    #[must_use]
    pub fn with_roughness_metalness(mut self, roughness: f32, metalness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    /// Set the base colour map
    #[must_use]
    pub fn with_map(mut self, map: Option<TextureHandle>) -> Self {
        self.map = map;
        self
    }

    /// Set the normal map
    #[must_use]
    pub fn with_normal_map(mut self, normal_map: Option<TextureHandle>) -> Self {
        self.normal_map = normal_map;
        self
    }

    /// Use one packed texture for AO, roughness and metalness
    #[must_use]
    pub fn with_arm_map(mut self, arm: TextureHandle) -> Self {
        self.ao_map = Some(arm);
        self.roughness_map = Some(arm);
        self.metalness_map = Some(arm);
        self
    }

    /// Every texture this material references
    pub fn textures(&self) -> impl Iterator<Item = TextureHandle> {
        [self.map, self.normal_map, self.ao_map, self.roughness_map, self.metalness_map]
            .into_iter()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::texture::{ColorSpace, TextureStore};

    #[test]
    fn test_defaults_match_standard_material() {
        let material = StandardMaterial::new();
        assert_eq!(material.color, Color::WHITE);
        assert_eq!(material.roughness, 1.0);
        assert_eq!(material.metalness, 0.0);
        assert_eq!(material.textures().count(), 0);
    }

    #[test]
    fn test_arm_map_fills_three_slots() {
        let mut store = TextureStore::new();
        let arm = store.reserve("arm", ColorSpace::None);
        let normal = store.reserve("normal", ColorSpace::None);

        let material = StandardMaterial::new().with_normal_map(Some(normal)).with_arm_map(arm);
        assert_eq!(material.ao_map, Some(arm));
        assert_eq!(material.roughness_map, Some(arm));
        assert_eq!(material.metalness_map, Some(arm));
        assert_eq!(material.textures().count(), 4);
    }
}
