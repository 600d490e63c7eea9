//! Directional light with shadow mapping
//!
//! A directional light emits parallel rays. Its *position* is the transform
//! of the scene node that owns it; its *direction* runs from that position
//! towards a separate [`LightTarget`]. The target is not part of the scene
//! graph, so its world matrix only changes when
//! [`LightTarget::update_matrix`] is called.
//!
//! Shadows are rendered from an orthographic [`OrthographicCamera`] placed at
//! the light and aimed at the target.

use crate::foundation::math::{utils, Mat4, Vec3};
use crate::render::{camera::OrthographicCamera, Color};

/// Aim point of a directional light
#[derive(Debug, Clone)]
pub struct LightTarget {
    /// Local position; only takes effect after [`update_matrix`](Self::update_matrix)
    pub position: Vec3,
    matrix_world: Mat4,
}

impl Default for LightTarget {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            matrix_world: Mat4::identity(),
        }
    }
}

impl LightTarget {
    /// Rebuild the world matrix from the current position
    pub fn update_matrix(&mut self) {
        self.matrix_world = Mat4::new_translation(&self.position);
    }

    /// World matrix as of the last [`update_matrix`](Self::update_matrix)
    pub fn matrix_world(&self) -> &Mat4 {
        &self.matrix_world
    }

    /// World-space position as of the last update
    pub fn world_position(&self) -> Vec3 {
        utils::translation_of(&self.matrix_world)
    }
}

/// Shadow parameters for a directional light
#[derive(Debug, Clone)]
pub struct DirectionalLightShadow {
    /// Virtual camera the shadow map is rendered from
    pub camera: OrthographicCamera,
    /// Depth offset applied when comparing against the shadow map
    pub bias: f32,
    /// World-space offset along the surface normal before the comparison
    pub normal_bias: f32,
    /// Shadow map resolution in texels (width, height)
    pub map_size: (u32, u32),
    view_projection: Mat4,
}

impl Default for DirectionalLightShadow {
    fn default() -> Self {
        Self {
            camera: OrthographicCamera::new(-5.0, 5.0, 5.0, -5.0, 0.5, 500.0),
            bias: 0.0,
            normal_bias: 0.0,
            map_size: (512, 512),
            view_projection: Mat4::identity(),
        }
    }
}

impl DirectionalLightShadow {
    /// Place the shadow camera at the light and aim it at the target
    pub fn update_matrices(&mut self, light_position: Vec3, target_position: Vec3) {
        self.camera.position = light_position;
        self.camera.target = target_position;
        self.view_projection = self.camera.view_projection_matrix();
    }

    /// World-to-shadow-clip transform from the last [`update_matrices`](Self::update_matrices)
    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }
}

/// Directional light source
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    /// Light colour
    pub color: Color,
    /// Light intensity multiplier
    pub intensity: f32,
    /// Whether this light renders a shadow map
    pub cast_shadow: bool,
    /// Shadow configuration
    pub shadow: DirectionalLightShadow,
    /// Aim point
    pub target: LightTarget,
}

impl DirectionalLight {
    /// Create a light aimed at the origin with shadows disabled
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            cast_shadow: false,
            shadow: DirectionalLightShadow::default(),
            target: LightTarget::default(),
        }
    }

    /// Direction light travels, given the light's world position
    pub fn direction(&self, light_position: Vec3) -> Vec3 {
        let towards = self.target.world_position() - light_position;
        if towards.norm_squared() > 0.0 {
            towards.normalize()
        } else {
            Vec3::new(0.0, -1.0, 0.0)
        }
    }

    /// Colour premultiplied by intensity
    pub fn radiance(&self) -> Vec3 {
        self.color.to_vec3() * self.intensity
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Color::WHITE, 1.0)
    }
}
