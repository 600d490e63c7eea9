//! Showcase configuration
//!
//! Every field has a default, and running without a configuration file
//! builds the stock showcase scene.

use std::path::PathBuf;

use render_engine::config::Config;
use render_engine::foundation::math::Vec3;
use render_engine::render::{ShadowMapType, ToneMapping};
use serde::{Deserialize, Serialize};

/// Full showcase configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Window settings
    pub window: WindowSettings,
    /// Asset locations
    pub assets: AssetSettings,
    /// Camera and orbit controls
    pub camera: CameraSettings,
    /// Directional light
    pub light: LightSettings,
    /// Shadow map
    pub shadow: ShadowSettings,
    /// Renderer output
    pub renderer: RendererSettings,
    /// How the frame loop is driven
    pub run: RunSettings,
}

impl Config for SceneConfig {}

/// Window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Title bar text
    pub title: String,
    /// Initial width in screen units
    pub width: u32,
    /// Initial height in screen units
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Realistic Render".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Colour, normal and packed AO/roughness/metalness maps of one surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTextures {
    /// Albedo
    pub color: PathBuf,
    /// Tangent-space normal map (OpenGL convention)
    pub normal: PathBuf,
    /// AO in R, roughness in G, metalness in B
    pub arm: PathBuf,
}

impl SurfaceTextures {
    fn poly_haven(set: &str) -> Self {
        let base = PathBuf::from("textures").join(set);
        Self {
            color: base.join(format!("{set}_diff_1k.jpg")),
            normal: base.join(format!("{set}_nor_gl_1k.png")),
            arm: base.join(format!("{set}_arm_1k.jpg")),
        }
    }
}

/// Asset locations, relative to `root`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory every other path is resolved against
    pub root: PathBuf,
    /// Equirectangular HDR panorama
    pub environment_map: PathBuf,
    /// Flight helmet glTF
    pub helmet: PathBuf,
    /// Hamburger GLB
    pub burger: PathBuf,
    /// Wall textures
    pub wall: SurfaceTextures,
    /// Floor textures
    pub floor: SurfaceTextures,
    /// Decode the floor colour map as sRGB
    ///
    /// Off by default, so the floor colour map samples as raw data like the
    /// wall's does.
    pub floor_color_srgb: bool,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static"),
            environment_map: PathBuf::from("environmentMaps/0/2k.hdr"),
            helmet: PathBuf::from("models/FlightHelmet/glTF/FlightHelmet.gltf"),
            burger: PathBuf::from("models/hamburger.glb"),
            wall: SurfaceTextures::poly_haven("castle_brick_broken_06"),
            floor: SurfaceTextures::poly_haven("wood_cabinet_worn_long"),
            floor_color_srgb: false,
        }
    }
}

/// Camera and orbit controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
    /// Initial position
    pub position: [f32; 3],
    /// Orbit pivot
    pub target: [f32; 3],
    /// Smooth orbit motion
    pub damping: bool,
    /// Fraction of the remaining motion applied per frame
    pub damping_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 100.0,
            position: [4.0, 5.0, 4.0],
            target: [0.0, 3.5, 0.0],
            damping: true,
            damping_factor: 0.05,
        }
    }
}

/// Directional light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// sRGB colour, `0xRRGGBB`
    pub color: u32,
    /// Intensity multiplier
    pub intensity: f32,
    /// Light position
    pub position: [f32; 3],
    /// Aim point
    pub target: [f32; 3],
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            color: 0xff00ff,
            intensity: 6.0,
            position: [-5.0, 6.5, 2.5],
            target: [0.0, 4.0, 0.0],
        }
    }
}

/// Shadow map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Renderer-wide shadow switch
    pub enabled: bool,
    /// Filtering mode
    pub kind: ShadowMapType,
    /// Whether the light casts shadows
    pub cast_shadow: bool,
    /// Far plane of the shadow camera
    pub camera_far: f32,
    /// Shadow map side in texels
    pub map_size: u32,
    /// Offset along the surface normal
    pub normal_bias: f32,
    /// Depth comparison offset
    pub bias: f32,
    /// Draw the shadow camera frustum
    pub helper: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: ShadowMapType::Pcf,
            cast_shadow: true,
            camera_far: 15.0,
            map_size: 512,
            normal_bias: 0.027,
            bias: -0.004,
            helper: true,
        }
    }
}

/// Renderer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Request multisampled output
    pub antialias: bool,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Exposure fed to the tone mapper
    pub exposure: f32,
    /// Scale of the environment's ambient contribution
    pub environment_intensity: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
            environment_intensity: 1.0,
        }
    }
}

/// How the frame loop is driven
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Render without opening a window
    pub headless: bool,
    /// Frames to render in headless mode
    pub frames: u32,
    /// Seconds a headless run waits for assets before the first frame
    pub asset_wait_secs: f32,
    /// Pixel ratio assumed in headless mode
    pub device_pixel_ratio: f32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            headless: false,
            frames: 3,
            asset_wait_secs: 30.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// `[x, y, z]` as a vector
pub fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.light.color, 0xff00ff);
        assert_eq!(config.shadow.map_size, 512);
        assert_eq!(config.renderer.tone_mapping, ToneMapping::AcesFilmic);
        assert!(!config.assets.floor_color_srgb);
        assert_eq!(
            config.assets.wall.arm,
            PathBuf::from("textures/castle_brick_broken_06/castle_brick_broken_06_arm_1k.jpg")
        );
        assert_eq!(
            config.assets.floor.normal,
            PathBuf::from("textures/wood_cabinet_worn_long/wood_cabinet_worn_long_nor_gl_1k.png")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("showcase_partial_{}.toml", std::process::id()));
        std::fs::write(&path, "[run]\nheadless = true\nframes = 10\n\n[renderer]\ntone_mapping = \"Reinhard\"\n").unwrap();

        let config = SceneConfig::load_from_file(&path).unwrap();
        assert!(config.run.headless);
        assert_eq!(config.run.frames, 10);
        assert_eq!(config.renderer.tone_mapping, ToneMapping::Reinhard);
        assert_eq!(config.camera, CameraSettings::default());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_ron_round_trip() {
        let path = std::env::temp_dir().join(format!("showcase_round_trip_{}.ron", std::process::id()));
        let mut config = SceneConfig::default();
        config.shadow.kind = ShadowMapType::PcfSoft;
        config.assets.floor_color_srgb = true;

        config.save_to_file(&path).unwrap();
        assert_eq!(SceneConfig::load_from_file(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }
}
