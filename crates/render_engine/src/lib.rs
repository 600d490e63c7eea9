//! # Render Engine
//!
//! A small retained-mode 3D scene engine: scene graph, perspective camera,
//! orbit controls, a shadow-casting directional light, physically-inspired
//! materials, asynchronous asset loading and a typed debug panel.
//!
//! ## Features
//!
//! - **Scene Graph**: Arena-backed node hierarchy with cached world matrices
//! - **Shadows**: Directional light shadow maps with Basic/PCF/PCFSoft filtering
//! - **Image-Based Lighting**: Equirectangular HDR backgrounds and ambient lighting
//! - **Tone Mapping**: Linear, Reinhard, Cineon and ACES Filmic operators
//! - **Assets**: glTF/GLB models, PNG/JPEG textures and Radiance HDR maps
//! - **Debug Panel**: Typed live bindings with range, toggle, colour and choice controls,
//!   drawn as an on-screen overlay
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let viewport = Viewport::new(1280, 720, 1.0);
//!     let mut scene = Scene::new();
//!     let mut camera = PerspectiveCamera::perspective(
//!         Vec3::new(4.0, 5.0, 4.0), 75.0, viewport.aspect(), 0.1, 100.0,
//!     );
//!     camera.look_at(Vec3::new(0.0, 3.5, 0.0));
//!
//!     let backend = SoftwareRasterizer::new(viewport.width, viewport.height);
//!     let mut renderer = Renderer::new(Box::new(backend), RendererOptions::default());
//!     renderer.set_size(viewport.width, viewport.height)?;
//!     renderer.render(&mut scene, &camera)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod render;
pub mod controls;
pub mod assets;
pub mod debug;
pub mod frame_loop;
pub mod window;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, AssetLoader, HdrImage, ImageData, Model, TextureSink},
        config::{Config, ConfigError},
        controls::OrbitControls,
        debug::{DebugPanel, PanelError, PanelOverlay, PanelValue},
        foundation::math::{Mat4, Mat4Ext, Quat, Transform, Vec3},
        frame_loop::{run_frame_loop, FrameHost, FrameSignal, StopFlag},
        render::{
            CameraHelper, Color, ColorSpace, DirectionalLight, EnvironmentMap, Geometry,
            PerspectiveCamera, Presenter, RecordingBackend, RenderBackend, RenderError, Renderer,
            RendererOptions, ShadowMapType, SoftwareRasterizer, StandardMaterial, TextureHandle,
            ToneMapping, Viewport,
        },
        scene::{MeshNode, Node, NodeId, NodeKind, Scene, ShadowFlags},
    };
}
