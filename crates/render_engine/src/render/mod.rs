//! # Rendering
//!
//! Cameras, lights, materials, textures and the renderer that draws a
//! [`Scene`](crate::scene::Scene) through a [`RenderBackend`].
//!
//! ## Architecture
//!
//! ```text
//! Scene + PerspectiveCamera
//!      ↓  Renderer::render (world matrices, shadow cameras)
//! FrameData
//!      ↓  RenderBackend::render_frame
//! SoftwareRasterizer | RecordingBackend
//!      ↓  RenderBackend::read_pixels
//! FrameImage
//!      ↓  Presenter::present
//! WindowPresenter | RecordingPresenter
//! ```

pub mod backend;
pub mod camera;
pub mod color;
pub mod environment;
pub mod helpers;
pub mod light;
pub mod material;
pub mod mesh;
pub mod present;
pub mod renderer;
pub mod software;
pub mod texture;
pub mod tone_mapping;
pub mod viewport;

pub use backend::{
    BackendResult, DrawItem, FrameData, FrameLog, FrameSummary, LightData, RecordingBackend, RenderBackend,
    RenderError, ShadowData,
};
pub use camera::{OrthographicCamera, PerspectiveCamera};
pub use color::Color;
pub use environment::{EnvironmentMap, EnvironmentMapping};
pub use helpers::{CameraHelper, DebugLine};
pub use light::{DirectionalLight, DirectionalLightShadow, LightTarget};
pub use material::StandardMaterial;
pub use mesh::{Geometry, Vertex};
pub use present::{pack_xrgb, FrameImage, Presenter, RecordingPresenter};
pub use renderer::{RenderInfo, Renderer, RendererOptions, ShadowMapSettings, ShadowMapType};
pub use software::SoftwareRasterizer;
pub use texture::{ColorSpace, Texture, TextureHandle, TextureStore};
pub use tone_mapping::ToneMapping;
pub use viewport::{capped_pixel_ratio, Viewport, MAX_PIXEL_RATIO};
