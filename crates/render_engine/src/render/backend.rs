//! # Render Backend Abstraction
//!
//! The [`Renderer`](crate::render::Renderer) resolves the scene graph into a
//! flat [`FrameData`] every frame and hands it to a [`RenderBackend`]. Backends
//! never see the scene graph itself: world matrices, light directions and
//! shadow matrices are already computed.
//!
//! Two backends ship with the engine:
//! - [`SoftwareRasterizer`](crate::render::SoftwareRasterizer): CPU reference
//!   renderer that produces an RGBA8 image
//! - [`RecordingBackend`]: keeps a summary of each frame, for headless runs
//!   and tests

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::foundation::math::{Mat3, Mat4, Vec3};
use crate::render::{
    environment::EnvironmentMap, helpers::DebugLine, material::StandardMaterial, mesh::Geometry,
    renderer::ShadowMapSettings, texture::TextureStore, tone_mapping::ToneMapping,
};
use crate::scene::{NodeId, ShadowFlags};

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Renderer or backend setup failed
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A frame could not be produced
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Output surface size is unusable
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// One mesh to draw this frame
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    /// Owning scene node
    pub node: NodeId,
    /// Object-space geometry
    pub geometry: &'a Geometry,
    /// Surface description
    pub material: &'a StandardMaterial,
    /// Object-to-world transform
    pub world: Mat4,
    /// Inverse-transpose of the world matrix's upper 3x3
    pub normal_matrix: Mat3,
    /// Shadow participation
    pub shadow: ShadowFlags,
}

/// Shadow parameters resolved for one light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowData {
    /// World to shadow clip space
    pub view_projection: Mat4,
    /// Depth comparison offset
    pub bias: f32,
    /// World-space offset along the receiver normal
    pub normal_bias: f32,
    /// Shadow map size in texels
    pub map_size: (u32, u32),
}

/// A directional light resolved to world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    /// Owning scene node
    pub node: NodeId,
    /// World-space position
    pub position: Vec3,
    /// Unit direction the light travels
    pub direction: Vec3,
    /// Colour times intensity
    pub radiance: Vec3,
    /// Present when the light casts shadows and shadows are enabled
    pub shadow: Option<ShadowData>,
}

/// Everything a backend needs to produce one frame
#[derive(Debug, Clone)]
pub struct FrameData<'a> {
    /// Monotonic frame counter
    pub frame_index: u64,
    /// Drawing buffer size in physical pixels
    pub width: u32,
    /// Drawing buffer size in physical pixels
    pub height: u32,
    /// World to view
    pub view: Mat4,
    /// View to clip
    pub projection: Mat4,
    /// Camera world position
    pub camera_position: Vec3,
    /// Meshes in traversal order
    pub draws: Vec<DrawItem<'a>>,
    /// Directional lights
    pub lights: Vec<LightData>,
    /// Helper line segments
    pub lines: Vec<DebugLine>,
    /// Backdrop behind all geometry
    pub background: Option<&'a EnvironmentMap>,
    /// Ambient lighting source
    pub environment: Option<&'a EnvironmentMap>,
    /// Scale on the ambient environment term
    pub environment_intensity: f32,
    /// Texture storage referenced by materials
    pub textures: &'a TextureStore,
    /// HDR to display operator
    pub tone_mapping: ToneMapping,
    /// Exposure fed to the tone mapper
    pub exposure: f32,
    /// Shadow filtering configuration
    pub shadow_map: ShadowMapSettings,
    /// Multisampling request
    pub antialias: bool,
}

impl FrameData<'_> {
    /// Total triangles across all draws
    pub fn triangle_count(&self) -> usize {
        self.draws.iter().map(|d| d.geometry.triangle_count()).sum()
    }
}

/// # Render Backend Trait
///
/// Implemented by anything that can turn a [`FrameData`] into pixels (or,
/// for recording backends, into a log entry).
pub trait RenderBackend {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Resize the output surface to `width` x `height` physical pixels
    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()>;

    /// Produce one frame
    fn render_frame(&mut self, frame: &FrameData<'_>) -> BackendResult<()>;

    /// Last rendered image as tightly packed RGBA8, if the backend keeps one
    fn read_pixels(&self) -> Option<(u32, u32, &[u8])> {
        None
    }
}

/// Summary of one frame seen by a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    /// Frame counter from the renderer
    pub frame_index: u64,
    /// Drawing buffer size
    pub size: (u32, u32),
    /// Projection matrix used
    pub projection: Mat4,
    /// Camera position used
    pub camera_position: Vec3,
    /// Number of meshes drawn
    pub draw_count: usize,
    /// Number of triangles submitted
    pub triangle_count: usize,
    /// Meshes flagged to cast shadows
    pub shadow_casters: usize,
    /// Meshes flagged to receive shadows
    pub shadow_receivers: usize,
    /// Resolved lights
    pub lights: Vec<LightData>,
    /// Helper line count
    pub line_count: usize,
    /// Whether a background was set
    pub has_background: bool,
    /// Ambient scale
    pub environment_intensity: f32,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Exposure
    pub exposure: f32,
}

/// Shared list of recorded frames
pub type FrameLog = Arc<Mutex<Vec<FrameSummary>>>;

/// Backend that records what it was asked to draw
#[derive(Debug, Default)]
pub struct RecordingBackend {
    size: (u32, u32),
    log: FrameLog,
}

impl RecordingBackend {
    /// Create a backend with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the log, usable after the backend has been boxed into a renderer
    pub fn log(&self) -> FrameLog {
        Arc::clone(&self.log)
    }

    /// Current surface size
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        self.size = (width, height);
        Ok(())
    }

    fn render_frame(&mut self, frame: &FrameData<'_>) -> BackendResult<()> {
        let count = |flag: ShadowFlags| frame.draws.iter().filter(|d| d.shadow.contains(flag)).count();
        let summary = FrameSummary {
            frame_index: frame.frame_index,
            size: (frame.width, frame.height),
            projection: frame.projection,
            camera_position: frame.camera_position,
            draw_count: frame.draws.len(),
            triangle_count: frame.triangle_count(),
            shadow_casters: count(ShadowFlags::CAST),
            shadow_receivers: count(ShadowFlags::RECEIVE),
            lights: frame.lights.clone(),
            line_count: frame.lines.len(),
            has_background: frame.background.is_some(),
            environment_intensity: frame.environment_intensity,
            tone_mapping: frame.tone_mapping,
            exposure: frame.exposure,
        };
        log::trace!("Recorded frame {} ({} draws)", summary.frame_index, summary.draw_count);

        self.log
            .lock()
            .map_err(|_| RenderError::BackendError("frame log lock poisoned".to_string()))?
            .push(summary);
        Ok(())
    }
}
