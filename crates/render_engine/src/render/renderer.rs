//! High-level renderer
//!
//! Owns the output surface configuration (logical size, pixel ratio, shadow
//! and tone mapping settings) and turns a [`Scene`] plus a camera into a
//! [`FrameData`] for the active [`RenderBackend`].

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Vec3};
use crate::render::backend::{BackendResult, DrawItem, FrameData, LightData, RenderBackend, ShadowData};
use crate::render::{camera::PerspectiveCamera, tone_mapping::ToneMapping, viewport::capped_pixel_ratio};
use crate::scene::{NodeId, NodeKind, Scene};

/// Shadow map filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowMapType {
    /// Single depth comparison
    Basic,
    /// 3x3 percentage-closer filtering
    #[default]
    Pcf,
    /// 5x5 percentage-closer filtering
    PcfSoft,
    /// Variance shadow maps, approximated with the soft PCF kernel
    Vsm,
}

impl ShadowMapType {
    /// Side of the square filter kernel in texels
    pub const fn kernel_size(self) -> u32 {
        match self {
            Self::Basic => 1,
            Self::Pcf => 3,
            Self::PcfSoft | Self::Vsm => 5,
        }
    }
}

/// Global shadow configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowMapSettings {
    /// Master switch; lights only render shadows when this is set
    pub enabled: bool,
    /// Filtering mode
    pub kind: ShadowMapType,
}

/// Construction options that cannot change afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererOptions {
    /// Request multisampled output
    pub antialias: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self { antialias: true }
    }
}

/// Counters from the last rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// Frames rendered so far
    pub frames: u64,
    /// Mesh draws in the last frame
    pub draw_calls: usize,
    /// Triangles in the last frame
    pub triangles: usize,
    /// Lights in the last frame
    pub lights: usize,
    /// Shadow maps rendered in the last frame
    pub shadow_maps: usize,
}

/// Scene renderer bound to one output surface
pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    options: RendererOptions,
    size: (u32, u32),
    pixel_ratio: f32,
    /// Shadow configuration
    pub shadow_map: ShadowMapSettings,
    /// HDR to display operator
    pub tone_mapping: ToneMapping,
    /// Exposure fed to the tone mapper
    pub tone_mapping_exposure: f32,
    info: RenderInfo,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("backend", &self.backend.name())
            .field("size", &self.size)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("shadow_map", &self.shadow_map)
            .field("tone_mapping", &self.tone_mapping)
            .field("tone_mapping_exposure", &self.tone_mapping_exposure)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Wrap a backend; size starts at 1x1 until [`set_size`](Self::set_size)
    pub fn new(backend: Box<dyn RenderBackend>, options: RendererOptions) -> Self {
        log::info!(
            "Renderer created (backend: {}, antialias: {})",
            backend.name(),
            options.antialias
        );
        Self {
            backend,
            options,
            size: (1, 1),
            pixel_ratio: 1.0,
            shadow_map: ShadowMapSettings::default(),
            tone_mapping: ToneMapping::None,
            tone_mapping_exposure: 1.0,
            info: RenderInfo::default(),
        }
    }

    /// Construction options
    pub fn options(&self) -> RendererOptions {
        self.options
    }

    /// Set the logical output size and resize the drawing buffer
    pub fn set_size(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.size = (width.max(1), height.max(1));
        self.resize_backend()
    }

    /// Logical output size
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Set the device pixel ratio, capped at [`MAX_PIXEL_RATIO`](crate::render::viewport::MAX_PIXEL_RATIO)
    pub fn set_pixel_ratio(&mut self, ratio: f32) -> BackendResult<()> {
        self.pixel_ratio = capped_pixel_ratio(ratio);
        self.resize_backend()
    }

    /// Applied pixel ratio
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Physical size of the drawing buffer
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).floor() as u32).max(1);
        (scale(self.size.0), scale(self.size.1))
    }

    /// Counters from the last frame
    pub fn info(&self) -> RenderInfo {
        self.info
    }

    /// Active backend
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    fn resize_backend(&mut self) -> BackendResult<()> {
        let (width, height) = self.drawing_buffer_size();
        log::debug!("Resizing {} backend to {}x{}", self.backend.name(), width, height);
        self.backend.resize(width, height)
    }

    /// Draw one frame of `scene` as seen from `camera`
    ///
    /// Updates world matrices and, for shadow-casting lights, the shadow
    /// camera matrices before handing the frame to the backend. Light targets
    /// are not part of the graph and are used as last updated.
    pub fn render(&mut self, scene: &mut Scene, camera: &PerspectiveCamera) -> BackendResult<()> {
        scene.update_world_matrices();
        self.update_shadow_cameras(scene);

        let visible = visible_nodes(scene);
        let (width, height) = self.drawing_buffer_size();
        let mut frame = FrameData {
            frame_index: self.info.frames,
            width,
            height,
            view: camera.view_matrix(),
            projection: *camera.projection_matrix(),
            camera_position: camera.position,
            draws: Vec::new(),
            lights: Vec::new(),
            lines: Vec::new(),
            background: scene.background.as_deref(),
            environment: scene.environment.as_deref(),
            environment_intensity: scene.environment_intensity,
            textures: &scene.textures,
            tone_mapping: self.tone_mapping,
            exposure: self.tone_mapping_exposure,
            shadow_map: self.shadow_map,
            antialias: self.options.antialias,
        };

        for &id in &visible {
            let Some(node) = scene.node(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Group => {}
                NodeKind::Mesh(mesh) => {
                    let world = *node.world_matrix();
                    let linear = world.fixed_view::<3, 3>(0, 0).into_owned();
                    let normal_matrix = linear.try_inverse().map_or_else(Mat3::identity, |m| m.transpose());
                    frame.draws.push(DrawItem {
                        node: id,
                        geometry: &mesh.geometry,
                        material: &mesh.material,
                        world,
                        normal_matrix,
                        shadow: mesh.shadow,
                    });
                }
                NodeKind::DirectionalLight(light) => {
                    let position = scene.world_position(id).unwrap_or_else(Vec3::zeros);
                    let shadow = (light.cast_shadow && self.shadow_map.enabled).then(|| ShadowData {
                        view_projection: *light.shadow.view_projection(),
                        bias: light.shadow.bias,
                        normal_bias: light.shadow.normal_bias,
                        map_size: light.shadow.map_size,
                    });
                    frame.lights.push(LightData {
                        node: id,
                        position,
                        direction: light.direction(position),
                        radiance: light.radiance(),
                        shadow,
                    });
                }
                NodeKind::CameraHelper(helper) => {
                    if let Some(light) = scene.light(helper.light) {
                        frame.lines.extend(helper.lines(&light.shadow.camera));
                    }
                }
            }
        }

        self.backend.render_frame(&frame)?;

        self.info = RenderInfo {
            frames: self.info.frames + 1,
            draw_calls: frame.draws.len(),
            triangles: frame.triangle_count(),
            lights: frame.lights.len(),
            shadow_maps: frame.lights.iter().filter(|l| l.shadow.is_some()).count(),
        };
        log::trace!(
            "Frame {}: {} draws, {} triangles",
            self.info.frames,
            self.info.draw_calls,
            self.info.triangles
        );
        Ok(())
    }

    fn update_shadow_cameras(&self, scene: &mut Scene) {
        if !self.shadow_map.enabled {
            return;
        }
        let lights: Vec<(NodeId, Vec3)> = scene
            .descendants(scene.root())
            .into_iter()
            .filter(|&id| scene.light(id).is_some_and(|l| l.cast_shadow))
            .filter_map(|id| scene.world_position(id).map(|p| (id, p)))
            .collect();

        for (id, position) in lights {
            if let Some(light) = scene.light_mut(id) {
                let target = light.target.world_position();
                light.shadow.update_matrices(position, target);
            }
        }
    }
}

/// Nodes reachable from the root through visible parents
fn visible_nodes(scene: &Scene) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut stack = vec![scene.root()];
    while let Some(id) = stack.pop() {
        let Some(node) = scene.node(id) else {
            continue;
        };
        if !node.visible {
            continue;
        }
        order.push(id);
        stack.extend(node.children().iter().rev().copied());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use crate::render::{
        backend::RecordingBackend, helpers::CameraHelper, light::DirectionalLight, material::StandardMaterial,
        mesh::Geometry, Color,
    };
    use crate::scene::{MeshNode, Node, ShadowFlags};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn renderer() -> (Renderer, crate::render::backend::FrameLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        (Renderer::new(Box::new(backend), RendererOptions::default()), log)
    }

    #[test]
    fn test_drawing_buffer_follows_pixel_ratio() {
        let (mut renderer, _) = renderer();
        renderer.set_size(800, 600).unwrap();
        renderer.set_pixel_ratio(3.0).unwrap();
        assert_eq!(renderer.pixel_ratio(), 2.0);
        assert_eq!(renderer.size(), (800, 600));
        assert_eq!(renderer.drawing_buffer_size(), (1600, 1200));

        renderer.set_pixel_ratio(1.5).unwrap();
        assert_eq!(renderer.drawing_buffer_size(), (1200, 900));
    }

    #[test]
    fn test_render_collects_draws_lights_and_lines() {
        let (mut renderer, log) = renderer();
        renderer.shadow_map.enabled = true;
        renderer.set_size(64, 32).unwrap();

        let mut scene = Scene::new();
        let mut mesh = MeshNode::new(Arc::new(Geometry::plane(8.0, 8.0)), StandardMaterial::new());
        mesh.shadow = ShadowFlags::CAST | ShadowFlags::RECEIVE;
        scene.add(Node::mesh("wall", mesh));

        let mut light = DirectionalLight::new(Color::from_hex(0xff00ff), 6.0);
        light.cast_shadow = true;
        let light_id = scene.add(Node::directional_light("sun", light).with_position(Vec3::new(-5.0, 6.5, 2.5)));
        scene.add(Node::new("helper", NodeKind::CameraHelper(CameraHelper::new(light_id))));

        let camera = PerspectiveCamera::default();
        renderer.render(&mut scene, &camera).unwrap();

        let frames = log.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.size, (64, 32));
        assert_eq!(frame.draw_count, 1);
        assert_eq!(frame.triangle_count, 2);
        assert_eq!(frame.shadow_casters, 1);
        assert_eq!(frame.line_count, 12);
        assert_eq!(frame.lights.len(), 1);
        assert!(frame.lights[0].shadow.is_some());
        assert_relative_eq!(frame.lights[0].position, Vec3::new(-5.0, 6.5, 2.5));

        assert_eq!(renderer.info().frames, 1);
        assert_eq!(renderer.info().shadow_maps, 1);
    }

    #[test]
    fn test_retargeted_light_updates_shadow_matrix() {
        let (mut renderer, log) = renderer();
        renderer.shadow_map.enabled = true;

        let mut scene = Scene::new();
        let mut light = DirectionalLight::default();
        light.cast_shadow = true;
        let id = scene.add(Node::directional_light("sun", light).with_position(Vec3::new(-5.0, 6.5, 2.5)));

        let light = scene.light_mut(id).unwrap();
        light.target.position = Vec3::new(0.0, 4.0, 0.0);
        light.target.update_matrix();

        renderer.render(&mut scene, &PerspectiveCamera::default()).unwrap();

        let frames = log.lock().unwrap();
        let data = frames[0].lights[0];
        let expected = (Vec3::new(0.0, 4.0, 0.0) - Vec3::new(-5.0, 6.5, 2.5)).normalize();
        assert_relative_eq!(data.direction, expected, epsilon = 1e-6);

        let clip = data.shadow.unwrap().view_projection * Vec4::new(0.0, 4.0, 0.0, 1.0);
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_hidden_subtree_is_skipped() {
        let (mut renderer, log) = renderer();
        let mut scene = Scene::new();
        let group = scene.add(Node::group("hidden"));
        scene.add_child(group, Node::mesh("m", MeshNode::new(Arc::new(Geometry::plane(1.0, 1.0)), StandardMaterial::new())));
        scene.node_mut(group).unwrap().visible = false;

        renderer.render(&mut scene, &PerspectiveCamera::default()).unwrap();
        assert_eq!(log.lock().unwrap()[0].draw_count, 0);
    }

    #[test]
    fn test_shadows_disabled_drops_shadow_data() {
        let (mut renderer, log) = renderer();
        let mut scene = Scene::new();
        let mut light = DirectionalLight::default();
        light.cast_shadow = true;
        scene.add(Node::directional_light("sun", light));

        renderer.render(&mut scene, &PerspectiveCamera::default()).unwrap();
        assert!(log.lock().unwrap()[0].lights[0].shadow.is_none());
    }
}
