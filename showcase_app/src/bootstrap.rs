//! Scene bootstrap
//!
//! Builds the showcase in a fixed order: environment, models, viewport,
//! camera and controls, light, renderer, shadows, wall and floor, shadow
//! helper, light target, tone mapping. Asset loads complete later; their
//! continuations run at the start of the next frame and mutate the scene
//! through [`SceneState`].

use std::sync::Arc;

use render_engine::assets::{AssetLoader, Model, TextureSink};
use render_engine::config::ConfigError;
use render_engine::controls::OrbitControls;
use render_engine::debug::PanelError;
use render_engine::foundation::math::Vec3;
use render_engine::render::{
    CameraHelper, Color, ColorSpace, DirectionalLight, EnvironmentMap, Geometry, PerspectiveCamera, RenderBackend,
    RenderError, Renderer, RendererOptions, ShadowMapSettings, StandardMaterial, TextureStore, Viewport,
};
use render_engine::scene::{MeshNode, Node, NodeId, NodeKind, Scene, ShadowFlags};
use render_engine::window::WindowError;
use thiserror::Error;

use crate::panel_bindings::{self, ShowcasePanel};
use crate::scene_config::{vec3, SceneConfig, SurfaceTextures};

const HELMET_SCALE: f32 = 10.0;
const BURGER_SCALE: f32 = 0.4;
const BURGER_POSITION: [f32; 3] = [5.0, 1.0, 0.0];
const PLANE_SIZE: f32 = 8.0;
const WALL_POSITION: [f32; 3] = [0.0, 4.0, -4.0];
const FLOOR_ROTATION_X: f32 = -1.5;

/// Showcase errors
#[derive(Debug, Error)]
pub enum ShowcaseError {
    /// Renderer or backend failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Panel control registration failed
    #[error("Panel error: {0}")]
    Panel(#[from] PanelError),

    /// Window could not be opened
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Everything the frame loop, resize handler, panel and asset continuations
/// operate on
#[derive(Debug)]
pub struct SceneState {
    /// Scene graph
    pub scene: Scene,
    /// Viewing camera
    pub camera: PerspectiveCamera,
    /// Orbit controls driving `camera`
    pub controls: OrbitControls,
    /// Renderer
    pub renderer: Renderer,
    /// Current output size
    pub viewport: Viewport,
    /// Directional light node
    pub light: NodeId,
    /// Shadow camera outline, when enabled
    pub shadow_helper: Option<NodeId>,
    /// Wall mesh
    pub wall: NodeId,
    /// Floor mesh
    pub floor: NodeId,
    /// Flight helmet, once loaded
    pub helmet: Option<NodeId>,
    /// Hamburger, once loaded
    pub burger: Option<NodeId>,
}

impl TextureSink for SceneState {
    fn texture_store(&mut self) -> &mut TextureStore {
        &mut self.scene.textures
    }
}

impl SceneState {
    /// Apply a new output size
    ///
    /// The projection is rebuilt before the surface is resized.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        log::debug!(
            "Resize to {}x{} at ratio {}",
            viewport.width,
            viewport.height,
            viewport.device_pixel_ratio
        );
        self.viewport = viewport;

        self.camera.set_aspect_ratio(viewport.aspect());
        self.camera.update_projection_matrix();
        self.controls.set_viewport(viewport.width, viewport.height);

        self.renderer.set_size(viewport.width, viewport.height)?;
        self.renderer.set_pixel_ratio(viewport.device_pixel_ratio)
    }

    /// The directional light
    pub fn light(&self) -> Option<&DirectionalLight> {
        self.scene.light(self.light)
    }

    /// The directional light, mutably
    pub fn light_mut(&mut self) -> Option<&mut DirectionalLight> {
        self.scene.light_mut(self.light)
    }

    /// Local position of the light node
    pub fn light_position(&self) -> Vec3 {
        self.scene
            .node(self.light)
            .map_or_else(Vec3::zeros, |node| node.transform.position)
    }

    /// Move the light along one axis (0 = x, 1 = y, 2 = z)
    pub fn set_light_axis(&mut self, axis: usize, value: f32) {
        if let Some(node) = self.scene.node_mut(self.light) {
            if let Some(component) = node.transform.position.get_mut(axis) {
                *component = value;
            }
        }
    }

    fn add_model(&mut self, model: &Model, scale: f32, position: Option<Vec3>) -> NodeId {
        let id = model.instantiate(&mut self.scene);
        if let Some(node) = self.scene.node_mut(id) {
            node.transform.set_uniform_scale(scale);
            if let Some(position) = position {
                node.transform.position = position;
            }
        }
        log::info!("Added model {} ({} primitives)", model.name, model.primitive_count());
        id
    }
}

/// Flag every mesh in the scene to cast and receive shadows
///
/// Returns the number of meshes visited. Flags are only ever set, so running
/// it again changes nothing.
pub fn mark_all_meshes_shadowed(scene: &mut Scene) -> usize {
    let mut count = 0;
    scene.traverse_mut(scene.root(), |_, node| {
        if let Some(mesh) = node.as_mesh_mut() {
            mesh.shadow.insert(ShadowFlags::CAST | ShadowFlags::RECEIVE);
            count += 1;
        }
    });
    count
}

/// The running showcase
pub struct Showcase {
    /// Scene and everything that renders it
    pub state: SceneState,
    /// Pending asset loads
    pub loader: AssetLoader<SceneState>,
    /// Debug panel bound to `state`
    pub panel: ShowcasePanel,
}

impl std::fmt::Debug for Showcase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Showcase")
            .field("state", &self.state)
            .field("loader", &self.loader)
            .field("panel", &self.panel)
            .finish()
    }
}

impl Showcase {
    /// Build the scene and issue every asset load
    pub fn bootstrap(
        config: &SceneConfig,
        viewport: Viewport,
        backend: Box<dyn RenderBackend>,
    ) -> Result<Self, ShowcaseError> {
        log::info!("Bootstrapping showcase with assets from {}", config.assets.root.display());
        let assets = &config.assets;
        let mut loader = AssetLoader::new(&assets.root);
        let mut panel = ShowcasePanel::new("Realistic render");

        // Output surface and scene root
        let mut scene = Scene::new();

        // Environment map
        scene.environment_intensity = config.renderer.environment_intensity;
        panel_bindings::environment(&mut panel)?;
        let environment_name = assets.environment_map.display().to_string();
        loader.load_hdr(&assets.environment_map, move |state: &mut SceneState, result| match result {
            Ok(image) => {
                let map = Arc::new(EnvironmentMap::equirectangular(environment_name, image));
                log::info!("Environment map {} ready", map.name);
                state.scene.background = Some(Arc::clone(&map));
                state.scene.environment = Some(map);
            }
            Err(err) => log::warn!("Environment map unavailable: {}", err),
        });

        // Models
        loader.load_model(&assets.helmet, |state: &mut SceneState, result| match result {
            Ok(model) => {
                state.helmet = Some(state.add_model(&model, HELMET_SCALE, None));
                let meshes = mark_all_meshes_shadowed(&mut state.scene);
                log::debug!("Shadows enabled on {} meshes", meshes);
            }
            Err(err) => log::warn!("Flight helmet unavailable: {}", err),
        });
        loader.load_model(&assets.burger, |state: &mut SceneState, result| match result {
            Ok(model) => {
                state.burger = Some(state.add_model(&model, BURGER_SCALE, Some(vec3(BURGER_POSITION))));
            }
            Err(err) => log::warn!("Hamburger unavailable: {}", err),
        });

        // Camera and controls
        let camera_settings = &config.camera;
        let target = vec3(camera_settings.target);
        let mut camera = PerspectiveCamera::perspective(
            vec3(camera_settings.position),
            camera_settings.fov,
            viewport.aspect(),
            camera_settings.near,
            camera_settings.far,
        );
        camera.look_at(target);
        let mut controls = OrbitControls::new(target);
        controls.enable_damping = camera_settings.damping;
        controls.damping_factor = camera_settings.damping_factor;
        controls.set_viewport(viewport.width, viewport.height);

        // Directional light
        let light = DirectionalLight::new(Color::from_hex(config.light.color), config.light.intensity);
        let light_id =
            scene.add(Node::directional_light("directionalLight", light).with_position(vec3(config.light.position)));
        panel_bindings::light(&mut panel)?;

        // Renderer
        let mut renderer = Renderer::new(
            backend,
            RendererOptions {
                antialias: config.renderer.antialias,
            },
        );
        renderer.shadow_map = ShadowMapSettings {
            enabled: config.shadow.enabled,
            kind: config.shadow.kind,
        };
        renderer.set_size(viewport.width, viewport.height)?;
        renderer.set_pixel_ratio(viewport.device_pixel_ratio)?;

        // Shadows
        if let Some(light) = scene.light_mut(light_id) {
            light.cast_shadow = config.shadow.cast_shadow;
            light.shadow.camera.far = config.shadow.camera_far;
            light.shadow.map_size = (config.shadow.map_size, config.shadow.map_size);
            light.shadow.normal_bias = config.shadow.normal_bias;
            light.shadow.bias = config.shadow.bias;
        }
        panel_bindings::shadow(&mut panel)?;

        // Wall and floor
        let wall_material = surface_material(&mut loader, &mut scene.textures, "wall", &assets.wall, ColorSpace::None);
        if !assets.floor_color_srgb {
            log::warn!(
                "Floor colour texture keeps its default colour space; set assets.floor_color_srgb to decode it as sRGB"
            );
        }
        let floor_color_space = if assets.floor_color_srgb {
            ColorSpace::Srgb
        } else {
            ColorSpace::None
        };
        let floor_material =
            surface_material(&mut loader, &mut scene.textures, "floor", &assets.floor, floor_color_space);

        let plane = Arc::new(Geometry::plane(PLANE_SIZE, PLANE_SIZE));
        let wall = scene.add(
            Node::mesh("wall", MeshNode::new(Arc::clone(&plane), wall_material)).with_position(vec3(WALL_POSITION)),
        );
        let mut floor_node = Node::mesh("floor", MeshNode::new(plane, floor_material));
        floor_node.transform.set_rotation_euler(FLOOR_ROTATION_X, 0.0, 0.0);
        let floor = scene.add(floor_node);

        // Shadow camera outline
        let shadow_helper = config
            .shadow
            .helper
            .then(|| scene.add(Node::new("shadowCameraHelper", NodeKind::CameraHelper(CameraHelper::new(light_id)))));

        // Light target
        if let Some(light) = scene.light_mut(light_id) {
            light.target.position = vec3(config.light.target);
            light.target.update_matrix();
        }

        // Tone mapping
        renderer.tone_mapping = config.renderer.tone_mapping;
        renderer.tone_mapping_exposure = config.renderer.exposure;
        panel_bindings::tone_mapping(&mut panel)?;

        log::info!(
            "Showcase ready: {} nodes, {} panel controls, {} loads pending",
            scene.len(),
            panel.len(),
            loader.pending()
        );

        Ok(Self {
            state: SceneState {
                scene,
                camera,
                controls,
                renderer,
                viewport,
                light: light_id,
                shadow_helper,
                wall,
                floor,
                helmet: None,
                burger: None,
            },
            loader,
            panel,
        })
    }

    /// One tick: finish completed loads, update controls, render
    pub fn frame(&mut self) -> Result<(), ShowcaseError> {
        let completed = self.loader.poll(&mut self.state);
        if completed > 0 {
            log::debug!("{} asset load(s) completed, {} pending", completed, self.loader.pending());
        }
        self.state.controls.update(&mut self.state.camera);
        self.state.renderer.render(&mut self.state.scene, &self.state.camera)?;
        Ok(())
    }

    /// Apply a new output size
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), ShowcaseError> {
        self.state.resize(viewport).map_err(ShowcaseError::from)
    }
}

/// Material with colour, normal and ARM maps, all loading in the background
fn surface_material(
    loader: &mut AssetLoader<SceneState>,
    textures: &mut TextureStore,
    name: &str,
    paths: &SurfaceTextures,
    color_space: ColorSpace,
) -> StandardMaterial {
    let color = loader.load_texture(textures, &paths.color, color_space);
    let normal = loader.load_texture(textures, &paths.normal, ColorSpace::None);
    let arm = loader.load_texture(textures, &paths.arm, ColorSpace::None);
    StandardMaterial::new()
        .with_name(name)
        .with_map(Some(color))
        .with_normal_map(Some(normal))
        .with_arm_map(arm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use render_engine::debug::PanelValue;
    use render_engine::foundation::math::{Mat4, Mat4Ext, Point3};
    use render_engine::frame_loop::{run_frame_loop, StopFlag};
    use render_engine::render::{FrameLog, RecordingBackend, ToneMapping};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::host::HeadlessHost;

    fn asset_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("showcase_assets_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn config_with_root(root: &Path) -> SceneConfig {
        let mut config = SceneConfig::default();
        config.assets.root = root.to_path_buf();
        config
    }

    fn showcase(config: &SceneConfig, viewport: Viewport) -> (Showcase, FrameLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let showcase = Showcase::bootstrap(config, viewport, Box::new(backend)).unwrap();
        (showcase, log)
    }

    fn write_png(root: &Path, relative: &Path) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([180, 120, 60, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_resize_keeps_aspect_and_caps_ratio() {
        let root = asset_root("resize");
        let (mut app, _) = showcase(&config_with_root(&root), Viewport::new(800, 600, 1.0));

        for (w, h, dpr) in [(1, 1, 1.0_f32), (1920, 1080, 1.0), (333, 777, 2.5), (4000, 10, 3.0), (640, 480, 1.5)] {
            app.resize(Viewport::new(w, h, dpr)).unwrap();
            let state = &app.state;
            assert_eq!(state.camera.aspect, w as f32 / h as f32);
            assert_eq!(state.renderer.size(), (w, h));
            assert_eq!(state.renderer.pixel_ratio(), dpr.min(2.0));
            let expected = Mat4::perspective(state.camera.fov, w as f32 / h as f32, 0.1, 100.0);
            assert_relative_eq!(*state.camera.projection_matrix(), expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_shadow_sweep_is_idempotent() {
        let mut empty = Scene::new();
        assert_eq!(mark_all_meshes_shadowed(&mut empty), 0);
        assert_eq!(mark_all_meshes_shadowed(&mut empty), 0);

        let mut scene = Scene::new();
        let plane = Arc::new(Geometry::plane(1.0, 1.0));
        let group = scene.add(Node::group("group"));
        scene.add_child(group, Node::mesh("a", MeshNode::new(Arc::clone(&plane), StandardMaterial::new())));
        let mut flagged = MeshNode::new(plane, StandardMaterial::new());
        flagged.shadow = ShadowFlags::CAST;
        scene.add(Node::mesh("b", flagged));

        for _ in 0..2 {
            assert_eq!(mark_all_meshes_shadowed(&mut scene), 2);
            scene.traverse(scene.root(), |_, node| {
                if let Some(mesh) = node.as_mesh() {
                    assert_eq!(mesh.shadow, ShadowFlags::CAST | ShadowFlags::RECEIVE);
                }
            });
        }
    }

    #[test]
    fn test_panel_controls_in_construction_order() {
        let root = asset_root("labels");
        let (app, _) = showcase(&config_with_root(&root), Viewport::new(800, 600, 1.0));
        let labels: Vec<&str> = app.panel.labels().collect();
        assert_eq!(
            labels,
            [
                "environmentIntensity",
                "lightIntensity",
                "lightX",
                "lightY",
                "lightZ",
                "color",
                "castShadow",
                "normalBias",
                "bias",
                "toneMapping",
                "toneMappingExposure",
            ]
        );
    }

    #[test]
    fn test_light_color_round_trip() {
        let root = asset_root("color");
        let (mut app, _) = showcase(&config_with_root(&root), Viewport::new(800, 600, 1.0));
        assert_eq!(app.panel.value(&app.state, "color"), Ok(PanelValue::Color(0xff00ff)));

        for hex in [0x000000, 0x123456, 0xff00ff, 0x7f7f7f, 0xffffff] {
            app.panel.set(&mut app.state, "color", PanelValue::Color(hex)).unwrap();
            assert_eq!(app.state.light().unwrap().color.to_hex(), hex);
            assert_eq!(app.panel.value(&app.state, "color"), Ok(PanelValue::Color(hex)));
        }
    }

    #[test]
    fn test_panel_edits_reach_the_frame() {
        let root = asset_root("panel");
        let (mut app, log) = showcase(&config_with_root(&root), Viewport::new(64, 48, 1.0));

        app.panel.set(&mut app.state, "lightX", PanelValue::Number(3.0)).unwrap();
        app.panel.set(&mut app.state, "castShadow", PanelValue::Toggle(false)).unwrap();
        app.panel.set(&mut app.state, "toneMapping", PanelValue::Choice(2)).unwrap();
        app.panel.set(&mut app.state, "toneMappingExposure", PanelValue::Number(2.5)).unwrap();
        app.panel.set(&mut app.state, "environmentIntensity", PanelValue::Number(20.0)).unwrap();
        app.frame().unwrap();

        let frames = log.lock().unwrap();
        let frame = frames.last().unwrap();
        assert_relative_eq!(frame.lights[0].position, Vec3::new(3.0, 6.5, 2.5));
        assert!(frame.lights[0].shadow.is_none());
        assert_eq!(frame.tone_mapping, ToneMapping::Reinhard);
        assert_relative_eq!(frame.exposure, 2.5);
        assert_relative_eq!(frame.environment_intensity, 10.0);
    }

    #[test]
    fn test_light_aims_at_target() {
        let root = asset_root("aim");
        let (mut app, log) = showcase(&config_with_root(&root), Viewport::new(64, 48, 1.0));
        app.frame().unwrap();

        let position = Vec3::new(-5.0, 6.5, 2.5);
        let target = Vec3::new(0.0, 4.0, 0.0);
        let expected = (target - position).normalize();

        let frames = log.lock().unwrap();
        assert_relative_eq!(frames[0].lights[0].direction, expected, epsilon = 1e-6);

        let light = app.state.light().unwrap();
        let view = light.shadow.camera.view_matrix();
        let in_view = view.transform_point(&Point3::from(target));
        assert_relative_eq!(in_view.coords, Vec3::new(0.0, 0.0, -(target - position).norm()), epsilon = 1e-4);
        assert_relative_eq!(light.shadow.camera.far, 15.0);
        assert_eq!(light.shadow.map_size, (512, 512));
    }

    #[test]
    fn test_missing_assets_leave_scene_usable() {
        let root = asset_root("missing");
        let (mut app, log) = showcase(&config_with_root(&root), Viewport::new(64, 48, 1.0));
        assert_eq!(app.loader.pending(), 9);

        app.loader.wait_all(&mut app.state, Duration::from_secs(10));
        assert_eq!(app.loader.pending(), 0);
        app.frame().unwrap();

        assert!(app.state.helmet.is_none());
        assert!(app.state.burger.is_none());
        assert!(app.state.scene.background.is_none());
        assert_eq!(app.state.scene.textures.pending_count(), 6);

        let frames = log.lock().unwrap();
        assert_eq!(frames[0].draw_count, 2);
        assert_eq!(frames[0].line_count, 12);
        assert!(!frames[0].has_background);
    }

    #[test]
    fn test_loaded_assets_populate_scene() {
        let root = asset_root("loaded");
        let mut config = config_with_root(&root);
        config.assets.floor_color_srgb = true;

        for surface in [&config.assets.wall, &config.assets.floor] {
            for path in [&surface.color, &surface.normal, &surface.arm] {
                write_png(&root, path);
            }
        }
        let hdr_path = root.join(&config.assets.environment_map);
        std::fs::create_dir_all(hdr_path.parent().unwrap()).unwrap();
        let mut bytes = Vec::new();
        image::codecs::hdr::HdrEncoder::new(&mut bytes)
            .encode(&vec![image::Rgb([1.5_f32, 1.0, 0.5]); 8], 4, 2)
            .unwrap();
        std::fs::write(&hdr_path, bytes).unwrap();

        let (mut app, log) = showcase(&config, Viewport::new(64, 48, 1.0));
        app.loader.wait_all(&mut app.state, Duration::from_secs(10));
        app.frame().unwrap();

        let scene = &app.state.scene;
        assert!(scene.background.is_some());
        assert!(scene.environment.is_some());
        assert_eq!(scene.textures.pending_count(), 0);

        let floor = scene.node(app.state.floor).and_then(|n| n.as_mesh()).unwrap();
        let floor_map = scene.textures.get(floor.material.map.unwrap()).unwrap();
        assert_eq!(floor_map.color_space, ColorSpace::Srgb);
        let wall = scene.node(app.state.wall).and_then(|n| n.as_mesh()).unwrap();
        assert_eq!(wall.material.ao_map, wall.material.roughness_map);
        assert_eq!(wall.material.ao_map, wall.material.metalness_map);

        assert!(log.lock().unwrap()[0].has_background);
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_loop_updates_controls_before_each_render() {
        let root = asset_root("loop");
        let (mut app, log) = showcase(&config_with_root(&root), Viewport::new(64, 48, 1.0));
        let start = app.state.camera.position;
        app.state.controls.rotate_left(0.5);

        let mut host = HeadlessHost::new(5);
        let frames = run_frame_loop(&mut host, &mut app, &StopFlag::new(), Showcase::frame).unwrap();
        assert_eq!(frames, 5);
        assert_eq!(app.state.renderer.info().frames, 5);

        let frames = log.lock().unwrap();
        assert_eq!(frames.len(), 5);
        // Damped orbit: every rendered frame already reflects that tick's update
        assert!((frames[0].camera_position - start).norm() > 1e-4);
        for pair in frames.windows(2) {
            assert!((pair[1].camera_position - pair[0].camera_position).norm() > 1e-6);
            assert_eq!(pair[1].frame_index, pair[0].frame_index + 1);
        }
    }
}
