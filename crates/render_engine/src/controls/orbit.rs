//! Orbit camera controls
//!
//! Keeps the camera on a sphere around a target point. Pointer input queues
//! rotation, dolly and pan requests; [`OrbitControls::update`] applies them
//! once per frame. With damping enabled only a fraction of each pending
//! request is applied per update and the rest decays geometrically, which
//! is why `update` must run every frame even without new input.

use crate::foundation::math::{constants, Vec2, Vec3};
use crate::render::PerspectiveCamera;

/// Keeps the polar angle away from the poles
const POLAR_EPSILON: f32 = 1e-6;

/// Movement below this squared distance does not count as a change
const CHANGE_EPSILON: f32 = 1e-6;

/// Pointer buttons the controls react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Primary button: rotate
    Left,
    /// Middle button: dolly
    Middle,
    /// Secondary button: pan
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Dolly,
    Pan,
}

/// Spherical coordinates around the y axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y
    phi: f32,
    /// Azimuth around +Y, measured from +Z towards +X
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.norm();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Orbit, dolly and pan around a target
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Point the camera orbits and looks at
    pub target: Vec3,
    /// Master switch for input handling
    pub enabled: bool,
    /// Spread pending motion over several updates
    pub enable_damping: bool,
    /// Fraction of pending motion applied per update when damping
    pub damping_factor: f32,
    /// Allow rotation
    pub enable_rotate: bool,
    /// Allow dolly
    pub enable_zoom: bool,
    /// Allow panning
    pub enable_pan: bool,
    /// Rotation speed multiplier
    pub rotate_speed: f32,
    /// Dolly speed multiplier
    pub zoom_speed: f32,
    /// Pan speed multiplier
    pub pan_speed: f32,
    /// Closest allowed distance to the target
    pub min_distance: f32,
    /// Farthest allowed distance to the target
    pub max_distance: f32,
    /// Smallest polar angle (0 looks straight down)
    pub min_polar_angle: f32,
    /// Largest polar angle (PI looks straight up)
    pub max_polar_angle: f32,

    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vec3,
    viewport: (u32, u32),
    drag: Option<DragMode>,
    last_pointer: Vec2,
}

impl OrbitControls {
    /// Controls orbiting `target`, damping disabled
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enabled: true,
            enable_damping: false,
            damping_factor: 0.05,
            enable_rotate: true,
            enable_zoom: true,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: constants::PI,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::zeros(),
            viewport: (1, 1),
            drag: None,
            last_pointer: Vec2::zeros(),
        }
    }

    /// Viewport size used to convert pointer motion into angles
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    /// Queue a rotation around the vertical axis
    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    /// Queue a change of polar angle
    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Move closer by `dolly_scale` (< 1 shrinks the distance)
    pub fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
    }

    /// Move away by `dolly_scale`
    pub fn dolly_out(&mut self, dolly_scale: f32) {
        if dolly_scale != 0.0 {
            self.scale /= dolly_scale;
        }
    }

    /// Queue a screen-space pan of (`delta_x`, `delta_y`) pixels
    pub fn pan(&mut self, delta_x: f32, delta_y: f32, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        let target_distance = offset.norm() * (camera.fov * 0.5).tan();
        let height = self.viewport.1 as f32;

        let (right, up) = camera_basis(camera);
        self.pan_offset -= right * (2.0 * delta_x * target_distance / height);
        self.pan_offset += up * (2.0 * delta_y * target_distance / height);
    }

    fn zoom_scale(&self) -> f32 {
        0.95_f32.powf(self.zoom_speed)
    }

    /// Begin a drag
    pub fn pointer_down(&mut self, button: PointerButton, x: f32, y: f32) {
        if !self.enabled {
            return;
        }
        self.drag = match button {
            PointerButton::Left if self.enable_rotate => Some(DragMode::Rotate),
            PointerButton::Middle if self.enable_zoom => Some(DragMode::Dolly),
            PointerButton::Right if self.enable_pan => Some(DragMode::Pan),
            _ => None,
        };
        self.last_pointer = Vec2::new(x, y);
    }

    /// Continue a drag
    pub fn pointer_move(&mut self, x: f32, y: f32, camera: &PerspectiveCamera) {
        let position = Vec2::new(x, y);
        let delta = position - self.last_pointer;
        self.last_pointer = position;
        if !self.enabled {
            return;
        }

        match self.drag {
            Some(DragMode::Rotate) => {
                let delta = delta * self.rotate_speed;
                let height = self.viewport.1 as f32;
                self.rotate_left(constants::TAU * delta.x / height);
                self.rotate_up(constants::TAU * delta.y / height);
            }
            Some(DragMode::Dolly) => {
                if delta.y > 0.0 {
                    self.dolly_out(self.zoom_scale());
                } else if delta.y < 0.0 {
                    self.dolly_in(self.zoom_scale());
                }
            }
            Some(DragMode::Pan) => {
                let delta = delta * self.pan_speed;
                self.pan(delta.x, delta.y, camera);
            }
            None => {}
        }
    }

    /// End a drag
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Mouse wheel; negative `delta_y` (scrolling up) moves closer
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enabled || !self.enable_zoom {
            return;
        }
        if delta_y < 0.0 {
            self.dolly_in(self.zoom_scale());
        } else if delta_y > 0.0 {
            self.dolly_out(self.zoom_scale());
        }
    }

    /// Apply pending motion to `camera`; returns whether the camera moved
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLAR_EPSILON, constants::PI - POLAR_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        let previous = camera.position;
        camera.set_position(self.target + spherical.to_offset());
        camera.look_at(self.target);

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::zeros();
        }
        self.scale = 1.0;

        (camera.position - previous).norm_squared() > CHANGE_EPSILON
    }
}

/// World-space right and up vectors of the camera
fn camera_basis(camera: &PerspectiveCamera) -> (Vec3, Vec3) {
    let forward = camera.target - camera.position;
    let right = forward
        .cross(&camera.up)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vec3::x);
    let up = right.cross(&forward).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
    (right, up)
}
