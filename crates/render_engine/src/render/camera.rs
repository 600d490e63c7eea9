//! # 3D Camera System
//!
//! Provides the perspective camera used to view the scene and the
//! orthographic camera used by directional light shadows.
//!
//! ## Design Principles
//! - **Library-agnostic**: No backend dependencies in camera math
//! - **Explicit projection updates**: the perspective projection is cached and
//!   only rebuilt by [`PerspectiveCamera::update_projection_matrix`], so a resize
//!   handler controls exactly when the new aspect takes effect
//! - **Right-handed, Y-up** view space; the camera looks down its local -Z

use crate::foundation::math::{utils, Mat4, Mat4Ext, Point3, Vec3, Vec4};

/// Perspective camera
///
/// # Coordinate System
/// Uses standard right-handed Y-up coordinates in view space:
/// - X+ = Right
/// - Y+ = Up
/// - Z- = Forward
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    ///
    /// Changing this has no effect on rendering until
    /// [`update_projection_matrix`](Self::update_projection_matrix) runs.
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    projection: Mat4,
}

impl PerspectiveCamera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees (converted to radians internally)
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use render_engine::foundation::math::Vec3;
    /// use render_engine::render::PerspectiveCamera;
    ///
    /// let camera = PerspectiveCamera::perspective(
    ///     Vec3::new(4.0, 5.0, 4.0),
    ///     75.0,
    ///     16.0 / 9.0,
    ///     0.1,
    ///     100.0,
    /// );
    /// assert_eq!(camera.aspect, 16.0 / 9.0);
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let fov = utils::deg_to_rad(fov_degrees);
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov,
            aspect,
            near,
            far,
            projection: Mat4::perspective(fov, aspect, near, far),
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera at a world-space location
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Set the aspect ratio without rebuilding the projection
    ///
    /// Only logs changes larger than 0.01 to keep resize drags quiet.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Rebuild the cached projection from fov, aspect, near and far
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective(self.fov, self.aspect, self.near, self.far);
    }

    /// Cached projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Combined `P × V`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// Unit vector the camera faces
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }
}

impl Default for PerspectiveCamera {
    /// 50° camera a few units back from the origin
    fn default() -> Self {
        let mut camera = Self::perspective(Vec3::new(0.0, 0.0, 5.0), 50.0, 1.0, 0.1, 2000.0);
        camera.look_at(Vec3::zeros());
        camera
    }
}

/// Orthographic camera, used as the virtual camera of a directional shadow
///
/// Matrices are computed on demand from the current fields, so edits to
/// `far` or the frustum box are visible to the next shadow pass without an
/// explicit update step.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    /// Left plane of the view box
    pub left: f32,
    /// Right plane of the view box
    pub right: f32,
    /// Top plane of the view box
    pub top: f32,
    /// Bottom plane of the view box
    pub bottom: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
    /// Camera position in world space
    pub position: Vec3,
    /// Look-at point in world space
    pub target: Vec3,
    /// Up vector
    pub up: Vec3,
}

impl OrthographicCamera {
    /// Create an orthographic camera at the origin looking down -Z
    pub fn new(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            near,
            far,
            position: Vec3::zeros(),
            target: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Orthographic projection of the view box
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic(self.left, self.right, self.bottom, self.top, self.near, self.far)
    }

    /// Combined `P × V`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space corners of the view box: near plane first, then far plane
    ///
    /// Each plane is ordered bottom-left, bottom-right, top-right, top-left.
    pub fn frustum_corners(&self) -> [Vec3; 8] {
        let inverse = self.view_projection_matrix().try_inverse().unwrap_or_else(Mat4::identity);
        let ndc = [
            (-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (-1.0, 1.0, -1.0),
            (-1.0, -1.0, 1.0), (1.0, -1.0, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0),
        ];
        ndc.map(|(x, y, z)| {
            let world = inverse * Vec4::new(x, y, z, 1.0);
            Point3::from_homogeneous(world).map_or_else(Vec3::zeros, |p| p.coords)
        })
    }
}
