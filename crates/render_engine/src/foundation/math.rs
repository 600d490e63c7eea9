//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics. All projection helpers use
//! the right-handed, Y-up convention with clip-space depth in `[-1, 1]`.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set a uniform scale on all three axes
    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.scale = Vec3::new(scale, scale, scale);
    }

    /// Set rotation from XYZ-ordered Euler angles in radians
    ///
    /// The resulting rotation matrix is `Rx * Ry * Rz`, so a single-axis
    /// rotation behaves exactly like an assignment to that axis.
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_axis_angle(&Vec3::x_axis(), x)
            * Quat::from_axis_angle(&Vec3::y_axis(), y)
            * Quat::from_axis_angle(&Vec3::z_axis(), z);
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from glTF-style decomposed components
    pub fn from_components(translation: [f32; 3], rotation_xyzw: [f32; 4], scale: [f32; 3]) -> Self {
        let [x, y, z, w] = rotation_xyzw;
        Self {
            position: Vec3::from(translation),
            rotation: Quat::from_quaternion(Quaternion::new(w, x, y, z)),
            scale: Vec3::from(scale),
        }
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Smallest meaningful difference for camera and control math
    pub const EPSILON: f32 = 1e-6;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Translation column of an affine matrix
    pub fn translation_of(matrix: &super::Mat4) -> super::Vec3 {
        super::Vec3::new(matrix.m14, matrix.m24, matrix.m34)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection matrix (vertical fov in radians)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an orthographic projection matrix
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = -(far + near) / (far - near);
        result[(2, 3)] = -(2.0 * far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / (right - left);
        result[(1, 1)] = 2.0 / (top - bottom);
        result[(2, 2)] = -2.0 / (far - near);
        result[(0, 3)] = -(right + left) / (right - left);
        result[(1, 3)] = -(top + bottom) / (top - bottom);
        result[(2, 3)] = -(far + near) / (far - near);
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        // Right-handed: the camera looks down its local -Z
        let forward = (target - eye).normalize();
        let mut right = forward.cross(&up);
        if right.norm_squared() < constants::EPSILON {
            // Looking straight along `up`; nudge the basis like a scene-graph lookAt would
            right = forward.cross(&Vec3::new(0.0, 0.0, 1.0));
        }
        let right = right.normalize();
        let camera_up = right.cross(&forward);

        Mat4::new(
            right.x, right.y, right.z, -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            -forward.x, -forward.y, -forward.z, forward.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_look_at_maps_target_onto_negative_z() {
        let eye = Vec3::new(4.0, 5.0, 4.0);
        let target = Vec3::new(0.0, 3.5, 0.0);
        let view = Mat4::look_at(eye, target, Vec3::y());

        let eye_in_view = view.transform_point(&Point3::from(eye));
        assert_relative_eq!(eye_in_view.coords, Vec3::zeros(), epsilon = EPSILON);

        let target_in_view = view.transform_point(&Point3::from(target));
        let distance = (target - eye).norm();
        assert_relative_eq!(target_in_view.coords, Vec3::new(0.0, 0.0, -distance), epsilon = 1e-4);
    }

    #[test]
    fn test_perspective_depth_range() {
        let projection = Mat4::perspective(utils::deg_to_rad(75.0), 1.5, 0.1, 100.0);

        let near = projection * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = projection * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_maps_box_to_cube() {
        let projection = Mat4::orthographic(-5.0, 5.0, -5.0, 5.0, 0.5, 15.0);
        let corner = projection * Vec4::new(5.0, -5.0, -15.0, 1.0);
        assert_relative_eq!(corner.x, 1.0, epsilon = EPSILON);
        assert_relative_eq!(corner.y, -1.0, epsilon = EPSILON);
        assert_relative_eq!(corner.z, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_euler_single_axis_rotation() {
        let mut transform = Transform::identity();
        transform.set_rotation_euler(-1.5, 0.0, 0.0);

        let expected = Quat::from_axis_angle(&Vec3::x_axis(), -1.5);
        assert_relative_eq!(transform.rotation, expected, epsilon = EPSILON);
    }

    #[test]
    fn test_transform_matrix_applies_scale_then_translation() {
        let mut transform = Transform::from_position(Vec3::new(5.0, 1.0, 0.0));
        transform.set_uniform_scale(0.4);

        let point = transform.to_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point.coords, Vec3::new(5.4, 1.0, 0.0), epsilon = EPSILON);
    }
}
