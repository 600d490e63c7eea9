//! Depth-only shadow pass and filtered lookups

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::render::backend::{DrawItem, ShadowData};
use crate::scene::ShadowFlags;

use super::raster::{self, Cull};

/// Depth from one light's point of view
#[derive(Debug, Clone)]
pub struct ShadowMap {
    width: u32,
    height: u32,
    depth: Vec<f32>,
    view_projection: Mat4,
    bias: f32,
    normal_bias: f32,
    kernel: u32,
}

impl ShadowMap {
    /// Render every shadow-casting draw into a fresh depth map
    ///
    /// Both faces are rasterized so open meshes still occlude.
    pub fn render(shadow: &ShadowData, draws: &[DrawItem<'_>], kernel: u32) -> Self {
        let (width, height) = (shadow.map_size.0.max(1), shadow.map_size.1.max(1));
        let mut depth = vec![1.0_f32; (width * height) as usize];

        for draw in draws.iter().filter(|d| d.shadow.contains(ShadowFlags::CAST)) {
            let mvp = shadow.view_projection * draw.world;
            let clip: Vec<Vec4> = draw
                .geometry
                .vertices
                .iter()
                .map(|v| mvp * Vec4::new(v.position[0], v.position[1], v.position[2], 1.0))
                .collect();

            for [a, b, c] in draw.geometry.triangles() {
                raster::rasterize_triangle([clip[a], clip[b], clip[c]], width, height, Cull::None, |f| {
                    let i = (f.y * width + f.x) as usize;
                    if f.depth < depth[i] {
                        depth[i] = f.depth;
                    }
                });
            }
        }

        Self {
            width,
            height,
            depth,
            view_projection: shadow.view_projection,
            bias: shadow.bias,
            normal_bias: shadow.normal_bias,
            kernel: kernel.max(1),
        }
    }

    /// Stored depth at a texel
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.depth[(y * self.width + x) as usize])
    }

    /// Fraction of light reaching `position`, 0 fully shadowed and 1 fully lit
    ///
    /// The position is pushed along `normal` by the normal bias before
    /// projection; the depth bias is added to the projected depth. Points
    /// outside the shadow camera's box are lit.
    pub fn visibility(&self, position: Vec3, normal: Vec3) -> f32 {
        let offset = position + normal * self.normal_bias;
        let clip = self.view_projection * Point3::from(offset).to_homogeneous();
        let Some(window) = raster::to_window(clip, self.width, self.height) else {
            return 1.0;
        };
        let (u, v) = (window.x / self.width as f32, window.y / self.height as f32);
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) || window.z > 1.0 {
            return 1.0;
        }

        let reference = window.z + self.bias;
        let center_x = (window.x.floor() as i64).clamp(0, i64::from(self.width) - 1);
        let center_y = (window.y.floor() as i64).clamp(0, i64::from(self.height) - 1);
        let half = i64::from(self.kernel / 2);

        let mut lit = 0_u32;
        let mut taps = 0_u32;
        for dy in -half..=half {
            for dx in -half..=half {
                let x = (center_x + dx).clamp(0, i64::from(self.width) - 1) as u32;
                let y = (center_y + dy).clamp(0, i64::from(self.height) - 1) as u32;
                taps += 1;
                if self.depth_at(x, y).is_some_and(|stored| reference <= stored) {
                    lit += 1;
                }
            }
        }
        lit as f32 / taps as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat3, Mat4Ext};
    use crate::render::{material::StandardMaterial, mesh::Geometry};
    use crate::scene::NodeId;
    use approx::assert_relative_eq;

    fn overhead_light() -> ShadowData {
        let view = Mat4::look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::zeros(), Vec3::z());
        let projection = Mat4::orthographic(-5.0, 5.0, -5.0, 5.0, 0.5, 15.0);
        ShadowData {
            view_projection: projection * view,
            bias: -0.004,
            normal_bias: 0.0,
            map_size: (32, 32),
        }
    }

    #[test]
    fn test_occluder_shadows_point_below() {
        let geometry = Geometry::plane(2.0, 2.0);
        let material = StandardMaterial::new();
        // Horizontal 2x2 occluder at y = 5
        let mut world = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0));
        world *= Mat4::from_euler_angles(-std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        let draws = [DrawItem {
            node: NodeId::default(),
            geometry: &geometry,
            material: &material,
            world,
            normal_matrix: Mat3::identity(),
            shadow: ShadowFlags::CAST,
        }];

        let map = ShadowMap::render(&overhead_light(), &draws, 1);
        assert_relative_eq!(map.visibility(Vec3::zeros(), Vec3::y()), 0.0);
        assert_relative_eq!(map.visibility(Vec3::new(4.0, 0.0, 4.0), Vec3::y()), 1.0);
        // Above the occluder
        assert_relative_eq!(map.visibility(Vec3::new(0.0, 7.0, 0.0), Vec3::y()), 1.0);
    }

    #[test]
    fn test_non_casters_are_ignored() {
        let geometry = Geometry::plane(20.0, 20.0);
        let material = StandardMaterial::new();
        let draws = [DrawItem {
            node: NodeId::default(),
            geometry: &geometry,
            material: &material,
            world: Mat4::from_euler_angles(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            normal_matrix: Mat3::identity(),
            shadow: ShadowFlags::RECEIVE,
        }];
        let map = ShadowMap::render(&overhead_light(), &draws, 3);
        assert_relative_eq!(map.visibility(Vec3::new(0.0, -1.0, 0.0), Vec3::y()), 1.0);
    }

    #[test]
    fn test_outside_box_is_lit() {
        let map = ShadowMap::render(&overhead_light(), &[], 5);
        assert_relative_eq!(map.visibility(Vec3::new(50.0, 0.0, 0.0), Vec3::y()), 1.0);
        assert_relative_eq!(map.visibility(Vec3::new(0.0, -20.0, 0.0), Vec3::y()), 1.0);
    }
}
