//! Triangle setup and scan conversion
//!
//! Shared by the colour and shadow passes. Vertices arrive in clip space;
//! fragments come back with window depth in `[0, 1]` and perspective-correct
//! barycentric weights the caller uses to interpolate its own attributes.

use crate::foundation::math::{Vec3, Vec4};

/// Clip-space `w` below which a point has no window position
const MIN_W: f32 = 1e-5;

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cull {
    /// Drop triangles wound clockwise in NDC
    Back,
    /// Keep both windings
    None,
}

/// One covered pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Column
    pub x: u32,
    /// Row, 0 at the top
    pub y: u32,
    /// Window depth, 0 near and 1 far
    pub depth: f32,
    /// Perspective-correct barycentric weights
    pub weights: Vec3,
}

/// Window position of a clip-space point: pixels with y down, depth in `[0, 1]`
pub fn to_window(clip: Vec4, width: u32, height: u32) -> Option<Vec3> {
    if clip.w <= MIN_W {
        return None;
    }
    let ndc = clip.xyz() / clip.w;
    Some(Vec3::new(
        (ndc.x * 0.5 + 0.5) * width as f32,
        (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32,
        ndc.z * 0.5 + 0.5,
    ))
}

fn edge(a: Vec3, b: Vec3, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Clip-space vertex with its barycentric position in the source triangle
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    source: Vec3,
}

/// A triangle clipped against one plane has at most four corners
#[derive(Debug, Clone, Copy)]
struct ClippedPolygon {
    vertices: [ClipVertex; 4],
    len: usize,
}

impl ClippedPolygon {
    fn push(&mut self, vertex: ClipVertex) {
        self.vertices[self.len] = vertex;
        self.len += 1;
    }

    fn as_slice(&self) -> &[ClipVertex] {
        &self.vertices[..self.len]
    }
}

/// Signed distance to the near plane in clip space, non-negative inside
fn near_distance(clip: Vec4) -> f32 {
    clip.z + clip.w
}

/// Sutherland-Hodgman against `z >= -w`
fn clip_near(clip: [Vec4; 3]) -> ClippedPolygon {
    let corners = [
        ClipVertex { clip: clip[0], source: Vec3::x() },
        ClipVertex { clip: clip[1], source: Vec3::y() },
        ClipVertex { clip: clip[2], source: Vec3::z() },
    ];
    let mut polygon = ClippedPolygon {
        vertices: [corners[0]; 4],
        len: 0,
    };

    for i in 0..3 {
        let current = corners[i];
        let next = corners[(i + 1) % 3];
        let d_current = near_distance(current.clip);
        let d_next = near_distance(next.clip);

        if d_current >= 0.0 {
            polygon.push(current);
        }
        if (d_current >= 0.0) != (d_next >= 0.0) {
            let t = d_current / (d_current - d_next);
            polygon.push(ClipVertex {
                clip: current.clip.lerp(&next.clip, t),
                source: current.source.lerp(&next.source, t),
            });
        }
    }
    polygon
}

/// Scan-convert one triangle, calling `emit` for every covered pixel centre
///
/// The triangle is clipped against the near plane first, so geometry passing
/// beside or behind the eye still draws its visible part. Fragment weights
/// always refer to the three input vertices.
pub fn rasterize_triangle(clip: [Vec4; 3], width: u32, height: u32, cull: Cull, mut emit: impl FnMut(Fragment)) {
    let polygon = clip_near(clip);
    let vertices = polygon.as_slice();
    for i in 1..vertices.len().saturating_sub(1) {
        scan_triangle([vertices[0], vertices[i], vertices[i + 1]], width, height, cull, &mut emit);
    }
}

fn scan_triangle(triangle: [ClipVertex; 3], width: u32, height: u32, cull: Cull, emit: &mut impl FnMut(Fragment)) {
    let (Some(a), Some(b), Some(c)) = (
        to_window(triangle[0].clip, width, height),
        to_window(triangle[1].clip, width, height),
        to_window(triangle[2].clip, width, height),
    ) else {
        return;
    };

    // Window y points down, so a counter-clockwise NDC triangle has negative area here
    let area = edge(a, b, c.x, c.y);
    if area == 0.0 || (cull == Cull::Back && area > 0.0) {
        return;
    }

    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
    let max_x = a.x.max(b.x).max(c.x).ceil().min(width as f32) as u32;
    let max_y = a.y.max(b.y).max(c.y).ceil().min(height as f32) as u32;

    let inv_w = Vec3::new(
        1.0 / triangle[0].clip.w,
        1.0 / triangle[1].clip.w,
        1.0 / triangle[2].clip.w,
    );

    for y in min_y..max_y {
        let py = y as f32 + 0.5;
        for x in min_x..max_x {
            let px = x as f32 + 0.5;
            let w0 = edge(b, c, px, py) / area;
            let w1 = edge(c, a, px, py) / area;
            let w2 = edge(a, b, px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let depth = w0 * a.z + w1 * b.z + w2 * c.z;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            let perspective = Vec3::new(w0 * inv_w.x, w1 * inv_w.y, w2 * inv_w.z);
            let sum = perspective.x + perspective.y + perspective.z;
            if sum <= 0.0 {
                continue;
            }
            let local = perspective / sum;
            emit(Fragment {
                x,
                y,
                depth,
                weights: triangle[0].source * local.x + triangle[1].source * local.y + triangle[2].source * local.z,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ccw_full_screen() -> [Vec4; 3] {
        [
            Vec4::new(-1.0, -1.0, 0.0, 1.0),
            Vec4::new(3.0, -1.0, 0.0, 1.0),
            Vec4::new(-1.0, 3.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_front_facing_covers_every_pixel() {
        let mut count = 0;
        rasterize_triangle(ccw_full_screen(), 4, 4, Cull::Back, |f| {
            assert_relative_eq!(f.depth, 0.5);
            count += 1;
        });
        assert_eq!(count, 16);
    }

    #[test]
    fn test_back_facing_is_culled() {
        let [a, b, c] = ccw_full_screen();
        let mut count = 0;
        rasterize_triangle([a, c, b], 4, 4, Cull::Back, |_| count += 1);
        assert_eq!(count, 0);

        rasterize_triangle([a, c, b], 4, 4, Cull::None, |_| count += 1);
        assert_eq!(count, 16);
    }

    #[test]
    fn test_fully_behind_eye_is_rejected() {
        let tri = [
            Vec4::new(-1.0, -1.0, -2.0, 1.0),
            Vec4::new(3.0, -1.0, -2.0, 1.0),
            Vec4::new(-1.0, 3.0, -2.0, 1.0),
        ];
        let mut count = 0;
        rasterize_triangle(tri, 4, 4, Cull::None, |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_straddling_near_plane_is_clipped_not_dropped() {
        // One corner sits behind the eye; the part in front still covers pixels
        let tri = [
            Vec4::new(-1.0, -1.0, 0.0, 1.0),
            Vec4::new(1.0, -1.0, 0.0, 1.0),
            Vec4::new(0.0, 3.0, -3.0, -1.0),
        ];
        let mut count = 0;
        rasterize_triangle(tri, 8, 8, Cull::None, |f| {
            assert_relative_eq!(f.weights.sum(), 1.0, epsilon = 1e-5);
            assert!(f.weights.z < 0.5);
            count += 1;
        });
        assert!(count > 0);
    }

    #[test]
    fn test_clip_near_keeps_inside_triangle_whole() {
        let polygon = clip_near(ccw_full_screen());
        assert_eq!(polygon.len, 3);

        let mut tri = ccw_full_screen();
        tri[2] = Vec4::new(-1.0, 3.0, -2.0, 1.0);
        let polygon = clip_near(tri);
        assert_eq!(polygon.len, 4);
        for vertex in polygon.as_slice() {
            assert!(near_distance(vertex.clip) >= -1e-6);
            assert_relative_eq!(vertex.source.sum(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let tri = [
            Vec4::new(-2.0, -2.0, 0.0, 2.0),
            Vec4::new(1.0, -1.0, 0.0, 1.0),
            Vec4::new(-1.0, 1.0, 0.0, 1.0),
        ];
        rasterize_triangle(tri, 8, 8, Cull::None, |f| {
            assert_relative_eq!(f.weights.sum(), 1.0, epsilon = 1e-5);
        });
    }

    #[test]
    fn test_window_mapping_flips_y() {
        let top_left = to_window(Vec4::new(-1.0, 1.0, -1.0, 1.0), 10, 20).unwrap();
        assert_relative_eq!(top_left, Vec3::new(0.0, 0.0, 0.0));
        assert!(to_window(Vec4::new(0.0, 0.0, 0.0, 0.0), 10, 20).is_none());
    }
}
