//! Mesh geometry
//!
//! Vertex and index data for triangle meshes plus the primitive generators
//! the scene needs.

use crate::foundation::math::Vec3;

/// 3D vertex data structure for rendering
///
/// Position, normal and texture coordinate of one mesh corner.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a vertex from its attributes
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { position, normal, tex_coord }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Create geometry from vertices and triangle-list indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Flat rectangle in the XY plane, centred on the origin, facing +Z
    ///
    /// UVs run from (0, 0) at the bottom-left to (1, 1) at the top-right.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-hw, hh, 0.0], normal, [0.0, 1.0]),
            Vertex::new([hw, hh, 0.0], normal, [1.0, 1.0]),
            Vertex::new([-hw, -hh, 0.0], normal, [0.0, 0.0]),
            Vertex::new([hw, -hh, 0.0], normal, [1.0, 0.0]),
        ];
        // Counter-clockwise when seen from +Z
        let indices = vec![0, 2, 1, 2, 3, 1];
        Self { vertices, indices }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate triangles as vertex index triples, skipping out-of-range indices
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let vertex_count = self.vertices.len();
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
            .filter(move |tri| tri.iter().all(|&i| i < vertex_count))
    }

    /// Replace normals with area-weighted vertex normals
    pub fn compute_vertex_normals(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.vertices.len()];
        for [a, b, c] in self.triangles().collect::<Vec<_>>() {
            let pa = Vec3::from(self.vertices[a].position);
            let pb = Vec3::from(self.vertices[b].position);
            let pc = Vec3::from(self.vertices[c].position);
            let face = (pb - pa).cross(&(pc - pa));
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            let normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
            vertex.normal = normal.into();
        }
    }
}
