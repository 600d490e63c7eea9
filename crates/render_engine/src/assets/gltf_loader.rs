//! glTF model loader
//!
//! Loads `.gltf` (with external buffers and images) and `.glb` files into a
//! CPU-side [`Model`]: the node hierarchy of the default scene with
//! decomposed transforms, triangle primitives, metallic-roughness material
//! factors and decoded images. [`Model::instantiate`] copies it into a
//! [`Scene`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gltf::mesh::Mode;

use crate::assets::{AssetError, ImageData};
use crate::foundation::math::Transform;
use crate::render::{
    mesh::{Geometry, Vertex},
    texture::{ColorSpace, Texture, TextureHandle},
    Color, StandardMaterial,
};
use crate::scene::{MeshNode, Node, NodeId, NodeKind, Scene};

/// Metallic-roughness material as authored in the file
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMaterial {
    /// Material name
    pub name: String,
    /// Linear base colour factor
    pub color: Color,
    /// Roughness factor
    pub roughness: f32,
    /// Metalness factor
    pub metalness: f32,
    /// Occlusion strength
    pub occlusion_strength: f32,
    /// Image index of the base colour texture
    pub base_color_image: Option<usize>,
    /// Image index of the normal texture
    pub normal_image: Option<usize>,
    /// Image index of the occlusion texture (red channel)
    pub occlusion_image: Option<usize>,
    /// Image index of the metallic-roughness texture (green roughness, blue metalness)
    pub metallic_roughness_image: Option<usize>,
}

/// One triangle list with its material
#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    /// Vertex and index data
    pub geometry: Arc<Geometry>,
    /// Index into [`Model::materials`]; `None` uses the default material
    pub material: Option<usize>,
}

/// One node of the model hierarchy
#[derive(Debug, Clone)]
pub struct ModelNode {
    /// Node name
    pub name: String,
    /// Transform relative to the parent
    pub transform: Transform,
    /// Indices into [`Model::nodes`]
    pub children: Vec<usize>,
    /// Primitives of the node's mesh
    pub primitives: Vec<ModelPrimitive>,
}

/// A decoded glTF model
#[derive(Debug, Clone)]
pub struct Model {
    /// File name or label
    pub name: String,
    /// All nodes, indexed like the source document
    pub nodes: Vec<ModelNode>,
    /// Top-level nodes of the default scene
    pub roots: Vec<usize>,
    /// Materials, indexed like the source document
    pub materials: Vec<ModelMaterial>,
    /// Images converted to RGBA8, indexed like the source document
    pub images: Vec<ImageData>,
}

impl Model {
    /// Import a `.gltf` or `.glb` file, resolving external resources next to it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading glTF model from: {:?}", path);

        let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned());
        let model = Self::from_document(name, path, &document, &buffers, &images)?;

        log::info!(
            "Loaded glTF model {:?}: {} nodes, {} primitives, {} materials, {} images",
            path,
            model.nodes.len(),
            model.primitive_count(),
            model.materials.len(),
            model.images.len()
        );
        Ok(model)
    }

    /// Import a self-contained glTF or GLB from memory
    pub fn from_slice(name: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let path = PathBuf::from(name);
        let (document, buffers, images) = gltf::import_slice(bytes).map_err(|source| AssetError::Gltf {
            path: path.clone(),
            source,
        })?;
        Self::from_document(name.to_string(), &path, &document, &buffers, &images)
    }

    fn from_document(
        name: String,
        path: &Path,
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
    ) -> Result<Self, AssetError> {
        let materials = document.materials().map(|m| convert_material(&m)).collect();

        let mut nodes = Vec::with_capacity(document.nodes().len());
        for node in document.nodes() {
            let (translation, rotation, scale) = node.transform().decomposed();
            let mut primitives = Vec::new();
            if let Some(mesh) = node.mesh() {
                for primitive in mesh.primitives() {
                    if let Some(converted) = convert_primitive(&primitive, buffers, path)? {
                        primitives.push(converted);
                    }
                }
            }
            nodes.push(ModelNode {
                name: node.name().map_or_else(|| format!("node_{}", node.index()), str::to_string),
                transform: Transform::from_components(translation, rotation, scale),
                children: node.children().map(|c| c.index()).collect(),
                primitives,
            });
        }

        let roots = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| scene.nodes().map(|n| n.index()).collect())
            .unwrap_or_default();

        let images = images
            .iter()
            .enumerate()
            .map(|(index, data)| {
                convert_image(data).unwrap_or_else(|| {
                    log::warn!("Image {} in {:?} has an unsupported format, using white", index, path);
                    ImageData::solid_color(1, 1, [255, 255, 255, 255])
                })
            })
            .collect();

        Ok(Self {
            name,
            nodes,
            roots,
            materials,
            images,
        })
    }

    /// Total primitives across all nodes
    pub fn primitive_count(&self) -> usize {
        self.nodes.iter().map(|n| n.primitives.len()).sum()
    }

    /// Copy the model into `scene` under a new group attached to the root
    ///
    /// Images are registered as scene textures; base colour images are marked
    /// sRGB. Meshes neither cast nor receive shadows until told to.
    pub fn instantiate(&self, scene: &mut Scene) -> NodeId {
        let mut image_textures: Vec<Option<TextureHandle>> = vec![None; self.images.len()];
        let srgb_images: Vec<usize> = self.materials.iter().filter_map(|m| m.base_color_image).collect();
        let mut texture_for = |scene: &mut Scene, image: Option<usize>| -> Option<TextureHandle> {
            let index = image?;
            if let Some(handle) = image_textures.get(index).copied().flatten() {
                return Some(handle);
            }
            let data = self.images.get(index)?.clone();
            let mut texture = Texture::from_image(format!("{}#image{}", self.name, index), data);
            texture.flip_y = false;
            texture.color_space = if srgb_images.contains(&index) {
                ColorSpace::Srgb
            } else {
                ColorSpace::None
            };
            let handle = scene.textures.insert(texture);
            image_textures[index] = Some(handle);
            Some(handle)
        };

        let materials: Vec<StandardMaterial> = self
            .materials
            .iter()
            .map(|m| {
                let mut material = StandardMaterial::new()
                    .with_name(m.name.clone())
                    .with_color(m.color)
                    .with_roughness_metalness(m.roughness, m.metalness);
                material.ao_map_intensity = m.occlusion_strength;
                material.map = texture_for(scene, m.base_color_image);
                material.normal_map = texture_for(scene, m.normal_image);
                material.ao_map = texture_for(scene, m.occlusion_image);
                let metallic_roughness = texture_for(scene, m.metallic_roughness_image);
                material.roughness_map = metallic_roughness;
                material.metalness_map = metallic_roughness;
                material
            })
            .collect();

        let group = scene.add(Node::group(self.name.clone()));
        let mut stack: Vec<(usize, NodeId)> = self.roots.iter().rev().map(|&i| (i, group)).collect();
        let mut visited = vec![false; self.nodes.len()];
        while let Some((index, parent)) = stack.pop() {
            let Some(source) = self.nodes.get(index) else {
                continue;
            };
            if std::mem::replace(&mut visited[index], true) {
                log::warn!("Node {} of {} is referenced twice, skipping repeat", index, self.name);
                continue;
            }

            let mesh_for = |primitive: &ModelPrimitive| {
                let material = primitive
                    .material
                    .and_then(|i| materials.get(i).cloned())
                    .unwrap_or_default();
                MeshNode::new(Arc::clone(&primitive.geometry), material)
            };

            let kind = match source.primitives.as_slice() {
                [single] => NodeKind::Mesh(mesh_for(single)),
                _ => NodeKind::Group,
            };
            let id = scene.add_child(parent, Node::new(source.name.clone(), kind).with_transform(source.transform.clone()));
            if source.primitives.len() > 1 {
                for (i, primitive) in source.primitives.iter().enumerate() {
                    scene.add_child(id, Node::mesh(format!("{}_{}", source.name, i), mesh_for(primitive)));
                }
            }
            stack.extend(source.children.iter().rev().map(|&child| (child, id)));
        }

        log::debug!("Instantiated {} ({} meshes)", self.name, scene.mesh_count(group));
        group
    }
}

fn convert_material(material: &gltf::Material<'_>) -> ModelMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    ModelMaterial {
        name: material.name().unwrap_or("material").to_string(),
        color: Color::linear(r, g, b),
        roughness: pbr.roughness_factor(),
        metalness: pbr.metallic_factor(),
        occlusion_strength: material.occlusion_texture().map_or(1.0, |t| t.strength()),
        base_color_image: pbr.base_color_texture().map(|t| t.texture().source().index()),
        normal_image: material.normal_texture().map(|t| t.texture().source().index()),
        occlusion_image: material.occlusion_texture().map(|t| t.texture().source().index()),
        metallic_roughness_image: pbr.metallic_roughness_texture().map(|t| t.texture().source().index()),
    }
}

fn convert_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    path: &Path,
) -> Result<Option<ModelPrimitive>, AssetError> {
    if primitive.mode() != Mode::Triangles {
        log::debug!("Skipping non-triangle primitive in {:?}", path);
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| AssetError::InvalidData {
            path: path.to_path_buf(),
            reason: "primitive without positions".to_string(),
        })?
        .collect();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let tex_coords: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|i| i.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals.as_ref().and_then(|n| n.get(i).copied()).unwrap_or([0.0, 1.0, 0.0]);
            let tex_coord = tex_coords.get(i).copied().unwrap_or([0.0, 0.0]);
            Vertex::new(position, normal, tex_coord)
        })
        .collect();

    let mut geometry = Geometry::new(vertices, indices);
    if normals.is_none() {
        geometry.compute_vertex_normals();
    }
    Ok(Some(ModelPrimitive {
        geometry: Arc::new(geometry),
        material: primitive.material().index(),
    }))
}

fn unorm16(bytes: &[u8]) -> u8 {
    // Little-endian; the high byte is the 8-bit approximation
    bytes[1]
}

fn float32(bytes: &[u8]) -> u8 {
    let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn convert_image(data: &gltf::image::Data) -> Option<ImageData> {
    use gltf::image::Format;

    let (stride, expand): (usize, fn(&[u8]) -> [u8; 4]) = match data.format {
        Format::R8 => (1, |p| [p[0], p[0], p[0], 255]),
        Format::R8G8 => (2, |p| [p[0], p[1], 0, 255]),
        Format::R8G8B8 => (3, |p| [p[0], p[1], p[2], 255]),
        Format::R8G8B8A8 => (4, |p| [p[0], p[1], p[2], p[3]]),
        Format::R16 => (2, |p| {
            let v = unorm16(p);
            [v, v, v, 255]
        }),
        Format::R16G16 => (4, |p| [unorm16(&p[0..2]), unorm16(&p[2..4]), 0, 255]),
        Format::R16G16B16 => (6, |p| [unorm16(&p[0..2]), unorm16(&p[2..4]), unorm16(&p[4..6]), 255]),
        Format::R16G16B16A16 => (8, |p| {
            [unorm16(&p[0..2]), unorm16(&p[2..4]), unorm16(&p[4..6]), unorm16(&p[6..8])]
        }),
        Format::R32G32B32FLOAT => (12, |p| [float32(&p[0..4]), float32(&p[4..8]), float32(&p[8..12]), 255]),
        Format::R32G32B32A32FLOAT => (16, |p| {
            [float32(&p[0..4]), float32(&p[4..8]), float32(&p[8..12]), float32(&p[12..16])]
        }),
    };

    let pixel_count = (data.width * data.height) as usize;
    if data.pixels.len() < pixel_count * stride {
        return None;
    }
    let pixels = data.pixels.chunks_exact(stride).take(pixel_count).flat_map(expand).collect();
    Some(ImageData {
        data: pixels,
        width: data.width,
        height: data.height,
        channels: 4,
    })
}
