//! CPU reference rasterizer
//!
//! A straightforward forward renderer used for headless runs and as the
//! ground truth for the frame data the renderer produces:
//!
//! 1. one depth pass per shadow-casting light
//! 2. the environment background, or black
//! 3. meshes, depth tested and back-face culled, shaded per pixel
//! 4. helper lines
//!
//! Shading is Lambert diffuse plus a Blinn-Phong lobe whose exponent follows
//! roughness, with an ambient term from the environment's mean radiance.
//! Normal maps and multisampling are accepted but not applied.

mod framebuffer;
mod raster;
mod shadow_map;

pub use framebuffer::Framebuffer;
pub use shadow_map::ShadowMap;

use crate::foundation::math::{constants::PI, utils, Mat4, Point3, Vec2, Vec3, Vec4};
use crate::render::backend::{BackendResult, DrawItem, FrameData, LightData, RenderBackend, RenderError};
use crate::render::helpers::DebugLine;
use crate::scene::ShadowFlags;

use raster::Cull;

/// Reflectance of dielectrics at normal incidence
const DIELECTRIC_F0: f32 = 0.04;

/// Software backend producing an RGBA8 image
#[derive(Debug)]
pub struct SoftwareRasterizer {
    target: Framebuffer,
}

impl SoftwareRasterizer {
    /// Create a rasterizer with a `width` x `height` target
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: Framebuffer::new(width, height),
        }
    }

    /// Render target
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.target
    }

    fn draw_background(&mut self, frame: &FrameData<'_>) {
        self.target.clear([0, 0, 0, 255]);
        let Some(background) = frame.background else {
            return;
        };

        let Some(inverse) = (frame.projection * frame.view).try_inverse() else {
            return;
        };
        let (width, height) = (self.target.width(), self.target.height());
        for y in 0..height {
            let ndc_y = 1.0 - 2.0 * (y as f32 + 0.5) / height as f32;
            for x in 0..width {
                let ndc_x = 2.0 * (x as f32 + 0.5) / width as f32 - 1.0;
                let far = inverse * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
                let Some(far) = Point3::from_homogeneous(far) else {
                    continue;
                };
                let radiance = background.sample_direction(far.coords - frame.camera_position);
                let [r, g, b] = frame.tone_mapping.resolve(radiance, frame.exposure);
                self.target.set_pixel(x, y, [r, g, b, 255]);
            }
        }
    }

    fn draw_mesh(&mut self, frame: &FrameData<'_>, draw: &DrawItem<'_>, shadows: &[Option<ShadowMap>]) {
        let view_projection = frame.projection * frame.view;
        let mvp = view_projection * draw.world;
        let geometry = draw.geometry;

        let clip: Vec<Vec4> = geometry
            .vertices
            .iter()
            .map(|v| mvp * Vec4::new(v.position[0], v.position[1], v.position[2], 1.0))
            .collect();
        let world: Vec<Vec3> = geometry
            .vertices
            .iter()
            .map(|v| draw.world.transform_point(&Point3::from(v.position)).coords)
            .collect();
        let normals: Vec<Vec3> = geometry
            .vertices
            .iter()
            .map(|v| draw.normal_matrix * Vec3::from(v.normal))
            .collect();

        let (width, height) = (self.target.width(), self.target.height());
        let receive = draw.shadow.contains(ShadowFlags::RECEIVE);

        for [a, b, c] in geometry.triangles() {
            let mut fragments = Vec::new();
            raster::rasterize_triangle([clip[a], clip[b], clip[c]], width, height, Cull::Back, |f| {
                fragments.push(f);
            });

            for fragment in fragments {
                if !self.target.depth_test(fragment.x, fragment.y, fragment.depth) {
                    continue;
                }
                let w = fragment.weights;
                let position = world[a] * w.x + world[b] * w.y + world[c] * w.z;
                let normal = normals[a] * w.x + normals[b] * w.y + normals[c] * w.z;
                let uv = Vec2::from(geometry.vertices[a].tex_coord) * w.x
                    + Vec2::from(geometry.vertices[b].tex_coord) * w.y
                    + Vec2::from(geometry.vertices[c].tex_coord) * w.z;

                let surface = Surface {
                    position,
                    normal: normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y),
                    uv,
                };
                let radiance = shade(frame, draw, &surface, if receive { shadows } else { &[] });
                let [r, g, b] = frame.tone_mapping.resolve(radiance, frame.exposure);
                self.target.set_pixel(fragment.x, fragment.y, [r, g, b, 255]);
            }
        }
    }

    fn draw_line(&mut self, frame: &FrameData<'_>, view_projection: &Mat4, line: &DebugLine) {
        let (width, height) = (self.target.width(), self.target.height());
        let project = |p: Vec3| raster::to_window(view_projection * Point3::from(p).to_homogeneous(), width, height);
        let (Some(start), Some(end)) = (project(line.start), project(line.end)) else {
            return;
        };

        let [r, g, b] = frame.tone_mapping.resolve(line.color.to_vec3(), frame.exposure);
        let steps = (end.xy() - start.xy()).abs().max().ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let p = start.lerp(&end, t);
            if p.x < 0.0 || p.y < 0.0 || !(0.0..=1.0).contains(&p.z) {
                continue;
            }
            let (x, y) = (p.x as u32, p.y as u32);
            if self.target.depth_test(x, y, p.z) {
                self.target.set_pixel(x, y, [r, g, b, 255]);
            }
        }
    }
}

impl RenderBackend for SoftwareRasterizer {
    fn name(&self) -> &str {
        "software"
    }

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        self.target.resize(width, height);
        Ok(())
    }

    fn render_frame(&mut self, frame: &FrameData<'_>) -> BackendResult<()> {
        self.resize(frame.width, frame.height)?;

        let kernel = frame.shadow_map.kind.kernel_size();
        let shadows: Vec<Option<ShadowMap>> = frame
            .lights
            .iter()
            .map(|light| light.shadow.as_ref().map(|s| ShadowMap::render(s, &frame.draws, kernel)))
            .collect();

        self.draw_background(frame);
        for draw in &frame.draws {
            self.draw_mesh(frame, draw, &shadows);
        }

        let view_projection = frame.projection * frame.view;
        for line in &frame.lines {
            self.draw_line(frame, &view_projection, line);
        }
        Ok(())
    }

    fn read_pixels(&self) -> Option<(u32, u32, &[u8])> {
        Some((self.target.width(), self.target.height(), self.target.as_bytes()))
    }
}

/// Interpolated surface point
struct Surface {
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
}

/// Blinn-Phong exponent approximating a GGX lobe of the given roughness
fn shininess(roughness: f32) -> f32 {
    (2.0 / (roughness.powi(4) + 1e-4) - 2.0).clamp(1.0, 2048.0)
}

/// Outgoing linear radiance at a surface point
///
/// `shadows` is indexed like `frame.lights`; pass an empty slice for
/// meshes that do not receive shadows.
fn shade(frame: &FrameData<'_>, draw: &DrawItem<'_>, surface: &Surface, shadows: &[Option<ShadowMap>]) -> Vec3 {
    let material = draw.material;
    let textures = frame.textures;

    let mut base = material.color.to_vec3();
    if let Some(texel) = textures.sample(material.map, surface.uv) {
        base.component_mul_assign(&texel.xyz());
    }
    let ao_texel = textures.sample(material.ao_map, surface.uv).map_or(1.0, |t| t.x);
    let ao = utils::lerp(1.0, ao_texel, material.ao_map_intensity);
    let roughness = (material.roughness
        * textures.sample(material.roughness_map, surface.uv).map_or(1.0, |t| t.y))
    .clamp(0.0, 1.0);
    let metalness = (material.metalness
        * textures.sample(material.metalness_map, surface.uv).map_or(1.0, |t| t.z))
    .clamp(0.0, 1.0);

    let diffuse_color = base * (1.0 - metalness);
    let specular_color = Vec3::repeat(DIELECTRIC_F0).lerp(&base, metalness);
    let n = surface.normal;
    let v = (frame.camera_position - surface.position)
        .try_normalize(f32::EPSILON)
        .unwrap_or(n);
    let exponent = shininess(roughness);

    let mut color = Vec3::zeros();
    for (index, light) in frame.lights.iter().enumerate() {
        color += direct_light(light, n, v, diffuse_color, specular_color, exponent)
            * shadows
                .get(index)
                .and_then(Option::as_ref)
                .map_or(1.0, |map| map.visibility(surface.position, n));
    }

    if let Some(environment) = frame.environment {
        let intensity = frame.environment_intensity;
        let irradiance = environment.average_radiance() * intensity;
        color += irradiance.component_mul(&diffuse_color) * ao;

        let reflected = -v - n * 2.0 * (-v).dot(&n);
        let gloss = (1.0 - roughness).powi(2);
        let blurred = environment.sample_direction(reflected).lerp(&environment.average_radiance(), roughness);
        color += blurred.component_mul(&specular_color) * intensity * ao * utils::lerp(0.25, 1.0, gloss);
    }
    color
}

fn direct_light(light: &LightData, n: Vec3, v: Vec3, diffuse: Vec3, specular: Vec3, exponent: f32) -> Vec3 {
    let l = -light.direction;
    let n_dot_l = n.dot(&l).max(0.0);
    if n_dot_l <= 0.0 {
        return Vec3::zeros();
    }
    let h = (l + v).try_normalize(f32::EPSILON).unwrap_or(n);
    let lobe = (exponent + 2.0) / (8.0 * PI) * n.dot(&h).max(0.0).powf(exponent);
    let brdf = diffuse / PI + specular * lobe;
    light.radiance.component_mul(&brdf) * n_dot_l
}
