//! Meshes and models.
//!
//! A [`Model`] is the flat, ordered list of [`Mesh`]es produced from one
//! imported asset, together with the directory its textures are resolved
//! against and the cache of textures already uploaded for it. Loading lives in
//! [`crate::resources`]; this module holds the data and the draw contract.

use std::path::{Path, PathBuf};

use crate::{
    data_structures::texture::{TextureCache, TextureRef, TextureRole},
    render::{DrawBackend, MeshBuffers, MeshUploader, ShaderProgram},
};

/// Anything that can describe its own vertex buffer layout to wgpu.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Vertex layout shared by all meshes.
///
/// `tangent` and `bitangent` are only meaningful when the source mesh had
/// texture coordinates; otherwise `tex_coords` is `[0, 0]` and both are zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

/**
 * offset: each attribute starts where the previous one ends.
 * stride: length of a vertex
 *
 * Locations: 0 position, 1 normal, 2 tex_coords, 3 tangent, 4 bitangent
 */
impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// One drawable unit: vertices, triangle indices and the textures bound while drawing it.
///
/// GPU buffers are allocated once in [`Mesh::new`] and never reallocated.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
    textures: Vec<TextureRef>,
    buffers: MeshBuffers,
}

impl Mesh {
    pub fn new<U: MeshUploader + ?Sized>(
        name: impl Into<String>,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
        textures: Vec<TextureRef>,
        uploader: &mut U,
    ) -> Self {
        let name = name.into();
        let buffers = uploader.upload_mesh(&name, &vertices, &indices);
        Self {
            name,
            vertices,
            indices,
            textures,
            buffers,
        }
    }

    /// Binds every texture to its own unit (in order) and issues one indexed draw.
    ///
    /// Sampler uniforms are named by role and a 1-based counter per role, so the
    /// second diffuse texture of this mesh is bound to `texture_diffuse2`.
    pub fn draw<S, B>(&self, shader: &mut S, backend: &mut B)
    where
        S: ShaderProgram + ?Sized,
        B: DrawBackend + ?Sized,
    {
        let mut role_counters = [0u32; TextureRole::ALL.len()];
        for (unit, texture) in self.textures.iter().enumerate() {
            let counter = &mut role_counters[texture.role as usize];
            *counter += 1;
            let uniform = format!("{}{}", texture.role.uniform_prefix(), counter);
            shader.set_int(&uniform, unit as i32);
            backend.bind_texture(unit as u32, texture.handle);
        }

        backend.draw_indexed(self.buffers, self.indices.len() as u32);
        backend.reset_texture_unit();
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    pub fn buffers(&self) -> MeshBuffers {
        self.buffers
    }
}

/// All meshes of one loaded asset, in scene traversal order.
#[derive(Debug, Default)]
pub struct Model {
    directory: PathBuf,
    meshes: Vec<Mesh>,
    textures_loaded: TextureCache,
    gamma_correction: bool,
}

impl Model {
    /// A model without meshes; what a failed load leaves behind.
    pub fn empty(directory: impl Into<PathBuf>, gamma_correction: bool) -> Self {
        Self {
            directory: directory.into(),
            gamma_correction,
            ..Default::default()
        }
    }

    pub(crate) fn from_parts(
        directory: PathBuf,
        meshes: Vec<Mesh>,
        textures_loaded: TextureCache,
        gamma_correction: bool,
    ) -> Self {
        Self {
            directory,
            meshes,
            textures_loaded,
            gamma_correction,
        }
    }

    /// Draws every mesh in order.
    pub fn draw<S, B>(&self, shader: &mut S, backend: &mut B)
    where
        S: ShaderProgram + ?Sized,
        B: DrawBackend + ?Sized,
    {
        for mesh in &self.meshes {
            mesh.draw(shader, backend);
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Directory relative texture paths are resolved against.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn textures_loaded(&self) -> &TextureCache {
        &self.textures_loaded
    }

    pub fn gamma_correction(&self) -> bool {
        self.gamma_correction
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Matrix2, Matrix3, Matrix4, Vector2, Vector3, Vector4};

    use super::*;
    use crate::render::TextureHandle;

    #[derive(Default)]
    struct Recorder {
        uniforms: Vec<(String, i32)>,
        uploads: u32,
    }

    impl MeshUploader for Recorder {
        fn upload_mesh(&mut self, _: &str, _: &[ModelVertex], _: &[u32]) -> MeshBuffers {
            self.uploads += 1;
            MeshBuffers(self.uploads)
        }
    }

    impl ShaderProgram for Recorder {
        fn activate(&mut self) {}
        fn set_int(&mut self, name: &str, value: i32) {
            self.uniforms.push((name.to_string(), value));
        }
        fn set_float(&mut self, _: &str, _: f32) {}
        fn set_vec2(&mut self, _: &str, _: Vector2<f32>) {}
        fn set_vec3(&mut self, _: &str, _: Vector3<f32>) {}
        fn set_vec4(&mut self, _: &str, _: Vector4<f32>) {}
        fn set_mat2(&mut self, _: &str, _: &Matrix2<f32>) {}
        fn set_mat3(&mut self, _: &str, _: &Matrix3<f32>) {}
        fn set_mat4(&mut self, _: &str, _: &Matrix4<f32>) {}
    }

    #[derive(Default)]
    struct Backend {
        bound: Vec<(u32, TextureHandle)>,
        draws: Vec<(MeshBuffers, u32)>,
        resets: usize,
    }

    impl DrawBackend for Backend {
        fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
            self.bound.push((unit, texture));
        }
        fn draw_indexed(&mut self, buffers: MeshBuffers, index_count: u32) {
            self.draws.push((buffers, index_count));
        }
        fn reset_texture_unit(&mut self) {
            self.resets += 1;
        }
    }

    fn texture(n: u32, role: TextureRole) -> TextureRef {
        TextureRef {
            handle: TextureHandle(n),
            role,
            path: format!("{n}.png"),
        }
    }

    #[test]
    fn sampler_names_count_per_role() {
        let mut recorder = Recorder::default();
        let mesh = Mesh::new(
            "crate",
            vec![ModelVertex::default(); 3],
            vec![0, 1, 2],
            vec![
                texture(10, TextureRole::Diffuse),
                texture(11, TextureRole::Specular),
                texture(12, TextureRole::Diffuse),
                texture(13, TextureRole::Normal),
                texture(14, TextureRole::Height),
            ],
            &mut recorder,
        );

        let mut backend = Backend::default();
        mesh.draw(&mut recorder, &mut backend);

        let names: Vec<_> = recorder.uniforms.iter().map(|(n, u)| (n.as_str(), *u)).collect();
        assert_eq!(
            names,
            [
                ("texture_diffuse1", 0),
                ("texture_specular1", 1),
                ("texture_diffuse2", 2),
                ("texture_normal1", 3),
                ("texture_height1", 4),
            ]
        );
        let units: Vec<_> = backend.bound.iter().map(|(u, h)| (*u, h.0)).collect();
        assert_eq!(units, [(0, 10), (1, 11), (2, 12), (3, 13), (4, 14)]);
        assert_eq!(backend.draws, [(MeshBuffers(1), 3)]);
        assert_eq!(backend.resets, 1);
    }

    #[test]
    fn buffers_are_allocated_once_per_mesh() {
        let mut recorder = Recorder::default();
        let mesh = Mesh::new(
            "tri",
            vec![ModelVertex::default(); 3],
            vec![0, 1, 2],
            vec![],
            &mut recorder,
        );

        let mut backend = Backend::default();
        mesh.draw(&mut recorder, &mut backend);
        mesh.draw(&mut recorder, &mut backend);

        assert_eq!(recorder.uploads, 1);
        assert_eq!(backend.draws, [(MeshBuffers(1), 3), (MeshBuffers(1), 3)]);
    }

    #[test]
    fn model_draws_meshes_in_order() {
        let mut recorder = Recorder::default();
        let meshes = (0..3u32)
            .map(|i| {
                Mesh::new(
                    format!("m{i}"),
                    vec![ModelVertex::default(); 3],
                    (0..3 * (i + 1)).map(|n| n % 3).collect(),
                    vec![],
                    &mut recorder,
                )
            })
            .collect();
        let model = Model::from_parts(PathBuf::from("assets"), meshes, TextureCache::new(), false);

        let mut backend = Backend::default();
        model.draw(&mut recorder, &mut backend);

        assert_eq!(
            backend.draws,
            [(MeshBuffers(1), 3), (MeshBuffers(2), 6), (MeshBuffers(3), 9)]
        );
        assert_eq!(model.vertex_count(), 9);
        assert_eq!(model.index_count(), 18);
        assert_eq!(model.directory(), Path::new("assets"));
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride, std::mem::size_of::<ModelVertex>() as u64);
        assert_eq!(desc.array_stride, 14 * 4);
        let last = desc.attributes.last().unwrap();
        assert_eq!(last.offset, 11 * 4);
    }
}
