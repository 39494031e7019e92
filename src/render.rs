//! Collaborator seams between the model/camera core and whatever renders it.
//!
//! The core never talks to a graphics API directly. It consumes four services:
//!
//! - [`TextureUploader`] allocates texture storage and fills it from decoded pixels
//! - [`MeshUploader`] allocates the vertex/index buffers of a mesh once
//! - [`ShaderProgram`] receives named uniforms (sampler units, matrices, ...)
//! - [`DrawBackend`] binds textures to units and submits indexed triangle draws
//!
//! [`crate::context::Context`] implements the upload services on top of wgpu.

use cgmath::{Matrix2, Matrix3, Matrix4, Vector2, Vector3, Vector4};

use crate::data_structures::{model::ModelVertex, texture::DecodedImage};

/// Opaque texture name handed out by a [`TextureUploader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Opaque name of the vertex/index buffers of one mesh, handed out by a [`MeshUploader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshBuffers(pub u32);

pub trait TextureUploader {
    /// Reserve a texture name. The storage stays empty until [`write_texture`](Self::write_texture).
    fn allocate_texture(&mut self, label: &str) -> TextureHandle;

    /// Fill `handle` from decoded pixels. Channel counts other than 1, 3 and 4 are rejected.
    fn write_texture(
        &mut self,
        handle: TextureHandle,
        image: &DecodedImage,
        srgb: bool,
    ) -> anyhow::Result<()>;
}

pub trait MeshUploader {
    fn upload_mesh(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> MeshBuffers;
}

/// Everything a model needs while it is being constructed.
pub trait GpuUpload: TextureUploader + MeshUploader {}

impl<T: TextureUploader + MeshUploader + ?Sized> GpuUpload for T {}

/// A linked shader program. Name resolution and storage of uniforms are up to the implementor.
pub trait ShaderProgram {
    fn activate(&mut self);

    fn set_int(&mut self, name: &str, value: i32);

    fn set_float(&mut self, name: &str, value: f32);

    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_int(name, value as i32);
    }

    fn set_vec2(&mut self, name: &str, value: Vector2<f32>);

    fn set_vec3(&mut self, name: &str, value: Vector3<f32>);

    fn set_vec4(&mut self, name: &str, value: Vector4<f32>);

    fn set_mat2(&mut self, name: &str, value: &Matrix2<f32>);

    fn set_mat3(&mut self, name: &str, value: &Matrix3<f32>);

    fn set_mat4(&mut self, name: &str, value: &Matrix4<f32>);
}

pub trait DrawBackend {
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Draw `index_count` indices of `buffers` as a triangle list.
    fn draw_indexed(&mut self, buffers: MeshBuffers, index_count: u32);

    /// Called once a mesh is drawn so the next one starts from texture unit 0.
    fn reset_texture_unit(&mut self) {}
}
