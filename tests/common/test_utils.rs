#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cgmath::{Matrix2, Matrix3, Matrix4, Vector2, Vector3, Vector4};
use meshcam::{
    data_structures::{model::ModelVertex, texture::DecodedImage},
    render::{DrawBackend, MeshBuffers, MeshUploader, ShaderProgram, TextureHandle, TextureUploader},
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh directory under the system temp dir, unique per test name and process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("meshcam-{}-{}", name, std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Encodes a solid `w`x`h` RGB image as PNG.
pub fn png_bytes(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb(rgb));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn write_png(path: &Path, rgb: [u8; 3]) {
    std::fs::write(path, png_bytes(2, 2, rgb)).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenTexture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub srgb: bool,
}

/// Records every upload and draw call instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct RecordingGpu {
    pub allocated: Vec<String>,
    pub written: Vec<WrittenTexture>,
    pub meshes: Vec<(String, usize, usize)>,
    pub bound: Vec<(u32, TextureHandle)>,
    pub draws: Vec<(MeshBuffers, u32)>,
    pub resets: usize,
}

impl TextureUploader for RecordingGpu {
    fn allocate_texture(&mut self, label: &str) -> TextureHandle {
        self.allocated.push(label.to_string());
        TextureHandle(self.allocated.len() as u32)
    }

    fn write_texture(&mut self, handle: TextureHandle, image: &DecodedImage, srgb: bool) -> anyhow::Result<()> {
        image.format()?;
        self.written.push(WrittenTexture {
            handle,
            width: image.width,
            height: image.height,
            channels: image.channels,
            srgb,
        });
        Ok(())
    }
}

impl MeshUploader for RecordingGpu {
    fn upload_mesh(&mut self, label: &str, vertices: &[ModelVertex], indices: &[u32]) -> MeshBuffers {
        self.meshes.push((label.to_string(), vertices.len(), indices.len()));
        MeshBuffers(self.meshes.len() as u32)
    }
}

impl DrawBackend for RecordingGpu {
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

/// Keeps the integer uniforms it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingShader {
    pub ints: Vec<(String, i32)>,
}

impl RecordingShader {
    pub fn names(&self) -> Vec<&str> {
        self.ints.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl ShaderProgram for RecordingShader {
    fn activate(&mut self) {}
    fn set_int(&mut self, name: &str, value: i32) {
        self.ints.push((name.to_string(), value));
    }
    fn set_float(&mut self, _: &str, _: f32) {}
    fn set_vec2(&mut self, _: &str, _: Vector2<f32>) {}
    fn set_vec3(&mut self, _: &str, _: Vector3<f32>) {}
    fn set_vec4(&mut self, _: &str, _: Vector4<f32>) {}
    fn set_mat2(&mut self, _: &str, _: &Matrix2<f32>) {}
    fn set_mat3(&mut self, _: &str, _: &Matrix3<f32>) {}
    fn set_mat4(&mut self, _: &str, _: &Matrix4<f32>) {}
}
