use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::ModelVertex,
        texture::{DecodedImage, Texture},
    },
    render::{MeshBuffers, MeshUploader, TextureHandle, TextureUploader},
};

/// Vertex and index buffer of one uploaded mesh.
#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

/**
 * wgpu implementation of the texture upload and mesh buffer services.
 *
 * Handles index into the context's own tables. A texture handle whose image
 * never decoded stays allocated but has no [`Texture`] behind it.
 */
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    textures: Vec<Option<Texture>>,
    meshes: Vec<GpuMesh>,
}

impl Context {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: Vec::new(),
            meshes: Vec::new(),
        }
    }

    /// A context without a surface, e.g. for loading assets in tests or tools.
    pub async fn headless() -> anyhow::Result<Self> {
        log::info!("WGPU setup (headless)");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter found")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("meshcam device"),
                required_features: wgpu::Features::empty(),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: Default::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        Ok(Self::new(device, queue))
    }

    /// `None` for unknown handles and for textures whose image failed to load.
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.0 as usize)?.as_ref()
    }

    pub fn mesh(&self, buffers: MeshBuffers) -> Option<&GpuMesh> {
        self.meshes.get(buffers.0 as usize)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl TextureUploader for Context {
    fn allocate_texture(&mut self, label: &str) -> TextureHandle {
        log::debug!("Allocating texture {} for {}", self.textures.len(), label);
        self.textures.push(None);
        TextureHandle((self.textures.len() - 1) as u32)
    }

    fn write_texture(
        &mut self,
        handle: TextureHandle,
        image: &DecodedImage,
        srgb: bool,
    ) -> anyhow::Result<()> {
        let slot = self
            .textures
            .get_mut(handle.0 as usize)
            .with_context(|| format!("Texture handle {} was never allocated", handle.0))?;
        let label = format!("texture {}", handle.0);
        *slot = Some(Texture::from_decoded(
            &self.device,
            &self.queue,
            image,
            Some(&label),
            srgb,
        )?);
        Ok(())
    }
}

impl MeshUploader for Context {
    fn upload_mesh(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> MeshBuffers {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.meshes.push(GpuMesh {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        });
        MeshBuffers((self.meshes.len() - 1) as u32)
    }
}
