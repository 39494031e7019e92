//! Texture references, decoded pixel data and GPU texture creation.
//!
//! A mesh only ever sees [`TextureRef`]s: an opaque handle, the role it plays
//! in shading and the path it was loaded from. The pixels themselves travel
//! as [`DecodedImage`] from the decoder to a texture upload service, and
//! [`Texture`] is what the wgpu backend turns them into.

use std::collections::HashMap;

use anyhow::*;
use image::DynamicImage;

use crate::{data_structures::scene_graph::TextureCategory, render::TextureHandle};

/// How a texture is sampled by the shading stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureRole {
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Diffuse,
        TextureRole::Specular,
        TextureRole::Normal,
        TextureRole::Height,
    ];

    /// Sampler uniforms are named `<prefix><n>`, e.g. `texture_diffuse1`.
    pub fn uniform_prefix(self) -> &'static str {
        match self {
            TextureRole::Diffuse => "texture_diffuse",
            TextureRole::Specular => "texture_specular",
            TextureRole::Normal => "texture_normal",
            TextureRole::Height => "texture_height",
        }
    }
}

/// Which material texture categories are loaded, in which order, and as which role.
///
/// The default follows the common obj convention where bump maps arrive as
/// height textures but are really normal maps, and the ambient slot carries
/// the height map:
///
/// | category  | role     |
/// |-----------|----------|
/// | Diffuse   | Diffuse  |
/// | Specular  | Specular |
/// | Height    | Normal   |
/// | Normals   | Normal   |
/// | Ambient   | Height   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRoleMap {
    entries: Vec<(TextureCategory, TextureRole)>,
}

impl TextureRoleMap {
    /// A map that loads no textures at all.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Maps `category` to `role`, replacing an existing mapping for that category in place.
    pub fn with(mut self, category: TextureCategory, role: TextureRole) -> Self {
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = role,
            None => self.entries.push((category, role)),
        }
        self
    }

    pub fn without(mut self, category: TextureCategory) -> Self {
        self.entries.retain(|(c, _)| *c != category);
        self
    }

    pub fn role_for(&self, category: TextureCategory) -> Option<TextureRole> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, role)| *role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureCategory, TextureRole)> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for TextureRoleMap {
    fn default() -> Self {
        Self::empty()
            .with(TextureCategory::Diffuse, TextureRole::Diffuse)
            .with(TextureCategory::Specular, TextureRole::Specular)
            .with(TextureCategory::Height, TextureRole::Normal)
            .with(TextureCategory::Normals, TextureRole::Normal)
            .with(TextureCategory::Ambient, TextureRole::Height)
    }
}

/// A texture slot of a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub handle: TextureHandle,
    pub role: TextureRole,
    /// Path as written in the material, relative to the model directory.
    pub path: String,
}

/// Textures already uploaded for one model, keyed by their material path.
///
/// Lookups compare the path strings exactly; two spellings of the same file
/// are two textures.
#[derive(Debug, Clone, Default)]
pub struct TextureCache {
    loaded: Vec<TextureRef>,
    by_path: HashMap<String, usize>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&TextureRef> {
        self.by_path.get(path).map(|&idx| &self.loaded[idx])
    }

    /// Records a freshly uploaded texture. The first upload of a path wins.
    pub fn insert(&mut self, texture: TextureRef) {
        if self.by_path.contains_key(&texture.path) {
            return;
        }
        self.by_path.insert(texture.path.clone(), self.loaded.len());
        self.loaded.push(texture);
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Loaded textures in upload order.
    pub fn iter(&self) -> impl Iterator<Item = &TextureRef> {
        self.loaded.iter()
    }
}

/// Texel layout of a decoded image, derived from its channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Result<Self> {
        match channels {
            1 => Ok(PixelFormat::Red),
            3 => Ok(PixelFormat::Rgb),
            4 => Ok(PixelFormat::Rgba),
            other => bail!("unsupported channel count {other}, expected 1, 3 or 4"),
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// 8-bit pixels as they come out of the image decoder, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Keeps 8-bit luma/RGB/RGBA data as is; luma-alpha stays 2-channel (and is
    /// rejected on upload); anything wider is converted to RGBA8.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (channels, pixels) = match img {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    pub fn format(&self) -> Result<PixelFormat> {
        PixelFormat::from_channels(self.channels)
    }

    /// Expands 3-channel data to RGBA since wgpu has no 24-bit texel format.
    pub(crate) fn texel_data(&self) -> Result<(PixelFormat, std::borrow::Cow<'_, [u8]>)> {
        let format = self.format()?;
        let expected = self.width as usize * self.height as usize * format.channels() as usize;
        if self.pixels.len() != expected {
            bail!(
                "image data has {} bytes, expected {} for {}x{}x{}",
                self.pixels.len(),
                expected,
                self.width,
                self.height,
                self.channels
            );
        }
        let data = match format {
            PixelFormat::Rgb => {
                let mut rgba = Vec::with_capacity(self.pixels.len() / 3 * 4);
                for rgb in self.pixels.chunks(3) {
                    rgba.extend_from_slice(rgb);
                    rgba.push(255);
                }
                rgba.into()
            }
            PixelFormat::Red | PixelFormat::Rgba => self.pixels.as_slice().into(),
        };
        Ok((format, data))
    }
}

/// A GPU texture with a view and a sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Upload `image` as a 2D texture.
    ///
    /// # Arguments
    ///
    /// * `label` is used as a debug label for the GPU resource
    /// * `srgb` selects an sRGB format for colour data (gamma correction); ignored for single-channel images
    pub fn from_decoded(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &DecodedImage,
        label: Option<&str>,
        srgb: bool,
    ) -> Result<Self> {
        let (pixel_format, data) = image.texel_data()?;
        let (format, bytes_per_texel) = match pixel_format {
            PixelFormat::Red => (wgpu::TextureFormat::R8Unorm, 1),
            PixelFormat::Rgb | PixelFormat::Rgba if srgb => {
                (wgpu::TextureFormat::Rgba8UnormSrgb, 4)
            }
            PixelFormat::Rgb | PixelFormat::Rgba => (wgpu::TextureFormat::Rgba8Unorm, 4),
        };

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_texel * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

/// Repeat wrapping with linear filtering.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}
