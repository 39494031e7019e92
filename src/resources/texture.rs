use std::path::Path;

use anyhow::Context;

use crate::{
    data_structures::texture::DecodedImage,
    render::{TextureHandle, TextureUploader},
};

/// Turns image files (or encoded image bytes) into raw pixels.
pub trait ImageSource {
    /// `None` when the file can't be read or decoded; the reason is logged.
    fn decode(&self, path: &Path) -> Option<DecodedImage>;

    /// Same as [`decode`](Self::decode) for an image stored inside an asset.
    fn decode_embedded(&self, label: &str, bytes: &[u8]) -> Option<DecodedImage>;
}

/// [`ImageSource`] backed by the `image` crate.
///
/// Whether rows are flipped on load is fixed when the decoder is created and
/// applies to every image it decodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder {
    flip_vertically: bool,
}

impl ImageDecoder {
    pub fn new(flip_vertically: bool) -> Self {
        Self { flip_vertically }
    }

    pub fn flips_vertically(&self) -> bool {
        self.flip_vertically
    }

    pub fn try_decode_bytes(&self, bytes: &[u8]) -> anyhow::Result<DecodedImage> {
        let img = image::load_from_memory(bytes)?;
        Ok(self.finish(img))
    }

    pub fn try_decode_file(&self, path: &Path) -> anyhow::Result<DecodedImage> {
        let img = image::open(path).with_context(|| format!("Failed to decode image {:?}", path))?;
        Ok(self.finish(img))
    }

    fn finish(&self, img: image::DynamicImage) -> DecodedImage {
        let img = if self.flip_vertically { img.flipv() } else { img };
        DecodedImage::from_dynamic(img)
    }
}

impl ImageSource for ImageDecoder {
    fn decode(&self, path: &Path) -> Option<DecodedImage> {
        match self.try_decode_file(path) {
            Ok(image) => Some(image),
            Err(e) => {
                log::error!("Texture failed to load at path {:?}: {:#}", path, e);
                None
            }
        }
    }

    fn decode_embedded(&self, label: &str, bytes: &[u8]) -> Option<DecodedImage> {
        match self.try_decode_bytes(bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                log::error!("Embedded texture {} failed to decode: {:#}", label, e);
                None
            }
        }
    }
}

/**
 * Allocates a texture and fills it from `file_name` resolved against `directory`.
 *
 * The handle is returned even when decoding or uploading fails. The texture is
 * then left empty, the failure is logged and drawing with it samples whatever
 * the backend initialises empty textures to.
 */
pub fn texture_from_file<U: TextureUploader + ?Sized>(
    file_name: &str,
    directory: &Path,
    decoder: &dyn ImageSource,
    uploader: &mut U,
    srgb: bool,
) -> TextureHandle {
    let path = directory.join(file_name);
    let handle = uploader.allocate_texture(file_name);

    if let Some(image) = decoder.decode(&path) {
        upload(handle, &image, file_name, uploader, srgb);
    }

    handle
}

/// Like [`texture_from_file`] for an image embedded in the asset.
pub fn texture_from_embedded<U: TextureUploader + ?Sized>(
    label: &str,
    bytes: &[u8],
    decoder: &dyn ImageSource,
    uploader: &mut U,
    srgb: bool,
) -> TextureHandle {
    let handle = uploader.allocate_texture(label);

    if let Some(image) = decoder.decode_embedded(label, bytes) {
        upload(handle, &image, label, uploader, srgb);
    }

    handle
}

fn upload<U: TextureUploader + ?Sized>(
    handle: TextureHandle,
    image: &DecodedImage,
    label: &str,
    uploader: &mut U,
    srgb: bool,
) {
    if let Err(e) = uploader.write_texture(handle, image, srgb) {
        log::error!("Texture {} could not be uploaded: {:#}", label, e);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes() -> Vec<u8> {
        // top row red, bottom row blue
        let img = image::RgbImage::from_fn(1, 2, |_, y| {
            if y == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_rows_top_down_by_default() {
        let image = ImageDecoder::default().try_decode_bytes(&png_bytes()).unwrap();
        assert_eq!((image.width, image.height, image.channels), (1, 2, 3));
        assert_eq!(&image.pixels[..3], &[255, 0, 0]);
    }

    #[test]
    fn flipping_decoder_reverses_rows() {
        let image = ImageDecoder::new(true).try_decode_bytes(&png_bytes()).unwrap();
        assert_eq!(&image.pixels[..3], &[0, 0, 255]);
    }

    #[test]
    fn undecodable_input_is_none() {
        let decoder = ImageDecoder::default();
        assert!(decoder.decode(Path::new("does/not/exist.png")).is_none());
        assert!(decoder.decode_embedded("*0", b"not an image").is_none());
    }
}
