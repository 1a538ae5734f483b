//! Image decoding for 2D collectibles

use image::io::Reader as ImageReader;
use image::ImageFormat;
use thiserror::Error;

/// Error type for texture loading operations
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Image decoding error: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Supported texture formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

/// Represents a decoded texture
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: TextureFormat,
}

impl Texture {
    /// Width over height; 1.0 for degenerate images
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

/// Decodes image bytes into RGBA textures
#[derive(Debug, Default, Clone)]
pub struct TextureLoader;

impl TextureLoader {
    /// Create a new texture loader
    pub fn new() -> Self {
        Self
    }

    /// Load a texture from binary data
    pub fn load(&self, data: &[u8]) -> Result<Texture, TextureError> {
        let format =
            image::guess_format(data).map_err(|e| TextureError::DecodeError(e.to_string()))?;

        match format {
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => {}
            _ => {
                return Err(TextureError::UnsupportedFormat(format!(
                    "Only PNG, JPEG and WebP images are supported, got {:?}",
                    format.extensions_str()
                )))
            }
        }

        let img = ImageReader::with_format(std::io::Cursor::new(data), format)
            .decode()
            .map_err(|e| TextureError::DecodeError(e.to_string()))?;

        let rgba_img = img.into_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::debug!("Decoded {format:?} image {width}x{height}");

        Ok(Texture {
            width,
            height,
            data: rgba_img.into_raw(),
            format: TextureFormat::Rgba8,
        })
    }
}
