/// Texture - CPU-side RGBA8 image plus the GPU handle attached after upload.

use std::path::Path;
use crate::error::{Error, Result};
use crate::renderer::TextureHandle;
use crate::{engine_debug, engine_error};

/// Bytes per texel of every scene texture (RGBA8)
pub const TEXEL_SIZE: usize = 4;

/// Number of mip levels of a full chain down to 1x1
///
/// `floor(log2(max(width, height))) + 1`, and 1 for degenerate sizes.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height);
    if largest == 0 {
        return 1;
    }
    u32::BITS - largest.leading_zeros()
}

/// A scene texture
///
/// Pixels stay in memory only until the Scene Binding Layer uploads them;
/// after that the texture is represented by its `gpu` handle alone.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, `None` once released
    pub pixels: Option<Vec<u8>>,
    pub mip_levels: u32,
    /// GPU image/view/sampler handle, set by scene binding
    pub gpu: Option<TextureHandle>,
}

impl Texture {
    /// Build a texture from raw RGBA8 pixels
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` when the size is zero or the pixel buffer does
    /// not hold exactly `width * height * 4` bytes.
    pub fn from_rgba8(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(Error::InvalidResource(format!(
                "texture '{}' has an empty extent {}x{}", name, width, height
            )));
        }
        let expected = width as usize * height as usize * TEXEL_SIZE;
        if pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "texture '{}' expects {} bytes of RGBA8 data, got {}",
                name, expected, pixels.len()
            )));
        }

        Ok(Self {
            name,
            width,
            height,
            pixels: Some(pixels),
            mip_levels: mip_level_count(width, height),
            gpu: None,
        })
    }

    /// Decode an image file from disk into an RGBA8 texture
    ///
    /// Any format supported by the `image` crate is accepted; the result is
    /// always expanded to four channels.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            engine_error!("kokoromi::Texture", "Failed to load texture {}: {}", path.display(), e);
            Error::AssetLoad(format!("{}: {}", path.display(), e))
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        engine_debug!("kokoromi::Texture", "Loaded {} ({}x{})", path.display(), width, height);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_rgba8(name, width, height, rgba.into_raw())
    }

    /// Byte size of the base level
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * TEXEL_SIZE
    }

    /// Drop the CPU pixel buffer (after the GPU copy completed)
    pub fn release_pixels(&mut self) {
        self.pixels = None;
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
