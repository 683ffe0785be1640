//! Texture decoding into tightly packed RGBA8 pixels ready for upload.

use std::path::Path;

use anyhow::Context;

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels. Fails if the buffer does not match the size.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * 4;
        anyhow::ensure!(
            data.len() == expected,
            "RGBA8 texture {width}x{height} needs {expected} bytes, got {}",
            data.len()
        );
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// Decode an image file (PNG or JPEG) with rows flipped so that
    /// `v = 0` addresses the bottom of the image, as OBJ texture
    /// coordinates expect.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;

        let rgba = image::imageops::flip_vertical(&img.to_rgba8());
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::new_rgba8(width, height, data)
    }

    /// 1x1 opaque white, the placeholder bound until real pixels arrive.
    pub fn white() -> Self {
        Self {
            data: vec![255; 4],
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * self.bytes_per_pixel()
    }

    /// Non-empty, with exactly one pixel per `width * height`.
    pub fn is_valid(&self) -> bool {
        let expected_size =
            self.width as usize * self.height as usize * self.bytes_per_pixel() as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_valid() {
        let white = TextureData::white();
        assert!(white.is_valid());
        assert_eq!(white.bytes_per_row(), 4);
        assert_eq!(white.data, vec![255; 4]);
    }

    #[test]
    fn hand_built_pixels_are_checked() {
        let mut texture = TextureData::new_rgba8(2, 2, vec![0; 16]).expect("2x2");
        assert!(texture.is_valid());
        texture.data.truncate(12);
        assert!(!texture.is_valid());
        texture.width = 0;
        texture.data.clear();
        assert!(!texture.is_valid());
    }

    #[test]
    fn size_mismatch_is_an_error() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new_rgba8(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(TextureData::load("definitely/not/here.png").is_err());
    }
}
