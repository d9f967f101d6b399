//! BMP textures, decoded with `image` and laid out for a GL upload: tightly
//! packed rows, bottom row first.

use std::path::Path;

use image::{ColorType, ImageFormat};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// 3 for RGB sources, 4 for anything with an alpha channel.
    pub channels: usize,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn bits_per_pixel(&self) -> usize {
        self.channels * 8
    }
}

/// Reads and decodes the file at `path`. Unreadable files and anything the
/// BMP decoder rejects both yield `None`.
pub fn load_bmp(path: &Path) -> Option<Bitmap> {
    let bytes = std::fs::read(path).ok()?;
    parse_bmp(&bytes)
}

pub fn parse_bmp(bytes: &[u8]) -> Option<Bitmap> {
    let image = match image::load_from_memory_with_format(bytes, ImageFormat::Bmp) {
        Ok(image) => image.flipv(),
        Err(err) => {
            log::debug!("rejected BMP data: {err}");
            return None;
        }
    };
    let (width, height) = (image.width(), image.height());
    let (channels, pixels) = match image.color() {
        ColorType::Rgb8 => (3, image.into_rgb8().into_raw()),
        _ => (4, image.into_rgba8().into_raw()),
    };
    Some(Bitmap {
        width,
        height,
        channels,
        pixels,
    })
}
