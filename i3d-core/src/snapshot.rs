/// Thumbnail capture of a rendered frame
use std::io::Cursor;
use std::path::Path;

use image::{imageops, ImageError, ImageFormat, Rgba, RgbaImage};

use crate::raster::Framebuffer;

/// An image grabbed from the drawing surface
#[derive(Debug, Clone)]
pub struct Snapshot {
    image: RgbaImage,
}

impl Snapshot {
    pub fn capture(framebuffer: &Framebuffer) -> Self {
        let image = RgbaImage::from_fn(
            framebuffer.width() as u32,
            framebuffer.height() as u32,
            |x, y| Rgba(framebuffer.pixel(x as usize, y as usize).to_rgba8()),
        );
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Downscale so neither side exceeds `max_side`, keeping the aspect ratio
    pub fn thumbnail(&self, max_side: u32) -> Self {
        let (w, h) = self.image.dimensions();
        if w <= max_side && h <= max_side {
            return self.clone();
        }
        let ratio = max_side as f32 / w.max(h) as f32;
        let tw = ((w as f32 * ratio).round() as u32).max(1);
        let th = ((h as f32 * ratio).round() as u32).max(1);
        Self {
            image: imageops::thumbnail(&self.image, tw, th),
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut bytes = Cursor::new(Vec::new());
        self.image.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), ImageError> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Color;

    #[test]
    fn test_capture_and_thumbnail() {
        let mut fb = Framebuffer::new(40, 20);
        fb.clear(Color::from_hex(0x00ffff));

        let snapshot = Snapshot::capture(&fb);
        assert_eq!(snapshot.image().dimensions(), (40, 20));
        assert_eq!(snapshot.image().get_pixel(3, 3), &Rgba([0, 255, 255, 255]));

        let thumb = snapshot.thumbnail(10);
        assert_eq!(thumb.image().dimensions(), (10, 5));
    }

    #[test]
    fn test_png_signature() {
        let fb = Framebuffer::new(4, 4);
        let png = Snapshot::capture(&fb).to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
