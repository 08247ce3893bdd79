//! Raster output surface.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tiny_skia::{Color, Pixmap, Transform};

use crate::config::TILE_SIZE;
use crate::error::RenderError;

/// An RGBA raster tile.
///
/// Drawing happens in logical tile space (256 units per edge) and is scaled
/// linearly to the surface's pixel size.
#[derive(Debug, Clone)]
pub struct RasterTile {
    pixmap: Pixmap,
}

impl RasterTile {
    /// Allocates a transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Transform from logical tile space to surface pixels.
    pub fn base_transform(&self) -> Transform {
        Transform::from_scale(
            self.width() as f32 / TILE_SIZE as f32,
            self.height() as f32 / TILE_SIZE as f32,
        )
    }

    /// Clears every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Straight-alpha RGBA value of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Whether nothing has been drawn.
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    /// Number of pixels with any coverage.
    pub fn painted_pixels(&self) -> usize {
        self.pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    /// Converts to an `image` buffer with straight alpha.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut data = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for p in self.pixmap.pixels() {
            let c = p.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        // Length always matches the dimensions.
        RgbaImage::from_raw(self.width(), self.height(), data)
            .unwrap_or_else(|| RgbaImage::new(self.width(), self.height()))
    }

    /// Encodes as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buf = Cursor::new(Vec::new());
        self.to_rgba_image()
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
