//! Prepared tiles handed to the renderer.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Point, RenderFeature};
use crate::coord::TileCoord;

/// Features of one tile keyed by layer name.
pub type LayerMap = HashMap<String, Vec<RenderFeature>>;

/// The unit of data passed to the renderer for one display tile.
///
/// `origin` is the world pixel position (at the display zoom, 256 px per
/// tile) of the data tile's top-left corner; feature coordinates multiplied
/// by `scale` and offset by `origin` give world pixels. `scale` is 1 unless
/// the data tile is a lower- or higher-resolution substitute.
#[derive(Debug, Clone)]
pub struct PreparedTile {
    pub data: Arc<LayerMap>,
    /// Display zoom level.
    pub z: u8,
    /// Coordinate of the data tile the features came from.
    pub data_tile: TileCoord,
    pub scale: f64,
    pub origin: Point,
    /// Edge length of the data tile in display pixels.
    pub dim: f64,
}

impl PreparedTile {
    /// Wraps data fetched for exactly the display tile `coord`.
    pub fn for_display_tile(coord: TileCoord, data: LayerMap, tile_size: u32) -> Self {
        Self {
            data: Arc::new(data),
            z: coord.z,
            data_tile: coord,
            scale: 1.0,
            origin: Point::new(
                coord.x as f64 * tile_size as f64,
                coord.y as f64 * tile_size as f64,
            ),
            dim: tile_size as f64,
        }
    }

    /// Total number of features over all layers.
    pub fn feature_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }
}
