//! Display tiles assembled from cached data tiles.
//!
//! Pre-tiled sources are read as 1024 px data tiles two zoom levels above
//! the 256 px display tiles they serve. A [`View`] maps each display tile to
//! the data tile covering it:
//!
//! ```text
//! display z < 2              data 0/0/0, scaled down (scale < 1)
//! 2 <= z <= max_data + 2     data (z-2, x/4, y/4), scale 1
//! z > max_data + 2           data at max_data, overzoomed (scale > 1)
//! ```
//!
//! Feature queries for picking run against cached data tiles only.

mod cache;
mod query;

pub use cache::TileCache;
pub use query::PickedFeature;

use std::sync::Arc;

use tracing::trace;

use crate::config::{LEVEL_DIFF, TILE_SIZE};
use crate::coord::TileCoord;
use crate::source::{SourceError, TileSource};
use crate::tile::{Point, PreparedTile};

/// Where a display tile's data comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataTilePlacement {
    /// The data tile to read.
    pub data_tile: TileCoord,
    /// Factor from data tile pixels to display zoom pixels.
    pub scale: f64,
    /// World pixel position of the data tile at display zoom.
    pub origin: Point,
    /// Edge length of the data tile at display zoom.
    pub dim: f64,
}

/// Multi-level view over a cached pre-tiled source.
#[derive(Debug)]
pub struct View {
    cache: TileCache,
    max_data_level: u8,
    level_diff: u8,
}

impl View {
    /// Creates a view reading data tiles up to `max_data_level`.
    pub fn new(source: Arc<dyn TileSource>, max_data_level: u8) -> Self {
        Self::with_cache(TileCache::new(source), max_data_level)
    }

    pub fn with_cache(cache: TileCache, max_data_level: u8) -> Self {
        Self {
            cache,
            max_data_level,
            level_diff: LEVEL_DIFF,
        }
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn max_data_level(&self) -> u8 {
        self.max_data_level
    }

    /// Maps a display tile to its data tile.
    pub fn data_tile_for_display_tile(&self, display: TileCoord) -> DataTilePlacement {
        let dim = self.cache.tile_size() as f64;
        let tile = TILE_SIZE as f64;

        if display.z < self.level_diff {
            let scale = 1.0 / (1u32 << (self.level_diff - display.z)) as f64;
            DataTilePlacement {
                data_tile: TileCoord::new(0, 0, 0),
                scale,
                origin: Point::new(0.0, 0.0),
                dim: dim * scale,
            }
        } else if display.z <= self.level_diff + self.max_data_level {
            let data_tile = display.ancestor(display.z - self.level_diff);
            let f = (1u32 << self.level_diff) as f64;
            DataTilePlacement {
                data_tile,
                scale: 1.0,
                origin: Point::new(
                    data_tile.x as f64 * f * tile,
                    data_tile.y as f64 * f * tile,
                ),
                dim,
            }
        } else {
            let scale = (1u64 << (display.z - self.max_data_level - self.level_diff)) as f64;
            let f = (1u64 << (display.z - self.max_data_level)) as f64;
            let data_tile = display.ancestor(self.max_data_level);
            DataTilePlacement {
                data_tile,
                scale,
                origin: Point::new(
                    data_tile.x as f64 * f * tile,
                    data_tile.y as f64 * f * tile,
                ),
                dim: dim * scale,
            }
        }
    }

    /// Fetches the data tile for a display tile and wraps it for painting.
    pub async fn get_display_tile(&self, display: TileCoord) -> Result<PreparedTile, SourceError> {
        let placement = self.data_tile_for_display_tile(display);
        let display_coord = display;
        trace!(
            display = %display_coord,
            data = %placement.data_tile,
            scale = placement.scale,
            "Resolving display tile"
        );
        let data = self.cache.get(placement.data_tile).await?;
        Ok(PreparedTile {
            data,
            z: display.z,
            data_tile: placement.data_tile,
            scale: placement.scale,
            origin: placement.origin,
            dim: placement.dim,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::cache::tests::CountingSource;

    fn view(max_data_level: u8) -> View {
        View::new(Arc::new(CountingSource::new()), max_data_level)
    }

    #[test]
    fn test_low_zoom_scales_down_root() {
        let v = view(14);
        let p = v.data_tile_for_display_tile(TileCoord::new(0, 0, 0));
        assert_eq!(p.data_tile, TileCoord::new(0, 0, 0));
        assert_eq!(p.scale, 0.25);
        assert_eq!(p.dim, 256.0);

        let p = v.data_tile_for_display_tile(TileCoord::new(1, 1, 0));
        assert_eq!(p.scale, 0.5);
        assert_eq!(p.dim, 512.0);
        assert_eq!(p.origin, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_in_range_uses_parent_data_tile() {
        let v = view(14);
        let p = v.data_tile_for_display_tile(TileCoord::new(5, 13, 7));
        assert_eq!(p.data_tile, TileCoord::new(3, 3, 1));
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.dim, 1024.0);
        assert_eq!(p.origin, Point::new(3.0 * 1024.0, 1024.0));
    }

    #[test]
    fn test_overzoom_beyond_max_data_level() {
        let v = view(4);
        // z 8 = max 4 + 2 + 2 levels of overzoom.
        let p = v.data_tile_for_display_tile(TileCoord::new(8, 100, 37));
        assert_eq!(p.data_tile, TileCoord::new(4, 6, 2));
        assert_eq!(p.scale, 4.0);
        assert_eq!(p.dim, 4096.0);
        assert_eq!(p.origin, Point::new(6.0 * 16.0 * 256.0, 2.0 * 16.0 * 256.0));
    }

    #[tokio::test]
    async fn test_get_display_tile() {
        let v = view(14);
        let tile = v.get_display_tile(TileCoord::new(4, 9, 6)).await.unwrap();
        assert_eq!(tile.z, 4);
        assert_eq!(tile.data_tile, TileCoord::new(2, 2, 1));
        assert_eq!(tile.feature_count(), 1);
    }
}
