//! Data tile cache using moka.
//!
//! Tiles from pre-tiled sources are fetched at [`DATA_TILE_SIZE`] pixels and
//! kept in an LRU cache. Concurrent requests for the same tile share one
//! fetch; failures are not cached.

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::config::{DATA_TILE_SIZE, DISPLAY_CACHE_CAPACITY};
use crate::coord::TileCoord;
use crate::source::{SourceError, TileSource};
use crate::tile::LayerMap;

/// LRU cache of decoded data tiles.
pub struct TileCache {
    source: Arc<dyn TileSource>,
    cache: MokaCache<TileCoord, Arc<LayerMap>>,
    tile_size: u32,
}

impl TileCache {
    /// Creates a cache with the default capacity and data tile size.
    pub fn new(source: Arc<dyn TileSource>) -> Self {
        Self::with_capacity(source, DISPLAY_CACHE_CAPACITY)
    }

    /// Creates a cache holding at most `capacity` tiles.
    ///
    /// # Arguments
    ///
    /// * `source` - Where tiles are fetched from on a miss
    /// * `capacity` - Maximum number of cached tiles
    pub fn with_capacity(source: Arc<dyn TileSource>, capacity: u64) -> Self {
        Self {
            source,
            cache: MokaCache::builder().max_capacity(capacity).build(),
            tile_size: DATA_TILE_SIZE,
        }
    }

    /// Edge length data tiles are scaled to.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Returns the tile, fetching it on a miss.
    pub async fn get(&self, coord: TileCoord) -> Result<Arc<LayerMap>, SourceError> {
        let source = Arc::clone(&self.source);
        let tile_size = self.tile_size;
        self.cache
            .try_get_with(coord, async move {
                debug!(z = coord.z, x = coord.x, y = coord.y, "Fetching data tile");
                source.get(coord, tile_size).await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Returns the tile only if it is already cached.
    pub async fn get_cached(&self, coord: TileCoord) -> Option<Arc<LayerMap>> {
        self.cache.get(&coord).await
    }

    /// Number of cached tiles (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("tile_size", &self.tile_size)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
