//! The vector tile index.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, trace};

use super::clip::clip;
use super::convert::convert;
use super::tile::{InternalTile, VectorTile};
use super::types::{Axis, ProjectedFeature};
use super::wrap::wrap;
use crate::collection::FeatureCollection;
use crate::config::{GEOJSON_MAX_ZOOM, VECTOR_TILE_EXTENT};
use crate::coord::{TileCoord, MAX_ZOOM};

/// Errors raised while building a tile index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileIndexError {
    #[error("max zoom {0} is outside the supported range 0-24")]
    InvalidMaxZoom(u8),

    #[error("index max zoom {index_max_zoom} exceeds max zoom {max_zoom}")]
    InvalidIndexMaxZoom { index_max_zoom: u8, max_zoom: u8 },
}

/// Tiling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TileIndexOptions {
    /// Deepest zoom at which tiles are produced; tiles at this zoom keep
    /// every vertex.
    pub max_zoom: u8,
    /// Deepest zoom built eagerly at construction.
    pub index_max_zoom: u8,
    /// Tiles with at most this many points are not split eagerly.
    pub index_max_points: usize,
    /// Simplification tolerance in tile extent units.
    pub tolerance: f64,
    /// Integer coordinate range of one tile edge.
    pub extent: u32,
    /// Buffer around each tile in extent units.
    pub buffer: u32,
}

impl Default for TileIndexOptions {
    fn default() -> Self {
        Self {
            max_zoom: GEOJSON_MAX_ZOOM,
            index_max_zoom: 5,
            index_max_points: 100_000,
            tolerance: 3.0,
            extent: VECTOR_TILE_EXTENT,
            buffer: 1024,
        }
    }
}

impl TileIndexOptions {
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_index_max_zoom(mut self, index_max_zoom: u8) -> Self {
        self.index_max_zoom = index_max_zoom;
        self
    }

    pub fn with_index_max_points(mut self, index_max_points: usize) -> Self {
        self.index_max_points = index_max_points;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_extent(mut self, extent: u32) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_buffer(mut self, buffer: u32) -> Self {
        self.buffer = buffer;
        self
    }

    /// Checks the zoom limits.
    pub fn validate(&self) -> Result<(), TileIndexError> {
        if self.max_zoom > MAX_ZOOM {
            return Err(TileIndexError::InvalidMaxZoom(self.max_zoom));
        }
        if self.index_max_zoom > self.max_zoom {
            return Err(TileIndexError::InvalidIndexMaxZoom {
                index_max_zoom: self.index_max_zoom,
                max_zoom: self.max_zoom,
            });
        }
        Ok(())
    }
}

/// Quadtree of vector tiles cut from a feature collection.
///
/// Tiles down to `index_max_zoom` are built when the index is created;
/// deeper tiles are sliced from their nearest stored ancestor the first time
/// they are requested and are kept for later requests.
///
/// # Example
///
/// ```ignore
/// let index = VectorTileIndex::build(&collection, TileIndexOptions::default())?;
/// if let Some(tile) = index.get_tile(3, 4, 2) {
///     println!("{} features", tile.features.len());
/// }
/// ```
#[derive(Debug)]
pub struct VectorTileIndex {
    options: TileIndexOptions,
    tiles: Mutex<HashMap<u64, InternalTile>>,
}

impl VectorTileIndex {
    /// Projects, simplifies and tiles `collection`.
    pub fn build(
        collection: &FeatureCollection,
        options: TileIndexOptions,
    ) -> Result<Self, TileIndexError> {
        options.validate()?;

        let features = convert(collection, options.max_zoom, options.extent, options.tolerance);
        let features = wrap(features, options.buffer as f64 / options.extent as f64);

        let index = Self {
            options,
            tiles: Mutex::new(HashMap::new()),
        };

        if !features.is_empty() {
            let mut tiles = index.tiles.lock();
            index.split_tile(&mut tiles, features, TileCoord::new(0, 0, 0), None);
            debug!(
                features = collection.len(),
                tiles = tiles.len(),
                "Built vector tile index"
            );
        }

        Ok(index)
    }

    pub fn options(&self) -> &TileIndexOptions {
        &self.options
    }

    /// Number of tiles currently stored.
    pub fn tile_count(&self) -> usize {
        self.tiles.lock().len()
    }

    /// Returns the tile at `z/x/y`, slicing it on demand.
    ///
    /// `x` wraps around the world. Returns `None` if `z` exceeds the maximum
    /// zoom, `y` is out of range, or no data covers the tile.
    pub fn get_tile(&self, z: u8, x: u32, y: u32) -> Option<Arc<VectorTile>> {
        if z > MAX_ZOOM {
            return None;
        }

        let z2 = 1u32 << z;
        if y >= z2 {
            return None;
        }
        let x = x & (z2 - 1);

        let id = to_id(z, x, y);
        let mut tiles = self.tiles.lock();

        if let Some(tile) = tiles.get_mut(&id) {
            return Some(tile.transform(self.options.extent));
        }

        let mut parent = TileCoord::new(z, x, y);
        let mut source = None;
        while parent.z > 0 {
            parent = TileCoord::new(parent.z - 1, parent.x >> 1, parent.y >> 1);
            if let Some(tile) = tiles.get(&to_id(parent.z, parent.x, parent.y)) {
                source = tile.source.clone();
                break;
            }
        }

        let source = source?;
        trace!(from = %parent, to = %TileCoord::new(z, x, y), "Slicing tile on demand");
        self.split_tile(&mut tiles, source, parent, Some(TileCoord::new(z, x, y)));

        tiles
            .get_mut(&id)
            .map(|tile| tile.transform(self.options.extent))
    }

    /// Splits features into tiles, starting at `start`.
    ///
    /// Without a `target`, splitting stops at `index_max_zoom` or once a tile
    /// is small enough. With a target, only the target's ancestors are split
    /// until the target zoom is reached.
    fn split_tile(
        &self,
        tiles: &mut HashMap<u64, InternalTile>,
        features: Vec<Arc<ProjectedFeature>>,
        start: TileCoord,
        target: Option<TileCoord>,
    ) {
        let opts = &self.options;
        let mut stack = vec![(features, start)];

        while let Some((features, coord)) = stack.pop() {
            let TileCoord { z, x, y } = coord;
            let z2 = (1u64 << z) as f64;
            let id = to_id(z, x, y);

            let tile = tiles.entry(id).or_insert_with(|| {
                let tolerance = if z == opts.max_zoom {
                    0.0
                } else {
                    opts.tolerance / (z2 * opts.extent as f64)
                };
                InternalTile::create(&features, coord, tolerance)
            });

            match target {
                None => {
                    if z == opts.index_max_zoom || tile.num_points <= opts.index_max_points {
                        tile.source = Some(features);
                        continue;
                    }
                }
                Some(target) => {
                    if z == opts.max_zoom || z == target.z {
                        tile.source = Some(features);
                        continue;
                    }
                    let steps = target.z - z;
                    if x != target.x >> steps || y != target.y >> steps {
                        tile.source = Some(features);
                        continue;
                    }
                }
            }

            tile.source = None;
            if features.is_empty() {
                continue;
            }

            let (min_x, min_y, max_x, max_y) = (tile.min_x, tile.min_y, tile.max_x, tile.max_y);

            let k1 = 0.5 * opts.buffer as f64 / opts.extent as f64;
            let k2 = 0.5 - k1;
            let k3 = 0.5 + k1;
            let k4 = 1.0 + k1;
            let (fx, fy) = (x as f64, y as f64);

            let left = clip(&features, z2, fx - k1, fx + k3, Axis::X, min_x, max_x);
            let right = clip(&features, z2, fx + k2, fx + k4, Axis::X, min_x, max_x);
            drop(features);

            let quad = |half: &[Arc<ProjectedFeature>]| {
                if half.is_empty() {
                    (Vec::new(), Vec::new())
                } else {
                    (
                        clip(half, z2, fy - k1, fy + k3, Axis::Y, min_y, max_y),
                        clip(half, z2, fy + k2, fy + k4, Axis::Y, min_y, max_y),
                    )
                }
            };
            let (tl, bl) = quad(&left);
            let (tr, br) = quad(&right);

            let cz = z + 1;
            stack.push((tl, TileCoord::new(cz, x * 2, y * 2)));
            stack.push((bl, TileCoord::new(cz, x * 2, y * 2 + 1)));
            stack.push((tr, TileCoord::new(cz, x * 2 + 1, y * 2)));
            stack.push((br, TileCoord::new(cz, x * 2 + 1, y * 2 + 1)));
        }
    }
}

#[inline]
fn to_id(z: u8, x: u32, y: u32) -> u64 {
    (((1u64 << z) * y as u64 + x as u64) << 5) + z as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::SourceFeature;
    use crate::tile::{GeomType, Properties};
    use geo::{point, polygon, Geometry};

    fn collection(geometries: Vec<Geometry<f64>>) -> FeatureCollection {
        FeatureCollection::new(
            geometries
                .into_iter()
                .map(|g| SourceFeature::new(Some(g), Properties::new()))
                .collect(),
        )
    }

    #[test]
    fn test_default_options() {
        let opts = TileIndexOptions::default();
        assert_eq!(opts.max_zoom, 24);
        assert_eq!(opts.extent, 4096);
        assert_eq!(opts.buffer, 1024);
        assert_eq!(opts.index_max_zoom, 5);
    }

    #[test]
    fn test_max_zoom_out_of_range() {
        let result = VectorTileIndex::build(
            &FeatureCollection::empty(),
            TileIndexOptions::default().with_max_zoom(25),
        );
        assert!(matches!(result, Err(TileIndexError::InvalidMaxZoom(25))));
    }

    #[test]
    fn test_empty_collection_has_no_tiles() {
        let index =
            VectorTileIndex::build(&FeatureCollection::empty(), TileIndexOptions::default())
                .unwrap();
        assert_eq!(index.tile_count(), 0);
        assert!(index.get_tile(0, 0, 0).is_none());
    }

    #[test]
    fn test_root_tile_point() {
        let fc = collection(vec![point!(x: 0.0, y: 0.0).into()]);
        let index = VectorTileIndex::build(&fc, TileIndexOptions::default()).unwrap();
        let tile = index.get_tile(0, 0, 0).unwrap();
        assert_eq!(tile.features.len(), 1);
        assert_eq!(tile.features[0].geom_type, GeomType::Point);
        assert_eq!(tile.features[0].geometry, vec![vec![[2048, 2048]]]);
    }

    #[test]
    fn test_deep_tile_sliced_on_demand() {
        // Point at lon 10, lat 10 lies in tile 10/540/483.
        let fc = collection(vec![point!(x: 10.0, y: 10.0).into()]);
        let index = VectorTileIndex::build(&fc, TileIndexOptions::default()).unwrap();
        let before = index.tile_count();

        let tile = index.get_tile(10, 540, 483).unwrap();
        assert_eq!(tile.features.len(), 1);
        let [px, py] = tile.features[0].geometry[0][0];
        assert!((0..4096).contains(&px), "x {}", px);
        assert!((0..4096).contains(&py), "y {}", py);
        assert!(index.tile_count() > before);

        let again = index.get_tile(10, 540, 483).unwrap();
        assert!(Arc::ptr_eq(&tile, &again));
    }

    #[test]
    fn test_tile_far_from_data_is_empty() {
        let fc = collection(vec![point!(x: 10.0, y: 10.0).into()]);
        let index = VectorTileIndex::build(&fc, TileIndexOptions::default()).unwrap();
        let tile = index.get_tile(3, 0, 7);
        assert!(tile.map_or(true, |t| t.is_empty()));
    }

    #[test]
    fn test_x_wraps_around() {
        let fc = collection(vec![point!(x: 10.0, y: 10.0).into()]);
        let index = VectorTileIndex::build(&fc, TileIndexOptions::default()).unwrap();
        let a = index.get_tile(1, 1, 0).unwrap();
        let b = index.get_tile(1, 3, 0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(index.get_tile(1, 0, 2).is_none());
    }

    #[test]
    fn test_polygon_spans_child_tiles() {
        let poly = polygon![
            (x: -20.0, y: -20.0), (x: 20.0, y: -20.0),
            (x: 20.0, y: 20.0), (x: -20.0, y: 20.0), (x: -20.0, y: -20.0)
        ];
        let fc = collection(vec![poly.into()]);
        let index = VectorTileIndex::build(&fc, TileIndexOptions::default()).unwrap();
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let tile = index.get_tile(1, x, y).unwrap();
            assert_eq!(tile.features.len(), 1, "tile 1/{}/{}", x, y);
            assert_eq!(tile.features[0].geom_type, GeomType::Polygon);
        }
    }

    #[test]
    fn test_to_id_unique_per_zoom() {
        assert_ne!(to_id(1, 0, 1), to_id(2, 2, 0));
        assert_eq!(to_id(0, 0, 0), 0);
    }
}
