//! Tile coordinate and tiling scheme module
//!
//! Provides the quadtree tile address used throughout the crate and the
//! Web Mercator tiling scheme the host renders with: conversions between
//! geographic coordinates (degrees) and tile columns/rows, plus the
//! geographic rectangle utilities used by the construction-time guard.

mod types;

pub use types::{GeoRect, LonLat, TileCoord, MAX_LAT, MAX_ZOOM, MIN_LAT};

use std::f64::consts::PI;

/// Web Mercator quadtree tiling scheme with one tile at level zero.
///
/// Columns increase eastward and rows increase southward. All positions are
/// in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WebMercatorTilingScheme;

impl WebMercatorTilingScheme {
    /// Creates the tiling scheme.
    pub fn new() -> Self {
        Self
    }

    /// The rectangle covered by the tiling scheme.
    pub fn rectangle(&self) -> GeoRect {
        GeoRect::WORLD
    }

    /// Number of tile columns (and rows) at the given level.
    pub fn tiles_at_level(&self, level: u8) -> u32 {
        1u32 << level.min(31)
    }

    /// Returns the tile containing `position` at `level`.
    ///
    /// Returns `None` when the position lies outside the scheme rectangle.
    /// Positions on the east or south edge are clamped into the last
    /// column/row.
    pub fn position_to_tile_xy(&self, position: LonLat, level: u8) -> Option<TileCoord> {
        if !self.rectangle().contains(position) {
            return None;
        }

        let n = self.tiles_at_level(level);
        let nf = n as f64;

        let col = ((position.lon + 180.0) / 360.0 * nf).floor() as i64;
        let lat_rad = position.lat.to_radians();
        let row = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * nf).floor() as i64;

        let clamp = |v: i64| v.clamp(0, n as i64 - 1) as u32;
        Some(TileCoord::new(level, clamp(col), clamp(row)))
    }

    /// Returns the geographic rectangle covered by a tile.
    pub fn tile_to_rectangle(&self, tile: TileCoord) -> GeoRect {
        let (north, west) = tile_to_lat_lon(tile);
        let (south, east) = tile_to_lat_lon(TileCoord::new(tile.z, tile.x + 1, tile.y + 1));
        GeoRect::new(west, south, east, north)
    }
}

/// Converts a tile coordinate to the latitude/longitude of its northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.z as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Projects a geographic position into normalized Web Mercator world space.
///
/// Both axes are in `[0, 1]`; `y` grows southward. Latitudes beyond the
/// Mercator limit are clamped to the edge of the world.
#[inline]
pub fn project_to_world(position: LonLat) -> (f64, f64) {
    let x = position.lon / 360.0 + 0.5;
    let sin = (position.lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    (x, y.clamp(0.0, 1.0))
}
