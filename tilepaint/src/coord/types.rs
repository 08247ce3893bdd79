//! Coordinate types.

use std::fmt;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -MAX_LAT;

/// Deepest zoom level supported by the tiling pipeline.
pub const MAX_ZOOM: u8 = 24;

/// A tile address in the quadtree tiling scheme.
///
/// `z` is the zoom level, `x` the column (west to east) and `y` the row
/// (north to south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Returns the ancestor of this tile at `zoom`, or the tile itself when
    /// `zoom` is not shallower.
    pub fn ancestor(&self, zoom: u8) -> TileCoord {
        if zoom >= self.z {
            return *self;
        }
        let shift = self.z - zoom;
        TileCoord::new(zoom, self.x >> shift, self.y >> shift)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoRect {
    /// The rectangle covered by the Web Mercator tiling scheme.
    pub const WORLD: GeoRect = GeoRect {
        west: -180.0,
        south: MIN_LAT,
        east: 180.0,
        north: MAX_LAT,
    };

    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn southwest(&self) -> LonLat {
        LonLat::new(self.west, self.south)
    }

    pub fn northeast(&self) -> LonLat {
        LonLat::new(self.east, self.north)
    }

    /// Returns true if the position lies inside or on the edge of the rectangle.
    pub fn contains(&self, position: LonLat) -> bool {
        position.lon >= self.west
            && position.lon <= self.east
            && position.lat >= self.south
            && position.lat <= self.north
    }

    /// Computes the intersection of two rectangles.
    ///
    /// Returns `None` when the rectangles do not overlap.
    pub fn intersection(&self, other: &GeoRect) -> Option<GeoRect> {
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);
        let south = self.south.max(other.south);
        let north = self.north.min(other.north);

        if west > east || south > north {
            return None;
        }
        Some(GeoRect::new(west, south, east, north))
    }
}
