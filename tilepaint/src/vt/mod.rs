//! On-demand vector tiling of GeoJSON.
//!
//! Builds a quadtree tile index from a [`FeatureCollection`]: features are
//! projected into normalized Web Mercator space, simplified with
//! Douglas-Peucker importance values, wrapped across the antimeridian and
//! then recursively clipped into tiles. Shallow tiles are built eagerly;
//! deeper tiles are sliced from their nearest ancestor on first request.
//!
//! # Architecture
//!
//! ```text
//! FeatureCollection ──► convert ──► wrap ──► split (clip ×4 per level) ──► tiles
//!                      (project,                                          │
//!                       simplify)                          get_tile ◄─────┘
//!                                                          (drill down, transform
//!                                                           to integer extent)
//! ```
//!
//! Output coordinates are integers in a fixed extent per tile edge (4096 by
//! default), independent of the final raster size.
//!
//! [`FeatureCollection`]: crate::collection::FeatureCollection

mod clip;
mod convert;
mod index;
mod simplify;
mod tile;
mod types;
mod wrap;

pub use index::{TileIndexError, TileIndexOptions, VectorTileIndex};
pub use tile::{VectorTile, VectorTileFeature};
