//! Renderer-ready tile data.
//!
//! Every tile source, whatever its origin, produces the same shape of data:
//! a [`LayerMap`] from layer name to [`RenderFeature`]s in tile-local pixel
//! space. The renderer consumes it wrapped in a [`PreparedTile`] that records
//! where the data sits relative to the display tile being drawn.

mod feature;
mod prepared;

pub use feature::{Bbox, GeomType, Point, Properties, RenderFeature};
pub use prepared::{LayerMap, PreparedTile};
