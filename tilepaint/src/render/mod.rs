//! Raster tile rendering.
//!
//! # Architecture
//!
//! ```text
//! PreparedTile ──► Labelers (per zoom, placed once per data tile)
//!       │                     │
//!       └──────► paint() ◄────┘ labels intersecting the tile
//!                   │
//!                   ▼
//!              RasterTile (tiny-skia pixmap, PNG via image)
//! ```
//!
//! All geometry is expressed in world pixels at the display zoom; the
//! surface transform maps the 256 unit logical tile to the surface's size.

mod draw;
mod labeler;
mod painter;
mod surface;
mod text;

pub use draw::draw_feature;
pub use labeler::{Label, LabelDraw, LabelIndex, Labelers};
pub use painter::{paint, PaintStats};
pub use surface::RasterTile;
pub use text::{measure, TextExtent};
