//! Tilepaint - vector tile imagery for map tiling hosts
//!
//! This library turns vector data (PMTiles archives, `{z}/{x}/{y}` Mapbox
//! Vector Tile endpoints, or raw GeoJSON) into raster map tiles and resolves
//! clicks back to the features under them.
//!
//! # Architecture
//!
//! ```text
//! source::selector ──► source::{PmtilesSource, ZxySource} ──► view::View ─┐
//!                  └─► source::GeoJsonSource (vt index) ──────────────────┤
//!                                                                         ▼
//!                              provider::ImageryProvider ◄── style rules
//!                                 │                 │
//!                        render::{Labelers, paint}  pick / View::query_features
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tilepaint::provider::{ImageryProvider, ProviderOptions};
//! use tilepaint::style::{Color, FillSymbolizer, Rule};
//!
//! let rules = vec![Rule::new("layer", FillSymbolizer::new(Color::BLACK))];
//! let provider = ImageryProvider::new(
//!     "https://example.com/parks.geojson",
//!     ProviderOptions::default().with_paint_rules(rules),
//! )?;
//! let png = provider.request_image(0, 0, 0).await.map(|t| t.to_png());
//! ```

pub mod collection;
pub mod config;
pub mod coord;
pub mod error;
pub mod logging;
pub mod pick;
pub mod provider;
pub mod render;
pub mod source;
pub mod style;
pub mod tile;
pub mod view;
pub mod vt;

pub use error::{ProviderError, RenderError};
pub use provider::{CloneOverrides, ImageryProvider, ProviderOptions};
pub use source::{DataDescriptor, SourceError};
