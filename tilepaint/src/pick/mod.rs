//! Feature picking.
//!
//! Two strategies exist, chosen by the active source:
//!
//! - pre-tiled sources query the display cache at the click position (see
//!   [`crate::view::View::query_features`])
//! - GeoJSON sources intersect a buffered circle with the raw features
//!   ([`pick_features`])
//!
//! Both produce [`FeatureInfo`] values.

mod buffer;
mod geometric;
mod info;

pub use buffer::{circle, destination, meters_per_pixel, pick_buffer};
pub use geometric::pick_features;
pub use info::{description_from_properties, name_from_properties, FeatureInfo};
