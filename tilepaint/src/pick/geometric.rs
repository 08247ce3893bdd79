//! Buffered-circle picking against raw GeoJSON features.
//!
//! A click is turned into a small circular polygon whose radius is a fixed
//! number of screen pixels converted to metres at the equator. Features are
//! rejected by bounding box first; only overlapping candidates are tested
//! for exact intersection.
//!
//! # Antimeridian
//!
//! Feature coordinates may run past ±180° (a line from 170° to 190°, or
//! from -190° to -170°). The buffer is therefore also tested shifted by
//! ±360° so a click on either side of the seam hits such features.

use geo::{BoundingRect, Geometry, Intersects, Polygon, Rect, Translate};
use tracing::trace;

use super::buffer::pick_buffer;
use super::info::FeatureInfo;
use crate::collection::{FeatureCollection, SourceFeature};
use crate::config::GEOJSON_LAYER_NAME;
use crate::coord::LonLat;

const WRAP_OFFSETS: [f64; 3] = [0.0, 360.0, -360.0];

/// Returns every feature intersecting the pick buffer at (`lon`, `lat`).
pub fn pick_features(
    collection: &FeatureCollection,
    lon: f64,
    lat: f64,
    level: u8,
) -> Vec<FeatureInfo> {
    let buffer = pick_buffer(lon, lat, level);
    let candidates: Vec<(Polygon<f64>, Rect<f64>)> = WRAP_OFFSETS
        .iter()
        .filter_map(|&dx| {
            let shifted = buffer.translate(dx, 0.0);
            let rect = shifted.bounding_rect()?;
            Some((shifted, rect))
        })
        .collect();

    let mut picked = Vec::new();
    let mut tested = 0usize;

    for feature in collection.features() {
        let (Some(geometry), Some(fbox)) = (feature.geometry(), feature.bbox()) else {
            continue;
        };

        let hit = candidates.iter().any(|(polygon, rect)| {
            if !fbox.intersects(rect) {
                return false;
            }
            tested += 1;
            geometry.intersects(polygon)
        });

        if hit {
            picked.push(to_info(feature, geometry));
        }
    }

    trace!(
        lon,
        lat,
        level,
        features = collection.len(),
        tested,
        picked = picked.len(),
        "Geometric pick"
    );
    picked
}

fn to_info(feature: &SourceFeature, geometry: &Geometry<f64>) -> FeatureInfo {
    let mut info = FeatureInfo::new(
        feature.properties().as_ref().clone(),
        Some(GEOJSON_LAYER_NAME.to_string()),
    )
    .with_geometry(geometry.clone());
    if let Geometry::Point(p) = geometry {
        info = info.with_position(LonLat::new(p.x(), p.y()));
    }
    info
}
