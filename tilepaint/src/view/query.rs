//! Point queries against cached data tiles.

use crate::coord::{project_to_world, LonLat, TileCoord};
use crate::tile::{GeomType, Point, RenderFeature};

use super::View;

/// Brush radius in data tile pixels at zero zoom difference.
const BRUSH_PX: f64 = 16.0;

/// A feature hit by a point query, with its source layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedFeature {
    pub layer_name: String,
    pub feature: RenderFeature,
}

impl View {
    /// Returns the features under a geographic point.
    ///
    /// Only data tiles that are already cached are searched; a point over a
    /// tile that was never rendered yields nothing. Points and lines match
    /// within a brush radius that shrinks as the display zoom exceeds the
    /// data zoom; polygons match by containment.
    pub async fn query_features(&self, lon: f64, lat: f64, display_zoom: f64) -> Vec<PickedFeature> {
        let rounded = display_zoom.round().max(0.0) as i32;
        let data_zoom = (rounded - self.level_diff as i32)
            .min(self.max_data_level as i32)
            .max(0);
        let brush = BRUSH_PX / (1u64 << (rounded - data_zoom).clamp(0, 62)) as f64;

        let (wx, wy) = project_to_world(LonLat::new(lon, lat));
        let n = (1u64 << data_zoom) as f64;
        let tx = wx.rem_euclid(1.0) * n;
        let ty = (wy * n).min(n - f64::EPSILON * n);

        let coord = TileCoord::new(data_zoom as u8, tx.floor() as u32, ty.floor() as u32);
        let Some(layers) = self.cache.get_cached(coord).await else {
            return Vec::new();
        };

        let size = self.cache.tile_size() as f64;
        let center = Point::new(tx.fract() * size, ty.fract() * size);

        let mut hits = Vec::new();
        for (layer_name, features) in layers.iter() {
            for feature in features {
                let hit = match feature.geom_type {
                    GeomType::Point => min_dist_to_points(center, &feature.geom) < brush,
                    GeomType::Line => min_dist_to_lines(center, &feature.geom) < brush,
                    GeomType::Polygon => point_in_polygon(center, &feature.geom),
                };
                if hit {
                    hits.push(PickedFeature {
                        layer_name: layer_name.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }
        hits
    }
}

fn dist(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

pub(crate) fn min_dist_to_points(p: Point, geom: &[Vec<Point>]) -> f64 {
    geom.iter()
        .flatten()
        .map(|&q| dist(p, q))
        .fold(f64::INFINITY, f64::min)
}

pub(crate) fn min_dist_to_lines(p: Point, geom: &[Vec<Point>]) -> f64 {
    geom.iter()
        .flat_map(|ring| ring.windows(2))
        .map(|seg| dist_to_segment(p, seg[0], seg[1]))
        .fold(f64::INFINITY, f64::min)
}

fn dist_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return dist(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    dist(p, Point::new(a.x + t * dx, a.y + t * dy))
}

/// Even-odd containment over all rings, so holes subtract.
pub(crate) fn point_in_polygon(p: Point, rings: &[Vec<Point>]) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
