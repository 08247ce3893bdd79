//! Tile construction and transformation to integer tile coordinates.

use std::sync::Arc;

use super::types::{ProjectedFeature, ProjectedGeometry, Ring};
use crate::coord::TileCoord;
use crate::tile::{GeomType, Properties};

/// A feature of a finished tile.
///
/// Coordinates are integers in `0..extent` for the part inside the tile,
/// and may extend into the buffer on any side (including negative values).
/// Point features hold all their points in a single sequence; lines hold
/// one sequence per part; polygons hold their rings with outer rings
/// clockwise in screen space and holes counter-clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorTileFeature {
    pub geom_type: GeomType,
    pub geometry: Vec<Vec<[i32; 2]>>,
    pub tags: Arc<Properties>,
}

/// A finished tile.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorTile {
    pub coord: TileCoord,
    pub features: Vec<VectorTileFeature>,
    /// Vertices considered while building the tile.
    pub num_points: usize,
    /// Vertices kept after simplification.
    pub num_simplified: usize,
}

impl VectorTile {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A simplified feature still in normalized world space.
#[derive(Debug)]
struct RawFeature {
    geom_type: GeomType,
    rings: Vec<Vec<(f64, f64)>>,
    tags: Arc<Properties>,
}

/// Tile as stored in the index.
#[derive(Debug)]
pub(crate) struct InternalTile {
    pub coord: TileCoord,
    pub num_points: usize,
    pub num_simplified: usize,
    /// Features this tile was cut from, kept while the tile is a leaf of the
    /// eagerly built index so that deeper tiles can be sliced on demand.
    pub source: Option<Vec<Arc<ProjectedFeature>>>,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    features: Vec<RawFeature>,
    transformed: Option<Arc<VectorTile>>,
}

impl InternalTile {
    /// Simplifies `features` for display at `coord`.
    ///
    /// `tolerance` is in world units; zero keeps every vertex.
    pub fn create(features: &[Arc<ProjectedFeature>], coord: TileCoord, tolerance: f64) -> Self {
        let mut tile = Self {
            coord,
            num_points: 0,
            num_simplified: 0,
            source: None,
            min_x: 2.0,
            min_y: 1.0,
            max_x: -1.0,
            max_y: 0.0,
            features: Vec::with_capacity(features.len()),
            transformed: None,
        };

        for feature in features {
            tile.add_feature(feature, tolerance);
        }

        tile
    }

    fn add_feature(&mut self, feature: &ProjectedFeature, tolerance: f64) {
        self.min_x = self.min_x.min(feature.min_x);
        self.min_y = self.min_y.min(feature.min_y);
        self.max_x = self.max_x.max(feature.max_x);
        self.max_y = self.max_y.max(feature.max_y);

        let mut rings = Vec::new();
        let geom_type = match &feature.geometry {
            ProjectedGeometry::Points(points) => {
                self.num_points += points.len();
                self.num_simplified += points.len();
                rings.push(points.iter().map(|p| (p.x, p.y)).collect());
                GeomType::Point
            }
            ProjectedGeometry::Lines(lines) => {
                for line in lines {
                    self.add_line(&mut rings, line, tolerance, false, false);
                }
                GeomType::Line
            }
            ProjectedGeometry::Polygons(polygons) => {
                for polygon in polygons {
                    for (i, ring) in polygon.iter().enumerate() {
                        self.add_line(&mut rings, ring, tolerance, true, i == 0);
                    }
                }
                GeomType::Polygon
            }
        };

        if !rings.is_empty() {
            self.features.push(RawFeature {
                geom_type,
                rings,
                tags: Arc::clone(&feature.tags),
            });
        }
    }

    fn add_line(
        &mut self,
        out: &mut Vec<Vec<(f64, f64)>>,
        ring: &Ring,
        tolerance: f64,
        is_polygon: bool,
        is_outer: bool,
    ) {
        let sq_tolerance = tolerance * tolerance;

        if tolerance > 0.0 && ring.size < if is_polygon { sq_tolerance } else { tolerance } {
            self.num_points += ring.points.len();
            return;
        }

        let mut kept = Vec::with_capacity(ring.points.len());
        for p in &ring.points {
            if tolerance == 0.0 || p.importance > sq_tolerance {
                self.num_simplified += 1;
                kept.push((p.x, p.y));
            }
            self.num_points += 1;
        }

        if is_polygon {
            rewind(&mut kept, is_outer);
        }

        out.push(kept);
    }

    /// Converts the tile to integer coordinates, once.
    pub fn transform(&mut self, extent: u32) -> Arc<VectorTile> {
        if let Some(tile) = &self.transformed {
            return Arc::clone(tile);
        }

        let z2 = (1u64 << self.coord.z) as f64;
        let tx = self.coord.x as f64;
        let ty = self.coord.y as f64;
        let extent = extent as f64;

        let to_tile = |(x, y): (f64, f64)| -> [i32; 2] {
            [
                js_round(extent * (x * z2 - tx)) as i32,
                js_round(extent * (y * z2 - ty)) as i32,
            ]
        };

        let features = std::mem::take(&mut self.features)
            .into_iter()
            .map(|f| VectorTileFeature {
                geom_type: f.geom_type,
                geometry: f
                    .rings
                    .into_iter()
                    .map(|ring| ring.into_iter().map(to_tile).collect())
                    .collect(),
                tags: f.tags,
            })
            .collect();

        let tile = Arc::new(VectorTile {
            coord: self.coord,
            features,
            num_points: self.num_points,
            num_simplified: self.num_simplified,
        });
        self.transformed = Some(Arc::clone(&tile));
        tile
    }
}

/// Rounds half up, matching the rounding the tile extent was designed with.
#[inline]
fn js_round(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Ensures the ring winding: outer rings clockwise in screen space
/// (y down), holes counter-clockwise.
fn rewind(ring: &mut [(f64, f64)], clockwise: bool) {
    let len = ring.len();
    if len == 0 {
        return;
    }

    let mut area = 0.0;
    let mut j = len - 1;
    for i in 0..len {
        area += (ring[i].0 - ring[j].0) * (ring[i].1 + ring[j].1);
        j = i;
    }

    if (area > 0.0) == clockwise {
        ring.reverse();
    }
}
