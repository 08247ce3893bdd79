//! Projected geometry used while tiling.

use std::sync::Arc;

use crate::tile::Properties;

/// A vertex in normalized world space with its simplification importance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Vertex {
    pub x: f64,
    pub y: f64,
    /// Squared distance at which this vertex stops being kept; endpoints and
    /// clip intersections carry 1.0 so they are never dropped.
    pub importance: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, importance: f64) -> Self {
        Self { x, y, importance }
    }
}

/// A line or polygon ring.
///
/// `size` is the ring's length (lines) or absolute area (polygons) in world
/// units; tiny rings are dropped when tiling at low zoom.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Ring {
    pub points: Vec<Vertex>,
    pub size: f64,
}

impl Ring {
    pub fn with_size(size: f64) -> Self {
        Self {
            points: Vec::new(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProjectedGeometry {
    Points(Vec<Vertex>),
    Lines(Vec<Ring>),
    /// Each polygon is its outer ring followed by holes.
    Polygons(Vec<Vec<Ring>>),
}

/// A feature in normalized world space with its bounding box.
#[derive(Debug, Clone)]
pub(crate) struct ProjectedFeature {
    pub geometry: ProjectedGeometry,
    pub tags: Arc<Properties>,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ProjectedFeature {
    /// Creates a feature, computing its bounding box.
    ///
    /// Polygon bounding boxes consider outer rings only.
    pub fn new(geometry: ProjectedGeometry, tags: Arc<Properties>) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

        let mut extend = |points: &[Vertex]| {
            for p in points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
        };

        match &geometry {
            ProjectedGeometry::Points(points) => extend(points),
            ProjectedGeometry::Lines(lines) => lines.iter().for_each(|r| extend(&r.points)),
            ProjectedGeometry::Polygons(polygons) => polygons
                .iter()
                .filter_map(|p| p.first())
                .for_each(|r| extend(&r.points)),
        }

        Self {
            geometry,
            tags,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// Axis along which a clip is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    pub fn of(self, v: &Vertex) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    #[inline]
    pub fn bounds(self, f: &ProjectedFeature) -> (f64, f64) {
        match self {
            Axis::X => (f.min_x, f.max_x),
            Axis::Y => (f.min_y, f.max_y),
        }
    }
}
