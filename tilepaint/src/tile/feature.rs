//! Render feature types.

use std::sync::Arc;

/// Feature properties, shared between the tiled copies of one feature.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A point in tile-local pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in tile-local pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bbox {
    /// An inverted box that any point will expand.
    pub const EMPTY: Bbox = Bbox {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Grows the box to include `point`.
    #[inline]
    pub fn extend(&mut self, point: Point) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Returns true if the box has been extended by at least one point.
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Returns true if the two boxes overlap (touching edges count).
    pub fn intersects(&self, other: &Bbox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Returns the box grown by `margin` on all sides.
    pub fn expand(&self, margin: f64) -> Bbox {
        Bbox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Geometry kind of a render feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeomType {
    Point,
    Line,
    Polygon,
}

/// A feature in tile-local pixel space, ready to be painted or labelled.
///
/// Geometry is a list of point sequences: the points of a (multi)point
/// feature, the parts of a (multi)line, or the rings of a polygon (outer
/// rings wound opposite to holes).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFeature {
    pub props: Arc<Properties>,
    pub bbox: Bbox,
    pub geom_type: GeomType,
    pub geom: Vec<Vec<Point>>,
    pub num_vertices: usize,
}

impl RenderFeature {
    /// Builds a feature by scaling `rings` and recomputing the bounding box
    /// from the scaled vertices.
    ///
    /// Returns `None` if the geometry has no vertices.
    pub fn from_scaled<I, R>(
        geom_type: GeomType,
        rings: I,
        scale: f64,
        props: Arc<Properties>,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (f64, f64)>,
    {
        let mut bbox = Bbox::EMPTY;
        let mut num_vertices = 0;

        let geom: Vec<Vec<Point>> = rings
            .into_iter()
            .map(|ring| {
                ring.into_iter()
                    .map(|(x, y)| {
                        let p = Point::new(x * scale, y * scale);
                        bbox.extend(p);
                        num_vertices += 1;
                        p
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|ring| !ring.is_empty())
            .collect();

        if num_vertices == 0 {
            return None;
        }

        Some(Self {
            props,
            bbox,
            geom_type,
            geom,
            num_vertices,
        })
    }

    /// Returns a copy of the geometry multiplied by `scale`.
    pub fn scaled_geom(&self, scale: f64) -> Vec<Vec<Point>> {
        self.geom
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|p| Point::new(p.x * scale, p.y * scale))
                    .collect()
            })
            .collect()
    }
}
