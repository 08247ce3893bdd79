//! Conversion of geographic features into projected, simplified features.

use std::sync::Arc;

use geo::{Coord, Geometry, LineString, Polygon};

use super::simplify::simplify;
use super::types::{ProjectedFeature, ProjectedGeometry, Ring, Vertex};
use crate::collection::FeatureCollection;
use crate::coord::{project_to_world, LonLat};
use crate::tile::Properties;

/// Projects every feature of the collection.
///
/// Features without geometry, and geometries with no usable vertices, are
/// dropped. Geometry collections are split into one feature per member
/// sharing the same properties.
pub(crate) fn convert(
    collection: &FeatureCollection,
    max_zoom: u8,
    extent: u32,
    tolerance: f64,
) -> Vec<Arc<ProjectedFeature>> {
    let sq_tolerance = (tolerance / ((1u64 << max_zoom) as f64 * extent as f64)).powi(2);
    let mut out = Vec::with_capacity(collection.len());

    for feature in collection.features() {
        if let Some(geometry) = feature.geometry() {
            convert_geometry(&mut out, geometry, feature.properties(), sq_tolerance);
        }
    }

    out
}

fn convert_geometry(
    out: &mut Vec<Arc<ProjectedFeature>>,
    geometry: &Geometry<f64>,
    tags: &Arc<Properties>,
    sq_tolerance: f64,
) {
    let projected = match geometry {
        Geometry::Point(p) => Some(ProjectedGeometry::Points(vec![project(p.0)])),
        Geometry::MultiPoint(mp) => {
            let points: Vec<Vertex> = mp.iter().map(|p| project(p.0)).collect();
            (!points.is_empty()).then_some(ProjectedGeometry::Points(points))
        }
        Geometry::Line(l) => lines([convert_line([l.start, l.end], sq_tolerance, false)]),
        Geometry::LineString(ls) => lines([convert_line(ls.coords().copied(), sq_tolerance, false)]),
        Geometry::MultiLineString(mls) => lines(
            mls.iter()
                .map(|ls| convert_line(ls.coords().copied(), sq_tolerance, false)),
        ),
        Geometry::Polygon(p) => polygons([convert_polygon(p, sq_tolerance)]),
        Geometry::MultiPolygon(mp) => {
            polygons(mp.iter().map(|p| convert_polygon(p, sq_tolerance)))
        }
        Geometry::Rect(r) => polygons([convert_polygon(&r.to_polygon(), sq_tolerance)]),
        Geometry::Triangle(t) => polygons([convert_polygon(&t.to_polygon(), sq_tolerance)]),
        Geometry::GeometryCollection(gc) => {
            for member in gc.iter() {
                convert_geometry(out, member, tags, sq_tolerance);
            }
            None
        }
    };

    if let Some(geometry) = projected {
        out.push(Arc::new(ProjectedFeature::new(geometry, Arc::clone(tags))));
    }
}

fn lines(rings: impl IntoIterator<Item = Ring>) -> Option<ProjectedGeometry> {
    let rings: Vec<Ring> = rings.into_iter().filter(|r| !r.points.is_empty()).collect();
    (!rings.is_empty()).then_some(ProjectedGeometry::Lines(rings))
}

fn polygons(polys: impl IntoIterator<Item = Vec<Ring>>) -> Option<ProjectedGeometry> {
    let polys: Vec<Vec<Ring>> = polys.into_iter().filter(|p| !p.is_empty()).collect();
    (!polys.is_empty()).then_some(ProjectedGeometry::Polygons(polys))
}

/// Converts a polygon into rings; an empty exterior drops the polygon.
fn convert_polygon(polygon: &Polygon<f64>, sq_tolerance: f64) -> Vec<Ring> {
    if polygon.exterior().0.is_empty() {
        return Vec::new();
    }

    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring: &LineString<f64>| convert_line(ring.coords().copied(), sq_tolerance, true))
        .filter(|r| !r.points.is_empty())
        .collect()
}

fn convert_line(
    coords: impl IntoIterator<Item = Coord<f64>>,
    sq_tolerance: f64,
    is_polygon: bool,
) -> Ring {
    let mut points: Vec<Vertex> = Vec::new();
    let mut size = 0.0;
    let mut prev: Option<Vertex> = None;

    for c in coords {
        let v = project(c);
        if let Some(p) = prev {
            size += if is_polygon {
                (p.x * v.y - v.x * p.y) / 2.0
            } else {
                ((v.x - p.x).powi(2) + (v.y - p.y).powi(2)).sqrt()
            };
        }
        points.push(v);
        prev = Some(v);
    }

    if points.is_empty() {
        return Ring::default();
    }

    let last = points.len() - 1;
    points[0].importance = 1.0;
    simplify(&mut points, 0, last, sq_tolerance);
    points[last].importance = 1.0;

    Ring {
        points,
        size: size.abs(),
    }
}

#[inline]
fn project(c: Coord<f64>) -> Vertex {
    let (x, y) = project_to_world(LonLat::new(c.x, c.y));
    Vertex::new(x, y, 0.0)
}
