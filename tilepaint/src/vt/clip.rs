//! Axis-parallel stripe clipping of projected features.

use std::sync::Arc;

use super::types::{Axis, ProjectedFeature, ProjectedGeometry, Ring, Vertex};

/// Clips features to the stripe `k1 <= v < k2` along `axis`.
///
/// `k1` and `k2` are given in tile units and divided by `scale` (the tile
/// count at the current zoom). `min_all`/`max_all` bound every feature in
/// the input and allow the whole set to be accepted or rejected at once.
/// Features lying entirely inside the stripe are shared, not copied.
/// Returns an empty vector when nothing survives.
#[allow(clippy::too_many_arguments)]
pub(crate) fn clip(
    features: &[Arc<ProjectedFeature>],
    scale: f64,
    k1: f64,
    k2: f64,
    axis: Axis,
    min_all: f64,
    max_all: f64,
) -> Vec<Arc<ProjectedFeature>> {
    let k1 = k1 / scale;
    let k2 = k2 / scale;

    if min_all >= k1 && max_all < k2 {
        return features.to_vec();
    } else if max_all < k1 || min_all >= k2 {
        return Vec::new();
    }

    let mut clipped = Vec::new();

    for feature in features {
        let (min, max) = axis.bounds(feature);

        if min >= k1 && max < k2 {
            clipped.push(Arc::clone(feature));
            continue;
        } else if max < k1 || min >= k2 {
            continue;
        }

        let geometry = match &feature.geometry {
            ProjectedGeometry::Points(points) => {
                let kept: Vec<Vertex> = points
                    .iter()
                    .filter(|p| {
                        let a = axis.of(p);
                        a >= k1 && a <= k2
                    })
                    .copied()
                    .collect();
                (!kept.is_empty()).then_some(ProjectedGeometry::Points(kept))
            }
            ProjectedGeometry::Lines(lines) => {
                let mut out = Vec::new();
                for line in lines {
                    clip_line(line, &mut out, k1, k2, axis, false);
                }
                (!out.is_empty()).then_some(ProjectedGeometry::Lines(out))
            }
            ProjectedGeometry::Polygons(polygons) => {
                let mut out = Vec::new();
                for polygon in polygons {
                    let mut rings = Vec::new();
                    for ring in polygon {
                        clip_line(ring, &mut rings, k1, k2, axis, true);
                    }
                    if !rings.is_empty() {
                        out.push(rings);
                    }
                }
                (!out.is_empty()).then_some(ProjectedGeometry::Polygons(out))
            }
        };

        if let Some(geometry) = geometry {
            clipped.push(Arc::new(ProjectedFeature::new(
                geometry,
                Arc::clone(&feature.tags),
            )));
        }
    }

    clipped
}

/// Clips one line or ring, appending the surviving pieces to `out`.
///
/// Lines are split into a new piece each time they leave the stripe;
/// rings stay whole and are closed if clipping opened them.
fn clip_line(geom: &Ring, out: &mut Vec<Ring>, k1: f64, k2: f64, axis: Axis, is_polygon: bool) {
    let points = &geom.points;
    let Some(last) = points.last() else {
        return;
    };

    let mut slice = Ring::with_size(geom.size);

    for pair in points.windows(2) {
        let (pa, pb) = (pair[0], pair[1]);
        let a = axis.of(&pa);
        let b = axis.of(&pb);
        let mut exited = false;

        if a < k1 {
            if b > k1 {
                intersect(&mut slice, pa, pb, k1, axis);
            }
        } else if a > k2 {
            if b < k2 {
                intersect(&mut slice, pa, pb, k2, axis);
            }
        } else {
            slice.points.push(pa);
        }

        if b < k1 && a >= k1 {
            intersect(&mut slice, pa, pb, k1, axis);
            exited = true;
        }
        if b > k2 && a <= k2 {
            intersect(&mut slice, pa, pb, k2, axis);
            exited = true;
        }

        if !is_polygon && exited {
            out.push(std::mem::replace(&mut slice, Ring::with_size(geom.size)));
        }
    }

    let a = axis.of(last);
    if a >= k1 && a <= k2 {
        slice.points.push(*last);
    }

    if is_polygon && slice.points.len() >= 2 {
        let first = slice.points[0];
        if let Some(end) = slice.points.last() {
            if end.x != first.x || end.y != first.y {
                slice.points.push(first);
            }
        }
    }

    if !slice.points.is_empty() {
        out.push(slice);
    }
}

/// Pushes the intersection of segment `a-b` with the line `axis = k`.
#[inline]
fn intersect(out: &mut Ring, a: Vertex, b: Vertex, k: f64, axis: Axis) {
    let v = match axis {
        Axis::X => {
            let t = (k - a.x) / (b.x - a.x);
            Vertex::new(k, a.y + (b.y - a.y) * t, 1.0)
        }
        Axis::Y => {
            let t = (k - a.y) / (b.y - a.y);
            Vertex::new(a.x + (b.x - a.x) * t, k, 1.0)
        }
    };
    out.points.push(v);
}
