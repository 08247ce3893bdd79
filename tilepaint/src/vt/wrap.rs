//! Antimeridian wrapping.

use std::sync::Arc;

use super::clip::clip;
use super::types::{Axis, ProjectedFeature, ProjectedGeometry, Ring, Vertex};

/// Folds geometry extending past the antimeridian back into the world.
///
/// Parts within `buffer` (in world units) of either edge are copied to the
/// opposite side so that tiles on both edges of the world render them.
pub(crate) fn wrap(features: Vec<Arc<ProjectedFeature>>, buffer: f64) -> Vec<Arc<ProjectedFeature>> {
    let left = clip(&features, 1.0, -1.0 - buffer, buffer, Axis::X, -1.0, 2.0);
    let right = clip(&features, 1.0, 1.0 - buffer, 2.0 + buffer, Axis::X, -1.0, 2.0);

    if left.is_empty() && right.is_empty() {
        return features;
    }

    let center = clip(&features, 1.0, -buffer, 1.0 + buffer, Axis::X, -1.0, 2.0);

    let mut merged = Vec::with_capacity(left.len() + center.len() + right.len());
    merged.extend(left.iter().map(|f| shift_x(f, 1.0)));
    merged.extend(center);
    merged.extend(right.iter().map(|f| shift_x(f, -1.0)));
    merged
}

fn shift_x(feature: &ProjectedFeature, offset: f64) -> Arc<ProjectedFeature> {
    let shift_points =
        |points: &[Vertex]| -> Vec<Vertex> { points.iter().map(|p| Vertex::new(p.x + offset, p.y, p.importance)).collect() };
    let shift_ring = |ring: &Ring| Ring {
        points: shift_points(&ring.points),
        size: ring.size,
    };

    let geometry = match &feature.geometry {
        ProjectedGeometry::Points(points) => ProjectedGeometry::Points(shift_points(points)),
        ProjectedGeometry::Lines(lines) => {
            ProjectedGeometry::Lines(lines.iter().map(shift_ring).collect())
        }
        ProjectedGeometry::Polygons(polys) => ProjectedGeometry::Polygons(
            polys
                .iter()
                .map(|rings| rings.iter().map(shift_ring).collect())
                .collect(),
        ),
    };

    Arc::new(ProjectedFeature::new(geometry, Arc::clone(&feature.tags)))
}
