//! Douglas-Peucker importance assignment.

use super::types::Vertex;

/// Assigns each interior vertex of `points[first..=last]` the squared
/// distance at which it becomes significant.
///
/// Vertices whose importance stays at zero are dropped when a tile is
/// simplified with any positive tolerance. Endpoints are not touched.
pub(crate) fn simplify(points: &mut [Vertex], first: usize, last: usize, sq_tolerance: f64) {
    let mut stack = vec![(first, last)];

    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }

        let mut max_sq_dist = sq_tolerance;
        let mid = first + (last - first) / 2;
        let mut min_pos_to_mid = last - first;
        let mut index = None;

        let a = points[first];
        let b = points[last];

        for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
            let d = sq_seg_dist(p.x, p.y, a.x, a.y, b.x, b.y);

            if d > max_sq_dist {
                index = Some(i);
                max_sq_dist = d;
            } else if d == max_sq_dist {
                // Prefer the vertex closest to the middle on ties so that
                // collinear runs split evenly.
                let pos_to_mid = i.abs_diff(mid);
                if pos_to_mid < min_pos_to_mid {
                    index = Some(i);
                    min_pos_to_mid = pos_to_mid;
                }
            }
        }

        if max_sq_dist > sq_tolerance {
            if let Some(index) = index {
                points[index].importance = max_sq_dist;
                stack.push((first, index));
                stack.push((index, last));
            }
        }
    }
}

/// Squared distance from point `(px, py)` to the segment `(x, y)-(bx, by)`.
#[inline]
fn sq_seg_dist(px: f64, py: f64, mut x: f64, mut y: f64, bx: f64, by: f64) -> f64 {
    let mut dx = bx - x;
    let mut dy = by - y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((px - x) * dx + (py - y) * dy) / (dx * dx + dy * dy);

        if t > 1.0 {
            x = bx;
            y = by;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    dx = px - x;
    dy = py - y;

    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(coords: &[(f64, f64)]) -> Vec<Vertex> {
        coords.iter().map(|&(x, y)| Vertex::new(x, y, 0.0)).collect()
    }

    #[test]
    fn test_peak_is_important() {
        let mut points = line(&[(0.0, 0.0), (0.5, 0.5), (1.0, 0.0)]);
        simplify(&mut points, 0, 2, 0.0);
        assert!(points[1].importance > 0.0);
    }

    #[test]
    fn test_collinear_points_stay_unimportant() {
        let mut points = line(&[(0.0, 0.0), (0.25, 0.0), (0.5, 0.0), (1.0, 0.0)]);
        simplify(&mut points, 0, 3, 1e-9);
        assert!(points[1..3].iter().all(|p| p.importance == 0.0));
    }

    #[test]
    fn test_below_tolerance_ignored() {
        let mut points = line(&[(0.0, 0.0), (0.5, 0.001), (1.0, 0.0)]);
        simplify(&mut points, 0, 2, 0.01);
        assert_eq!(points[1].importance, 0.0);
    }

    #[test]
    fn test_sq_seg_dist() {
        assert_eq!(sq_seg_dist(0.5, 1.0, 0.0, 0.0, 1.0, 0.0), 1.0);
        assert_eq!(sq_seg_dist(2.0, 0.0, 0.0, 0.0, 1.0, 0.0), 1.0);
        assert_eq!(sq_seg_dist(1.0, 1.0, 0.0, 0.0, 0.0, 0.0), 2.0);
    }
}
