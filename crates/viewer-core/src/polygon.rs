//! Point-in-polygon testing for highlight regions

use crate::geometry::NormalizedPoint;

/// Axis-aligned bounds of a vertex list: (min_x, min_y, max_x, max_y).
pub fn bounds(vertices: &[NormalizedPoint]) -> Option<(f32, f32, f32, f32)> {
    let first = vertices.first()?;
    let mut min_x = first.x;
    let mut max_x = first.x;
    let mut min_y = first.y;
    let mut max_y = first.y;

    for point in vertices.iter().skip(1) {
        min_x = min_x.min(point.x);
        max_x = max_x.max(point.x);
        min_y = min_y.min(point.y);
        max_y = max_y.max(point.y);
    }

    Some((min_x, min_y, max_x, max_y))
}

/// Whether `point` lies inside the closed polygon described by `vertices`.
///
/// Even-odd ray casting. Fewer than three vertices never contain anything.
pub fn contains(point: NormalizedPoint, vertices: &[NormalizedPoint]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let Some((min_x, min_y, max_x, max_y)) = bounds(vertices) else {
        return false;
    };
    if point.x < min_x || point.x > max_x || point.y < min_y || point.y > max_y {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[j];

        if (a.y > point.y) != (b.y > point.y) {
            let crossing_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < crossing_x {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<NormalizedPoint> {
        vec![
            NormalizedPoint::new(0.1, 0.1),
            NormalizedPoint::new(0.3, 0.1),
            NormalizedPoint::new(0.3, 0.3),
            NormalizedPoint::new(0.1, 0.3),
        ]
    }

    #[test]
    fn test_square_contains_center() {
        assert!(contains(NormalizedPoint::new(0.2, 0.2), &square()));
        assert!(!contains(NormalizedPoint::new(0.5, 0.5), &square()));
    }

    #[test]
    fn test_degenerate_polygons_contain_nothing() {
        let line = vec![NormalizedPoint::new(0.0, 0.0), NormalizedPoint::new(1.0, 1.0)];
        assert!(!contains(NormalizedPoint::new(0.5, 0.5), &line));
        assert!(!contains(NormalizedPoint::new(0.5, 0.5), &[]));
    }

    #[test]
    fn test_concave_polygon() {
        // An L shape; the notch at the top right is outside.
        let shape = vec![
            NormalizedPoint::new(0.0, 0.0),
            NormalizedPoint::new(0.4, 0.0),
            NormalizedPoint::new(0.4, 0.6),
            NormalizedPoint::new(1.0, 0.6),
            NormalizedPoint::new(1.0, 1.0),
            NormalizedPoint::new(0.0, 1.0),
        ];

        assert!(contains(NormalizedPoint::new(0.2, 0.2), &shape));
        assert!(contains(NormalizedPoint::new(0.8, 0.8), &shape));
        assert!(!contains(NormalizedPoint::new(0.8, 0.2), &shape));
    }

    #[test]
    fn test_result_is_invariant_under_cyclic_rotation() {
        let probes = [
            NormalizedPoint::new(0.2, 0.2),
            NormalizedPoint::new(0.5, 0.5),
            NormalizedPoint::new(0.15, 0.29),
            NormalizedPoint::new(0.0, 0.2),
        ];

        let base = square();
        for shift in 0..base.len() {
            let mut rotated = base.clone();
            rotated.rotate_left(shift);

            for probe in probes {
                assert_eq!(contains(probe, &rotated), contains(probe, &base), "shift {shift}");
            }
        }
    }

    #[test]
    fn test_bounds() {
        assert_eq!(bounds(&square()), Some((0.1, 0.1, 0.3, 0.3)));
        assert_eq!(bounds(&[]), None);
    }
}
