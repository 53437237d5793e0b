use geo::{ConvexHull, MultiPoint, Point};

use super::{Coord, Polygon};

/// Convex hull, counter-clockwise, collinear points dropped.
///
/// Fewer than three distinct points come back as-is; a collinear cloud
/// collapses to its two extremes.
pub fn convex_hull(points: &[Coord]) -> Polygon {
    let mut pts: Vec<Coord> = points.to_vec();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return Polygon::new(pts);
    }

    let cloud: MultiPoint<i64> = pts.iter().map(|c| Point::new(c.x, c.y)).collect();
    let ring: Vec<Coord> = cloud
        .convex_hull()
        .exterior()
        .coords()
        .map(|c| Coord::new(c.x, c.y))
        .collect();
    let hull = Polygon::new(ring).simplified();
    if hull.len() < 3 {
        return Polygon::new(vec![pts[0], pts[pts.len() - 1]]);
    }
    hull.into_ccw()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_of_square_with_interior_points() {
        let pts = vec![
            Coord::new(0, 0),
            Coord::new(10, 0),
            Coord::new(5, 5),
            Coord::new(10, 10),
            Coord::new(0, 10),
            Coord::new(5, 0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(hull.signed_area2() > 0);
        assert_eq!(hull.signed_area2(), 200);
    }

    #[test]
    fn test_hull_is_ccw_from_any_order() {
        let pts = vec![
            Coord::new(-3_000, 2_000),
            Coord::new(4_000, -1_000),
            Coord::new(0, 0),
            Coord::new(1_000, 6_000),
            Coord::new(-2_000, -4_000),
            Coord::new(500, 500),
        ];
        let mut reversed = pts.clone();
        reversed.reverse();
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(hull.is_convex());
        assert!(hull.signed_area2() > 0);
        assert_eq!(convex_hull(&reversed).signed_area2(), hull.signed_area2());
        assert!(!hull.points.contains(&Coord::new(500, 500)));
    }

    #[test]
    fn test_hull_degenerate_inputs() {
        assert_eq!(convex_hull(&[]).len(), 0);
        assert_eq!(convex_hull(&[Coord::new(1, 1), Coord::new(1, 1)]).len(), 1);
        let line = convex_hull(&[Coord::new(0, 0), Coord::new(5, 0), Coord::new(10, 0)]);
        assert_eq!(line.points, vec![Coord::new(0, 0), Coord::new(10, 0)]);
    }
}
