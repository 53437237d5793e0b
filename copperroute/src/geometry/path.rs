use super::{circle, convex_hull, Coord, KernelOptions, Nm, Polygon, PolygonSet};

/// Stadium around the segment `a → b`: round caps of `radius` at both ends.
pub fn capsule(a: Coord, b: Coord, radius: Nm, segments: usize) -> Polygon {
    let cap = circle(Coord::default(), radius, segments);
    if a == b {
        return cap.translated(a);
    }
    let points: Vec<Coord> = cap
        .points
        .iter()
        .flat_map(|&d| [a + d, b + d])
        .collect();
    convex_hull(&points)
}

/// Area swept by a track of `width` along `waypoints`.
///
/// One capsule per leg; overlapping caps give round joins, the same model
/// used for round pad and via lands. A single waypoint yields a dot, an
/// empty slice yields an empty set.
pub fn to_polygon(waypoints: &[Coord], width: Nm, options: &KernelOptions) -> PolygonSet {
    let radius = width / 2;
    let mut set = PolygonSet::new();
    match waypoints {
        [] => {}
        [single] => set.push_convex(circle(*single, radius, options.arc_segments)),
        _ => {
            for leg in waypoints.windows(2) {
                set.push_convex(capsule(leg[0], leg[1], radius, options.arc_segments));
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::intersects;

    #[test]
    fn test_capsule_contains_segment_and_caps() {
        let cap = capsule(Coord::new(0, 0), Coord::new(10_000, 0), 1_000, 16);
        assert!(cap.contains_convex(Coord::new(5_000, 900)));
        assert!(cap.contains_convex(Coord::new(10_900, 0)));
        assert!(cap.contains_convex(Coord::new(-900, 0)));
        assert!(!cap.contains_convex(Coord::new(5_000, 1_500)));
    }

    #[test]
    fn test_to_polygon_one_piece_per_leg() {
        let pts = [Coord::new(0, 0), Coord::new(10_000, 0), Coord::new(10_000, 10_000)];
        let area = to_polygon(&pts, 500, &KernelOptions::default());
        assert_eq!(area.len(), 2);
        assert!(area.contains(Coord::new(10_000, 5_000)));
    }

    #[test]
    fn test_to_polygon_empty_and_single() {
        let options = KernelOptions::default();
        assert!(to_polygon(&[], 500, &options).is_empty());
        assert_eq!(to_polygon(&[Coord::new(1, 1)], 500, &options).len(), 1);
    }

    #[test]
    fn test_parallel_tracks_with_gap_do_not_intersect() {
        let options = KernelOptions::default();
        let a = to_polygon(&[Coord::new(0, 0), Coord::new(10_000, 0)], 1_000, &options);
        let b = to_polygon(&[Coord::new(0, 3_000), Coord::new(10_000, 3_000)], 1_000, &options);
        let c = to_polygon(&[Coord::new(0, 800), Coord::new(10_000, 800)], 1_000, &options);
        assert!(!intersects(&a, &b));
        assert!(intersects(&a, &c));
    }
}
