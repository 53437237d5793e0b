use std::f64::consts::PI;

use super::{convex_hull, Coord, KernelOptions, Nm, Polygon, PolygonSet};

const MIN_ARC_SEGMENTS: usize = 4;

/// Regular polygon circumscribing the circle of `radius` around `center`.
///
/// The polygon always covers the true circle, so clearance derived from it
/// is never under-estimated.
pub fn circle(center: Coord, radius: Nm, segments: usize) -> Polygon {
    let segments = segments.max(MIN_ARC_SEGMENTS);
    let step = 2.0 * PI / segments as f64;
    // +1 absorbs rounding of the vertex coordinates
    let outer = (radius as f64 / (step / 2.0).cos()).ceil() + 1.0;
    Polygon::new(
        (0..segments)
            .map(|k| {
                let angle = step * k as f64;
                Coord::new(
                    center.x + (outer * angle.cos()).round() as Nm,
                    center.y + (outer * angle.sin()).round() as Nm,
                )
            })
            .collect(),
    )
}

/// Inflate every piece of `set` by `distance` with rounded corners.
///
/// Each convex piece becomes the hull of its vertices swept by a circle,
/// which is exactly its Minkowski sum with the (approximated) disk. The arc
/// resolution is lowered for pieces with many vertices so that no result
/// piece exceeds `max_vertices`. Non-positive distances return the input.
pub fn offset(set: &PolygonSet, distance: Nm, options: &KernelOptions) -> PolygonSet {
    if distance <= 0 {
        return set.clone();
    }
    let mut out = PolygonSet::new();
    for piece in set.pieces() {
        out.push_convex(inflate_convex(piece, distance, options));
    }
    out
}

fn inflate_convex(piece: &Polygon, distance: Nm, options: &KernelOptions) -> Polygon {
    let per_vertex = (options.max_vertices / piece.len().max(1))
        .clamp(MIN_ARC_SEGMENTS, options.arc_segments.max(MIN_ARC_SEGMENTS));
    let disk = circle(Coord::default(), distance, per_vertex);
    let swept: Vec<Coord> = piece
        .points
        .iter()
        .flat_map(|&v| disk.points.iter().map(move |&d| v + d))
        .collect();
    let hull = convex_hull(&swept);
    if hull.len() > options.max_vertices.max(MIN_ARC_SEGMENTS) {
        bounded_box(&hull)
    } else {
        hull
    }
}

/// Last-resort bound: the bounding rectangle still covers the hull.
fn bounded_box(hull: &Polygon) -> Polygon {
    match hull.bbox() {
        Some(b) => Polygon::new(vec![
            b.min,
            Coord::new(b.max.x, b.min.y),
            b.max,
            Coord::new(b.min.x, b.max.y),
        ]),
        None => hull.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_covers_radius() {
        let c = circle(Coord::new(0, 0), 1_000, 16).into_ccw();
        assert_eq!(c.len(), 16);
        for p in [
            Coord::new(1_000, 0),
            Coord::new(0, 1_000),
            Coord::new(-707, -707),
            Coord::new(707, -707),
        ] {
            assert!(c.contains_convex(p), "{p:?} should be inside");
        }
    }

    #[test]
    fn test_offset_grows_square() {
        let set = PolygonSet::from_convex(Polygon::rect(Coord::new(0, 0), 1_000, 1_000));
        let grown = offset(&set, 200, &KernelOptions::default());
        assert_eq!(grown.len(), 1);
        let bbox = grown.bbox().unwrap();
        assert!(bbox.min.x <= -700 && bbox.max.x >= 700);
        assert!(grown.contains(Coord::new(690, 0)));
        assert!(!grown.contains(Coord::new(800, 0)));
        // Rounded corner: the sharp corner of the enlarged square stays outside
        assert!(!grown.contains(Coord::new(695, 695)));
    }

    #[test]
    fn test_offset_vertex_bound() {
        let options = KernelOptions { arc_segments: 64, max_vertices: 24 };
        let set = PolygonSet::from_convex(circle(Coord::new(0, 0), 10_000, 32));
        let grown = offset(&set, 500, &options);
        assert!(grown.pieces().iter().all(|p| p.len() <= 24));
    }

    #[test]
    fn test_offset_is_deterministic() {
        let set = PolygonSet::from_convex(Polygon::rect(Coord::new(3, 7), 900, 400));
        let options = KernelOptions::default();
        assert_eq!(offset(&set, 150, &options), offset(&set, 150, &options));
    }

    #[test]
    fn test_zero_offset_is_identity() {
        let set = PolygonSet::from_convex(Polygon::rect(Coord::new(0, 0), 10, 10));
        assert_eq!(offset(&set, 0, &KernelOptions::default()), set);
    }
}
