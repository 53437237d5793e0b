use super::{Coord, Polygon, PolygonSet};

/// Positive-area overlap between two convex polygons (separating axis test).
///
/// Polygons that only share boundary points do not overlap; a track sitting
/// exactly at clearance distance is legal.
pub fn convex_overlap(a: &Polygon, b: &Polygon) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    if a.signed_area2() == 0 || b.signed_area2() == 0 {
        return false;
    }
    !has_separating_axis(a, b) && !has_separating_axis(b, a)
}

fn has_separating_axis(edges_of: &Polygon, other: &Polygon) -> bool {
    let n = edges_of.len();
    (0..n).any(|i| {
        let e = edges_of.points[(i + 1) % n] - edges_of.points[i];
        let axis = Coord::new(-e.y, e.x);
        let (min_a, max_a) = project(edges_of, axis);
        let (min_b, max_b) = project(other, axis);
        max_a <= min_b || max_b <= min_a
    })
}

fn project(poly: &Polygon, axis: Coord) -> (i128, i128) {
    poly.points
        .iter()
        .map(|p| p.dot(axis))
        .fold((i128::MAX, i128::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)))
}

/// True when any piece of `a` overlaps any piece of `b` with positive area.
pub fn intersects(a: &PolygonSet, b: &PolygonSet) -> bool {
    a.pieces().iter().any(|pa| {
        let Some(box_a) = pa.bbox() else {
            return false;
        };
        b.pieces().iter().any(|pb| {
            pb.bbox().is_some_and(|box_b| box_a.overlaps(&box_b)) && convex_overlap(pa, pb)
        })
    })
}
