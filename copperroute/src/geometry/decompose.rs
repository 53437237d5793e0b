use super::{convex_hull, orient, Coord, Polygon};

/// Split a simple polygon into convex pieces.
///
/// Convex input comes back as a single piece. Concave input is ear-clipped
/// into triangles. Self-intersecting input that runs out of ears falls back
/// to the hull of the remaining vertices, which only ever grows the area.
pub fn decompose(polygon: &Polygon) -> Vec<Polygon> {
    let poly = polygon.simplified().into_ccw();
    if poly.len() < 3 || poly.signed_area2() == 0 {
        return Vec::new();
    }
    if poly.is_convex() {
        return vec![poly];
    }

    let mut remaining = poly.points;
    let mut pieces = Vec::with_capacity(remaining.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = (0..n).find(|&i| is_ear(&remaining, i));
        match ear {
            Some(i) => {
                let prev = remaining[(i + n - 1) % n];
                let next = remaining[(i + 1) % n];
                pieces.push(Polygon::new(vec![prev, remaining[i], next]));
                remaining.remove(i);
            }
            None => {
                let hull = convex_hull(&remaining);
                if hull.len() >= 3 {
                    pieces.push(hull);
                }
                return pieces;
            }
        }
    }

    let last = Polygon::new(remaining);
    if last.signed_area2() > 0 {
        pieces.push(last);
    }
    pieces
}

fn is_ear(points: &[Coord], i: usize) -> bool {
    let n = points.len();
    let a = points[(i + n - 1) % n];
    let b = points[i];
    let c = points[(i + 1) % n];
    if orient(a, b, c) <= 0 {
        return false;
    }
    points
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i && j != (i + n - 1) % n && j != (i + 1) % n)
        .all(|(_, &p)| !in_triangle(a, b, c, p) || p == a || p == b || p == c)
}

fn in_triangle(a: Coord, b: Coord, c: Coord, p: Coord) -> bool {
    orient(a, b, p) >= 0 && orient(b, c, p) >= 0 && orient(c, a, p) >= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_area2(pieces: &[Polygon]) -> i128 {
        pieces.iter().map(Polygon::signed_area2).sum()
    }

    #[test]
    fn test_convex_passthrough() {
        let square = Polygon::rect(Coord::new(0, 0), 10, 10);
        let pieces = decompose(&square);
        assert_eq!(pieces.len(), 1);
        assert_eq!(total_area2(&pieces), square.signed_area2());
    }

    #[test]
    fn test_l_shape_preserves_area() {
        let l_shape = Polygon::new(vec![
            Coord::new(0, 0),
            Coord::new(20, 0),
            Coord::new(20, 10),
            Coord::new(10, 10),
            Coord::new(10, 20),
            Coord::new(0, 20),
        ]);
        let pieces = decompose(&l_shape);
        assert!(pieces.len() >= 2);
        assert!(pieces.iter().all(|p| p.is_convex()));
        assert_eq!(total_area2(&pieces), l_shape.signed_area2());
    }

    #[test]
    fn test_clockwise_input_is_normalized() {
        let mut l_shape = Polygon::new(vec![
            Coord::new(0, 0),
            Coord::new(20, 0),
            Coord::new(20, 10),
            Coord::new(10, 10),
            Coord::new(10, 20),
            Coord::new(0, 20),
        ]);
        l_shape.points.reverse();
        let pieces = decompose(&l_shape);
        assert!(pieces.iter().all(|p| p.signed_area2() > 0));
        assert_eq!(total_area2(&pieces), 600);
    }

    #[test]
    fn test_degenerate_polygon_is_empty() {
        let sliver = Polygon::new(vec![Coord::new(0, 0), Coord::new(5, 0), Coord::new(10, 0)]);
        assert!(decompose(&sliver).is_empty());
    }
}
