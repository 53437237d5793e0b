use serde::{Deserialize, Serialize};

use super::{capsule, circle, offset, Coord, KernelOptions, Nm, Polygon, PolygonSet};

/// Copper or keepout outline as stored by the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Circle {
        center: Coord,
        diameter: Nm,
    },
    Rect {
        center: Coord,
        width: Nm,
        height: Nm,
        #[serde(default)]
        rotation: f64,
    },
    /// Rectangle with fully rounded short ends.
    Obround {
        center: Coord,
        width: Nm,
        height: Nm,
        #[serde(default)]
        rotation: f64,
    },
    Segment {
        from: Coord,
        to: Coord,
        width: Nm,
    },
    Polygon {
        outline: Polygon,
    },
}

impl Shape {
    /// Outline grown by `margin` on every side, as convex pieces.
    ///
    /// Round shapes are regenerated at the larger radius rather than offset,
    /// which keeps their vertex count fixed.
    pub fn inflated(&self, margin: Nm, options: &KernelOptions) -> PolygonSet {
        let margin = margin.max(0);
        match self {
            Shape::Circle { center, diameter } => PolygonSet::from_convex(circle(
                *center,
                diameter / 2 + margin,
                options.arc_segments,
            )),
            Shape::Segment { from, to, width } => PolygonSet::from_convex(capsule(
                *from,
                *to,
                width / 2 + margin,
                options.arc_segments,
            )),
            Shape::Obround { center, width, height, rotation } => {
                let (a, b, radius) = obround_axis(*center, *width, *height, *rotation);
                PolygonSet::from_convex(capsule(a, b, radius + margin, options.arc_segments))
            }
            Shape::Rect { .. } | Shape::Polygon { .. } => {
                offset(&self.area(options), margin, options)
            }
        }
    }

    /// Outline without margin.
    pub fn area(&self, options: &KernelOptions) -> PolygonSet {
        match self {
            Shape::Rect { center, width, height, rotation } => {
                let corners = Polygon::rect(Coord::default(), *width, *height)
                    .points
                    .into_iter()
                    .map(|c| *center + c.rotated(*rotation))
                    .collect();
                PolygonSet::from_convex(Polygon::new(corners))
            }
            Shape::Polygon { outline } => PolygonSet::from_polygon(outline),
            _ => self.inflated(0, options),
        }
    }

    /// Exact point containment, boundary inclusive. Round ends are true
    /// arcs here, independent of the kernel's arc resolution.
    pub fn contains(&self, p: Coord) -> bool {
        match self {
            Shape::Circle { center, diameter } => {
                center.dist_sq(p) <= ((diameter / 2) as i128).pow(2)
            }
            Shape::Rect { center, width, height, rotation } => {
                let local = (p - *center).rotated(-*rotation);
                local.x.abs() <= width / 2 && local.y.abs() <= height / 2
            }
            Shape::Obround { center, width, height, rotation } => {
                let (a, b, radius) = obround_axis(*center, *width, *height, *rotation);
                segment_dist_sq(a, b, p) <= (radius as f64).powi(2)
            }
            Shape::Segment { from, to, width } => {
                segment_dist_sq(*from, *to, p) <= ((width / 2) as f64).powi(2)
            }
            Shape::Polygon { outline } => {
                outline.bbox().is_some_and(|b| b.contains(p))
                    && PolygonSet::from_polygon(outline).contains(p)
            }
        }
    }

    /// Anchor point used for hit testing and via/pad positions.
    pub fn center(&self) -> Coord {
        match self {
            Shape::Circle { center, .. }
            | Shape::Rect { center, .. }
            | Shape::Obround { center, .. } => *center,
            Shape::Segment { from, to, .. } => {
                Coord::new(from.x + (to.x - from.x) / 2, from.y + (to.y - from.y) / 2)
            }
            Shape::Polygon { outline } => outline
                .bbox()
                .map(|b| Coord::new(b.min.x + (b.max.x - b.min.x) / 2, b.min.y + (b.max.y - b.min.y) / 2))
                .unwrap_or_default(),
        }
    }
}

fn segment_dist_sq(a: Coord, b: Coord, p: Coord) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq == 0 {
        return a.dist_sq(p) as f64;
    }
    let t = ((p - a).dot(ab) as f64 / len_sq as f64).clamp(0.0, 1.0);
    let dx = a.x as f64 + t * ab.x as f64 - p.x as f64;
    let dy = a.y as f64 + t * ab.y as f64 - p.y as f64;
    dx * dx + dy * dy
}

/// Centre line and radius of an obround.
fn obround_axis(center: Coord, width: Nm, height: Nm, rotation: f64) -> (Coord, Coord, Nm) {
    let radius = width.min(height) / 2;
    let half = (width.max(height) / 2 - radius).max(0);
    let axis = if width >= height {
        Coord::new(half, 0)
    } else {
        Coord::new(0, half)
    };
    let axis = axis.rotated(rotation);
    (center - axis, center + axis, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mm;

    #[test]
    fn test_rect_area_and_margin() {
        let options = KernelOptions::default();
        let pad = Shape::Rect {
            center: Coord::from_mm(1.0, 1.0),
            width: mm(1.0),
            height: mm(0.5),
            rotation: 0.0,
        };
        let area = pad.area(&options);
        assert!(area.contains(Coord::from_mm(1.45, 1.2)));
        assert!(!area.contains(Coord::from_mm(1.6, 1.0)));

        let grown = pad.inflated(mm(0.2), &options);
        assert!(grown.contains(Coord::from_mm(1.65, 1.0)));
        assert!(!grown.contains(Coord::from_mm(1.75, 1.0)));
    }

    #[test]
    fn test_rotated_rect() {
        let options = KernelOptions::default();
        let pad = Shape::Rect {
            center: Coord::new(0, 0),
            width: mm(2.0),
            height: mm(0.4),
            rotation: 90.0,
        };
        let area = pad.area(&options);
        assert!(area.contains(Coord::from_mm(0.0, 0.9)));
        assert!(!area.contains(Coord::from_mm(0.9, 0.0)));
    }

    #[test]
    fn test_obround_is_capsule() {
        let options = KernelOptions::default();
        let pad = Shape::Obround {
            center: Coord::new(0, 0),
            width: mm(2.0),
            height: mm(1.0),
            rotation: 0.0,
        };
        let area = pad.area(&options);
        assert!(area.contains(Coord::from_mm(0.95, 0.0)));
        assert!(!area.contains(Coord::from_mm(0.95, 0.45)));
    }

    #[test]
    fn test_contains_is_exact_for_round_shapes() {
        let via = Shape::Circle { center: Coord::new(0, 0), diameter: mm(1.0) };
        for angle in [0.0, 11.25, 30.0, 45.0, 100.0, 200.0] {
            let inside = Coord::new(mm(0.499), 0).rotated(angle);
            let outside = Coord::new(mm(0.502), 0).rotated(angle);
            assert!(via.contains(inside), "{angle}");
            assert!(!via.contains(outside), "{angle}");
        }

        let pad = Shape::Obround {
            center: Coord::new(0, 0),
            width: mm(2.0),
            height: mm(1.0),
            rotation: 90.0,
        };
        assert!(pad.contains(Coord::from_mm(0.0, 0.99)));
        assert!(!pad.contains(Coord::from_mm(0.6, 0.0)));
        assert!(!pad.contains(Coord::from_mm(0.0, 1.01)));
    }

    #[test]
    fn test_contains_rotated_rect_and_polygon() {
        let pad = Shape::Rect {
            center: Coord::from_mm(1.0, 1.0),
            width: mm(2.0),
            height: mm(0.4),
            rotation: 90.0,
        };
        assert!(pad.contains(Coord::from_mm(1.0, 1.9)));
        assert!(!pad.contains(Coord::from_mm(1.9, 1.0)));

        let l_shape = Shape::Polygon {
            outline: Polygon::new(vec![
                Coord::from_mm(0.0, 0.0),
                Coord::from_mm(4.0, 0.0),
                Coord::from_mm(4.0, 1.0),
                Coord::from_mm(1.0, 1.0),
                Coord::from_mm(1.0, 4.0),
                Coord::from_mm(0.0, 4.0),
            ]),
        };
        assert!(l_shape.contains(Coord::from_mm(0.5, 3.5)));
        assert!(l_shape.contains(Coord::from_mm(3.5, 0.5)));
        assert!(!l_shape.contains(Coord::from_mm(3.0, 3.0)));
    }

    #[test]
    fn test_shape_serde_tag() {
        let json = r#"{"shape":"circle","center":{"x":0,"y":0},"diameter":500000}"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert_eq!(shape.center(), Coord::new(0, 0));
    }
}
