use serde::Serialize;

use crate::geometry::{Coord, KernelOptions, Nm, PolygonSet};
use crate::geometry::{circle, to_polygon};
use crate::layers::LayerId;

/// Layer change at the far end of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViaPlan {
    pub at: Coord,
    pub from: LayerId,
    pub to: LayerId,
}

/// Waypoints of a proposed route, one layer per segment.
///
/// Consecutive waypoints always differ. An empty path (no segments) means
/// nothing has been proposed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidatePath {
    points: Vec<Coord>,
    layers: Vec<LayerId>,
    via: Option<ViaPlan>,
}

impl CandidatePath {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Path through `points` on a single layer. Repeated points are dropped;
    /// fewer than two distinct points yields the empty path.
    pub fn through(points: &[Coord], layer: LayerId) -> Self {
        let mut pts: Vec<Coord> = Vec::with_capacity(points.len());
        for &p in points {
            if pts.last() != Some(&p) {
                pts.push(p);
            }
        }
        if pts.len() < 2 {
            return Self::empty();
        }
        let layers = vec![layer; pts.len() - 1];
        Self { points: pts, layers, via: None }
    }

    /// Attach a via at the far end. Ignored on an empty path.
    pub fn with_via(mut self, to: LayerId) -> Self {
        if let (Some(&at), Some(&from)) = (self.points.last(), self.layers.last()) {
            if from != to {
                self.via = Some(ViaPlan { at, from, to });
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    pub fn layers(&self) -> &[LayerId] {
        &self.layers
    }

    pub fn via(&self) -> Option<&ViaPlan> {
        self.via.as_ref()
    }

    pub fn segment_count(&self) -> usize {
        self.layers.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = (Coord, Coord, LayerId)> + '_ {
        self.points
            .windows(2)
            .zip(&self.layers)
            .map(|(w, &layer)| (w[0], w[1], layer))
    }

    pub fn start(&self) -> Option<Coord> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Coord> {
        self.points.last().copied()
    }

    /// Waypoints strictly between the start and the end.
    pub fn interior(&self) -> &[Coord] {
        match self.points.len() {
            0..=2 => &[],
            n => &self.points[1..n - 1],
        }
    }

    /// Copper area on `layer` for a track of `width` plus a via land of
    /// `via_diameter` when a via touches that layer.
    pub fn area_on(
        &self,
        layer: LayerId,
        width: Nm,
        via_diameter: Nm,
        options: &KernelOptions,
    ) -> PolygonSet {
        let mut area = PolygonSet::new();
        let mut run: Vec<Coord> = Vec::new();
        for (a, b, l) in self.segments() {
            if l == layer {
                if run.last() != Some(&a) {
                    if !run.is_empty() {
                        area.extend(to_polygon(&run, width, options));
                    }
                    run = vec![a];
                }
                run.push(b);
            }
        }
        if run.len() >= 2 {
            area.extend(to_polygon(&run, width, options));
        }
        if let Some(via) = self.via.filter(|v| v.from == layer || v.to == layer) {
            area.push_convex(circle(via.at, via_diameter / 2, options.arc_segments));
        }
        area
    }

    /// Every layer this path puts copper on, in first-use order.
    pub fn copper_layers(&self) -> Vec<LayerId> {
        let mut layers: Vec<LayerId> = Vec::new();
        for &l in self.layers.iter().chain(self.via.iter().map(|v| &v.to)) {
            if !layers.contains(&l) {
                layers.push(l);
            }
        }
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_through_drops_duplicates() {
        let p = CandidatePath::through(
            &[Coord::new(0, 0), Coord::new(0, 0), Coord::new(10, 0), Coord::new(10, 0)],
            LayerId::FRONT,
        );
        assert_eq!(p.points(), &[Coord::new(0, 0), Coord::new(10, 0)]);
        assert_eq!(p.segment_count(), 1);
        assert!(p.interior().is_empty());
    }

    #[test]
    fn test_single_point_is_empty() {
        assert!(CandidatePath::through(&[Coord::new(3, 3), Coord::new(3, 3)], LayerId::FRONT).is_empty());
        assert!(CandidatePath::empty().with_via(LayerId::BACK).via().is_none());
    }

    #[test]
    fn test_via_adds_land_on_both_layers() {
        let options = KernelOptions::default();
        let p = CandidatePath::through(&[Coord::new(0, 0), Coord::new(1_000_000, 0)], LayerId::FRONT)
            .with_via(LayerId::BACK);
        assert_eq!(p.copper_layers(), vec![LayerId::FRONT, LayerId::BACK]);
        assert_eq!(p.area_on(LayerId::FRONT, 250_000, 500_000, &options).len(), 2);
        let back = p.area_on(LayerId::BACK, 250_000, 500_000, &options);
        assert_eq!(back.len(), 1);
        assert!(back.contains(Coord::new(1_000_000, 0)));
    }
}
