//! Path proposal
//!
//! Pure function from (start, cursor, mode) to a candidate path. No board
//! access: collisions are the validator's business.

use serde::{Deserialize, Serialize};

use crate::candidate::CandidatePath;
use crate::geometry::Coord;
use crate::layers::LayerId;

/// Directions a bend-mode route may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleSet {
    /// Horizontal and vertical legs only.
    #[default]
    Orthogonal,
    /// Horizontal, vertical and 45° diagonal legs.
    Octilinear,
}

impl AngleSet {
    pub fn next(self) -> Self {
        match self {
            AngleSet::Orthogonal => AngleSet::Octilinear,
            AngleSet::Octilinear => AngleSet::Orthogonal,
        }
    }
}

/// Which of the two dogleg shapes is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegOrder {
    /// The first leg is the longer one.
    #[default]
    LongerFirst,
    ShorterFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteMode {
    /// Constrain to `angles`; otherwise a direct segment to the cursor.
    pub bend: bool,
    pub angles: AngleSet,
    pub order: LegOrder,
    /// Swap the dogleg choice made by `order`.
    pub flipped: bool,
}

impl Default for RouteMode {
    fn default() -> Self {
        Self {
            bend: false,
            angles: AngleSet::Orthogonal,
            order: LegOrder::LongerFirst,
            flipped: false,
        }
    }
}

impl RouteMode {
    pub fn toggle_bend(self) -> Self {
        Self { bend: !self.bend, ..self }
    }

    pub fn flip(self) -> Self {
        Self { flipped: !self.flipped, ..self }
    }

    pub fn cycle_angles(self) -> Self {
        Self { angles: self.angles.next(), ..self }
    }
}

/// Propose a path from `start` to `cursor` on `layer`.
///
/// Returns the empty path when the cursor sits on the start point.
pub fn propose(start: Coord, cursor: Coord, mode: &RouteMode, layer: LayerId) -> CandidatePath {
    if start == cursor {
        return CandidatePath::empty();
    }
    if !mode.bend {
        return CandidatePath::through(&[start, cursor], layer);
    }
    match dogleg(start, cursor, mode) {
        Some(mid) => CandidatePath::through(&[start, mid, cursor], layer),
        None => CandidatePath::through(&[start, cursor], layer),
    }
}

/// Interior waypoint of the two-leg route, or `None` when a single segment
/// already satisfies the angle set.
pub fn dogleg(start: Coord, cursor: Coord, mode: &RouteMode) -> Option<Coord> {
    let d = cursor - start;
    if d.x == 0 || d.y == 0 {
        return None;
    }
    let (option_a, option_b, first_a, first_b) = match mode.angles {
        AngleSet::Orthogonal => {
            let a = Coord::new(cursor.x, start.y);
            let b = Coord::new(start.x, cursor.y);
            (a, b, start.dist_sq(a), start.dist_sq(b))
        }
        AngleSet::Octilinear => {
            let m = d.x.abs().min(d.y.abs());
            if d.x.abs() == d.y.abs() {
                return None;
            }
            let diag = Coord::new(d.x.signum() * m, d.y.signum() * m);
            let a = cursor - diag;
            let b = start + diag;
            (a, b, start.dist_sq(a), start.dist_sq(b))
        }
    };
    let prefer_a = match mode.order {
        LegOrder::LongerFirst => first_a >= first_b,
        LegOrder::ShorterFirst => first_a <= first_b,
    };
    if prefer_a != mode.flipped {
        Some(option_a)
    } else {
        Some(option_b)
    }
}
