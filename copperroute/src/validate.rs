//! Path validation against an obstacle set.

use serde::Serialize;

use crate::board::{CopperKind, ItemRef, NetId};
use crate::candidate::CandidatePath;
use crate::config::RouterConfig;
use crate::geometry::{KernelOptions, Nm};
use crate::layers::LayerId;
use crate::obstacles::{Allowance, ObstacleSet};

/// Dimensions the candidate is inflated with before collision testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub track_width: Nm,
    pub via_diameter: Nm,
    pub kernel: KernelOptions,
}

impl From<&RouterConfig> for ValidationRules {
    fn from(config: &RouterConfig) -> Self {
        Self {
            track_width: config.track_width,
            via_diameter: config.via.diameter,
            kernel: config.kernel(),
        }
    }
}

/// First obstacle a rejected candidate ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub layer: LayerId,
    pub source: ItemRef,
    pub kind: CopperKind,
    pub net: Option<NetId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub accepted: bool,
    /// The candidate when accepted, otherwise the previous known-good path.
    pub known_good: CandidatePath,
    pub collision: Option<Collision>,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }
}

/// Check `candidate` against the obstacle sets of every layer it touches.
///
/// Layers without a matching set in `obstacles` are treated as empty. An
/// empty candidate is trivially accepted.
pub fn validate(
    candidate: &CandidatePath,
    obstacles: &[&ObstacleSet],
    known_good: &CandidatePath,
    rules: &ValidationRules,
    allow: &Allowance,
) -> Verdict {
    for layer in candidate.copper_layers() {
        let Some(set) = obstacles.iter().find(|s| s.layer() == layer) else {
            continue;
        };
        let area = candidate.area_on(layer, rules.track_width, rules.via_diameter, &rules.kernel);
        if let Some(hit) = set.first_collision(&area, allow) {
            tracing::debug!("Candidate rejected on {}: hits {:?}", layer, hit.source);
            return Verdict {
                accepted: false,
                known_good: known_good.clone(),
                collision: Some(Collision {
                    layer,
                    source: hit.source,
                    kind: hit.kind,
                    net: hit.net,
                }),
            };
        }
    }
    Verdict {
        accepted: true,
        known_good: candidate.clone(),
        collision: None,
    }
}
