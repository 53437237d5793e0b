//! Copper layer stackup.
//!
//! The table is explicit configuration handed to the router and the obstacle
//! collector; nothing here is process-wide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// KiCad-style layer ordinal (`F.Cu` = 0, `B.Cu` = 31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u8);

impl LayerId {
    pub const FRONT: LayerId = LayerId(0);
    pub const BACK: LayerId = LayerId(31);
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
}

/// Copper layers in stackup order, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTable {
    pub copper: Vec<LayerInfo>,
}

impl Default for LayerTable {
    fn default() -> Self {
        Self::with_inner(0)
    }
}

impl LayerTable {
    /// `F.Cu`, `In1.Cu` .. `In{n}.Cu`, `B.Cu`.
    pub fn with_inner(inner: u8) -> Self {
        let inner = inner.min(30);
        let mut copper = vec![LayerInfo {
            id: LayerId::FRONT,
            name: "F.Cu".to_string(),
        }];
        for i in 1..=inner {
            copper.push(LayerInfo {
                id: LayerId(i),
                name: format!("In{}.Cu", i),
            });
        }
        copper.push(LayerInfo {
            id: LayerId::BACK,
            name: "B.Cu".to_string(),
        });
        Self { copper }
    }

    pub fn is_copper(&self, layer: LayerId) -> bool {
        self.copper.iter().any(|l| l.id == layer)
    }

    pub fn by_name(&self, name: &str) -> Option<LayerId> {
        self.copper.iter().find(|l| l.name == name).map(|l| l.id)
    }

    pub fn name(&self, layer: LayerId) -> Option<&str> {
        self.copper
            .iter()
            .find(|l| l.id == layer)
            .map(|l| l.name.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.copper.iter().map(|l| l.id)
    }

    /// Next copper layer in stackup order, wrapping from bottom to top.
    /// `None` on single-layer boards or for unknown layers.
    pub fn next_copper(&self, layer: LayerId) -> Option<LayerId> {
        if self.copper.len() < 2 {
            return None;
        }
        let pos = self.copper.iter().position(|l| l.id == layer)?;
        Some(self.copper[(pos + 1) % self.copper.len()].id)
    }

    /// Expand a KiCad layer spec such as `*.Cu` or `F&B.Cu`.
    pub fn resolve_spec(&self, spec: &str) -> Vec<LayerId> {
        match spec {
            "*.Cu" => self.ids().collect(),
            "F&B.Cu" => vec![LayerId::FRONT, LayerId::BACK],
            other => self.by_name(other).into_iter().collect(),
        }
    }
}
