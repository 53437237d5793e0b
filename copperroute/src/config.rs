//! Router configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{mm, KernelOptions, Nm};
use crate::layers::LayerTable;
use crate::propose::{AngleSet, LegOrder, RouteMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Via padstack used when the router places a via.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaRule {
    pub diameter: Nm,
    pub drill: Nm,
}

impl Default for ViaRule {
    fn default() -> Self {
        Self {
            diameter: mm(0.5),
            drill: mm(0.2),
        }
    }
}

/// When two differently-netted endpoints may be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    pub allow_merge: bool,
    /// Refuse merges where either side is a power/ground net.
    pub protect_power_nets: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            allow_merge: true,
            protect_power_nets: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub track_width: Nm,
    pub via: ViaRule,
    pub arc_segments: usize,
    pub max_vertices: usize,
    pub leg_order: LegOrder,
    pub angles: AngleSet,
    pub start_in_bend_mode: bool,
    pub merge: MergePolicy,
    pub layers: LayerTable,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            track_width: mm(0.25),
            via: ViaRule::default(),
            arc_segments: 16,
            max_vertices: 64,
            leg_order: LegOrder::LongerFirst,
            angles: AngleSet::Orthogonal,
            start_in_bend_mode: false,
            merge: MergePolicy::default(),
            layers: LayerTable::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.track_width <= 0 {
            return Err(ConfigError::Invalid {
                field: "track_width",
                reason: format!("must be positive, got {}", self.track_width),
            });
        }
        if self.via.drill <= 0 || self.via.diameter <= self.via.drill {
            return Err(ConfigError::Invalid {
                field: "via",
                reason: format!(
                    "diameter {} must exceed drill {} and both be positive",
                    self.via.diameter, self.via.drill
                ),
            });
        }
        if self.arc_segments < 4 {
            return Err(ConfigError::Invalid {
                field: "arc_segments",
                reason: "at least 4 segments required".to_string(),
            });
        }
        if self.layers.copper.is_empty() {
            return Err(ConfigError::Invalid {
                field: "layers",
                reason: "no copper layers".to_string(),
            });
        }
        Ok(())
    }

    pub fn kernel(&self) -> KernelOptions {
        KernelOptions {
            arc_segments: self.arc_segments,
            max_vertices: self.max_vertices.max(self.arc_segments),
        }
    }

    /// Mode a fresh routing session starts in.
    pub fn initial_mode(&self) -> RouteMode {
        RouteMode {
            bend: self.start_in_bend_mode,
            angles: self.angles,
            order: self.leg_order,
            flipped: false,
        }
    }
}
