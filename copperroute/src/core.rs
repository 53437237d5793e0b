//! File-level entry points shared by the CLI and embedding hosts.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::board::{Board, ConnectivityIssue, CopperKind, DocumentModel, ModelError, NetId};
use crate::config::{ConfigError, RouterConfig};
use crate::geometry::to_mm;
use crate::layers::LayerTable;
use crate::obstacles::{Exclusions, ObstacleCollector};
use crate::parser::pcb::{KicadPcbImporter, PcbImportError};
use crate::replay::{replay, ReplayError, ReplayReport, Script};
use crate::router::{RouteError, Router};

#[derive(Debug, thiserror::Error)]
pub enum CopperRouteError {
    #[error("Import error: {0}")]
    Import(#[from] PcbImportError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error("Board error: {0}")]
    Model(#[from] ModelError),
    #[error("Routing error: {0}")]
    Route(#[from] RouteError),
    #[error("Invalid board file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// A board plus the stackup it came with, if the file carried one.
#[derive(Debug, Clone)]
pub struct LoadedBoard {
    pub board: Board,
    pub layers: Option<LayerTable>,
}

/// Load a board from `.json` (native) or `.kicad_pcb`.
pub fn load_board(path: &Path) -> Result<LoadedBoard, CopperRouteError> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("kicad_pcb") => {
            let imported = KicadPcbImporter::import_file(path)?;
            Ok(LoadedBoard {
                board: imported.board,
                layers: Some(imported.layers),
            })
        }
        Some("json") => {
            let content = std::fs::read_to_string(path)?;
            Ok(LoadedBoard {
                board: Board::from_json_str(&content)?,
                layers: None,
            })
        }
        other => Err(CopperRouteError::Other(format!(
            "Unsupported board format: {}",
            other.unwrap_or("<none>")
        ))),
    }
}

/// Configuration from `path`, or defaults. An imported stackup replaces the
/// configured layer table.
pub fn load_config(path: Option<&Path>, stackup: Option<&LayerTable>) -> Result<RouterConfig, CopperRouteError> {
    let mut config = match path {
        Some(p) => RouterConfig::from_path(p)?,
        None => RouterConfig::default(),
    };
    if let Some(layers) = stackup {
        config.layers = layers.clone();
        config.validate()?;
    }
    Ok(config)
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleInfo {
    pub kind: CopperKind,
    pub net: Option<String>,
    pub margin_mm: f64,
    /// `[min_x, min_y, max_x, max_y]` in millimetres.
    pub bbox_mm: Option<[f64; 4]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleSummary {
    pub layer: String,
    pub net: Option<String>,
    pub count: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub obstacles: Vec<ObstacleInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardStats {
    pub name: String,
    pub nets: usize,
    pub pads: usize,
    pub junctions: usize,
    pub tracks: usize,
    pub vias: usize,
    pub keepouts: usize,
}

impl BoardStats {
    pub fn of(board: &Board) -> Self {
        Self {
            name: board.name.clone(),
            nets: board.nets().count(),
            pads: board.pads().count(),
            junctions: board.junctions().count(),
            tracks: board.tracks().count(),
            vias: board.vias().count(),
            keepouts: board.keepouts().count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub stats: BoardStats,
    pub issues: Vec<ConnectivityIssue>,
}

impl CheckResult {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct CopperRouteCore;

impl CopperRouteCore {
    /// Replay `script` over `board`, returning the report and the board as
    /// it stands afterwards.
    pub fn replay(
        mut board: Board,
        config: RouterConfig,
        script: &Script,
    ) -> Result<(ReplayReport, Board), CopperRouteError> {
        let mut router = Router::new(config);
        let report = replay(&mut board, &mut router, script)?;
        Ok((report, board))
    }

    pub fn obstacles(
        board: &Board,
        config: &RouterConfig,
        layer_name: &str,
        net_name: Option<&str>,
    ) -> Result<ObstacleSummary, CopperRouteError> {
        let layer = config
            .layers
            .by_name(layer_name)
            .ok_or_else(|| CopperRouteError::Other(format!("Unknown layer: {}", layer_name)))?;
        let net = match net_name {
            Some(name) => Some(
                board
                    .net_by_name(name)
                    .map(|n| n.id)
                    .ok_or_else(|| CopperRouteError::Other(format!("Unknown net: {}", name)))?,
            ),
            None => None,
        };
        let set = ObstacleCollector::build(board, layer, net, &Exclusions::default(), &config.kernel());

        let net_label = |id: NetId| board.net(id).map(|n| n.name.clone());
        let mut by_kind = BTreeMap::new();
        let obstacles = set
            .iter()
            .map(|o| {
                let kind = serde_json::to_value(o.kind)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                *by_kind.entry(kind).or_insert(0) += 1;
                ObstacleInfo {
                    kind: o.kind,
                    net: o.net.and_then(net_label),
                    margin_mm: to_mm(o.margin),
                    bbox_mm: o.area.bbox().map(|b| {
                        [to_mm(b.min.x), to_mm(b.min.y), to_mm(b.max.x), to_mm(b.max.y)]
                    }),
                }
            })
            .collect();
        Ok(ObstacleSummary {
            layer: layer_name.to_string(),
            net: net_name.map(str::to_string),
            count: set.len(),
            by_kind,
            obstacles,
        })
    }

    pub fn check(board: &Board) -> CheckResult {
        CheckResult {
            stats: BoardStats::of(board),
            issues: board.check(),
        }
    }
}
