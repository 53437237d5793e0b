//! Scripted event replay
//!
//! Drives a [`Router`] over a board from a JSON list of pointer and key
//! events (coordinates in millimetres) and records what happened at every
//! step.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::board::DocumentModel;
use crate::geometry::{to_mm, Coord};
use crate::router::{Button, Outcome, Phase, Router, RouterEvent, RouterKey};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid script: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown layer in script: {0}")]
    UnknownLayer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Begin { x: f64, y: f64 },
    Motion { x: f64, y: f64 },
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
    },
    Key { key: RouterKey },
}

impl ScriptEvent {
    pub fn to_event(self) -> RouterEvent {
        match self {
            ScriptEvent::Begin { x, y } => RouterEvent::Begin { at: Coord::from_mm(x, y) },
            ScriptEvent::Motion { x, y } => RouterEvent::Motion { at: Coord::from_mm(x, y) },
            ScriptEvent::Click { x, y, button } => RouterEvent::Click { at: Coord::from_mm(x, y), button },
            ScriptEvent::Key { key } => RouterEvent::Key(key),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Layer name the first gesture starts on; defaults to the first copper layer.
    #[serde(default)]
    pub layer: Option<String>,
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn from_json_str(content: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub event: ScriptEvent,
    pub phase: Phase,
    pub outcome: Outcome,
    pub valid: bool,
    /// Candidate waypoints in millimetres.
    pub candidate: Vec<[f64; 2]>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub committed: usize,
    pub finished: usize,
    pub refused: usize,
    pub canceled: usize,
    pub tracks: usize,
    pub junctions: usize,
    pub vias: usize,
    pub merges: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub summary: ReplaySummary,
}

pub fn replay<D: DocumentModel + ?Sized>(
    doc: &mut D,
    router: &mut Router,
    script: &Script,
) -> Result<ReplayReport, ReplayError> {
    if let Some(name) = &script.layer {
        let layer = router
            .config()
            .layers
            .by_name(name)
            .ok_or_else(|| ReplayError::UnknownLayer(name.clone()))?;
        router.set_active_layer(layer);
    }

    let mut steps = Vec::with_capacity(script.events.len());
    let mut summary = ReplaySummary::default();
    for (index, &event) in script.events.iter().enumerate() {
        let effects = router.update(doc, event.to_event());
        let legs: &[crate::commit::CommitHandles] = match &effects.outcome {
            Outcome::Committed(handles) => {
                summary.committed += 1;
                std::slice::from_ref(handles)
            }
            Outcome::Finished(legs) => {
                summary.finished += 1;
                legs.last().map(std::slice::from_ref).unwrap_or_default()
            }
            Outcome::Refused => {
                summary.refused += 1;
                &[]
            }
            Outcome::Canceled => {
                summary.canceled += 1;
                &[]
            }
            _ => &[],
        };
        for leg in legs {
            summary.tracks += leg.tracks.len();
            summary.junctions += leg.junctions.len() + leg.anchor.iter().count();
            summary.vias += leg.via.iter().count();
            summary.merges += leg.merged.iter().count();
        }
        steps.push(StepReport {
            index,
            event,
            phase: effects.phase,
            valid: effects.valid,
            candidate: effects
                .candidate
                .points()
                .iter()
                .map(|p| [to_mm(p.x), to_mm(p.y)])
                .collect(),
            notice: effects.notice.as_ref().map(ToString::to_string),
            outcome: effects.outcome,
        });
    }
    Ok(ReplayReport { steps, summary })
}
