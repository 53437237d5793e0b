//! copperroute - interactive PCB track routing core
//!
//! Given a start point on the board and a moving cursor, the router proposes
//! a path in real time, rejects paths that would violate clearance to
//! foreign copper or keepouts, and on confirmation writes junctions, tracks
//! and vias into the board.
//!
//! # Quick Start
//!
//! ```
//! use copperroute::prelude::*;
//!
//! let mut board = Board::new("demo");
//! let mut router = Router::new(RouterConfig::default());
//!
//! router.update(&mut board, RouterEvent::Begin { at: Coord::from_mm(0.0, 0.0) });
//! let effects = router.update(
//!     &mut board,
//!     RouterEvent::Click { at: Coord::from_mm(10.0, 0.0), button: Button::Primary },
//! );
//! assert!(matches!(effects.outcome, Outcome::Committed(_)));
//! assert_eq!(board.tracks().count(), 1);
//! ```
//!
//! # Layout
//!
//! - [`geometry`]: integer polygon kernel (offset, intersection, track outlines)
//! - [`obstacles`]: per-layer inflated obstacle sets with an R-tree index
//! - [`propose`] and [`validate`]: per-frame path proposal and clearance check
//! - [`router`]: the event-driven state machine; [`commit`] writes results
//! - [`board`]: the in-memory document model and its connectivity graph
//! - [`parser`]: KiCad `.kicad_pcb` import

pub mod board;
pub mod candidate;
pub mod commit;
pub mod config;
pub mod core;
pub mod geometry;
pub mod layers;
pub mod obstacles;
pub mod parser;
pub mod propose;
pub mod replay;
pub mod router;
pub mod session;
pub mod validate;

pub use crate::core::{load_board, load_config, CopperRouteCore, CopperRouteError, LoadedBoard};
pub use board::{Board, DocumentModel, Endpoint, NetId};
pub use candidate::{CandidatePath, ViaPlan};
pub use commit::{CommitHandles, NetMerge};
pub use config::{MergePolicy, RouterConfig, ViaRule};
pub use geometry::{Coord, Nm};
pub use layers::{LayerId, LayerTable};
pub use router::{Button, Effects, Outcome, Phase, RouteError, Router, RouterEvent, RouterKey};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Board, Button, CandidatePath, CommitHandles, Coord, DocumentModel, Effects, Endpoint,
        LayerId, NetId, Outcome, Phase, RouteError, Router, RouterConfig, RouterEvent, RouterKey,
    };
}
