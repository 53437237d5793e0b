//! Board document model
//!
//! The router consumes the document through [`DocumentModel`]: hit testing,
//! per-layer copper lookup, clearance resolution, and the handful of
//! mutators the commit writer needs. [`Board`] is the in-memory
//! implementation used by the CLI and the tests.

mod connectivity;
mod items;
mod model;
mod rules;

pub use connectivity::{Connectivity, ConnectivityIssue};
pub use items::{Component, CopperPour, Junction, Keepout, Net, NetClass, Pad, Track, Via};
pub use model::{Board, BoardFile};
pub use rules::{ClearanceRule, ClearanceRules};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ViaRule;
use crate::geometry::{Coord, Nm, Shape};
use crate::layers::LayerId;

macro_rules! uuid_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    )*};
}

uuid_id!(PadId, ComponentId, JunctionId, TrackId, ViaId, KeepoutId, PourId);

/// Net identity. Lower ids are older; merges keep the lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetId(pub u32);

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Any board item that can contribute geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Pad(PadId),
    Junction(JunctionId),
    Track(TrackId),
    Via(ViaId),
    Keepout(KeepoutId),
    Pour(PourId),
    Courtyard(ComponentId),
}

/// What a track end attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Terminal {
    Pad(PadId),
    Junction(JunctionId),
    Via(ViaId),
}

impl From<Terminal> for ItemRef {
    fn from(t: Terminal) -> Self {
        match t {
            Terminal::Pad(id) => ItemRef::Pad(id),
            Terminal::Junction(id) => ItemRef::Junction(id),
            Terminal::Via(id) => ItemRef::Via(id),
        }
    }
}

/// A connection point under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
    Pad {
        pad: PadId,
        component: ComponentId,
        at: Coord,
        net: Option<NetId>,
        /// Plated through: reachable from every copper layer.
        through: bool,
    },
    Junction {
        junction: JunctionId,
        at: Coord,
        net: NetId,
    },
    Via {
        via: ViaId,
        at: Coord,
        net: NetId,
    },
    FreePoint {
        at: Coord,
    },
}

impl Endpoint {
    pub fn position(&self) -> Coord {
        match self {
            Endpoint::Pad { at, .. }
            | Endpoint::Junction { at, .. }
            | Endpoint::Via { at, .. }
            | Endpoint::FreePoint { at } => *at,
        }
    }

    pub fn net(&self) -> Option<NetId> {
        match self {
            Endpoint::Pad { net, .. } => *net,
            Endpoint::Junction { net, .. } | Endpoint::Via { net, .. } => Some(*net),
            Endpoint::FreePoint { .. } => None,
        }
    }

    pub fn terminal(&self) -> Option<Terminal> {
        match self {
            Endpoint::Pad { pad, .. } => Some(Terminal::Pad(*pad)),
            Endpoint::Junction { junction, .. } => Some(Terminal::Junction(*junction)),
            Endpoint::Via { via, .. } => Some(Terminal::Via(*via)),
            Endpoint::FreePoint { .. } => None,
        }
    }

    pub fn item(&self) -> Option<ItemRef> {
        self.terminal().map(ItemRef::from)
    }

    pub fn component(&self) -> Option<ComponentId> {
        match self {
            Endpoint::Pad { component, .. } => Some(*component),
            _ => None,
        }
    }

    /// Existing board item, as opposed to empty space.
    pub fn is_existing(&self) -> bool {
        !matches!(self, Endpoint::FreePoint { .. })
    }

    /// Routing may continue on another layer from here.
    pub fn spans_layers(&self) -> bool {
        match self {
            Endpoint::Pad { through, .. } => *through,
            Endpoint::Via { .. } | Endpoint::FreePoint { .. } => true,
            Endpoint::Junction { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopperKind {
    Track,
    Via,
    Pad,
    Pour,
    Keepout,
    Courtyard,
}

/// Geometry contributed by one item on one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CopperItem {
    pub source: ItemRef,
    pub kind: CopperKind,
    pub net: Option<NetId>,
    pub component: Option<ComponentId>,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown net: {0}")]
    UnknownNet(NetId),
    #[error("Unknown pad: {0}")]
    UnknownPad(PadId),
    #[error("Unknown track terminal: {0:?}")]
    UnknownTerminal(Terminal),
    #[error("Terminal {terminal:?} is on {found:?}, track needs {expected}")]
    NetMismatch {
        terminal: Terminal,
        expected: NetId,
        found: Option<NetId>,
    },
    #[error("Pad {0} already belongs to net {1}")]
    PadAlreadyConnected(PadId, NetId),
    #[error("Cannot merge net {0} into itself")]
    SelfMerge(NetId),
    #[error("Zero-length track at {0}")]
    ZeroLengthTrack(Coord),
}

/// Position in the mutation journal; see [`DocumentModel::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JournalMark(pub(crate) usize);

/// Narrow view of the board document consumed by the router.
pub trait DocumentModel {
    /// Connectable item at `at` on `layer`, or a free point.
    fn hit_test(&self, at: Coord, layer: LayerId) -> Endpoint;

    /// All copper and keepout geometry present on `layer`.
    fn copper_on_layer(&self, layer: LayerId) -> Vec<CopperItem>;

    /// Clearance required around copper of `net` on `layer`. Always resolves.
    fn clearance(&self, net: Option<NetId>, layer: LayerId) -> Nm;

    fn net(&self, id: NetId) -> Option<&Net>;

    /// Bumped on every mutation; used to invalidate cached obstacle sets.
    fn revision(&self) -> u64;

    fn allocate_net(&mut self) -> NetId;

    fn insert_junction(&mut self, at: Coord, net: NetId, layer: LayerId) -> Result<JunctionId, ModelError>;

    /// Fails unless both terminals exist and already carry `net`.
    fn insert_track(
        &mut self,
        from: Terminal,
        to: Terminal,
        net: NetId,
        layer: LayerId,
        width: Nm,
    ) -> Result<TrackId, ModelError>;

    fn insert_via(
        &mut self,
        at: Coord,
        net: NetId,
        span: (LayerId, LayerId),
        rule: &ViaRule,
    ) -> Result<ViaId, ModelError>;

    /// Attach an unconnected pad to `net`.
    fn assign_pad_net(&mut self, pad: PadId, net: NetId) -> Result<(), ModelError>;

    /// Re-tag everything on `absorb` with `keep` and drop `absorb`.
    fn merge_nets(&mut self, keep: NetId, absorb: NetId) -> Result<(), ModelError>;

    fn mark(&self) -> JournalMark;

    /// Undo every mutation made after `mark`.
    fn rollback_to(&mut self, mark: JournalMark);

    /// Forget undo information after `mark`; later rollbacks stop there.
    fn settle(&mut self, mark: JournalMark);
}
