use crate::board::{ComponentId, Endpoint, ItemRef, JournalMark, NetId};
use crate::candidate::CandidatePath;
use crate::commit::CommitHandles;
use crate::geometry::Coord;
use crate::layers::LayerId;
use crate::obstacles::{Allowance, Exclusions};
use crate::propose::RouteMode;

/// State of one routing gesture, from the first click to finish or cancel.
///
/// The router replaces the whole value on every event; nothing in here is
/// shared with the board.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingSession {
    /// Where the gesture began.
    pub origin: Endpoint,
    /// Where the next committed leg will begin.
    pub start: Endpoint,
    /// Net being extended; unknown until the first commit when starting on
    /// a free point or an unconnected pad.
    pub net: Option<NetId>,
    pub layer: LayerId,
    pub mode: RouteMode,
    pub pending_via: bool,
    pub cursor: Coord,
    /// Connectable item under the cursor, or the cursor as a free point.
    pub target: Endpoint,
    pub candidate: CandidatePath,
    pub known_good: CandidatePath,
    pub valid: bool,
    pub committed: Vec<CommitHandles>,
    /// Journal position before the gesture touched the board.
    pub mark: JournalMark,
}

impl RoutingSession {
    pub fn begin(origin: Endpoint, layer: LayerId, mode: RouteMode, mark: JournalMark) -> Self {
        Self {
            start: origin.clone(),
            net: origin.net(),
            layer,
            mode,
            pending_via: false,
            cursor: origin.position(),
            target: origin.clone(),
            candidate: CandidatePath::empty(),
            known_good: CandidatePath::empty(),
            valid: true,
            committed: Vec::new(),
            mark,
            origin,
        }
    }

    /// Same gesture, continuing from the far end of `handles`.
    pub fn continued(&self, handles: CommitHandles, layer: LayerId) -> Self {
        let mut next = self.clone();
        next.start = handles.far_end.clone();
        next.net = Some(handles.net);
        next.layer = layer;
        next.pending_via = false;
        next.target = handles.far_end.clone();
        next.candidate = CandidatePath::empty();
        next.known_good = CandidatePath::empty();
        next.valid = true;
        next.committed.push(handles);
        next
    }

    /// Resolve what the cursor is pointing at. Existing items snap the
    /// target to their anchor; the start item itself collapses onto the
    /// start point.
    pub fn aim(&self, hover: Endpoint, cursor: Coord) -> Endpoint {
        match hover.item() {
            Some(item) if Some(item) == self.start.item() => self.start.clone(),
            Some(_) => hover,
            None => Endpoint::FreePoint { at: cursor },
        }
    }

    /// Items this gesture is standing on or has created.
    pub fn exclusions(&self) -> Exclusions {
        let mut excluding = Exclusions::default();
        for endpoint in [&self.origin, &self.start] {
            if let Some(item) = endpoint.item() {
                excluding.items.insert(item);
            }
            if let Some(component) = endpoint.component() {
                excluding.components.insert(component);
            }
        }
        for handles in &self.committed {
            excluding.items.extend(handles.items());
        }
        excluding
    }

    /// The current target may be landed on even though it is foreign copper.
    pub fn allowance(&self) -> Allowance {
        let mut allow = Allowance::default();
        if let Some(item) = self.target.item() {
            allow.items.push(item);
        }
        if let Some(component) = self.target.component() {
            allow.items.push(ItemRef::Courtyard(component));
        }
        if self.target.net() != self.net {
            allow.net = self.target.net();
        }
        allow
    }

    pub fn party_components(&self) -> Vec<ComponentId> {
        [&self.origin, &self.start, &self.target]
            .iter()
            .filter_map(|e| e.component())
            .collect()
    }

    /// The current start may continue on another copper layer.
    pub fn can_switch_layer(&self) -> bool {
        self.start.spans_layers()
    }
}
