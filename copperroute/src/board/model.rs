use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::connectivity::{Connectivity, ConnectivityIssue};
use super::{
    ClearanceRules, Component, ComponentId, CopperItem, CopperKind, CopperPour, DocumentModel,
    Endpoint, ItemRef, Junction, JunctionId, JournalMark, Keepout, KeepoutId, ModelError, Net,
    NetId, Pad, PadId, PourId, Terminal, Track, TrackId, Via, ViaId,
};
use crate::config::ViaRule;
use crate::geometry::{Coord, Nm, Polygon, Shape};
use crate::layers::LayerId;

/// Serialized form of a [`Board`]: flat item lists, ids inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nets: Vec<Net>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub pads: Vec<Pad>,
    #[serde(default)]
    pub junctions: Vec<Junction>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub vias: Vec<Via>,
    #[serde(default)]
    pub keepouts: Vec<Keepout>,
    #[serde(default)]
    pub pours: Vec<CopperPour>,
    #[serde(default)]
    pub clearance: ClearanceRules,
}

#[derive(Debug, Clone)]
enum JournalEntry {
    NetAllocated(NetId),
    JunctionInserted(JunctionId),
    TrackInserted(TrackId),
    ViaInserted(ViaId),
    PadNetAssigned {
        pad: PadId,
        previous: Option<NetId>,
    },
    NetsMerged {
        keep: NetId,
        absorbed: Net,
        retagged: Vec<ItemRef>,
        rules: ClearanceRules,
    },
}

/// In-memory board: the persistent connectivity graph the router writes to.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub name: String,
    pub clearance: ClearanceRules,
    nets: BTreeMap<NetId, Net>,
    components: BTreeMap<ComponentId, Component>,
    pads: BTreeMap<PadId, Pad>,
    junctions: BTreeMap<JunctionId, Junction>,
    tracks: BTreeMap<TrackId, Track>,
    vias: BTreeMap<ViaId, Via>,
    keepouts: BTreeMap<KeepoutId, Keepout>,
    pours: BTreeMap<PourId, CopperPour>,
    /// Half the widest track attached to each junction: its pick radius.
    reach: HashMap<JunctionId, Nm>,
    journal: Vec<JournalEntry>,
    revision: u64,
    next_net: u32,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_net: 1,
            ..Default::default()
        }
    }

    pub fn from_file(file: BoardFile) -> Self {
        let next_net = file.nets.iter().map(|n| n.id.0 + 1).max().unwrap_or(1).max(1);
        let mut board = Self {
            name: file.name,
            clearance: file.clearance,
            nets: file.nets.into_iter().map(|n| (n.id, n)).collect(),
            components: file.components.into_iter().map(|c| (c.id, c)).collect(),
            pads: file.pads.into_iter().map(|p| (p.id, p)).collect(),
            junctions: file.junctions.into_iter().map(|j| (j.id, j)).collect(),
            tracks: file.tracks.into_iter().map(|t| (t.id, t)).collect(),
            vias: file.vias.into_iter().map(|v| (v.id, v)).collect(),
            keepouts: file.keepouts.into_iter().map(|k| (k.id, k)).collect(),
            pours: file.pours.into_iter().map(|p| (p.id, p)).collect(),
            reach: HashMap::new(),
            journal: Vec::new(),
            revision: 0,
            next_net,
        };
        let tracks: Vec<Track> = board.tracks.values().cloned().collect();
        for track in &tracks {
            board.extend_reach(track);
        }
        board
    }

    pub fn to_file(&self) -> BoardFile {
        BoardFile {
            name: self.name.clone(),
            nets: self.nets.values().cloned().collect(),
            components: self.components.values().cloned().collect(),
            pads: self.pads.values().cloned().collect(),
            junctions: self.junctions.values().cloned().collect(),
            tracks: self.tracks.values().cloned().collect(),
            vias: self.vias.values().cloned().collect(),
            keepouts: self.keepouts.values().cloned().collect(),
            pours: self.pours.values().cloned().collect(),
            clearance: self.clearance.clone(),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<BoardFile>(content).map(Self::from_file)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_file())
    }

    // --- building (not journaled) ---

    pub fn add_net(&mut self, name: impl Into<String>) -> NetId {
        let id = NetId(self.next_net);
        self.add_net_record(Net::new(id, name));
        id
    }

    /// Insert a fully specified net, keeping its id.
    pub fn add_net_record(&mut self, net: Net) {
        self.next_net = self.next_net.max(net.id.0 + 1);
        self.nets.insert(net.id, net);
        self.revision += 1;
    }

    pub fn add_component(&mut self, reference: impl Into<String>, layer: LayerId) -> ComponentId {
        let id = ComponentId::new();
        self.components.insert(
            id,
            Component {
                id,
                reference: reference.into(),
                courtyard: None,
                layer,
            },
        );
        self.revision += 1;
        id
    }

    pub fn set_courtyard(&mut self, component: ComponentId, outline: Polygon) {
        if let Some(c) = self.components.get_mut(&component) {
            c.courtyard = Some(outline);
            self.revision += 1;
        }
    }

    pub fn add_pad(&mut self, pad: Pad) -> PadId {
        let id = pad.id;
        self.pads.insert(id, pad);
        self.revision += 1;
        id
    }

    pub fn add_keepout(&mut self, layers: Vec<LayerId>, outline: Polygon) -> KeepoutId {
        let id = KeepoutId::new();
        self.keepouts.insert(id, Keepout { id, layers, outline });
        self.revision += 1;
        id
    }

    pub fn add_pour(&mut self, net: Option<NetId>, layer: LayerId, outline: Polygon) -> PourId {
        let id = PourId::new();
        self.pours.insert(id, CopperPour { id, net, layer, outline });
        self.revision += 1;
        id
    }

    /// Give a via a new id, e.g. the one stored in an imported file. Keeps
    /// the old id if the new one is taken or tracks already reference it.
    pub(crate) fn rekey_via(&mut self, old: ViaId, new: ViaId) -> ViaId {
        let referenced = self
            .tracks
            .values()
            .any(|t| t.from == Terminal::Via(old) || t.to == Terminal::Via(old));
        if referenced || self.vias.contains_key(&new) {
            return old;
        }
        match self.vias.remove(&old) {
            Some(mut via) => {
                via.id = new;
                self.vias.insert(new, via);
                new
            }
            None => old,
        }
    }

    pub(crate) fn rekey_track(&mut self, old: TrackId, new: TrackId) -> TrackId {
        if self.tracks.contains_key(&new) {
            return old;
        }
        match self.tracks.remove(&old) {
            Some(mut track) => {
                track.id = new;
                self.tracks.insert(new, track);
                new
            }
            None => old,
        }
    }

    // --- queries ---

    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn net_by_name(&self, name: &str) -> Option<&Net> {
        self.nets.values().find(|n| n.name == name)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn component_by_reference(&self, reference: &str) -> Option<&Component> {
        self.components.values().find(|c| c.reference == reference)
    }

    pub fn pads(&self) -> impl Iterator<Item = &Pad> {
        self.pads.values()
    }

    pub fn pad(&self, id: PadId) -> Option<&Pad> {
        self.pads.get(&id)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(&id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn vias(&self) -> impl Iterator<Item = &Via> {
        self.vias.values()
    }

    pub fn via(&self, id: ViaId) -> Option<&Via> {
        self.vias.get(&id)
    }

    pub fn keepouts(&self) -> impl Iterator<Item = &Keepout> {
        self.keepouts.values()
    }

    pub fn pours(&self) -> impl Iterator<Item = &CopperPour> {
        self.pours.values()
    }

    /// Net carried by a terminal; outer `None` when the terminal is unknown.
    pub fn terminal_net(&self, terminal: Terminal) -> Option<Option<NetId>> {
        match terminal {
            Terminal::Pad(id) => self.pads.get(&id).map(|p| p.net),
            Terminal::Junction(id) => self.junctions.get(&id).map(|j| Some(j.net)),
            Terminal::Via(id) => self.vias.get(&id).map(|v| Some(v.net)),
        }
    }

    pub fn terminal_position(&self, terminal: Terminal) -> Option<Coord> {
        match terminal {
            Terminal::Pad(id) => self.pads.get(&id).map(Pad::position),
            Terminal::Junction(id) => self.junctions.get(&id).map(|j| j.position),
            Terminal::Via(id) => self.vias.get(&id).map(|v| v.position),
        }
    }

    /// Every item currently tagged with `net`.
    pub fn items_on_net(&self, net: NetId) -> Vec<ItemRef> {
        let pads = self
            .pads
            .values()
            .filter(|p| p.net == Some(net))
            .map(|p| ItemRef::Pad(p.id));
        let junctions = self
            .junctions
            .values()
            .filter(|j| j.net == net)
            .map(|j| ItemRef::Junction(j.id));
        let tracks = self
            .tracks
            .values()
            .filter(|t| t.net == net)
            .map(|t| ItemRef::Track(t.id));
        let vias = self
            .vias
            .values()
            .filter(|v| v.net == net)
            .map(|v| ItemRef::Via(v.id));
        pads.chain(junctions).chain(tracks).chain(vias).collect()
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity::build(self)
    }

    /// Structural problems: dangling terminals, mixed-net tracks and islands.
    pub fn check(&self) -> Vec<ConnectivityIssue> {
        self.connectivity().issues(self)
    }

    fn via_on_layer(via: &Via, layer: LayerId) -> bool {
        let (a, b) = via.span;
        a.min(b) <= layer && layer <= a.max(b)
    }

    /// Pick radius of a junction; zero when nothing is attached yet.
    pub fn junction_reach(&self, id: JunctionId) -> Nm {
        self.reach.get(&id).copied().unwrap_or(0)
    }

    fn extend_reach(&mut self, track: &Track) {
        for terminal in [track.from, track.to] {
            if let Terminal::Junction(id) = terminal {
                let radius = self.reach.entry(id).or_insert(0);
                *radius = (*radius).max(track.width / 2);
            }
        }
    }

    /// Recompute the reach of the junctions `track` was attached to.
    fn shrink_reach(&mut self, track: &Track) {
        for terminal in [track.from, track.to] {
            if let Terminal::Junction(id) = terminal {
                let widest = self
                    .tracks
                    .values()
                    .filter(|t| t.from == terminal || t.to == terminal)
                    .map(|t| t.width / 2)
                    .max();
                match widest {
                    Some(radius) => {
                        self.reach.insert(id, radius);
                    }
                    None => {
                        self.reach.remove(&id);
                    }
                }
            }
        }
    }

    fn track_shape(&self, track: &Track) -> Option<Shape> {
        Some(Shape::Segment {
            from: self.terminal_position(track.from)?,
            to: self.terminal_position(track.to)?,
            width: track.width,
        })
    }

    fn touch(&mut self, entry: JournalEntry) {
        self.journal.push(entry);
        self.revision += 1;
    }

    fn retag(&mut self, from: NetId, to: NetId) -> Vec<ItemRef> {
        let mut retagged = Vec::new();
        for pad in self.pads.values_mut().filter(|p| p.net == Some(from)) {
            pad.net = Some(to);
            retagged.push(ItemRef::Pad(pad.id));
        }
        for j in self.junctions.values_mut().filter(|j| j.net == from) {
            j.net = to;
            retagged.push(ItemRef::Junction(j.id));
        }
        for t in self.tracks.values_mut().filter(|t| t.net == from) {
            t.net = to;
            retagged.push(ItemRef::Track(t.id));
        }
        for v in self.vias.values_mut().filter(|v| v.net == from) {
            v.net = to;
            retagged.push(ItemRef::Via(v.id));
        }
        for p in self.pours.values_mut().filter(|p| p.net == Some(from)) {
            p.net = Some(to);
            retagged.push(ItemRef::Pour(p.id));
        }
        retagged
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::NetAllocated(id) => {
                self.nets.remove(&id);
                self.next_net = id.0;
            }
            JournalEntry::JunctionInserted(id) => {
                self.junctions.remove(&id);
                self.reach.remove(&id);
            }
            JournalEntry::TrackInserted(id) => {
                if let Some(track) = self.tracks.remove(&id) {
                    self.shrink_reach(&track);
                }
            }
            JournalEntry::ViaInserted(id) => {
                self.vias.remove(&id);
            }
            JournalEntry::PadNetAssigned { pad, previous } => {
                if let Some(p) = self.pads.get_mut(&pad) {
                    p.net = previous;
                }
            }
            JournalEntry::NetsMerged { keep, absorbed, retagged, rules } => {
                let to = absorbed.id;
                for item in retagged {
                    match item {
                        ItemRef::Pad(id) => {
                            if let Some(p) = self.pads.get_mut(&id) {
                                p.net = Some(to);
                            }
                        }
                        ItemRef::Junction(id) => {
                            if let Some(j) = self.junctions.get_mut(&id) {
                                j.net = to;
                            }
                        }
                        ItemRef::Track(id) => {
                            if let Some(t) = self.tracks.get_mut(&id) {
                                t.net = to;
                            }
                        }
                        ItemRef::Via(id) => {
                            if let Some(v) = self.vias.get_mut(&id) {
                                v.net = to;
                            }
                        }
                        ItemRef::Pour(id) => {
                            if let Some(p) = self.pours.get_mut(&id) {
                                p.net = Some(to);
                            }
                        }
                        ItemRef::Keepout(_) | ItemRef::Courtyard(_) => {}
                    }
                }
                self.clearance = rules;
                self.nets.insert(to, absorbed);
                tracing::debug!("Restored net {} split from {}", to, keep);
            }
        }
    }
}

impl DocumentModel for Board {
    fn hit_test(&self, at: Coord, layer: LayerId) -> Endpoint {
        let vias = self
            .vias
            .values()
            .filter(|v| Self::via_on_layer(v, layer))
            .filter(|v| v.position.dist_sq(at) <= ((v.diameter / 2) as i128).pow(2))
            .min_by_key(|v| (v.position.dist_sq(at), v.id));
        if let Some(v) = vias {
            return Endpoint::Via { via: v.id, at: v.position, net: v.net };
        }

        let junction = self
            .junctions
            .values()
            .filter(|j| j.layer == layer)
            .map(|j| (j, j.position.dist_sq(at)))
            .filter(|(j, d)| *d <= (self.junction_reach(j.id) as i128).pow(2))
            .min_by_key(|(j, d)| (*d, j.id));
        if let Some((j, _)) = junction {
            return Endpoint::Junction { junction: j.id, at: j.position, net: j.net };
        }

        let pad = self
            .pads
            .values()
            .filter(|p| p.on_layer(layer))
            .filter(|p| p.land.contains(at))
            .min_by_key(|p| (p.position().dist_sq(at), p.id));
        if let Some(p) = pad {
            return Endpoint::Pad {
                pad: p.id,
                component: p.component,
                at: p.position(),
                net: p.net,
                through: p.through,
            };
        }

        Endpoint::FreePoint { at }
    }

    fn copper_on_layer(&self, layer: LayerId) -> Vec<CopperItem> {
        let mut items = Vec::new();
        for track in self.tracks.values().filter(|t| t.layer == layer) {
            match self.track_shape(track) {
                Some(shape) => items.push(CopperItem {
                    source: ItemRef::Track(track.id),
                    kind: CopperKind::Track,
                    net: Some(track.net),
                    component: None,
                    shape,
                }),
                None => tracing::warn!("Track {} has a dangling terminal, skipped", track.id),
            }
        }
        for via in self.vias.values().filter(|v| Self::via_on_layer(v, layer)) {
            items.push(CopperItem {
                source: ItemRef::Via(via.id),
                kind: CopperKind::Via,
                net: Some(via.net),
                component: None,
                shape: Shape::Circle { center: via.position, diameter: via.diameter },
            });
        }
        for pad in self.pads.values().filter(|p| p.on_layer(layer)) {
            items.push(CopperItem {
                source: ItemRef::Pad(pad.id),
                kind: CopperKind::Pad,
                net: pad.net,
                component: Some(pad.component),
                shape: pad.land.clone(),
            });
        }
        for pour in self.pours.values().filter(|p| p.layer == layer) {
            items.push(CopperItem {
                source: ItemRef::Pour(pour.id),
                kind: CopperKind::Pour,
                net: pour.net,
                component: None,
                shape: Shape::Polygon { outline: pour.outline.clone() },
            });
        }
        for keepout in self.keepouts.values().filter(|k| k.layers.contains(&layer)) {
            items.push(CopperItem {
                source: ItemRef::Keepout(keepout.id),
                kind: CopperKind::Keepout,
                net: None,
                component: None,
                shape: Shape::Polygon { outline: keepout.outline.clone() },
            });
        }
        for component in self.components.values().filter(|c| c.layer == layer) {
            if let Some(courtyard) = &component.courtyard {
                items.push(CopperItem {
                    source: ItemRef::Courtyard(component.id),
                    kind: CopperKind::Courtyard,
                    net: None,
                    component: Some(component.id),
                    shape: Shape::Polygon { outline: courtyard.clone() },
                });
            }
        }
        items
    }

    fn clearance(&self, net: Option<NetId>, layer: LayerId) -> Nm {
        self.clearance.resolve(net, layer)
    }

    fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(&id)
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn allocate_net(&mut self) -> NetId {
        let id = NetId(self.next_net);
        self.next_net += 1;
        self.nets.insert(id, Net::new(id, format!("Net-{}", id.0)));
        self.touch(JournalEntry::NetAllocated(id));
        id
    }

    fn insert_junction(&mut self, at: Coord, net: NetId, layer: LayerId) -> Result<JunctionId, ModelError> {
        if !self.nets.contains_key(&net) {
            return Err(ModelError::UnknownNet(net));
        }
        let id = JunctionId::new();
        self.junctions.insert(id, Junction { id, position: at, net, layer });
        self.touch(JournalEntry::JunctionInserted(id));
        Ok(id)
    }

    fn insert_track(
        &mut self,
        from: Terminal,
        to: Terminal,
        net: NetId,
        layer: LayerId,
        width: Nm,
    ) -> Result<TrackId, ModelError> {
        if !self.nets.contains_key(&net) {
            return Err(ModelError::UnknownNet(net));
        }
        for terminal in [from, to] {
            let found = self
                .terminal_net(terminal)
                .ok_or(ModelError::UnknownTerminal(terminal))?;
            if found != Some(net) {
                return Err(ModelError::NetMismatch { terminal, expected: net, found });
            }
        }
        let a = self.terminal_position(from).ok_or(ModelError::UnknownTerminal(from))?;
        let b = self.terminal_position(to).ok_or(ModelError::UnknownTerminal(to))?;
        if a == b {
            return Err(ModelError::ZeroLengthTrack(a));
        }
        let id = TrackId::new();
        let track = Track { id, from, to, net, layer, width };
        self.extend_reach(&track);
        self.tracks.insert(id, track);
        self.touch(JournalEntry::TrackInserted(id));
        Ok(id)
    }

    fn insert_via(
        &mut self,
        at: Coord,
        net: NetId,
        span: (LayerId, LayerId),
        rule: &ViaRule,
    ) -> Result<ViaId, ModelError> {
        if !self.nets.contains_key(&net) {
            return Err(ModelError::UnknownNet(net));
        }
        let id = ViaId::new();
        self.vias.insert(
            id,
            Via {
                id,
                position: at,
                net,
                span: (span.0.min(span.1), span.0.max(span.1)),
                diameter: rule.diameter,
                drill: rule.drill,
            },
        );
        self.touch(JournalEntry::ViaInserted(id));
        Ok(id)
    }

    fn assign_pad_net(&mut self, pad: PadId, net: NetId) -> Result<(), ModelError> {
        if !self.nets.contains_key(&net) {
            return Err(ModelError::UnknownNet(net));
        }
        let p = self.pads.get_mut(&pad).ok_or(ModelError::UnknownPad(pad))?;
        match p.net {
            Some(existing) if existing == net => Ok(()),
            Some(existing) => Err(ModelError::PadAlreadyConnected(pad, existing)),
            None => {
                p.net = Some(net);
                self.touch(JournalEntry::PadNetAssigned { pad, previous: None });
                Ok(())
            }
        }
    }

    fn merge_nets(&mut self, keep: NetId, absorb: NetId) -> Result<(), ModelError> {
        if keep == absorb {
            return Err(ModelError::SelfMerge(keep));
        }
        if !self.nets.contains_key(&keep) {
            return Err(ModelError::UnknownNet(keep));
        }
        let absorbed = self.nets.remove(&absorb).ok_or(ModelError::UnknownNet(absorb))?;
        let rules = self.clearance.clone();
        self.clearance.retarget(absorb, keep);
        let retagged = self.retag(absorb, keep);
        tracing::info!(
            "Merged net {} ({}) into {}: {} items retagged",
            absorb,
            absorbed.name,
            keep,
            retagged.len()
        );
        self.touch(JournalEntry::NetsMerged { keep, absorbed, retagged, rules });
        Ok(())
    }

    fn mark(&self) -> JournalMark {
        JournalMark(self.journal.len())
    }

    fn rollback_to(&mut self, mark: JournalMark) {
        let undone = self.journal.len().saturating_sub(mark.0);
        while self.journal.len() > mark.0 {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        if undone > 0 {
            self.revision += 1;
            tracing::debug!("Rolled back {} board mutations", undone);
        }
    }

    fn settle(&mut self, mark: JournalMark) {
        self.journal.truncate(mark.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mm;

    fn board_with_pad() -> (Board, PadId, NetId) {
        let mut board = Board::new("test");
        let gnd = board.add_net("GND");
        let u1 = board.add_component("U1", LayerId::FRONT);
        let pad = board.add_pad(Pad {
            id: PadId::new(),
            component: u1,
            number: "1".into(),
            land: Shape::Rect {
                center: Coord::from_mm(5.0, 5.0),
                width: mm(1.0),
                height: mm(1.0),
                rotation: 0.0,
            },
            layers: vec![LayerId::FRONT],
            net: Some(gnd),
            through: false,
        });
        (board, pad, gnd)
    }

    #[test]
    fn test_hit_test_pad_and_free_point() {
        let (board, pad, gnd) = board_with_pad();
        match board.hit_test(Coord::from_mm(5.2, 5.1), LayerId::FRONT) {
            Endpoint::Pad { pad: hit, net, at, .. } => {
                assert_eq!(hit, pad);
                assert_eq!(net, Some(gnd));
                assert_eq!(at, Coord::from_mm(5.0, 5.0));
            }
            other => panic!("expected pad, got {other:?}"),
        }
        assert!(matches!(
            board.hit_test(Coord::from_mm(5.2, 5.1), LayerId::BACK),
            Endpoint::FreePoint { .. }
        ));
        assert!(matches!(
            board.hit_test(Coord::from_mm(9.0, 9.0), LayerId::FRONT),
            Endpoint::FreePoint { .. }
        ));
    }

    #[test]
    fn test_round_pad_pick_area_is_the_true_circle() {
        let mut board = Board::new("round");
        let tp = board.add_component("TP1", LayerId::FRONT);
        let pad = board.add_pad(Pad {
            id: PadId::new(),
            component: tp,
            number: "1".into(),
            land: Shape::Circle { center: Coord::new(0, 0), diameter: mm(1.0) },
            layers: vec![LayerId::FRONT],
            net: None,
            through: false,
        });
        for angle in [0.0, 10.0, 22.5, 45.0, 77.0] {
            let near = Coord::new(mm(0.499), 0).rotated(angle);
            let beyond = Coord::new(mm(0.503), 0).rotated(angle);
            assert!(
                matches!(board.hit_test(near, LayerId::FRONT), Endpoint::Pad { pad: hit, .. } if hit == pad),
                "{angle}"
            );
            assert!(
                matches!(board.hit_test(beyond, LayerId::FRONT), Endpoint::FreePoint { .. }),
                "{angle}"
            );
        }
    }

    #[test]
    fn test_insert_track_requires_same_net() {
        let (mut board, pad, gnd) = board_with_pad();
        let other = board.add_net("SIG");
        let j = board.insert_junction(Coord::from_mm(10.0, 5.0), other, LayerId::FRONT).unwrap();
        let err = board
            .insert_track(Terminal::Pad(pad), Terminal::Junction(j), gnd, LayerId::FRONT, mm(0.25))
            .unwrap_err();
        assert!(matches!(err, ModelError::NetMismatch { .. }));
    }

    #[test]
    fn test_junction_reach_follows_attached_tracks() {
        let (mut board, _, gnd) = board_with_pad();
        let a = board.insert_junction(Coord::from_mm(20.0, 0.0), gnd, LayerId::FRONT).unwrap();
        let b = board.insert_junction(Coord::from_mm(30.0, 0.0), gnd, LayerId::FRONT).unwrap();
        assert_eq!(board.junction_reach(a), 0);
        board
            .insert_track(Terminal::Junction(a), Terminal::Junction(b), gnd, LayerId::FRONT, mm(0.2))
            .unwrap();

        let mark = board.mark();
        let c = board.insert_junction(Coord::from_mm(20.0, 10.0), gnd, LayerId::FRONT).unwrap();
        board
            .insert_track(Terminal::Junction(a), Terminal::Junction(c), gnd, LayerId::FRONT, mm(0.6))
            .unwrap();
        assert_eq!(board.junction_reach(a), mm(0.3));
        assert!(matches!(
            board.hit_test(Coord::from_mm(20.25, 0.0), LayerId::FRONT),
            Endpoint::Junction { junction, .. } if junction == a
        ));

        board.rollback_to(mark);
        assert_eq!(board.junction_reach(a), mm(0.1));
        assert_eq!(board.junction_reach(c), 0);
        assert!(matches!(
            board.hit_test(Coord::from_mm(20.25, 0.0), LayerId::FRONT),
            Endpoint::FreePoint { .. }
        ));

        let restored = Board::from_json_str(&board.to_json_string().unwrap()).unwrap();
        assert_eq!(restored.junction_reach(a), mm(0.1));
        assert_eq!(restored.junction_reach(b), mm(0.1));
    }

    #[test]
    fn test_rollback_restores_everything() {
        let (mut board, pad, gnd) = board_with_pad();
        let before = board.to_file();
        let mark = board.mark();

        let net = board.allocate_net();
        let j = board.insert_junction(Coord::from_mm(10.0, 5.0), net, LayerId::FRONT).unwrap();
        board.merge_nets(gnd, net).unwrap();
        board
            .insert_track(Terminal::Pad(pad), Terminal::Junction(j), gnd, LayerId::FRONT, mm(0.25))
            .unwrap();
        assert_eq!(board.tracks().count(), 1);

        board.rollback_to(mark);
        let after = board.to_file();
        assert_eq!(after.junctions.len(), before.junctions.len());
        assert_eq!(after.tracks.len(), 0);
        assert_eq!(after.nets, before.nets);
        assert_eq!(board.allocate_net(), net, "net ids are reused after rollback");
    }

    #[test]
    fn test_merge_retags_and_rollback_splits() {
        let (mut board, pad, gnd) = board_with_pad();
        let sig = board.add_net("SIG");
        let j = board.insert_junction(Coord::from_mm(1.0, 1.0), sig, LayerId::FRONT).unwrap();
        let mark = board.mark();
        board.merge_nets(gnd, sig).unwrap();
        assert_eq!(board.junction(j).map(|j| j.net), Some(gnd));
        assert!(board.net(sig).is_none());
        board.rollback_to(mark);
        assert_eq!(board.junction(j).map(|j| j.net), Some(sig));
        assert_eq!(board.pad(pad).and_then(|p| p.net), Some(gnd));
        assert!(board.net(sig).is_some());
    }

    #[test]
    fn test_copper_on_layer_includes_keepouts_and_courtyards() {
        let (mut board, _, _) = board_with_pad();
        board.add_keepout(
            vec![LayerId::FRONT],
            Polygon::rect(Coord::from_mm(20.0, 20.0), mm(2.0), mm(2.0)),
        );
        let u2 = board.add_component("U2", LayerId::FRONT);
        board.set_courtyard(u2, Polygon::rect(Coord::from_mm(30.0, 0.0), mm(4.0), mm(4.0)));
        let front = board.copper_on_layer(LayerId::FRONT);
        assert!(front.iter().any(|i| i.kind == CopperKind::Keepout));
        assert!(front.iter().any(|i| i.kind == CopperKind::Courtyard));
        assert!(front.iter().any(|i| i.kind == CopperKind::Pad));
        assert!(board.copper_on_layer(LayerId::BACK).is_empty());
    }

    #[test]
    fn test_json_roundtrip_keeps_next_net() {
        let (board, _, gnd) = board_with_pad();
        let json = board.to_json_string().unwrap();
        let mut restored = Board::from_json_str(&json).unwrap();
        assert_eq!(restored.net(gnd).map(|n| n.name.as_str()), Some("GND"));
        assert!(restored.allocate_net() > gnd);
    }
}
