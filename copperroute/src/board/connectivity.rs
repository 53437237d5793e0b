//! Electrical connectivity view
//!
//! Terminals (pads, junctions, vias) are nodes and tracks are edges. The
//! graph is rebuilt on demand from a [`Board`]; it is a read-only snapshot
//! used for invariant checks and "are these two connected" queries.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{Board, JunctionId, NetId, Terminal, TrackId};

/// Structural problem found by [`Connectivity::issues`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ConnectivityIssue {
    /// Track terminal carries a different net than the track.
    NetMismatch {
        track: TrackId,
        terminal: Terminal,
        track_net: NetId,
        terminal_net: Option<NetId>,
    },
    /// Track references a terminal that does not exist.
    DanglingTerminal { track: TrackId, terminal: Terminal },
    /// Junction with no track attached.
    OrphanJunction { junction: JunctionId },
}

impl fmt::Display for ConnectivityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityIssue::NetMismatch { track, terminal, track_net, terminal_net } => {
                let found = terminal_net.map_or_else(|| "no net".to_string(), |n| n.to_string());
                write!(f, "track {track} is on {track_net} but {terminal:?} is on {found}")
            }
            ConnectivityIssue::DanglingTerminal { track, terminal } => {
                write!(f, "track {track} references missing {terminal:?}")
            }
            ConnectivityIssue::OrphanJunction { junction } => {
                write!(f, "junction {junction} has no tracks")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    graph: UnGraph<Terminal, TrackId>,
    indices: HashMap<Terminal, NodeIndex>,
}

impl Connectivity {
    pub fn build(board: &Board) -> Self {
        let mut view = Self::default();
        for pad in board.pads() {
            view.node(Terminal::Pad(pad.id));
        }
        for junction in board.junctions() {
            view.node(Terminal::Junction(junction.id));
        }
        for via in board.vias() {
            view.node(Terminal::Via(via.id));
        }
        for track in board.tracks() {
            let (Some(&a), Some(&b)) = (view.indices.get(&track.from), view.indices.get(&track.to))
            else {
                continue;
            };
            view.graph.add_edge(a, b, track.id);
        }
        view
    }

    fn node(&mut self, terminal: Terminal) -> NodeIndex {
        if let Some(&idx) = self.indices.get(&terminal) {
            return idx;
        }
        let idx = self.graph.add_node(terminal);
        self.indices.insert(terminal, idx);
        idx
    }

    pub fn terminal_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn track_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when a chain of tracks joins `a` and `b`.
    pub fn are_connected(&self, a: Terminal, b: Terminal) -> bool {
        match (self.indices.get(&a), self.indices.get(&b)) {
            (Some(&ia), Some(&ib)) => has_path_connecting(&self.graph, ia, ib, None),
            _ => false,
        }
    }

    /// Groups of mutually connected terminals carrying `net`.
    pub fn islands(&self, board: &Board, net: NetId) -> Vec<Vec<Terminal>> {
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut islands = Vec::new();
        for idx in self.graph.node_indices() {
            if seen.contains(&idx) || board.terminal_net(self.graph[idx]) != Some(Some(net)) {
                continue;
            }
            let mut island = Vec::new();
            let mut bfs = Bfs::new(&self.graph, idx);
            while let Some(n) = bfs.next(&self.graph) {
                if seen.insert(n) {
                    island.push(self.graph[n]);
                }
            }
            island.sort();
            islands.push(island);
        }
        islands
    }

    pub fn issues(&self, board: &Board) -> Vec<ConnectivityIssue> {
        let mut issues = Vec::new();
        for track in board.tracks() {
            for terminal in [track.from, track.to] {
                match board.terminal_net(terminal) {
                    None => issues.push(ConnectivityIssue::DanglingTerminal {
                        track: track.id,
                        terminal,
                    }),
                    Some(found) if found != Some(track.net) => {
                        issues.push(ConnectivityIssue::NetMismatch {
                            track: track.id,
                            terminal,
                            track_net: track.net,
                            terminal_net: found,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        for junction in board.junctions() {
            let attached = self
                .indices
                .get(&Terminal::Junction(junction.id))
                .map_or(0, |&idx| self.graph.neighbors(idx).count());
            if attached == 0 {
                issues.push(ConnectivityIssue::OrphanJunction { junction: junction.id });
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::DocumentModel;
    use crate::geometry::{mm, Coord};
    use crate::layers::LayerId;

    #[test]
    fn test_chain_is_connected() {
        let mut board = Board::new("chain");
        let net = board.add_net("SIG");
        let a = board.insert_junction(Coord::from_mm(0.0, 0.0), net, LayerId::FRONT).unwrap();
        let b = board.insert_junction(Coord::from_mm(5.0, 0.0), net, LayerId::FRONT).unwrap();
        let c = board.insert_junction(Coord::from_mm(5.0, 5.0), net, LayerId::FRONT).unwrap();
        let lone = board.insert_junction(Coord::from_mm(9.0, 9.0), net, LayerId::FRONT).unwrap();
        let (ja, jb, jc) = (Terminal::Junction(a), Terminal::Junction(b), Terminal::Junction(c));
        board.insert_track(ja, jb, net, LayerId::FRONT, mm(0.2)).unwrap();
        board.insert_track(jb, jc, net, LayerId::FRONT, mm(0.2)).unwrap();

        let view = board.connectivity();
        assert_eq!(view.track_count(), 2);
        assert!(view.are_connected(ja, jc));
        assert!(!view.are_connected(ja, Terminal::Junction(lone)));
        assert_eq!(view.islands(&board, net).len(), 2);

        let issues = view.issues(&board);
        assert_eq!(issues, vec![ConnectivityIssue::OrphanJunction { junction: lone }]);
    }

    #[test]
    fn test_clean_board_has_no_issues() {
        let board = Board::new("empty");
        assert!(board.check().is_empty());
    }
}
