//! KiCad PCB import
//!
//! Reads a `.kicad_pcb` file (KiCad 5 to 9 s-expression format) into a
//! [`Board`]. Only what the router needs is kept: nets, footprint pads and
//! courtyards, copper segments, vias, keepout areas and filled zones.
//!
//! Format notes:
//! - Lengths are millimetres, converted to nanometres here
//! - Pad `(at)` is relative to the footprint; its angle is absolute
//! - Segments carry no connectivity; shared endpoints become junctions

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::board::{
    Board, ComponentId, DocumentModel, Net, NetId, Pad, PadId, Terminal, TrackId, ViaId,
};
use crate::config::ViaRule;
use crate::geometry::{convex_hull, mm, Coord, Polygon, Shape};
use crate::layers::{LayerId, LayerInfo, LayerTable};
use crate::parser::sexp::{ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum PcbImportError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
}

/// Result of an import: the board, its copper stackup, and how many
/// elements were dropped.
#[derive(Debug, Clone)]
pub struct ImportedBoard {
    pub board: Board,
    pub layers: LayerTable,
    pub skipped: usize,
}

/// Map a KiCad copper layer name to its ordinal.
pub fn copper_layer_id(name: &str) -> Option<LayerId> {
    match name {
        "F.Cu" => Some(LayerId::FRONT),
        "B.Cu" => Some(LayerId::BACK),
        other => other
            .strip_prefix("In")
            .and_then(|rest| rest.strip_suffix(".Cu"))
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=30).contains(n))
            .map(LayerId),
    }
}

pub struct KicadPcbImporter;

impl KicadPcbImporter {
    pub fn import_file(path: &Path) -> Result<ImportedBoard, PcbImportError> {
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("board")
            .to_string();
        Self::import_str(&content, &name)
    }

    pub fn import_str(content: &str, name: &str) -> Result<ImportedBoard, PcbImportError> {
        let root = SExpParser::new(content).parse()?;
        match root.tag() {
            Some("kicad_pcb") => {}
            Some(other) => {
                return Err(PcbImportError::InvalidFormat(format!(
                    "Expected kicad_pcb, found {}",
                    other
                )))
            }
            None => {
                return Err(PcbImportError::InvalidFormat(
                    "Expected kicad_pcb root".to_string(),
                ))
            }
        }

        let mut import = Import::new(name, Self::stackup(&root));
        // Nets first so every later element can resolve its net number.
        for item in root.children("net") {
            import.net(item);
        }
        for item in root.args() {
            match item.tag() {
                Some("footprint") | Some("module") => import.footprint(item),
                Some("via") => import.via(item),
                Some("zone") => import.zone(item),
                _ => {}
            }
        }
        for item in root.children("segment") {
            import.segment(item);
        }
        Ok(import.finish())
    }

    fn stackup(root: &SExp) -> LayerTable {
        let mut copper: Vec<LayerInfo> = root
            .child("layers")
            .map(|layers| {
                layers
                    .args()
                    .iter()
                    .filter_map(|l| l.as_list()?.get(1)?.as_atom())
                    .filter_map(|name| {
                        copper_layer_id(name).map(|id| LayerInfo { id, name: name.to_string() })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if copper.is_empty() {
            return LayerTable::default();
        }
        // Stackup order: front, inner by number, back.
        copper.sort_by_key(|l| l.id);
        copper.dedup_by_key(|l| l.id);
        LayerTable { copper }
    }
}

fn uuid_of(sexp: &SExp) -> Option<Uuid> {
    sexp.value("uuid")
        .or_else(|| sexp.value("tstamp"))
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn point(sexp: &SExp, key: &str) -> Option<Coord> {
    let node = sexp.child(key)?;
    Some(Coord::from_mm(node.number(0)?, node.number(1)?))
}

/// `(at x y [angle])`
fn placement(sexp: &SExp) -> (Coord, f64) {
    let at = point(sexp, "at").unwrap_or_default();
    let angle = sexp.child("at").and_then(|a| a.number(2)).unwrap_or(0.0);
    (at, angle)
}

/// Footprint-local to board coordinates (KiCad angles turn clockwise on a
/// y-down canvas).
fn to_board(origin: Coord, angle: f64, local: Coord) -> Coord {
    origin + local.rotated(-angle)
}

struct Import {
    board: Board,
    layers: LayerTable,
    skipped: usize,
    /// Where a segment end at this (net, layer, position) attaches.
    terminals: HashMap<(NetId, LayerId, Coord), Terminal>,
    rule: ViaRule,
}

impl Import {
    fn new(name: &str, layers: LayerTable) -> Self {
        Self {
            board: Board::new(name),
            layers,
            skipped: 0,
            terminals: HashMap::new(),
            rule: ViaRule::default(),
        }
    }

    fn skip(&mut self, what: &str, why: &str) {
        tracing::warn!("Skipping {}: {}", what, why);
        self.skipped += 1;
    }

    fn net_of(&self, sexp: &SExp) -> Option<NetId> {
        let n = sexp.child("net")?.number(0)? as u32;
        let id = NetId(n);
        (n > 0 && self.board.net(id).is_some()).then_some(id)
    }

    fn net(&mut self, sexp: &SExp) {
        let Some(n) = sexp.number(0) else {
            self.skip("net", "missing number");
            return;
        };
        let name = sexp.atom(1).unwrap_or_default();
        if n as u32 == 0 {
            return;
        }
        self.board.add_net_record(Net::new(NetId(n as u32), name));
    }

    fn footprint(&mut self, fp: &SExp) {
        let (origin, angle) = placement(fp);
        let layer = fp
            .value("layer")
            .and_then(copper_layer_id)
            .unwrap_or(LayerId::FRONT);
        let reference = fp
            .children("property")
            .find(|p| p.atom(0) == Some("Reference"))
            .and_then(|p| p.atom(1))
            .or_else(|| {
                fp.children("fp_text")
                    .find(|t| t.atom(0) == Some("reference"))
                    .and_then(|t| t.atom(1))
            })
            .unwrap_or("?")
            .to_string();
        let component = self.board.add_component(reference.clone(), layer);

        for pad in fp.children("pad") {
            self.pad(pad, component, origin, angle, &reference);
        }

        let courtyard_layer = if layer == LayerId::BACK { "B.CrtYd" } else { "F.CrtYd" };
        let mut outline: Vec<Coord> = Vec::new();
        for shape in fp.args() {
            if shape.value("layer") != Some(courtyard_layer) {
                continue;
            }
            match shape.tag() {
                Some("fp_rect") | Some("fp_line") => {
                    if let (Some(a), Some(b)) = (point(shape, "start"), point(shape, "end")) {
                        outline.extend([a, Coord::new(a.x, b.y), b, Coord::new(b.x, a.y)]);
                    }
                }
                Some("fp_poly") => {
                    if let Some(pts) = shape.child("pts") {
                        outline.extend(pts.children("xy").filter_map(|xy| {
                            Some(Coord::from_mm(xy.number(0)?, xy.number(1)?))
                        }));
                    }
                }
                Some("fp_circle") => {
                    if let (Some(c), Some(e)) = (point(shape, "center"), point(shape, "end")) {
                        let r = c.distance(e).round() as i64;
                        outline.extend([
                            Coord::new(c.x - r, c.y - r),
                            Coord::new(c.x + r, c.y - r),
                            Coord::new(c.x + r, c.y + r),
                            Coord::new(c.x - r, c.y + r),
                        ]);
                    }
                }
                _ => {}
            }
        }
        if !outline.is_empty() {
            let board_points: Vec<Coord> =
                outline.into_iter().map(|p| to_board(origin, angle, p)).collect();
            let hull = convex_hull(&board_points);
            if hull.len() >= 3 {
                self.board.set_courtyard(component, hull);
            }
        }
    }

    fn pad(&mut self, pad: &SExp, component: ComponentId, origin: Coord, fp_angle: f64, reference: &str) {
        let number = pad.atom(0).unwrap_or_default().to_string();
        let kind = pad.atom(1).unwrap_or("smd");
        if kind == "np_thru_hole" {
            return;
        }
        let (local, pad_angle) = placement(pad);
        let center = to_board(origin, fp_angle, local);
        let Some(size) = pad.child("size") else {
            self.skip(&format!("pad {}.{}", reference, number), "missing size");
            return;
        };
        let width = mm(size.number(0).unwrap_or(0.0));
        let height = mm(size.number(1).or_else(|| size.number(0)).unwrap_or(0.0));
        if width <= 0 || height <= 0 {
            self.skip(&format!("pad {}.{}", reference, number), "zero size");
            return;
        }
        let rotation = -pad_angle;
        let land = match pad.atom(2).unwrap_or("rect") {
            "circle" => Shape::Circle { center, diameter: width.max(height) },
            "oval" => Shape::Obround { center, width, height, rotation },
            _ => Shape::Rect { center, width, height, rotation },
        };

        let through = kind == "thru_hole";
        let layers: Vec<LayerId> = if through {
            self.layers.ids().collect()
        } else {
            let mut ids: Vec<LayerId> = pad
                .child("layers")
                .map(|l| {
                    l.args()
                        .iter()
                        .filter_map(SExp::as_atom)
                        .flat_map(|spec| self.layers.resolve_spec(spec))
                        .collect()
                })
                .unwrap_or_default();
            ids.sort();
            ids.dedup();
            ids
        };
        if layers.is_empty() {
            return;
        }

        let net = self.net_of(pad);
        let id = PadId(uuid_of(pad).unwrap_or_else(Uuid::new_v4));
        if let Some(net) = net {
            for &layer in &layers {
                self.terminals.insert((net, layer, center), Terminal::Pad(id));
            }
        }
        self.board.add_pad(Pad {
            id,
            component,
            number,
            land,
            layers,
            net,
            through,
        });
    }

    fn via(&mut self, via: &SExp) {
        let Some(net) = self.net_of(via) else {
            self.skip("via", "no net");
            return;
        };
        let (at, _) = placement(via);
        let span = via
            .child("layers")
            .map(|l| {
                let a = l.atom(0).and_then(copper_layer_id).unwrap_or(LayerId::FRONT);
                let b = l.atom(1).and_then(copper_layer_id).unwrap_or(LayerId::BACK);
                (a, b)
            })
            .unwrap_or((LayerId::FRONT, LayerId::BACK));
        let rule = ViaRule {
            diameter: via.value_f64("size").map(mm).unwrap_or(self.rule.diameter),
            drill: via.value_f64("drill").map(mm).unwrap_or(self.rule.drill),
        };
        match self.board.insert_via(at, net, span, &rule) {
            Ok(id) => {
                let id = self.rekey_via(id, via);
                for layer in self.layers.ids().filter(|l| *l >= span.0.min(span.1) && *l <= span.0.max(span.1)) {
                    self.terminals.insert((net, layer, at), Terminal::Via(id));
                }
            }
            Err(e) => self.skip("via", &e.to_string()),
        }
    }

    /// Vias keep their file uuid when it parses.
    fn rekey_via(&mut self, id: ViaId, sexp: &SExp) -> ViaId {
        match uuid_of(sexp) {
            Some(uuid) => self.board.rekey_via(id, ViaId(uuid)),
            None => id,
        }
    }

    fn zone(&mut self, zone: &SExp) {
        let mut layers: Vec<LayerId> = zone
            .value("layer")
            .map(|l| self.layers.resolve_spec(l))
            .unwrap_or_default();
        if let Some(list) = zone.child("layers") {
            for spec in list.args().iter().filter_map(SExp::as_atom) {
                layers.extend(self.layers.resolve_spec(spec));
            }
        }

        let keepout = zone
            .child("keepout")
            .map(|k| k.value("tracks") == Some("not_allowed"))
            .unwrap_or(false);
        if keepout {
            let Some(outline) = zone.child("polygon").and_then(|p| p.child("pts")).map(pts) else {
                self.skip("keepout", "no outline");
                return;
            };
            if outline.len() < 3 || layers.is_empty() {
                self.skip("keepout", "degenerate outline or no copper layer");
                return;
            }
            self.board.add_keepout(layers, outline);
            return;
        }

        let net = self.net_of(zone);
        for fill in zone.children("filled_polygon") {
            let layer = fill.value("layer").and_then(copper_layer_id);
            let outline = fill.child("pts").map(pts);
            match (layer, outline) {
                (Some(layer), Some(outline)) if outline.len() >= 3 => {
                    self.board.add_pour(net, layer, outline);
                }
                _ => self.skip("zone fill", "no layer or outline"),
            }
        }
    }

    fn segment(&mut self, seg: &SExp) {
        let (Some(start), Some(end)) = (point(seg, "start"), point(seg, "end")) else {
            self.skip("segment", "missing start or end");
            return;
        };
        let Some(layer) = seg.value("layer").and_then(copper_layer_id) else {
            self.skip("segment", "not on a copper layer");
            return;
        };
        let Some(net) = self.net_of(seg) else {
            self.skip("segment", "no net");
            return;
        };
        if start == end {
            self.skip("segment", "zero length");
            return;
        }
        let width = seg.value_f64("width").map(mm).unwrap_or(mm(0.25));
        let result = self
            .terminal(net, layer, start)
            .and_then(|a| Ok((a, self.terminal(net, layer, end)?)))
            .and_then(|(a, b)| self.board.insert_track(a, b, net, layer, width));
        match result {
            Ok(id) => {
                if let Some(uuid) = uuid_of(seg) {
                    self.board.rekey_track(id, TrackId(uuid));
                }
            }
            Err(e) => self.skip("segment", &e.to_string()),
        }
    }

    fn terminal(&mut self, net: NetId, layer: LayerId, at: Coord) -> Result<Terminal, crate::board::ModelError> {
        if let Some(&t) = self.terminals.get(&(net, layer, at)) {
            return Ok(t);
        }
        let id = self.board.insert_junction(at, net, layer)?;
        let t = Terminal::Junction(id);
        self.terminals.insert((net, layer, at), t);
        Ok(t)
    }

    fn finish(mut self) -> ImportedBoard {
        let mark = crate::board::JournalMark(0);
        self.board.settle(mark);
        tracing::info!(
            "Imported {}: {} nets, {} pads, {} tracks, {} vias ({} skipped)",
            self.board.name,
            self.board.nets().count(),
            self.board.pads().count(),
            self.board.tracks().count(),
            self.board.vias().count(),
            self.skipped
        );
        ImportedBoard {
            board: self.board,
            layers: self.layers,
            skipped: self.skipped,
        }
    }
}

fn pts(node: &SExp) -> Polygon {
    Polygon::new(
        node.children("xy")
            .filter_map(|xy| Some(Coord::from_mm(xy.number(0)?, xy.number(1)?)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(kicad_pcb (version 20221018) (generator pcbnew)
      (layers (0 "F.Cu" signal) (31 "B.Cu" signal) (37 "F.SilkS" user))
      (net 0 "")
      (net 1 "GND")
      (net 2 "SDA")
      (footprint "R_0603" (layer "F.Cu") (at 10 10 90)
        (property "Reference" "R1")
        (pad "1" smd rect (at -0.8 0 90) (size 0.8 0.9) (layers "F.Cu" "F.Paste" "F.Mask") (net 1 "GND"))
        (pad "2" smd rect (at 0.8 0 90) (size 0.8 0.9) (layers "F.Cu" "F.Paste" "F.Mask"))
        (fp_rect (start -1.5 -0.7) (end 1.5 0.7) (layer "F.CrtYd")))
      (segment (start 10 9.2) (end 15 9.2) (width 0.25) (layer "F.Cu") (net 1))
      (segment (start 15 9.2) (end 15 20) (width 0.25) (layer "F.Cu") (net 1))
      (segment (start 1 1) (end 1 1) (width 0.25) (layer "F.Cu") (net 2))
      (via (at 15 20) (size 0.6) (drill 0.3) (layers "F.Cu" "B.Cu") (net 1))
      (zone (net 0) (net_name "") (layers "F&B.Cu")
        (keepout (tracks not_allowed) (vias not_allowed) (pads allowed) (copperpour not_allowed) (footprints allowed))
        (polygon (pts (xy 30 30) (xy 40 30) (xy 40 40) (xy 30 40)))))"#;

    #[test]
    fn test_import_sample() {
        let imported = KicadPcbImporter::import_str(SAMPLE, "sample").unwrap();
        let board = &imported.board;
        assert_eq!(imported.layers.copper.len(), 2);
        assert_eq!(board.nets().count(), 2);
        assert_eq!(board.pads().count(), 2);
        assert_eq!(board.vias().count(), 1);
        assert_eq!(board.keepouts().count(), 1);
        assert_eq!(board.tracks().count(), 2);
        assert_eq!(imported.skipped, 1, "zero-length segment is skipped");

        // Footprint rotated 90°: local (-0.8, 0) lands at (10, 10.8).
        let gnd_pad = board.pads().find(|p| p.net == Some(NetId(1))).unwrap();
        assert_eq!(gnd_pad.position(), Coord::from_mm(10.0, 10.8));
        let unconnected = board.pads().find(|p| p.net.is_none()).unwrap();
        assert_eq!(unconnected.position(), Coord::from_mm(10.0, 9.2));

        let r1 = board.component_by_reference("R1").unwrap();
        assert!(r1.courtyard.is_some());
        assert!(board.check().is_empty());
        assert!(board.revision() > 0);
    }

    #[test]
    fn test_segments_share_junctions_and_reach_via() {
        let imported = KicadPcbImporter::import_str(SAMPLE, "sample").unwrap();
        let board = &imported.board;
        assert_eq!(board.junctions().count(), 2);
        let via = board.vias().next().unwrap();
        assert_eq!(via.diameter, mm(0.6));
        assert!(board.tracks().any(|t| t.to == Terminal::Via(via.id)));
        let view = board.connectivity();
        let ends: Vec<Terminal> = board.tracks().flat_map(|t| [t.from, t.to]).collect();
        assert!(ends.iter().all(|&a| ends.iter().all(|&b| view.are_connected(a, b))));
    }

    #[test]
    fn test_layer_names() {
        assert_eq!(copper_layer_id("In4.Cu"), Some(LayerId(4)));
        assert_eq!(copper_layer_id("In31.Cu"), None);
        assert_eq!(copper_layer_id("F.SilkS"), None);
    }

    #[test]
    fn test_rejects_other_roots() {
        assert!(matches!(
            KicadPcbImporter::import_str("(kicad_sch (version 1))", "x"),
            Err(PcbImportError::InvalidFormat(_))
        ));
    }
}
