//! Fixture-driven tests: KiCad import, replay scripts, obstacle summaries.

use std::path::PathBuf;

use copperroute::board::{CopperKind, DocumentModel, Terminal};
use copperroute::geometry::Coord;
use copperroute::parser::KicadPcbImporter;
use copperroute::prelude::*;
use copperroute::replay::Script;
use copperroute::{load_board, load_config, CopperRouteCore};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

#[test]
fn test_import_kicad_fixture() {
    let imported = KicadPcbImporter::import_file(&fixture("sample.kicad_pcb")).unwrap();
    let board = &imported.board;
    assert_eq!(board.name, "sample");
    assert_eq!(imported.skipped, 0);
    let names: Vec<&str> = imported.layers.copper.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["F.Cu", "In1.Cu", "In2.Cu", "B.Cu"]);

    assert_eq!(board.nets().count(), 3);
    assert_eq!(board.pads().count(), 3);
    assert_eq!(board.tracks().count(), 2);
    assert_eq!(board.junctions().count(), 1);
    assert_eq!(board.vias().count(), 1);
    assert_eq!(board.keepouts().count(), 1);
    assert!(board.check().is_empty());

    let sda = board.net_by_name("SDA").unwrap().id;
    let pad = board.pads().find(|p| p.net == Some(sda)).unwrap();
    assert_eq!(pad.position(), Coord::from_mm(9.2, 10.0));
    let tp = board.pads().find(|p| p.through).unwrap();
    assert_eq!(tp.layers.len(), 4);

    let via = board.vias().next().unwrap();
    assert!(board.connectivity().are_connected(Terminal::Pad(pad.id), Terminal::Via(via.id)));
}

#[test]
fn test_route_on_imported_board() {
    let loaded = load_board(&fixture("sample.kicad_pcb")).unwrap();
    let config = load_config(None, loaded.layers.as_ref()).unwrap();
    let mut board = loaded.board;
    let mut router = Router::new(config);

    // Through-hole test point: any copper layer may continue.
    router.update(&mut board, RouterEvent::Begin { at: Coord::from_mm(30.0, 10.0) });
    let effects = router.update(&mut board, RouterEvent::Key(RouterKey::SwitchLayer));
    assert_eq!(effects.layer, LayerId(1));
    let effects = router.update(
        &mut board,
        RouterEvent::Click { at: Coord::from_mm(35.0, 10.0), button: Button::Primary },
    );
    let Outcome::Committed(handles) = effects.outcome else {
        panic!("expected a commit, got {:?}", effects.notice);
    };
    let scl = board.net_by_name("SCL").unwrap().id;
    assert_eq!(handles.net, scl);
    assert_eq!(board.track(handles.tracks[0]).unwrap().layer, LayerId(1));
}

#[test]
fn test_keepout_blocks_route_from_via() {
    let loaded = load_board(&fixture("sample.kicad_pcb")).unwrap();
    let config = load_config(None, loaded.layers.as_ref()).unwrap();
    let mut board = loaded.board;
    let mut router = Router::new(config);

    router.update(&mut board, RouterEvent::Begin { at: Coord::from_mm(20.0, 15.0) });
    assert!(matches!(router.session().map(|s| &s.start), Some(Endpoint::Via { .. })));
    let effects = router.update(
        &mut board,
        RouterEvent::Click { at: Coord::from_mm(14.0, 5.0), button: Button::Primary },
    );
    assert_eq!(effects.outcome, Outcome::Refused);
    match effects.notice {
        Some(RouteError::GeometryRejected(Some(hit))) => assert_eq!(hit.kind, CopperKind::Keepout),
        other => panic!("expected a keepout collision, got {:?}", other),
    }
}

#[test]
fn test_obstacle_summary_for_net() {
    let loaded = load_board(&fixture("sample.kicad_pcb")).unwrap();
    let config = load_config(None, loaded.layers.as_ref()).unwrap();
    let summary = CopperRouteCore::obstacles(&loaded.board, &config, "F.Cu", Some("SDA")).unwrap();
    // Unconnected R1 pad, the SCL test point, the keepout and R1's courtyard.
    assert_eq!(summary.count, 4);
    assert_eq!(summary.by_kind.get("pad"), Some(&2));
    assert_eq!(summary.by_kind.get("keepout"), Some(&1));
    assert_eq!(summary.by_kind.get("courtyard"), Some(&1));
    assert!(summary.obstacles.iter().all(|o| o.net.as_deref() != Some("SDA")));

    assert!(CopperRouteCore::obstacles(&loaded.board, &config, "In9.Cu", None).is_err());
    assert!(CopperRouteCore::obstacles(&loaded.board, &config, "F.Cu", Some("NOPE")).is_err());
}

#[test]
fn test_replay_merge_then_blocked() {
    let board = load_board(&fixture("two_nets.json")).unwrap().board;
    assert!(board.check().is_empty());
    let script = Script::from_path(&fixture("merge_then_blocked.json")).unwrap();

    let (report, routed) = CopperRouteCore::replay(board, RouterConfig::default(), &script).unwrap();
    let summary = &report.summary;
    assert_eq!(report.steps.len(), 6);
    assert_eq!(summary.finished, 1);
    assert_eq!(summary.merges, 1);
    assert_eq!(summary.tracks, 1);
    assert_eq!(summary.refused, 1);
    assert_eq!(summary.canceled, 1);
    assert_eq!(report.steps[4].outcome, Outcome::Refused);
    assert!(report.steps[4].notice.is_some());

    assert_eq!(routed.tracks().count(), 2);
    assert!(routed.net_by_name("SIG_B").is_none());
    assert!(routed.net(NetId(1)).is_some());
    assert!(routed.check().is_empty());
}

#[test]
fn test_replay_free_legs_then_cancel() {
    let board = load_board(&fixture("two_nets.json")).unwrap().board;
    let before = board.to_json_string().unwrap();
    let script = Script::from_path(&fixture("free_legs.json")).unwrap();

    let (report, routed) = CopperRouteCore::replay(board, RouterConfig::default(), &script).unwrap();
    let summary = &report.summary;
    assert_eq!(summary.committed, 3);
    assert_eq!(summary.tracks, 3);
    assert_eq!(summary.junctions, 3);
    assert_eq!(summary.vias, 1);
    assert_eq!(summary.canceled, 1);
    assert!(matches!(&report.steps[3].outcome, Outcome::Committed(h) if h.via.is_some()));
    // Routing continued on the back layer from the new via.
    assert!(report.steps[4].candidate.is_empty());
    assert!(matches!(&report.steps[4].outcome, Outcome::Committed(h) if h.junctions.len() == 1));
    assert_eq!(routed.to_json_string().unwrap(), before);
}

#[test]
fn test_config_fixture() {
    let config = load_config(Some(&fixture("wide_tracks.json")), None).unwrap();
    assert_eq!(config.track_width, 400_000);
    assert_eq!(config.via.diameter, 800_000);
    assert!(load_config(Some(&fixture("bad_config.json")), None).is_err());
}
