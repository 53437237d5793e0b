//! Simple routing example: replay a short gesture over a board and print
//! what was committed.

use copperroute::prelude::*;
use copperroute::CopperRouteError;
use std::path::Path;

fn main() -> Result<(), CopperRouteError> {
    let mut board = match std::env::args().nth(1) {
        Some(path) => copperroute::load_board(Path::new(&path))?.board,
        None => Board::new("scratch"),
    };
    let mut router = Router::new(RouterConfig::default());

    let events = [
        RouterEvent::Begin { at: Coord::from_mm(0.0, 0.0) },
        RouterEvent::Key(RouterKey::ToggleBend),
        RouterEvent::Motion { at: Coord::from_mm(10.0, 5.0) },
        RouterEvent::Click { at: Coord::from_mm(10.0, 5.0), button: Button::Primary },
        RouterEvent::Click { at: Coord::from_mm(20.0, 5.0), button: Button::Primary },
    ];

    for event in events {
        let effects = router.update(&mut board, event);
        match &effects.outcome {
            Outcome::Committed(handles) => {
                println!(
                    "Committed {} track(s) on {}, continuing from {}",
                    handles.tracks.len(),
                    handles.net,
                    handles.far_end.position()
                );
            }
            Outcome::Finished(legs) => println!("Finished after {} leg(s)", legs.len()),
            Outcome::Refused => {
                if let Some(ref notice) = effects.notice {
                    println!("Refused: {}", notice);
                }
            }
            _ => {}
        }
    }

    println!();
    println!("Board now has {} tracks and {} junctions", board.tracks().count(), board.junctions().count());
    let issues = board.check();
    if !issues.is_empty() {
        for issue in &issues {
            println!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}
