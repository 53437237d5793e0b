pub mod pcb;
pub mod sexp;

pub use pcb::{copper_layer_id, ImportedBoard, KicadPcbImporter, PcbImportError};
pub use sexp::{ParseError, SExp, SExpParser};
