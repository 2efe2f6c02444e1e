//! Best-effort decompilation to pseudo-source
//!
//! Two paths over the same opcode semantics: [`render`] walks decoded
//! token sequences, [`raw`] is a self-contained recursive-descent reader
//! over unprocessed instruction bytes. [`class`] assembles whole class
//! declarations from a class entry's children. The output is a readable
//! approximation, not a stable machine format.

pub mod class;
pub mod raw;
pub mod render;

pub use class::decompile_class;
pub use raw::RawDecompiler;
pub use render::{render_body, render_token, RenderContext};
