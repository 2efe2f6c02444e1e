//! Engine error taxonomy
//!
//! Three concerns, three enums: record/bytecode decoding (`DecodeError`),
//! package location (`LocateError`), and object materialization
//! (`EngineError`). Decode problems are fatal for the one object being
//! materialized, never for the whole archive; lookup misses stay
//! `Option`-shaped until a must-exist query escalates them.

use thiserror::Error;

/// Errors raised while decoding record bytes, property bags, or bytecode.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Opcode byte has no entry in the active dispatch table
    #[error("unknown opcode {opcode:#04x} in the {table} table at offset {offset}")]
    UnknownOpcode {
        opcode: u8,
        table: &'static str,
        offset: usize,
    },

    /// Native call index below the first-native threshold
    #[error("native call index {0:#x} is below the first-native threshold")]
    BadNativeIndex(u16),

    /// Record ended mid-field
    #[error("unexpected end of record at offset {0}")]
    UnexpectedEnd(usize),

    /// Compact integer ran past its maximum width
    #[error("malformed compact index at offset {0}")]
    BadCompactIndex(usize),

    /// Name table reference out of range
    #[error("name table index {0} is out of range")]
    BadNameIndex(i32),

    /// Object reference resolved to nothing
    #[error("unresolvable object reference {0}")]
    BadObjectReference(i32),

    /// Property info byte carried an unknown scalar kind tag
    #[error("unknown property kind tag {tag:#x} for property {name:?}")]
    BadKindTag { tag: u8, name: String },

    /// String bytes were not valid for the archive's character encoding
    #[error("invalid string data: {0}")]
    BadString(String),

    /// The archive store failed to hand out record bytes
    #[error("archive record unavailable: {0}")]
    Record(String),
}

/// Errors raised while resolving and opening named packages.
#[derive(Debug, Error)]
pub enum LocateError {
    /// No configured search path yielded the package
    #[error("package {0:?} not found on any search path")]
    PackageNotFound(String),

    /// A search pattern failed to parse
    #[error("invalid search pattern {pattern:?}: {message}")]
    BadPattern { pattern: String, message: String },

    /// Locator configuration failed to parse
    #[error("invalid locator config: {0}")]
    Config(String),

    /// Transport failure while opening one file
    #[error(transparent)]
    Crypt(#[from] l2pkg_crypt::CryptError),

    /// Underlying filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The injected archive opener rejected the file
    #[error("archive {path:?} failed to open: {message}")]
    Open { path: String, message: String },
}

/// Errors raised by the object graph engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Field decode failed for one object; the archive itself stays usable
    #[error("object {name} ({class}) failed to decode: {source}")]
    ObjectDecode {
        name: String,
        class: String,
        #[source]
        source: DecodeError,
    },

    /// A must-exist lookup came back empty
    #[error("no export named {0:?} matches the requested class")]
    NotFound(String),

    /// Lookup infrastructure failure
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Bare decode failure outside any object context
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The loader worker has shut down
    #[error("loader worker is no longer running")]
    LoaderGone,
}
