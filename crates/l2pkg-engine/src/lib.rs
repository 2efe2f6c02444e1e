//! Object graph and script decompilation engine
//!
//! Reconstructs the object model of a game-asset container: archives
//! hold class metadata, instance property bags, and compiled script
//! bytecode; this crate materializes them into a typed object graph and
//! decompiles the bytecode into readable pseudo-source.
//!
//! Layering, leaves first:
//! - [`archive`] — the store contract an opened container must satisfy
//! - [`reader`] — record cursor: scalars, compact indices, strings
//! - [`locator`] — named-package resolution over search paths
//! - [`props`] — the tagged property-bag codec
//! - [`bytecode`] — the two-table token decoder
//! - [`graph`] — identity-cached, worker-serialized materialization
//! - [`decomp`] — token and raw-byte decompilation to text
//!
//! Decrypting raw container files is the `l2pkg-crypt` crate's job;
//! everything here works on clear bytes.

pub mod archive;
pub mod bytecode;
pub mod decomp;
pub mod error;
pub mod graph;
pub mod locator;
pub mod mem;
pub mod props;
pub mod reader;

pub use archive::{ArchiveHandle, ArchiveStore, Charset, Entry};
pub use decomp::{decompile_class, RawDecompiler};
pub use error::{DecodeError, EngineError, LocateError};
pub use graph::{GraphEngine, LoadState, ObjectInstance};
pub use locator::{LocatorConfig, PackageLocator};
