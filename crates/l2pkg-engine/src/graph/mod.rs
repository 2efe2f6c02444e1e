//! Reflective object graph
//!
//! Maps archive records onto typed runtime objects. [`schema`] holds the
//! closed per-type field layouts, [`instance`] the materialized object
//! representation, [`engine`] the identity cache, loader worker, and
//! derived class-hierarchy queries.

pub mod engine;
pub mod instance;
pub mod schema;

pub use engine::GraphEngine;
pub use instance::{FieldData, LoadState, ObjectInstance};
pub use schema::{field_layout, FieldDescriptor, FieldRule, SchemaRegistry, TypeTag};
