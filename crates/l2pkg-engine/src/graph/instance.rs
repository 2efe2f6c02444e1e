//! Materialized runtime objects

use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::archive::{ArchiveHandle, Entry};
use crate::bytecode::Token;
use crate::props::PropertyValue;

use super::schema::TypeTag;

/// Lifecycle of an [`ObjectInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Created, registered in the identity cache, fields not decoded
    Empty,
    /// Structured fields decoded; class defaults still waiting on the
    /// superclass
    Structured,
    Loaded,
    Failed,
}

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    U8(u8),
    U16(u16),
    U32(u32),
    Name(String),
    /// Signed reference into the owning archive's tables
    ObjectRef(i32),
    Names(Vec<String>),
    Guid([u8; 16]),
    Tokens(Vec<Token>),
    Bag(Vec<PropertyValue>),
}

/// A typed runtime object bound to exactly one archive entry.
///
/// Created empty on first reference, then populated by the engine's
/// loader worker. Readers that need decoded fields call
/// [`ObjectInstance::wait_loaded`] first.
pub struct ObjectInstance {
    entry: Entry,
    archive: ArchiveHandle,
    tag: TypeTag,
    /// True when the entry had no backing export record
    placeholder: bool,
    state: Mutex<LoadState>,
    loaded: Condvar,
    fields: RwLock<FxHashMap<&'static str, FieldData>>,
    /// Undeclared bytes left after the structured decode; a schema gap,
    /// retained for inspection
    trailing: RwLock<Vec<u8>>,
}

impl ObjectInstance {
    pub(crate) fn new(
        entry: Entry,
        archive: ArchiveHandle,
        tag: TypeTag,
        placeholder: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            entry,
            archive,
            tag,
            placeholder,
            state: Mutex::new(LoadState::Empty),
            loaded: Condvar::new(),
            fields: RwLock::new(FxHashMap::default()),
            trailing: RwLock::new(Vec::new()),
        })
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn archive(&self) -> &ArchiveHandle {
        &self.archive
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Whether this object was synthesized for an unresolvable entry.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn object_name(&self) -> &str {
        &self.entry.object_name
    }

    pub fn full_name(&self) -> &str {
        &self.entry.full_name
    }

    pub fn class_name(&self) -> &str {
        &self.entry.class_name
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock()
    }

    /// Block until the instance is fully loaded or has failed.
    pub fn wait_loaded(&self) -> LoadState {
        let mut state = self.state.lock();
        while !matches!(*state, LoadState::Loaded | LoadState::Failed) {
            self.loaded.wait(&mut state);
        }
        *state
    }

    pub(crate) fn set_state(&self, new: LoadState) {
        let mut state = self.state.lock();
        *state = new;
        if matches!(new, LoadState::Loaded | LoadState::Failed) {
            self.loaded.notify_all();
        }
    }

    pub(crate) fn set_field(&self, name: &'static str, data: FieldData) {
        self.fields.write().insert(name, data);
    }

    pub(crate) fn set_trailing(&self, bytes: Vec<u8>) {
        *self.trailing.write() = bytes;
    }

    /// Decoded field by declared name.
    pub fn field(&self, name: &str) -> Option<FieldData> {
        self.fields.read().get(name).cloned()
    }

    pub fn field_u16(&self, name: &str) -> Option<u16> {
        match self.field(name)? {
            FieldData::U16(v) => Some(v),
            _ => None,
        }
    }

    pub fn field_u32(&self, name: &str) -> Option<u32> {
        match self.field(name)? {
            FieldData::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn field_ref(&self, name: &str) -> Option<i32> {
        match self.field(name)? {
            FieldData::ObjectRef(v) => Some(v),
            _ => None,
        }
    }

    pub fn field_name(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            FieldData::Name(v) => Some(v),
            _ => None,
        }
    }

    /// Decoded bytecode tokens of the `Script` field.
    pub fn tokens(&self) -> Option<Vec<Token>> {
        match self.field("Script")? {
            FieldData::Tokens(v) => Some(v),
            _ => None,
        }
    }

    /// Merged property values: the instance bag for plain objects, the
    /// defaults bag for classes.
    pub fn properties(&self) -> Option<Vec<PropertyValue>> {
        let key = if self.tag.is_class() {
            "Defaults"
        } else {
            "Properties"
        };
        match self.field(key)? {
            FieldData::Bag(v) => Some(v),
            _ => None,
        }
    }

    /// Bytes left undeclared after the structured decode.
    pub fn trailing_bytes(&self) -> Vec<u8> {
        self.trailing.read().clone()
    }
}

impl std::fmt::Debug for ObjectInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectInstance")
            .field("full_name", &self.entry.full_name)
            .field("class_name", &self.entry.class_name)
            .field("tag", &self.tag)
            .field("state", &self.state())
            .finish()
    }
}
