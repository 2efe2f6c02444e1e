//! Identity cache, loader worker, and hierarchy queries
//!
//! All field decoding funnels through one dedicated worker thread so no
//! two objects are ever mid-construction concurrently; decoding one
//! object's fields can trigger materialization of referenced objects,
//! which the worker runs inline (reentrant). Callers on other threads
//! enqueue and block until the decode completes.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::archive::{ArchiveHandle, Entry};
use crate::bytecode::{DecodingContext, OpcodeRegistry, TokenDecoder};
use crate::error::{DecodeError, EngineError};
use crate::props::{
    read_merged_bag, resolve_default, InnerType, PropertyKind, PropertyTemplate, PropertyValue,
    TemplateSource,
};
use crate::reader::RecordReader;

use super::instance::{FieldData, LoadState, ObjectInstance};
use super::schema::{field_layout, FieldRule, SchemaRegistry, TypeTag};

/// Hierarchy walks and sibling chains are bounded; real archives never
/// come close to these depths.
const MAX_CHAIN_DEPTH: usize = 64;
const MAX_SIBLINGS: usize = 4096;

struct Job {
    instance: Arc<ObjectInstance>,
    done: Sender<Result<(), EngineError>>,
}

/// A class whose defaults bag is parked until its superclass loads.
struct PendingDefaults {
    instance: Arc<ObjectInstance>,
    bytes: Vec<u8>,
    offset: usize,
}

/// The reflective object graph engine.
///
/// Guarantees at most one [`ObjectInstance`] per (full name, class name)
/// identity for its own lifetime. Registries are passed in at
/// construction so separate engine instances never interfere.
pub struct GraphEngine {
    opcodes: OpcodeRegistry,
    schema: SchemaRegistry,
    cache: DashMap<String, Arc<ObjectInstance>>,
    loaded_classes: Mutex<FxHashSet<String>>,
    failed_classes: Mutex<FxHashSet<String>>,
    pending_defaults: Mutex<FxHashMap<String, Vec<PendingDefaults>>>,
    natives: Mutex<FxHashMap<u16, Arc<ObjectInstance>>>,
    superclasses: DashMap<String, Option<String>>,
    work_tx: Sender<Job>,
    worker_id: Mutex<Option<ThreadId>>,
}

impl GraphEngine {
    pub fn new(opcodes: OpcodeRegistry, schema: SchemaRegistry) -> Arc<Self> {
        let (work_tx, work_rx) = channel::unbounded();
        let engine = Arc::new(Self {
            opcodes,
            schema,
            cache: DashMap::new(),
            loaded_classes: Mutex::new(FxHashSet::default()),
            failed_classes: Mutex::new(FxHashSet::default()),
            pending_defaults: Mutex::new(FxHashMap::default()),
            natives: Mutex::new(FxHashMap::default()),
            superclasses: DashMap::new(),
            work_tx,
            worker_id: Mutex::new(None),
        });
        engine.start(work_rx);
        engine
    }

    /// Engine over the standard opcode and schema tables.
    pub fn with_standard_tables() -> Arc<Self> {
        Self::new(OpcodeRegistry::standard(), SchemaRegistry::standard())
    }

    pub fn opcodes(&self) -> &OpcodeRegistry {
        &self.opcodes
    }

    fn start(self: &Arc<Self>, work_rx: Receiver<Job>) {
        let weak = Arc::downgrade(self);
        thread::Builder::new()
            .name("l2pkg-loader".to_string())
            .spawn(move || loader_loop(weak, work_rx))
            .expect("Failed to spawn loader thread");
    }

    fn on_worker(&self) -> bool {
        *self.worker_id.lock() == Some(thread::current().id())
    }

    /// Materialize the object for `entry`, decoding it if this is the
    /// first reference. Blocks the caller until the object is loaded;
    /// when called from within a decode it returns immediately with the
    /// (possibly still-loading) instance to break reference cycles.
    pub fn materialize(
        self: &Arc<Self>,
        archive: &ArchiveHandle,
        entry: &Entry,
    ) -> Result<Arc<ObjectInstance>, EngineError> {
        let key = identity_key(&entry.full_name, &entry.class_name);
        if let Some(existing) = self.cache.get(&key) {
            let instance = existing.clone();
            drop(existing);
            return self.await_instance(instance);
        }

        let (concrete, placeholder) = self.resolve_concrete(archive, entry);
        let tag = self.tag_for(archive, &concrete);
        let instance = ObjectInstance::new(concrete, archive.clone(), tag, placeholder);

        // register before decoding so cyclic references resolve to this
        // same instance
        match self.cache.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                let raced = occupied.get().clone();
                drop(occupied);
                return self.await_instance(raced);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(instance.clone());
            }
        }

        if self.on_worker() {
            if let Err(e) = self.decode_instance(&instance) {
                self.cache.remove(&key);
                return Err(e);
            }
        } else {
            let (done_tx, done_rx) = channel::bounded(1);
            self.work_tx
                .send(Job {
                    instance: instance.clone(),
                    done: done_tx,
                })
                .map_err(|_| EngineError::LoaderGone)?;
            match done_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.cache.remove(&key);
                    return Err(e);
                }
                Err(_) => return Err(EngineError::LoaderGone),
            }
        }
        self.await_instance(instance)
    }

    /// Materialize by object name: full-name match first, bare-name
    /// fallback, both filtered by the class predicate.
    pub fn materialize_by_name(
        self: &Arc<Self>,
        archive: &ArchiveHandle,
        name: &str,
        class_predicate: impl Fn(&Entry) -> bool,
    ) -> Result<Arc<ObjectInstance>, EngineError> {
        let entry = find_export(archive, name, &class_predicate)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        self.materialize(archive, &entry)
    }

    fn await_instance(
        &self,
        instance: Arc<ObjectInstance>,
    ) -> Result<Arc<ObjectInstance>, EngineError> {
        if self.on_worker() {
            // reentrant call mid-decode; waiting here would deadlock
            return Ok(instance);
        }
        match instance.wait_loaded() {
            LoadState::Failed => Err(EngineError::ObjectDecode {
                name: instance.full_name().to_string(),
                class: instance.class_name().to_string(),
                source: DecodeError::Record("an earlier materialization failed".into()),
            }),
            _ => Ok(instance),
        }
    }

    /// An import with a matching local export decodes as that export;
    /// otherwise a placeholder class object stands in for it.
    fn resolve_concrete(&self, archive: &ArchiveHandle, entry: &Entry) -> (Entry, bool) {
        if entry.is_export {
            return (entry.clone(), false);
        }
        let local = archive
            .export_table()
            .iter()
            .find(|e| e.full_name.eq_ignore_ascii_case(&entry.full_name));
        match local {
            Some(export) => (export.clone(), false),
            None => {
                debug!(name = %entry.full_name, "no local export; synthesizing placeholder");
                (entry.clone(), true)
            }
        }
    }

    /// Resolve an entry's class name to a layout tag, walking up the
    /// superclass chain until a registered name is found.
    fn tag_for(&self, archive: &ArchiveHandle, entry: &Entry) -> TypeTag {
        let mut class_name = entry.class_name.clone();
        for _ in 0..MAX_CHAIN_DEPTH {
            if let Some(tag) = self.schema.tag_of(bare_of(&class_name)) {
                return tag;
            }
            match self.superclass_of(archive, &class_name) {
                Some(parent) => class_name = parent,
                None => break,
            }
        }
        TypeTag::Object
    }

    /// Full name of the superclass of `class_name`, if it has one.
    /// Results are cached.
    pub fn superclass_of(&self, archive: &ArchiveHandle, class_name: &str) -> Option<String> {
        let key = class_name.to_lowercase();
        if let Some(cached) = self.superclasses.get(&key) {
            return cached.clone();
        }
        let result = self
            .type_export_for(archive, class_name)
            .and_then(|e| e.super_ref)
            .filter(|&r| r != 0)
            .and_then(|r| archive.resolve_reference(r))
            .map(|e| e.full_name);
        self.superclasses.insert(key, result.clone());
        result
    }

    /// Reflexive subclass test walking the chain via repeated superclass
    /// lookups.
    pub fn is_subclass_of(&self, archive: &ArchiveHandle, parent: &str, child: &str) -> bool {
        let mut current = child.to_string();
        for _ in 0..MAX_CHAIN_DEPTH {
            if names_match(&current, parent) {
                return true;
            }
            match self.superclass_of(archive, &current) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// Root-to-leaf list of `class_name` and all its ancestors.
    pub fn ancestor_chain(&self, archive: &ArchiveHandle, class_name: &str) -> Vec<String> {
        let mut chain = vec![class_name.to_string()];
        let mut current = class_name.to_string();
        for _ in 0..MAX_CHAIN_DEPTH {
            match self.superclass_of(archive, &current) {
                Some(parent) => {
                    chain.push(parent.clone());
                    current = parent;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    /// Function object registered under a native call index, populated
    /// as function records are decoded.
    pub fn native_function_by_index(&self, index: u16) -> Option<Arc<ObjectInstance>> {
        self.natives.lock().get(&index).cloned()
    }

    /// Default value of a declared field, resolved through the owning
    /// class's ancestor chain; leaf-most default wins, zero otherwise.
    pub fn default_value(
        self: &Arc<Self>,
        archive: &ArchiveHandle,
        class_name: &str,
        template: &Arc<PropertyTemplate>,
    ) -> PropertyValue {
        let mut layers = Vec::new();
        for name in self.ancestor_chain(archive, class_name) {
            let Some(entry) = self.type_export_for(archive, &name) else {
                continue;
            };
            if let Ok(instance) = self.materialize(archive, &entry) {
                if let Some(bag) = instance.properties() {
                    layers.push(bag);
                }
            }
        }
        resolve_default(&layers, template)
    }

    /// Export defining the type named `type_name` (class, struct, or
    /// state record), by full then bare name.
    fn type_export_for(&self, archive: &ArchiveHandle, type_name: &str) -> Option<Entry> {
        let bare = bare_of(type_name);
        let mut bare_match = None;
        for entry in archive.export_table() {
            if !matches!(entry.bare_class_name(), "Class" | "Struct" | "State") {
                continue;
            }
            if entry.full_name.eq_ignore_ascii_case(type_name) {
                return Some(entry.clone());
            }
            if bare_match.is_none() && entry.object_name.eq_ignore_ascii_case(bare) {
                bare_match = Some(entry.clone());
            }
        }
        bare_match
    }

    fn decode_instance(self: &Arc<Self>, instance: &Arc<ObjectInstance>) -> Result<(), EngineError> {
        if instance.state() != LoadState::Empty {
            return Ok(());
        }
        if instance.is_placeholder() {
            instance.set_state(LoadState::Loaded);
            if instance.tag().is_class() {
                self.publish_class_loaded(instance);
            }
            return Ok(());
        }

        let archive = instance.archive().clone();
        let entry = instance.entry().clone();
        let fail = |source: DecodeError| {
            instance.set_state(LoadState::Failed);
            if instance.tag().is_class() {
                self.publish_class_failed(instance);
            }
            EngineError::ObjectDecode {
                name: entry.full_name.clone(),
                class: entry.class_name.clone(),
                source,
            }
        };
        let bytes = archive.raw_record_bytes(&entry).map_err(&fail)?;
        let finished = self.decode_fields(instance, &archive, &bytes).map_err(&fail)?;
        if finished {
            self.finish_instance(instance);
        }
        Ok(())
    }

    /// Decode the structured fields of one record. Returns `false` when
    /// a class's defaults were parked behind its superclass.
    fn decode_fields(
        self: &Arc<Self>,
        instance: &Arc<ObjectInstance>,
        archive: &ArchiveHandle,
        bytes: &[u8],
    ) -> Result<bool, DecodeError> {
        let mut reader = RecordReader::new(bytes, archive.character_encoding());
        for desc in field_layout(instance.tag()) {
            match desc.rule {
                FieldRule::U8 => {
                    instance.set_field(desc.name, FieldData::U8(reader.read_u8()?));
                }
                FieldRule::U16 => {
                    instance.set_field(desc.name, FieldData::U16(reader.read_u16()?));
                }
                FieldRule::U32 => {
                    instance.set_field(desc.name, FieldData::U32(reader.read_u32()?));
                }
                FieldRule::NameRef => {
                    let index = reader.read_compact()?;
                    let name = archive.name_by_index(index)?.to_string();
                    instance.set_field(desc.name, FieldData::Name(name));
                }
                FieldRule::ObjectRef => {
                    let reference = reader.read_compact()?;
                    instance.set_field(desc.name, FieldData::ObjectRef(reference));
                    if reference != 0 {
                        match archive.resolve_reference(reference) {
                            Some(target) => {
                                if let Err(e) = self.materialize(archive, &target) {
                                    warn!(
                                        owner = %instance.full_name(),
                                        field = desc.name,
                                        error = %e,
                                        "referenced object failed to materialize"
                                    );
                                }
                            }
                            None => {
                                warn!(
                                    owner = %instance.full_name(),
                                    field = desc.name,
                                    reference,
                                    "dangling object reference"
                                );
                            }
                        }
                    }
                }
                FieldRule::Guid => {
                    let mut guid = [0u8; 16];
                    guid.copy_from_slice(reader.take(16)?);
                    instance.set_field(desc.name, FieldData::Guid(guid));
                }
                FieldRule::NameArray => {
                    let count = reader.read_compact()?.max(0);
                    let mut names = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let index = reader.read_compact()?;
                        names.push(archive.name_by_index(index)?.to_string());
                    }
                    instance.set_field(desc.name, FieldData::Names(names));
                }
                FieldRule::Script => {
                    let size = instance.field_u32("ScriptSize").unwrap_or(0) as usize;
                    let decoder = TokenDecoder::new(&self.opcodes, archive.as_ref());
                    let mut ctx = DecodingContext::new();
                    let tokens = decoder.decode_block(&mut reader, &mut ctx, size)?;
                    instance.set_field(desc.name, FieldData::Tokens(tokens));
                }
                FieldRule::Bag => {
                    let owner = instance.class_name().to_string();
                    let source = EngineTemplates {
                        engine: self,
                        archive,
                    };
                    let values = read_merged_bag(&mut reader, archive.as_ref(), &owner, &source)?;
                    instance.set_field(desc.name, FieldData::Bag(values));
                }
                FieldRule::DeferredBag => {
                    // the superclass's declared properties must exist
                    // before the defaults bag can be matched to templates
                    if let Some(super_key) = self.superclass_identity(instance, archive) {
                        if self.failed_classes.lock().contains(&super_key) {
                            return Err(DecodeError::Record(format!(
                                "superclass {} failed to decode",
                                super_key
                            )));
                        }
                        if !self.loaded_classes.lock().contains(&super_key) {
                            self.pending_defaults
                                .lock()
                                .entry(super_key)
                                .or_default()
                                .push(PendingDefaults {
                                    instance: instance.clone(),
                                    bytes: bytes.to_vec(),
                                    offset: reader.pos(),
                                });
                            instance.set_state(LoadState::Structured);
                            return Ok(false);
                        }
                    }
                    self.decode_defaults(instance, archive, &mut reader)?;
                }
            }
        }
        self.capture_trailing(instance, &mut reader);
        Ok(true)
    }

    fn decode_defaults(
        self: &Arc<Self>,
        instance: &Arc<ObjectInstance>,
        archive: &ArchiveHandle,
        reader: &mut RecordReader<'_>,
    ) -> Result<(), DecodeError> {
        let owner = instance.full_name().to_string();
        let source = EngineTemplates {
            engine: self,
            archive,
        };
        let values = read_merged_bag(reader, archive.as_ref(), &owner, &source)?;
        instance.set_field("Defaults", FieldData::Bag(values));
        Ok(())
    }

    fn capture_trailing(&self, instance: &Arc<ObjectInstance>, reader: &mut RecordReader<'_>) {
        let rest = reader.take_rest();
        if !rest.is_empty() {
            warn!(
                object = %instance.full_name(),
                len = rest.len(),
                "undeclared trailing bytes after structured decode"
            );
            instance.set_trailing(rest.to_vec());
        }
    }

    fn finish_instance(self: &Arc<Self>, instance: &Arc<ObjectInstance>) {
        if instance.tag() == TypeTag::Function {
            if let Some(index) = instance.field_u16("NativeIndex") {
                if index != 0 {
                    self.natives.lock().insert(index, instance.clone());
                }
            }
        }
        instance.set_state(LoadState::Loaded);
        if instance.tag().is_class() {
            self.publish_class_loaded(instance);
        }
    }

    /// Record the class as loaded and decode the defaults of any
    /// subclasses parked on it.
    fn publish_class_loaded(self: &Arc<Self>, instance: &Arc<ObjectInstance>) {
        let key = instance.full_name().to_lowercase();
        self.loaded_classes.lock().insert(key.clone());
        let parked = self
            .pending_defaults
            .lock()
            .remove(&key)
            .unwrap_or_default();
        for pending in parked {
            if let Err(e) = self.decode_parked_defaults(&pending) {
                warn!(
                    class = %pending.instance.full_name(),
                    error = %e,
                    "parked defaults failed to decode"
                );
                self.cache.remove(&identity_key(
                    pending.instance.full_name(),
                    pending.instance.class_name(),
                ));
                pending.instance.set_state(LoadState::Failed);
                self.publish_class_failed(&pending.instance);
            }
        }
    }

    /// Record the class as failed and fail any subclasses parked on it,
    /// waking their blocked callers. Runs on the loader thread, so drains
    /// never race new parks.
    fn publish_class_failed(self: &Arc<Self>, instance: &Arc<ObjectInstance>) {
        let key = instance.full_name().to_lowercase();
        self.failed_classes.lock().insert(key.clone());
        let parked = self
            .pending_defaults
            .lock()
            .remove(&key)
            .unwrap_or_default();
        for pending in parked {
            warn!(
                class = %pending.instance.full_name(),
                superclass = %key,
                "superclass failed; failing parked subclass"
            );
            self.cache.remove(&identity_key(
                pending.instance.full_name(),
                pending.instance.class_name(),
            ));
            pending.instance.set_state(LoadState::Failed);
            self.publish_class_failed(&pending.instance);
        }
    }

    fn decode_parked_defaults(self: &Arc<Self>, pending: &PendingDefaults) -> Result<(), DecodeError> {
        let archive = pending.instance.archive().clone();
        let mut reader = RecordReader::new(&pending.bytes, archive.character_encoding());
        reader.skip(pending.offset)?;
        self.decode_defaults(&pending.instance, &archive, &mut reader)?;
        self.capture_trailing(&pending.instance, &mut reader);
        self.finish_instance(&pending.instance);
        Ok(())
    }

    fn superclass_identity(
        &self,
        instance: &Arc<ObjectInstance>,
        archive: &ArchiveHandle,
    ) -> Option<String> {
        let reference = instance.entry().super_ref.filter(|&r| r != 0)?;
        archive
            .resolve_reference(reference)
            .map(|e| e.full_name.to_lowercase())
    }
}

/// Templates backed by the engine's materialized class records: the
/// owner's ancestor chain is walked leaf to root, each level searched
/// through its declared-children sibling chain.
struct EngineTemplates<'a> {
    engine: &'a Arc<GraphEngine>,
    archive: &'a ArchiveHandle,
}

impl TemplateSource for EngineTemplates<'_> {
    fn template_for(&self, owner_class: &str, prop_name: &str) -> Option<Arc<PropertyTemplate>> {
        let mut current = owner_class.to_string();
        for _ in 0..MAX_CHAIN_DEPTH {
            if let Some(template) = self.declared_template(&current, prop_name) {
                return Some(template);
            }
            match self.engine.superclass_of(self.archive, &current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        None
    }
}

impl EngineTemplates<'_> {
    fn declared_template(&self, type_name: &str, prop_name: &str) -> Option<Arc<PropertyTemplate>> {
        let entry = self.engine.type_export_for(self.archive, type_name)?;
        let owner = self.engine.materialize(self.archive, &entry).ok()?;
        let mut child_ref = owner.field_ref("Children").unwrap_or(0);
        for _ in 0..MAX_SIBLINGS {
            if child_ref == 0 {
                return None;
            }
            let child_entry = self.archive.resolve_reference(child_ref)?;
            let child = self.engine.materialize(self.archive, &child_entry).ok()?;
            if child_entry.object_name.eq_ignore_ascii_case(prop_name) {
                if let TypeTag::Property(kind) = child.tag() {
                    return self.template_from_property(&child, kind);
                }
                return None;
            }
            child_ref = child.field_ref("Next").unwrap_or(0);
        }
        None
    }

    fn template_from_property(
        &self,
        property: &Arc<ObjectInstance>,
        kind: PropertyKind,
    ) -> Option<Arc<PropertyTemplate>> {
        let inner = match kind {
            PropertyKind::Struct => {
                let reference = property.field_ref("Inner")?;
                let target = self.archive.resolve_reference(reference)?;
                Some(InnerType::Struct(target.object_name))
            }
            PropertyKind::Array => {
                let reference = property.field_ref("Inner")?;
                let target = self.archive.resolve_reference(reference)?;
                let element = self.engine.materialize(self.archive, &target).ok()?;
                let TypeTag::Property(element_kind) = element.tag() else {
                    return None;
                };
                let element_template = self.template_from_property(&element, element_kind)?;
                Some(InnerType::Array(element_template))
            }
            _ => None,
        };
        Some(Arc::new(PropertyTemplate {
            name: property.object_name().to_string(),
            kind,
            array_dim: property.field_u16("ArrayDim").unwrap_or(1) as u32,
            inner,
        }))
    }
}

fn loader_loop(engine: Weak<GraphEngine>, work_rx: Receiver<Job>) {
    if let Some(engine) = engine.upgrade() {
        *engine.worker_id.lock() = Some(thread::current().id());
    }
    while let Ok(job) = work_rx.recv() {
        let Some(engine) = engine.upgrade() else { break };
        let result = engine.decode_instance(&job.instance);
        let _ = job.done.send(result);
    }
}

fn identity_key(full_name: &str, class_name: &str) -> String {
    format!("{}_{}", full_name.to_lowercase(), class_name.to_lowercase())
}

fn bare_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, bare)) => bare,
        None => name,
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || bare_of(a).eq_ignore_ascii_case(bare_of(b))
}

/// Full-name match first, bare-name fallback, both filtered by the
/// class predicate.
fn find_export(
    archive: &ArchiveHandle,
    name: &str,
    class_predicate: &impl Fn(&Entry) -> bool,
) -> Option<Entry> {
    let exports = archive.export_table();
    if let Some(entry) = exports
        .iter()
        .find(|e| e.full_name.eq_ignore_ascii_case(name) && class_predicate(e))
    {
        return Some(entry.clone());
    }
    exports
        .iter()
        .find(|e| e.object_name.eq_ignore_ascii_case(name) && class_predicate(e))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryArchiveBuilder;

    #[test]
    fn test_identity_key_folds_case() {
        assert_eq!(
            identity_key("Engine.Actor", "Core.Class"),
            identity_key("ENGINE.ACTOR", "core.class")
        );
    }

    #[test]
    fn test_names_match_on_bare_component() {
        assert!(names_match("Engine.Actor", "actor"));
        assert!(!names_match("Engine.Actor", "Engine.Pawn"));
    }

    #[test]
    fn test_tag_for_defaults_to_object() {
        let archive: ArchiveHandle = MemoryArchiveBuilder::new("mem:schema").build();
        let engine = GraphEngine::with_standard_tables();
        let entry = Entry {
            object_name: "Thing".into(),
            class_name: "Mystery.Widget".into(),
            full_name: "P.Thing".into(),
            package_ref: 0,
            super_ref: None,
            is_export: true,
            reference: 1,
            offset: 0,
            size: 0,
        };
        assert_eq!(engine.tag_for(&archive, &entry), TypeTag::Object);

        let class_entry = Entry {
            class_name: "Core.Class".into(),
            ..entry
        };
        assert_eq!(engine.tag_for(&archive, &class_entry), TypeTag::Class);
    }
}
