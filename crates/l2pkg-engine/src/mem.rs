//! In-memory archive store
//!
//! A self-contained [`ArchiveStore`] over byte vectors. Used by the test
//! suites and by tooling that assembles archives programmatically; real
//! container files come in through whatever store the application injects
//! into the locator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::archive::{ArchiveStore, Charset, Entry};
use crate::error::DecodeError;

/// Memory-backed archive.
pub struct MemoryArchive {
    identity: String,
    charset: Charset,
    names: Vec<String>,
    name_lookup: FxHashMap<String, i32>,
    exports: Vec<Entry>,
    imports: Vec<Entry>,
    records: Vec<Vec<u8>>,
    record_reads: AtomicUsize,
}

impl MemoryArchive {
    /// How many times raw record bytes were handed out. Lets tests assert
    /// an object was decoded exactly once.
    pub fn record_reads(&self) -> usize {
        self.record_reads.load(Ordering::SeqCst)
    }
}

impl ArchiveStore for MemoryArchive {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn name_table(&self) -> &[String] {
        &self.names
    }

    fn export_table(&self) -> &[Entry] {
        &self.exports
    }

    fn resolve_reference(&self, reference: i32) -> Option<Entry> {
        if reference > 0 {
            self.exports.get(reference as usize - 1).cloned()
        } else if reference < 0 {
            self.imports.get((-reference) as usize - 1).cloned()
        } else {
            None
        }
    }

    fn name_by_index(&self, index: i32) -> Result<&str, DecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
            .ok_or(DecodeError::BadNameIndex(index))
    }

    fn name_index(&self, name: &str) -> Option<i32> {
        self.name_lookup.get(name).copied()
    }

    fn raw_record_bytes(&self, entry: &Entry) -> Result<Vec<u8>, DecodeError> {
        if !entry.is_export {
            return Err(DecodeError::Record(format!(
                "{} is an import; imports carry no record bytes",
                entry.full_name
            )));
        }
        self.record_reads.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(entry.reference as usize - 1)
            .cloned()
            .ok_or_else(|| DecodeError::Record(format!("no record for {}", entry.full_name)))
    }

    fn character_encoding(&self) -> Charset {
        self.charset
    }
}

/// Builder assembling a [`MemoryArchive`].
pub struct MemoryArchiveBuilder {
    identity: String,
    charset: Charset,
    names: Vec<String>,
    name_lookup: FxHashMap<String, i32>,
    exports: Vec<Entry>,
    imports: Vec<Entry>,
    records: Vec<Vec<u8>>,
}

impl MemoryArchiveBuilder {
    pub fn new(identity: impl Into<String>) -> Self {
        let mut builder = Self {
            identity: identity.into(),
            charset: Charset::Latin1,
            names: Vec::new(),
            name_lookup: FxHashMap::default(),
            exports: Vec::new(),
            imports: Vec::new(),
            records: Vec::new(),
        };
        // Index 0 is the reserved terminator name in every real archive
        builder.name("None");
        builder
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Intern a name, returning its table index.
    pub fn name(&mut self, name: &str) -> i32 {
        if let Some(&idx) = self.name_lookup.get(name) {
            return idx;
        }
        let idx = self.names.len() as i32;
        self.names.push(name.to_string());
        self.name_lookup.insert(name.to_string(), idx);
        idx
    }

    /// Add an import entry, returning its (negative) signed reference.
    pub fn add_import(
        &mut self,
        object_name: &str,
        class_name: &str,
        full_name: &str,
        package_ref: i32,
    ) -> i32 {
        self.name(object_name);
        let reference = -(self.imports.len() as i32 + 1);
        self.imports.push(Entry {
            object_name: object_name.to_string(),
            class_name: class_name.to_string(),
            full_name: full_name.to_string(),
            package_ref,
            super_ref: None,
            is_export: false,
            reference,
            offset: 0,
            size: 0,
        });
        reference
    }

    /// Add an export entry with its raw record bytes, returning its
    /// (positive) signed reference.
    pub fn add_export(
        &mut self,
        object_name: &str,
        class_name: &str,
        full_name: &str,
        package_ref: i32,
        super_ref: Option<i32>,
        record: Vec<u8>,
    ) -> i32 {
        self.name(object_name);
        let reference = self.exports.len() as i32 + 1;
        self.exports.push(Entry {
            object_name: object_name.to_string(),
            class_name: class_name.to_string(),
            full_name: full_name.to_string(),
            package_ref,
            super_ref,
            is_export: true,
            reference,
            offset: 0,
            size: record.len(),
        });
        self.records.push(record);
        reference
    }

    /// Replace the record bytes of an existing export.
    pub fn set_record(&mut self, reference: i32, record: Vec<u8>) {
        let idx = reference as usize - 1;
        self.exports[idx].size = record.len();
        self.records[idx] = record;
    }

    pub fn build(self) -> Arc<MemoryArchive> {
        Arc::new(MemoryArchive {
            identity: self.identity,
            charset: self.charset,
            names: self.names,
            name_lookup: self.name_lookup,
            exports: self.exports,
            imports: self.imports,
            records: self.records,
            record_reads: AtomicUsize::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_resolution() {
        let mut b = MemoryArchiveBuilder::new("mem:test");
        let import_ref = b.add_import("Object", "Core.Class", "Core.Object", 0);
        let export_ref = b.add_export("Actor", "Core.Class", "Engine.Actor", 0, None, vec![1, 2]);
        let archive = b.build();

        assert_eq!(archive.resolve_reference(0), None);
        assert_eq!(
            archive.resolve_reference(export_ref).unwrap().full_name,
            "Engine.Actor"
        );
        assert_eq!(
            archive.resolve_reference(import_ref).unwrap().full_name,
            "Core.Object"
        );
        assert_eq!(archive.resolve_reference(99), None);
    }

    #[test]
    fn test_name_interning() {
        let mut b = MemoryArchiveBuilder::new("mem:test");
        assert_eq!(b.name("None"), 0);
        let health = b.name("Health");
        assert_eq!(b.name("Health"), health);
        let archive = b.build();
        assert_eq!(archive.name_by_index(health).unwrap(), "Health");
        assert_eq!(archive.name_index("Health"), Some(health));
        assert!(archive.name_by_index(-1).is_err());
    }

    #[test]
    fn test_record_read_counter() {
        let mut b = MemoryArchiveBuilder::new("mem:test");
        let r = b.add_export("A", "Core.Object", "P.A", 0, None, vec![0xAA]);
        let archive = b.build();
        let entry = archive.resolve_reference(r).unwrap();
        assert_eq!(archive.record_reads(), 0);
        assert_eq!(archive.raw_record_bytes(&entry).unwrap(), vec![0xAA]);
        assert_eq!(archive.record_reads(), 1);
    }
}
