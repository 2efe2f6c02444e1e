//! Archive Store contract
//!
//! The engine consumes an opened container through the [`ArchiveStore`]
//! trait; the container's physical record layout is the store's business.
//! Signed references follow the container convention: positive values are
//! export-table indices plus one, negative values index the import table,
//! zero is the null sentinel.

use std::sync::Arc;

use crate::error::DecodeError;

/// Character encoding of zero-terminated strings inside an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// One byte per character, Latin-1
    Latin1,
    /// Two bytes per character, UTF-16 little-endian
    Utf16Le,
}

impl Charset {
    /// Decode string bytes (terminator already stripped).
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(DecodeError::BadString(
                        "odd byte count for UTF-16LE text".into(),
                    ));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units)
                    .map_err(|e| DecodeError::BadString(e.to_string()))
            }
        }
    }

    /// Encode a string, without the terminator.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Latin1 => text.chars().map(|c| c as u8).collect(),
            Charset::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
        }
    }

    /// Width of one code unit in bytes.
    pub fn unit_len(&self) -> usize {
        match self {
            Charset::Latin1 => 1,
            Charset::Utf16Le => 2,
        }
    }
}

/// One referenceable record in an archive, import or export.
///
/// Entries are immutable once the archive is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Bare object name (last path component)
    pub object_name: String,
    /// Fully-qualified class name, e.g. `Core.Function`
    pub class_name: String,
    /// Fully-qualified (package-dotted) object name
    pub full_name: String,
    /// Signed reference to the owning package entry (0 = top level)
    pub package_ref: i32,
    /// Signed reference to the superclass entry, for type records
    pub super_ref: Option<i32>,
    /// True for export-table entries (locally defined)
    pub is_export: bool,
    /// The signed reference that resolves back to this entry
    pub reference: i32,
    /// Byte offset of the raw record (exports only)
    pub offset: usize,
    /// Byte size of the raw record (exports only)
    pub size: usize,
}

impl Entry {
    /// Bare class name without its package prefix.
    pub fn bare_class_name(&self) -> &str {
        match self.class_name.rsplit_once('.') {
            Some((_, bare)) => bare,
            None => &self.class_name,
        }
    }
}

/// An opened container, as the engine sees it.
///
/// Implementations own the physical byte layout; the engine only consumes
/// tables, references, and raw record bytes through this contract.
pub trait ArchiveStore: Send + Sync {
    /// Stable identity of the backing file, used as a cache key.
    fn identity(&self) -> &str;

    /// The ordered interned-string table.
    fn name_table(&self) -> &[String];

    /// All locally defined entries.
    fn export_table(&self) -> &[Entry];

    /// Resolve a signed reference; `None` for the null sentinel or an
    /// out-of-range index.
    fn resolve_reference(&self, reference: i32) -> Option<Entry>;

    /// Name-table lookup by index.
    fn name_by_index(&self, index: i32) -> Result<&str, DecodeError>;

    /// Reverse name-table lookup.
    fn name_index(&self, name: &str) -> Option<i32>;

    /// Raw record bytes for an export entry.
    fn raw_record_bytes(&self, entry: &Entry) -> Result<Vec<u8>, DecodeError>;

    /// Encoding of zero-terminated strings in this archive.
    fn character_encoding(&self) -> Charset;
}

/// Shared handle to an opened archive.
pub type ArchiveHandle = Arc<dyn ArchiveStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_latin1() {
        let cs = Charset::Latin1;
        let bytes = cs.encode("Héllo");
        assert_eq!(cs.decode(&bytes).unwrap(), "Héllo");
    }

    #[test]
    fn test_charset_utf16le() {
        let cs = Charset::Utf16Le;
        let bytes = cs.encode("Привет");
        assert_eq!(bytes.len(), 12);
        assert_eq!(cs.decode(&bytes).unwrap(), "Привет");
    }

    #[test]
    fn test_charset_utf16le_odd_length() {
        assert!(Charset::Utf16Le.decode(&[0x41]).is_err());
    }

    #[test]
    fn test_bare_class_name() {
        let entry = Entry {
            object_name: "Login".into(),
            class_name: "Core.Function".into(),
            full_name: "Engine.Actor.Login".into(),
            package_ref: 0,
            super_ref: None,
            is_export: true,
            reference: 1,
            offset: 0,
            size: 0,
        };
        assert_eq!(entry.bare_class_name(), "Function");
    }
}
