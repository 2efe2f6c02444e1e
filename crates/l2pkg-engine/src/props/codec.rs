//! Property-bag wire codec
//!
//! Record layout: compact name ref, info byte, optional compact struct
//! type-name ref (struct kind only), size per the info byte's selector,
//! optional array-index byte, payload. The bag ends at the reserved name
//! `None`. The info byte packs kind tag (low 4 bits), size selector
//! (bits 4-6) and the array flag (bit 7); booleans carry their value in
//! the array-flag bit and have no payload.
//!
//! Unknown property names are skipped by advancing the cursor past the
//! declared size, which keeps the rest of the bag decodable when the
//! schema is incomplete.

use std::sync::Arc;

use tracing::warn;

use crate::archive::ArchiveStore;
use crate::error::DecodeError;
use crate::reader::{RecordReader, RecordWriter};

use super::template::{PropertyKind, PropertyTemplate};
use super::value::{merge_records, PropertyValue, Slot};

/// Terminator name closing every property bag.
pub const BAG_TERMINATOR: &str = "None";

/// Supplies declared-field templates for an owner class or struct type,
/// consulting the owner's full ancestor chain.
pub trait TemplateSource {
    fn template_for(&self, owner_class: &str, prop_name: &str) -> Option<Arc<PropertyTemplate>>;
}

/// A template source with no declarations; every property is skipped.
pub struct NoTemplates;

impl TemplateSource for NoTemplates {
    fn template_for(&self, _owner_class: &str, _prop_name: &str) -> Option<Arc<PropertyTemplate>> {
        None
    }
}

/// One decoded wire record. Keeps the size selector and array-index byte
/// so re-encoding reproduces the original bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub template: Arc<PropertyTemplate>,
    /// Wire-level struct type name (struct kind only)
    pub struct_name: Option<String>,
    /// Size-encoding selector as decoded (0-7)
    pub selector: u8,
    /// Array element index (0 when the flag was clear)
    pub array_index: u8,
    /// Whether an explicit array-index byte was present on the wire
    pub has_index_byte: bool,
    pub value: Slot,
}

fn fixed_size(selector: u8) -> Option<usize> {
    match selector {
        0 => Some(1),
        1 => Some(2),
        2 => Some(4),
        3 => Some(12),
        4 => Some(16),
        _ => None,
    }
}

/// Smallest selector able to carry a payload of `len` bytes exactly.
pub fn selector_for_len(len: usize) -> u8 {
    match len {
        1 => 0,
        2 => 1,
        4 => 2,
        12 => 3,
        16 => 4,
        _ if len <= 0xFF => 5,
        _ if len <= 0xFFFF => 6,
        _ => 7,
    }
}

/// Read a property bag up to and including its `None` terminator.
///
/// Returns one record per wire record, in wire order. Properties with no
/// matching template are skipped (cursor advanced by the declared size)
/// and logged.
pub fn read_property_bag(
    reader: &mut RecordReader<'_>,
    store: &dyn ArchiveStore,
    owner_class: &str,
    source: &dyn TemplateSource,
) -> Result<Vec<PropertyRecord>, DecodeError> {
    let mut records = Vec::new();
    loop {
        let name_idx = reader.read_compact()?;
        let name = store.name_by_index(name_idx)?.to_string();
        if name == BAG_TERMINATOR {
            break;
        }

        let info = reader.read_u8()?;
        let tag = info & 0x0F;
        let kind = PropertyKind::from_tag(tag).ok_or(DecodeError::BadKindTag {
            tag,
            name: name.clone(),
        })?;

        let struct_name = if kind == PropertyKind::Struct {
            let idx = reader.read_compact()?;
            Some(store.name_by_index(idx)?.to_string())
        } else {
            None
        };

        let selector = (info >> 4) & 0x07;
        let size = match fixed_size(selector) {
            Some(fixed) => fixed,
            None => match selector {
                5 => reader.read_u8()? as usize,
                6 => reader.read_u16()? as usize,
                _ => reader.read_u32()? as usize,
            },
        };

        let array_flag = info & 0x80 != 0;
        let (array_index, has_index_byte) = if array_flag && kind != PropertyKind::Bool {
            (reader.read_u8()?, true)
        } else {
            (0, false)
        };

        let Some(template) = source.template_for(owner_class, &name) else {
            // Schema gap: advance past the payload and keep going.
            if kind != PropertyKind::Bool {
                reader.skip(size)?;
            }
            warn!(owner = owner_class, property = %name, size, "skipping unknown property");
            continue;
        };

        let value = if kind == PropertyKind::Bool {
            Slot::Bool(array_flag)
        } else {
            let payload = reader.take(size)?;
            let mut sub = RecordReader::new(payload, reader.charset());
            decode_payload(&mut sub, store, source, kind, struct_name.as_deref(), &template)?
        };

        records.push(PropertyRecord {
            template,
            struct_name,
            selector,
            array_index,
            has_index_byte,
            value,
        });
    }
    Ok(records)
}

/// Read a bag and merge its records into slot-addressed values.
pub fn read_merged_bag(
    reader: &mut RecordReader<'_>,
    store: &dyn ArchiveStore,
    owner_class: &str,
    source: &dyn TemplateSource,
) -> Result<Vec<PropertyValue>, DecodeError> {
    let records = read_property_bag(reader, store, owner_class, source)?;
    Ok(merge_records(&records))
}

fn decode_payload(
    reader: &mut RecordReader<'_>,
    store: &dyn ArchiveStore,
    source: &dyn TemplateSource,
    kind: PropertyKind,
    struct_name: Option<&str>,
    template: &Arc<PropertyTemplate>,
) -> Result<Slot, DecodeError> {
    match kind {
        PropertyKind::Byte => Ok(Slot::Byte(reader.read_u8()?)),
        PropertyKind::Int => Ok(Slot::Int(reader.read_i32()?)),
        PropertyKind::Float => Ok(Slot::Float(reader.read_f32()?)),
        PropertyKind::Bool => Ok(Slot::Bool(reader.read_u8()? != 0)),
        PropertyKind::Object => Ok(Slot::Object(reader.read_compact()?)),
        PropertyKind::Name => {
            let idx = reader.read_compact()?;
            Ok(Slot::Name(store.name_by_index(idx)?.to_string()))
        }
        PropertyKind::Str => Ok(Slot::Str(reader.read_string()?)),
        PropertyKind::Struct => {
            let struct_name = struct_name
                .or_else(|| template.struct_name())
                .unwrap_or_default()
                .to_string();
            decode_struct(reader, store, source, &struct_name)
        }
        PropertyKind::Array => {
            let element = template.element().cloned().ok_or_else(|| {
                DecodeError::Record(format!(
                    "array property {} has no element template",
                    template.name
                ))
            })?;
            let count = reader.read_compact()?;
            let mut elements = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count.max(0) {
                let slot = decode_payload(
                    reader,
                    store,
                    source,
                    element.kind,
                    element.struct_name(),
                    &element,
                )?;
                elements.push(PropertyValue {
                    template: element.clone(),
                    slots: vec![Some(slot)],
                });
            }
            Ok(Slot::Array(elements))
        }
    }
}

/// Decode a struct payload: three named fixed binary layouts, or the
/// general nested bag for every other struct type.
fn decode_struct(
    reader: &mut RecordReader<'_>,
    store: &dyn ArchiveStore,
    source: &dyn TemplateSource,
    struct_name: &str,
) -> Result<Slot, DecodeError> {
    let member = |name: &str, kind: PropertyKind, slot: Slot| PropertyValue {
        template: Arc::new(PropertyTemplate::scalar(name, kind)),
        slots: vec![Some(slot)],
    };
    match struct_name {
        "Color" => {
            let mut members = Vec::with_capacity(4);
            for name in ["R", "G", "B", "A"] {
                members.push(member(name, PropertyKind::Byte, Slot::Byte(reader.read_u8()?)));
            }
            Ok(Slot::Struct(members))
        }
        "Vector" => {
            let mut members = Vec::with_capacity(3);
            for name in ["X", "Y", "Z"] {
                members.push(member(name, PropertyKind::Float, Slot::Float(reader.read_f32()?)));
            }
            Ok(Slot::Struct(members))
        }
        "Rotator" => {
            let mut members = Vec::with_capacity(3);
            for name in ["Pitch", "Yaw", "Roll"] {
                members.push(member(name, PropertyKind::Int, Slot::Int(reader.read_i32()?)));
            }
            Ok(Slot::Struct(members))
        }
        other => {
            let nested = read_merged_bag(reader, store, other, source)?;
            Ok(Slot::Struct(nested))
        }
    }
}

/// True for the three struct types with fixed binary layouts.
fn is_fixed_layout(struct_name: &str) -> bool {
    matches!(struct_name, "Color" | "Vector" | "Rotator")
}

/// Write a property bag, terminator included. Reproduces the input bytes
/// of a prior [`read_property_bag`] when no record was skipped.
pub fn write_property_bag(
    writer: &mut RecordWriter,
    store: &dyn ArchiveStore,
    records: &[PropertyRecord],
) -> Result<(), DecodeError> {
    for record in records {
        write_record(writer, store, record)?;
    }
    let none_idx = store
        .name_index(BAG_TERMINATOR)
        .ok_or_else(|| DecodeError::Record("name table has no None entry".into()))?;
    writer.write_compact(none_idx);
    Ok(())
}

/// Write a bag from merged values, choosing canonical size selectors.
/// One record is emitted per occupied slot.
pub fn write_merged_bag(
    writer: &mut RecordWriter,
    store: &dyn ArchiveStore,
    values: &[PropertyValue],
) -> Result<(), DecodeError> {
    for value in values {
        for (index, slot) in value.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let kind = value.template.kind;

            let mut payload = RecordWriter::new(writer.charset());
            if kind != PropertyKind::Bool {
                encode_payload(
                    &mut payload,
                    store,
                    slot,
                    value.template.struct_name(),
                    value.template.element(),
                )?;
            }
            let payload = payload.into_bytes();

            let record = PropertyRecord {
                template: value.template.clone(),
                struct_name: value.template.struct_name().map(str::to_string),
                selector: if kind == PropertyKind::Bool {
                    0
                } else {
                    selector_for_len(payload.len())
                },
                array_index: index as u8,
                has_index_byte: index > 0 && kind != PropertyKind::Bool,
                value: slot.clone(),
            };
            write_record(writer, store, &record)?;
        }
    }
    let none_idx = store
        .name_index(BAG_TERMINATOR)
        .ok_or_else(|| DecodeError::Record("name table has no None entry".into()))?;
    writer.write_compact(none_idx);
    Ok(())
}

fn write_record(
    writer: &mut RecordWriter,
    store: &dyn ArchiveStore,
    record: &PropertyRecord,
) -> Result<(), DecodeError> {
    let name_idx = store.name_index(&record.template.name).ok_or_else(|| {
        DecodeError::Record(format!(
            "property name {:?} missing from the name table",
            record.template.name
        ))
    })?;
    writer.write_compact(name_idx);

    let kind = record.template.kind;
    let mut info = kind.tag() | (record.selector << 4);
    let bool_value = matches!(record.value, Slot::Bool(true));
    if (kind == PropertyKind::Bool && bool_value) || record.has_index_byte {
        info |= 0x80;
    }
    writer.write_u8(info);

    if let Some(struct_name) = &record.struct_name {
        let idx = store.name_index(struct_name).ok_or_else(|| {
            DecodeError::Record(format!(
                "struct name {:?} missing from the name table",
                struct_name
            ))
        })?;
        writer.write_compact(idx);
    }

    let mut payload = RecordWriter::new(writer.charset());
    if kind != PropertyKind::Bool {
        encode_payload(
            &mut payload,
            store,
            &record.value,
            record
                .struct_name
                .as_deref()
                .or_else(|| record.template.struct_name()),
            record.template.element(),
        )?;
    }
    let payload = payload.into_bytes();

    match fixed_size(record.selector) {
        // booleans carry no payload regardless of the selector
        Some(fixed) => debug_assert!(kind == PropertyKind::Bool || payload.len() == fixed),
        None => match record.selector {
            5 => writer.write_u8(payload.len() as u8),
            6 => writer.write_u16(payload.len() as u16),
            _ => writer.write_u32(payload.len() as u32),
        },
    }

    if record.has_index_byte {
        writer.write_u8(record.array_index);
    }
    writer.write_bytes(&payload);
    Ok(())
}

fn encode_payload(
    writer: &mut RecordWriter,
    store: &dyn ArchiveStore,
    value: &Slot,
    struct_name: Option<&str>,
    element: Option<&Arc<PropertyTemplate>>,
) -> Result<(), DecodeError> {
    match value {
        Slot::Byte(v) => writer.write_u8(*v),
        Slot::Int(v) => writer.write_i32(*v),
        Slot::Float(v) => writer.write_f32(*v),
        Slot::Bool(v) => writer.write_u8(*v as u8),
        Slot::Object(v) => writer.write_compact(*v),
        Slot::Name(name) => {
            let idx = store.name_index(name).ok_or_else(|| {
                DecodeError::Record(format!("name {:?} missing from the name table", name))
            })?;
            writer.write_compact(idx);
        }
        Slot::Str(text) => writer.write_string(text),
        Slot::Struct(members) => {
            if struct_name.map(is_fixed_layout).unwrap_or(false) {
                // Color/Vector/Rotator re-emit as bare scalars
                for member in members {
                    let slot = member.value().ok_or_else(|| {
                        DecodeError::Record(format!(
                            "struct member {} with no value",
                            member.template.name
                        ))
                    })?;
                    encode_payload(writer, store, slot, None, None)?;
                }
            } else {
                write_merged_bag(writer, store, members)?;
            }
        }
        Slot::Array(elements) => {
            writer.write_compact(elements.len() as i32);
            for item in elements {
                let slot = item
                    .value()
                    .ok_or_else(|| DecodeError::Record("array element with no value".into()))?;
                let inner = element.or(Some(&item.template));
                let inner_struct = inner.and_then(|t| t.struct_name());
                let inner_element = inner.and_then(|t| t.element());
                encode_payload(writer, store, slot, inner_struct, inner_element)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Charset;
    use crate::mem::MemoryArchiveBuilder;
    use rustc_hash::FxHashMap;

    struct MapTemplates(FxHashMap<String, Arc<PropertyTemplate>>);

    impl MapTemplates {
        fn new(templates: &[PropertyTemplate]) -> Self {
            Self(
                templates
                    .iter()
                    .map(|t| (t.name.to_lowercase(), Arc::new(t.clone())))
                    .collect(),
            )
        }
    }

    impl TemplateSource for MapTemplates {
        fn template_for(&self, _owner: &str, prop: &str) -> Option<Arc<PropertyTemplate>> {
            self.0.get(&prop.to_lowercase()).cloned()
        }
    }

    fn store_with(names: &[&str]) -> std::sync::Arc<crate::mem::MemoryArchive> {
        let mut b = MemoryArchiveBuilder::new("mem:props");
        for name in names {
            b.name(name);
        }
        b.build()
    }

    #[test]
    fn test_single_int_record() {
        // kind=INT, selector=2 (4 bytes), array flag clear; payload 100
        let store = store_with(&["Health"]);
        let health = store.name_index("Health").unwrap() as u8;
        let none = store.name_index(BAG_TERMINATOR).unwrap() as u8;
        let mut bytes = vec![health, 0x22];
        bytes.extend_from_slice(&100i32.to_le_bytes());
        bytes.push(none);

        let source = MapTemplates::new(&[PropertyTemplate::scalar("Health", PropertyKind::Int)]);
        let mut reader = RecordReader::new(&bytes, Charset::Latin1);
        let values = read_merged_bag(&mut reader, store.as_ref(), "Pawn", &source).unwrap();
        assert_eq!(reader.remaining(), 0);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].template.name, "Health");
        assert_eq!(values[0].value(), Some(&Slot::Int(100)));
    }

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let store = store_with(&["Health", "Armed", "Title", "Location", "Vector"]);
        let idx = |name: &str| store.name_index(name).unwrap() as u8;

        let mut bytes = vec![idx("Health"), 0x22];
        bytes.extend_from_slice(&100i32.to_le_bytes());
        // bool true: kind 3, array-flag bit carries the value, no payload
        bytes.extend_from_slice(&[idx("Armed"), 0x83]);
        // string via explicit 1-byte size selector (5)
        bytes.extend_from_slice(&[idx("Title"), 0x5D, 3]);
        bytes.extend_from_slice(b"Gm\0");
        // fixed 12-byte vector struct
        bytes.extend_from_slice(&[idx("Location"), 0x3A, idx("Vector")]);
        for v in [1.0f32, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(idx(BAG_TERMINATOR));

        let source = MapTemplates::new(&[
            PropertyTemplate::scalar("Health", PropertyKind::Int),
            PropertyTemplate::scalar("Armed", PropertyKind::Bool),
            PropertyTemplate::scalar("Title", PropertyKind::Str),
            PropertyTemplate::of_struct("Location", "Vector"),
        ]);
        let mut reader = RecordReader::new(&bytes, Charset::Latin1);
        let records = read_property_bag(&mut reader, store.as_ref(), "Pawn", &source).unwrap();
        assert_eq!(reader.remaining(), 0);
        assert_eq!(records.len(), 4);

        let mut writer = RecordWriter::new(Charset::Latin1);
        write_property_bag(&mut writer, store.as_ref(), &records).unwrap();
        assert_eq!(writer.into_bytes(), bytes);
    }

    #[test]
    fn test_unknown_property_is_skipped() {
        let store = store_with(&["Mana", "Health"]);
        let idx = |name: &str| store.name_index(name).unwrap() as u8;
        let mut bytes = vec![idx("Mana"), 0x22];
        bytes.extend_from_slice(&55i32.to_le_bytes());
        bytes.extend_from_slice(&[idx("Health"), 0x22]);
        bytes.extend_from_slice(&100i32.to_le_bytes());
        bytes.push(idx(BAG_TERMINATOR));

        let source = MapTemplates::new(&[PropertyTemplate::scalar("Health", PropertyKind::Int)]);
        let mut reader = RecordReader::new(&bytes, Charset::Latin1);
        let records = read_property_bag(&mut reader, store.as_ref(), "Pawn", &source).unwrap();
        assert_eq!(reader.remaining(), 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].template.name, "Health");
        assert_eq!(records[0].value, Slot::Int(100));
    }

    #[test]
    fn test_array_payload_unframed_elements() {
        let store = store_with(&["Levels"]);
        let idx = store.name_index("Levels").unwrap() as u8;
        // array of 3 ints: compact count then raw elements, one payload
        let mut payload = vec![3u8];
        for v in [10i32, 20, 30] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let mut bytes = vec![idx, 0x59, payload.len() as u8];
        bytes.extend_from_slice(&payload);
        bytes.push(store.name_index(BAG_TERMINATOR).unwrap() as u8);

        let source = MapTemplates::new(&[PropertyTemplate::of_array(
            "Levels",
            PropertyTemplate::scalar("Levels", PropertyKind::Int),
        )]);
        let mut reader = RecordReader::new(&bytes, Charset::Latin1);
        let records = read_property_bag(&mut reader, store.as_ref(), "Pawn", &source).unwrap();
        match &records[0].value {
            Slot::Array(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1].value(), Some(&Slot::Int(20)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut writer = RecordWriter::new(Charset::Latin1);
        write_property_bag(&mut writer, store.as_ref(), &records).unwrap();
        assert_eq!(writer.into_bytes(), bytes);
    }

    #[test]
    fn test_merged_write_uses_canonical_selectors() {
        let store = store_with(&["Health"]);
        let template = Arc::new(PropertyTemplate::scalar("Health", PropertyKind::Int));
        let values = vec![PropertyValue {
            template: template.clone(),
            slots: vec![Some(Slot::Int(7))],
        }];
        let mut writer = RecordWriter::new(Charset::Latin1);
        write_merged_bag(&mut writer, store.as_ref(), &values).unwrap();
        let bytes = writer.into_bytes();

        // int payload is 4 bytes: selector 2, no index byte
        assert_eq!(bytes[1], 0x22);

        let source = MapTemplates::new(&[PropertyTemplate::scalar("Health", PropertyKind::Int)]);
        let mut reader = RecordReader::new(&bytes, Charset::Latin1);
        let back = read_merged_bag(&mut reader, store.as_ref(), "Pawn", &source).unwrap();
        assert_eq!(back, values);
    }
}
