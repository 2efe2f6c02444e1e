//! Decoded property values
//!
//! A [`PropertyValue`] is the merged, slot-addressed view of one declared
//! field; the codec's raw unit is [`super::codec::PropertyRecord`], one per
//! wire record, which preserves encoding details for byte-identical
//! re-emission.

use std::sync::Arc;

use super::codec::PropertyRecord;
use super::template::{PropertyKind, PropertyTemplate};

/// One decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Byte(u8),
    Int(i32),
    Bool(bool),
    Float(f32),
    /// Signed object reference, resolved by the graph engine on demand
    Object(i32),
    Name(String),
    Str(String),
    /// Struct members in declaration order
    Struct(Vec<PropertyValue>),
    /// Array elements
    Array(Vec<PropertyValue>),
}

impl Slot {
    /// Kind-specific zero value: 0, false, 0.0, empty string, empty list.
    /// Struct zeros fill recursively from the member templates when known.
    pub fn zero(kind: PropertyKind) -> Slot {
        match kind {
            PropertyKind::Byte => Slot::Byte(0),
            PropertyKind::Int => Slot::Int(0),
            PropertyKind::Bool => Slot::Bool(false),
            PropertyKind::Float => Slot::Float(0.0),
            PropertyKind::Object => Slot::Object(0),
            PropertyKind::Name => Slot::Name("None".to_string()),
            PropertyKind::Str => Slot::Str(String::new()),
            PropertyKind::Struct => Slot::Struct(Vec::new()),
            PropertyKind::Array => Slot::Array(Vec::new()),
        }
    }

    /// Zero value with struct members recursively zero-filled.
    pub fn zero_for(template: &PropertyTemplate, members: &[Arc<PropertyTemplate>]) -> Slot {
        if template.kind == PropertyKind::Struct {
            let filled = members
                .iter()
                .map(|m| PropertyValue::zeroed(m.clone(), &[]))
                .collect();
            Slot::Struct(filled)
        } else {
            Slot::zero(template.kind)
        }
    }
}

/// A sized slot array bound to one template.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub template: Arc<PropertyTemplate>,
    /// One slot per declared array index; `None` where the bag carried no
    /// record for that index
    pub slots: Vec<Option<Slot>>,
}

impl PropertyValue {
    /// Value with all slots unset.
    pub fn empty(template: Arc<PropertyTemplate>) -> Self {
        let dim = template.array_dim.max(1) as usize;
        Self {
            template,
            slots: vec![None; dim],
        }
    }

    /// Value with all slots zero-filled (member templates fill struct zeros).
    pub fn zeroed(template: Arc<PropertyTemplate>, members: &[Arc<PropertyTemplate>]) -> Self {
        let dim = template.array_dim.max(1) as usize;
        let zero = Slot::zero_for(&template, members);
        Self {
            template,
            slots: vec![Some(zero); dim],
        }
    }

    /// First occupied slot, if any.
    pub fn value(&self) -> Option<&Slot> {
        self.slots.iter().flatten().next()
    }

    /// Set the slot at `index`, growing the array for out-of-declaration
    /// indices (legal in loosely-declared bags).
    pub fn set(&mut self, index: usize, slot: Slot) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(slot);
    }

    /// Deep copy of this value.
    ///
    /// Struct AND array slots copy recursively. The reference
    /// implementation shallow-copied array slots; that is treated here as
    /// a source bug rather than replicated.
    pub fn copy_value(&self) -> Self {
        self.clone()
    }
}

/// Merge wire records into slot-addressed values, preserving first-seen
/// field order.
pub fn merge_records(records: &[PropertyRecord]) -> Vec<PropertyValue> {
    let mut out: Vec<PropertyValue> = Vec::new();
    for record in records {
        let existing = out
            .iter_mut()
            .find(|v| v.template.name == record.template.name);
        match existing {
            Some(value) => value.set(record.array_index as usize, record.value.clone()),
            None => {
                let mut value = PropertyValue::empty(record.template.clone());
                value.set(record.array_index as usize, record.value.clone());
                out.push(value);
            }
        }
    }
    out
}

/// Walk a root-to-leaf chain of default bags for the default of `name`.
/// The most-derived (leaf-most) default wins; absent everywhere, the
/// kind-specific zero applies.
pub fn resolve_default(
    chain: &[Vec<PropertyValue>],
    template: &Arc<PropertyTemplate>,
) -> PropertyValue {
    let mut found: Option<&PropertyValue> = None;
    for layer in chain {
        if let Some(v) = layer.iter().find(|v| v.template.name == template.name) {
            found = Some(v);
        }
    }
    match found {
        Some(v) => v.copy_value(),
        None => PropertyValue::zeroed(template.clone(), &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_template(name: &str) -> Arc<PropertyTemplate> {
        Arc::new(PropertyTemplate::scalar(name, PropertyKind::Int))
    }

    #[test]
    fn test_zero_slots() {
        assert_eq!(Slot::zero(PropertyKind::Int), Slot::Int(0));
        assert_eq!(Slot::zero(PropertyKind::Bool), Slot::Bool(false));
        assert_eq!(Slot::zero(PropertyKind::Str), Slot::Str(String::new()));
        assert_eq!(Slot::zero(PropertyKind::Array), Slot::Array(Vec::new()));
    }

    #[test]
    fn test_set_grows_slots() {
        let mut v = PropertyValue::empty(int_template("Levels"));
        v.set(3, Slot::Int(42));
        assert_eq!(v.slots.len(), 4);
        assert_eq!(v.slots[3], Some(Slot::Int(42)));
        assert_eq!(v.slots[0], None);
    }

    #[test]
    fn test_deep_copy_of_struct_and_array() {
        let member = PropertyValue {
            template: int_template("X"),
            slots: vec![Some(Slot::Int(7))],
        };
        let outer = PropertyValue {
            template: Arc::new(PropertyTemplate::of_array(
                "Points",
                PropertyTemplate::scalar("X", PropertyKind::Int),
            )),
            slots: vec![Some(Slot::Array(vec![member]))],
        };
        let copied = outer.copy_value();
        assert_eq!(copied, outer);
    }

    #[test]
    fn test_default_resolution_leaf_wins() {
        let template = int_template("Health");
        let root = vec![PropertyValue {
            template: template.clone(),
            slots: vec![Some(Slot::Int(50))],
        }];
        let leaf = vec![PropertyValue {
            template: template.clone(),
            slots: vec![Some(Slot::Int(100))],
        }];
        let resolved = resolve_default(&[root, leaf], &template);
        assert_eq!(resolved.value(), Some(&Slot::Int(100)));
    }

    #[test]
    fn test_default_resolution_zero_fallback() {
        let template = int_template("Mana");
        let resolved = resolve_default(&[], &template);
        assert_eq!(resolved.value(), Some(&Slot::Int(0)));
    }
}
