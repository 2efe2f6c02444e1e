//! Declared-field templates

use std::sync::Arc;

/// Closed set of property scalar kinds, matching the info-byte tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Byte,
    Int,
    Bool,
    Float,
    Object,
    Name,
    Array,
    Struct,
    Str,
}

impl PropertyKind {
    /// Kind for an info-byte tag (low 4 bits).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(PropertyKind::Byte),
            2 => Some(PropertyKind::Int),
            3 => Some(PropertyKind::Bool),
            4 => Some(PropertyKind::Float),
            5 => Some(PropertyKind::Object),
            6 => Some(PropertyKind::Name),
            9 => Some(PropertyKind::Array),
            10 => Some(PropertyKind::Struct),
            13 => Some(PropertyKind::Str),
            _ => None,
        }
    }

    /// The info-byte tag for this kind.
    pub fn tag(&self) -> u8 {
        match self {
            PropertyKind::Byte => 1,
            PropertyKind::Int => 2,
            PropertyKind::Bool => 3,
            PropertyKind::Float => 4,
            PropertyKind::Object => 5,
            PropertyKind::Name => 6,
            PropertyKind::Array => 9,
            PropertyKind::Struct => 10,
            PropertyKind::Str => 13,
        }
    }

    /// Kind for a property class's bare name, e.g. `IntProperty`.
    pub fn from_class_name(bare: &str) -> Option<Self> {
        match bare {
            "ByteProperty" => Some(PropertyKind::Byte),
            "IntProperty" => Some(PropertyKind::Int),
            "BoolProperty" => Some(PropertyKind::Bool),
            "FloatProperty" => Some(PropertyKind::Float),
            "ObjectProperty" => Some(PropertyKind::Object),
            "NameProperty" => Some(PropertyKind::Name),
            "ArrayProperty" => Some(PropertyKind::Array),
            "StructProperty" => Some(PropertyKind::Struct),
            "StrProperty" => Some(PropertyKind::Str),
            _ => None,
        }
    }
}

/// Inner type of a struct- or array-kind template.
#[derive(Debug, Clone, PartialEq)]
pub enum InnerType {
    /// Struct type name, dispatching fixed binary layouts or nested bags
    Struct(String),
    /// Element template for array properties
    Array(Arc<PropertyTemplate>),
}

/// One declared field of a class or struct. Immutable once derived.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTemplate {
    /// Declared field name
    pub name: String,
    /// Scalar kind
    pub kind: PropertyKind,
    /// Declared array arity (number of slots; 1 for scalars)
    pub array_dim: u32,
    /// Inner type for struct/array kinds
    pub inner: Option<InnerType>,
}

impl PropertyTemplate {
    /// Scalar template with a single slot.
    pub fn scalar(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            array_dim: 1,
            inner: None,
        }
    }

    /// Struct-kind template.
    pub fn of_struct(name: impl Into<String>, struct_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Struct,
            array_dim: 1,
            inner: Some(InnerType::Struct(struct_name.into())),
        }
    }

    /// Array-kind template over an element template.
    pub fn of_array(name: impl Into<String>, element: PropertyTemplate) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Array,
            array_dim: 1,
            inner: Some(InnerType::Array(Arc::new(element))),
        }
    }

    /// Struct type name, if this is a struct-kind template.
    pub fn struct_name(&self) -> Option<&str> {
        match &self.inner {
            Some(InnerType::Struct(name)) => Some(name),
            _ => None,
        }
    }

    /// Element template, if this is an array-kind template.
    pub fn element(&self) -> Option<&Arc<PropertyTemplate>> {
        match &self.inner {
            Some(InnerType::Array(element)) => Some(element),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_roundtrip() {
        for tag in 0..16u8 {
            if let Some(kind) = PropertyKind::from_tag(tag) {
                assert_eq!(kind.tag(), tag);
            }
        }
    }

    #[test]
    fn test_kind_from_class_name() {
        assert_eq!(
            PropertyKind::from_class_name("IntProperty"),
            Some(PropertyKind::Int)
        );
        assert_eq!(PropertyKind::from_class_name("Function"), None);
    }
}
