//! Per-type field layouts
//!
//! Each decodable type carries an explicit ordered descriptor table:
//! field name plus decode/encode rule. The engine resolves an entry's
//! class name to a [`TypeTag`] through the [`SchemaRegistry`], walking
//! the superclass chain one step at a time and defaulting to the
//! generic object layout when the chain runs out.

use rustc_hash::FxHashMap;

use crate::props::PropertyKind;

/// Closed set of decodable type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// Generic object: a property bag and nothing else
    Object,
    /// Bare field: superclass and sibling links only
    Field,
    Enum,
    Struct,
    State,
    Function,
    Class,
    /// Declared-property record of the given scalar kind
    Property(PropertyKind),
}

impl TypeTag {
    pub fn is_class(&self) -> bool {
        matches!(self, TypeTag::Class)
    }

    pub fn is_property(&self) -> bool {
        matches!(self, TypeTag::Property(_))
    }
}

/// How one declared field decodes from the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    U8,
    U16,
    U32,
    /// Compact index resolved through the name table
    NameRef,
    /// Compact index resolved to an entry and materialized
    ObjectRef,
    /// 16 raw bytes
    Guid,
    /// Compact count followed by that many name references
    NameArray,
    /// Token run sized by the previously decoded `ScriptSize` field
    Script,
    /// Tagged property bag, decoded in place
    Bag,
    /// Class default bag, decoded only after the superclass has loaded
    DeferredBag,
}

/// One slot of a type's ordered layout.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub rule: FieldRule,
}

const fn field(name: &'static str, rule: FieldRule) -> FieldDescriptor {
    FieldDescriptor { name, rule }
}

const FIELD_BASE: &[FieldDescriptor] = &[
    field("SuperField", FieldRule::ObjectRef),
    field("Next", FieldRule::ObjectRef),
];

const STRUCT_TAIL: &[FieldDescriptor] = &[
    field("ScriptText", FieldRule::ObjectRef),
    field("Children", FieldRule::ObjectRef),
    field("FriendlyName", FieldRule::NameRef),
    field("Line", FieldRule::U32),
    field("TextPos", FieldRule::U32),
    field("ScriptSize", FieldRule::U32),
    field("Script", FieldRule::Script),
];

const FUNCTION_TAIL: &[FieldDescriptor] = &[
    field("NativeIndex", FieldRule::U16),
    field("OperPrecedence", FieldRule::U8),
    field("FunctionFlags", FieldRule::U32),
];

const CLASS_TAIL: &[FieldDescriptor] = &[
    field("ClassFlags", FieldRule::U32),
    field("ClassGuid", FieldRule::Guid),
    field("Defaults", FieldRule::DeferredBag),
];

const PROPERTY_TAIL: &[FieldDescriptor] = &[
    field("ArrayDim", FieldRule::U16),
    field("ElementSize", FieldRule::U16),
    field("PropertyFlags", FieldRule::U32),
    field("Category", FieldRule::NameRef),
];

const INNER_REF: FieldDescriptor = field("Inner", FieldRule::ObjectRef);

/// The ordered field layout for one type tag.
pub fn field_layout(tag: TypeTag) -> Vec<FieldDescriptor> {
    match tag {
        TypeTag::Object => vec![field("Properties", FieldRule::Bag)],
        TypeTag::Field => FIELD_BASE.to_vec(),
        TypeTag::Enum => {
            let mut layout = FIELD_BASE.to_vec();
            layout.push(field("Names", FieldRule::NameArray));
            layout
        }
        TypeTag::Struct | TypeTag::State => {
            let mut layout = FIELD_BASE.to_vec();
            layout.extend_from_slice(STRUCT_TAIL);
            layout
        }
        TypeTag::Function => {
            let mut layout = field_layout(TypeTag::Struct);
            layout.extend_from_slice(FUNCTION_TAIL);
            layout
        }
        TypeTag::Class => {
            let mut layout = field_layout(TypeTag::Struct);
            layout.extend_from_slice(CLASS_TAIL);
            layout
        }
        TypeTag::Property(kind) => {
            let mut layout = FIELD_BASE.to_vec();
            layout.extend_from_slice(PROPERTY_TAIL);
            // Byte carries its enum, object its class, struct its type,
            // array its element property
            if matches!(
                kind,
                PropertyKind::Byte | PropertyKind::Object | PropertyKind::Struct | PropertyKind::Array
            ) {
                layout.push(INNER_REF);
            }
            layout
        }
    }
}

/// Maps bare class names to type tags. Built once and handed to the
/// engine at construction; engine instances never share registries.
pub struct SchemaRegistry {
    tags: FxHashMap<String, TypeTag>,
}

impl SchemaRegistry {
    /// The standard mapping for the container's core type names.
    pub fn standard() -> Self {
        let mut tags = FxHashMap::default();
        let mut put = |name: &str, tag: TypeTag| tags.insert(name.to_lowercase(), tag);
        put("Object", TypeTag::Object);
        put("Field", TypeTag::Field);
        put("Enum", TypeTag::Enum);
        put("Struct", TypeTag::Struct);
        put("State", TypeTag::State);
        put("Function", TypeTag::Function);
        put("Class", TypeTag::Class);
        put("ByteProperty", TypeTag::Property(PropertyKind::Byte));
        put("IntProperty", TypeTag::Property(PropertyKind::Int));
        put("BoolProperty", TypeTag::Property(PropertyKind::Bool));
        put("FloatProperty", TypeTag::Property(PropertyKind::Float));
        put("ObjectProperty", TypeTag::Property(PropertyKind::Object));
        put("NameProperty", TypeTag::Property(PropertyKind::Name));
        put("ArrayProperty", TypeTag::Property(PropertyKind::Array));
        put("StructProperty", TypeTag::Property(PropertyKind::Struct));
        put("StrProperty", TypeTag::Property(PropertyKind::Str));
        Self { tags }
    }

    /// Tag for a bare (undotted) class name, if registered.
    pub fn tag_of(&self, bare_name: &str) -> Option<TypeTag> {
        self.tags.get(&bare_name.to_lowercase()).copied()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let reg = SchemaRegistry::standard();
        assert_eq!(reg.tag_of("class"), Some(TypeTag::Class));
        assert_eq!(
            reg.tag_of("INTPROPERTY"),
            Some(TypeTag::Property(PropertyKind::Int))
        );
        assert_eq!(reg.tag_of("Pawn"), None);
    }

    #[test]
    fn test_layouts_nest() {
        let class = field_layout(TypeTag::Class);
        let function = field_layout(TypeTag::Function);
        // both extend the struct layout
        let strukt = field_layout(TypeTag::Struct);
        assert_eq!(class[strukt.len()].name, "ClassFlags");
        assert_eq!(function[strukt.len()].name, "NativeIndex");
        assert_eq!(class.last().unwrap().rule, FieldRule::DeferredBag);
        assert_eq!(function.last().unwrap().name, "FunctionFlags");
        assert!(strukt.iter().any(|f| f.rule == FieldRule::Script));
    }

    #[test]
    fn test_property_inner_refs() {
        let arr = field_layout(TypeTag::Property(PropertyKind::Array));
        assert_eq!(arr.last().unwrap().name, "Inner");
        let int = field_layout(TypeTag::Property(PropertyKind::Int));
        assert_eq!(int.last().unwrap().name, "Category");
    }
}
