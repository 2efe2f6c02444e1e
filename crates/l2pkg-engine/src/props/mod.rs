//! Tagged property-bag sub-format
//!
//! Class and instance records carry their field values as a self-describing
//! sequence of tagged records terminated by the reserved name `None`.
//! [`codec`] owns the wire format, [`template`] the declared-field
//! descriptions, [`value`] the decoded slot values.

pub mod codec;
pub mod template;
pub mod value;

pub use codec::{
    read_merged_bag, read_property_bag, selector_for_len, write_merged_bag, write_property_bag,
    NoTemplates, PropertyRecord, TemplateSource, BAG_TERMINATOR,
};
pub use template::{InnerType, PropertyKind, PropertyTemplate};
pub use value::{merge_records, resolve_default, PropertyValue, Slot};
