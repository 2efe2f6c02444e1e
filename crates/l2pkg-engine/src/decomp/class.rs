//! Whole-class decompilation

use std::sync::Arc;

use tracing::warn;

use crate::archive::{ArchiveHandle, Entry};
use crate::error::EngineError;
use crate::graph::{GraphEngine, TypeTag};

use super::render::{render_body, RenderContext};

/// `var` line type for a property class name: strip the `Property`
/// suffix and lower-case what remains.
fn var_type(bare_class: &str) -> String {
    bare_class
        .strip_suffix("Property")
        .unwrap_or(bare_class)
        .to_lowercase()
}

/// Decompile a class and its children into pseudo-source: the class
/// header, enum and struct stubs, one `var` line per property, and a
/// decompiled body per function.
pub fn decompile_class(
    engine: &Arc<GraphEngine>,
    archive: &ArchiveHandle,
    class_name: &str,
) -> Result<String, EngineError> {
    let class = engine.materialize_by_name(archive, class_name, |e: &Entry| {
        e.bare_class_name() == "Class"
    })?;
    let class_ref = class.entry().reference;

    let mut out = String::new();
    match engine.superclass_of(archive, class.full_name()) {
        Some(superclass) => {
            let bare = superclass.rsplit('.').next().unwrap_or(&superclass);
            out.push_str(&format!("class {} extends {};\n", class.object_name(), bare));
        }
        None => out.push_str(&format!("class {};\n", class.object_name())),
    }

    // children are the exports owned by this class entry
    let children: Vec<Entry> = archive
        .export_table()
        .iter()
        .filter(|e| e.package_ref == class_ref)
        .cloned()
        .collect();

    let ctx = RenderContext {
        archive,
        engine: Some(engine),
    };

    for child in &children {
        let instance = match engine.materialize(archive, child) {
            Ok(instance) => instance,
            Err(e) => {
                warn!(child = %child.full_name, error = %e, "child failed to materialize");
                continue;
            }
        };
        match instance.tag() {
            TypeTag::Enum => {
                out.push('\n');
                out.push_str(&format!("enum {};\n", child.object_name));
            }
            TypeTag::Struct => {
                out.push('\n');
                out.push_str(&format!("struct {};\n", child.object_name));
            }
            TypeTag::Property(_) => {
                out.push_str(&format!(
                    "var {} {};\n",
                    var_type(child.bare_class_name()),
                    child.object_name
                ));
            }
            TypeTag::Function => {
                let body = match instance.tokens() {
                    Some(tokens) => render_body(&tokens, &ctx),
                    None => String::new(),
                };
                out.push('\n');
                out.push_str(&format!(
                    "function {}()\n{{\n{}}}\n",
                    child.object_name, body
                ));
            }
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_type_strips_suffix() {
        assert_eq!(var_type("IntProperty"), "int");
        assert_eq!(var_type("StrProperty"), "str");
        assert_eq!(var_type("Struct"), "struct");
    }
}
