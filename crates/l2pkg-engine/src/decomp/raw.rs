//! Raw-byte decompilation
//!
//! A self-contained recursive-descent reader over unprocessed
//! instruction bytes, used when no typed token decode is wanted. Keeps
//! its own program counter; unknown opcodes become inline comments plus
//! a diagnostic hex window instead of aborting the decompile.

use std::sync::Arc;

use tracing::warn;

use crate::archive::ArchiveHandle;
use crate::bytecode::{op, OpcodeRegistry, Shape};
use crate::error::DecodeError;
use crate::graph::GraphEngine;
use crate::reader::RecordReader;

/// Marker returned by the end-of-params opcode; enclosing calls consume
/// it to close their parenthesis.
const END_PARAMS: &str = ")";

pub struct RawDecompiler<'a> {
    bytes: &'a [u8],
    reader: RecordReader<'a>,
    archive: &'a ArchiveHandle,
    registry: &'a OpcodeRegistry,
    engine: Option<&'a Arc<GraphEngine>>,
}

impl<'a> RawDecompiler<'a> {
    pub fn new(
        bytes: &'a [u8],
        archive: &'a ArchiveHandle,
        registry: &'a OpcodeRegistry,
        engine: Option<&'a Arc<GraphEngine>>,
    ) -> Self {
        Self {
            bytes,
            reader: RecordReader::new(bytes, archive.character_encoding()),
            archive,
            registry,
            engine,
        }
    }

    /// Decompile the whole byte run as statement lines. A top-level
    /// nothing opcode ends the function; what follows is padding.
    pub fn decompile(mut self) -> String {
        let mut out = String::new();
        while self.reader.remaining() > 0 {
            let mut probe = self.reader.clone();
            if matches!(probe.read_u8(), Ok(op::NOTHING)) {
                break;
            }
            match self.next_expr() {
                Ok(text) => {
                    if !text.is_empty() && text != END_PARAMS {
                        out.push_str(&text);
                        out.push_str(";\n");
                    }
                }
                Err(e) => {
                    warn!(error = %e, pos = self.reader.pos(), "raw decompile stopped early");
                    out.push_str(&format!("/* {} */\n", e));
                    break;
                }
            }
        }
        out
    }

    /// Decode and render one expression.
    fn next_expr(&mut self) -> Result<String, DecodeError> {
        let pos = self.reader.pos();
        let opcode = self.reader.read_u8()?;
        let text = match opcode {
            op::LOCAL_VARIABLE
            | op::INSTANCE_VARIABLE
            | op::DEFAULT_VARIABLE
            | op::NATIVE_PARM => {
                let reference = self.reader.read_compact()?;
                self.object_name(reference)
            }
            op::BOOL_VARIABLE => self.next_expr()?,
            op::RETURN => {
                let value = self.next_expr()?;
                if value.is_empty() {
                    "return".to_string()
                } else {
                    format!("return {}", value)
                }
            }
            op::JUMP => {
                // jumps are elided, not followed
                self.reader.read_u16()?;
                String::new()
            }
            op::JUMP_IF_NOT => {
                let target = self.reader.read_u16()?;
                format!("if (!{}) goto 0x{:04x}", self.next_expr()?, target)
            }
            op::STOP => "stop".to_string(),
            op::NOTHING => String::new(),
            op::LET | op::LET_BOOL => {
                format!("{} = {}", self.next_expr()?, self.next_expr()?)
            }
            op::END_FUNCTION_PARMS => END_PARAMS.to_string(),
            op::SELF => "self".to_string(),
            op::SKIP => {
                self.reader.read_u16()?;
                self.next_expr()?
            }
            op::CONTEXT => {
                let left = self.next_expr()?;
                // 3-byte inline jump-optimization field between operands
                self.reader.read_u16()?;
                self.reader.read_u8()?;
                format!("{}.{}", left, self.next_expr()?)
            }
            op::VIRTUAL_FUNCTION | op::GLOBAL_FUNCTION => {
                let name = self.read_name()?;
                self.call(name)?
            }
            op::FINAL_FUNCTION => {
                let reference = self.reader.read_compact()?;
                let name = self.object_name(reference);
                self.call(name)?
            }
            op::INT_CONST => self.reader.read_i32()?.to_string(),
            op::FLOAT_CONST => format!("{}f", self.reader.read_f32()?),
            op::STRING_CONST => format!("\"{}\"", self.reader.read_string()?),
            op::OBJECT_CONST => {
                let reference = self.reader.read_compact()?;
                format!("'{}'", self.full_name(reference))
            }
            op::NAME_CONST => format!("'{}'", self.read_name()?),
            op::ROTATION_CONST => {
                let pitch = self.reader.read_i32()?;
                let yaw = self.reader.read_i32()?;
                let roll = self.reader.read_i32()?;
                format!("rot({}, {}, {})", pitch, yaw, roll)
            }
            op::VECTOR_CONST => {
                let x = self.reader.read_f32()?;
                let y = self.reader.read_f32()?;
                let z = self.reader.read_f32()?;
                format!("vec({}, {}, {})", x, y, z)
            }
            op::BYTE_CONST | op::INT_CONST_BYTE => self.reader.read_u8()?.to_string(),
            op::INT_ZERO => "0".to_string(),
            op::INT_ONE => "1".to_string(),
            op::TRUE => "true".to_string(),
            op::FALSE => "false".to_string(),
            op::NO_OBJECT => "None".to_string(),
            op::CONVERSION_TABLE => {
                let cast_op = self.reader.read_u8()?;
                match self.registry.conversion_shape(cast_op) {
                    Some(Shape::Conversion(cast)) => format!("{}({})", cast, self.next_expr()?),
                    _ => self.unknown(cast_op, pos),
                }
            }
            _ => {
                // extended-native range; only registered indices render
                let index = if (op::EXTENDED_NATIVE_BASE..0x70).contains(&opcode) {
                    ((opcode - op::EXTENDED_NATIVE_BASE) as u16) << 8
                        | self.reader.read_u8()? as u16
                } else {
                    opcode as u16
                };
                match self.native_name(index) {
                    Some(name) => self.call(name)?,
                    None => self.unknown(opcode, pos),
                }
            }
        };
        Ok(text)
    }

    /// Accumulate comma-joined parameters until the end-of-params opcode.
    fn call(&mut self, name: String) -> Result<String, DecodeError> {
        let mut params = Vec::new();
        loop {
            let expr = self.next_expr()?;
            if expr == END_PARAMS {
                break;
            }
            if !expr.is_empty() {
                params.push(expr);
            }
        }
        Ok(format!("{}({})", name, params.join(", ")))
    }

    fn unknown(&self, opcode: u8, pos: usize) -> String {
        let lo = pos.saturating_sub(8);
        let hi = (pos + 8).min(self.bytes.len());
        warn!(
            opcode = format!("{:#04x}", opcode),
            pos,
            window = hex::encode(&self.bytes[lo..hi]),
            "unknown opcode in raw decompile"
        );
        format!("/* Unknown 0x{:02x} */", opcode)
    }

    fn object_name(&self, reference: i32) -> String {
        match self.archive.resolve_reference(reference) {
            Some(entry) => entry.object_name,
            None => "None".to_string(),
        }
    }

    fn full_name(&self, reference: i32) -> String {
        match self.archive.resolve_reference(reference) {
            Some(entry) => entry.full_name,
            None => "None".to_string(),
        }
    }

    fn native_name(&self, index: u16) -> Option<String> {
        if index < op::FIRST_NATIVE {
            return None;
        }
        let engine = self.engine?;
        let function = engine.native_function_by_index(index)?;
        Some(function.object_name().to_string())
    }

    fn read_name(&mut self) -> Result<String, DecodeError> {
        let index = self.reader.read_compact()?;
        Ok(self.archive.name_by_index(index)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryArchiveBuilder;

    fn archive_with(names: &[&str]) -> ArchiveHandle {
        let mut b = MemoryArchiveBuilder::new("mem:raw");
        for name in names {
            b.name(name);
        }
        b.build()
    }

    #[test]
    fn test_int_zero_then_end_params() {
        let archive = archive_with(&[]);
        let registry = OpcodeRegistry::standard();
        let mut d = RawDecompiler::new(&[0x25, 0x16], &archive, &registry, None);
        assert_eq!(d.next_expr().unwrap(), "0");
        // the sentinel surfaces as the close-paren marker for the caller
        assert_eq!(d.next_expr().unwrap(), ")");
    }

    #[test]
    fn test_call_consumes_params_sentinel() {
        let archive = archive_with(&["Log"]);
        let name_idx = archive.name_index("Log").unwrap() as u8;
        let registry = OpcodeRegistry::standard();
        let bytes = [0x1B, name_idx, 0x25, 0x26, 0x16];
        let d = RawDecompiler::new(&bytes, &archive, &registry, None);
        assert_eq!(d.decompile(), "Log(0, 1);\n");
    }

    #[test]
    fn test_unknown_opcode_becomes_comment() {
        let archive = archive_with(&[]);
        let registry = OpcodeRegistry::standard();
        let d = RawDecompiler::new(&[0xFF, 0x25, 0x16], &archive, &registry, None);
        let text = d.decompile();
        assert!(text.contains("Unknown 0xff"), "got: {}", text);
    }

    #[test]
    fn test_top_level_nothing_ends_function() {
        let archive = archive_with(&[]);
        let registry = OpcodeRegistry::standard();
        let bytes = [0x08, 0x0B, 0x25];
        let d = RawDecompiler::new(&bytes, &archive, &registry, None);
        assert_eq!(d.decompile(), "stop;\n");
    }

    #[test]
    fn test_context_skips_jump_field() {
        let mut b = MemoryArchiveBuilder::new("mem:ctx");
        b.add_export("Weapon", "Core.ObjectProperty", "P.A.Weapon", 0, None, vec![]);
        b.add_export("Ammo", "Core.IntProperty", "P.A.Ammo", 0, None, vec![]);
        let archive: ArchiveHandle = b.build();
        let registry = OpcodeRegistry::standard();
        // Context: left=InstanceVariable(1), 3 filler bytes, right=InstanceVariable(2)
        let bytes = [0x19, 0x01, 0x01, 0xAA, 0xBB, 0xCC, 0x01, 0x02];
        let d = RawDecompiler::new(&bytes, &archive, &registry, None);
        assert_eq!(d.decompile(), "Weapon.Ammo;\n");
    }
}
