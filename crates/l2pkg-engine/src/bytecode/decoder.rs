//! Stateful token decode/encode
//!
//! The 0x39 sentinel flips the session into conversion mode before table
//! lookup, so the sentinel byte itself never decodes as a token. One
//! conversion token consumes the mode; its operand decodes against the
//! main table again. The 0x39 slot of the conversion table (the
//! RotatorToVector cast) is the exception and leaves the mode set, which
//! mirrors how the on-disk compiler emits it.

use crate::archive::ArchiveStore;
use crate::error::DecodeError;
use crate::reader::{RecordReader, RecordWriter};

use super::opcode::{op, OpcodeRegistry, Shape};
use super::token::{Token, TokenKind};

/// Per-session decode state.
#[derive(Debug, Default)]
pub struct DecodingContext {
    conversion_mode: bool,
}

impl DecodingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_conversion_mode(&self) -> bool {
        self.conversion_mode
    }
}

/// Decodes instruction bytes into [`Token`]s against one archive's name
/// table and character encoding.
pub struct TokenDecoder<'a> {
    registry: &'a OpcodeRegistry,
    store: &'a dyn ArchiveStore,
}

impl<'a> TokenDecoder<'a> {
    pub fn new(registry: &'a OpcodeRegistry, store: &'a dyn ArchiveStore) -> Self {
        Self { registry, store }
    }

    /// Decode one token, including any nested operand tokens.
    pub fn decode_token(
        &self,
        r: &mut RecordReader<'_>,
        ctx: &mut DecodingContext,
    ) -> Result<Token, DecodeError> {
        let offset = r.pos();
        let opcode = r.read_u8()?;

        if !ctx.conversion_mode {
            if opcode == op::CONVERSION_TABLE {
                ctx.conversion_mode = true;
                return self.decode_token(r, ctx);
            }
            if opcode >= op::EXTENDED_NATIVE_BASE {
                return self.decode_native(r, ctx, opcode);
            }
        }

        let (shape, table) = if ctx.conversion_mode {
            (self.registry.conversion_shape(opcode), "conversion")
        } else {
            (self.registry.main_shape(opcode), "main")
        };
        let shape = shape.ok_or(DecodeError::UnknownOpcode {
            opcode,
            table,
            offset,
        })?;

        // One conversion token consumes the mode; clearing before the
        // operand decode keeps nested tokens on the main table. The 0x39
        // cast slot leaves the mode set.
        if shape.is_conversion() && opcode != op::CONVERSION_TABLE {
            ctx.conversion_mode = false;
        }

        let kind = match shape {
            Shape::LocalVariable => TokenKind::LocalVariable {
                object: r.read_compact()?,
            },
            Shape::InstanceVariable => TokenKind::InstanceVariable {
                object: r.read_compact()?,
            },
            Shape::DefaultVariable => TokenKind::DefaultVariable {
                object: r.read_compact()?,
            },
            Shape::BoolVariable => TokenKind::BoolVariable {
                inner: Box::new(self.decode_token(r, ctx)?),
            },
            Shape::NativeParm => TokenKind::NativeParm {
                object: r.read_compact()?,
            },
            Shape::Return => TokenKind::Return {
                value: Box::new(self.decode_token(r, ctx)?),
            },
            Shape::Stop => TokenKind::Stop,
            Shape::Nothing => TokenKind::Nothing,
            Shape::EndFunctionParms => TokenKind::EndFunctionParms,
            Shape::SelfRef => TokenKind::SelfRef,
            Shape::NoObject => TokenKind::NoObject,
            Shape::IntZero => TokenKind::IntZero,
            Shape::IntOne => TokenKind::IntOne,
            Shape::True => TokenKind::True,
            Shape::False => TokenKind::False,
            Shape::Jump => TokenKind::Jump {
                target: r.read_u16()?,
            },
            Shape::JumpIfNot => TokenKind::JumpIfNot {
                target: r.read_u16()?,
                condition: Box::new(self.decode_token(r, ctx)?),
            },
            Shape::Context => {
                let left = Box::new(self.decode_token(r, ctx)?);
                let skip = r.read_u16()?;
                let size = r.read_u8()?;
                let right = Box::new(self.decode_token(r, ctx)?);
                TokenKind::Context {
                    left,
                    skip,
                    size,
                    right,
                }
            }
            Shape::Skip => TokenKind::Skip {
                size: r.read_u16()?,
                inner: Box::new(self.decode_token(r, ctx)?),
            },
            Shape::Let => TokenKind::Let {
                target: Box::new(self.decode_token(r, ctx)?),
                value: Box::new(self.decode_token(r, ctx)?),
            },
            Shape::LetBool => TokenKind::LetBool {
                target: Box::new(self.decode_token(r, ctx)?),
                value: Box::new(self.decode_token(r, ctx)?),
            },
            Shape::VirtualFunction => TokenKind::VirtualFunction {
                name: self.read_name(r)?,
                params: self.decode_params(r, ctx)?,
            },
            Shape::FinalFunction => TokenKind::FinalFunction {
                object: r.read_compact()?,
                params: self.decode_params(r, ctx)?,
            },
            Shape::GlobalFunction => TokenKind::GlobalFunction {
                name: self.read_name(r)?,
                params: self.decode_params(r, ctx)?,
            },
            Shape::IntConst => TokenKind::IntConst(r.read_i32()?),
            Shape::FloatConst => TokenKind::FloatConst(r.read_f32()?),
            Shape::StringConst => TokenKind::StringConst(r.read_string()?),
            Shape::ObjectConst => TokenKind::ObjectConst {
                object: r.read_compact()?,
            },
            Shape::NameConst => TokenKind::NameConst(self.read_name(r)?),
            Shape::RotationConst => TokenKind::RotationConst {
                pitch: r.read_i32()?,
                yaw: r.read_i32()?,
                roll: r.read_i32()?,
            },
            Shape::VectorConst => TokenKind::VectorConst {
                x: r.read_f32()?,
                y: r.read_f32()?,
                z: r.read_f32()?,
            },
            Shape::ByteConst => TokenKind::ByteConst(r.read_u8()?),
            Shape::IntConstByte => TokenKind::IntConstByte(r.read_u8()?),
            Shape::Conversion(cast) => TokenKind::Conversion {
                cast,
                inner: Box::new(self.decode_token(r, ctx)?),
            },
        };

        Ok(Token {
            opcode: opcode as u16,
            kind,
        })
    }

    fn decode_native(
        &self,
        r: &mut RecordReader<'_>,
        ctx: &mut DecodingContext,
        opcode: u8,
    ) -> Result<Token, DecodeError> {
        let index = if opcode < 0x70 {
            ((opcode - op::EXTENDED_NATIVE_BASE) as u16) << 8 | r.read_u8()? as u16
        } else {
            opcode as u16
        };
        if index < op::FIRST_NATIVE {
            return Err(DecodeError::BadNativeIndex(index));
        }
        let params = self.decode_params(r, ctx)?;
        Ok(Token {
            opcode: index,
            kind: TokenKind::NativeFunction { index, params },
        })
    }

    /// Decode a function-parameter list. The end-of-params sentinel is
    /// consumed but never returned.
    pub fn decode_params(
        &self,
        r: &mut RecordReader<'_>,
        ctx: &mut DecodingContext,
    ) -> Result<Vec<Token>, DecodeError> {
        let mut params = Vec::new();
        loop {
            let token = self.decode_token(r, ctx)?;
            if matches!(token.kind, TokenKind::EndFunctionParms) {
                return Ok(params);
            }
            params.push(token);
        }
    }

    /// Decode tokens until `script_size` bytes of the record have been
    /// consumed, measured from the current cursor position.
    pub fn decode_block(
        &self,
        r: &mut RecordReader<'_>,
        ctx: &mut DecodingContext,
        script_size: usize,
    ) -> Result<Vec<Token>, DecodeError> {
        let end = r.pos() + script_size;
        let mut tokens = Vec::new();
        while r.pos() < end {
            tokens.push(self.decode_token(r, ctx)?);
        }
        Ok(tokens)
    }

    fn read_name(&self, r: &mut RecordReader<'_>) -> Result<String, DecodeError> {
        let index = r.read_compact()?;
        Ok(self.store.name_by_index(index)?.to_string())
    }

    fn write_name(&self, w: &mut RecordWriter, name: &str) -> Result<(), DecodeError> {
        let index = self
            .store
            .name_index(name)
            .ok_or_else(|| DecodeError::Record(format!("name {:?} is not in the table", name)))?;
        w.write_compact(index);
        Ok(())
    }

    /// Encode one token back into instruction bytes. Conversion tokens
    /// re-emit the 0x39 sentinel prefix; parameter lists re-emit a fresh
    /// end-of-params sentinel after the last parameter.
    pub fn write_token(&self, w: &mut RecordWriter, token: &Token) -> Result<(), DecodeError> {
        match &token.kind {
            TokenKind::NativeFunction { index, params } => {
                if *index > 0xFF {
                    w.write_u8(op::EXTENDED_NATIVE_BASE + (index >> 8) as u8);
                    w.write_u8((index & 0xFF) as u8);
                } else {
                    w.write_u8(*index as u8);
                }
                return self.write_params(w, params);
            }
            TokenKind::Conversion { inner, .. } => {
                w.write_u8(op::CONVERSION_TABLE);
                w.write_u8(token.opcode as u8);
                return self.write_token(w, inner);
            }
            _ => {}
        }

        w.write_u8(token.opcode as u8);
        match &token.kind {
            TokenKind::LocalVariable { object }
            | TokenKind::InstanceVariable { object }
            | TokenKind::DefaultVariable { object }
            | TokenKind::NativeParm { object }
            | TokenKind::ObjectConst { object } => w.write_compact(*object),
            TokenKind::BoolVariable { inner } => self.write_token(w, inner)?,
            TokenKind::Return { value } => self.write_token(w, value)?,
            TokenKind::Stop
            | TokenKind::Nothing
            | TokenKind::EndFunctionParms
            | TokenKind::SelfRef
            | TokenKind::NoObject
            | TokenKind::IntZero
            | TokenKind::IntOne
            | TokenKind::True
            | TokenKind::False => {}
            TokenKind::Jump { target } => w.write_u16(*target),
            TokenKind::JumpIfNot { target, condition } => {
                w.write_u16(*target);
                self.write_token(w, condition)?;
            }
            TokenKind::Context {
                left,
                skip,
                size,
                right,
            } => {
                self.write_token(w, left)?;
                w.write_u16(*skip);
                w.write_u8(*size);
                self.write_token(w, right)?;
            }
            TokenKind::Skip { size, inner } => {
                w.write_u16(*size);
                self.write_token(w, inner)?;
            }
            TokenKind::Let { target, value } | TokenKind::LetBool { target, value } => {
                self.write_token(w, target)?;
                self.write_token(w, value)?;
            }
            TokenKind::VirtualFunction { name, params }
            | TokenKind::GlobalFunction { name, params } => {
                self.write_name(w, name)?;
                self.write_params(w, params)?;
            }
            TokenKind::FinalFunction { object, params } => {
                w.write_compact(*object);
                self.write_params(w, params)?;
            }
            TokenKind::IntConst(v) => w.write_i32(*v),
            TokenKind::FloatConst(v) => w.write_f32(*v),
            TokenKind::StringConst(v) => w.write_string(v),
            TokenKind::NameConst(v) => self.write_name(w, v)?,
            TokenKind::RotationConst { pitch, yaw, roll } => {
                w.write_i32(*pitch);
                w.write_i32(*yaw);
                w.write_i32(*roll);
            }
            TokenKind::VectorConst { x, y, z } => {
                w.write_f32(*x);
                w.write_f32(*y);
                w.write_f32(*z);
            }
            TokenKind::ByteConst(v) | TokenKind::IntConstByte(v) => w.write_u8(*v),
            TokenKind::NativeFunction { .. } | TokenKind::Conversion { .. } => unreachable!(),
        }
        Ok(())
    }

    fn write_params(&self, w: &mut RecordWriter, params: &[Token]) -> Result<(), DecodeError> {
        for param in params {
            self.write_token(w, param)?;
        }
        w.write_u8(op::END_FUNCTION_PARMS);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Charset;
    use crate::mem::MemoryArchiveBuilder;

    fn test_store() -> std::sync::Arc<crate::mem::MemoryArchive> {
        let mut b = MemoryArchiveBuilder::new("mem:bytecode");
        b.name("Log");
        b.name("Attack");
        b.build()
    }

    fn decode_all(bytes: &[u8]) -> Vec<Token> {
        let store = test_store();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());
        let mut r = RecordReader::new(bytes, Charset::Latin1);
        let mut ctx = DecodingContext::new();
        decoder
            .decode_block(&mut r, &mut ctx, bytes.len())
            .unwrap()
    }

    #[test]
    fn test_params_exclude_sentinel() {
        // INT_ZERO then END_FUNCTION_PARMS: one parameter, sentinel consumed
        let store = test_store();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());
        let mut r = RecordReader::new(&[0x25, 0x16], Charset::Latin1);
        let mut ctx = DecodingContext::new();
        let params = decoder.decode_params(&mut r, &mut ctx).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].kind, TokenKind::IntZero);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_conversion_mode_consumed() {
        // 0x39 sentinel, IntToFloat cast, IntZero operand
        let tokens = decode_all(&[0x39, 0x3F, 0x25]);
        assert_eq!(tokens.len(), 1);
        match &tokens[0].kind {
            TokenKind::Conversion { cast, inner } => {
                assert_eq!(*cast, "IntToFloat");
                assert_eq!(inner.kind, TokenKind::IntZero);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conversion_operand_uses_main_table() {
        // The cast operand is itself a virtual call; 0x1B only exists in
        // the main table, so the mode must clear before the operand decode.
        let store = test_store();
        let name_idx = store.name_index("Log").unwrap();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());
        let mut bytes = vec![0x39, 0x53, 0x1B];
        bytes.push(name_idx as u8); // compact index, small enough for one byte
        bytes.push(0x16);
        let mut r = RecordReader::new(&bytes, Charset::Latin1);
        let mut ctx = DecodingContext::new();
        let token = decoder.decode_token(&mut r, &mut ctx).unwrap();
        match token.kind {
            TokenKind::Conversion { cast, inner } => {
                assert_eq!(cast, "IntToString");
                assert!(matches!(inner.kind, TokenKind::VirtualFunction { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!ctx.in_conversion_mode());
    }

    #[test]
    fn test_extended_native_two_byte_form() {
        // 0x61 0x05 -> native index 0x105
        let tokens = decode_all(&[0x61, 0x05, 0x16]);
        match &tokens[0].kind {
            TokenKind::NativeFunction { index, params } => {
                assert_eq!(*index, 0x105);
                assert!(params.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_byte_native() {
        let tokens = decode_all(&[0x70, 0x25, 0x16]);
        match &tokens[0].kind {
            TokenKind::NativeFunction { index, params } => {
                assert_eq!(*index, 0x70);
                assert_eq!(params.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_native_index_below_threshold() {
        let store = test_store();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());
        let mut r = RecordReader::new(&[0x60, 0x10], Charset::Latin1);
        let mut ctx = DecodingContext::new();
        let err = decoder.decode_token(&mut r, &mut ctx).unwrap_err();
        assert!(matches!(err, DecodeError::BadNativeIndex(0x10)));
    }

    #[test]
    fn test_unknown_opcode_names_table() {
        let store = test_store();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());
        let mut r = RecordReader::new(&[0x03], Charset::Latin1);
        let mut ctx = DecodingContext::new();
        match decoder.decode_token(&mut r, &mut ctx).unwrap_err() {
            DecodeError::UnknownOpcode {
                opcode,
                table,
                offset,
            } => {
                assert_eq!(opcode, 0x03);
                assert_eq!(table, "main");
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_function_call() {
        let store = test_store();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());

        let name_idx = store.name_index("Attack").unwrap();
        let mut bytes = vec![0x1B];
        bytes.push(name_idx as u8);
        bytes.extend_from_slice(&[0x26, 0x1D]);
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.push(0x16);

        let mut r = RecordReader::new(&bytes, Charset::Latin1);
        let mut ctx = DecodingContext::new();
        let token = decoder.decode_token(&mut r, &mut ctx).unwrap();
        assert_eq!(r.remaining(), 0);

        let mut w = RecordWriter::new(Charset::Latin1);
        decoder.write_token(&mut w, &token).unwrap();
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn test_roundtrip_conversion_and_constants() {
        let store = test_store();
        let registry = OpcodeRegistry::standard();
        let decoder = TokenDecoder::new(&registry, store.as_ref());

        // Let: target instance variable, value FloatToInt(FloatConst)
        let mut bytes = vec![0x0F, 0x01, 0x02, 0x39, 0x44, 0x1E];
        bytes.extend_from_slice(&2.5f32.to_le_bytes());

        let mut r = RecordReader::new(&bytes, Charset::Latin1);
        let mut ctx = DecodingContext::new();
        let token = decoder.decode_token(&mut r, &mut ctx).unwrap();
        assert_eq!(r.remaining(), 0);

        let mut w = RecordWriter::new(Charset::Latin1);
        decoder.write_token(&mut w, &token).unwrap();
        assert_eq!(w.into_bytes(), bytes);
    }
}
