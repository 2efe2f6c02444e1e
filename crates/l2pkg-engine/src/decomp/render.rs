//! Token-sequence rendering

use std::sync::Arc;

use crate::archive::ArchiveHandle;
use crate::bytecode::{Token, TokenKind};
use crate::graph::GraphEngine;

/// Name and reference resolution for the renderer.
pub struct RenderContext<'a> {
    pub archive: &'a ArchiveHandle,
    /// Needed for native-call name resolution; absent, native calls
    /// render by index
    pub engine: Option<&'a Arc<GraphEngine>>,
}

impl RenderContext<'_> {
    /// Bare name of a referenced object, for variable accesses.
    pub fn object_name(&self, reference: i32) -> String {
        match self.archive.resolve_reference(reference) {
            Some(entry) => entry.object_name,
            None => "None".to_string(),
        }
    }

    /// Qualified name of a referenced object, for object literals.
    pub fn full_name(&self, reference: i32) -> String {
        match self.archive.resolve_reference(reference) {
            Some(entry) => entry.full_name,
            None => "None".to_string(),
        }
    }

    pub fn native_name(&self, index: u16) -> Option<String> {
        let engine = self.engine?;
        let function = engine.native_function_by_index(index)?;
        Some(function.object_name().to_string())
    }
}

/// Render one token as expression text.
pub fn render_token(token: &Token, ctx: &RenderContext<'_>) -> String {
    match &token.kind {
        TokenKind::LocalVariable { object }
        | TokenKind::InstanceVariable { object }
        | TokenKind::DefaultVariable { object }
        | TokenKind::NativeParm { object } => ctx.object_name(*object),
        TokenKind::BoolVariable { inner } | TokenKind::Skip { inner, .. } => {
            render_token(inner, ctx)
        }
        TokenKind::Return { value } => {
            let value = render_token(value, ctx);
            if value.is_empty() {
                "return".to_string()
            } else {
                format!("return {}", value)
            }
        }
        TokenKind::Stop => "stop".to_string(),
        TokenKind::Nothing | TokenKind::EndFunctionParms => String::new(),
        TokenKind::SelfRef => "self".to_string(),
        TokenKind::NoObject => "None".to_string(),
        TokenKind::IntZero => "0".to_string(),
        TokenKind::IntOne => "1".to_string(),
        TokenKind::True => "true".to_string(),
        TokenKind::False => "false".to_string(),
        // control flow is not reconstructed; unconditional jumps are elided
        TokenKind::Jump { .. } => String::new(),
        TokenKind::JumpIfNot { target, condition } => {
            format!("if (!{}) goto 0x{:04x}", render_token(condition, ctx), target)
        }
        TokenKind::Context { left, right, .. } => {
            format!("{}.{}", render_token(left, ctx), render_token(right, ctx))
        }
        TokenKind::Let { target, value } | TokenKind::LetBool { target, value } => {
            format!("{} = {}", render_token(target, ctx), render_token(value, ctx))
        }
        TokenKind::VirtualFunction { name, params }
        | TokenKind::GlobalFunction { name, params } => {
            format!("{}({})", name, render_params(params, ctx))
        }
        TokenKind::FinalFunction { object, params } => {
            format!("{}({})", ctx.object_name(*object), render_params(params, ctx))
        }
        TokenKind::NativeFunction { index, params } => {
            let name = ctx
                .native_name(*index)
                .unwrap_or_else(|| format!("Native_{}", index));
            format!("{}({})", name, render_params(params, ctx))
        }
        TokenKind::IntConst(v) => v.to_string(),
        TokenKind::FloatConst(v) => format!("{}f", v),
        TokenKind::StringConst(v) => format!("\"{}\"", v),
        TokenKind::ObjectConst { object } => format!("'{}'", ctx.full_name(*object)),
        TokenKind::NameConst(v) => format!("'{}'", v),
        TokenKind::RotationConst { pitch, yaw, roll } => {
            format!("rot({}, {}, {})", pitch, yaw, roll)
        }
        TokenKind::VectorConst { x, y, z } => format!("vec({}, {}, {})", x, y, z),
        TokenKind::ByteConst(v) | TokenKind::IntConstByte(v) => v.to_string(),
        TokenKind::Conversion { cast, inner } => {
            format!("{}({})", cast, render_token(inner, ctx))
        }
    }
}

fn render_params(params: &[Token], ctx: &RenderContext<'_>) -> String {
    params
        .iter()
        .map(|p| render_token(p, ctx))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a function body: one indented statement line per top-level
/// token. A top-level `Nothing` ends the body; remaining tokens are
/// padding.
pub fn render_body(tokens: &[Token], ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.ends_body() {
            break;
        }
        let text = render_token(token, ctx);
        if !text.is_empty() {
            out.push('\t');
            out.push_str(&text);
            out.push_str(";\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryArchiveBuilder;

    fn ctx_archive() -> ArchiveHandle {
        let mut b = MemoryArchiveBuilder::new("mem:render");
        b.add_export("Health", "Core.IntProperty", "P.A.Health", 0, None, vec![]);
        b.build()
    }

    #[test]
    fn test_render_assignment() {
        let archive = ctx_archive();
        let ctx = RenderContext {
            archive: &archive,
            engine: None,
        };
        let token = Token {
            opcode: 0x0F,
            kind: TokenKind::Let {
                target: Box::new(Token {
                    opcode: 0x01,
                    kind: TokenKind::InstanceVariable { object: 1 },
                }),
                value: Box::new(Token {
                    opcode: 0x1D,
                    kind: TokenKind::IntConst(100),
                }),
            },
        };
        assert_eq!(render_token(&token, &ctx), "Health = 100");
    }

    #[test]
    fn test_render_call_and_constants() {
        let archive = ctx_archive();
        let ctx = RenderContext {
            archive: &archive,
            engine: None,
        };
        let token = Token {
            opcode: 0x1B,
            kind: TokenKind::VirtualFunction {
                name: "Log".to_string(),
                params: vec![
                    Token {
                        opcode: 0x1F,
                        kind: TokenKind::StringConst("hp".to_string()),
                    },
                    Token {
                        opcode: 0x1E,
                        kind: TokenKind::FloatConst(1.5),
                    },
                ],
            },
        };
        assert_eq!(render_token(&token, &ctx), "Log(\"hp\", 1.5f)");
    }

    #[test]
    fn test_body_stops_at_nothing() {
        let archive = ctx_archive();
        let ctx = RenderContext {
            archive: &archive,
            engine: None,
        };
        let tokens = vec![
            Token {
                opcode: 0x17,
                kind: TokenKind::SelfRef,
            },
            Token {
                opcode: 0x0B,
                kind: TokenKind::Nothing,
            },
            Token {
                opcode: 0x08,
                kind: TokenKind::Stop,
            },
        ];
        assert_eq!(render_body(&tokens, &ctx), "\tself;\n");
    }
}
