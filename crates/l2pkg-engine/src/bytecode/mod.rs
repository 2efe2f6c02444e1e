//! Bytecode token decoding
//!
//! A byte-oriented instruction stream decodes into typed [`Token`]s
//! through two dispatch tables (main and conversion) held in an
//! [`OpcodeRegistry`] value. The per-session conversion-mode flag lives
//! in [`DecodingContext`] and is toggled by the 0x39 sentinel.

pub mod decoder;
pub mod opcode;
pub mod token;

pub use decoder::{DecodingContext, TokenDecoder};
pub use opcode::{op, OpcodeRegistry, Shape};
pub use token::{Token, TokenKind};
