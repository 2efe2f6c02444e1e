//! Decoded token tree

/// One decoded instruction, with its operands fully materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Effective opcode. For extended natives this is the full native
    /// index, not the raw byte.
    pub opcode: u16,
    pub kind: TokenKind,
}

/// Operand payload of a [`Token`]. Object references stay as signed
/// table references; the renderer resolves them against the archive.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LocalVariable { object: i32 },
    InstanceVariable { object: i32 },
    DefaultVariable { object: i32 },
    BoolVariable { inner: Box<Token> },
    NativeParm { object: i32 },
    Return { value: Box<Token> },
    Stop,
    Nothing,
    EndFunctionParms,
    SelfRef,
    NoObject,
    IntZero,
    IntOne,
    True,
    False,
    Jump { target: u16 },
    JumpIfNot { target: u16, condition: Box<Token> },
    Context { left: Box<Token>, skip: u16, size: u8, right: Box<Token> },
    Skip { size: u16, inner: Box<Token> },
    Let { target: Box<Token>, value: Box<Token> },
    LetBool { target: Box<Token>, value: Box<Token> },
    VirtualFunction { name: String, params: Vec<Token> },
    FinalFunction { object: i32, params: Vec<Token> },
    GlobalFunction { name: String, params: Vec<Token> },
    NativeFunction { index: u16, params: Vec<Token> },
    IntConst(i32),
    FloatConst(f32),
    StringConst(String),
    ObjectConst { object: i32 },
    NameConst(String),
    RotationConst { pitch: i32, yaw: i32, roll: i32 },
    VectorConst { x: f32, y: f32, z: f32 },
    ByteConst(u8),
    IntConstByte(u8),
    Conversion { cast: &'static str, inner: Box<Token> },
}

impl Token {
    /// Whether this token ends a function body at top level.
    pub fn ends_body(&self) -> bool {
        matches!(self.kind, TokenKind::Nothing)
    }
}
