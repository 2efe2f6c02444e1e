//! Opcode values and dispatch tables

/// Well-known opcode byte values.
pub mod op {
    pub const LOCAL_VARIABLE: u8 = 0x00;
    pub const INSTANCE_VARIABLE: u8 = 0x01;
    pub const DEFAULT_VARIABLE: u8 = 0x02;
    pub const RETURN: u8 = 0x04;
    pub const JUMP: u8 = 0x06;
    pub const JUMP_IF_NOT: u8 = 0x07;
    pub const STOP: u8 = 0x08;
    pub const NOTHING: u8 = 0x0B;
    pub const LET: u8 = 0x0F;
    pub const LET_BOOL: u8 = 0x14;
    pub const END_FUNCTION_PARMS: u8 = 0x16;
    pub const SELF: u8 = 0x17;
    pub const SKIP: u8 = 0x18;
    pub const CONTEXT: u8 = 0x19;
    pub const VIRTUAL_FUNCTION: u8 = 0x1B;
    pub const FINAL_FUNCTION: u8 = 0x1C;
    pub const INT_CONST: u8 = 0x1D;
    pub const FLOAT_CONST: u8 = 0x1E;
    pub const STRING_CONST: u8 = 0x1F;
    pub const OBJECT_CONST: u8 = 0x20;
    pub const NAME_CONST: u8 = 0x21;
    pub const ROTATION_CONST: u8 = 0x22;
    pub const VECTOR_CONST: u8 = 0x23;
    pub const BYTE_CONST: u8 = 0x24;
    pub const INT_ZERO: u8 = 0x25;
    pub const INT_ONE: u8 = 0x26;
    pub const TRUE: u8 = 0x27;
    pub const FALSE: u8 = 0x28;
    pub const NATIVE_PARM: u8 = 0x29;
    pub const NO_OBJECT: u8 = 0x2A;
    pub const INT_CONST_BYTE: u8 = 0x2C;
    pub const BOOL_VARIABLE: u8 = 0x2D;
    pub const GLOBAL_FUNCTION: u8 = 0x38;
    /// "Begin conversion table" sentinel; inside the conversion table the
    /// same byte is the RotatorToVector cast.
    pub const CONVERSION_TABLE: u8 = 0x39;
    /// Opcodes at or above this value encode native calls (main table only)
    pub const EXTENDED_NATIVE_BASE: u8 = 0x60;
    /// Lowest legal native function index
    pub const FIRST_NATIVE: u16 = 0x70;
}

/// Operand schema of one token type. Closed set: the decoder matches on
/// the shape, never on open-ended type hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    LocalVariable,
    InstanceVariable,
    DefaultVariable,
    BoolVariable,
    NativeParm,
    Return,
    Stop,
    Nothing,
    EndFunctionParms,
    SelfRef,
    NoObject,
    IntZero,
    IntOne,
    True,
    False,
    Jump,
    JumpIfNot,
    Context,
    Skip,
    Let,
    LetBool,
    VirtualFunction,
    FinalFunction,
    GlobalFunction,
    IntConst,
    FloatConst,
    StringConst,
    ObjectConst,
    NameConst,
    RotationConst,
    VectorConst,
    ByteConst,
    IntConstByte,
    /// Implicit type-conversion token; carries its cast name
    Conversion(&'static str),
}

impl Shape {
    /// Conversion tokens consume the conversion-mode flag.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Shape::Conversion(_))
    }
}

/// The two-table opcode dispatch, built once and passed to the engine at
/// construction so separate engine instances never share mutable state.
pub struct OpcodeRegistry {
    main: [Option<Shape>; 256],
    conversion: [Option<Shape>; 256],
}

impl OpcodeRegistry {
    /// The standard table pair for the container's script format.
    pub fn standard() -> Self {
        let mut main = [None; 256];
        let mut set = |opcode: u8, shape: Shape| main[opcode as usize] = Some(shape);
        set(op::LOCAL_VARIABLE, Shape::LocalVariable);
        set(op::INSTANCE_VARIABLE, Shape::InstanceVariable);
        set(op::DEFAULT_VARIABLE, Shape::DefaultVariable);
        set(op::RETURN, Shape::Return);
        set(op::JUMP, Shape::Jump);
        set(op::JUMP_IF_NOT, Shape::JumpIfNot);
        set(op::STOP, Shape::Stop);
        set(op::NOTHING, Shape::Nothing);
        set(op::LET, Shape::Let);
        set(op::LET_BOOL, Shape::LetBool);
        set(op::END_FUNCTION_PARMS, Shape::EndFunctionParms);
        set(op::SELF, Shape::SelfRef);
        set(op::SKIP, Shape::Skip);
        set(op::CONTEXT, Shape::Context);
        set(op::VIRTUAL_FUNCTION, Shape::VirtualFunction);
        set(op::FINAL_FUNCTION, Shape::FinalFunction);
        set(op::INT_CONST, Shape::IntConst);
        set(op::FLOAT_CONST, Shape::FloatConst);
        set(op::STRING_CONST, Shape::StringConst);
        set(op::OBJECT_CONST, Shape::ObjectConst);
        set(op::NAME_CONST, Shape::NameConst);
        set(op::ROTATION_CONST, Shape::RotationConst);
        set(op::VECTOR_CONST, Shape::VectorConst);
        set(op::BYTE_CONST, Shape::ByteConst);
        set(op::INT_ZERO, Shape::IntZero);
        set(op::INT_ONE, Shape::IntOne);
        set(op::TRUE, Shape::True);
        set(op::FALSE, Shape::False);
        set(op::NATIVE_PARM, Shape::NativeParm);
        set(op::NO_OBJECT, Shape::NoObject);
        set(op::INT_CONST_BYTE, Shape::IntConstByte);
        set(op::BOOL_VARIABLE, Shape::BoolVariable);
        set(op::GLOBAL_FUNCTION, Shape::GlobalFunction);

        let mut conversion = [None; 256];
        for (opcode, cast) in CONVERSION_CASTS {
            conversion[*opcode as usize] = Some(Shape::Conversion(cast));
        }

        Self { main, conversion }
    }

    pub fn main_shape(&self, opcode: u8) -> Option<Shape> {
        self.main[opcode as usize]
    }

    pub fn conversion_shape(&self, opcode: u8) -> Option<Shape> {
        self.conversion[opcode as usize]
    }
}

impl Default for OpcodeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Conversion-table casts, keyed by their opcode byte.
const CONVERSION_CASTS: &[(u8, &str)] = &[
    (0x39, "RotatorToVector"),
    (0x3A, "ByteToInt"),
    (0x3B, "ByteToBool"),
    (0x3C, "ByteToFloat"),
    (0x3D, "IntToByte"),
    (0x3E, "IntToBool"),
    (0x3F, "IntToFloat"),
    (0x40, "BoolToByte"),
    (0x41, "BoolToInt"),
    (0x42, "BoolToFloat"),
    (0x43, "FloatToByte"),
    (0x44, "FloatToInt"),
    (0x45, "FloatToBool"),
    (0x47, "ObjectToBool"),
    (0x48, "NameToBool"),
    (0x49, "StringToByte"),
    (0x4A, "StringToInt"),
    (0x4B, "StringToBool"),
    (0x4C, "StringToFloat"),
    (0x4D, "StringToVector"),
    (0x4E, "StringToRotator"),
    (0x4F, "VectorToBool"),
    (0x50, "VectorToRotator"),
    (0x51, "RotatorToBool"),
    (0x52, "ByteToString"),
    (0x53, "IntToString"),
    (0x54, "BoolToString"),
    (0x55, "FloatToString"),
    (0x56, "ObjectToString"),
    (0x57, "NameToString"),
    (0x58, "VectorToString"),
    (0x59, "RotatorToString"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tables() {
        let reg = OpcodeRegistry::standard();
        assert_eq!(reg.main_shape(op::INT_ZERO), Some(Shape::IntZero));
        assert_eq!(reg.main_shape(0xFF), None);
        // 0x39 is only meaningful in the conversion table
        assert_eq!(reg.main_shape(op::CONVERSION_TABLE), None);
        assert_eq!(
            reg.conversion_shape(0x39),
            Some(Shape::Conversion("RotatorToVector"))
        );
        assert!(reg.conversion_shape(0x3F).unwrap().is_conversion());
        assert_eq!(reg.conversion_shape(op::INT_ZERO), None);
    }
}
