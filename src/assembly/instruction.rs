//! Decoded CIL instructions with resolved operands.
//!
//! Operands that reference metadata (fields, methods, types) are held resolved, as the
//! reference values themselves rather than tokens, so the rewriting engine can inspect and
//! replace them without a metadata context.

use std::fmt;

use crate::{
    assembly::opcodes::{self, OpCode},
    metadata::{
        field::FieldRef,
        method::MethodRef,
        token::Token,
        typesystem::CilTypeRc,
    },
};

/// A constant or index operand
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Signed 8-bit immediate
    Int8(i8),
    /// Unsigned 8-bit immediate
    UInt8(u8),
    /// Signed 32-bit immediate
    Int32(i32),
    /// Signed 64-bit immediate
    Int64(i64),
    /// 32-bit floating point immediate
    Float32(f32),
    /// 64-bit floating point immediate
    Float64(f64),
    /// User string literal
    String(String),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// Absolute branch target offset
    Target(u32),
    /// Switch table of branch target offsets
    Switch(Vec<u32>),
    /// Standalone signature token (`calli`)
    Signature(Token),
}

/// The operand of an instruction.
///
/// Operand kinds are fixed, so this is a closed union and consumers match exhaustively.
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand present
    None,
    /// A constant or index
    Primitive(Primitive),
    /// A field reference
    Field(FieldRef),
    /// A method reference
    Method(MethodRef),
    /// A bare type reference (`castclass`, `box`, `ldtoken`, ...)
    Type(CilTypeRc),
}

/// One instruction of a method body
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Offset within the method body
    pub offset: u32,
    /// The opcode
    pub opcode: OpCode,
    /// The operand
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction at offset 0
    #[must_use]
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        Instruction {
            offset: 0,
            opcode,
            operand,
        }
    }

    /// Create an instruction without operand
    #[must_use]
    pub fn simple(opcode: OpCode) -> Self {
        Instruction::new(opcode, Operand::None)
    }

    /// Create a field access instruction
    #[must_use]
    pub fn field(opcode: OpCode, field: FieldRef) -> Self {
        Instruction::new(opcode, Operand::Field(field))
    }

    /// Create a call-like instruction
    pub fn method(opcode: OpCode, method: impl Into<MethodRef>) -> Self {
        Instruction::new(opcode, Operand::Method(method.into()))
    }

    /// Create an instruction taking a type operand
    #[must_use]
    pub fn with_type(opcode: OpCode, ty: CilTypeRc) -> Self {
        Instruction::new(opcode, Operand::Type(ty))
    }

    /// `ldstr` of the given literal
    pub fn ldstr(value: impl Into<String>) -> Self {
        Instruction::new(
            opcodes::LDSTR,
            Operand::Primitive(Primitive::String(value.into())),
        )
    }

    /// The same instruction with a different opcode and operand, keeping the offset
    #[must_use]
    pub fn replaced(&self, opcode: OpCode, operand: Operand) -> Self {
        Instruction {
            offset: self.offset,
            opcode,
            operand,
        }
    }

    /// Returns true if the instruction has no semantic effect
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.opcode.is_inert()
    }

    /// The field operand, if any
    #[must_use]
    pub fn field_operand(&self) -> Option<&FieldRef> {
        match &self.operand {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// The method operand, if any
    #[must_use]
    pub fn method_operand(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The type operand, if any
    #[must_use]
    pub fn type_operand(&self) -> Option<&CilTypeRc> {
        match &self.operand {
            Operand::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// The string literal operand, if any
    #[must_use]
    pub fn string_operand(&self) -> Option<&str> {
        match &self.operand {
            Operand::Primitive(Primitive::String(value)) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset, self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Primitive(Primitive::String(value)) => write!(f, " \"{value}\""),
            Operand::Primitive(Primitive::Target(target)) => write!(f, " IL_{target:04X}"),
            Operand::Primitive(primitive) => write!(f, " {primitive:?}"),
            Operand::Field(field) => write!(f, " {}", field.full_name()),
            Operand::Method(method) => write!(f, " {}", method.element().full_name()),
            Operand::Type(ty) => write!(f, " {ty}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::{CilType, TypeScope};

    #[test]
    fn test_display() {
        let farmer = CilType::named("Game", "Farmer", TypeScope::assembly("Game"));
        let mut load = Instruction::field(
            opcodes::LDFLD,
            FieldRef::new(farmer.clone(), "stamina", CilType::int32()),
        );
        load.offset = 0x10;
        assert_eq!(
            load.to_string(),
            "IL_0010: ldfld System.Int32 Game.Farmer::stamina"
        );

        let cast = Instruction::with_type(opcodes::CASTCLASS, farmer);
        assert_eq!(cast.to_string(), "IL_0000: castclass Game.Farmer");
        assert_eq!(Instruction::ldstr("hi").to_string(), "IL_0000: ldstr \"hi\"");
    }

    #[test]
    fn test_operand_accessors() {
        let nop = Instruction::simple(opcodes::NOP);
        assert!(nop.is_inert());
        assert!(nop.field_operand().is_none());

        let cast = Instruction::with_type(opcodes::BOX, CilType::int32());
        assert!(cast.type_operand().is_some());
        let replaced = cast.replaced(opcodes::POP, Operand::None);
        assert_eq!(replaced.offset, cast.offset);
        assert!(replaced.type_operand().is_none());
    }
}
