//! CIL instruction model.
//!
//! # Key Components
//! - [`opcodes`]: The ECMA-335 opcode table
//! - [`Instruction`] / [`Operand`]: One instruction with its resolved operand

mod instruction;
pub mod opcodes;

pub use instruction::{Instruction, Operand, Primitive};
pub use opcodes::{OpCode, OperandType};
