//! Method bodies: the instruction stream and local variables.

use crate::{assembly::Instruction, metadata::typesystem::CilTypeRc};

/// A local variable slot of a method body
#[derive(Debug, Clone)]
pub struct LocalVariable {
    /// Slot index, as used by `ldloc`/`stloc`
    pub index: u16,
    /// Declared type of the slot
    pub variable_type: CilTypeRc,
}

/// The IL implementation of a method
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    /// Instructions in original order
    pub instructions: Vec<Instruction>,
    /// Local variables
    pub variables: Vec<LocalVariable>,
}

impl MethodBody {
    /// Create a body from an instruction stream, assigning sequential offsets to
    /// instructions which have none
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let mut offset = 0_u32;
        let instructions = instructions
            .into_iter()
            .map(|mut instruction| {
                if instruction.offset == 0 {
                    instruction.offset = offset;
                }
                offset = instruction.offset + 1;
                instruction
            })
            .collect();

        MethodBody {
            instructions,
            variables: Vec::new(),
        }
    }

    /// Append a local variable of type `variable_type`
    #[must_use]
    pub fn with_variable(mut self, variable_type: CilTypeRc) -> Self {
        let index = u16::try_from(self.variables.len()).unwrap_or(u16::MAX);
        self.variables.push(LocalVariable {
            index,
            variable_type,
        });
        self
    }
}
