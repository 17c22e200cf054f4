//! The CIL instruction set (ECMA-335 Partition III).
//!
//! Each opcode is a [`OpCode`] constant carrying its encoded value, its mnemonic and the
//! kind of operand it takes. Two-byte opcodes keep their `0xFE` prefix in the high byte
//! (`ceq` is `0xFE01`).
#![allow(missing_docs)]

use std::fmt;

use strum::Display;

/// The kind of operand an opcode takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit immediate
    Int8,
    /// Unsigned 8-bit immediate (prefix arguments)
    UInt8,
    /// Signed 32-bit immediate
    Int32,
    /// Signed 64-bit immediate
    Int64,
    /// 32-bit floating point immediate
    Float32,
    /// 64-bit floating point immediate
    Float64,
    /// User string
    String,
    /// Field reference
    Field,
    /// Method reference
    Method,
    /// Type reference
    Type,
    /// Type, field or method reference (`ldtoken`)
    Token,
    /// Standalone call site signature (`calli`)
    Signature,
    /// 8-bit relative branch target
    ShortBranch,
    /// 32-bit relative branch target
    Branch,
    /// Switch table
    Switch,
    /// 8-bit local variable index
    ShortLocal,
    /// 16-bit local variable index
    Local,
    /// 8-bit argument index
    ShortArgument,
    /// 16-bit argument index
    Argument,
}

/// A CIL opcode
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode {
    /// Encoded value, two-byte opcodes carry the `0xFE` prefix in the high byte
    pub value: u16,
    /// Assembler mnemonic
    pub mnemonic: &'static str,
    /// Kind of operand
    pub operand: OperandType,
}

impl OpCode {
    /// Returns true for opcodes without semantic effect, which traversals skip
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.value == NOP.value
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.mnemonic, self.value)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic)
    }
}

macro_rules! opcodes {
    ($($name:ident = $value:literal, $mnemonic:literal, $operand:ident;)*) => {
        $(
            #[doc = concat!("`", $mnemonic, "`")]
            pub const $name: OpCode = OpCode {
                value: $value,
                mnemonic: $mnemonic,
                operand: OperandType::$operand,
            };
        )*

        /// Every opcode, in encoding order
        pub const ALL: &[OpCode] = &[$($name),*];
    };
}

opcodes! {
    NOP = 0x00, "nop", None;
    BREAK = 0x01, "break", None;
    LDARG_0 = 0x02, "ldarg.0", None;
    LDARG_1 = 0x03, "ldarg.1", None;
    LDARG_2 = 0x04, "ldarg.2", None;
    LDARG_3 = 0x05, "ldarg.3", None;
    LDLOC_0 = 0x06, "ldloc.0", None;
    LDLOC_1 = 0x07, "ldloc.1", None;
    LDLOC_2 = 0x08, "ldloc.2", None;
    LDLOC_3 = 0x09, "ldloc.3", None;
    STLOC_0 = 0x0A, "stloc.0", None;
    STLOC_1 = 0x0B, "stloc.1", None;
    STLOC_2 = 0x0C, "stloc.2", None;
    STLOC_3 = 0x0D, "stloc.3", None;
    LDARG_S = 0x0E, "ldarg.s", ShortArgument;
    LDARGA_S = 0x0F, "ldarga.s", ShortArgument;
    STARG_S = 0x10, "starg.s", ShortArgument;
    LDLOC_S = 0x11, "ldloc.s", ShortLocal;
    LDLOCA_S = 0x12, "ldloca.s", ShortLocal;
    STLOC_S = 0x13, "stloc.s", ShortLocal;
    LDNULL = 0x14, "ldnull", None;
    LDC_I4_M1 = 0x15, "ldc.i4.m1", None;
    LDC_I4_0 = 0x16, "ldc.i4.0", None;
    LDC_I4_1 = 0x17, "ldc.i4.1", None;
    LDC_I4_2 = 0x18, "ldc.i4.2", None;
    LDC_I4_3 = 0x19, "ldc.i4.3", None;
    LDC_I4_4 = 0x1A, "ldc.i4.4", None;
    LDC_I4_5 = 0x1B, "ldc.i4.5", None;
    LDC_I4_6 = 0x1C, "ldc.i4.6", None;
    LDC_I4_7 = 0x1D, "ldc.i4.7", None;
    LDC_I4_8 = 0x1E, "ldc.i4.8", None;
    LDC_I4_S = 0x1F, "ldc.i4.s", Int8;
    LDC_I4 = 0x20, "ldc.i4", Int32;
    LDC_I8 = 0x21, "ldc.i8", Int64;
    LDC_R4 = 0x22, "ldc.r4", Float32;
    LDC_R8 = 0x23, "ldc.r8", Float64;
    DUP = 0x25, "dup", None;
    POP = 0x26, "pop", None;
    JMP = 0x27, "jmp", Method;
    CALL = 0x28, "call", Method;
    CALLI = 0x29, "calli", Signature;
    RET = 0x2A, "ret", None;
    BR_S = 0x2B, "br.s", ShortBranch;
    BRFALSE_S = 0x2C, "brfalse.s", ShortBranch;
    BRTRUE_S = 0x2D, "brtrue.s", ShortBranch;
    BEQ_S = 0x2E, "beq.s", ShortBranch;
    BGE_S = 0x2F, "bge.s", ShortBranch;
    BGT_S = 0x30, "bgt.s", ShortBranch;
    BLE_S = 0x31, "ble.s", ShortBranch;
    BLT_S = 0x32, "blt.s", ShortBranch;
    BNE_UN_S = 0x33, "bne.un.s", ShortBranch;
    BGE_UN_S = 0x34, "bge.un.s", ShortBranch;
    BGT_UN_S = 0x35, "bgt.un.s", ShortBranch;
    BLE_UN_S = 0x36, "ble.un.s", ShortBranch;
    BLT_UN_S = 0x37, "blt.un.s", ShortBranch;
    BR = 0x38, "br", Branch;
    BRFALSE = 0x39, "brfalse", Branch;
    BRTRUE = 0x3A, "brtrue", Branch;
    BEQ = 0x3B, "beq", Branch;
    BGE = 0x3C, "bge", Branch;
    BGT = 0x3D, "bgt", Branch;
    BLE = 0x3E, "ble", Branch;
    BLT = 0x3F, "blt", Branch;
    BNE_UN = 0x40, "bne.un", Branch;
    BGE_UN = 0x41, "bge.un", Branch;
    BGT_UN = 0x42, "bgt.un", Branch;
    BLE_UN = 0x43, "ble.un", Branch;
    BLT_UN = 0x44, "blt.un", Branch;
    SWITCH = 0x45, "switch", Switch;
    LDIND_I1 = 0x46, "ldind.i1", None;
    LDIND_U1 = 0x47, "ldind.u1", None;
    LDIND_I2 = 0x48, "ldind.i2", None;
    LDIND_U2 = 0x49, "ldind.u2", None;
    LDIND_I4 = 0x4A, "ldind.i4", None;
    LDIND_U4 = 0x4B, "ldind.u4", None;
    LDIND_I8 = 0x4C, "ldind.i8", None;
    LDIND_I = 0x4D, "ldind.i", None;
    LDIND_R4 = 0x4E, "ldind.r4", None;
    LDIND_R8 = 0x4F, "ldind.r8", None;
    LDIND_REF = 0x50, "ldind.ref", None;
    STIND_REF = 0x51, "stind.ref", None;
    STIND_I1 = 0x52, "stind.i1", None;
    STIND_I2 = 0x53, "stind.i2", None;
    STIND_I4 = 0x54, "stind.i4", None;
    STIND_I8 = 0x55, "stind.i8", None;
    STIND_R4 = 0x56, "stind.r4", None;
    STIND_R8 = 0x57, "stind.r8", None;
    ADD = 0x58, "add", None;
    SUB = 0x59, "sub", None;
    MUL = 0x5A, "mul", None;
    DIV = 0x5B, "div", None;
    DIV_UN = 0x5C, "div.un", None;
    REM = 0x5D, "rem", None;
    REM_UN = 0x5E, "rem.un", None;
    AND = 0x5F, "and", None;
    OR = 0x60, "or", None;
    XOR = 0x61, "xor", None;
    SHL = 0x62, "shl", None;
    SHR = 0x63, "shr", None;
    SHR_UN = 0x64, "shr.un", None;
    NEG = 0x65, "neg", None;
    NOT = 0x66, "not", None;
    CONV_I1 = 0x67, "conv.i1", None;
    CONV_I2 = 0x68, "conv.i2", None;
    CONV_I4 = 0x69, "conv.i4", None;
    CONV_I8 = 0x6A, "conv.i8", None;
    CONV_R4 = 0x6B, "conv.r4", None;
    CONV_R8 = 0x6C, "conv.r8", None;
    CONV_U4 = 0x6D, "conv.u4", None;
    CONV_U8 = 0x6E, "conv.u8", None;
    CALLVIRT = 0x6F, "callvirt", Method;
    CPOBJ = 0x70, "cpobj", Type;
    LDOBJ = 0x71, "ldobj", Type;
    LDSTR = 0x72, "ldstr", String;
    NEWOBJ = 0x73, "newobj", Method;
    CASTCLASS = 0x74, "castclass", Type;
    ISINST = 0x75, "isinst", Type;
    CONV_R_UN = 0x76, "conv.r.un", None;
    UNBOX = 0x79, "unbox", Type;
    THROW = 0x7A, "throw", None;
    LDFLD = 0x7B, "ldfld", Field;
    LDFLDA = 0x7C, "ldflda", Field;
    STFLD = 0x7D, "stfld", Field;
    LDSFLD = 0x7E, "ldsfld", Field;
    LDSFLDA = 0x7F, "ldsflda", Field;
    STSFLD = 0x80, "stsfld", Field;
    STOBJ = 0x81, "stobj", Type;
    CONV_OVF_I1_UN = 0x82, "conv.ovf.i1.un", None;
    CONV_OVF_I2_UN = 0x83, "conv.ovf.i2.un", None;
    CONV_OVF_I4_UN = 0x84, "conv.ovf.i4.un", None;
    CONV_OVF_I8_UN = 0x85, "conv.ovf.i8.un", None;
    CONV_OVF_U1_UN = 0x86, "conv.ovf.u1.un", None;
    CONV_OVF_U2_UN = 0x87, "conv.ovf.u2.un", None;
    CONV_OVF_U4_UN = 0x88, "conv.ovf.u4.un", None;
    CONV_OVF_U8_UN = 0x89, "conv.ovf.u8.un", None;
    CONV_OVF_I_UN = 0x8A, "conv.ovf.i.un", None;
    CONV_OVF_U_UN = 0x8B, "conv.ovf.u.un", None;
    BOX = 0x8C, "box", Type;
    NEWARR = 0x8D, "newarr", Type;
    LDLEN = 0x8E, "ldlen", None;
    LDELEMA = 0x8F, "ldelema", Type;
    LDELEM_I1 = 0x90, "ldelem.i1", None;
    LDELEM_U1 = 0x91, "ldelem.u1", None;
    LDELEM_I2 = 0x92, "ldelem.i2", None;
    LDELEM_U2 = 0x93, "ldelem.u2", None;
    LDELEM_I4 = 0x94, "ldelem.i4", None;
    LDELEM_U4 = 0x95, "ldelem.u4", None;
    LDELEM_I8 = 0x96, "ldelem.i8", None;
    LDELEM_I = 0x97, "ldelem.i", None;
    LDELEM_R4 = 0x98, "ldelem.r4", None;
    LDELEM_R8 = 0x99, "ldelem.r8", None;
    LDELEM_REF = 0x9A, "ldelem.ref", None;
    STELEM_I = 0x9B, "stelem.i", None;
    STELEM_I1 = 0x9C, "stelem.i1", None;
    STELEM_I2 = 0x9D, "stelem.i2", None;
    STELEM_I4 = 0x9E, "stelem.i4", None;
    STELEM_I8 = 0x9F, "stelem.i8", None;
    STELEM_R4 = 0xA0, "stelem.r4", None;
    STELEM_R8 = 0xA1, "stelem.r8", None;
    STELEM_REF = 0xA2, "stelem.ref", None;
    LDELEM = 0xA3, "ldelem", Type;
    STELEM = 0xA4, "stelem", Type;
    UNBOX_ANY = 0xA5, "unbox.any", Type;
    CONV_OVF_I1 = 0xB3, "conv.ovf.i1", None;
    CONV_OVF_U1 = 0xB4, "conv.ovf.u1", None;
    CONV_OVF_I2 = 0xB5, "conv.ovf.i2", None;
    CONV_OVF_U2 = 0xB6, "conv.ovf.u2", None;
    CONV_OVF_I4 = 0xB7, "conv.ovf.i4", None;
    CONV_OVF_U4 = 0xB8, "conv.ovf.u4", None;
    CONV_OVF_I8 = 0xB9, "conv.ovf.i8", None;
    CONV_OVF_U8 = 0xBA, "conv.ovf.u8", None;
    REFANYVAL = 0xC2, "refanyval", Type;
    CKFINITE = 0xC3, "ckfinite", None;
    MKREFANY = 0xC6, "mkrefany", Type;
    LDTOKEN = 0xD0, "ldtoken", Token;
    CONV_U2 = 0xD1, "conv.u2", None;
    CONV_U1 = 0xD2, "conv.u1", None;
    CONV_I = 0xD3, "conv.i", None;
    CONV_OVF_I = 0xD4, "conv.ovf.i", None;
    CONV_OVF_U = 0xD5, "conv.ovf.u", None;
    ADD_OVF = 0xD6, "add.ovf", None;
    ADD_OVF_UN = 0xD7, "add.ovf.un", None;
    MUL_OVF = 0xD8, "mul.ovf", None;
    MUL_OVF_UN = 0xD9, "mul.ovf.un", None;
    SUB_OVF = 0xDA, "sub.ovf", None;
    SUB_OVF_UN = 0xDB, "sub.ovf.un", None;
    ENDFINALLY = 0xDC, "endfinally", None;
    LEAVE = 0xDD, "leave", Branch;
    LEAVE_S = 0xDE, "leave.s", ShortBranch;
    STIND_I = 0xDF, "stind.i", None;
    CONV_U = 0xE0, "conv.u", None;
    ARGLIST = 0xFE00, "arglist", None;
    CEQ = 0xFE01, "ceq", None;
    CGT = 0xFE02, "cgt", None;
    CGT_UN = 0xFE03, "cgt.un", None;
    CLT = 0xFE04, "clt", None;
    CLT_UN = 0xFE05, "clt.un", None;
    LDFTN = 0xFE06, "ldftn", Method;
    LDVIRTFTN = 0xFE07, "ldvirtftn", Method;
    LDARG = 0xFE09, "ldarg", Argument;
    LDARGA = 0xFE0A, "ldarga", Argument;
    STARG = 0xFE0B, "starg", Argument;
    LDLOC = 0xFE0C, "ldloc", Local;
    LDLOCA = 0xFE0D, "ldloca", Local;
    STLOC = 0xFE0E, "stloc", Local;
    LOCALLOC = 0xFE0F, "localloc", None;
    ENDFILTER = 0xFE11, "endfilter", None;
    UNALIGNED = 0xFE12, "unaligned.", UInt8;
    VOLATILE = 0xFE13, "volatile.", None;
    TAIL = 0xFE14, "tail.", None;
    INITOBJ = 0xFE15, "initobj", Type;
    CONSTRAINED = 0xFE16, "constrained.", Type;
    CPBLK = 0xFE17, "cpblk", None;
    INITBLK = 0xFE18, "initblk", None;
    NO = 0xFE19, "no.", UInt8;
    RETHROW = 0xFE1A, "rethrow", None;
    SIZEOF = 0xFE1C, "sizeof", Type;
    REFANYTYPE = 0xFE1D, "refanytype", None;
    READONLY = 0xFE1E, "readonly.", None;
}
