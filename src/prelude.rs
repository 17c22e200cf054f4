//! # modrewrite Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the modrewrite library. Import this module to get quick access to everything needed
//! to build a handler chain and rewrite modules with it.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all modrewrite operations
pub use crate::Error;

/// The result type used throughout modrewrite
pub use crate::Result;

// ================================================================================================
// Configuration
// ================================================================================================

/// Rewrite policy and its building blocks
pub use crate::config::{MemberPattern, MemberRewrite, Platform, RewriteConfig, TypeMapping};

// ================================================================================================
// Module Model
// ================================================================================================

/// Modules and their declared types
pub use crate::metadata::{
    module::{EventDef, PropertyDef, TypeAttributes},
    Module, TypeDef,
};

/// Metadata token type for identifying definitions
pub use crate::metadata::token::Token;

/// Fields
pub use crate::metadata::field::{FieldAttributes, FieldDef, FieldRef};

/// Methods, method references and bodies
pub use crate::metadata::method::{
    MethodBody, MethodDef, MethodMember, MethodModifiers, MethodRef, MethodSpec,
};

/// Custom attributes
pub use crate::metadata::customattributes::{
    AttributeValue, CustomAttribute, CustomAttributeArgument,
};

// ================================================================================================
// Type System
// ================================================================================================

/// Core type system components
pub use crate::metadata::typesystem::{
    AssemblyResolutionCache, CilType, CilTypeRc, GenericParam, GenericParamOwner, GenericParamRc,
    ResolvedType, TypeScope,
};

// ================================================================================================
// Instructions
// ================================================================================================

/// Decoded instructions and their operands
pub use crate::assembly::{Instruction, OpCode, Operand};

/// The opcode table
pub use crate::assembly::opcodes;

// ================================================================================================
// Rewriting
// ================================================================================================

/// Driver and report
pub use crate::rewriting::{ModuleRewriter, RewriteReport};

/// Handler traits and chain
pub use crate::rewriting::{
    BodyEditor, Handled, HandlerChain, HandlerKind, InstructionHandler, InstructionHandlerRc,
    ModuleContext, RewriteResult,
};

/// Type matching and type reference rewriting
pub use crate::rewriting::{TypeMapRule, TypeMatchPredicate, TypeReferenceRewriter};

/// Ready-made handlers
pub use crate::rewriting::handlers::{
    FieldReplaceRewriter, FieldToPropertyRewriter, MemberFinder, MemberKind,
    MethodParentRewriter, ReferenceToMemberWithUnexpectedTypeFinder,
    ReferenceToMissingMemberFinder, TypeFinder,
};
