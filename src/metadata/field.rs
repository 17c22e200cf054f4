//! Field definitions and field references.

use bitflags::bitflags;

use crate::metadata::{customattributes::CustomAttribute, token::Token, typesystem::CilTypeRc};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Field attributes
    pub struct FieldAttributes: u32 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Value is compile time constant
        const LITERAL = 0x0040;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
    }
}

/// A use-site reference to a field
#[derive(Debug, Clone)]
pub struct FieldRef {
    /// The type declaring the field
    pub declaring_type: CilTypeRc,
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: CilTypeRc,
}

impl FieldRef {
    /// Create a new field reference
    pub fn new(declaring_type: CilTypeRc, name: impl Into<String>, field_type: CilTypeRc) -> Self {
        FieldRef {
            declaring_type,
            name: name.into(),
            field_type,
        }
    }

    /// Formatted as `Type Declaring::Name`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{} {}::{}",
            self.field_type.full_name(),
            self.declaring_type.full_name(),
            self.name
        )
    }
}

/// A field declared by a type of the module
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Attributes
    pub flags: FieldAttributes,
    /// Declared type
    pub field_type: CilTypeRc,
    /// Custom attributes on the field
    pub custom_attributes: Vec<CustomAttribute>,
}

impl FieldDef {
    /// Create a public instance field
    pub fn new(token: Token, name: impl Into<String>, field_type: CilTypeRc) -> Self {
        FieldDef {
            token,
            name: name.into(),
            flags: FieldAttributes::PUBLIC,
            field_type,
            custom_attributes: Vec::new(),
        }
    }

    /// Returns true for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }
}
