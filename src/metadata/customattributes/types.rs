//! Custom attribute argument values.
//!
//! Values are carried verbatim through rewrites; only the static type attached to each
//! constructor argument ever changes.

use crate::metadata::typesystem::CilTypeRc;

/// A single custom attribute argument value
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// Boolean value
    Bool(bool),
    /// Character value (16-bit Unicode)
    Char(char),
    /// Signed 8-bit integer
    I1(i8),
    /// Unsigned 8-bit integer
    U1(u8),
    /// Signed 16-bit integer
    I2(i16),
    /// Unsigned 16-bit integer
    U2(u16),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// UTF-8 string, `None` for a null string
    String(Option<String>),
    /// Type reference (`typeof(T)`)
    Type(CilTypeRc),
    /// Array of values
    Array(Vec<AttributeValue>),
    /// Enum value (underlying integral value)
    Enum(Box<AttributeValue>),
}

/// `typeof` values compare by scope and full name; type nodes have no identity of their own.
impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            (AttributeValue::Char(a), AttributeValue::Char(b)) => a == b,
            (AttributeValue::I1(a), AttributeValue::I1(b)) => a == b,
            (AttributeValue::U1(a), AttributeValue::U1(b)) => a == b,
            (AttributeValue::I2(a), AttributeValue::I2(b)) => a == b,
            (AttributeValue::U2(a), AttributeValue::U2(b)) => a == b,
            (AttributeValue::I4(a), AttributeValue::I4(b)) => a == b,
            (AttributeValue::U4(a), AttributeValue::U4(b)) => a == b,
            (AttributeValue::I8(a), AttributeValue::I8(b)) => a == b,
            (AttributeValue::U8(a), AttributeValue::U8(b)) => a == b,
            (AttributeValue::R4(a), AttributeValue::R4(b)) => a == b,
            (AttributeValue::R8(a), AttributeValue::R8(b)) => a == b,
            (AttributeValue::String(a), AttributeValue::String(b)) => a == b,
            (AttributeValue::Type(a), AttributeValue::Type(b)) => {
                a.scope() == b.scope() && a.full_name() == b.full_name()
            }
            (AttributeValue::Array(a), AttributeValue::Array(b)) => a == b,
            (AttributeValue::Enum(a), AttributeValue::Enum(b)) => a == b,
            _ => false,
        }
    }
}

/// A positional constructor argument: its static type and its value
#[derive(Debug, Clone)]
pub struct CustomAttributeArgument {
    /// Static type of the argument, as declared by the constructor parameter
    pub arg_type: CilTypeRc,
    /// The encoded value
    pub value: AttributeValue,
}

impl CustomAttributeArgument {
    /// Create a new argument
    #[must_use]
    pub fn new(arg_type: CilTypeRc, value: AttributeValue) -> Self {
        CustomAttributeArgument { arg_type, value }
    }
}

/// A named argument (field or property) of a custom attribute
#[derive(Debug, Clone)]
pub struct CustomAttributeNamedArgument {
    /// Name of the field or property
    pub name: String,
    /// Type of the argument
    pub arg_type: CilTypeRc,
    /// Value of the argument
    pub value: AttributeValue,
}
