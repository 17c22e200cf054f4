//! Custom attributes attached to modules, types, methods and parameters.
//!
//! A [`CustomAttribute`] is identified by its constructor: the constructor's declaring type
//! is the attribute type, and the constructor's parameter types give the static types of
//! the positional arguments. Named property and field arguments are kept separately.
//!
//! # Examples
//!
//! ```rust
//! use modrewrite::metadata::customattributes::{AttributeValue, CustomAttribute, CustomAttributeArgument};
//! use modrewrite::metadata::method::MethodMember;
//! use modrewrite::metadata::typesystem::{CilType, TypeScope};
//!
//! let attribute_type = CilType::named("Game", "SaveFieldAttribute", TypeScope::assembly("Game"));
//! let ctor = MethodMember::constructor(attribute_type, vec![CilType::int32()]);
//! let attribute = CustomAttribute::new(
//!     ctor,
//!     vec![CustomAttributeArgument::new(CilType::int32(), AttributeValue::I4(3))],
//! );
//! assert_eq!(attribute.attribute_type().full_name(), "Game.SaveFieldAttribute");
//! ```

mod types;

pub use types::{AttributeValue, CustomAttributeArgument, CustomAttributeNamedArgument};

use crate::metadata::{method::MethodMember, typesystem::CilTypeRc};

/// An applied custom attribute
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// The attribute constructor
    pub constructor: MethodMember,
    /// Positional constructor arguments
    pub arguments: Vec<CustomAttributeArgument>,
    /// Named property arguments
    pub properties: Vec<CustomAttributeNamedArgument>,
    /// Named field arguments
    pub fields: Vec<CustomAttributeNamedArgument>,
}

impl CustomAttribute {
    /// Create an attribute without named arguments
    #[must_use]
    pub fn new(constructor: MethodMember, arguments: Vec<CustomAttributeArgument>) -> Self {
        CustomAttribute {
            constructor,
            arguments,
            properties: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Append a named property argument
    #[must_use]
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        arg_type: CilTypeRc,
        value: AttributeValue,
    ) -> Self {
        self.properties.push(CustomAttributeNamedArgument {
            name: name.into(),
            arg_type,
            value,
        });
        self
    }

    /// Append a named field argument
    #[must_use]
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        arg_type: CilTypeRc,
        value: AttributeValue,
    ) -> Self {
        self.fields.push(CustomAttributeNamedArgument {
            name: name.into(),
            arg_type,
            value,
        });
        self
    }

    /// The attribute type (declaring type of the constructor)
    #[must_use]
    pub fn attribute_type(&self) -> &CilTypeRc {
        &self.constructor.declaring_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::{CilType, TypeScope};

    #[test]
    fn test_named_arguments_are_separate() {
        let attribute_type = CilType::named("Game", "Obsolete", TypeScope::assembly("Game"));
        let attribute =
            CustomAttribute::new(MethodMember::constructor(attribute_type, vec![]), vec![])
                .with_property(
                    "Message",
                    CilType::string(),
                    AttributeValue::String(Some("old".into())),
                )
                .with_field("Level", CilType::int32(), AttributeValue::I4(2));

        assert!(attribute.arguments.is_empty());
        assert_eq!(attribute.properties.len(), 1);
        assert_eq!(attribute.fields[0].value, AttributeValue::I4(2));
        assert!(attribute.constructor.is_constructor());
    }
}
