//! Method definitions and method references.
//!
//! # Key Types
//! - [`MethodDef`]: A method declared by a type of the module, with optional [`MethodBody`]
//! - [`MethodRef`]: A use-site reference to a method, either a plain [`MethodMember`] or a
//!   generic instantiation [`MethodSpec`]
//!
//! # Generic method instantiations
//!
//! A call to `Convert<int>()` references a [`MethodSpec`], which wraps the generic element
//! method `Convert<T>()` and supplies its arguments. The wrapper has no declaring type of
//! its own: rewriting the declaring type of an instantiated call always targets the wrapped
//! element method, reachable through [`MethodRef::element_mut`].

mod body;
mod types;

pub use body::{LocalVariable, MethodBody};
pub use types::{MethodAccessFlags, MethodModifiers, METHOD_ACCESS_MASK};

use crate::metadata::{
    customattributes::CustomAttribute,
    token::Token,
    typesystem::{CilType, CilTypeRc, GenericParamRc},
};

/// Name of instance constructors
pub const CONSTRUCTOR_NAME: &str = ".ctor";
/// Name of type initializers
pub const TYPE_INITIALIZER_NAME: &str = ".cctor";

/// A reference to a non-generic method, or to the element method of a generic one.
#[derive(Debug, Clone)]
pub struct MethodMember {
    /// The type declaring the method
    pub declaring_type: CilTypeRc,
    /// Method name
    pub name: String,
    /// Return type
    pub return_type: CilTypeRc,
    /// Parameter types, in order
    pub parameters: Vec<CilTypeRc>,
    /// Instance method
    pub has_this: bool,
    /// Number of method-level generic parameters
    pub generic_arity: u16,
}

impl MethodMember {
    /// Create a reference to an instance method
    pub fn new(
        declaring_type: CilTypeRc,
        name: impl Into<String>,
        return_type: CilTypeRc,
        parameters: Vec<CilTypeRc>,
    ) -> Self {
        MethodMember {
            declaring_type,
            name: name.into(),
            return_type,
            parameters,
            has_this: true,
            generic_arity: 0,
        }
    }

    /// Create a reference to a static method
    pub fn new_static(
        declaring_type: CilTypeRc,
        name: impl Into<String>,
        return_type: CilTypeRc,
        parameters: Vec<CilTypeRc>,
    ) -> Self {
        MethodMember {
            has_this: false,
            ..MethodMember::new(declaring_type, name, return_type, parameters)
        }
    }

    /// Create a reference to an instance constructor of `declaring_type`
    #[must_use]
    pub fn constructor(declaring_type: CilTypeRc, parameters: Vec<CilTypeRc>) -> Self {
        MethodMember::new(declaring_type, CONSTRUCTOR_NAME, CilType::void(), parameters)
    }

    /// Returns true if this references an instance constructor
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// The signature formatted as `Return Declaring::Name(Param,Param)`
    #[must_use]
    pub fn full_name(&self) -> String {
        let parameters = self
            .parameters
            .iter()
            .map(|p| p.full_name())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{} {}::{}({})",
            self.return_type.full_name(),
            self.declaring_type.full_name(),
            self.name,
            parameters
        )
    }
}

/// An instantiation of a generic method
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// The generic element method
    pub element: MethodMember,
    /// Method-level generic arguments
    pub generic_args: Vec<CilTypeRc>,
}

/// A use-site reference to a method
#[derive(Debug, Clone)]
pub enum MethodRef {
    /// A plain method reference
    Member(MethodMember),
    /// An instantiated generic method
    GenericInstance(MethodSpec),
}

impl MethodRef {
    /// The referenced (element) method
    #[must_use]
    pub fn element(&self) -> &MethodMember {
        match self {
            MethodRef::Member(member) => member,
            MethodRef::GenericInstance(spec) => &spec.element,
        }
    }

    /// Mutable access to the referenced (element) method, the only place a declaring type
    /// can be changed
    pub fn element_mut(&mut self) -> &mut MethodMember {
        match self {
            MethodRef::Member(member) => member,
            MethodRef::GenericInstance(spec) => &mut spec.element,
        }
    }

    /// Generic arguments, empty unless this is an instantiation
    #[must_use]
    pub fn generic_args(&self) -> &[CilTypeRc] {
        match self {
            MethodRef::Member(_) => &[],
            MethodRef::GenericInstance(spec) => &spec.generic_args,
        }
    }

    /// Method name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.element().name
    }

    /// Declaring type of the element method
    #[must_use]
    pub fn declaring_type(&self) -> &CilTypeRc {
        &self.element().declaring_type
    }
}

impl From<MethodMember> for MethodRef {
    fn from(member: MethodMember) -> Self {
        MethodRef::Member(member)
    }
}

impl From<MethodSpec> for MethodRef {
    fn from(spec: MethodSpec) -> Self {
        MethodRef::GenericInstance(spec)
    }
}

/// A named method parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub parameter_type: CilTypeRc,
}

/// A method declared by a type of the module
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Access flags
    pub access: MethodAccessFlags,
    /// Modifiers
    pub modifiers: MethodModifiers,
    /// Return type
    pub return_type: CilTypeRc,
    /// Parameters, in order
    pub parameters: Vec<Parameter>,
    /// Declared method-level generic parameters
    pub generic_params: Vec<GenericParamRc>,
    /// Custom attributes on the method
    pub custom_attributes: Vec<CustomAttribute>,
    /// Interface or base methods this method explicitly implements
    pub overrides: Vec<MethodRef>,
    /// The IL body, absent for abstract, extern and runtime methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Create a public instance method without parameters or body
    pub fn new(token: Token, name: impl Into<String>, return_type: CilTypeRc) -> Self {
        MethodDef {
            token,
            name: name.into(),
            access: MethodAccessFlags::PUBLIC,
            modifiers: MethodModifiers::HIDE_BY_SIG,
            return_type,
            parameters: Vec::new(),
            generic_params: Vec::new(),
            custom_attributes: Vec::new(),
            overrides: Vec::new(),
            body: None,
        }
    }

    /// Create a public instance constructor
    #[must_use]
    pub fn constructor(token: Token) -> Self {
        MethodDef {
            modifiers: MethodModifiers::HIDE_BY_SIG
                | MethodModifiers::SPECIAL_NAME
                | MethodModifiers::RTSPECIAL_NAME,
            ..MethodDef::new(token, CONSTRUCTOR_NAME, CilType::void())
        }
    }

    /// Append a parameter
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, parameter_type: CilTypeRc) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            parameter_type,
        });
        self
    }

    /// Set the modifiers
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Append a method-level generic parameter
    #[must_use]
    pub fn with_generic_param(mut self, param: GenericParamRc) -> Self {
        self.generic_params.push(param);
        self
    }

    /// Append a custom attribute
    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.custom_attributes.push(attribute);
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns true for instance constructors
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME && self.modifiers.contains(MethodModifiers::RTSPECIAL_NAME)
    }

    /// Returns true for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// Parameter types, in order
    #[must_use]
    pub fn parameter_types(&self) -> Vec<CilTypeRc> {
        self.parameters
            .iter()
            .map(|p| p.parameter_type.clone())
            .collect()
    }

    /// Build a reference to this method as declared by `declaring_type`
    #[must_use]
    pub fn as_reference(&self, declaring_type: CilTypeRc) -> MethodMember {
        MethodMember {
            declaring_type,
            name: self.name.clone(),
            return_type: self.return_type.clone(),
            parameters: self.parameter_types(),
            has_this: !self.is_static(),
            generic_arity: u16::try_from(self.generic_params.len()).unwrap_or(u16::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::TypeScope;

    #[test]
    fn test_generic_instance_element_access() {
        let helper = CilType::named("Game", "Helper", TypeScope::assembly("Game"));
        let element = MethodMember::new_static(
            helper,
            "Convert",
            CilType::placeholder(0, crate::metadata::typesystem::GenericParamOwner::Method),
            vec![CilType::object()],
        );
        let mut reference = MethodRef::from(MethodSpec {
            element,
            generic_args: vec![CilType::int32()],
        });

        assert_eq!(reference.generic_args().len(), 1);
        reference.element_mut().declaring_type =
            CilType::named("Game", "Facade", TypeScope::assembly("Game"));
        assert_eq!(reference.declaring_type().full_name(), "Game.Facade");
        assert_eq!(reference.name(), "Convert");
    }

    #[test]
    fn test_method_full_name() {
        let member = MethodMember::new(
            CilType::named("Game", "Farmer", TypeScope::assembly("Game")),
            "Eat",
            CilType::boolean(),
            vec![CilType::string(), CilType::int32()],
        );
        assert_eq!(
            member.full_name(),
            "System.Boolean Game.Farmer::Eat(System.String,System.Int32)"
        );
    }

    #[test]
    fn test_constructor_definition() {
        let ctor = MethodDef::constructor(Token::from_parts(Token::METHOD_DEF, 1))
            .with_parameter("value", CilType::int32());
        assert!(ctor.is_constructor());
        assert!(!ctor.is_static());

        let reference = ctor.as_reference(CilType::named("Game", "Item", TypeScope::CurrentModule));
        assert!(reference.is_constructor());
        assert!(reference.has_this);
        assert_eq!(reference.parameters.len(), 1);
    }
}
