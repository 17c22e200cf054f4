//! The in-memory model of one compiled module and the types it declares.
//!
//! A [`Module`] is produced by an external loader, walked and possibly mutated in place by
//! the rewriting engine, and then handed back for serialization. The model keeps only what
//! the engine inspects: declarations, signatures, attributes and method bodies.
//!
//! # Key Types
//! - [`Module`]: Assembly identity, assembly references and owned type definitions
//! - [`TypeDef`]: A type declared by the module
//! - [`PropertyDef`] / [`EventDef`]: Accessor groups declared by a type

use std::sync::Arc;

use bitflags::bitflags;

use crate::metadata::{
    customattributes::CustomAttribute,
    field::FieldDef,
    method::{MethodDef, MethodMember},
    token::Token,
    typesystem::{CilType, CilTypeRc, GenericParamRc, NamedType, TypeScope},
};

/// Name of the implicit type holding module-level members
pub const MODULE_TYPE_NAME: &str = "<Module>";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Type attributes
    pub struct TypeAttributes: u32 {
        /// Class is public scope
        const PUBLIC = 0x0000_0001;
        /// Class is nested with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Class fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Class is abstract
        const ABSTRACT = 0x0000_0080;
        /// Class cannot be extended
        const SEALED = 0x0000_0100;
        /// Class name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Class is serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Initialize the class any time before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

/// A property declared by a type, described by its accessor names
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Property type
    pub property_type: CilTypeRc,
    /// Name of the getter method, if any
    pub getter: Option<String>,
    /// Name of the setter method, if any
    pub setter: Option<String>,
}

impl PropertyDef {
    /// A property with the conventional `get_`/`set_` accessors
    pub fn new(name: impl Into<String>, property_type: CilTypeRc) -> Self {
        let name = name.into();
        PropertyDef {
            getter: Some(format!("get_{name}")),
            setter: Some(format!("set_{name}")),
            name,
            property_type,
        }
    }
}

/// An event declared by a type, described by its accessor names
#[derive(Debug, Clone)]
pub struct EventDef {
    /// Event name
    pub name: String,
    /// Delegate type
    pub event_type: CilTypeRc,
    /// Name of the add accessor
    pub add_method: String,
    /// Name of the remove accessor
    pub remove_method: String,
}

impl EventDef {
    /// An event with the conventional `add_`/`remove_` accessors
    pub fn new(name: impl Into<String>, event_type: CilTypeRc) -> Self {
        let name = name.into();
        EventDef {
            add_method: format!("add_{name}"),
            remove_method: format!("remove_{name}"),
            name,
            event_type,
        }
    }
}

/// A type declared by the module
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Token
    pub token: Token,
    /// Namespace (empty for nested types)
    pub namespace: String,
    /// Name
    pub name: String,
    /// Full name of the enclosing type, for nested types
    pub enclosing: Option<String>,
    /// Attributes
    pub flags: TypeAttributes,
    /// Base type, `None` for interfaces and the module type
    pub base: Option<CilTypeRc>,
    /// Implemented interfaces
    pub interfaces: Vec<CilTypeRc>,
    /// Declared generic parameters
    pub generic_params: Vec<GenericParamRc>,
    /// Custom attributes on the type
    pub custom_attributes: Vec<CustomAttribute>,
    /// Declared fields
    pub fields: Vec<FieldDef>,
    /// Declared methods
    pub methods: Vec<MethodDef>,
    /// Declared properties
    pub properties: Vec<PropertyDef>,
    /// Declared events
    pub events: Vec<EventDef>,
}

impl TypeDef {
    /// Create a public class deriving from `System.Object`
    pub fn new(token: Token, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDef {
            token,
            namespace: namespace.into(),
            name: name.into(),
            enclosing: None,
            flags: TypeAttributes::PUBLIC,
            base: Some(CilType::object()),
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            custom_attributes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Create the implicit `<Module>` type
    #[must_use]
    pub fn module_type() -> Self {
        TypeDef {
            base: None,
            flags: TypeAttributes::empty(),
            ..TypeDef::new(Token::from_parts(Token::TYPE_DEF, 1), "", MODULE_TYPE_NAME)
        }
    }

    /// Set the base type
    #[must_use]
    pub fn with_base(mut self, base: CilTypeRc) -> Self {
        self.base = Some(base);
        self
    }

    /// Append an implemented interface
    #[must_use]
    pub fn with_interface(mut self, interface: CilTypeRc) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Append a declared generic parameter
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

    /// Append a field
    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a method
    #[must_use]
    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Append a property
    #[must_use]
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Append an event
    #[must_use]
    pub fn with_event(mut self, event: EventDef) -> Self {
        self.events.push(event);
        self
    }

    /// Full name formatted like `Namespace.Name` or `Namespace.Outer/Inner`
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.enclosing {
            Some(enclosing) => format!("{enclosing}/{}", self.name),
            None if self.namespace.is_empty() => self.name.clone(),
            None => format!("{}.{}", self.namespace, self.name),
        }
    }

    /// Returns true for the implicit `<Module>` type
    #[must_use]
    pub fn is_module_type(&self) -> bool {
        self.namespace.is_empty() && self.enclosing.is_none() && self.name == MODULE_TYPE_NAME
    }

    /// Returns true if the base type is `System.ValueType` or `System.Enum`
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(self.base.as_deref(), Some(CilType::Named(named))
            if named.namespace == "System" && (named.name == "ValueType" || named.name == "Enum"))
    }

    /// A reference to this type with the given scope. Nested types keep their enclosing
    /// name as a flat namespace-less reference.
    #[must_use]
    pub fn as_reference(&self, scope: TypeScope) -> CilTypeRc {
        let reference = CilType::Named(NamedType {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            scope: scope.clone(),
            declaring: self.enclosing.as_ref().map(|enclosing| {
                let (namespace, name) = match enclosing.rsplit_once('.') {
                    Some((namespace, name)) => (namespace, name),
                    None => ("", enclosing.as_str()),
                };
                CilType::named(namespace, name, scope.clone())
            }),
            is_value_type: self.is_value_type(),
        });
        Arc::new(reference)
    }

    /// Find a method by name and parameter count
    #[must_use]
    pub fn find_method(&self, name: &str, parameter_count: usize) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.parameters.len() == parameter_count)
    }

    /// Instance constructors as references declared by `declaring_type`
    #[must_use]
    pub fn constructors(&self, declaring_type: &CilTypeRc) -> Vec<MethodMember> {
        self.methods
            .iter()
            .filter(|method| method.is_constructor())
            .map(|method| method.as_reference(declaring_type.clone()))
            .collect()
    }
}

/// One compiled module
#[derive(Debug, Clone)]
pub struct Module {
    /// Assembly name
    pub name: String,
    /// Assembly version, formatted `major.minor.build.revision`
    pub version: String,
    /// Names of referenced assemblies
    pub assembly_refs: Vec<String>,
    /// Module-level custom attributes
    pub custom_attributes: Vec<CustomAttribute>,
    /// Declared types, starting with `<Module>`
    pub types: Vec<TypeDef>,
}

impl Module {
    /// Create an empty module holding only the `<Module>` type
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            version: version.into(),
            assembly_refs: Vec::new(),
            custom_attributes: Vec::new(),
            types: vec![TypeDef::module_type()],
        }
    }

    /// Append an assembly reference
    #[must_use]
    pub fn with_assembly_ref(mut self, name: impl Into<String>) -> Self {
        self.assembly_refs.push(name.into());
        self
    }

    /// Append a type definition
    #[must_use]
    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.types.push(type_def);
        self
    }

    /// Append a module-level custom attribute
    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.custom_attributes.push(attribute);
        self
    }

    /// Returns true if the module references the assembly `name`
    #[must_use]
    pub fn references_assembly(&self, name: &str) -> bool {
        self.assembly_refs.iter().any(|r| r == name)
    }
}
