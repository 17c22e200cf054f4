//! Type references as they appear at use sites of a module.
//!
//! Every place in a module that mentions a type (a field type, a parameter, a base type, a
//! `castclass` operand, a generic argument, ...) holds a [`CilTypeRc`]. Type reference nodes
//! are immutable and shared; a rewrite never mutates a node, it builds a replacement node and
//! swaps it into the owning slot.
//!
//! # Key Components
//!
//! - [`CilType`]: Closed union over the kinds of type references
//! - [`GenericParam`]: A declared generic parameter with its (mutable) constraint list
//! - [`GenericParamRef`]: Weak handle from a reference to its declared parameter
//! - [`TypeNamePattern`] / [`is_same_type`]: Placeholder-tolerant type identity
//! - [`AssemblyResolutionCache`]: Cross-module name resolution
//!
//! # Generic parameters and cycles
//!
//! A generic parameter's constraint may mention the enclosing generic type
//! (`class Node<T> where T : IComparable<Node<T>>`). Declarations own their parameters
//! strongly while references only hold a [`GenericParamRef`], so such cycles never keep the
//! graph alive. Traversals that follow constraints must track the parameters they already
//! entered.
//!
//! # Examples
//!
//! ```rust
//! use modrewrite::metadata::typesystem::{CilType, TypeScope};
//!
//! let item = CilType::named("Game", "Item", TypeScope::assembly("Game"));
//! let list = CilType::generic_instance(
//!     CilType::named("System.Collections.Generic", "List`1", TypeScope::core()),
//!     vec![item],
//! );
//! assert_eq!(list.full_name(), "System.Collections.Generic.List`1<Game.Item>");
//! ```

pub mod matcher;
mod resolver;

use std::{
    fmt,
    sync::{Arc, RwLock, Weak},
};

use strum::Display;

pub use matcher::{is_same_type, is_same_type_name, TypeNamePattern};
pub use resolver::{import_type, AssemblyResolutionCache, ResolvedType};

/// Name of the assembly hosting the runtime's core types.
pub const CORE_LIBRARY: &str = "System.Runtime";

/// Reference to a `CilType`
pub type CilTypeRc = Arc<CilType>;
/// Reference to a declared `GenericParam`
pub type GenericParamRc = Arc<GenericParam>;

/// The module a named type is defined in, as seen from the referencing module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeScope {
    /// Defined in the module holding the reference
    CurrentModule,
    /// Defined in another module, identified by its assembly name
    Assembly(String),
}

impl TypeScope {
    /// Scope of a type defined in the assembly `name`
    pub fn assembly(name: impl Into<String>) -> Self {
        TypeScope::Assembly(name.into())
    }

    /// Scope of the runtime's core library
    #[must_use]
    pub fn core() -> Self {
        TypeScope::Assembly(CORE_LIBRARY.to_string())
    }

    /// The referenced assembly name, `None` for the current module
    #[must_use]
    pub fn assembly_name(&self) -> Option<&str> {
        match self {
            TypeScope::CurrentModule => None,
            TypeScope::Assembly(name) => Some(name),
        }
    }
}

/// Whether a generic parameter is declared on a type or on a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum GenericParamOwner {
    /// Declared by a generic type, placeholder form `!n`
    Type,
    /// Declared by a generic method, placeholder form `!!n`
    Method,
}

/// A named (non-constructed) type reference
#[derive(Debug, Clone)]
pub struct NamedType {
    /// Namespace (empty for nested and global types)
    pub namespace: String,
    /// Name, including the generic arity marker (e.g. ``List`1``)
    pub name: String,
    /// Where the type is defined
    pub scope: TypeScope,
    /// The enclosing type, for nested types
    pub declaring: Option<CilTypeRc>,
    /// Type is a value type
    pub is_value_type: bool,
}

/// A type reference at a use site.
///
/// The kinds of type references are fixed, so they are modelled as a closed union and
/// consumers match exhaustively instead of probing at runtime.
#[derive(Debug)]
pub enum CilType {
    /// A class, interface or value type referenced by name
    Named(NamedType),
    /// A generic type filled with concrete (or placeholder) arguments
    GenericInstance {
        /// The open generic type
        element: CilTypeRc,
        /// One argument per generic parameter of `element`
        args: Vec<CilTypeRc>,
    },
    /// A generic parameter, or a positional placeholder for one
    GenericParam(GenericParamRef),
    /// Single-dimensional, zero based array
    SzArray(CilTypeRc),
    /// Multi-dimensional array
    Array {
        /// The element type
        element: CilTypeRc,
        /// Number of dimensions
        rank: u32,
    },
    /// Managed pointer (`T&`)
    ByRef(CilTypeRc),
    /// Unmanaged pointer (`T*`)
    Pointer(CilTypeRc),
}

impl CilType {
    /// Create a reference to a class or interface
    pub fn named(
        namespace: impl Into<String>,
        name: impl Into<String>,
        scope: TypeScope,
    ) -> CilTypeRc {
        Arc::new(CilType::Named(NamedType {
            namespace: namespace.into(),
            name: name.into(),
            scope,
            declaring: None,
            is_value_type: false,
        }))
    }

    /// Create a reference to a value type
    pub fn value_type(
        namespace: impl Into<String>,
        name: impl Into<String>,
        scope: TypeScope,
    ) -> CilTypeRc {
        Arc::new(CilType::Named(NamedType {
            namespace: namespace.into(),
            name: name.into(),
            scope,
            declaring: None,
            is_value_type: true,
        }))
    }

    /// Create a reference to a type nested in `declaring`. The scope is inherited.
    pub fn nested(declaring: &CilTypeRc, name: impl Into<String>) -> CilTypeRc {
        Arc::new(CilType::Named(NamedType {
            namespace: String::new(),
            name: name.into(),
            scope: declaring.scope(),
            declaring: Some(declaring.clone()),
            is_value_type: false,
        }))
    }

    /// Create a generic instantiation of `element`
    #[must_use]
    pub fn generic_instance(element: CilTypeRc, args: Vec<CilTypeRc>) -> CilTypeRc {
        Arc::new(CilType::GenericInstance { element, args })
    }

    /// Create a reference to a declared generic parameter
    #[must_use]
    pub fn generic_param(param: &GenericParamRc) -> CilTypeRc {
        Arc::new(CilType::GenericParam(GenericParamRef::new(param)))
    }

    /// Create an unbound positional placeholder (`!n` or `!!n`)
    #[must_use]
    pub fn placeholder(position: u16, owner: GenericParamOwner) -> CilTypeRc {
        Arc::new(CilType::GenericParam(GenericParamRef::positional(
            position, owner,
        )))
    }

    /// Create a single-dimensional array of `element`
    #[must_use]
    pub fn sz_array(element: CilTypeRc) -> CilTypeRc {
        Arc::new(CilType::SzArray(element))
    }

    /// Create a managed pointer to `element`
    #[must_use]
    pub fn by_ref(element: CilTypeRc) -> CilTypeRc {
        Arc::new(CilType::ByRef(element))
    }

    /// `System.Void`
    #[must_use]
    pub fn void() -> CilTypeRc {
        CilType::value_type("System", "Void", TypeScope::core())
    }

    /// `System.Object`
    #[must_use]
    pub fn object() -> CilTypeRc {
        CilType::named("System", "Object", TypeScope::core())
    }

    /// `System.String`
    #[must_use]
    pub fn string() -> CilTypeRc {
        CilType::named("System", "String", TypeScope::core())
    }

    /// `System.Boolean`
    #[must_use]
    pub fn boolean() -> CilTypeRc {
        CilType::value_type("System", "Boolean", TypeScope::core())
    }

    /// `System.Int32`
    #[must_use]
    pub fn int32() -> CilTypeRc {
        CilType::value_type("System", "Int32", TypeScope::core())
    }

    /// The defining scope of this reference; constructed types report their element's scope
    /// and generic parameters belong to the current module.
    #[must_use]
    pub fn scope(&self) -> TypeScope {
        match self {
            CilType::Named(named) => named.scope.clone(),
            CilType::GenericInstance { element, .. }
            | CilType::SzArray(element)
            | CilType::Array { element, .. }
            | CilType::ByRef(element)
            | CilType::Pointer(element) => element.scope(),
            CilType::GenericParam(_) => TypeScope::CurrentModule,
        }
    }

    /// The named type at the bottom of this reference (`List`1` for `List<int>[]`), if any
    #[must_use]
    pub fn element_named(&self) -> Option<&NamedType> {
        match self {
            CilType::Named(named) => Some(named),
            CilType::GenericInstance { element, .. }
            | CilType::SzArray(element)
            | CilType::Array { element, .. }
            | CilType::ByRef(element)
            | CilType::Pointer(element) => element.element_named(),
            CilType::GenericParam(_) => None,
        }
    }

    /// Full name of the named type without generic arguments or decorations
    /// (`System.Collections.Generic.List`1` for `List<int>[]`).
    #[must_use]
    pub fn element_full_name(&self) -> String {
        match self {
            CilType::Named(_) => self.full_name(),
            CilType::GenericInstance { element, .. }
            | CilType::SzArray(element)
            | CilType::Array { element, .. }
            | CilType::ByRef(element)
            | CilType::Pointer(element) => element.element_full_name(),
            CilType::GenericParam(_) => self.full_name(),
        }
    }

    /// The full name, formatted like `Namespace.Outer/Inner`, `Ns.Type`2<A,B>`, `T[]`, `T&`.
    /// Unbound generic parameters render as `!n` (type) or `!!n` (method).
    #[must_use]
    pub fn full_name(&self) -> String {
        self.to_string()
    }

    /// Returns true if this type is the universal base type `System.Object`
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, CilType::Named(named) if named.declaring.is_none()
            && named.namespace == "System"
            && named.name == "Object")
    }

    /// Returns true if this reference denotes a value type
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self {
            CilType::Named(named) => named.is_value_type,
            CilType::GenericInstance { element, .. } => element.is_value_type(),
            _ => false,
        }
    }

    /// Returns a copy of this reference pointing at a different scope. Only named types carry
    /// a scope; constructed types are rebuilt around their re-scoped element.
    #[must_use]
    pub fn with_scope(&self, scope: TypeScope) -> CilTypeRc {
        match self {
            CilType::Named(named) => Arc::new(CilType::Named(NamedType {
                scope: scope.clone(),
                declaring: named.declaring.as_ref().map(|d| d.with_scope(scope)),
                ..named.clone()
            })),
            CilType::GenericInstance { element, args } => {
                CilType::generic_instance(element.with_scope(scope), args.clone())
            }
            CilType::SzArray(element) => CilType::sz_array(element.with_scope(scope)),
            CilType::Array { element, rank } => Arc::new(CilType::Array {
                element: element.with_scope(scope),
                rank: *rank,
            }),
            CilType::ByRef(element) => CilType::by_ref(element.with_scope(scope)),
            CilType::Pointer(element) => Arc::new(CilType::Pointer(element.with_scope(scope))),
            CilType::GenericParam(param) => Arc::new(CilType::GenericParam(param.clone())),
        }
    }
}

impl fmt::Display for CilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CilType::Named(named) => match &named.declaring {
                Some(declaring) => write!(f, "{}/{}", declaring, named.name),
                None if named.namespace.is_empty() => write!(f, "{}", named.name),
                None => write!(f, "{}.{}", named.namespace, named.name),
            },
            CilType::GenericInstance { element, args } => {
                write!(f, "{element}<")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            CilType::GenericParam(param) => write!(f, "{}", param.name()),
            CilType::SzArray(element) => write!(f, "{element}[]"),
            CilType::Array { element, rank } => {
                write!(f, "{element}[")?;
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            CilType::ByRef(element) => write!(f, "{element}&"),
            CilType::Pointer(element) => write!(f, "{element}*"),
        }
    }
}

/// A generic parameter declared by a type or method.
///
/// The constraint list is the only mutable part of the type graph that is shared between
/// sites; rewrites swap the whole list under the write lock.
#[derive(Debug)]
pub struct GenericParam {
    /// Declared name (`T`, `TKey`); empty for parameters only known by position
    pub name: String,
    /// Zero based position in the owner's parameter list
    pub position: u16,
    /// Declared on a type or a method
    pub owner: GenericParamOwner,
    /// Constraint types
    constraints: RwLock<Vec<CilTypeRc>>,
}

impl GenericParam {
    /// Create a new, unconstrained generic parameter
    pub fn new(name: impl Into<String>, position: u16, owner: GenericParamOwner) -> GenericParamRc {
        Arc::new(GenericParam {
            name: name.into(),
            position,
            owner,
            constraints: RwLock::new(Vec::new()),
        })
    }

    /// Returns a snapshot of the constraint list
    #[must_use]
    pub fn constraints(&self) -> Vec<CilTypeRc> {
        read_lock!(self.constraints).clone()
    }

    /// Append a constraint
    pub fn add_constraint(&self, constraint: CilTypeRc) {
        write_lock!(self.constraints).push(constraint);
    }

    /// Replace the whole constraint list
    pub fn set_constraints(&self, constraints: Vec<CilTypeRc>) {
        *write_lock!(self.constraints) = constraints;
    }

    /// The placeholder spelling of this parameter (`!0`, `!!1`)
    #[must_use]
    pub fn placeholder(&self) -> String {
        placeholder_name(self.position, self.owner)
    }
}

fn placeholder_name(position: u16, owner: GenericParamOwner) -> String {
    match owner {
        GenericParamOwner::Type => format!("!{position}"),
        GenericParamOwner::Method => format!("!!{position}"),
    }
}

/// A smart reference from a use site to a declared `GenericParam`.
///
/// Holds a weak reference so that constraints referring back to the declaring type cannot
/// form reference cycles. A reference created from a bare signature position has no
/// declaration at all and renders as a placeholder.
#[derive(Clone, Debug)]
pub struct GenericParamRef {
    weak_ref: Weak<GenericParam>,
    position: u16,
    owner: GenericParamOwner,
}

impl GenericParamRef {
    /// Create a new `GenericParamRef` from a declared parameter
    #[must_use]
    pub fn new(param: &GenericParamRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(param),
            position: param.position,
            owner: param.owner,
        }
    }

    /// Create a reference which only knows the parameter position
    #[must_use]
    pub fn positional(position: u16, owner: GenericParamOwner) -> Self {
        Self {
            weak_ref: Weak::new(),
            position,
            owner,
        }
    }

    /// Get a strong reference to the declared parameter, `None` for placeholders or if the
    /// declaration has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<GenericParamRc> {
        self.weak_ref.upgrade()
    }

    /// Zero based position in the owner's parameter list
    #[must_use]
    pub fn position(&self) -> u16 {
        self.position
    }

    /// Declared on a type or a method
    #[must_use]
    pub fn owner(&self) -> GenericParamOwner {
        self.owner
    }

    /// Declared name if available, placeholder spelling otherwise
    #[must_use]
    pub fn name(&self) -> String {
        match self.upgrade() {
            Some(param) if !param.name.is_empty() => param.name.clone(),
            _ => placeholder_name(self.position, self.owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_formats() {
        let item = CilType::named("Game", "Item", TypeScope::assembly("Game"));
        let dict = CilType::generic_instance(
            CilType::named(
                "System.Collections.Generic",
                "Dictionary`2",
                TypeScope::core(),
            ),
            vec![CilType::string(), item.clone()],
        );
        assert_eq!(
            dict.full_name(),
            "System.Collections.Generic.Dictionary`2<System.String,Game.Item>"
        );
        assert_eq!(CilType::sz_array(item.clone()).full_name(), "Game.Item[]");
        assert_eq!(CilType::by_ref(item.clone()).full_name(), "Game.Item&");

        let nested = CilType::nested(&item, "Stack");
        assert_eq!(nested.full_name(), "Game.Item/Stack");
        assert_eq!(nested.scope(), TypeScope::assembly("Game"));

        let matrix = Arc::new(CilType::Array {
            element: CilType::int32(),
            rank: 3,
        });
        assert_eq!(matrix.full_name(), "System.Int32[,,]");
    }

    #[test]
    fn test_generic_param_names() {
        let param = GenericParam::new("TValue", 1, GenericParamOwner::Type);
        let reference = CilType::generic_param(&param);
        assert_eq!(reference.full_name(), "TValue");

        let placeholder = CilType::placeholder(1, GenericParamOwner::Method);
        assert_eq!(placeholder.full_name(), "!!1");
        assert_eq!(param.placeholder(), "!1");
    }

    #[test]
    fn test_generic_param_ref_is_weak() {
        let param = GenericParam::new("T", 0, GenericParamOwner::Type);
        let reference = GenericParamRef::new(&param);
        assert!(reference.upgrade().is_some());
        drop(param);
        assert!(reference.upgrade().is_none());
        assert_eq!(reference.name(), "!0");
    }

    #[test]
    fn test_self_referential_constraint_drops() {
        // class Node<T> where T : IComparable<Node<T>>
        let param = GenericParam::new("T", 0, GenericParamOwner::Type);
        let node = CilType::named("Game", "Node`1", TypeScope::CurrentModule);
        let node_of_t = CilType::generic_instance(node, vec![CilType::generic_param(&param)]);
        let comparable = CilType::generic_instance(
            CilType::named("System", "IComparable`1", TypeScope::core()),
            vec![node_of_t],
        );
        param.add_constraint(comparable);

        let weak = Arc::downgrade(&param);
        drop(param);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_element_helpers() {
        let list = CilType::generic_instance(
            CilType::named("System.Collections.Generic", "List`1", TypeScope::core()),
            vec![CilType::int32()],
        );
        let array = CilType::sz_array(list);
        assert_eq!(array.element_full_name(), "System.Collections.Generic.List`1");
        assert_eq!(array.scope(), TypeScope::core());
        assert!(CilType::object().is_object());
        assert!(!CilType::string().is_object());
        assert!(CilType::int32().is_value_type());
    }

    #[test]
    fn test_with_scope() {
        let item = CilType::named("Game", "Item", TypeScope::CurrentModule);
        let moved = CilType::sz_array(item).with_scope(TypeScope::assembly("Game"));
        assert_eq!(moved.scope(), TypeScope::assembly("Game"));
        assert_eq!(moved.full_name(), "Game.Item[]");
    }
}
