//! State visible to walker callbacks while one module is walked.

use std::collections::HashMap;

use crate::{
    metadata::{
        method::LocalVariable,
        module::Module,
        typesystem::{
            import_type, AssemblyResolutionCache, CilType, CilTypeRc, ResolvedType, TypeScope,
        },
    },
    Result,
};

/// Constructor parameter lists of the module's own types, keyed by type full name
pub(crate) type LocalConstructors = HashMap<String, Vec<Vec<CilTypeRc>>>;

/// Snapshot the constructors of every type of `module`.
pub(crate) fn local_constructors(module: &Module) -> LocalConstructors {
    module
        .types
        .iter()
        .map(|type_def| {
            let reference = type_def.as_reference(TypeScope::CurrentModule);
            let constructors = type_def
                .constructors(&reference)
                .into_iter()
                .map(|constructor| constructor.parameters)
                .collect();
            (type_def.full_name(), constructors)
        })
        .collect()
}

/// The module being walked, as seen by type, method and instruction callbacks.
///
/// The declaration graph itself is borrowed by the walker, so the context only exposes the
/// module's identity, its assembly references and cross-module resolution.
pub struct ModuleContext<'a> {
    name: &'a str,
    assembly_refs: &'a mut Vec<String>,
    cache: &'a AssemblyResolutionCache,
    constructors: &'a LocalConstructors,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        assembly_refs: &'a mut Vec<String>,
        cache: &'a AssemblyResolutionCache,
        constructors: &'a LocalConstructors,
    ) -> Self {
        ModuleContext {
            name,
            assembly_refs,
            cache,
            constructors,
        }
    }

    /// Name of the module being walked
    #[must_use]
    pub fn module_name(&self) -> &str {
        self.name
    }

    /// The shared resolution cache
    #[must_use]
    pub fn cache(&self) -> &AssemblyResolutionCache {
        self.cache
    }

    /// Returns true if the module references the assembly `name`
    #[must_use]
    pub fn references_assembly(&self, name: &str) -> bool {
        self.assembly_refs.iter().any(|r| r == name)
    }

    /// Add an assembly reference unless it is already present. Returns true if added.
    pub fn import_assembly(&mut self, name: &str) -> bool {
        if name == self.name || self.references_assembly(name) {
            return false;
        }

        log::debug!("{}: adding assembly reference '{name}'", self.name);
        self.assembly_refs.push(name.to_string());
        true
    }

    /// Follow a reference into another module
    #[must_use]
    pub fn resolve_type(&self, ty: &CilType) -> Option<ResolvedType> {
        self.cache.resolve_type(ty)
    }

    /// Parameter lists of every instance constructor of `ty`, with parameter types scoped
    /// as seen from this module. Local types are answered from the snapshot taken before the
    /// walk started; other types go through the cache.
    #[must_use]
    pub fn constructors_of(&self, ty: &CilType) -> Vec<Vec<CilTypeRc>> {
        match ty.scope() {
            TypeScope::CurrentModule => self
                .constructors
                .get(&ty.element_full_name())
                .cloned()
                .unwrap_or_default(),
            TypeScope::Assembly(_) => {
                let Some(resolved) = self.cache.resolve_type(ty) else {
                    return Vec::new();
                };
                let assembly = resolved.assembly_name();
                resolved
                    .definition()
                    .constructors(&resolved.reference())
                    .into_iter()
                    .map(|constructor| {
                        constructor
                            .parameters
                            .iter()
                            .map(|parameter| import_type(parameter, assembly))
                            .collect()
                    })
                    .collect()
            }
        }
    }
}

/// Access to the body of the method whose instruction is being visited.
pub struct BodyEditor<'a> {
    method: &'a str,
    index: usize,
    variables: &'a mut Vec<LocalVariable>,
}

impl<'a> BodyEditor<'a> {
    pub(crate) fn new(
        method: &'a str,
        index: usize,
        variables: &'a mut Vec<LocalVariable>,
    ) -> Self {
        BodyEditor {
            method,
            index,
            variables,
        }
    }

    /// Name of the method owning the body
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method
    }

    /// Index of the current instruction in the body
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The body's local variables
    #[must_use]
    pub fn variables(&self) -> &[LocalVariable] {
        self.variables
    }

    /// Declare a new local variable and return its slot index
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the body already uses every local slot.
    pub fn add_variable(&mut self, variable_type: CilTypeRc) -> Result<u16> {
        let Ok(index) = u16::try_from(self.variables.len()) else {
            return Err(malformed_error!(
                "{}: no local slot left for {}",
                self.method,
                variable_type
            ));
        };
        self.variables.push(LocalVariable {
            index,
            variable_type,
        });
        Ok(index)
    }
}
