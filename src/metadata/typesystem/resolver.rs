//! Cross-module type resolution.
//!
//! The [`AssemblyResolutionCache`] maps assembly names to loaded [`Module`]s so that a type
//! reference scoped to another assembly can be followed to its definition. The loader fills
//! the cache with every module a rewrite may reference, then seals it; from that point on it
//! is read-only and can be shared by parallel walks.
//!
//! Resolution failures are never errors here. A reference that cannot be followed resolves
//! to `None`, and callers treat that as "no opinion".

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    metadata::{
        module::{Module, TypeDef},
        typesystem::{CilType, CilTypeRc, NamedType, TypeScope},
    },
    Error::{CacheSealed, DuplicateModule},
    Result,
};

/// A registered module with a full-name index over its types
struct RegisteredModule {
    module: Arc<Module>,
    types: HashMap<String, usize>,
}

impl RegisteredModule {
    fn new(module: Arc<Module>) -> Self {
        let types = module
            .types
            .iter()
            .enumerate()
            .map(|(index, type_def)| (type_def.full_name(), index))
            .collect();

        RegisteredModule { module, types }
    }
}

/// A type definition found through the cache
#[derive(Clone)]
pub struct ResolvedType {
    module: Arc<Module>,
    index: usize,
}

impl ResolvedType {
    /// The resolved definition
    #[must_use]
    pub fn definition(&self) -> &TypeDef {
        &self.module.types[self.index]
    }

    /// The module defining the type
    #[must_use]
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Name of the assembly defining the type
    #[must_use]
    pub fn assembly_name(&self) -> &str {
        &self.module.name
    }

    /// A reference to the resolved type, scoped to its defining assembly
    #[must_use]
    pub fn reference(&self) -> CilTypeRc {
        self.definition()
            .as_reference(TypeScope::assembly(self.module.name.as_str()))
    }
}

impl std::fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]{}", self.module.name, self.definition().full_name())
    }
}

/// Name to module lookup for cross-module resolution.
///
/// # Thread Safety
///
/// Registration and lookup go through a `DashMap`, so the cache can be shared behind an
/// `Arc` and queried concurrently. Registration is rejected once the cache is sealed.
pub struct AssemblyResolutionCache {
    modules: DashMap<String, Arc<RegisteredModule>>,
    sealed: AtomicBool,
}

impl AssemblyResolutionCache {
    /// Create an empty, unsealed cache
    #[must_use]
    pub fn new() -> Self {
        AssemblyResolutionCache {
            modules: DashMap::new(),
            sealed: AtomicBool::new(false),
        }
    }

    /// Register a module under its assembly name
    ///
    /// ## Arguments
    /// * 'module' - The module to make resolvable
    ///
    /// # Errors
    /// Returns [`crate::Error::CacheSealed`] if the cache has been sealed, and
    /// [`crate::Error::DuplicateModule`] if a module with the same name is registered.
    pub fn register(&self, module: Arc<Module>) -> Result<()> {
        if self.is_sealed() {
            return Err(CacheSealed(module.name.clone()));
        }

        match self.modules.entry(module.name.clone()) {
            Entry::Occupied(_) => Err(DuplicateModule(module.name.clone())),
            Entry::Vacant(entry) => {
                log::debug!(
                    "Registered module {} {} ({} types)",
                    module.name,
                    module.version,
                    module.types.len()
                );
                entry.insert(Arc::new(RegisteredModule::new(module)));
                Ok(())
            }
        }
    }

    /// Freeze the cache; later registrations fail
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// Returns true once the cache has been sealed
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Look up a module by assembly name
    #[must_use]
    pub fn resolve(&self, assembly: &str) -> Option<Arc<Module>> {
        self.modules.get(assembly).map(|entry| entry.module.clone())
    }

    /// Follow a type reference to its definition.
    ///
    /// Only references scoped to another assembly are resolved. Constructed types resolve
    /// to the definition of their element type; generic parameters never resolve.
    ///
    /// ## Arguments
    /// * 'ty' - The type reference to resolve
    #[must_use]
    pub fn resolve_type(&self, ty: &CilType) -> Option<ResolvedType> {
        let named = ty.element_named()?;
        let TypeScope::Assembly(assembly) = &named.scope else {
            return None;
        };

        let Some(entry) = self.modules.get(assembly.as_str()) else {
            log::trace!("Unresolved assembly '{assembly}' for type '{ty}'");
            return None;
        };

        let full_name = ty.element_full_name();
        match entry.types.get(&full_name) {
            Some(index) => Some(ResolvedType {
                module: entry.module.clone(),
                index: *index,
            }),
            None => {
                log::trace!("Unresolved type '{full_name}' in assembly '{assembly}'");
                None
            }
        }
    }

    /// Names of all registered assemblies, sorted
    #[must_use]
    pub fn assembly_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if no module is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for AssemblyResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-scope a type taken from the module `from_assembly` so it can be used in another
/// module: every reference local to `from_assembly` becomes a reference into it.
///
/// Generic parameters are detached into positional placeholders. The declarations stay owned
/// by the cached module, so nothing reachable from the result can write to them.
#[must_use]
pub fn import_type(ty: &CilTypeRc, from_assembly: &str) -> CilTypeRc {
    match ty.as_ref() {
        CilType::Named(named) if named.scope == TypeScope::CurrentModule => {
            Arc::new(CilType::Named(NamedType {
                scope: TypeScope::assembly(from_assembly),
                declaring: named
                    .declaring
                    .as_ref()
                    .map(|declaring| import_type(declaring, from_assembly)),
                ..named.clone()
            }))
        }
        CilType::Named(_) => ty.clone(),
        CilType::GenericParam(param) => CilType::placeholder(param.position(), param.owner()),
        CilType::GenericInstance { element, args } => CilType::generic_instance(
            import_type(element, from_assembly),
            args.iter()
                .map(|arg| import_type(arg, from_assembly))
                .collect(),
        ),
        CilType::SzArray(element) => CilType::sz_array(import_type(element, from_assembly)),
        CilType::Array { element, rank } => Arc::new(CilType::Array {
            element: import_type(element, from_assembly),
            rank: *rank,
        }),
        CilType::ByRef(element) => CilType::by_ref(import_type(element, from_assembly)),
        CilType::Pointer(element) => {
            Arc::new(CilType::Pointer(import_type(element, from_assembly)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            token::Token,
            typesystem::{GenericParam, GenericParamOwner},
        },
        Error,
    };

    fn game_module() -> Arc<Module> {
        Arc::new(
            Module::new("Game", "1.6.0.0")
                .with_type(TypeDef::new(Token::from_parts(Token::TYPE_DEF, 2), "Game", "Farmer"))
                .with_type(TypeDef::new(Token::from_parts(Token::TYPE_DEF, 3), "Game", "Item")),
        )
    }

    #[test]
    fn test_resolve_type() {
        let cache = AssemblyResolutionCache::new();
        cache.register(game_module()).unwrap();

        let farmer = CilType::named("Game", "Farmer", TypeScope::assembly("Game"));
        let resolved = cache.resolve_type(&farmer).unwrap();
        assert_eq!(resolved.definition().full_name(), "Game.Farmer");
        assert_eq!(resolved.assembly_name(), "Game");

        let array = CilType::sz_array(farmer);
        assert!(cache.resolve_type(&array).is_some());

        let missing = CilType::named("Game", "Missing", TypeScope::assembly("Game"));
        assert!(cache.resolve_type(&missing).is_none());

        let other = CilType::named("Game", "Farmer", TypeScope::assembly("Other"));
        assert!(cache.resolve_type(&other).is_none());

        let local = CilType::named("Game", "Farmer", TypeScope::CurrentModule);
        assert!(cache.resolve_type(&local).is_none());
    }

    #[test]
    fn test_sealed_cache_rejects_registration() {
        let cache = AssemblyResolutionCache::new();
        cache.seal();
        assert!(cache.is_sealed());
        assert!(matches!(cache.register(game_module()), Err(Error::CacheSealed(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let cache = AssemblyResolutionCache::new();
        cache.register(game_module()).unwrap();
        assert!(matches!(
            cache.register(game_module()),
            Err(Error::DuplicateModule(name)) if name == "Game"
        ));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.assembly_names(), vec!["Game".to_string()]);
    }

    #[test]
    fn test_import_type() {
        let local = CilType::generic_instance(
            CilType::named("System.Collections.Generic", "List`1", TypeScope::core()),
            vec![CilType::named("Game", "Item", TypeScope::CurrentModule)],
        );
        let imported = import_type(&local, "Game");
        match imported.as_ref() {
            CilType::GenericInstance { element, args } => {
                assert_eq!(element.scope(), TypeScope::core());
                assert_eq!(args[0].scope(), TypeScope::assembly("Game"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(imported.full_name(), local.full_name());
    }

    #[test]
    fn test_import_type_detaches_generic_params() {
        let param = GenericParam::new("T", 1, GenericParamOwner::Type);
        param.add_constraint(CilType::named("Game", "Item", TypeScope::CurrentModule));

        let imported = import_type(&CilType::sz_array(CilType::generic_param(&param)), "Game");
        assert_eq!(imported.full_name(), "!1[]");
        match imported.as_ref() {
            CilType::SzArray(element) => match element.as_ref() {
                CilType::GenericParam(reference) => {
                    assert!(reference.upgrade().is_none());
                    assert_eq!(reference.owner(), GenericParamOwner::Type);
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }
}
