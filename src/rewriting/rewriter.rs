//! Full-graph search and replace of type references.
//!
//! A [`TypeReferenceRewriter`] pairs a [`TypeMatchPredicate`] with a [`TypeRewriteRule`].
//! Wherever the walker offers a type reference that the predicate matches, the rule gets to
//! produce a replacement. Because the walker visits every reference site, including
//! generic arguments, constraints, instruction operands and custom attribute signatures, a
//! rewrite is applied consistently across the whole module.
//!
//! # Examples
//!
//! ```rust
//! use modrewrite::{
//!     metadata::{typesystem::AssemblyResolutionCache, Module},
//!     rewriting::{TypeMapRule, TypeReferenceRewriter},
//! };
//!
//! let rule = TypeMapRule::new()
//!     .with_mapping(
//!         "Microsoft.Xna.Framework.Vector2",
//!         None,
//!         "Microsoft.Xna.Framework.Vector2",
//!         "MonoGame.Framework",
//!     )
//!     .unwrap();
//! let rewriter = TypeReferenceRewriter::for_type_map(rule);
//!
//! let cache = AssemblyResolutionCache::new();
//! let mut module = Module::new("Mod", "1.0.0.0");
//! assert!(!rewriter.rewrite_module(&mut module, &cache).unwrap());
//! ```

use std::{collections::HashMap, sync::Arc};

use crate::{
    metadata::{
        module::Module,
        typesystem::{AssemblyResolutionCache, CilType, CilTypeRc, NamedType, TypeScope},
    },
    rewriting::{
        context::ModuleContext,
        handler::{HandlerKind, InstructionHandler},
        predicate::TypeMatchPredicate,
        walker::walk,
        Handled, RewriteResult,
    },
    Result,
};

/// Produces the replacement for a matched type reference.
pub trait TypeRewriteRule: Send + Sync {
    /// Return a replacement for `ty`, or `None` to leave it unchanged.
    ///
    /// # Errors
    /// Any error aborts the walk of the current module.
    fn rewrite_if_needed(
        &self,
        ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Option<CilTypeRc>>;
}

/// Rewrites every type reference matched by a predicate, using a rule.
pub struct TypeReferenceRewriter<R> {
    predicate: TypeMatchPredicate,
    rule: R,
}

impl<R: TypeRewriteRule> TypeReferenceRewriter<R> {
    /// Create a rewriter applying `rule` wherever `predicate` matches
    pub fn new(predicate: TypeMatchPredicate, rule: R) -> Self {
        TypeReferenceRewriter { predicate, rule }
    }

    /// The predicate deciding which references the rule sees
    pub fn predicate(&self) -> &TypeMatchPredicate {
        &self.predicate
    }

    /// Run the rewriter on its own over `module`, returning true if anything changed.
    ///
    /// # Errors
    /// Returns errors raised by the rule and
    /// [`crate::Error::AttributeConstructorNotFound`] when an attribute can't be rebuilt.
    pub fn rewrite_module(
        &self,
        module: &mut Module,
        cache: &AssemblyResolutionCache,
    ) -> Result<bool> {
        walk(
            module,
            cache,
            |ctx, ty| Ok(self.handle_type(ctx, ty)?.replacement),
            |_, _, _| Ok(None),
        )
    }
}

impl TypeReferenceRewriter<TypeMapRule> {
    /// A rewriter for every source type of `rule`
    #[must_use]
    pub fn for_type_map(rule: TypeMapRule) -> Self {
        let predicate = TypeMatchPredicate::for_type_names(
            rule.source_names(),
            RewriteResult::Rewritten,
            "platform type references",
        );
        TypeReferenceRewriter::new(predicate, rule)
    }
}

impl<R: TypeRewriteRule> InstructionHandler for TypeReferenceRewriter<R> {
    fn noun_phrase(&self) -> &str {
        self.predicate.noun_phrase()
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn handle_type(
        &self,
        ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Handled<CilTypeRc>> {
        if !self.predicate.is_match_type(ty) {
            return Ok(Handled::none());
        }

        Ok(match self.rule.rewrite_if_needed(ctx, ty)? {
            Some(replacement) => Handled::rewritten(replacement),
            None => Handled::none(),
        })
    }
}

/// Target of one mapping
#[derive(Debug, Clone)]
struct MappedType {
    from_assembly: Option<String>,
    namespace: String,
    /// Type name followed by nested type names
    names: Vec<String>,
    assembly: String,
}

/// Maps types by full name to their equivalent in another assembly.
///
/// The rule fires only for references into another assembly which are not yet scoped to the
/// target, so applying it twice has no further effect.
#[derive(Debug, Clone, Default)]
pub struct TypeMapRule {
    targets: HashMap<String, MappedType>,
}

impl TypeMapRule {
    /// Create an empty rule
    #[must_use]
    pub fn new() -> Self {
        TypeMapRule::default()
    }

    /// Add a mapping.
    ///
    /// ## Arguments
    /// * 'from' - Full name of the type to replace
    /// * 'from_assembly' - Only replace references into this assembly, any assembly if `None`
    /// * 'to' - Full name of the replacement type (`Namespace.Outer/Inner` for nested types)
    /// * 'to_assembly' - Assembly defining the replacement type
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a name is empty.
    pub fn with_mapping(
        mut self,
        from: &str,
        from_assembly: Option<&str>,
        to: &str,
        to_assembly: &str,
    ) -> Result<Self> {
        if from.is_empty() || to.is_empty() || to_assembly.is_empty() {
            return Err(malformed_error!(
                "Type mapping '{}' -> '[{}]{}' has an empty name",
                from,
                to_assembly,
                to
            ));
        }

        let mut segments = to.split('/');
        let outer = segments.next().unwrap_or_default();
        let (namespace, name) = outer.rsplit_once('.').unwrap_or(("", outer));
        let mut names = vec![name.to_string()];
        names.extend(segments.map(str::to_string));
        if names.iter().any(String::is_empty) {
            return Err(malformed_error!("Type mapping target '{}' has an empty segment", to));
        }

        self.targets.insert(
            from.to_string(),
            MappedType {
                from_assembly: from_assembly.map(str::to_string),
                namespace: namespace.to_string(),
                names,
                assembly: to_assembly.to_string(),
            },
        );
        Ok(self)
    }

    /// Full names of every mapped source type
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.targets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of mappings
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the rule has no mappings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn build(target: &MappedType, is_value_type: bool) -> CilTypeRc {
        let scope = TypeScope::assembly(target.assembly.as_str());
        let last = target.names.len() - 1;
        let mut reference: Option<CilTypeRc> = None;
        for (index, name) in target.names.iter().enumerate() {
            reference = Some(Arc::new(CilType::Named(NamedType {
                namespace: if index == 0 {
                    target.namespace.clone()
                } else {
                    String::new()
                },
                name: name.clone(),
                scope: scope.clone(),
                declaring: reference.take(),
                is_value_type: index == last && is_value_type,
            })));
        }
        reference.unwrap_or_else(CilType::object)
    }
}

impl TypeRewriteRule for TypeMapRule {
    fn rewrite_if_needed(
        &self,
        ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Option<CilTypeRc>> {
        let CilType::Named(named) = ty.as_ref() else {
            return Ok(None);
        };
        let Some(source_assembly) = named.scope.assembly_name() else {
            return Ok(None);
        };
        let Some(target) = self.targets.get(&ty.full_name()) else {
            return Ok(None);
        };
        if source_assembly == target.assembly
            || target
                .from_assembly
                .as_deref()
                .is_some_and(|from| from != source_assembly)
        {
            return Ok(None);
        }

        let mut replacement = TypeMapRule::build(target, named.is_value_type);
        if let Some(resolved) = ctx.resolve_type(&replacement) {
            let is_value_type = resolved.definition().is_value_type();
            if is_value_type != replacement.is_value_type() {
                replacement = TypeMapRule::build(target, is_value_type);
            }
        } else {
            log::trace!(
                "{}: mapped type [{}]{} is not loaded",
                ctx.module_name(),
                target.assembly,
                replacement
            );
        }

        ctx.import_assembly(&target.assembly);
        log::debug!(
            "{}: [{source_assembly}]{ty} -> [{}]{replacement}",
            ctx.module_name(),
            target.assembly
        );
        Ok(Some(replacement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{opcodes, Instruction},
        metadata::{
            field::FieldDef,
            method::{MethodBody, MethodDef, MethodMember},
            module::TypeDef,
            typesystem::GenericParamOwner,
        },
        test::{field_token, method_token, type_token},
        Error,
    };

    fn xna_rule() -> TypeMapRule {
        TypeMapRule::new()
            .with_mapping(
                "Microsoft.Xna.Framework.Vector2",
                Some("Microsoft.Xna.Framework"),
                "Microsoft.Xna.Framework.Vector2",
                "MonoGame.Framework",
            )
            .unwrap()
    }

    fn xna_vector() -> CilTypeRc {
        CilType::named(
            "Microsoft.Xna.Framework",
            "Vector2",
            TypeScope::assembly("Microsoft.Xna.Framework"),
        )
    }

    fn monogame_cache() -> AssemblyResolutionCache {
        let cache = AssemblyResolutionCache::new();
        let monogame = Module::new("MonoGame.Framework", "3.8.0.0").with_type(
            TypeDef::new(type_token(2), "Microsoft.Xna.Framework", "Vector2").with_base(
                CilType::named("System", "ValueType", TypeScope::core()),
            ),
        );
        cache.register(Arc::new(monogame)).unwrap();
        cache.seal();
        cache
    }

    fn sample_module() -> Module {
        let list_of_vector = CilType::generic_instance(
            CilType::named("System.Collections.Generic", "List`1", TypeScope::core()),
            vec![xna_vector()],
        );
        let method = MethodDef::new(method_token(1), "Move", xna_vector())
            .with_parameter("offset", xna_vector())
            .with_body(
                MethodBody::new(vec![
                    Instruction::method(
                        opcodes::CALL,
                        MethodMember::new_static(
                            xna_vector(),
                            "Add",
                            xna_vector(),
                            vec![xna_vector(), xna_vector()],
                        ),
                    ),
                    Instruction::simple(opcodes::RET),
                ])
                .with_variable(list_of_vector.clone()),
            );

        Module::new("Mod", "1.0.0.0")
            .with_assembly_ref("Microsoft.Xna.Framework")
            .with_type(
                TypeDef::new(type_token(2), "Mod", "Mover")
                    .with_field(FieldDef::new(field_token(1), "path", list_of_vector))
                    .with_method(method),
            )
    }

    #[test]
    fn test_full_signature_rewrite() {
        let cache = monogame_cache();
        let rewriter = TypeReferenceRewriter::for_type_map(xna_rule());
        let mut module = sample_module();

        assert!(rewriter.rewrite_module(&mut module, &cache).unwrap());
        assert!(module.references_assembly("MonoGame.Framework"));

        let mover = &module.types[1];
        let method = &mover.methods[0];
        let target = TypeScope::assembly("MonoGame.Framework");
        assert_eq!(method.return_type.scope(), target);
        assert!(method.return_type.is_value_type());
        assert_eq!(method.parameters[0].parameter_type.scope(), target);

        let CilType::GenericInstance { args, .. } = mover.fields[0].field_type.as_ref() else {
            panic!("field type should stay a generic instance");
        };
        assert_eq!(args[0].scope(), target);

        let body = method.body.as_ref().unwrap();
        let call = body.instructions[0].method_operand().unwrap().element();
        assert_eq!(call.declaring_type.scope(), target);
        assert!(call.parameters.iter().all(|p| p.scope() == target));
        let CilType::GenericInstance { args, .. } = body.variables[0].variable_type.as_ref() else {
            panic!("local type should stay a generic instance");
        };
        assert_eq!(args[0].scope(), target);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let cache = monogame_cache();
        let rewriter = TypeReferenceRewriter::for_type_map(xna_rule());
        let mut module = sample_module();

        assert!(rewriter.rewrite_module(&mut module, &cache).unwrap());
        let refs = module.assembly_refs.clone();
        assert!(!rewriter.rewrite_module(&mut module, &cache).unwrap());
        assert_eq!(module.assembly_refs, refs);
    }

    #[test]
    fn test_source_assembly_filter() {
        let cache = AssemblyResolutionCache::new();
        let rewriter = TypeReferenceRewriter::for_type_map(xna_rule());
        let local = CilType::named("Microsoft.Xna.Framework", "Vector2", TypeScope::assembly("Other"));
        let mut module = Module::new("Mod", "1.0.0.0").with_type(
            TypeDef::new(type_token(2), "Mod", "Holder")
                .with_field(FieldDef::new(field_token(1), "value", local)),
        );

        assert!(!rewriter.rewrite_module(&mut module, &cache).unwrap());
        assert!(!module.references_assembly("MonoGame.Framework"));
    }

    #[test]
    fn test_unresolved_target_keeps_source_flags() {
        let cache = AssemblyResolutionCache::new();
        let rule = TypeMapRule::new()
            .with_mapping("Game.Old/Inner", None, "Game.New/Inner", "GameCore")
            .unwrap();
        let rewriter = TypeReferenceRewriter::for_type_map(rule);
        let inner = CilType::nested(
            &CilType::named("Game", "Old", TypeScope::assembly("Game")),
            "Inner",
        );
        let mut module = Module::new("Mod", "1.0.0.0").with_type(
            TypeDef::new(type_token(2), "Mod", "Holder")
                .with_field(FieldDef::new(field_token(1), "value", inner)),
        );

        assert!(rewriter.rewrite_module(&mut module, &cache).unwrap());
        let field_type = &module.types[1].fields[0].field_type;
        assert_eq!(field_type.full_name(), "Game.New/Inner");
        assert_eq!(field_type.scope(), TypeScope::assembly("GameCore"));
        assert!(!field_type.is_value_type());
    }

    #[test]
    fn test_placeholders_are_left_alone() {
        let cache = AssemblyResolutionCache::new();
        let rewriter = TypeReferenceRewriter::for_type_map(xna_rule());
        let mut ctx_refs = Vec::new();
        let constructors = Default::default();
        let mut ctx = ModuleContext::new("Mod", &mut ctx_refs, &cache, &constructors);

        let handled = rewriter
            .handle_type(&mut ctx, &CilType::placeholder(0, GenericParamOwner::Type))
            .unwrap();
        assert!(handled.result.is_none());
    }

    #[test]
    fn test_empty_mapping_is_malformed() {
        let error = TypeMapRule::new().with_mapping("", None, "A.B", "C").unwrap_err();
        assert!(matches!(error, Error::Malformed { .. }));
        let error = TypeMapRule::new().with_mapping("A.B", None, "A.B/", "C").unwrap_err();
        assert!(matches!(error, Error::Malformed { .. }));
    }
}
