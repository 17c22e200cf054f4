//! Deciding whether a type reference denotes a watched type.
//!
//! A [`TypeMatchPredicate`] wraps a caller-supplied test on a single type node and extends
//! it structurally: a reference matches if the node itself matches, or anything it is built
//! from does (element types, generic arguments, constraints of referenced generic
//! parameters). A watched type hidden inside `List<Watched>` is therefore found.

use std::{
    collections::HashSet,
    fmt,
    sync::Arc,
};

use crate::{
    assembly::{Instruction, Operand},
    metadata::{
        method::{MethodDef, MethodMember, MethodRef},
        typesystem::{CilType, GenericParam},
    },
    rewriting::RewriteResult,
};

type MatchFn = dyn Fn(&CilType) -> bool + Send + Sync;

/// A structural test for watched types, with the classification it stands for.
#[derive(Clone)]
pub struct TypeMatchPredicate {
    is_match: Arc<MatchFn>,
    result: RewriteResult,
    noun_phrase: String,
}

impl TypeMatchPredicate {
    /// Create a predicate from a test on a single type node
    ///
    /// ## Arguments
    /// * 'is_match' - Test applied to every node of a type reference
    /// * 'result' - Classification reported when the predicate matches
    /// * 'noun_phrase' - Description of what was found
    pub fn new<F>(is_match: F, result: RewriteResult, noun_phrase: impl Into<String>) -> Self
    where
        F: Fn(&CilType) -> bool + Send + Sync + 'static,
    {
        TypeMatchPredicate {
            is_match: Arc::new(is_match),
            result,
            noun_phrase: noun_phrase.into(),
        }
    }

    /// Match named types by full name (`Namespace.Name`, `Namespace.Outer/Inner`)
    pub fn for_type_names<I, S>(
        names: I,
        result: RewriteResult,
        noun_phrase: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        TypeMatchPredicate::new(
            move |ty| matches!(ty, CilType::Named(_)) && names.contains(&ty.full_name()),
            result,
            noun_phrase,
        )
    }

    /// Match named types defined in any of the given assemblies
    pub fn for_assemblies<I, S>(
        assemblies: I,
        result: RewriteResult,
        noun_phrase: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let assemblies: HashSet<String> = assemblies.into_iter().map(Into::into).collect();
        TypeMatchPredicate::new(
            move |ty| match ty {
                CilType::Named(named) => named
                    .scope
                    .assembly_name()
                    .is_some_and(|assembly| assemblies.contains(assembly)),
                _ => false,
            },
            result,
            noun_phrase,
        )
    }

    /// Classification reported on a match
    #[must_use]
    pub fn result(&self) -> RewriteResult {
        self.result
    }

    /// Description of what a match means
    #[must_use]
    pub fn noun_phrase(&self) -> &str {
        &self.noun_phrase
    }

    /// Returns true if `ty` or anything it is built from matches
    #[must_use]
    pub fn is_match_type(&self, ty: &CilType) -> bool {
        let mut entered = HashSet::new();
        self.is_match_node(ty, &mut entered)
    }

    fn is_match_node(&self, ty: &CilType, entered: &mut HashSet<*const GenericParam>) -> bool {
        if (self.is_match)(ty) {
            return true;
        }

        match ty {
            CilType::Named(_) => false,
            CilType::GenericInstance { element, args } => {
                self.is_match_node(element, entered)
                    || args.iter().any(|arg| self.is_match_node(arg, entered))
            }
            CilType::SzArray(element)
            | CilType::Array { element, .. }
            | CilType::ByRef(element)
            | CilType::Pointer(element) => self.is_match_node(element, entered),
            CilType::GenericParam(param) => match param.upgrade() {
                Some(param) if entered.insert(Arc::as_ptr(&param)) => param
                    .constraints()
                    .iter()
                    .any(|constraint| self.is_match_node(constraint, entered)),
                _ => false,
            },
        }
    }

    /// Returns true if the instruction's field or method reference mentions a watched type
    /// in its declaring type or signature, or if its bare type operand does
    #[must_use]
    pub fn is_match_instruction(&self, instruction: &Instruction) -> bool {
        match &instruction.operand {
            Operand::Field(field) => {
                self.is_match_type(&field.declaring_type) || self.is_match_type(&field.field_type)
            }
            Operand::Method(method) => self.is_match_method_ref(method),
            Operand::Type(ty) => self.is_match_type(ty),
            Operand::None | Operand::Primitive(_) => false,
        }
    }

    /// Returns true if the method reference mentions a watched type
    #[must_use]
    pub fn is_match_method_ref(&self, method: &MethodRef) -> bool {
        self.is_match_member(method.element())
            || method.generic_args().iter().any(|arg| self.is_match_type(arg))
    }

    fn is_match_member(&self, member: &MethodMember) -> bool {
        self.is_match_type(&member.declaring_type)
            || self.is_match_type(&member.return_type)
            || member.parameters.iter().any(|p| self.is_match_type(p))
    }

    /// Cheap per-method prefilter: true if the return type or a local variable type matches
    #[must_use]
    pub fn is_match_method(&self, method: &MethodDef) -> bool {
        self.is_match_type(&method.return_type)
            || method.body.as_ref().is_some_and(|body| {
                body.variables
                    .iter()
                    .any(|variable| self.is_match_type(&variable.variable_type))
            })
    }
}

impl fmt::Debug for TypeMatchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMatchPredicate")
            .field("result", &self.result)
            .field("noun_phrase", &self.noun_phrase)
            .finish_non_exhaustive()
    }
}
