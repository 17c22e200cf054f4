//! Detectors for references to watched types and members.

use std::collections::HashSet;

use strum::{Display, EnumString};

use crate::{
    assembly::{Instruction, Operand},
    metadata::{method::MethodDef, typesystem::CilTypeRc},
    rewriting::{
        context::{BodyEditor, ModuleContext},
        handler::InstructionHandler,
        predicate::TypeMatchPredicate,
        Handled, RewriteResult,
    },
    Result,
};

/// Flags every reference to a type matched by a predicate.
#[derive(Debug, Clone)]
pub struct TypeFinder {
    predicate: TypeMatchPredicate,
}

impl TypeFinder {
    /// Create a finder around `predicate`
    #[must_use]
    pub fn new(predicate: TypeMatchPredicate) -> Self {
        TypeFinder { predicate }
    }

    /// Find references to any of the named types
    pub fn for_types<I, S>(names: I, result: RewriteResult, noun_phrase: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeFinder::new(TypeMatchPredicate::for_type_names(names, result, noun_phrase))
    }

    /// Find references to any type defined in the given assemblies
    pub fn for_assemblies<I, S>(
        assemblies: I,
        result: RewriteResult,
        noun_phrase: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeFinder::new(TypeMatchPredicate::for_assemblies(
            assemblies,
            result,
            noun_phrase,
        ))
    }
}

impl InstructionHandler for TypeFinder {
    fn noun_phrase(&self) -> &str {
        self.predicate.noun_phrase()
    }

    fn handle_type(
        &self,
        _ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Handled<CilTypeRc>> {
        Ok(if self.predicate.is_match_type(ty) {
            Handled::detected(self.predicate.result())
        } else {
            Handled::none()
        })
    }

    fn handle_method(
        &self,
        _ctx: &mut ModuleContext<'_>,
        method: &MethodDef,
    ) -> Result<RewriteResult> {
        Ok(if self.predicate.is_match_method(method) {
            self.predicate.result()
        } else {
            RewriteResult::None
        })
    }

    fn handle_instruction(
        &self,
        _ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        Ok(if self.predicate.is_match_instruction(instruction) {
            Handled::detected(self.predicate.result())
        } else {
            Handled::none()
        })
    }
}

/// The kind of member a [`MemberFinder`] looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum MemberKind {
    /// Field loads, stores and address loads
    Field,
    /// Calls
    Method,
    /// Calls to the `get_`/`set_` accessors
    Property,
    /// Calls to the `add_`/`remove_` accessors
    Event,
}

impl MemberKind {
    /// Method names through which a member of this kind called `name` is accessed
    #[must_use]
    pub fn accessor_names(self, name: &str) -> Vec<String> {
        match self {
            MemberKind::Field | MemberKind::Method => vec![name.to_string()],
            MemberKind::Property => vec![format!("get_{name}"), format!("set_{name}")],
            MemberKind::Event => vec![format!("add_{name}"), format!("remove_{name}")],
        }
    }
}

/// Flags every access to a given set of members of one type.
#[derive(Debug, Clone)]
pub struct MemberFinder {
    declaring_type: String,
    kind: MemberKind,
    names: HashSet<String>,
    result: RewriteResult,
    noun_phrase: String,
}

impl MemberFinder {
    /// Create a finder.
    ///
    /// ## Arguments
    /// * 'declaring_type' - Full name of the type declaring the members
    /// * 'kind' - The kind of the members
    /// * 'names' - Member names, without accessor prefixes
    /// * 'result' - Classification reported on a match
    /// * 'noun_phrase' - Description of what was found
    pub fn new<I, S>(
        declaring_type: impl Into<String>,
        kind: MemberKind,
        names: I,
        result: RewriteResult,
        noun_phrase: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .flat_map(|name| kind.accessor_names(name.as_ref()))
            .collect();

        MemberFinder {
            declaring_type: declaring_type.into(),
            kind,
            names,
            result,
            noun_phrase: noun_phrase.into(),
        }
    }

    fn is_match(&self, declaring_type: &CilTypeRc, name: &str) -> bool {
        self.names.contains(name) && declaring_type.element_full_name() == self.declaring_type
    }
}

impl InstructionHandler for MemberFinder {
    fn noun_phrase(&self) -> &str {
        &self.noun_phrase
    }

    fn handle_instruction(
        &self,
        _ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        let found = match (&instruction.operand, self.kind) {
            (Operand::Field(field), MemberKind::Field) => {
                self.is_match(&field.declaring_type, &field.name)
            }
            (
                Operand::Method(method),
                MemberKind::Method | MemberKind::Property | MemberKind::Event,
            ) => {
                self.is_match(method.declaring_type(), method.name())
            }
            _ => false,
        };

        Ok(if found {
            Handled::detected(self.result)
        } else {
            Handled::none()
        })
    }
}
