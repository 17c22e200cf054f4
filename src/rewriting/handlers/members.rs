//! Validation of member references into other modules.
//!
//! A reference to a field or method of a type defined in a validated assembly is followed
//! through the [`crate::metadata::typesystem::AssemblyResolutionCache`] to its definition,
//! searching base types as well. If the member is gone, or is still there with a different
//! type, the reference is flagged as [`RewriteResult::NotCompatible`].
//!
//! Anything that can't be resolved (the declaring type or one of its base types isn't
//! loaded) is treated as "no opinion".

use std::collections::HashSet;

use crate::{
    assembly::{Instruction, Operand},
    metadata::{
        field::FieldRef,
        method::MethodMember,
        typesystem::{import_type, is_same_type, CilTypeRc, ResolvedType},
    },
    rewriting::{
        context::{BodyEditor, ModuleContext},
        handler::InstructionHandler,
        Handled, RewriteResult,
    },
    Result,
};

/// A declaring type and its base types, as far as they resolve
struct Hierarchy {
    types: Vec<ResolvedType>,
    complete: bool,
}

impl Hierarchy {
    fn resolve(ctx: &ModuleContext<'_>, declaring_type: &CilTypeRc) -> Option<Hierarchy> {
        let Some(first) = ctx.resolve_type(declaring_type) else {
            log::trace!(
                "{}: can't validate members of unresolved type {declaring_type}",
                ctx.module_name()
            );
            return None;
        };

        let mut seen = HashSet::new();
        let mut types = Vec::new();
        let mut next = Some(first);
        let mut complete = true;
        while let Some(resolved) = next.take() {
            let key = (
                resolved.assembly_name().to_string(),
                resolved.definition().full_name(),
            );
            if !seen.insert(key) {
                break;
            }

            let base = resolved
                .definition()
                .base
                .as_ref()
                .filter(|base| !base.is_object())
                .map(|base| import_type(base, resolved.assembly_name()));
            types.push(resolved);

            if let Some(base) = base {
                next = ctx.resolve_type(&base);
                if next.is_none() {
                    log::trace!("{}: base type {base} is not loaded", ctx.module_name());
                    complete = false;
                }
            }
        }

        Some(Hierarchy { types, complete })
    }

    /// Type of the first field called `name`
    fn field_type(&self, name: &str) -> Option<CilTypeRc> {
        self.types.iter().find_map(|resolved| {
            resolved
                .definition()
                .fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| import_type(&field.field_type, resolved.assembly_name()))
        })
    }

    /// Return types of every method matching the reference's name and parameter types.
    /// Constructors are only searched on the declaring type itself.
    fn method_return_types(&self, member: &MethodMember) -> Vec<CilTypeRc> {
        let searched = if member.is_constructor() {
            &self.types[..1]
        } else {
            &self.types[..]
        };

        searched
            .iter()
            .flat_map(|resolved| {
                let assembly = resolved.assembly_name();
                resolved
                    .definition()
                    .methods
                    .iter()
                    .filter(|method| {
                        method.name == member.name
                            && method.generic_params.len() == usize::from(member.generic_arity)
                            && method.parameters.len() == member.parameters.len()
                            && method.parameters.iter().zip(&member.parameters).all(
                                |(definition, reference)| {
                                    is_same_type(
                                        reference,
                                        &import_type(&definition.parameter_type, assembly),
                                    )
                                },
                            )
                    })
                    .map(|method| import_type(&method.return_type, assembly))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Shared configuration of the member validators
#[derive(Debug, Clone)]
struct ValidatedAssemblies(HashSet<String>);

impl ValidatedAssemblies {
    fn new<I, S>(assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidatedAssemblies(assemblies.into_iter().map(Into::into).collect())
    }

    fn hierarchy(&self, ctx: &ModuleContext<'_>, declaring_type: &CilTypeRc) -> Option<Hierarchy> {
        let scope = declaring_type.scope();
        let assembly = scope.assembly_name()?;
        if !self.0.contains(assembly) {
            return None;
        }
        Hierarchy::resolve(ctx, declaring_type)
    }
}

/// Flags references to fields and methods which don't exist in the referenced module.
#[derive(Debug, Clone)]
pub struct ReferenceToMissingMemberFinder {
    assemblies: ValidatedAssemblies,
}

impl ReferenceToMissingMemberFinder {
    /// Validate references into the given assemblies
    pub fn new<I, S>(assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReferenceToMissingMemberFinder {
            assemblies: ValidatedAssemblies::new(assemblies),
        }
    }

    fn check_field(&self, ctx: &ModuleContext<'_>, field: &FieldRef) -> Option<String> {
        let hierarchy = self.assemblies.hierarchy(ctx, &field.declaring_type)?;
        if hierarchy.field_type(&field.name).is_some() || !hierarchy.complete {
            return None;
        }
        Some(format!(
            "reference to {}.{} (no such field)",
            field.declaring_type.element_full_name(),
            field.name
        ))
    }

    fn check_method(&self, ctx: &ModuleContext<'_>, member: &MethodMember) -> Option<String> {
        let hierarchy = self.assemblies.hierarchy(ctx, &member.declaring_type)?;
        if !hierarchy.method_return_types(member).is_empty()
            || (!hierarchy.complete && !member.is_constructor())
        {
            return None;
        }
        Some(format!(
            "reference to {}.{} (no such method)",
            member.declaring_type.element_full_name(),
            member.name
        ))
    }
}

impl InstructionHandler for ReferenceToMissingMemberFinder {
    fn noun_phrase(&self) -> &str {
        "reference to a missing member"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        let phrase = match &instruction.operand {
            Operand::Field(field) => self.check_field(ctx, field),
            Operand::Method(method) => self.check_method(ctx, method.element()),
            _ => None,
        };

        Ok(match phrase {
            Some(phrase) => Handled::detected(RewriteResult::NotCompatible).with_phrase(phrase),
            None => Handled::none(),
        })
    }
}

/// Flags references to fields and methods which still exist, but with a different type.
#[derive(Debug, Clone)]
pub struct ReferenceToMemberWithUnexpectedTypeFinder {
    assemblies: ValidatedAssemblies,
}

impl ReferenceToMemberWithUnexpectedTypeFinder {
    /// Validate references into the given assemblies
    pub fn new<I, S>(assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReferenceToMemberWithUnexpectedTypeFinder {
            assemblies: ValidatedAssemblies::new(assemblies),
        }
    }

    fn check_field(&self, ctx: &ModuleContext<'_>, field: &FieldRef) -> Option<String> {
        let hierarchy = self.assemblies.hierarchy(ctx, &field.declaring_type)?;
        let actual = hierarchy.field_type(&field.name)?;
        if is_same_type(&field.field_type, &actual) {
            return None;
        }
        Some(format!(
            "reference to {}.{} (field is {}, not {})",
            field.declaring_type.element_full_name(),
            field.name,
            actual,
            field.field_type
        ))
    }

    fn check_method(&self, ctx: &ModuleContext<'_>, member: &MethodMember) -> Option<String> {
        let hierarchy = self.assemblies.hierarchy(ctx, &member.declaring_type)?;
        let candidates = hierarchy.method_return_types(member);
        if candidates.is_empty()
            || candidates
                .iter()
                .any(|actual| is_same_type(&member.return_type, actual))
        {
            return None;
        }
        Some(format!(
            "reference to {}.{} (method returns {}, not {})",
            member.declaring_type.element_full_name(),
            member.name,
            candidates[0],
            member.return_type
        ))
    }
}

impl InstructionHandler for ReferenceToMemberWithUnexpectedTypeFinder {
    fn noun_phrase(&self) -> &str {
        "reference to a member with an unexpected type"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        let phrase = match &instruction.operand {
            Operand::Field(field) => self.check_field(ctx, field),
            Operand::Method(method) => self.check_method(ctx, method.element()),
            _ => None,
        };

        Ok(match phrase {
            Some(phrase) => Handled::detected(RewriteResult::NotCompatible).with_phrase(phrase),
            None => Handled::none(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        metadata::{
            field::FieldDef,
            method::MethodDef,
            module::{Module, TypeDef},
            typesystem::{
                AssemblyResolutionCache, CilType, GenericParam, GenericParamOwner, TypeScope,
            },
        },
        test::{field_token, method_token, run_instruction, sealed_cache, type_token},
    };

    fn game_cache() -> AssemblyResolutionCache {
        let param = GenericParam::new("T", 0, GenericParamOwner::Type);
        let character = TypeDef::new(type_token(2), "Game", "Character")
            .with_field(FieldDef::new(field_token(1), "name", CilType::string()))
            .with_method(
                MethodDef::new(method_token(1), "GetName", CilType::string())
                    .with_parameter("full", CilType::boolean()),
            );
        let farmer = TypeDef::new(type_token(3), "Game", "Farmer")
            .with_base(CilType::named("Game", "Character", TypeScope::CurrentModule))
            .with_field(FieldDef::new(field_token(2), "stamina", CilType::int32()))
            .with_method(MethodDef::constructor(method_token(2)));
        let netref = TypeDef::new(type_token(4), "Game", "NetRef`1")
            .with_generic_param(param.clone())
            .with_field(FieldDef::new(field_token(3), "value", CilType::generic_param(&param)))
            .with_method(
                MethodDef::new(method_token(3), "Set", CilType::void())
                    .with_parameter("value", CilType::generic_param(&param)),
            );
        let orphan = TypeDef::new(type_token(5), "Game", "Orphan")
            .with_base(CilType::named("Lost", "Base", TypeScope::assembly("Lost")));

        sealed_cache([Module::new("Game", "1.6.0.0")
            .with_type(character)
            .with_type(farmer)
            .with_type(netref)
            .with_type(orphan)])
    }

    fn game_type(name: &str) -> CilTypeRc {
        CilType::named("Game", name, TypeScope::assembly("Game"))
    }

    fn check<H: InstructionHandler>(
        handler: &H,
        instruction: &Instruction,
    ) -> Handled<Instruction> {
        run_instruction(handler, &game_cache(), instruction).0
    }

    fn load(declaring: CilTypeRc, name: &str, field_type: CilTypeRc) -> Instruction {
        Instruction::field(opcodes::LDFLD, FieldRef::new(declaring, name, field_type))
    }

    #[test]
    fn test_missing_field_is_flagged() {
        let finder = ReferenceToMissingMemberFinder::new(["Game"]);
        let handled = check(&finder, &load(game_type("Farmer"), "energy", CilType::int32()));
        assert_eq!(handled.result, RewriteResult::NotCompatible);
        assert_eq!(
            handled.phrase.as_deref(),
            Some("reference to Game.Farmer.energy (no such field)")
        );
    }

    #[test]
    fn test_inherited_members_are_found() {
        let finder = ReferenceToMissingMemberFinder::new(["Game"]);
        assert!(check(&finder, &load(game_type("Farmer"), "name", CilType::string()))
            .result
            .is_none());

        let call = Instruction::method(
            opcodes::CALLVIRT,
            MethodMember::new(
                game_type("Farmer"),
                "GetName",
                CilType::string(),
                vec![CilType::boolean()],
            ),
        );
        assert!(check(&finder, &call).result.is_none());
    }

    #[test]
    fn test_method_overload_mismatch_is_missing() {
        let finder = ReferenceToMissingMemberFinder::new(["Game"]);
        let call = Instruction::method(
            opcodes::CALLVIRT,
            MethodMember::new(
                game_type("Farmer"),
                "GetName",
                CilType::string(),
                vec![CilType::int32()],
            ),
        );
        let handled = check(&finder, &call);
        assert_eq!(handled.result, RewriteResult::NotCompatible);
        assert_eq!(
            handled.phrase.as_deref(),
            Some("reference to Game.Farmer.GetName (no such method)")
        );
    }

    #[test]
    fn test_constructors_are_not_inherited() {
        let finder = ReferenceToMissingMemberFinder::new(["Game"]);
        let create_farmer = Instruction::method(
            opcodes::NEWOBJ,
            MethodMember::constructor(game_type("Farmer"), vec![]),
        );
        assert!(check(&finder, &create_farmer).result.is_none());

        let create_character = Instruction::method(
            opcodes::NEWOBJ,
            MethodMember::constructor(game_type("Character"), vec![CilType::int32()]),
        );
        assert_eq!(check(&finder, &create_character).result, RewriteResult::NotCompatible);
    }

    #[test]
    fn test_generic_placeholders_match_declared_parameters() {
        let finder = ReferenceToMissingMemberFinder::new(["Game"]);
        let net_of_string =
            CilType::generic_instance(game_type("NetRef`1"), vec![CilType::string()]);
        let call = Instruction::method(
            opcodes::CALLVIRT,
            MethodMember::new(
                net_of_string.clone(),
                "Set",
                CilType::void(),
                vec![CilType::placeholder(0, GenericParamOwner::Type)],
            ),
        );
        assert!(check(&finder, &call).result.is_none());

        let field = load(
            net_of_string,
            "value",
            CilType::placeholder(0, GenericParamOwner::Type),
        );
        let unexpected = ReferenceToMemberWithUnexpectedTypeFinder::new(["Game"]);
        assert!(check(&unexpected, &field).result.is_none());
    }

    #[test]
    fn test_unresolved_references_have_no_opinion() {
        let finder = ReferenceToMissingMemberFinder::new(["Game"]);
        assert!(check(&finder, &load(game_type("Missing"), "x", CilType::int32()))
            .result
            .is_none());
        assert!(check(&finder, &load(game_type("Orphan"), "x", CilType::int32()))
            .result
            .is_none());

        let unvalidated = CilType::named("Other", "Type", TypeScope::assembly("Other"));
        assert!(check(&finder, &load(unvalidated, "x", CilType::int32())).result.is_none());
    }

    #[test]
    fn test_unexpected_field_type() {
        let finder = ReferenceToMemberWithUnexpectedTypeFinder::new(["Game"]);
        let single = CilType::value_type("System", "Single", TypeScope::core());
        let handled = check(&finder, &load(game_type("Farmer"), "stamina", single));
        assert_eq!(handled.result, RewriteResult::NotCompatible);
        assert_eq!(
            handled.phrase.as_deref(),
            Some("reference to Game.Farmer.stamina (field is System.Int32, not System.Single)")
        );
        assert!(check(&finder, &load(game_type("Farmer"), "stamina", CilType::int32()))
            .result
            .is_none());
    }

    #[test]
    fn test_unexpected_return_type() {
        let finder = ReferenceToMemberWithUnexpectedTypeFinder::new(["Game"]);
        let call = Instruction::method(
            opcodes::CALLVIRT,
            MethodMember::new(
                game_type("Character"),
                "GetName",
                CilType::object(),
                vec![CilType::boolean()],
            ),
        );
        let handled = check(&finder, &call);
        assert_eq!(handled.result, RewriteResult::NotCompatible);
        assert_eq!(
            handled.phrase.as_deref(),
            Some(
                "reference to Game.Character.GetName (method returns System.String, not System.Object)"
            )
        );
    }
}
