//! Rewriters for members which moved or changed kind.

use crate::{
    assembly::{opcodes, Instruction, OpCode, Operand},
    metadata::{
        field::FieldRef,
        method::{MethodMember, MethodRef},
        typesystem::{import_type, CilType, CilTypeRc, TypeScope},
    },
    rewriting::{
        context::{BodyEditor, ModuleContext},
        handler::{HandlerKind, InstructionHandler},
        Handled, RewriteResult,
    },
    Result,
};

/// A type in another assembly, named by full name
#[derive(Debug, Clone)]
struct TargetType {
    full_name: String,
    assembly: String,
}

impl TargetType {
    fn new(full_name: impl Into<String>, assembly: impl Into<String>) -> Self {
        TargetType {
            full_name: full_name.into(),
            assembly: assembly.into(),
        }
    }

    /// A reference to the target, taken from its definition when the assembly is loaded
    fn reference(&self, ctx: &ModuleContext<'_>) -> CilTypeRc {
        let (namespace, name) = self
            .full_name
            .rsplit_once('.')
            .unwrap_or(("", self.full_name.as_str()));
        let candidate = CilType::named(
            namespace,
            name,
            TypeScope::assembly(self.assembly.as_str()),
        );

        match ctx.resolve_type(&candidate) {
            Some(resolved) => resolved.reference(),
            None => candidate,
        }
    }

    fn is(&self, ty: &CilTypeRc) -> bool {
        ty.element_full_name() == self.full_name
            && ty.scope().assembly_name() == Some(self.assembly.as_str())
    }
}

/// Redirects references to a field which moved to another type or was renamed.
#[derive(Debug, Clone)]
pub struct FieldReplaceRewriter {
    from_type: String,
    from_field: String,
    to_type: TargetType,
    to_field: String,
}

impl FieldReplaceRewriter {
    /// Redirect `from_type::from_field` to `to_type::to_field`, where `to_type` is defined in
    /// `to_assembly`
    pub fn new(
        from_type: impl Into<String>,
        from_field: impl Into<String>,
        to_type: impl Into<String>,
        to_assembly: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        FieldReplaceRewriter {
            from_type: from_type.into(),
            from_field: from_field.into(),
            to_type: TargetType::new(to_type, to_assembly),
            to_field: to_field.into(),
        }
    }
}

impl InstructionHandler for FieldReplaceRewriter {
    fn noun_phrase(&self) -> &str {
        "moved field reference"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn handle_instruction(
        &self,
        ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        let Some(field) = instruction.field_operand() else {
            return Ok(Handled::none());
        };
        if field.name != self.from_field
            || field.declaring_type.element_full_name() != self.from_type
            || (field.name == self.to_field && self.to_type.is(&field.declaring_type))
        {
            return Ok(Handled::none());
        }

        let declaring_type = self.to_type.reference(ctx);
        let field_type = ctx
            .resolve_type(&declaring_type)
            .and_then(|resolved| {
                resolved
                    .definition()
                    .fields
                    .iter()
                    .find(|candidate| candidate.name == self.to_field)
                    .map(|candidate| import_type(&candidate.field_type, resolved.assembly_name()))
            })
            .unwrap_or_else(|| field.field_type.clone());

        let replacement = FieldRef::new(declaring_type, self.to_field.as_str(), field_type);
        ctx.import_assembly(&self.to_type.assembly);
        log::debug!(
            "{}: {} -> {}",
            ctx.module_name(),
            field.full_name(),
            replacement.full_name()
        );
        Ok(Handled::rewritten(
            instruction.replaced(instruction.opcode, Operand::Field(replacement)),
        ))
    }
}

/// Redirects calls on one type to a type in another assembly declaring the same methods.
#[derive(Debug, Clone)]
pub struct MethodParentRewriter {
    from_type: String,
    to_type: TargetType,
}

impl MethodParentRewriter {
    /// Redirect calls on `from_type` to `to_type` in `to_assembly`
    pub fn new(
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        to_assembly: impl Into<String>,
    ) -> Self {
        MethodParentRewriter {
            from_type: from_type.into(),
            to_type: TargetType::new(to_type, to_assembly),
        }
    }

    fn is_declared_by_target(
        &self,
        ctx: &ModuleContext<'_>,
        target: &CilTypeRc,
        member: &MethodMember,
    ) -> bool {
        match ctx.resolve_type(target) {
            Some(resolved) => resolved
                .definition()
                .find_method(&member.name, member.parameters.len())
                .is_some(),
            None => {
                log::trace!(
                    "{}: {} isn't loaded, redirecting {} unchecked",
                    ctx.module_name(),
                    target,
                    member.name
                );
                true
            }
        }
    }
}

impl InstructionHandler for MethodParentRewriter {
    fn noun_phrase(&self) -> &str {
        "moved method reference"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn handle_instruction(
        &self,
        ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        let Some(method) = instruction.method_operand() else {
            return Ok(Handled::none());
        };
        let declaring_type = method.declaring_type();
        if !matches!(declaring_type.as_ref(), CilType::Named(_))
            || declaring_type.full_name() != self.from_type
            || self.to_type.is(declaring_type)
        {
            return Ok(Handled::none());
        }

        let target = self.to_type.reference(ctx);
        if !self.is_declared_by_target(ctx, &target, method.element()) {
            return Ok(Handled::none());
        }

        ctx.import_assembly(&self.to_type.assembly);
        let mut replacement: MethodRef = method.clone();
        replacement.element_mut().declaring_type = target;
        Ok(Handled::rewritten(
            instruction.replaced(instruction.opcode, Operand::Method(replacement)),
        ))
    }
}

/// Rewrites accesses to a field which became a property into accessor calls.
///
/// Loads become getter calls and stores become setter calls. Taking the address of the
/// field has no property equivalent and is reported as [`RewriteResult::NotCompatible`].
#[derive(Debug, Clone)]
pub struct FieldToPropertyRewriter {
    type_name: String,
    field_name: String,
    property_name: String,
}

impl FieldToPropertyRewriter {
    /// Rewrite accesses to `type_name::field_name` into accesses to the property
    /// `property_name` of the same type
    pub fn new(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        property_name: impl Into<String>,
    ) -> Self {
        FieldToPropertyRewriter {
            type_name: type_name.into(),
            field_name: field_name.into(),
            property_name: property_name.into(),
        }
    }

    fn accessor(&self, field: &FieldRef, opcode: OpCode) -> Option<(OpCode, MethodMember)> {
        let is_static = opcode == opcodes::LDSFLD || opcode == opcodes::STSFLD;
        let is_load = opcode == opcodes::LDFLD || opcode == opcodes::LDSFLD;
        if !is_load && opcode != opcodes::STFLD && opcode != opcodes::STSFLD {
            return None;
        }

        let (name, return_type, parameters) = if is_load {
            (format!("get_{}", self.property_name), field.field_type.clone(), vec![])
        } else {
            (
                format!("set_{}", self.property_name),
                CilType::void(),
                vec![field.field_type.clone()],
            )
        };

        let declaring_type = field.declaring_type.clone();
        Some(if is_static {
            (
                opcodes::CALL,
                MethodMember::new_static(declaring_type, name, return_type, parameters),
            )
        } else if declaring_type.is_value_type() {
            (
                opcodes::CALL,
                MethodMember::new(declaring_type, name, return_type, parameters),
            )
        } else {
            (
                opcodes::CALLVIRT,
                MethodMember::new(declaring_type, name, return_type, parameters),
            )
        })
    }
}

impl InstructionHandler for FieldToPropertyRewriter {
    fn noun_phrase(&self) -> &str {
        "field which is now a property"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn handle_instruction(
        &self,
        ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        let Some(field) = instruction.field_operand() else {
            return Ok(Handled::none());
        };
        if field.name != self.field_name
            || field.declaring_type.element_full_name() != self.type_name
        {
            return Ok(Handled::none());
        }

        match self.accessor(field, instruction.opcode) {
            Some((opcode, accessor)) => {
                log::debug!(
                    "{}: {} -> {}",
                    ctx.module_name(),
                    instruction,
                    accessor.full_name()
                );
                Ok(Handled::rewritten(
                    instruction.replaced(opcode, Operand::Method(accessor.into())),
                ))
            }
            None => Ok(Handled::detected(RewriteResult::NotCompatible).with_phrase(format!(
                "reference to address of {}.{}, which is now a property",
                self.type_name, self.field_name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::{
            field::FieldDef,
            method::MethodDef,
            module::{Module, TypeDef},
            typesystem::AssemblyResolutionCache,
        },
        test::{field_token, method_token, run_instruction as run, type_token},
    };

    fn farmer() -> CilTypeRc {
        CilType::named("Game", "Farmer", TypeScope::assembly("Game"))
    }

    fn stamina(opcode: OpCode) -> Instruction {
        Instruction::field(opcode, FieldRef::new(farmer(), "stamina", CilType::int32()))
    }

    #[test]
    fn test_field_loads_and_stores_become_accessor_calls() {
        let cache = AssemblyResolutionCache::new();
        let rewriter = FieldToPropertyRewriter::new("Game.Farmer", "stamina", "Stamina");

        let (handled, _) = run(&rewriter, &cache, &stamina(opcodes::LDFLD));
        let load = handled.replacement.unwrap();
        assert_eq!(load.opcode, opcodes::CALLVIRT);
        let getter = load.method_operand().unwrap().element();
        assert_eq!(getter.full_name(), "System.Int32 Game.Farmer::get_Stamina()");
        assert!(getter.has_this);

        let (handled, _) = run(&rewriter, &cache, &stamina(opcodes::STSFLD));
        let store = handled.replacement.unwrap();
        assert_eq!(store.opcode, opcodes::CALL);
        let setter = store.method_operand().unwrap().element();
        assert_eq!(setter.full_name(), "System.Void Game.Farmer::set_Stamina(System.Int32)");
        assert!(!setter.has_this);
    }

    #[test]
    fn test_field_address_is_not_compatible() {
        let cache = AssemblyResolutionCache::new();
        let rewriter = FieldToPropertyRewriter::new("Game.Farmer", "stamina", "Stamina");
        let (handled, _) = run(&rewriter, &cache, &stamina(opcodes::LDFLDA));
        assert_eq!(handled.result, RewriteResult::NotCompatible);
        assert!(handled.replacement.is_none());
        assert_eq!(
            handled.phrase.as_deref(),
            Some("reference to address of Game.Farmer.stamina, which is now a property")
        );
    }

    #[test]
    fn test_field_replace_uses_target_definition() {
        let cache = AssemblyResolutionCache::new();
        let core = Module::new("GameCore", "1.6.0.0").with_type(
            TypeDef::new(type_token(2), "Game", "Stats").with_field(FieldDef::new(
                field_token(1),
                "maxStamina",
                CilType::value_type("System", "Single", TypeScope::core()),
            )),
        );
        cache.register(Arc::new(core)).unwrap();

        let rewriter = FieldReplaceRewriter::new(
            "Game.Farmer",
            "stamina",
            "Game.Stats",
            "GameCore",
            "maxStamina",
        );
        let (handled, refs) = run(&rewriter, &cache, &stamina(opcodes::LDSFLD));
        let replacement = handled.replacement.unwrap();
        assert_eq!(
            replacement.field_operand().unwrap().full_name(),
            "System.Single Game.Stats::maxStamina"
        );
        assert_eq!(refs, vec!["GameCore".to_string()]);

        let (again, _) = run(&rewriter, &cache, &replacement);
        assert!(again.result.is_none());
    }

    #[test]
    fn test_method_parent_requires_declared_method() {
        let cache = AssemblyResolutionCache::new();
        let utility = Module::new("GameCore", "1.6.0.0").with_type(
            TypeDef::new(type_token(2), "Game", "Utility").with_method(
                MethodDef::new(method_token(1), "Clamp", CilType::int32())
                    .with_parameter("value", CilType::int32()),
            ),
        );
        cache.register(Arc::new(utility)).unwrap();
        let rewriter = MethodParentRewriter::new("Game.Helpers", "Game.Utility", "GameCore");
        let helpers = CilType::named("Game", "Helpers", TypeScope::assembly("Game"));

        let clamp = Instruction::method(
            opcodes::CALL,
            MethodMember::new_static(
                helpers.clone(),
                "Clamp",
                CilType::int32(),
                vec![CilType::int32()],
            ),
        );
        let (handled, refs) = run(&rewriter, &cache, &clamp);
        let replacement = handled.replacement.unwrap();
        let member = replacement.method_operand().unwrap();
        assert_eq!(member.declaring_type().full_name(), "Game.Utility");
        assert_eq!(member.declaring_type().scope(), TypeScope::assembly("GameCore"));
        assert_eq!(refs, vec!["GameCore".to_string()]);

        let (again, _) = run(&rewriter, &cache, &replacement);
        assert!(again.result.is_none());

        let lerp = Instruction::method(
            opcodes::CALL,
            MethodMember::new_static(helpers, "Lerp", CilType::int32(), vec![]),
        );
        let (handled, refs) = run(&rewriter, &cache, &lerp);
        assert!(handled.result.is_none());
        assert!(refs.is_empty());
    }
}
