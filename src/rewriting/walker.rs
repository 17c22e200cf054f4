//! Traversal of a module's full declaration graph.
//!
//! The [`ModuleGraphWalker`] visits every place a module mentions a type, every method and
//! every instruction, handing each to a [`ModuleVisitor`]. Visitors may return replacements,
//! which are swapped into the owning slot immediately, so later sites see the rewritten
//! graph.
//!
//! # Order
//!
//! Module custom attributes first, then for every type except `<Module>`:
//!
//! 1. custom attributes
//! 2. generic parameter constraints
//! 3. interfaces
//! 4. base type, unless it is `System.Object`
//! 5. fields: custom attributes, then field type
//! 6. property types, then event types
//! 7. methods: return type, generic parameter constraints, custom attributes, parameters,
//!    overrides, the method hook, then locals and instructions in original order
//!
//! Instructions with an inert opcode are skipped entirely.
//!
//! # Type references
//!
//! A type reference is offered to the visitor root-most first. The walker then descends into
//! the (possibly replaced) node's element type, generic arguments and the constraints of
//! referenced generic parameters. Type nodes are immutable, so a changed child rebuilds its
//! parent; constraint lists are swapped on the shared parameter node. Parameters already
//! entered during the same top-level visit are not entered again, which bounds the walk on
//! self-referential constraints.
//!
//! # Custom attributes
//!
//! An attribute whose type or constructor argument types change is rebuilt against a
//! constructor of the resulting attribute type that accepts the argument list. If no such
//! constructor exists the walk fails with [`crate::Error::AttributeConstructorNotFound`] and
//! the attribute list being processed is left unmodified.

use std::{collections::HashSet, sync::Arc};

use crate::{
    assembly::{Instruction, Operand},
    metadata::{
        customattributes::{CustomAttribute, CustomAttributeArgument},
        method::{MethodBody, MethodDef, MethodMember, MethodRef},
        module::Module,
        typesystem::{
            is_same_type, AssemblyResolutionCache, CilType, CilTypeRc, GenericParam,
            GenericParamRc,
        },
    },
    rewriting::context::{local_constructors, BodyEditor, ModuleContext},
    Error::AttributeConstructorNotFound,
    Result,
};

/// Callbacks invoked by the [`ModuleGraphWalker`].
pub trait ModuleVisitor {
    /// Called for every type reference. Return a replacement to swap it in.
    ///
    /// # Errors
    /// Any error aborts the walk.
    fn rewrite_type(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Option<CilTypeRc>>;

    /// Called once per method, after its signature has been visited and before its body.
    ///
    /// # Errors
    /// Any error aborts the walk.
    fn visit_method(&mut self, _ctx: &mut ModuleContext<'_>, _method: &MethodDef) -> Result<()> {
        Ok(())
    }

    /// Called for every non-inert instruction, after its operand has been visited. Return a
    /// replacement to swap it in.
    ///
    /// # Errors
    /// Any error aborts the walk.
    fn rewrite_instruction(
        &mut self,
        _ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        _instruction: &Instruction,
    ) -> Result<Option<Instruction>> {
        Ok(None)
    }
}

/// Walk `module` with a pair of closures instead of a [`ModuleVisitor`].
///
/// # Errors
/// Returns the first error raised by a closure, or
/// [`crate::Error::AttributeConstructorNotFound`] when an attribute can't be rebuilt.
pub fn walk<T, I>(
    module: &mut Module,
    cache: &AssemblyResolutionCache,
    rewrite_type: T,
    rewrite_instruction: I,
) -> Result<bool>
where
    T: FnMut(&mut ModuleContext<'_>, &CilTypeRc) -> Result<Option<CilTypeRc>>,
    I: FnMut(
        &mut ModuleContext<'_>,
        &mut BodyEditor<'_>,
        &Instruction,
    ) -> Result<Option<Instruction>>,
{
    let mut visitor = ClosureVisitor {
        rewrite_type,
        rewrite_instruction,
    };
    ModuleGraphWalker::new(cache).walk(module, &mut visitor)
}

struct ClosureVisitor<T, I> {
    rewrite_type: T,
    rewrite_instruction: I,
}

impl<T, I> ModuleVisitor for ClosureVisitor<T, I>
where
    T: FnMut(&mut ModuleContext<'_>, &CilTypeRc) -> Result<Option<CilTypeRc>>,
    I: FnMut(
        &mut ModuleContext<'_>,
        &mut BodyEditor<'_>,
        &Instruction,
    ) -> Result<Option<Instruction>>,
{
    fn rewrite_type(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Option<CilTypeRc>> {
        (self.rewrite_type)(ctx, ty)
    }

    fn rewrite_instruction(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Option<Instruction>> {
        (self.rewrite_instruction)(ctx, body, instruction)
    }
}

/// Walks one module at a time. Holds no state between walks.
pub struct ModuleGraphWalker<'c> {
    cache: &'c AssemblyResolutionCache,
}

impl<'c> ModuleGraphWalker<'c> {
    /// Create a walker resolving cross-module references through `cache`
    #[must_use]
    pub fn new(cache: &'c AssemblyResolutionCache) -> Self {
        ModuleGraphWalker { cache }
    }

    /// Walk `module`, returning true if anything was replaced.
    ///
    /// # Errors
    /// Returns the first error raised by the visitor, or
    /// [`crate::Error::AttributeConstructorNotFound`] when an attribute can't be rebuilt.
    pub fn walk(&self, module: &mut Module, visitor: &mut dyn ModuleVisitor) -> Result<bool> {
        let constructors = local_constructors(module);
        let Module {
            name,
            assembly_refs,
            custom_attributes,
            types,
            ..
        } = module;

        let mut ctx = ModuleContext::new(name.as_str(), assembly_refs, self.cache, &constructors);
        let mut pass = Pass {
            visitor,
            changed: false,
        };

        pass.attributes(&mut ctx, custom_attributes)?;

        for type_def in types.iter_mut().filter(|t| !t.is_module_type()) {
            log::trace!("{}: walking {}", ctx.module_name(), type_def.full_name());

            pass.attributes(&mut ctx, &mut type_def.custom_attributes)?;
            for param in &type_def.generic_params {
                pass.constraints(&mut ctx, param)?;
            }
            for interface in &mut type_def.interfaces {
                pass.type_slot(&mut ctx, interface)?;
            }
            if let Some(base) = type_def.base.as_mut().filter(|base| !base.is_object()) {
                pass.type_slot(&mut ctx, base)?;
            }
            for field in &mut type_def.fields {
                pass.attributes(&mut ctx, &mut field.custom_attributes)?;
                pass.type_slot(&mut ctx, &mut field.field_type)?;
            }
            for property in &mut type_def.properties {
                pass.type_slot(&mut ctx, &mut property.property_type)?;
            }
            for event in &mut type_def.events {
                pass.type_slot(&mut ctx, &mut event.event_type)?;
            }
            for method in &mut type_def.methods {
                pass.method(&mut ctx, method)?;
            }
        }

        Ok(pass.changed)
    }
}

/// State of one walk
struct Pass<'v> {
    visitor: &'v mut dyn ModuleVisitor,
    changed: bool,
}

impl Pass<'_> {
    fn method(&mut self, ctx: &mut ModuleContext<'_>, method: &mut MethodDef) -> Result<()> {
        self.type_slot(ctx, &mut method.return_type)?;
        for param in &method.generic_params {
            self.constraints(ctx, param)?;
        }
        self.attributes(ctx, &mut method.custom_attributes)?;
        for param in &mut method.parameters {
            self.type_slot(ctx, &mut param.parameter_type)?;
        }
        for target in &mut method.overrides {
            self.method_ref(ctx, target)?;
        }

        self.visitor.visit_method(ctx, method)?;

        if let Some(body) = method.body.as_mut() {
            self.body(ctx, &method.name, body)?;
        }
        Ok(())
    }

    fn body(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        method: &str,
        body: &mut MethodBody,
    ) -> Result<()> {
        let MethodBody {
            instructions,
            variables,
        } = body;

        for variable in variables.iter_mut() {
            self.type_slot(ctx, &mut variable.variable_type)?;
        }

        for index in 0..instructions.len() {
            if instructions[index].is_inert() {
                continue;
            }

            self.operand(ctx, &mut instructions[index])?;

            let mut editor = BodyEditor::new(method, index, variables);
            if let Some(replacement) =
                self.visitor
                    .rewrite_instruction(ctx, &mut editor, &instructions[index])?
            {
                log::trace!(
                    "{}: {method} {} -> {replacement}",
                    ctx.module_name(),
                    instructions[index]
                );
                instructions[index] = replacement;
                self.changed = true;
            }
        }
        Ok(())
    }

    fn operand(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        instruction: &mut Instruction,
    ) -> Result<()> {
        match &mut instruction.operand {
            Operand::Field(field) => {
                self.type_slot(ctx, &mut field.declaring_type)?;
                self.type_slot(ctx, &mut field.field_type)?;
            }
            Operand::Method(method) => self.method_ref(ctx, method)?,
            Operand::Type(ty) => {
                let mut replacement = ty.clone();
                if self.type_slot(ctx, &mut replacement)? {
                    *instruction =
                        instruction.replaced(instruction.opcode, Operand::Type(replacement));
                }
            }
            Operand::None | Operand::Primitive(_) => {}
        }
        Ok(())
    }

    fn method_ref(&mut self, ctx: &mut ModuleContext<'_>, method: &mut MethodRef) -> Result<()> {
        self.method_member(ctx, method.element_mut())?;
        if let MethodRef::GenericInstance(spec) = method {
            for arg in &mut spec.generic_args {
                self.type_slot(ctx, arg)?;
            }
        }
        Ok(())
    }

    fn method_member(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        member: &mut MethodMember,
    ) -> Result<()> {
        self.type_slot(ctx, &mut member.declaring_type)?;
        self.type_slot(ctx, &mut member.return_type)?;
        for param in &mut member.parameters {
            self.type_slot(ctx, param)?;
        }
        Ok(())
    }

    /// Visit one type slot, swapping in the rewritten reference. Returns true if the slot
    /// changed.
    fn type_slot(&mut self, ctx: &mut ModuleContext<'_>, slot: &mut CilTypeRc) -> Result<bool> {
        let mut entered = HashSet::new();
        let changed = self.type_node(ctx, slot, &mut entered)?;
        self.changed |= changed;
        Ok(changed)
    }

    fn type_node(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        slot: &mut CilTypeRc,
        entered: &mut HashSet<*const GenericParam>,
    ) -> Result<bool> {
        let mut changed = false;
        if let Some(replacement) = self.visitor.rewrite_type(ctx, slot)? {
            log::trace!("{}: {slot} -> {replacement}", ctx.module_name());
            *slot = replacement;
            changed = true;
        }

        let rebuilt = match slot.as_ref() {
            CilType::Named(_) => None,
            CilType::GenericInstance { element, args } => {
                let mut element = element.clone();
                let mut args = args.clone();
                let mut inner = self.type_node(ctx, &mut element, entered)?;
                for arg in &mut args {
                    inner |= self.type_node(ctx, arg, entered)?;
                }
                inner.then(|| CilType::generic_instance(element, args))
            }
            CilType::SzArray(element) => {
                let mut element = element.clone();
                self.type_node(ctx, &mut element, entered)?
                    .then(|| CilType::sz_array(element))
            }
            CilType::Array { element, rank } => {
                let rank = *rank;
                let mut element = element.clone();
                self.type_node(ctx, &mut element, entered)?
                    .then(|| Arc::new(CilType::Array { element, rank }))
            }
            CilType::ByRef(element) => {
                let mut element = element.clone();
                self.type_node(ctx, &mut element, entered)?
                    .then(|| CilType::by_ref(element))
            }
            CilType::Pointer(element) => {
                let mut element = element.clone();
                self.type_node(ctx, &mut element, entered)?
                    .then(|| Arc::new(CilType::Pointer(element)))
            }
            CilType::GenericParam(param) => {
                if let Some(param) = param.upgrade() {
                    changed |= self.constraint_list(ctx, &param, entered)?;
                }
                None
            }
        };

        if let Some(rebuilt) = rebuilt {
            *slot = rebuilt;
            changed = true;
        }
        Ok(changed)
    }

    /// Visit the constraints of a declared generic parameter
    fn constraints(&mut self, ctx: &mut ModuleContext<'_>, param: &GenericParamRc) -> Result<()> {
        let mut entered = HashSet::new();
        self.changed |= self.constraint_list(ctx, param, &mut entered)?;
        Ok(())
    }

    fn constraint_list(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        param: &GenericParamRc,
        entered: &mut HashSet<*const GenericParam>,
    ) -> Result<bool> {
        if !entered.insert(Arc::as_ptr(param)) {
            return Ok(false);
        }

        let mut constraints = param.constraints();
        let mut changed = false;
        for constraint in &mut constraints {
            changed |= self.type_node(ctx, constraint, entered)?;
        }
        if changed {
            param.set_constraints(constraints);
        }
        Ok(changed)
    }

    /// Rebuild every attribute of `list` whose types change. Replacements are swapped in
    /// only once the whole list succeeded.
    fn attributes(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        list: &mut Vec<CustomAttribute>,
    ) -> Result<()> {
        let mut replacements = Vec::new();

        for (index, attribute) in list.iter().enumerate() {
            let mut attribute_type = attribute.attribute_type().clone();
            let type_changed = self.type_slot(ctx, &mut attribute_type)?;

            let mut argument_types: Vec<CilTypeRc> = attribute
                .arguments
                .iter()
                .map(|argument| argument.arg_type.clone())
                .collect();
            let mut arguments_changed = false;
            for argument_type in &mut argument_types {
                arguments_changed |= self.type_slot(ctx, argument_type)?;
            }

            if !type_changed && !arguments_changed {
                continue;
            }

            let Some(mut parameters) =
                find_constructor(ctx, &attribute_type, &attribute.constructor, &argument_types)
            else {
                return Err(AttributeConstructorNotFound {
                    attribute: attribute.attribute_type().full_name(),
                    replacement: attribute_type.full_name(),
                });
            };
            for parameter in &mut parameters {
                self.type_slot(ctx, parameter)?;
            }

            let rebuilt = CustomAttribute {
                constructor: MethodMember::constructor(attribute_type, parameters),
                arguments: argument_types
                    .into_iter()
                    .zip(attribute.arguments.iter())
                    .map(|(arg_type, original)| {
                        CustomAttributeArgument::new(arg_type, original.value.clone())
                    })
                    .collect(),
                properties: attribute.properties.clone(),
                fields: attribute.fields.clone(),
            };
            replacements.push((index, rebuilt));
        }

        for (index, rebuilt) in replacements {
            log::debug!(
                "{}: rebuilt attribute {} as {}",
                ctx.module_name(),
                list[index].attribute_type(),
                rebuilt.attribute_type()
            );
            list[index] = rebuilt;
        }
        Ok(())
    }
}

/// Find a constructor on `attribute_type` taking as many parameters as `original`, where each
/// parameter matches either the original parameter type or the rewritten argument type.
fn find_constructor(
    ctx: &ModuleContext<'_>,
    attribute_type: &CilType,
    original: &MethodMember,
    argument_types: &[CilTypeRc],
) -> Option<Vec<CilTypeRc>> {
    ctx.constructors_of(attribute_type)
        .into_iter()
        .find(|candidate| {
            candidate.len() == original.parameters.len()
                && candidate.iter().enumerate().all(|(position, parameter)| {
                    is_same_type(&original.parameters[position], parameter)
                        || argument_types
                            .get(position)
                            .is_some_and(|argument| is_same_type(argument, parameter))
                })
        })
}
