//! End-to-end rewriting tests.
//!
//! These tests drive the public API the way a host does:
//! 1. Register the host's own modules in a resolution cache
//! 2. Build a handler chain, from a `RewriteConfig` or by hand
//! 3. Rewrite extension modules and inspect both the report and the mutated module

use std::sync::Arc;

use modrewrite::prelude::*;

const HOST: &str = "Stardew Valley";

fn host_type(name: &str) -> CilTypeRc {
    CilType::named("StardewValley", name, TypeScope::assembly(HOST))
}

fn single() -> CilTypeRc {
    CilType::value_type("System", "Single", TypeScope::core())
}

fn type_token(row: u32) -> Token {
    Token::from_parts(Token::TYPE_DEF, row)
}

fn method_token(row: u32) -> Token {
    Token::from_parts(Token::METHOD_DEF, row)
}

fn field_token(row: u32) -> Token {
    Token::from_parts(Token::FIELD, row)
}

/// The host assembly mods are compiled against
fn host_module() -> Module {
    let character = TypeDef::new(type_token(2), "StardewValley", "Character")
        .with_field(FieldDef::new(field_token(1), "name", CilType::string()))
        .with_method(MethodDef::new(method_token(1), "GetName", CilType::string()));

    let farmer = TypeDef::new(type_token(3), "StardewValley", "Farmer")
        .with_base(CilType::named(
            "StardewValley",
            "Character",
            TypeScope::CurrentModule,
        ))
        .with_field(FieldDef::new(field_token(2), "money", CilType::int32()))
        .with_method(MethodDef::constructor(method_token(2)))
        .with_method(MethodDef::new(method_token(3), "get_Stamina", single()))
        .with_method(
            MethodDef::new(method_token(4), "set_Stamina", CilType::void())
                .with_parameter("value", single()),
        )
        .with_property(PropertyDef::new("Stamina", single()));

    let mut serializer = FieldDef::new(field_token(3), "serializer", CilType::object());
    serializer.flags |= FieldAttributes::STATIC;
    let save_game =
        TypeDef::new(type_token(4), "StardewValley", "SaveGame").with_field(serializer);

    Module::new(HOST, "1.6.0.0")
        .with_type(character)
        .with_type(farmer)
        .with_type(save_game)
}

fn host_cache() -> Arc<AssemblyResolutionCache> {
    let cache = AssemblyResolutionCache::new();
    cache.register(Arc::new(host_module())).unwrap();
    Arc::new(cache)
}

/// A mod with a single entry method running `instructions`
fn mod_module(name: &str, instructions: Vec<Instruction>) -> Module {
    let entry = TypeDef::new(type_token(2), name, "ModEntry").with_method(
        MethodDef::new(method_token(1), "Entry", CilType::void())
            .with_body(MethodBody::new(instructions)),
    );
    Module::new(name, "1.0.0.0")
        .with_assembly_ref(HOST)
        .with_type(entry)
}

fn entry_instructions(module: &Module) -> &[Instruction] {
    let entry = &module.types[1].methods[0];
    &entry.body.as_ref().unwrap().instructions
}

fn load_field(declaring: CilTypeRc, name: &str, field_type: CilTypeRc) -> Vec<Instruction> {
    vec![
        Instruction::simple(opcodes::LDARG_0),
        Instruction::field(opcodes::LDFLD, FieldRef::new(declaring, name, field_type)),
        Instruction::simple(opcodes::POP),
        Instruction::simple(opcodes::RET),
    ]
}

fn config() -> RewriteConfig {
    RewriteConfig::new().with_platform(Platform::Linux)
}

/// Fails on every method of the named module
struct FailOn(&'static str);

impl InstructionHandler for FailOn {
    fn noun_phrase(&self) -> &str {
        "failure"
    }

    fn handle_method(
        &self,
        ctx: &mut ModuleContext<'_>,
        _method: &MethodDef,
    ) -> Result<RewriteResult> {
        if ctx.module_name() == self.0 {
            return Err(Error::Error(format!("{} is broken", self.0)));
        }
        Ok(RewriteResult::None)
    }
}

#[test]
fn test_valid_module_is_left_alone() -> Result<()> {
    let rewriter = ModuleRewriter::new(config().build_chain()?, host_cache());
    let mut module = mod_module(
        "CleanMod",
        load_field(host_type("Farmer"), "money", CilType::int32()),
    );

    let report = rewriter.rewrite(&mut module)?;
    assert!(!report.changed);
    assert!(report.flags.is_empty());
    assert!(report.is_compatible());
    assert_eq!(report.to_string(), "CleanMod: no findings");
    Ok(())
}

#[test]
fn test_missing_and_mistyped_members() -> Result<()> {
    let rewriter = ModuleRewriter::new(config().build_chain()?, host_cache());

    let mut missing = mod_module(
        "MissingMod",
        load_field(host_type("Farmer"), "energy", CilType::int32()),
    );
    let report = rewriter.rewrite(&mut missing)?;
    assert!(report.contains(RewriteResult::NotCompatible));
    assert!(!report.is_compatible());
    assert!(report
        .phrases
        .contains("reference to StardewValley.Farmer.energy (no such field)"));

    let mut mistyped = mod_module(
        "MistypedMod",
        load_field(host_type("Farmer"), "money", CilType::string()),
    );
    let report = rewriter.rewrite(&mut mistyped)?;
    assert!(report.contains(RewriteResult::NotCompatible));
    assert!(report.phrases.contains(
        "reference to StardewValley.Farmer.money (field is System.Int32, not System.String)"
    ));
    Ok(())
}

#[test]
fn test_inherited_field_is_valid() -> Result<()> {
    let rewriter = ModuleRewriter::new(config().build_chain()?, host_cache());
    let mut module = mod_module(
        "InheritingMod",
        load_field(host_type("Farmer"), "name", CilType::string()),
    );
    assert!(rewriter.rewrite(&mut module)?.flags.is_empty());
    Ok(())
}

#[test]
fn test_field_to_property_is_idempotent() -> Result<()> {
    let chain = config()
        .with_member_rewrite(MemberRewrite::FieldToProperty {
            type_name: "StardewValley.Farmer".to_string(),
            field: "stamina".to_string(),
            property: "Stamina".to_string(),
        })
        .build_chain()?;
    let rewriter = ModuleRewriter::new(chain, host_cache());
    let mut module = mod_module(
        "StaminaMod",
        load_field(host_type("Farmer"), "stamina", single()),
    );

    let report = rewriter.rewrite(&mut module)?;
    assert!(report.changed);
    assert!(report.contains(RewriteResult::Rewritten));
    assert!(report.is_compatible());

    let getter = &entry_instructions(&module)[1];
    assert_eq!(getter.opcode, opcodes::CALLVIRT);
    assert_eq!(
        getter.method_operand().unwrap().element().full_name(),
        "System.Single StardewValley.Farmer::get_Stamina()"
    );

    let again = rewriter.rewrite(&mut module)?;
    assert!(!again.changed);
    assert!(again.flags.is_empty());
    Ok(())
}

#[test]
fn test_rewriters_run_before_detectors() -> Result<()> {
    let chain = HandlerChain::builder()
        .with_handler(Arc::new(ReferenceToMissingMemberFinder::new([HOST])))
        .with_handler(Arc::new(FieldToPropertyRewriter::new(
            "StardewValley.Farmer",
            "stamina",
            "Stamina",
        )))
        .build();
    assert_eq!(
        chain.iter().map(|handler| handler.kind()).collect::<Vec<_>>(),
        vec![HandlerKind::Rewriter, HandlerKind::Detector]
    );

    let rewriter = ModuleRewriter::new(chain, host_cache());
    let mut module = mod_module(
        "StaminaMod",
        load_field(host_type("Farmer"), "stamina", single()),
    );

    // the host has no `stamina` field, only the property the rewriter redirects to
    let report = rewriter.rewrite(&mut module)?;
    assert_eq!(
        report.flags.iter().copied().collect::<Vec<_>>(),
        vec![RewriteResult::Rewritten]
    );
    Ok(())
}

#[test]
fn test_findings_do_not_depend_on_handler_order() -> Result<()> {
    let harmony = CilType::named("HarmonyLib", "Harmony", TypeScope::assembly("0Harmony"));
    let instructions = vec![
        Instruction::ldstr("example.mod"),
        Instruction::method(
            opcodes::NEWOBJ,
            MethodMember::constructor(harmony, vec![CilType::string()]),
        ),
        Instruction::simple(opcodes::POP),
        Instruction::field(
            opcodes::LDSFLD,
            FieldRef::new(host_type("SaveGame"), "serializer", CilType::object()),
        ),
        Instruction::simple(opcodes::POP),
        Instruction::simple(opcodes::RET),
    ];

    let handlers: Vec<InstructionHandlerRc> = config().build_chain()?.iter().cloned().collect();
    let forward = HandlerChain::builder().with_handlers(handlers.clone()).build();
    let backward = HandlerChain::builder()
        .with_handlers(handlers.into_iter().rev())
        .build();

    let mut first = mod_module("PatchMod", instructions.clone());
    let mut second = mod_module("PatchMod", instructions);
    let cache = host_cache();
    let forward = ModuleRewriter::new(forward, cache.clone()).rewrite(&mut first)?;
    let backward = ModuleRewriter::new(backward, cache).rewrite(&mut second)?;

    assert_eq!(forward, backward);
    assert!(forward.contains(RewriteResult::DetectedGamePatch));
    assert!(forward.contains(RewriteResult::DetectedSaveSerializerChange));
    assert!(forward.phrases.contains("patch library"));
    assert!(forward.phrases.contains("change to the save serializer"));
    Ok(())
}

#[test]
fn test_platform_mapping_rewrites_full_signatures() -> Result<()> {
    let mapping = TypeMapping::new(
        "Microsoft.Xna.Framework.Vector2",
        "Microsoft.Xna.Framework.Vector2",
        "MonoGame.Framework",
    )
    .from_assembly("Microsoft.Xna.Framework");
    let build = |platform| {
        config()
            .with_platform(platform)
            .with_type_mapping(Platform::Linux, mapping.clone())
            .build_chain()
    };

    let vector = CilType::value_type(
        "Microsoft.Xna.Framework",
        "Vector2",
        TypeScope::assembly("Microsoft.Xna.Framework"),
    );
    let list = CilType::generic_instance(
        CilType::named("System.Collections.Generic", "List`1", TypeScope::core()),
        vec![vector.clone()],
    );
    let entry = TypeDef::new(type_token(2), "PathMod", "Path")
        .with_field(FieldDef::new(field_token(1), "position", vector.clone()))
        .with_property(PropertyDef::new("Target", vector.clone()))
        .with_event(EventDef::new(
            "Moved",
            CilType::generic_instance(
                CilType::named("System", "Action`1", TypeScope::core()),
                vec![vector],
            ),
        ))
        .with_method(
            MethodDef::new(method_token(1), "Follow", CilType::void())
                .with_parameter("points", list),
        );
    let module = Module::new("PathMod", "1.0.0.0")
        .with_assembly_ref("Microsoft.Xna.Framework")
        .with_type(entry);

    let mut windows = module.clone();
    let report =
        ModuleRewriter::new(build(Platform::Windows)?, host_cache()).rewrite(&mut windows)?;
    assert!(!report.changed);

    let mut linux = module;
    let report = ModuleRewriter::new(build(Platform::Linux)?, host_cache()).rewrite(&mut linux)?;
    assert!(report.changed);
    assert!(report.contains(RewriteResult::Rewritten));
    assert!(linux.references_assembly("MonoGame.Framework"));

    let path = &linux.types[1];
    let position = &path.fields[0].field_type;
    assert_eq!(position.scope(), TypeScope::assembly("MonoGame.Framework"));
    assert!(position.is_value_type());

    let points = &path.methods[0].parameters[0].parameter_type;
    let CilType::GenericInstance { args, .. } = points.as_ref() else {
        panic!("parameter is no longer a generic instance");
    };
    assert_eq!(args[0].scope(), TypeScope::assembly("MonoGame.Framework"));

    let target = &path.properties[0].property_type;
    assert_eq!(target.scope(), TypeScope::assembly("MonoGame.Framework"));
    let CilType::GenericInstance { args, .. } = path.events[0].event_type.as_ref() else {
        panic!("event type is no longer a generic instance");
    };
    assert_eq!(args[0].scope(), TypeScope::assembly("MonoGame.Framework"));
    Ok(())
}

#[test]
fn test_dynamic_locals_are_detected() -> Result<()> {
    let rewriter = ModuleRewriter::new(config().build_chain()?, host_cache());
    let expando = CilType::named(
        "System.Dynamic",
        "ExpandoObject",
        TypeScope::assembly("System.Core"),
    );
    let mut module = mod_module("DynamicMod", vec![Instruction::simple(opcodes::RET)]);
    if let Some(body) = module.types[1].methods[0].body.take() {
        module.types[1].methods[0].body = Some(body.with_variable(expando));
    }

    let report = rewriter.rewrite(&mut module)?;
    assert!(report.contains(RewriteResult::DetectedDynamicUsage));
    assert!(report.phrases.contains("dynamic keyword"));
    Ok(())
}

#[test]
fn test_rewrite_all_isolates_failures() -> Result<()> {
    let chain = HandlerChain::builder()
        .with_handlers(config().build_chain()?.iter().cloned())
        .with_handler(Arc::new(FailOn("BrokenMod")))
        .build();
    let rewriter = ModuleRewriter::new(chain, host_cache());

    let mut modules = vec![
        mod_module("CleanMod", load_field(host_type("Farmer"), "money", CilType::int32())),
        mod_module("BrokenMod", vec![Instruction::simple(opcodes::RET)]),
        mod_module("MissingMod", load_field(host_type("Farmer"), "energy", CilType::int32())),
    ];
    let reports = rewriter.rewrite_all(&mut modules);

    assert_eq!(reports.len(), 3);
    assert!(reports[0].as_ref().is_ok_and(RewriteReport::is_compatible));
    assert!(matches!(&reports[1], Err(Error::Error(message)) if message == "BrokenMod is broken"));
    assert!(reports[2]
        .as_ref()
        .is_ok_and(|report| report.contains(RewriteResult::NotCompatible)));
    Ok(())
}

#[test]
fn test_sealed_cache_rejects_late_modules() {
    let cache = host_cache();
    let _rewriter = ModuleRewriter::new(HandlerChain::builder().build(), cache.clone());
    assert!(matches!(
        cache.register(Arc::new(Module::new("Late", "1.0.0.0"))),
        Err(Error::CacheSealed(name)) if name == "Late"
    ));
}
