//! Rewrite policy configuration.
//!
//! [`RewriteConfig`] describes what a host wants checked and repaired in the modules it
//! loads: the platform it runs on, which types have a different home on that platform, which
//! assemblies and members are considered risky, and which member references should be
//! validated. [`RewriteConfig::build_chain`] turns it into a ready [`HandlerChain`].

use std::{collections::HashMap, sync::Arc};

use strum::{Display, EnumIter, EnumString};

use crate::{
    rewriting::{
        handlers::{
            FieldReplaceRewriter, FieldToPropertyRewriter, MemberFinder, MemberKind,
            MethodParentRewriter, ReferenceToMemberWithUnexpectedTypeFinder,
            ReferenceToMissingMemberFinder, TypeFinder,
        },
        HandlerChain, InstructionHandlerRc, RewriteResult, TypeMapRule, TypeReferenceRewriter,
    },
    Result,
};

/// The platform the host runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Platform {
    /// Windows
    Windows,
    /// Linux
    Linux,
    /// macOS
    #[strum(to_string = "Mac", serialize = "macOS")]
    Mac,
    /// Android
    Android,
}

impl Platform {
    /// The platform this crate was compiled for
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Linux
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

/// Maps a type to its equivalent in another assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Full name of the type to replace
    pub from: String,
    /// Only replace references into this assembly
    pub from_assembly: Option<String>,
    /// Full name of the replacement type
    pub to: String,
    /// Assembly defining the replacement type
    pub to_assembly: String,
}

impl TypeMapping {
    /// Map `from` to the same-named type in `to_assembly`
    pub fn moved(from: impl Into<String>, to_assembly: impl Into<String>) -> Self {
        let from = from.into();
        TypeMapping {
            to: from.clone(),
            from,
            from_assembly: None,
            to_assembly: to_assembly.into(),
        }
    }

    /// Map `from` to `to` in `to_assembly`
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        to_assembly: impl Into<String>,
    ) -> Self {
        TypeMapping {
            from: from.into(),
            from_assembly: None,
            to: to.into(),
            to_assembly: to_assembly.into(),
        }
    }

    /// Only replace references into `assembly`
    #[must_use]
    pub fn from_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.from_assembly = Some(assembly.into());
        self
    }
}

/// A member of a type, by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPattern {
    /// Full name of the declaring type
    pub declaring_type: String,
    /// The kind of member
    pub kind: MemberKind,
    /// Member name
    pub name: String,
}

impl MemberPattern {
    /// Create a pattern
    pub fn new(
        declaring_type: impl Into<String>,
        kind: MemberKind,
        name: impl Into<String>,
    ) -> Self {
        MemberPattern {
            declaring_type: declaring_type.into(),
            kind,
            name: name.into(),
        }
    }
}

/// A member which moved or changed kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRewrite {
    /// A field became a property of the same type
    FieldToProperty {
        /// Declaring type
        type_name: String,
        /// Former field name
        field: String,
        /// Property name
        property: String,
    },
    /// A field moved to another type or was renamed
    ReplaceField {
        /// Former declaring type
        from_type: String,
        /// Former field name
        from_field: String,
        /// New declaring type
        to_type: String,
        /// Assembly of the new declaring type
        to_assembly: String,
        /// New field name
        to_field: String,
    },
    /// Methods moved to another type
    MethodParent {
        /// Former declaring type
        from_type: String,
        /// New declaring type
        to_type: String,
        /// Assembly of the new declaring type
        to_assembly: String,
    },
}

impl MemberRewrite {
    fn names(&self) -> Vec<&str> {
        match self {
            MemberRewrite::FieldToProperty {
                type_name,
                field,
                property,
            } => vec![type_name.as_str(), field.as_str(), property.as_str()],
            MemberRewrite::ReplaceField {
                from_type,
                from_field,
                to_type,
                to_assembly,
                to_field,
            } => vec![
                from_type.as_str(),
                from_field.as_str(),
                to_type.as_str(),
                to_assembly.as_str(),
                to_field.as_str(),
            ],
            MemberRewrite::MethodParent {
                from_type,
                to_type,
                to_assembly,
            } => vec![from_type.as_str(), to_type.as_str(), to_assembly.as_str()],
        }
    }

    fn handler(&self) -> InstructionHandlerRc {
        match self.clone() {
            MemberRewrite::FieldToProperty {
                type_name,
                field,
                property,
            } => Arc::new(FieldToPropertyRewriter::new(type_name, field, property)),
            MemberRewrite::ReplaceField {
                from_type,
                from_field,
                to_type,
                to_assembly,
                to_field,
            } => Arc::new(FieldReplaceRewriter::new(
                from_type,
                from_field,
                to_type,
                to_assembly,
                to_field,
            )),
            MemberRewrite::MethodParent {
                from_type,
                to_type,
                to_assembly,
            } => Arc::new(MethodParentRewriter::new(from_type, to_type, to_assembly)),
        }
    }
}

/// What to check and repair in loaded modules.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// The platform the host runs on, selecting the type mapping table
    pub platform: Platform,

    /// Type mappings per platform
    pub type_mappings: HashMap<Platform, Vec<TypeMapping>>,

    /// Member rewrites applied on every platform
    pub member_rewrites: Vec<MemberRewrite>,

    /// Assemblies of runtime patching libraries (default: `0Harmony`)
    pub patch_library_assemblies: Vec<String>,

    /// Types whose use indicates dynamic code
    pub dynamic_usage_types: Vec<String>,

    /// Members through which a module can replace the save serializer
    pub serializer_members: Vec<MemberPattern>,

    /// Members through which a module can hook the host without validation
    pub hook_members: Vec<MemberPattern>,

    /// Validate member references into `validated_assemblies` (default: true)
    pub validate_members: bool,

    /// Assemblies whose members are validated
    pub validated_assemblies: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            type_mappings: HashMap::new(),
            member_rewrites: Vec::new(),
            patch_library_assemblies: vec!["0Harmony".to_string()],
            dynamic_usage_types: vec![
                "System.Dynamic.DynamicObject".to_string(),
                "System.Dynamic.ExpandoObject".to_string(),
                "Microsoft.CSharp.RuntimeBinder.Binder".to_string(),
            ],
            serializer_members: ["serializer", "farmerSerializer", "locationSerializer"]
                .into_iter()
                .map(|name| MemberPattern::new("StardewValley.SaveGame", MemberKind::Field, name))
                .collect(),
            hook_members: vec![MemberPattern::new(
                "StardewValley.Game1",
                MemberKind::Field,
                "hooks",
            )],
            validate_members: true,
            validated_assemblies: vec!["Stardew Valley".to_string()],
        }
    }
}

impl RewriteConfig {
    /// Create the default configuration for the current platform
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the platform
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Add a type mapping used on `platform`
    #[must_use]
    pub fn with_type_mapping(mut self, platform: Platform, mapping: TypeMapping) -> Self {
        self.type_mappings.entry(platform).or_default().push(mapping);
        self
    }

    /// Add a member rewrite
    #[must_use]
    pub fn with_member_rewrite(mut self, rewrite: MemberRewrite) -> Self {
        self.member_rewrites.push(rewrite);
        self
    }

    /// Replace the patch library assemblies
    #[must_use]
    pub fn with_patch_libraries<I, S>(mut self, assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patch_library_assemblies = assemblies.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable member validation, and set the validated assemblies
    #[must_use]
    pub fn with_member_validation<I, S>(mut self, enable: bool, assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate_members = enable;
        self.validated_assemblies = assemblies.into_iter().map(Into::into).collect();
        self
    }

    /// The type mappings for the selected platform
    #[must_use]
    pub fn active_mappings(&self) -> &[TypeMapping] {
        self.type_mappings
            .get(&self.platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Build the handler chain described by this configuration.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a configured name is empty.
    pub fn build_chain(&self) -> Result<HandlerChain> {
        let mut handlers: Vec<InstructionHandlerRc> = Vec::new();

        let mut rule = TypeMapRule::new();
        for mapping in self.active_mappings() {
            rule = rule.with_mapping(
                &mapping.from,
                mapping.from_assembly.as_deref(),
                &mapping.to,
                &mapping.to_assembly,
            )?;
        }
        if !rule.is_empty() {
            handlers.push(Arc::new(TypeReferenceRewriter::for_type_map(rule)));
        }

        for rewrite in &self.member_rewrites {
            if rewrite.names().iter().any(|name| name.is_empty()) {
                return Err(malformed_error!("Member rewrite {:?} has an empty name", rewrite));
            }
            handlers.push(rewrite.handler());
        }

        if !self.patch_library_assemblies.is_empty() {
            ensure_names(&self.patch_library_assemblies, "patch library assembly")?;
            handlers.push(Arc::new(TypeFinder::for_assemblies(
                self.patch_library_assemblies.iter().cloned(),
                RewriteResult::DetectedGamePatch,
                "patch library",
            )));
        }

        if !self.dynamic_usage_types.is_empty() {
            ensure_names(&self.dynamic_usage_types, "dynamic usage type")?;
            handlers.push(Arc::new(TypeFinder::for_types(
                self.dynamic_usage_types.iter().cloned(),
                RewriteResult::DetectedDynamicUsage,
                "dynamic keyword",
            )));
        }

        for (members, result, phrase) in [
            (
                &self.serializer_members,
                RewriteResult::DetectedSaveSerializerChange,
                "change to the save serializer",
            ),
            (
                &self.hook_members,
                RewriteResult::DetectedUnvalidatedHook,
                "unvalidated hook",
            ),
        ] {
            for member in members {
                if member.declaring_type.is_empty() || member.name.is_empty() {
                    return Err(malformed_error!("Member pattern {:?} has an empty name", member));
                }
                handlers.push(Arc::new(MemberFinder::new(
                    member.declaring_type.as_str(),
                    member.kind,
                    [member.name.as_str()],
                    result,
                    phrase,
                )));
            }
        }

        if self.validate_members && !self.validated_assemblies.is_empty() {
            ensure_names(&self.validated_assemblies, "validated assembly")?;
            handlers.push(Arc::new(ReferenceToMissingMemberFinder::new(
                self.validated_assemblies.iter().cloned(),
            )));
            handlers.push(Arc::new(ReferenceToMemberWithUnexpectedTypeFinder::new(
                self.validated_assemblies.iter().cloned(),
            )));
        }

        log::debug!(
            "built handler chain for {} with {} handlers",
            self.platform,
            handlers.len()
        );
        Ok(HandlerChain::builder().with_handlers(handlers).build())
    }
}

fn ensure_names(names: &[String], what: &str) -> Result<()> {
    if names.iter().any(String::is_empty) {
        return Err(malformed_error!("Empty {} name", what));
    }
    Ok(())
}
