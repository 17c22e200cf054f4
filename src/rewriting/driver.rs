//! Running a handler chain over whole modules.
//!
//! [`ModuleRewriter`] walks a module once and, at every site, asks every handler of its
//! [`HandlerChain`] in turn. A replacement returned by one handler is what the next handler
//! sees, and is swapped into the module as soon as all handlers ran for that site. Results
//! are collected into a [`RewriteReport`].
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use modrewrite::{
//!     metadata::{typesystem::AssemblyResolutionCache, Module},
//!     rewriting::{HandlerChain, ModuleRewriter},
//! };
//!
//! let rewriter = ModuleRewriter::new(
//!     HandlerChain::builder().build(),
//!     Arc::new(AssemblyResolutionCache::new()),
//! );
//! let mut module = Module::new("Mod", "1.0.0.0");
//! let report = rewriter.rewrite(&mut module).unwrap();
//! assert!(!report.changed);
//! assert!(report.flags.is_empty());
//! ```

use std::{collections::BTreeSet, fmt, sync::Arc};

use rayon::prelude::*;

use crate::{
    assembly::Instruction,
    metadata::{
        method::MethodDef,
        module::Module,
        typesystem::{AssemblyResolutionCache, CilTypeRc},
    },
    rewriting::{
        context::{BodyEditor, ModuleContext},
        handler::{HandlerChain, InstructionHandler},
        walker::{ModuleGraphWalker, ModuleVisitor},
        RewriteResult,
    },
    Result,
};

/// What a rewrite found in one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Name of the module
    pub module: String,
    /// True if anything in the module was replaced
    pub changed: bool,
    /// Every non-`None` result raised by a handler
    pub flags: BTreeSet<RewriteResult>,
    /// Descriptions of what the handlers found
    pub phrases: BTreeSet<String>,
}

impl RewriteReport {
    fn new(module: &str) -> Self {
        RewriteReport {
            module: module.to_string(),
            ..RewriteReport::default()
        }
    }

    /// Returns true if `result` was raised
    #[must_use]
    pub fn contains(&self, result: RewriteResult) -> bool {
        self.flags.contains(&result)
    }

    /// Returns true if nothing but rewrites were raised
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.flags.iter().all(|flag| *flag == RewriteResult::Rewritten)
    }

    fn record(
        &mut self,
        handler: &dyn InstructionHandler,
        result: RewriteResult,
        phrase: Option<String>,
    ) {
        if result.is_none() {
            return;
        }

        self.flags.insert(result);
        self.phrases
            .insert(phrase.unwrap_or_else(|| handler.noun_phrase().to_string()));
    }
}

impl fmt::Display for RewriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.module)?;
        if self.flags.is_empty() {
            return write!(f, " no findings");
        }
        for flag in &self.flags {
            write!(f, " {flag}")?;
        }
        for phrase in &self.phrases {
            write!(f, "\n  - {phrase}")?;
        }
        Ok(())
    }
}

/// Runs a handler chain over modules, resolving through a shared, sealed cache.
pub struct ModuleRewriter {
    chain: HandlerChain,
    cache: Arc<AssemblyResolutionCache>,
}

impl ModuleRewriter {
    /// Create a rewriter. The cache is sealed, so it has to be fully populated beforehand.
    #[must_use]
    pub fn new(chain: HandlerChain, cache: Arc<AssemblyResolutionCache>) -> Self {
        cache.seal();
        ModuleRewriter { chain, cache }
    }

    /// The handlers in execution order
    #[must_use]
    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    /// Walk `module` once with every handler, applying replacements in place.
    ///
    /// # Errors
    /// Returns the first error raised by a handler, or
    /// [`crate::Error::AttributeConstructorNotFound`] when an attribute can't be rebuilt.
    pub fn rewrite(&self, module: &mut Module) -> Result<RewriteReport> {
        let mut visitor = ChainVisitor {
            chain: &self.chain,
            report: RewriteReport::new(&module.name),
        };

        let changed = ModuleGraphWalker::new(&self.cache).walk(module, &mut visitor)?;
        let mut report = visitor.report;
        report.changed = changed;

        log::debug!(
            "{}: rewrite finished, changed={changed}, flags={:?}",
            report.module,
            report.flags
        );
        Ok(report)
    }

    /// Rewrite independent modules in parallel. A failure only affects its own module.
    pub fn rewrite_all(&self, modules: &mut [Module]) -> Vec<Result<RewriteReport>> {
        modules
            .par_iter_mut()
            .map(|module| {
                let report = self.rewrite(module);
                if let Err(error) = &report {
                    log::warn!("{}: rewrite failed: {error}", module.name);
                }
                report
            })
            .collect()
    }
}

/// Adapts a handler chain to the walker
struct ChainVisitor<'a> {
    chain: &'a HandlerChain,
    report: RewriteReport,
}

impl ModuleVisitor for ChainVisitor<'_> {
    fn rewrite_type(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        ty: &CilTypeRc,
    ) -> Result<Option<CilTypeRc>> {
        let mut current: Option<CilTypeRc> = None;
        for handler in self.chain {
            let handled = handler.handle_type(ctx, current.as_ref().unwrap_or(ty))?;
            self.report
                .record(handler.as_ref(), handled.result, handled.phrase);
            if let Some(replacement) = handled.replacement {
                current = Some(replacement);
            }
        }
        Ok(current)
    }

    fn visit_method(&mut self, ctx: &mut ModuleContext<'_>, method: &MethodDef) -> Result<()> {
        for handler in self.chain {
            let result = handler.handle_method(ctx, method)?;
            self.report.record(handler.as_ref(), result, None);
        }
        Ok(())
    }

    fn rewrite_instruction(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        body: &mut BodyEditor<'_>,
        instruction: &Instruction,
    ) -> Result<Option<Instruction>> {
        let mut current: Option<Instruction> = None;
        for handler in self.chain {
            let handled =
                handler.handle_instruction(ctx, body, current.as_ref().unwrap_or(instruction))?;
            self.report
                .record(handler.as_ref(), handled.result, handled.phrase);
            if let Some(replacement) = handled.replacement {
                current = Some(replacement);
            }
        }
        Ok(current)
    }
}
