//! Pluggable detectors and rewriters evaluated against every site of a module.
//!
//! An [`InstructionHandler`] sees every type reference, every method and every instruction
//! of a module during one walk. It classifies what it sees with a [`RewriteResult`] and may
//! hand back a replacement. Handlers are stateless: all accumulation happens in the report
//! of the module being rewritten, so one chain can be shared across threads.
//!
//! Handlers are grouped in a [`HandlerChain`]. The chain keeps registration order within
//! each [`HandlerKind`], but always runs rewriters before detectors so that detectors
//! classify code which has already been corrected.

use std::{fmt, slice, sync::Arc};

use strum::Display;

use crate::{
    assembly::Instruction,
    metadata::{method::MethodDef, typesystem::CilTypeRc},
    rewriting::{
        context::{BodyEditor, ModuleContext},
        Handled, RewriteResult,
    },
    Result,
};

/// Whether a handler changes code or only classifies it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum HandlerKind {
    /// Returns replacements
    Rewriter,
    /// Only reports results
    Detector,
}

/// A detection or rewrite unit.
///
/// All hooks default to "no opinion".
pub trait InstructionHandler: Send + Sync {
    /// Describes what the handler looks for, used when a hook doesn't give a specific phrase
    fn noun_phrase(&self) -> &str;

    /// Rewriter or detector
    fn kind(&self) -> HandlerKind {
        HandlerKind::Detector
    }

    /// Called for every type reference.
    ///
    /// # Errors
    /// Any error aborts the walk of the current module.
    fn handle_type(
        &self,
        _ctx: &mut ModuleContext<'_>,
        _ty: &CilTypeRc,
    ) -> Result<Handled<CilTypeRc>> {
        Ok(Handled::none())
    }

    /// Called once per method, after its signature has been visited.
    ///
    /// # Errors
    /// Any error aborts the walk of the current module.
    fn handle_method(
        &self,
        _ctx: &mut ModuleContext<'_>,
        _method: &MethodDef,
    ) -> Result<RewriteResult> {
        Ok(RewriteResult::None)
    }

    /// Called for every non-inert instruction, after its operand has been visited.
    ///
    /// # Errors
    /// Any error aborts the walk of the current module.
    fn handle_instruction(
        &self,
        _ctx: &mut ModuleContext<'_>,
        _body: &mut BodyEditor<'_>,
        _instruction: &Instruction,
    ) -> Result<Handled<Instruction>> {
        Ok(Handled::none())
    }
}

/// Shared reference to a handler
pub type InstructionHandlerRc = Arc<dyn InstructionHandler>;

/// An ordered list of handlers, rewriters first.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<InstructionHandlerRc>,
}

impl HandlerChain {
    /// Start building a chain
    #[must_use]
    pub fn builder() -> HandlerChainBuilder {
        HandlerChainBuilder::default()
    }

    /// Iterate the handlers in execution order
    pub fn iter(&self) -> slice::Iter<'_, InstructionHandlerRc> {
        self.handlers.iter()
    }

    /// Number of handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if the chain has no handlers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<'a> IntoIterator for &'a HandlerChain {
    type Item = &'a InstructionHandlerRc;
    type IntoIter = slice::Iter<'a, InstructionHandlerRc>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.handlers
                    .iter()
                    .map(|handler| format!("{}: {}", handler.kind(), handler.noun_phrase())),
            )
            .finish()
    }
}

/// Builder for [`HandlerChain`]
#[derive(Default)]
pub struct HandlerChainBuilder {
    handlers: Vec<InstructionHandlerRc>,
}

impl HandlerChainBuilder {
    /// Append a handler
    #[must_use]
    pub fn with_handler(mut self, handler: InstructionHandlerRc) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Append several handlers
    #[must_use]
    pub fn with_handlers<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = InstructionHandlerRc>,
    {
        self.handlers.extend(handlers);
        self
    }

    /// Finish the chain, moving rewriters ahead of detectors
    #[must_use]
    pub fn build(mut self) -> HandlerChain {
        self.handlers.sort_by_key(|handler| handler.kind());
        HandlerChain {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, HandlerKind);

    impl InstructionHandler for Named {
        fn noun_phrase(&self) -> &str {
            self.0
        }

        fn kind(&self) -> HandlerKind {
            self.1
        }
    }

    #[test]
    fn test_rewriters_run_first_in_registration_order() {
        let chain = HandlerChain::builder()
            .with_handler(Arc::new(Named("detect a", HandlerKind::Detector)))
            .with_handler(Arc::new(Named("rewrite a", HandlerKind::Rewriter)))
            .with_handler(Arc::new(Named("detect b", HandlerKind::Detector)))
            .with_handler(Arc::new(Named("rewrite b", HandlerKind::Rewriter)))
            .build();

        let order: Vec<&str> = chain.iter().map(|handler| handler.noun_phrase()).collect();
        assert_eq!(order, vec!["rewrite a", "rewrite b", "detect a", "detect b"]);
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn test_default_hooks_have_no_opinion() {
        let handler = Named("noop", HandlerKind::Detector);
        let cache = crate::metadata::typesystem::AssemblyResolutionCache::new();
        let constructors = Default::default();
        let mut refs = Vec::new();
        let mut ctx = ModuleContext::new("Mod", &mut refs, &cache, &constructors);

        let handled = handler
            .handle_type(&mut ctx, &crate::metadata::typesystem::CilType::string())
            .unwrap();
        assert!(handled.result.is_none());
        assert!(handled.replacement.is_none());
        assert!(HandlerChain::builder().build().is_empty());
    }
}
