//! The rewriting engine.
//!
//! Rewriting a module means walking its full declaration graph once and letting a chain of
//! handlers classify, and optionally replace, every type reference, method and instruction.
//!
//! # Key Components
//!
//! - [`ModuleGraphWalker`]: Visits every reference site of a module
//! - [`TypeMatchPredicate`]: Structural test for watched types
//! - [`TypeReferenceRewriter`]: Search and replace of type references
//! - [`InstructionHandler`] / [`HandlerChain`]: Pluggable detectors and rewriters
//! - [`ModuleRewriter`]: Runs a chain over modules and reports what it found
//! - [`handlers`]: Ready-made handlers
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use modrewrite::{
//!     metadata::{typesystem::AssemblyResolutionCache, Module},
//!     rewriting::{handlers::TypeFinder, HandlerChain, ModuleRewriter, RewriteResult},
//! };
//!
//! let chain = HandlerChain::builder()
//!     .with_handler(Arc::new(TypeFinder::for_assemblies(
//!         ["0Harmony"],
//!         RewriteResult::DetectedGamePatch,
//!         "Harmony",
//!     )))
//!     .build();
//! let rewriter = ModuleRewriter::new(chain, Arc::new(AssemblyResolutionCache::new()));
//!
//! let mut module = Module::new("Mod", "1.0.0.0");
//! let report = rewriter.rewrite(&mut module).unwrap();
//! assert!(!report.contains(RewriteResult::DetectedGamePatch));
//! ```

mod context;
mod driver;
mod handler;
pub mod handlers;
mod predicate;
mod result;
mod rewriter;
mod walker;

pub use context::{BodyEditor, ModuleContext};
pub use driver::{ModuleRewriter, RewriteReport};
pub use handler::{
    HandlerChain, HandlerChainBuilder, HandlerKind, InstructionHandler, InstructionHandlerRc,
};
pub use predicate::TypeMatchPredicate;
pub use result::{Handled, RewriteResult};
pub use rewriter::{TypeMapRule, TypeReferenceRewriter, TypeRewriteRule};
pub use walker::{walk, ModuleGraphWalker, ModuleVisitor};
