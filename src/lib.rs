// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0


#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # modrewrite
//!
//! A rewriting engine for compiled extension modules loaded by a host application.
//!
//! Extension modules are compiled against one build of the host. When the host moves types
//! between assemblies, turns fields into properties, or ships per-platform builds of its
//! frameworks, previously compiled modules break. `modrewrite` walks every reference site
//! of a loaded module, repairs the references it knows how to repair, and reports the
//! constructs the host wants to know about (runtime patching, dynamic code, members which
//! don't exist).
//!
//! ## Architecture
//!
//! - [`metadata`]: In-memory model of a module, its types, members and signatures
//! - [`assembly`]: Instructions and the opcode table
//! - [`rewriting`]: The module walker, type rewriters, handler chain and driver
//! - [`config`]: Declarative policy which builds a ready handler chain
//! - [`prelude`]: Glob import of the commonly used types
//!
//! Module loading and serialization are not part of this crate: a loader produces a
//! [`metadata::Module`], the engine mutates it in place, and the host writes it back.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use modrewrite::prelude::*;
//!
//! let chain = RewriteConfig::new()
//!     .with_platform(Platform::Linux)
//!     .with_type_mapping(
//!         Platform::Linux,
//!         TypeMapping::moved("Microsoft.Xna.Framework.Vector2", "MonoGame.Framework"),
//!     )
//!     .build_chain()?;
//!
//! let rewriter = ModuleRewriter::new(chain, Arc::new(AssemblyResolutionCache::new()));
//! let mut module = Module::new("SampleMod", "1.0.0.0");
//!
//! let report = rewriter.rewrite(&mut module)?;
//! assert!(report.is_compatible());
//! # Ok::<(), modrewrite::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! Handlers are stateless and the [`metadata::typesystem::AssemblyResolutionCache`] is
//! sealed before the first rewrite, so one [`rewriting::ModuleRewriter`] can process
//! independent modules in parallel through [`rewriting::ModuleRewriter::rewrite_all`].
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `debug` for per-module summaries, `trace` for
//! unresolved references, `warn` for modules which failed to rewrite.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use modrewrite::prelude::*;
///
/// let module = Module::new("SampleMod", "1.0.0.0").with_assembly_ref("Stardew Valley");
/// assert!(module.references_assembly("Stardew Valley"));
/// ```
pub mod prelude;

/// Instructions and opcodes.
///
/// Method bodies are modelled as a list of decoded [`assembly::Instruction`]s whose
/// operands reference types, fields and methods directly instead of through tokens.
pub mod assembly;

/// Rewrite policy: platforms, type mappings, member rewrites and detectors.
pub mod config;

/// The in-memory model of modules and their type system.
pub mod metadata;

/// Walking, rewriting and classifying modules.
pub mod rewriting;

/// `modrewrite` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `modrewrite` Error type
///
/// Errors abort the rewrite of one module. Findings about a module are not errors; they are
/// reported as [`rewriting::RewriteResult`] flags.
///
/// # Examples
///
/// ```rust
/// use modrewrite::{metadata::typesystem::AssemblyResolutionCache, metadata::Module, Error};
/// use std::sync::Arc;
///
/// let cache = AssemblyResolutionCache::new();
/// cache.register(Arc::new(Module::new("Game", "1.0.0.0")))?;
/// match cache.register(Arc::new(Module::new("Game", "1.0.0.0"))) {
///     Err(Error::DuplicateModule(name)) => assert_eq!(name, "Game"),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), Error>(())
/// ```
pub use error::Error;
