//! The in-memory module model the rewriting engine operates on.
//!
//! # Key Components
//!
//! - [`module`]: [`Module`] and [`TypeDef`], the declaration side of the graph
//! - [`method`]: Method definitions, references and bodies
//! - [`field`]: Field definitions and references
//! - [`customattributes`]: Applied custom attributes and their argument values
//! - [`typesystem`]: Type references, generic parameters, structural matching and
//!   cross-module resolution
//! - [`token`]: Metadata tokens

pub mod customattributes;
pub mod field;
pub mod method;
pub mod module;
/// Metadata tokens identifying definitions
pub mod token;
pub mod typesystem;

pub use module::{Module, TypeDef};
