//! Ready-made handlers.
//!
//! # Key Components
//!
//! - [`TypeFinder`] / [`MemberFinder`]: Detect references to watched types and members
//! - [`ReferenceToMissingMemberFinder`] / [`ReferenceToMemberWithUnexpectedTypeFinder`]:
//!   Validate member references against the referenced modules
//! - [`FieldReplaceRewriter`], [`MethodParentRewriter`], [`FieldToPropertyRewriter`]:
//!   Repair references to members which moved or changed kind

mod finders;
mod members;
mod rewriters;

pub use finders::{MemberFinder, MemberKind, TypeFinder};
pub use members::{ReferenceToMemberWithUnexpectedTypeFinder, ReferenceToMissingMemberFinder};
pub use rewriters::{FieldReplaceRewriter, FieldToPropertyRewriter, MethodParentRewriter};
