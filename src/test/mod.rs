//! Shared factories for unit tests.


pub use builders::*;

use crate::{
    metadata::{
        token::Token,
        typesystem::{CilType, CilTypeRc, TypeScope},
    },
    rewriting::ModuleContext,
    Result,
};

/// Token of the `row`th type definition
pub fn type_token(row: u32) -> Token {
    Token::from_parts(Token::TYPE_DEF, row)
}

/// Token of the `row`th method definition
pub fn method_token(row: u32) -> Token {
    Token::from_parts(Token::METHOD_DEF, row)
}

/// Token of the `row`th field definition
pub fn field_token(row: u32) -> Token {
    Token::from_parts(Token::FIELD, row)
}

/// A type callback replacing the named type `from` with `namespace.name`, defined in the
/// assembly called `namespace`.
pub fn map_type(
    from: &'static str,
    namespace: &'static str,
    name: &'static str,
) -> impl Fn(&mut ModuleContext<'_>, &CilTypeRc) -> Result<Option<CilTypeRc>> {
    move |_: &mut ModuleContext<'_>, ty: &CilTypeRc| match ty.as_ref() {
        CilType::Named(_) if ty.full_name() == from => Ok(Some(CilType::named(
            namespace,
            name,
            TypeScope::assembly(namespace),
        ))),
        _ => Ok(None),
    }
}
