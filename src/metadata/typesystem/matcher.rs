//! Placeholder-tolerant structural comparison of type names.
//!
//! Member references taken from an open generic signature name their generic parameters by
//! position (`!0`, `!!1`) instead of by a concrete type. When such a reference is compared
//! against a closed type (or a definition that spells its parameters by name) plain string
//! equality fails even though the two denote the same shape. This module answers the
//! question "could the placeholder form be an instantiation of the concrete form?".
//!
//! Both names are tokenized into `(symbol, depth)` pairs:
//!
//! - `<` emits the pending symbol, then increases the depth
//! - `>` emits the pending symbol, then decreases the depth
//! - `,` emits the pending symbol without changing the depth
//!
//! The token lists are compared position by position. Depths must agree, literal symbols
//! must be equal, and a placeholder binds to the concrete symbol at its first occurrence and
//! must see the same symbol at every later occurrence.
//!
//! ```rust
//! use modrewrite::metadata::typesystem::is_same_type_name;
//!
//! assert!(is_same_type_name("IDictionary`2<!0,!1>", "IDictionary`2<System.String,Item>"));
//! assert!(!is_same_type_name("IDictionary`2<!0,!0>", "IDictionary`2<System.String,Item>"));
//! assert!(is_same_type_name("IDictionary`2<!0,!0>", "IDictionary`2<System.String,System.String>"));
//! ```

use std::collections::HashMap;

use crate::metadata::typesystem::CilType;

/// One symbol of a tokenized type name and its generic nesting depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNameToken {
    /// The type name fragment
    pub symbol: String,
    /// Generic nesting depth, 0 for the outermost type
    pub depth: usize,
}

/// Split a type name into its symbols and their nesting depths.
#[must_use]
pub fn tokenize(name: &str) -> Vec<TypeNameToken> {
    let mut tokens = Vec::new();
    let mut pending = String::new();
    let mut depth = 0_usize;

    let mut emit = |pending: &mut String, depth: usize| {
        let symbol = pending.trim();
        if !symbol.is_empty() {
            tokens.push(TypeNameToken {
                symbol: symbol.to_string(),
                depth,
            });
        }
        pending.clear();
    };

    for ch in name.chars() {
        match ch {
            '<' => {
                emit(&mut pending, depth);
                depth += 1;
            }
            '>' => {
                emit(&mut pending, depth);
                depth = depth.saturating_sub(1);
            }
            ',' => emit(&mut pending, depth),
            _ => pending.push(ch),
        }
    }
    emit(&mut pending, depth);

    tokens
}

/// Returns true if `symbol` is a positional generic placeholder (`!0`, `!!12`)
#[must_use]
pub fn is_placeholder(symbol: &str) -> bool {
    let digits = symbol
        .strip_prefix("!!")
        .or_else(|| symbol.strip_prefix('!'));
    matches!(digits, Some(digits)
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// A tokenized type name which may contain placeholders.
///
/// An open generic signature is captured once and can then be compared against any number
/// of concrete names; every comparison starts with fresh placeholder bindings.
#[derive(Debug, Clone)]
pub struct TypeNamePattern {
    tokens: Vec<TypeNameToken>,
}

impl TypeNamePattern {
    /// Tokenize `name` into a reusable pattern
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            tokens: tokenize(name),
        }
    }

    /// Returns true if the pattern contains at least one placeholder
    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.tokens.iter().any(|token| is_placeholder(&token.symbol))
    }

    /// Returns true if `concrete` could be an instantiation of this pattern.
    ///
    /// Token lists of different lengths never match.
    #[must_use]
    pub fn matches(&self, concrete: &str) -> bool {
        let concrete = tokenize(concrete);
        if concrete.len() != self.tokens.len() {
            return false;
        }

        let mut bindings: HashMap<&str, &str> = HashMap::new();
        for (expected, actual) in self.tokens.iter().zip(concrete.iter()) {
            if expected.depth != actual.depth {
                return false;
            }

            if is_placeholder(&expected.symbol) {
                match bindings.get(expected.symbol.as_str()) {
                    Some(bound) if *bound != actual.symbol => return false,
                    Some(_) => {}
                    None => {
                        bindings.insert(&expected.symbol, &actual.symbol);
                    }
                }
            } else if expected.symbol != actual.symbol {
                return false;
            }
        }

        true
    }
}

/// Returns true if the type name `placeholder_side` (which may contain `!n` placeholders)
/// could be an instantiation of the type name `concrete`.
#[must_use]
pub fn is_same_type_name(placeholder_side: &str, concrete: &str) -> bool {
    placeholder_side == concrete || TypeNamePattern::new(placeholder_side).matches(concrete)
}

/// Returns true if the type `reference` denotes the same type as `definition`.
///
/// Scopes are ignored; the comparison is on full names, with `reference` allowed to use
/// positional placeholders for generic parameters the definition spells concretely or by
/// name.
#[must_use]
pub fn is_same_type(reference: &CilType, definition: &CilType) -> bool {
    is_same_type_name(&reference.full_name(), &definition.full_name())
}
