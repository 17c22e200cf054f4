use std::fmt;
use std::hash::{Hash, Hasher};

/// A metadata token identifying a definition or reference inside a module.
///
/// Tokens consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table type
/// - The low 24 bits (bits 0-23) indicate the row index within that table
///
/// Tokens are carried through rewriting unchanged; they serve as stable identities for
/// diagnostics and for correlating definitions before and after a walk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Token(pub u32);

impl Token {
    /// Table id of `TypeDef` rows
    pub const TYPE_DEF: u8 = 0x02;
    /// Table id of `Field` rows
    pub const FIELD: u8 = 0x04;
    /// Table id of `MethodDef` rows
    pub const METHOD_DEF: u8 = 0x06;

    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table id and a row index
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_parts() {
        let token = Token::from_parts(Token::METHOD_DEF, 5);
        assert_eq!(token.value(), 0x06000005);
        assert_eq!(token.table(), Token::METHOD_DEF);
        assert_eq!(token.row(), 5);
    }

    #[test]
    fn test_token_row_is_masked() {
        let token = Token::from_parts(Token::TYPE_DEF, 0x0100_0001);
        assert_eq!(token.table(), Token::TYPE_DEF);
        assert_eq!(token.row(), 1);
    }

    #[test]
    fn test_token_null_and_display() {
        assert!(Token::default().is_null());
        assert!(!Token::new(0x02000001).is_null());
        assert_eq!(format!("{}", Token::new(0x02000001)), "0x02000001");
    }
}
