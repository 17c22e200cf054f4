//! Classification results produced by handlers.

use strum::{Display, EnumCount, EnumIter, EnumString};

/// The outcome of evaluating a handler against one site of a module.
///
/// Results are data, not errors: a module collects every non-`None` result it triggers into
/// its flag set, and the caller decides whether to load, warn or block.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
pub enum RewriteResult {
    /// The handler has no opinion about the site
    #[default]
    None,
    /// The site was rewritten for compatibility
    Rewritten,
    /// The site references something which doesn't exist or doesn't match
    NotCompatible,
    /// The module patches the host through a patch library
    DetectedGamePatch,
    /// The module changes the save serializer
    DetectedSaveSerializerChange,
    /// The module uses dynamic code
    DetectedDynamicUsage,
    /// The module subscribes to a hook the host doesn't validate
    DetectedUnvalidatedHook,
}

impl RewriteResult {
    /// Returns true for `None`
    #[must_use]
    pub fn is_none(self) -> bool {
        self == RewriteResult::None
    }
}

/// A handler's verdict for one site, with an optional replacement.
#[derive(Debug, Clone)]
pub struct Handled<T> {
    /// The classification
    pub result: RewriteResult,
    /// The value to swap into the site
    pub replacement: Option<T>,
    /// A phrase describing this specific finding, overriding the handler's noun phrase
    pub phrase: Option<String>,
}

impl<T> Handled<T> {
    /// No opinion
    #[must_use]
    pub fn none() -> Self {
        Handled {
            result: RewriteResult::None,
            replacement: None,
            phrase: None,
        }
    }

    /// A classification without replacement
    #[must_use]
    pub fn detected(result: RewriteResult) -> Self {
        Handled {
            result,
            replacement: None,
            phrase: None,
        }
    }

    /// A rewrite to `replacement`
    #[must_use]
    pub fn rewritten(replacement: T) -> Self {
        Handled {
            result: RewriteResult::Rewritten,
            replacement: Some(replacement),
            phrase: None,
        }
    }

    /// Attach a specific phrase
    #[must_use]
    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrase = Some(phrase.into());
        self
    }
}

impl<T> Default for Handled<T> {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_result_names_round_trip() {
        for result in RewriteResult::iter() {
            assert_eq!(RewriteResult::from_str(&result.to_string()).unwrap(), result);
        }
        assert_eq!(RewriteResult::COUNT, 7);
    }

    #[test]
    fn test_handled_constructors() {
        let none: Handled<u32> = Handled::none();
        assert!(none.result.is_none());
        assert!(none.replacement.is_none());

        let rewritten = Handled::rewritten(5_u32).with_phrase("five");
        assert_eq!(rewritten.result, RewriteResult::Rewritten);
        assert_eq!(rewritten.replacement, Some(5));
        assert_eq!(rewritten.phrase.as_deref(), Some("five"));
    }
}
