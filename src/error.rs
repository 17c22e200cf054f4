use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Classification outcomes of a rewrite (an incompatible reference, a detected patch library,
/// ...) are *not* errors; they are reported as [`crate::rewriting::RewriteResult`] flags. This
/// enum only covers conditions where a walk or a configuration step cannot continue.
///
/// # Error Categories
///
/// ## Rewriting Errors
/// - [`Error::AttributeConstructorNotFound`] - A rewritten custom attribute has no compatible
///   constructor on its (possibly new) attribute type. This signals a misconfigured rewrite
///   rule and aborts the walk of the affected module.
///
/// ## Resolution Cache Errors
/// - [`Error::CacheSealed`] - A module was registered after the cache was sealed
/// - [`Error::DuplicateModule`] - A module name was registered twice
///
/// ## Input Errors
/// - [`Error::Malformed`] - Invalid configuration or model input
/// - [`Error::Error`] - Miscellaneous failures
///
/// # Examples
///
/// ```rust
/// use modrewrite::{Error, metadata::typesystem::AssemblyResolutionCache};
/// use modrewrite::metadata::Module;
/// use std::sync::Arc;
///
/// let cache = AssemblyResolutionCache::new();
/// cache.seal();
///
/// match cache.register(Arc::new(Module::new("Game", "1.0.0.0"))) {
///     Err(Error::CacheSealed(name)) => eprintln!("too late to register {name}"),
///     Err(e) => eprintln!("Other error: {e}"),
///     Ok(()) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A rewritten custom attribute has no equivalent constructor.
    ///
    /// Raised when the attribute type or one of its constructor argument types was replaced,
    /// but no constructor on the resulting attribute type accepts the original argument list.
    /// The attribute list of the affected member is left untouched.
    ///
    /// # Fields
    ///
    /// * `attribute` - Full name of the original attribute type
    /// * `replacement` - Full name of the attribute type a constructor was searched on
    #[error("Can't rewrite attribute type '{attribute}' to '{replacement}', no equivalent constructor found")]
    AttributeConstructorNotFound {
        /// The original attribute type
        attribute: String,
        /// The attribute type which was searched for a matching constructor
        replacement: String,
    },

    /// A module was registered with the resolution cache after it was sealed.
    ///
    /// The cache must be fully populated before the first walk begins.
    #[error("The resolution cache is sealed, can't register module '{0}'")]
    CacheSealed(String),

    /// A module with the same name was already registered with the resolution cache.
    #[error("Module '{0}' is already registered")]
    DuplicateModule(String),

    /// The input is damaged or inconsistent.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
