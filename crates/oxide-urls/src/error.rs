//! Error types for URL maps.

use thiserror::Error;

use crate::params::Params;

/// Setup-time errors raised while adding and binding rules.
///
/// These are always raised from [`Map::add`](crate::Map::add), never
/// deferred to match or build time.
#[derive(Debug, Error)]
pub enum MapError {
    /// The template does not start with `/`.
    #[error("url template must start with a leading slash: {template:?}")]
    MissingLeadingSlash {
        /// The offending template.
        template: String,
    },

    /// The template contains an unbalanced or malformed variable token.
    #[error("malformed url template: {template:?}")]
    MalformedTemplate {
        /// The offending template.
        template: String,
    },

    /// A variable name appears more than once in one template.
    #[error("variable name {name:?} used twice")]
    DuplicateVariable {
        /// The repeated variable name.
        name: String,
    },

    /// A variable references a converter that is not registered.
    #[error("unknown converter {name:?}")]
    UnknownConverter {
        /// The unregistered converter name.
        name: String,
    },

    /// A converter argument list could not be applied.
    #[error("invalid arguments for converter {converter:?}: {reason}")]
    InvalidConverterArgs {
        /// The converter the arguments were meant for.
        converter: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// The rule was already bound to a map.
    #[error("rule {template:?} is already bound to a map")]
    AlreadyBound {
        /// The rule's template.
        template: String,
    },

    /// The assembled pattern failed to compile.
    #[error("failed to compile pattern for {template:?}")]
    InvalidPattern {
        /// The rule's template.
        template: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

impl MapError {
    /// Shorthand for [`MapError::InvalidConverterArgs`].
    pub(crate) fn invalid_args(converter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConverterArgs {
            converter: converter.to_string(),
            reason: reason.into(),
        }
    }
}

/// Matching errors surfaced by [`MapAdapter::match_path`](crate::MapAdapter::match_path).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// No rule matched the requested path and method.
    #[error("no rule matched the requested path")]
    NotFound,

    /// The path matched a folder-like rule without its trailing slash;
    /// the client must be redirected to the carried absolute URL.
    #[error("redirect required to {0}")]
    RequestRedirect(String),
}

/// No rule under the endpoint accepted the supplied values and method.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("could not build url for endpoint {endpoint:?} with values {values:?}")]
pub struct BuildError {
    /// The endpoint a URL was requested for.
    pub endpoint: String,
    /// The values that no rule accepted.
    pub values: Params,
}

/// A segment value failed a converter's type or range constraint.
///
/// Raised by [`Converter`](crate::Converter) implementations; the map
/// swallows it during matching and building, demoting the failure to
/// "try the next rule". It never reaches callers of the public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid segment value: {reason}")]
pub struct ValidationError {
    /// Why the value was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Creates a validation error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result type alias for map setup operations.
pub type Result<T> = std::result::Result<T, MapError>;
