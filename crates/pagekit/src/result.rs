//! Result and error types for pagekit.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Result type for pagekit operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur while resolving elements or verifying pages
#[derive(Debug, Error)]
pub enum PageError {
    /// Malformed configuration or constructor arguments
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// An element name was requested that is not declared on the element
    #[error(
        "Could not find a defined element with name \"{name}\". The defined ones are: {}.",
        known.join(", ")
    )]
    UndeclaredElement {
        /// Requested name
        name: String,
        /// Names that are declared
        known: Vec<String>,
    },

    /// The resolved query matched no node in the current document
    #[error(
        "Element named \"{name}\" with parameters {} not found (query: {query})",
        format_parameters(parameters)
    )]
    ElementNotFound {
        /// Requested name
        name: String,
        /// Substitution parameters used for resolution
        parameters: BTreeMap<String, String>,
        /// Low-level query that matched nothing
        query: String,
    },

    /// The browser is not on the expected page
    #[error("Unexpected page: {message}")]
    UnexpectedPage {
        /// Error message
        message: String,
    },

    /// The current URL resolves to a different route than expected
    #[error("{0}")]
    UnexpectedRoute(RouteMismatch),

    /// The router could not match a path to any route
    #[error("No route found for path \"{path}\"")]
    RouteNotFound {
        /// Normalized path
        path: String,
    },

    /// The router cannot generate a URL for a route
    #[error("Unable to generate a URL for route \"{route}\": {message}")]
    UrlGeneration {
        /// Route name
        route: String,
        /// Error message
        message: String,
    },

    /// Browser session failure
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PageError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create an unexpected page error
    #[must_use]
    pub fn unexpected_page(message: impl Into<String>) -> Self {
        Self::UnexpectedPage {
            message: message.into(),
        }
    }

    /// Whether this error means "the browser is somewhere else".
    ///
    /// These are the only failures `try_to_open` swallows.
    #[must_use]
    pub const fn is_unexpected_location(&self) -> bool {
        matches!(self, Self::UnexpectedPage { .. } | Self::UnexpectedRoute(_))
    }
}

/// Details of a failed route verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMismatch {
    /// The matched route has a different name
    Name {
        /// Expected route name
        expected: String,
        /// Route name that was matched
        found: String,
        /// URL the browser is on
        url: String,
    },
    /// A required route parameter is missing or different
    Parameter {
        /// Parameter name
        key: String,
        /// Expected value
        expected: String,
        /// Value on the matched route, if any
        found: Option<String>,
    },
}

impl fmt::Display for RouteMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name {
                expected,
                found,
                url,
            } => write!(
                f,
                "Matched route '{found}' does not match the expected route '{expected}' for URL '{url}'"
            ),
            Self::Parameter {
                key,
                expected,
                found,
            } => write!(
                f,
                "Matched route does not match the expected parameter '{key}'='{expected}' ({} found)",
                found.as_deref().unwrap_or("null")
            ),
        }
    }
}

fn format_parameters(parameters: &BTreeMap<String, String>) -> String {
    if parameters.is_empty() {
        return "(none)".to_string();
    }
    parameters
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
