//! Locators, selectors and parameter substitution.
//!
//! A [`Locator`] is what an element declares: either a bare CSS string or a
//! pattern keyed by a selector engine (`{xpath: "//a"}`). Resolving a locator
//! substitutes parameters into it and tags it with its engine, producing a
//! [`Selector`]. A [`SelectorEngine`] turns that selector into the low-level
//! query string the session understands.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::{PageError, PageResult};

/// Placeholder token to substitution value
pub type Parameters = BTreeMap<String, String>;

/// Engine name used for bare string locators
pub const CSS_ENGINE: &str = "css";

/// Engine name for XPath locators
pub const XPATH_ENGINE: &str = "xpath";

/// A declared locator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LocatorRepr", into = "LocatorRepr")]
pub enum Locator {
    /// CSS selector (e.g., "form.checkout button")
    Css(String),
    /// Pattern for a named selector engine
    Engine {
        /// Selector engine name (xpath, named, text, ...)
        engine: String,
        /// Engine-specific pattern
        pattern: String,
    },
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::engine(XPATH_ENGINE, expression)
    }

    /// Create a locator for an arbitrary engine.
    ///
    /// `css` is normalized to [`Locator::Css`].
    #[must_use]
    pub fn engine(engine: impl Into<String>, pattern: impl Into<String>) -> Self {
        let engine = engine.into();
        if engine == CSS_ENGINE {
            Self::Css(pattern.into())
        } else {
            Self::Engine {
                engine,
                pattern: pattern.into(),
            }
        }
    }

    /// Engine this locator is interpreted with
    #[must_use]
    pub fn engine_name(&self) -> &str {
        match self {
            Self::Css(_) => CSS_ENGINE,
            Self::Engine { engine, .. } => engine,
        }
    }

    /// The raw pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Css(pattern) | Self::Engine { pattern, .. } => pattern,
        }
    }

    /// Scope this locator below `base` using CSS descendant composition.
    ///
    /// Only CSS locators can be composed; other engines are returned as declared.
    #[must_use]
    pub fn within(&self, base: &str) -> Self {
        match self {
            Self::Css(selector) => Self::Css(format!("{base} {selector}")),
            Self::Engine { .. } => self.clone(),
        }
    }

    /// Substitute parameters into the pattern, keeping the engine
    #[must_use]
    pub fn substitute(&self, parameters: &Parameters) -> Self {
        match self {
            Self::Css(selector) => Self::Css(substitute(selector, parameters)),
            Self::Engine { engine, pattern } => Self::Engine {
                engine: engine.clone(),
                pattern: substitute(pattern, parameters),
            },
        }
    }

    /// Substitute parameters and tag the result with its engine
    #[must_use]
    pub fn resolve(&self, parameters: &Parameters) -> Selector {
        let resolved = self.substitute(parameters);
        Selector::from_engine(resolved.engine_name(), resolved.pattern())
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Self::css(selector)
    }
}

impl From<String> for Locator {
    fn from(selector: String) -> Self {
        Self::Css(selector)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => f.write_str(selector),
            Self::Engine { engine, pattern } => write!(f, "{engine}={pattern}"),
        }
    }
}

/// Wire form of a locator: a bare string or a single-entry engine map
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Plain(String),
    Keyed(BTreeMap<String, String>),
}

impl TryFrom<LocatorRepr> for Locator {
    type Error = PageError;

    fn try_from(repr: LocatorRepr) -> PageResult<Self> {
        match repr {
            LocatorRepr::Plain(selector) => Ok(Self::Css(selector)),
            LocatorRepr::Keyed(map) => {
                if map.len() != 1 {
                    return Err(PageError::configuration(format!(
                        "an engine-keyed locator needs exactly one engine, got {}",
                        map.len()
                    )));
                }
                let (engine, pattern) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| PageError::configuration("empty engine-keyed locator"))?;
                Ok(Self::engine(engine, pattern))
            }
        }
    }
}

impl From<Locator> for LocatorRepr {
    fn from(locator: Locator) -> Self {
        match locator {
            Locator::Css(selector) => Self::Plain(selector),
            Locator::Engine { engine, pattern } => {
                let mut map = BTreeMap::new();
                let _ = map.insert(engine, pattern);
                Self::Keyed(map)
            }
        }
    }
}

/// Literal token replacement.
///
/// At every position the longest matching key wins and the inserted value is
/// never scanned again. Empty keys are ignored.
#[must_use]
pub fn substitute(template: &str, parameters: &Parameters) -> String {
    let mut keys: Vec<(&str, &str)> = parameters
        .iter()
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    if keys.is_empty() {
        return template.to_string();
    }
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    'scan: while !rest.is_empty() {
        for (key, value) in &keys {
            if let Some(tail) = rest.strip_prefix(key) {
                output.push_str(value);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            output.push(c);
        }
        rest = chars.as_str();
    }
    output
}

/// Kind of a named selector: what the locator names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKind {
    /// Link by id, text, title or image alt
    Link,
    /// Button by id, value, text or title
    Button,
    /// Form field by id, name, label or placeholder
    Field,
    /// Select box by id, name or label
    Select,
    /// Table by id or caption
    Table,
    /// Any element by id
    Id,
}

impl NamedKind {
    /// Name used in queries
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Button => "button",
            Self::Field => "field",
            Self::Select => "select",
            Self::Table => "table",
            Self::Id => "id",
        }
    }
}

impl fmt::Display for NamedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Named selector (link, button, field, ...)
    Named(String),
    /// Text content selector
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// Any other engine, left to a custom [`SelectorEngine`]
    Custom {
        /// Engine name
        engine: String,
        /// Engine-specific pattern
        pattern: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a named selector such as `link:Sign in`
    #[must_use]
    pub fn named(kind: NamedKind, locator: &str) -> Self {
        Self::Named(format!("{kind}:{locator}"))
    }

    /// Build a selector from an engine name and a pattern
    #[must_use]
    pub fn from_engine(engine: &str, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        match engine {
            CSS_ENGINE => Self::Css(pattern),
            XPATH_ENGINE => Self::XPath(pattern),
            "named" => Self::Named(pattern),
            "text" => Self::Text(pattern),
            "test_id" => Self::TestId(pattern),
            other => Self::Custom {
                engine: other.to_string(),
                pattern,
            },
        }
    }

    /// Engine name of this selector
    #[must_use]
    pub fn engine(&self) -> &str {
        match self {
            Self::Css(_) => CSS_ENGINE,
            Self::XPath(_) => XPATH_ENGINE,
            Self::Named(_) => "named",
            Self::Text(_) => "text",
            Self::TestId(_) => "test_id",
            Self::Custom { engine, .. } => engine,
        }
    }

    /// Pattern of this selector
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Css(p)
            | Self::XPath(p)
            | Self::Named(p)
            | Self::Text(p)
            | Self::TestId(p)
            | Self::Custom { pattern: p, .. } => p,
        }
    }
}

/// Translates selectors into the session's low-level query language
pub trait SelectorEngine: fmt::Debug {
    /// Convert a selector into a query string
    fn to_query(&self, selector: &Selector) -> PageResult<String>;
}

/// Engine-prefixed queries (`css=...`, `xpath=...`), as browser drivers take them
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelectorEngine;

impl SelectorEngine for DefaultSelectorEngine {
    fn to_query(&self, selector: &Selector) -> PageResult<String> {
        match selector {
            Selector::Css(s) => Ok(format!("css={s}")),
            Selector::XPath(s) => Ok(format!("xpath={s}")),
            Selector::Named(s) => Ok(format!("named={s}")),
            Selector::Text(t) => Ok(format!("text={t}")),
            Selector::TestId(id) => Ok(format!("css=[data-testid={id:?}]")),
            Selector::Custom { engine, .. } => Err(PageError::configuration(format!(
                "selector engine \"{engine}\" is not registered"
            ))),
        }
    }
}
