//! pagekit: Page Objects for Browser Acceptance Tests
//!
//! Describe pages and reusable page fragments declaratively, name their
//! regions with CSS/XPath locators, and get navigation, verification and
//! interaction helpers on top of any browser-automation session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     pagekit Architecture                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐            │
//! │  │ Element    │   │ Locator    │   │ Session    │            │
//! │  │ definition │──►│ registry   │──►│ (driver)   │            │
//! │  └────────────┘   └────────────┘   └────────────┘            │
//! │        │                                 ▲                   │
//! │        ▼                                 │                   │
//! │  ┌────────────┐   ┌────────────┐         │                   │
//! │  │ Page       │──►│ Router     │─────────┘                   │
//! │  │ object     │   │ (match/gen)│                             │
//! │  └────────────┘   └────────────┘                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use pagekit::prelude::*;
//!
//! let session = Rc::new(MockSession::new());
//! let router = Rc::new(PatternRouter::new().route("checkout", "/checkout/{orderId}"));
//! let config = Rc::new(PageConfig::new().with_base_url("http://shop.test"));
//!
//! let page = RoutePage::new(session, router, config, "checkout")?;
//! page.open(&pagekit::params! { "orderId" => "5" })?;
//! assert!(page.is_open(&pagekit::params! { "orderId" => "5" }));
//! # Ok::<(), pagekit::PageError>(())
//! ```

#![warn(missing_docs)]

mod config;
mod element;
mod locator;
mod node;
mod page_object;
mod registry;
mod result;
mod routing;
mod session;

pub use config::{FrontControllers, PageConfig, DEFAULT_FRONT_CONTROLLERS, DEFAULT_LOCALE};
pub use element::{Element, ElementDefinition, ElementSpec, DEFAULT_LOCATOR};
pub use locator::{
    substitute, DefaultSelectorEngine, Locator, NamedKind, Parameters, Selector, SelectorEngine,
    CSS_ENGINE, XPATH_ENGINE,
};
pub use node::{KeyModifier, NodeAction, NodeElement, NodeOperations, NodeQuery};
pub use page_object::{check_route, PageObject, RoutePage, UrlPage};
pub use registry::LocatorRegistry;
pub use result::{PageError, PageResult, RouteMismatch};
pub use routing::{
    path_of, strip_default_parameters, MatchedRoute, PatternRouter, RouteDefinition, RoutePattern,
    Router, ROUTE_KEY,
};
pub use session::{Document, MockNode, MockSession, NodeHandle, Session};

/// Derive [`ElementDefinition`] from `#[element(...)]` attributes
#[cfg(feature = "derive")]
pub use pagekit_derive::Element;

/// Build a [`Parameters`] map from `key => value` pairs
///
/// ```
/// let params = pagekit::params! { "orderId" => "5", "_locale" => "fr_FR" };
/// assert_eq!(params.get("orderId").map(String::as_str), Some("5"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Parameters::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {{
        let mut parameters = $crate::Parameters::new();
        $(
            let _ = parameters.insert(
                ::std::string::ToString::to_string(&$key),
                ::std::string::ToString::to_string(&$value),
            );
        )+
        parameters
    }};
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::element::*;
    pub use super::locator::*;
    pub use super::node::*;
    pub use super::page_object::*;
    pub use super::registry::*;
    pub use super::result::*;
    pub use super::routing::*;
    pub use super::session::*;
    pub use crate::params;
}
