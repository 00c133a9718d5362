//! Page Object Model Support
//!
//! A page object is an element object (base locator `body` by default) that
//! also knows where it lives. [`PageObject`] provides `open`, `try_to_open`,
//! `verify` and `is_open` on top of two required methods: the session and
//! the URL for a set of parameters.
//!
//! Two implementations are provided:
//!
//! - [`UrlPage`]: a path template such as `/products/{slug}` below the base URL
//! - [`RoutePage`]: a named route, generated and matched by a [`Router`]

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::config::{FrontControllers, PageConfig};
use crate::element::{Element, ElementDefinition, ElementSpec};
use crate::locator::Parameters;
use crate::result::{PageError, PageResult, RouteMismatch};
use crate::routing::{path_of, strip_default_parameters, MatchedRoute, RoutePattern, Router};
use crate::session::Session;

/// Route parameter copied from the current route before URL comparison
const LOCALE_PARAMETER: &str = "_locale";

/// Trait for page objects representing one logical page.
///
/// # Example
///
/// ```ignore
/// let checkout = RoutePage::new(session, router, config, "checkout")?;
/// checkout.open(&params! { "orderId" => "5" })?;
/// checkout.verify_route(&params! { "orderId" => "5" })?;
/// ```
pub trait PageObject {
    /// Session the page is driven through
    fn session(&self) -> &dyn Session;

    /// Absolute URL of the page for these parameters
    fn url(&self, parameters: &Parameters) -> PageResult<String>;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Visit the page and verify it opened
    fn open(&self, parameters: &Parameters) -> PageResult<()> {
        let url = self.url(parameters)?;
        tracing::debug!(page = self.page_name(), %url, "opening page");
        self.session().visit(&url)?;
        self.verify(parameters)
    }

    /// Visit the page; landing somewhere else is not an error
    fn try_to_open(&self, parameters: &Parameters) -> PageResult<()> {
        match self.open(parameters) {
            Err(e) if e.is_unexpected_location() => {
                tracing::debug!(page = self.page_name(), error = %e, "page did not open");
                Ok(())
            }
            other => other,
        }
    }

    /// Check the browser is on this page
    fn verify(&self, parameters: &Parameters) -> PageResult<()> {
        self.verify_status_code()?;
        self.verify_url(parameters)
    }

    /// Whether the browser is on this page
    fn is_open(&self, parameters: &Parameters) -> bool {
        self.verify(parameters).is_ok()
    }

    /// Fail on a non-2xx response; sessions without status codes pass
    fn verify_status_code(&self) -> PageResult<()> {
        let Some(status) = self.session().status_code()? else {
            return Ok(());
        };
        if (200..=299).contains(&status) {
            return Ok(());
        }
        let current = self.session().current_url()?;
        Err(PageError::unexpected_page(format!(
            "Could not open the page: \"{current}\". Received an error status code: {status}"
        )))
    }

    /// Compare the current URL with the page URL
    fn verify_url(&self, parameters: &Parameters) -> PageResult<()> {
        let expected = self.url(parameters)?;
        let current = self.session().current_url()?;
        if current == expected {
            Ok(())
        } else {
            Err(PageError::unexpected_page(format!(
                "Expected to be on \"{expected}\" but found \"{current}\" instead"
            )))
        }
    }
}

/// Page at a fixed path template below the base URL
#[derive(Debug)]
pub struct UrlPage {
    element: Element,
    config: Rc<PageConfig>,
    path: RoutePattern,
}

impl UrlPage {
    /// Create a page for a path template such as `/products/{slug}`
    pub fn new(session: Rc<dyn Session>, config: Rc<PageConfig>, path: &str) -> PageResult<Self> {
        config.validate()?;
        Ok(Self {
            element: Element::new(session, &ElementSpec::default()),
            config,
            path: RoutePattern::new(path),
        })
    }

    /// Use an element definition for the page body
    #[must_use]
    pub fn with_definition<D: ElementDefinition + ?Sized>(mut self, definition: &D) -> Self {
        self.element = self.element.element_object(definition);
        self
    }

    /// The path template
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.pattern()
    }
}

impl PageObject for UrlPage {
    fn session(&self) -> &dyn Session {
        &**self.element.session()
    }

    fn url(&self, parameters: &Parameters) -> PageResult<String> {
        let (path, extra) = self.path.generate(parameters)?;
        let path = if extra.is_empty() {
            path
        } else {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &extra {
                let _ = query.append_pair(key, value);
            }
            format!("{path}?{}", query.finish())
        };
        self.config.make_path_absolute(&path)
    }
}

impl Deref for UrlPage {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

impl DerefMut for UrlPage {
    fn deref_mut(&mut self) -> &mut Element {
        &mut self.element
    }
}

/// Page identified by a named route
#[derive(Debug)]
pub struct RoutePage {
    element: Element,
    router: Rc<dyn Router>,
    config: Rc<PageConfig>,
    front_controllers: FrontControllers,
    route_name: String,
}

impl RoutePage {
    /// Create a page for a route
    pub fn new(
        session: Rc<dyn Session>,
        router: Rc<dyn Router>,
        config: Rc<PageConfig>,
        route_name: impl Into<String>,
    ) -> PageResult<Self> {
        config.validate()?;
        let route_name = route_name.into();
        if route_name.is_empty() {
            return Err(PageError::configuration("route name must not be empty"));
        }
        Ok(Self {
            element: Element::new(session, &ElementSpec::default()),
            front_controllers: config.front_controller_matcher()?,
            router,
            config,
            route_name,
        })
    }

    /// Use an element definition for the page body
    #[must_use]
    pub fn with_definition<D: ElementDefinition + ?Sized>(mut self, definition: &D) -> Self {
        self.element = self.element.element_object(definition);
        self
    }

    /// Route this page lives at
    #[must_use]
    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    /// Page configuration
    #[must_use]
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Route the current URL resolves to
    pub fn current_route_match(&self) -> PageResult<MatchedRoute> {
        let url = self.session().current_url()?;
        let path = self.front_controllers.normalize(&path_of(&url)?);
        let matched = self.router.match_path(&path)?;
        tracing::debug!(%url, %path, route = %matched.name, "matched current route");
        Ok(matched)
    }

    /// Check the current URL resolves to this route with the required parameters
    pub fn verify_route(&self, required: &Parameters) -> PageResult<()> {
        let matched = self.current_route_match()?;
        let url = self.session().current_url()?;
        check_route(&matched, &self.route_name, required, &url)
    }

    /// Generate the page URL with default parameters merged in
    pub fn build_url(&self, parameters: &Parameters) -> PageResult<String> {
        let mut merged = self.config.default_parameters.clone();
        merged.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));

        let generated = self.router.generate(&self.route_name, &merged)?;
        let path = strip_default_parameters(&generated, &self.config.default_parameters);
        self.config.make_path_absolute(&path)
    }
}

/// Compare a matched route against an expected name and parameters
pub fn check_route(
    matched: &MatchedRoute,
    expected_name: &str,
    required: &Parameters,
    url: &str,
) -> PageResult<()> {
    if matched.name != expected_name {
        return Err(PageError::UnexpectedRoute(RouteMismatch::Name {
            expected: expected_name.to_string(),
            found: matched.name.clone(),
            url: url.to_string(),
        }));
    }
    for (key, expected) in required {
        let found = matched.get(key);
        if found != Some(expected.as_str()) {
            return Err(PageError::UnexpectedRoute(RouteMismatch::Parameter {
                key: key.clone(),
                expected: expected.clone(),
                found: found.map(str::to_string),
            }));
        }
    }
    Ok(())
}

impl PageObject for RoutePage {
    fn session(&self) -> &dyn Session {
        &**self.element.session()
    }

    fn url(&self, parameters: &Parameters) -> PageResult<String> {
        self.build_url(parameters)
    }

    fn page_name(&self) -> &str {
        &self.route_name
    }

    fn verify_url(&self, parameters: &Parameters) -> PageResult<()> {
        let mut parameters = parameters.clone();
        match self.current_route_match() {
            Ok(matched) => {
                if let Some(locale) = matched.get(LOCALE_PARAMETER) {
                    let _ = parameters
                        .entry(LOCALE_PARAMETER.to_string())
                        .or_insert_with(|| locale.to_string());
                }
            }
            // An unrouted URL cannot be this page; the comparison below reports it
            Err(PageError::RouteNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let expected = self.url(&parameters)?;
        let current = self.session().current_url()?;
        if current == expected {
            Ok(())
        } else {
            Err(PageError::unexpected_page(format!(
                "Expected to be on \"{expected}\" but found \"{current}\" instead"
            )))
        }
    }
}

impl Deref for RoutePage {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

impl DerefMut for RoutePage {
    fn deref_mut(&mut self) -> &mut Element {
        &mut self.element
    }
}
