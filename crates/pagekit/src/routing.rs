//! Router contract and route matching.
//!
//! Route pages identify themselves by route name. The [`Router`] trait is
//! the web framework's router seen from the test side: it matches a path to
//! a named route and generates paths from route names. [`PatternRouter`] is
//! a small implementation over `/checkout/{orderId}` style patterns.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use crate::locator::Parameters;
use crate::result::{PageError, PageResult};

/// Key of the route name in a flattened route mapping
pub const ROUTE_KEY: &str = "_route";

/// Characters escaped in a generated path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Result of matching a path against the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRoute {
    /// Route name
    #[serde(rename = "_route")]
    pub name: String,
    /// Route parameters (placeholders and defaults)
    #[serde(flatten)]
    pub parameters: Parameters,
}

impl MatchedRoute {
    /// Create a matched route
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Value of a route parameter; `_route` yields the name
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == ROUTE_KEY {
            return Some(&self.name);
        }
        self.parameters.get(key).map(String::as_str)
    }
}

/// Framework router
pub trait Router: fmt::Debug {
    /// Match a path (no scheme, host or query) to a route
    fn match_path(&self, path: &str) -> PageResult<MatchedRoute>;

    /// Generate a path, with query string, for a route
    fn generate(&self, route: &str, parameters: &Parameters) -> PageResult<String>;
}

/// Path component of a URL; relative URLs are accepted
pub fn path_of(url: &str) -> PageResult<String> {
    match Url::parse(url) {
        Ok(parsed) => Ok(parsed.path().to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://localhost/")?;
            Ok(base.join(url)?.path().to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove `key=value` pairs equal to a default from the query string.
///
/// Pairs are compared decoded, so `a+b` and `a%20b` both match `a b`. A
/// fragment is kept as is.
#[must_use]
pub fn strip_default_parameters(path: &str, defaults: &Parameters) -> String {
    let (rest, fragment) = match path.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (path, None),
    };
    let Some((base, query)) = rest.split_once('?') else {
        return path.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && !is_default_pair(pair, defaults))
        .collect();

    let mut stripped = base.to_string();
    if !kept.is_empty() {
        stripped.push('?');
        stripped.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        stripped.push('#');
        stripped.push_str(fragment);
    }
    stripped
}

fn is_default_pair(pair: &str, defaults: &Parameters) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(key, value)| {
            defaults.get(key.as_ref()).map(String::as_str) == Some(value.as_ref())
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Parameter(String),
}

/// Route pattern with `{name}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pattern: String,
    segments: Vec<PathSegment>,
}

impl RoutePattern {
    /// Create a pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/cart`
    /// - Named parameters: `/checkout/{orderId}`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => PathSegment::Parameter(name.to_string()),
                None => PathSegment::Literal(s.to_string()),
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a path matches the pattern
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.extract_params(path).is_some()
    }

    /// Extract placeholder values, `None` when the path does not match
    #[must_use]
    pub fn extract_params(&self, path: &str) -> Option<Parameters> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // Each placeholder consumes exactly one segment
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = Parameters::new();
        for (segment, raw) in self.segments.iter().zip(path_segments) {
            let value = percent_decode_str(raw).decode_utf8_lossy();
            match segment {
                PathSegment::Literal(lit) => {
                    if *lit != value {
                        return None;
                    }
                }
                PathSegment::Parameter(name) => {
                    let _ = params.insert(name.clone(), value.into_owned());
                }
            }
        }
        Some(params)
    }

    /// Placeholder names in order
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Parameter(name) => Some(name.as_str()),
                PathSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Fill placeholders; returns the path and the parameters left over
    pub fn generate(&self, parameters: &Parameters) -> PageResult<(String, Parameters)> {
        let mut remaining = parameters.clone();
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                PathSegment::Literal(lit) => path.push_str(lit),
                PathSegment::Parameter(name) => {
                    let value = remaining.remove(name).ok_or_else(|| PageError::UrlGeneration {
                        route: self.pattern.clone(),
                        message: format!("missing mandatory parameter \"{name}\""),
                    })?;
                    path.extend(utf8_percent_encode(&value, PATH_SEGMENT));
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok((path, remaining))
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// A named route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// Route name
    pub name: String,
    /// Path pattern
    pub pattern: RoutePattern,
    /// Default parameter values
    pub defaults: Parameters,
}

/// Router over a list of [`RoutePattern`]s, first match wins
#[derive(Debug, Clone, Default)]
pub struct PatternRouter {
    routes: Vec<RouteDefinition>,
}

impl PatternRouter {
    /// Create an empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route
    #[must_use]
    pub fn route(self, name: impl Into<String>, pattern: &str) -> Self {
        self.route_with_defaults(name, pattern, Parameters::new())
    }

    /// Add a route with default parameter values
    #[must_use]
    pub fn route_with_defaults(
        mut self,
        name: impl Into<String>,
        pattern: &str,
        defaults: Parameters,
    ) -> Self {
        self.routes.push(RouteDefinition {
            name: name.into(),
            pattern: RoutePattern::new(pattern),
            defaults,
        });
        self
    }

    /// Look up a route by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router for PatternRouter {
    fn match_path(&self, path: &str) -> PageResult<MatchedRoute> {
        self.routes
            .iter()
            .find_map(|route| {
                route.pattern.extract_params(path).map(|extracted| {
                    let mut parameters = route.defaults.clone();
                    parameters.extend(extracted);
                    MatchedRoute::new(route.name.clone(), parameters)
                })
            })
            .ok_or_else(|| PageError::RouteNotFound {
                path: path.to_string(),
            })
    }

    fn generate(&self, route: &str, parameters: &Parameters) -> PageResult<String> {
        let definition = self.get(route).ok_or_else(|| PageError::UrlGeneration {
            route: route.to_string(),
            message: "route does not exist".to_string(),
        })?;

        let mut merged = definition.defaults.clone();
        merged.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        let (path, remaining) = definition.pattern.generate(&merged)?;

        // Extra parameters go to the query string unless they only repeat a route default
        let extra: BTreeMap<&String, &String> = remaining
            .iter()
            .filter(|(k, v)| definition.defaults.get(*k) != Some(*v))
            .collect();
        if extra.is_empty() {
            return Ok(path);
        }
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in extra {
            let _ = query.append_pair(key, value);
        }
        Ok(format!("{path}?{}", query.finish()))
    }
}
