//! Page configuration: base URL, default route parameters, front controllers.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::locator::Parameters;
use crate::result::{PageError, PageResult};

/// Default locale added to every generated route URL
pub const DEFAULT_LOCALE: &str = "en_US";

/// Front-controller scripts stripped before route matching
pub const DEFAULT_FRONT_CONTROLLERS: [&str; 4] = [
    "app.php",
    "app_dev.php",
    "app_test.php",
    "app_test_cached.php",
];

/// Configuration shared by every page object of a test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Base URL relative paths are resolved against
    pub base_url: Option<String>,
    /// Parameters merged into generated route URLs unless the caller sets them
    pub default_parameters: Parameters,
    /// Front-controller scripts (`app_dev.php`) stripped from paths
    pub front_controllers: Vec<String>,
    /// Any other parameter
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for PageConfig {
    fn default() -> Self {
        let mut default_parameters = Parameters::new();
        let _ = default_parameters.insert("_locale".to_string(), DEFAULT_LOCALE.to_string());
        Self {
            base_url: None,
            default_parameters,
            front_controllers: DEFAULT_FRONT_CONTROLLERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            extra: BTreeMap::new(),
        }
    }
}

impl PageConfig {
    /// Create a new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add or replace a default parameter
    #[must_use]
    pub fn with_default_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.default_parameters.insert(key.into(), value.into());
        self
    }

    /// Drop all default parameters
    #[must_use]
    pub fn without_default_parameters(mut self) -> Self {
        self.default_parameters.clear();
        self
    }

    /// Replace the front-controller list
    #[must_use]
    pub fn with_front_controllers<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.front_controllers = scripts.into_iter().map(Into::into).collect();
        self
    }

    /// Set an extra parameter
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let _ = self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up an extra parameter
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> PageResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> PageResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML or JSON file, chosen by extension
    pub fn load(path: &Path) -> PageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Reject malformed values
    pub fn validate(&self) -> PageResult<()> {
        if let Some(base_url) = &self.base_url {
            let parsed = Url::parse(base_url).map_err(|e| {
                PageError::configuration(format!("base_url \"{base_url}\" is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PageError::configuration(format!(
                    "base_url \"{base_url}\" must use http or https"
                )));
            }
        }
        if self.front_controllers.iter().any(|s| s.trim().is_empty()) {
            return Err(PageError::configuration(
                "front controller names must not be empty",
            ));
        }
        if self.default_parameters.keys().any(String::is_empty) {
            return Err(PageError::configuration(
                "default parameter names must not be empty",
            ));
        }
        Ok(())
    }

    /// Prefix a path with the base URL unless it is already absolute.
    ///
    /// A path is absolute when it starts with `http`.
    pub fn make_path_absolute(&self, path: &str) -> PageResult<String> {
        if path.starts_with("http") {
            return Ok(path.to_string());
        }
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| PageError::configuration("base_url is not configured"))?;
        Ok(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    /// Compile the front-controller list
    pub fn front_controller_matcher(&self) -> PageResult<FrontControllers> {
        FrontControllers::new(&self.front_controllers)
    }
}

/// Strips a leading `/<script>.php/` from paths
#[derive(Debug, Clone)]
pub struct FrontControllers {
    pattern: Option<Regex>,
}

impl FrontControllers {
    /// Compile a set of script names
    pub fn new<S: AsRef<str>>(scripts: &[S]) -> PageResult<Self> {
        if scripts.is_empty() {
            return Ok(Self { pattern: None });
        }
        let alternatives = scripts
            .iter()
            .map(|s| regex::escape(s.as_ref().trim_matches('/')))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("^/(?:{alternatives})/"))
            .map_err(|e| PageError::configuration(format!("invalid front controller: {e}")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Replace a leading front-controller segment with `/`
    #[must_use]
    pub fn normalize(&self, path: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace(path, "/").into_owned(),
            None => path.to_string(),
        }
    }
}

impl Default for FrontControllers {
    fn default() -> Self {
        Self::new(&DEFAULT_FRONT_CONTROLLERS).unwrap_or(Self { pattern: None })
    }
}
