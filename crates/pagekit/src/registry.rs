//! Named locators of an element, scoped below its base locator.

use std::collections::BTreeMap;

use crate::locator::Locator;
use crate::result::{PageError, PageResult};

/// Locators an element knows by name.
///
/// The base locator is registered under its own text. Declared inner
/// elements are composed below the base (`base + " " + inner`). Element
/// objects added by type keep their own root locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorRegistry {
    base: String,
    inner: Vec<(String, Locator)>,
    added: BTreeMap<String, Locator>,
}

impl LocatorRegistry {
    /// Create a registry from a base locator and declared inner elements
    #[must_use]
    pub fn new(base: impl Into<String>, inner: impl IntoIterator<Item = (String, Locator)>) -> Self {
        Self {
            base: base.into(),
            inner: inner.into_iter().collect(),
            added: BTreeMap::new(),
        }
    }

    /// The base locator
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Register an element object under its type identifier.
    ///
    /// The root locator is stored as is, without the base prefix.
    pub fn add_element(&mut self, type_id: impl Into<String>, root_locator: impl Into<String>) {
        let _ = self
            .added
            .insert(type_id.into(), Locator::Css(root_locator.into()));
    }

    /// Whether an element object with this type identifier was added
    #[must_use]
    pub fn has_added(&self, type_id: &str) -> bool {
        self.added.contains_key(type_id)
    }

    /// Every defined name with its fully-resolved locator
    #[must_use]
    pub fn defined_elements(&self) -> BTreeMap<String, Locator> {
        let mut elements = BTreeMap::new();
        let _ = elements.insert(self.base.clone(), Locator::Css(self.base.clone()));
        for (name, locator) in &self.inner {
            let _ = elements.insert(name.clone(), locator.within(&self.base));
        }
        for (type_id, locator) in &self.added {
            let _ = elements.insert(type_id.clone(), locator.clone());
        }
        elements
    }

    /// Look up one name
    pub fn get(&self, name: &str) -> PageResult<Locator> {
        let mut elements = self.defined_elements();
        elements
            .remove(name)
            .ok_or_else(|| PageError::UndeclaredElement {
                name: name.to_string(),
                known: elements.into_keys().collect(),
            })
    }

    /// Whether a name is defined
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        name == self.base
            || self.inner.iter().any(|(n, _)| n == name)
            || self.added.contains_key(name)
    }

    /// All defined names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.defined_elements().into_keys().collect()
    }
}
