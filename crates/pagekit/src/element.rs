//! Element objects: reusable DOM fragments with named sub-locators.
//!
//! An [`ElementDefinition`] declares a root locator and named inner
//! locators. [`Element`] binds a definition to a session and resolves names
//! to nodes:
//!
//! ```ignore
//! #[derive(Default)]
//! struct Cart;
//!
//! impl ElementDefinition for Cart {
//!     fn locator(&self) -> &str {
//!         "#cart"
//!     }
//!
//!     fn inner_elements(&self) -> Vec<(String, Locator)> {
//!         vec![
//!             ("total".to_string(), Locator::css(".total")),
//!             ("item".to_string(), Locator::css("li[data-sku='%sku%']")),
//!         ]
//!     }
//! }
//!
//! let cart = Element::new(session, &Cart);
//! let item = cart.get_element("item", &params! { "%sku%" => "MUG-1" })?;
//! item.click()?;
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::locator::{Locator, Parameters, Selector};
use crate::node::{NodeAction, NodeElement, NodeOperations, NodeQuery};
use crate::registry::LocatorRegistry;
use crate::result::{PageError, PageResult};
use crate::session::{Document, Session};

/// Base locator used when a definition does not name one
pub const DEFAULT_LOCATOR: &str = "body";

/// Declaration of an element object
pub trait ElementDefinition {
    /// CSS locator of the element root
    fn locator(&self) -> &str {
        DEFAULT_LOCATOR
    }

    /// Named locators inside the root
    fn inner_elements(&self) -> Vec<(String, Locator)> {
        Vec::new()
    }

    /// Identifier the element is registered under when composed into another element
    fn element_type(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Element definition built at runtime or loaded from YAML/JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Identifier used when composed into another element
    #[serde(default)]
    pub name: Option<String>,
    /// Root locator
    #[serde(default = "default_locator")]
    pub locator: String,
    /// Named inner locators, as a `name: locator` map or `[name, locator]` pairs
    #[serde(default, deserialize_with = "deserialize_elements")]
    pub elements: Vec<(String, Locator)>,
}

fn default_locator() -> String {
    DEFAULT_LOCATOR.to_string()
}

/// Inner elements keep their declaration order in both forms
fn deserialize_elements<'de, D>(deserializer: D) -> Result<Vec<(String, Locator)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ElementsVisitor;

    impl<'de> Visitor<'de> for ElementsVisitor {
        type Value = Vec<(String, Locator)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of element names to locators or a list of [name, locator] pairs")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut elements = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, Locator>()? {
                elements.push(entry);
            }
            Ok(elements)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut elements = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(entry) = seq.next_element::<(String, Locator)>()? {
                elements.push(entry);
            }
            Ok(elements)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(ElementsVisitor)
}

impl Default for ElementSpec {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATOR)
    }
}

impl ElementSpec {
    /// Create a spec with a root locator
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            name: None,
            locator: locator.into(),
            elements: Vec::new(),
        }
    }

    /// Set the identifier used for composition
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a named inner locator
    #[must_use]
    pub fn with_element(mut self, name: impl Into<String>, locator: impl Into<Locator>) -> Self {
        self.elements.push((name.into(), locator.into()));
        self
    }

    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> PageResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }
}

impl ElementDefinition for ElementSpec {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn inner_elements(&self) -> Vec<(String, Locator)> {
        self.elements.clone()
    }

    fn element_type(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}({})", std::any::type_name::<Self>(), self.locator))
    }
}

/// An element definition bound to a session
pub struct Element {
    session: Rc<dyn Session>,
    registry: LocatorRegistry,
    document: OnceCell<Document>,
}

impl Element {
    /// Bind a definition to a session
    #[must_use]
    pub fn new<D: ElementDefinition + ?Sized>(session: Rc<dyn Session>, definition: &D) -> Self {
        Self {
            session,
            registry: LocatorRegistry::new(definition.locator(), definition.inner_elements()),
            document: OnceCell::new(),
        }
    }

    /// Root locator of this element
    #[must_use]
    pub fn locator(&self) -> &str {
        self.registry.base()
    }

    /// Named locators
    #[must_use]
    pub const fn registry(&self) -> &LocatorRegistry {
        &self.registry
    }

    /// The session
    #[must_use]
    pub const fn session(&self) -> &Rc<dyn Session> {
        &self.session
    }

    /// Document root, created on first use
    pub fn document(&self) -> &Document {
        self.document
            .get_or_init(|| Document::new(Rc::clone(&self.session)))
    }

    /// Resolve a name and parameters into a selector
    pub fn resolve(&self, name: &str, parameters: &Parameters) -> PageResult<Selector> {
        let locator = self.registry.get(name)?;
        let selector = locator.resolve(parameters);
        tracing::trace!(element = name, declared = %locator, resolved = selector.pattern(), "resolved element");
        Ok(selector)
    }

    /// Resolve a name and parameters into a low-level query
    pub fn query(&self, name: &str, parameters: &Parameters) -> PageResult<String> {
        let selector = self.resolve(name, parameters)?;
        self.session.selectors().to_query(&selector)
    }

    /// Whether a node matches the named element
    pub fn has_element(&self, name: &str, parameters: &Parameters) -> PageResult<bool> {
        let query = self.query(name, parameters)?;
        self.document().has(&query)
    }

    /// The first node matching the named element
    pub fn get_element(&self, name: &str, parameters: &Parameters) -> PageResult<NodeElement> {
        let query = self.query(name, parameters)?;
        match self.document().find(&query)? {
            Some(handle) => Ok(NodeElement::new(Rc::clone(&self.session), handle)),
            None => {
                tracing::debug!(element = name, %query, "element not found");
                Err(PageError::ElementNotFound {
                    name: name.to_string(),
                    parameters: parameters.clone(),
                    query,
                })
            }
        }
    }

    /// All nodes matching the named element
    pub fn get_elements(&self, name: &str) -> PageResult<Vec<NodeElement>> {
        let query = self.query(name, &Parameters::new())?;
        Ok(self
            .document()
            .find_all(&query)?
            .into_iter()
            .map(|handle| NodeElement::new(Rc::clone(&self.session), handle))
            .collect())
    }

    /// Node of the element root
    pub fn root(&self) -> PageResult<NodeElement> {
        let base = self.registry.base().to_string();
        self.get_element(&base, &Parameters::new())
    }

    /// Whether the root text contains `text`
    pub fn contains_text(&self, text: &str) -> PageResult<bool> {
        Ok(self.root()?.text()?.contains(text))
    }

    /// Register another element object under its type identifier.
    ///
    /// Returns the identifier to resolve it with.
    pub fn add_element<E: ElementDefinition + ?Sized>(&mut self, element: &E) -> String {
        let type_id = element.element_type();
        self.registry
            .add_element(type_id.clone(), element.locator().to_string());
        type_id
    }

    /// Whether the element object `E` is present
    pub fn has_element_of<E: ElementDefinition + Default>(&mut self) -> PageResult<bool> {
        let type_id = self.add_element(&E::default());
        self.has_element(&type_id, &Parameters::new())
    }

    /// Root node of the element object `E`
    pub fn get_element_of<E: ElementDefinition + Default>(&mut self) -> PageResult<NodeElement> {
        let type_id = self.add_element(&E::default());
        self.get_element(&type_id, &Parameters::new())
    }

    /// Another element object sharing this session
    #[must_use]
    pub fn element_object<E: ElementDefinition + ?Sized>(&self, definition: &E) -> Self {
        Self::new(Rc::clone(&self.session), definition)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("registry", &self.registry)
            .field("document_created", &self.document.get().is_some())
            .finish_non_exhaustive()
    }
}

impl NodeOperations for Element {
    fn perform(&self, action: NodeAction) -> PageResult<()> {
        self.root()?.perform(action)
    }

    fn inspect(&self, query: NodeQuery) -> PageResult<Value> {
        self.root()?.inspect(query)
    }

    fn find_all(&self, selector: &Selector) -> PageResult<Vec<NodeElement>> {
        self.root()?.find_all(selector)
    }
}
