//! Session - Abstract Browser Session Trait
//!
//! Page objects never talk to a browser directly. Everything goes through
//! the [`Session`] trait, so a WebDriver client, a CDP client or the
//! in-memory [`MockSession`] can sit underneath.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Page / Element objects                                      │
//! │      │ resolve name + parameters                             │
//! │      ▼                                                       │
//! │  SelectorEngine ──► low-level query ──► Session::find_all    │
//! │                                              │               │
//! │  NodeOperations ──► Session::perform / Session::inspect      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::locator::{DefaultSelectorEngine, SelectorEngine};
use crate::node::{NodeAction, NodeQuery};
use crate::result::{PageError, PageResult};

/// Handle to a DOM node held by the session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle {
    /// Session-specific node identifier
    pub id: String,
    /// Query the node was found with
    pub query: String,
}

impl NodeHandle {
    /// Create a new node handle
    #[must_use]
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
        }
    }
}

/// Abstract browser session
///
/// # Implementations
///
/// - Any browser driver adapter (WebDriver, CDP, ...)
/// - [`MockSession`] - For unit testing
pub trait Session: fmt::Debug {
    /// URL the browser is currently on
    fn current_url(&self) -> PageResult<String>;

    /// Navigate to a URL
    fn visit(&self, url: &str) -> PageResult<()>;

    /// HTTP status code of the last response, `None` when the driver cannot tell
    fn status_code(&self) -> PageResult<Option<u16>>;

    /// All nodes matching a low-level query, in document order
    fn find_all(&self, query: &str) -> PageResult<Vec<NodeHandle>>;

    /// Nodes matching a query among the descendants of `scope`
    fn find_within(&self, scope: &NodeHandle, query: &str) -> PageResult<Vec<NodeHandle>>;

    /// Run an action on a node
    fn perform(&self, node: &NodeHandle, action: &NodeAction) -> PageResult<()>;

    /// Read a property of a node
    fn inspect(&self, node: &NodeHandle, query: &NodeQuery) -> PageResult<Value>;

    /// Engine used to turn selectors into queries for this session
    fn selectors(&self) -> &dyn SelectorEngine {
        &DefaultSelectorEngine
    }
}

/// Root of the current document, created once per element object
#[derive(Clone)]
pub struct Document {
    session: Rc<dyn Session>,
}

impl Document {
    /// Create a document handle for a session
    #[must_use]
    pub fn new(session: Rc<dyn Session>) -> Self {
        Self { session }
    }

    /// Whether at least one node matches
    pub fn has(&self, query: &str) -> PageResult<bool> {
        Ok(!self.session.find_all(query)?.is_empty())
    }

    /// First matching node
    pub fn find(&self, query: &str) -> PageResult<Option<NodeHandle>> {
        Ok(self.session.find_all(query)?.into_iter().next())
    }

    /// All matching nodes
    pub fn find_all(&self, query: &str) -> PageResult<Vec<NodeHandle>> {
        self.session.find_all(query)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("session", &self.session)
            .finish()
    }
}

/// Simulated DOM node for [`MockSession`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockNode {
    /// Unique identifier
    pub id: String,
    /// Tag name
    pub tag_name: String,
    /// Queries this node answers to
    pub queries: BTreeSet<String>,
    /// Text content
    pub text: String,
    /// Inner HTML
    pub html: String,
    /// Field value
    pub value: Value,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Classes
    pub classes: BTreeSet<String>,
    /// Visible on screen
    pub visible: bool,
    /// Checkbox state
    pub checked: bool,
    /// Option state
    pub selected: bool,
    /// Id of the enclosing node
    #[serde(default)]
    pub parent: Option<String>,
}

impl MockNode {
    /// Create a visible, empty node
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            queries: BTreeSet::new(),
            text: String::new(),
            html: String::new(),
            value: Value::Null,
            attributes: BTreeMap::new(),
            classes: BTreeSet::new(),
            visible: true,
            checked: false,
            selected: false,
            parent: None,
        }
    }

    /// Answer to a query
    #[must_use]
    pub fn matching(mut self, query: impl Into<String>) -> Self {
        let _ = self.queries.insert(query.into());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the inner HTML
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Set the field value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let _ = self.classes.insert(class.into());
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Nest inside another node
    #[must_use]
    pub fn inside(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the checkbox state
    #[must_use]
    pub const fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    fn outer_html(&self) -> String {
        format!("<{tag}>{}</{tag}>", self.html, tag = self.tag_name)
    }
}

#[derive(Debug)]
struct MockState {
    current_url: String,
    status_code: Option<u16>,
    nodes: Vec<MockNode>,
    redirects: BTreeMap<String, String>,
    call_history: Vec<String>,
}

impl MockState {
    /// Whether `ancestor` encloses `node`; parent cycles end the walk
    fn is_descendant(&self, node: &MockNode, ancestor: &str) -> bool {
        let mut parent = node.parent.as_deref();
        for _ in 0..self.nodes.len() {
            match parent {
                Some(id) if id == ancestor => return true,
                Some(id) => {
                    parent = self
                        .nodes
                        .iter()
                        .find(|n| n.id == id)
                        .and_then(|n| n.parent.as_deref());
                }
                None => return false,
            }
        }
        false
    }
}

/// In-memory session for unit testing
#[derive(Debug)]
pub struct MockSession {
    state: RefCell<MockState>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    /// Create a session on `about:blank` answering 200
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MockState {
                current_url: "about:blank".to_string(),
                status_code: Some(200),
                nodes: Vec::new(),
                redirects: BTreeMap::new(),
                call_history: Vec::new(),
            }),
        }
    }

    /// Start on a URL
    #[must_use]
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.state.borrow_mut().current_url = url.into();
        self
    }

    /// Add a node
    #[must_use]
    pub fn with_node(self, node: MockNode) -> Self {
        self.add_node(node);
        self
    }

    /// Answer every visit with this status code (`None` = unsupported)
    #[must_use]
    pub fn with_status(self, status: Option<u16>) -> Self {
        self.set_status(status);
        self
    }

    /// Send visits of `from` to `to`
    #[must_use]
    pub fn with_redirect(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let _ = self
            .state
            .borrow_mut()
            .redirects
            .insert(from.into(), to.into());
        self
    }

    /// Add a node
    pub fn add_node(&self, node: MockNode) {
        self.state.borrow_mut().nodes.push(node);
    }

    /// Remove a node by id
    pub fn remove_node(&self, id: &str) {
        self.state.borrow_mut().nodes.retain(|n| n.id != id);
    }

    /// Move the browser without recording a visit
    pub fn set_current_url(&self, url: impl Into<String>) {
        self.state.borrow_mut().current_url = url.into();
    }

    /// Change the status code
    pub fn set_status(&self, status: Option<u16>) {
        self.state.borrow_mut().status_code = status;
    }

    /// Snapshot of a node
    #[must_use]
    pub fn node(&self, id: &str) -> Option<MockNode> {
        self.state.borrow().nodes.iter().find(|n| n.id == id).cloned()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().call_history.clone()
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state
            .borrow()
            .call_history
            .iter()
            .any(|c| c.starts_with(prefix))
    }

    fn with_node_mut<T>(
        &self,
        handle: &NodeHandle,
        f: impl FnOnce(&mut MockNode) -> T,
    ) -> PageResult<T> {
        let mut state = self.state.borrow_mut();
        state
            .nodes
            .iter_mut()
            .find(|n| n.id == handle.id)
            .map(f)
            .ok_or_else(|| PageError::session(format!("stale node handle \"{}\"", handle.id)))
    }
}

impl Session for MockSession {
    fn current_url(&self) -> PageResult<String> {
        Ok(self.state.borrow().current_url.clone())
    }

    fn visit(&self, url: &str) -> PageResult<()> {
        let mut state = self.state.borrow_mut();
        state.call_history.push(format!("visit:{url}"));
        let landed = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.current_url = landed;
        Ok(())
    }

    fn status_code(&self) -> PageResult<Option<u16>> {
        Ok(self.state.borrow().status_code)
    }

    fn find_all(&self, query: &str) -> PageResult<Vec<NodeHandle>> {
        Ok(self
            .state
            .borrow()
            .nodes
            .iter()
            .filter(|n| n.queries.contains(query))
            .map(|n| NodeHandle::new(n.id.clone(), query))
            .collect())
    }

    fn find_within(&self, scope: &NodeHandle, query: &str) -> PageResult<Vec<NodeHandle>> {
        let state = self.state.borrow();
        if !state.nodes.iter().any(|n| n.id == scope.id) {
            return Err(PageError::session(format!("stale node handle \"{}\"", scope.id)));
        }
        Ok(state
            .nodes
            .iter()
            .filter(|n| n.queries.contains(query) && state.is_descendant(n, &scope.id))
            .map(|n| NodeHandle::new(n.id.clone(), query))
            .collect())
    }

    fn perform(&self, node: &NodeHandle, action: &NodeAction) -> PageResult<()> {
        self.with_node_mut(node, |n| match action {
            NodeAction::Check => n.checked = true,
            NodeAction::Uncheck => n.checked = false,
            NodeAction::SetValue(value) => n.value = Value::from(value.as_str()),
            NodeAction::AttachFile(path) => n.value = Value::from(path.as_str()),
            NodeAction::SelectOption { option, multiple } => {
                n.value = match (&n.value, multiple) {
                    (Value::Array(current), true) => {
                        let mut values = current.clone();
                        values.push(Value::from(option.as_str()));
                        Value::Array(values)
                    }
                    (_, true) => Value::Array(vec![Value::from(option.as_str())]),
                    (_, false) => Value::from(option.as_str()),
                };
            }
            _ => {}
        })?;
        self.state
            .borrow_mut()
            .call_history
            .push(format!("{}:{}", action.name(), node.id));
        Ok(())
    }

    fn inspect(&self, node: &NodeHandle, query: &NodeQuery) -> PageResult<Value> {
        self.with_node_mut(node, |n| match query {
            NodeQuery::Text => Value::from(n.text.as_str()),
            NodeQuery::Html => Value::from(n.html.as_str()),
            NodeQuery::OuterHtml => Value::from(n.outer_html()),
            NodeQuery::TagName => Value::from(n.tag_name.as_str()),
            NodeQuery::Value => n.value.clone(),
            NodeQuery::Attribute(name) => n
                .attributes
                .get(name)
                .map_or(Value::Null, |v| Value::from(v.as_str())),
            NodeQuery::HasAttribute(name) => Value::Bool(n.attributes.contains_key(name)),
            NodeQuery::HasClass(class) => Value::Bool(n.classes.contains(class)),
            NodeQuery::IsVisible => Value::Bool(n.visible),
            NodeQuery::IsChecked => Value::Bool(n.checked),
            NodeQuery::IsSelected => Value::Bool(n.selected),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod node_handle_tests {
        use super::*;

        #[test]
        fn test_node_handle_creation() {
            let handle = NodeHandle::new("btn-1", "css=button");
            assert_eq!(handle.id, "btn-1");
            assert_eq!(handle.query, "css=button");
        }
    }

    mod mock_session_tests {
        use super::*;

        #[test]
        fn test_mock_session_creation() {
            let session = MockSession::new();
            assert_eq!(session.current_url().unwrap(), "about:blank");
            assert_eq!(session.status_code().unwrap(), Some(200));
            assert!(session.history().is_empty());
        }

        #[test]
        fn test_visit_records_and_moves() {
            let session = MockSession::new();
            session.visit("http://shop.test/cart").unwrap();
            assert_eq!(session.current_url().unwrap(), "http://shop.test/cart");
            assert!(session.was_called("visit:http://shop.test/cart"));
        }

        #[test]
        fn test_visit_follows_redirect() {
            let session =
                MockSession::new().with_redirect("http://shop.test/a", "http://shop.test/login");
            session.visit("http://shop.test/a").unwrap();
            assert_eq!(session.current_url().unwrap(), "http://shop.test/login");
        }

        #[test]
        fn test_find_all_matches_by_query() {
            let session = MockSession::new()
                .with_node(MockNode::new("a", "li").matching("css=li"))
                .with_node(MockNode::new("b", "li").matching("css=li"))
                .with_node(MockNode::new("c", "p").matching("css=p"));
            let found = session.find_all("css=li").unwrap();
            assert_eq!(found.len(), 2);
            assert_eq!(found[0].id, "a");
            assert!(session.find_all("css=table").unwrap().is_empty());
        }

        #[test]
        fn test_find_within_only_descendants() {
            let session = MockSession::new()
                .with_node(MockNode::new("form", "form").matching("css=form"))
                .with_node(MockNode::new("fieldset", "fieldset").inside("form"))
                .with_node(MockNode::new("a", "input").matching("css=input").inside("fieldset"))
                .with_node(MockNode::new("b", "input").matching("css=input"));
            let scope = NodeHandle::new("form", "css=form");
            let found = session.find_within(&scope, "css=input").unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, "a");
            assert!(session
                .find_within(&NodeHandle::new("a", "css=input"), "css=input")
                .unwrap()
                .is_empty());
        }

        #[test]
        fn test_find_within_stale_scope() {
            let session = MockSession::new();
            let result = session.find_within(&NodeHandle::new("gone", "css=form"), "css=input");
            assert!(matches!(result, Err(PageError::Session { .. })));
        }

        #[test]
        fn test_find_within_survives_parent_cycle() {
            let session = MockSession::new()
                .with_node(MockNode::new("x", "div").matching("css=div").inside("y"))
                .with_node(MockNode::new("y", "div").matching("css=div").inside("x"))
                .with_node(MockNode::new("root", "body"));
            let found = session
                .find_within(&NodeHandle::new("root", "css=body"), "css=div")
                .unwrap();
            assert!(found.is_empty());
        }

        #[test]
        fn test_remove_node() {
            let session = MockSession::new().with_node(MockNode::new("a", "li").matching("css=li"));
            session.remove_node("a");
            assert!(session.find_all("css=li").unwrap().is_empty());
        }

        #[test]
        fn test_stale_handle_is_session_error() {
            let session = MockSession::new();
            let result = session.perform(&NodeHandle::new("gone", "css=a"), &NodeAction::Click);
            assert!(matches!(result, Err(PageError::Session { .. })));
        }

        #[test]
        fn test_multi_select_accumulates() {
            let session = MockSession::new().with_node(MockNode::new("s", "select").matching("css=select"));
            let handle = NodeHandle::new("s", "css=select");
            for option in ["red", "blue"] {
                session
                    .perform(
                        &handle,
                        &NodeAction::SelectOption {
                            option: option.to_string(),
                            multiple: true,
                        },
                    )
                    .unwrap();
            }
            assert_eq!(
                session.node("s").unwrap().value,
                serde_json::json!(["red", "blue"])
            );
        }

        #[test]
        fn test_outer_html() {
            let session = MockSession::new()
                .with_node(MockNode::new("t", "span").matching("css=span").with_html("hi"));
            let value = session
                .inspect(&NodeHandle::new("t", "css=span"), &NodeQuery::OuterHtml)
                .unwrap();
            assert_eq!(value, Value::from("<span>hi</span>"));
        }

        #[test]
        fn test_status_unsupported() {
            let session = MockSession::new().with_status(None);
            assert_eq!(session.status_code().unwrap(), None);
        }
    }

    mod document_tests {
        use super::*;

        #[test]
        fn test_document_has_and_find() {
            let session: Rc<dyn Session> = Rc::new(
                MockSession::new().with_node(MockNode::new("n", "div").matching("css=div")),
            );
            let document = Document::new(session);
            assert!(document.has("css=div").unwrap());
            assert!(!document.has("css=span").unwrap());
            assert_eq!(document.find("css=div").unwrap().unwrap().id, "n");
            assert!(document.find("css=span").unwrap().is_none());
            assert_eq!(document.find_all("css=div").unwrap().len(), 1);
        }

        #[test]
        fn test_default_selector_engine() {
            let session = MockSession::new();
            let query = session
                .selectors()
                .to_query(&crate::locator::Selector::css("a"))
                .unwrap();
            assert_eq!(query, "css=a");
        }
    }
}
