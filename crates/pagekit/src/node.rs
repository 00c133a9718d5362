//! Node interaction: the operations an element forwards to the session.
//!
//! [`NodeOperations`] is the full list of forwarded calls. Implementors
//! provide [`NodeOperations::perform`], [`NodeOperations::inspect`] and the
//! scoped lookup [`NodeOperations::find_all`]; every other method is a thin
//! delegation. Link, button, field, select and table helpers go through
//! named selectors (`named=field:Email`).

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::locator::{NamedKind, Parameters, Selector};
use crate::result::{PageError, PageResult};
use crate::session::{NodeHandle, Session};

/// Keyboard modifier held during a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyModifier {
    /// Control key
    Ctrl,
    /// Alt key
    Alt,
    /// Shift key
    Shift,
    /// Meta/command key
    Meta,
}

/// State-changing operation on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeAction {
    /// Click the node
    Click,
    /// Press a button node
    Press,
    /// Double-click the node
    DoubleClick,
    /// Right-click the node
    RightClick,
    /// Check a checkbox
    Check,
    /// Uncheck a checkbox
    Uncheck,
    /// Select an option of a select box
    SelectOption {
        /// Option value or text
        option: String,
        /// Add to the current selection instead of replacing it
        multiple: bool,
    },
    /// Set a field value
    SetValue(String),
    /// Attach a file to a file input
    AttachFile(String),
    /// Move the mouse over the node
    MouseOver,
    /// Focus the node
    Focus,
    /// Remove focus from the node
    Blur,
    /// Submit the form the node belongs to
    Submit,
    /// Press and release a key
    KeyPress {
        /// Key character or code
        key: String,
        /// Held modifier
        modifier: Option<KeyModifier>,
    },
    /// Press a key
    KeyDown {
        /// Key character or code
        key: String,
        /// Held modifier
        modifier: Option<KeyModifier>,
    },
    /// Release a key
    KeyUp {
        /// Key character or code
        key: String,
        /// Held modifier
        modifier: Option<KeyModifier>,
    },
    /// Drag the node onto another node
    DragTo(NodeHandle),
}

impl NodeAction {
    /// Short name used in logs and call histories
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Press => "press",
            Self::DoubleClick => "double_click",
            Self::RightClick => "right_click",
            Self::Check => "check",
            Self::Uncheck => "uncheck",
            Self::SelectOption { .. } => "select_option",
            Self::SetValue(_) => "set_value",
            Self::AttachFile(_) => "attach_file",
            Self::MouseOver => "mouse_over",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Submit => "submit",
            Self::KeyPress { .. } => "key_press",
            Self::KeyDown { .. } => "key_down",
            Self::KeyUp { .. } => "key_up",
            Self::DragTo(_) => "drag_to",
        }
    }
}

/// Read-only inspection of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeQuery {
    /// Visible text
    Text,
    /// Inner HTML
    Html,
    /// Outer HTML
    OuterHtml,
    /// Tag name
    TagName,
    /// Field value (string, bool or list depending on the field)
    Value,
    /// Attribute value, null when absent
    Attribute(String),
    /// Whether an attribute is present
    HasAttribute(String),
    /// Whether the class list contains a class
    HasClass(String),
    /// Whether the node is visible
    IsVisible,
    /// Whether a checkbox is checked
    IsChecked,
    /// Whether an option is selected
    IsSelected,
}

/// Interaction primitives shared by node handles and element objects
pub trait NodeOperations {
    /// Run a state-changing action
    fn perform(&self, action: NodeAction) -> PageResult<()>;

    /// Read a property
    fn inspect(&self, query: NodeQuery) -> PageResult<Value>;

    /// Descendants matching a selector, in document order
    fn find_all(&self, selector: &Selector) -> PageResult<Vec<NodeElement>>;

    /// First descendant matching a selector
    fn find(&self, selector: &Selector) -> PageResult<Option<NodeElement>> {
        Ok(self.find_all(selector)?.into_iter().next())
    }

    /// Whether a descendant matches a selector
    fn has(&self, selector: &Selector) -> PageResult<bool> {
        Ok(self.find(selector)?.is_some())
    }

    /// Descendant with this id
    fn find_by_id(&self, id: &str) -> PageResult<Option<NodeElement>> {
        self.find(&Selector::named(NamedKind::Id, id))
    }

    /// Whether a link is present
    fn has_link(&self, locator: &str) -> PageResult<bool> {
        self.has(&Selector::named(NamedKind::Link, locator))
    }

    /// Link by id, text, title or image alt
    fn find_link(&self, locator: &str) -> PageResult<Option<NodeElement>> {
        self.find(&Selector::named(NamedKind::Link, locator))
    }

    /// Click a link; fails when it is absent
    fn click_link(&self, locator: &str) -> PageResult<()> {
        find_required(self, NamedKind::Link, locator)?.click()
    }

    /// Whether a button is present
    fn has_button(&self, locator: &str) -> PageResult<bool> {
        self.has(&Selector::named(NamedKind::Button, locator))
    }

    /// Button by id, value, text or title
    fn find_button(&self, locator: &str) -> PageResult<Option<NodeElement>> {
        self.find(&Selector::named(NamedKind::Button, locator))
    }

    /// Press a button; fails when it is absent
    fn press_button(&self, locator: &str) -> PageResult<()> {
        find_required(self, NamedKind::Button, locator)?.press()
    }

    /// Whether a form field is present
    fn has_field(&self, locator: &str) -> PageResult<bool> {
        self.has(&Selector::named(NamedKind::Field, locator))
    }

    /// Form field by id, name, label or placeholder
    fn find_field(&self, locator: &str) -> PageResult<Option<NodeElement>> {
        self.find(&Selector::named(NamedKind::Field, locator))
    }

    /// Set the value of a field; fails when it is absent
    fn fill_field(&self, locator: &str, value: &str) -> PageResult<()> {
        find_required(self, NamedKind::Field, locator)?.set_value(value)
    }

    /// Whether a checked checkbox field is present
    fn has_checked_field(&self, locator: &str) -> PageResult<bool> {
        match self.find_field(locator)? {
            Some(field) => field.is_checked(),
            None => Ok(false),
        }
    }

    /// Whether an unchecked checkbox field is present
    fn has_unchecked_field(&self, locator: &str) -> PageResult<bool> {
        match self.find_field(locator)? {
            Some(field) => Ok(!field.is_checked()?),
            None => Ok(false),
        }
    }

    /// Check a checkbox field; fails when it is absent
    fn check_field(&self, locator: &str) -> PageResult<()> {
        find_required(self, NamedKind::Field, locator)?.check()
    }

    /// Uncheck a checkbox field; fails when it is absent
    fn uncheck_field(&self, locator: &str) -> PageResult<()> {
        find_required(self, NamedKind::Field, locator)?.uncheck()
    }

    /// Whether a select box is present
    fn has_select(&self, locator: &str) -> PageResult<bool> {
        self.has(&Selector::named(NamedKind::Select, locator))
    }

    /// Select an option of a select field; `multiple` adds to the selection
    fn select_field_option(&self, locator: &str, option: &str, multiple: bool) -> PageResult<()> {
        let field = find_required(self, NamedKind::Field, locator)?;
        if multiple {
            field.select_additional_option(option)
        } else {
            field.select_option(option)
        }
    }

    /// Whether a table is present
    fn has_table(&self, locator: &str) -> PageResult<bool> {
        self.has(&Selector::named(NamedKind::Table, locator))
    }

    /// Attach a file to a file field; fails when it is absent
    fn attach_file_to_field(&self, locator: &str, path: &str) -> PageResult<()> {
        find_required(self, NamedKind::Field, locator)?.attach_file(path)
    }

    /// Click
    fn click(&self) -> PageResult<()> {
        self.perform(NodeAction::Click)
    }

    /// Press (buttons)
    fn press(&self) -> PageResult<()> {
        self.perform(NodeAction::Press)
    }

    /// Double-click
    fn double_click(&self) -> PageResult<()> {
        self.perform(NodeAction::DoubleClick)
    }

    /// Right-click
    fn right_click(&self) -> PageResult<()> {
        self.perform(NodeAction::RightClick)
    }

    /// Check a checkbox
    fn check(&self) -> PageResult<()> {
        self.perform(NodeAction::Check)
    }

    /// Uncheck a checkbox
    fn uncheck(&self) -> PageResult<()> {
        self.perform(NodeAction::Uncheck)
    }

    /// Select an option, replacing the current selection
    fn select_option(&self, option: &str) -> PageResult<()> {
        self.perform(NodeAction::SelectOption {
            option: option.to_string(),
            multiple: false,
        })
    }

    /// Add an option to a multi-select
    fn select_additional_option(&self, option: &str) -> PageResult<()> {
        self.perform(NodeAction::SelectOption {
            option: option.to_string(),
            multiple: true,
        })
    }

    /// Set a field value
    fn set_value(&self, value: &str) -> PageResult<()> {
        self.perform(NodeAction::SetValue(value.to_string()))
    }

    /// Fill a field (alias of [`NodeOperations::set_value`])
    fn fill(&self, value: &str) -> PageResult<()> {
        self.set_value(value)
    }

    /// Attach a file
    fn attach_file(&self, path: &str) -> PageResult<()> {
        self.perform(NodeAction::AttachFile(path.to_string()))
    }

    /// Hover
    fn mouse_over(&self) -> PageResult<()> {
        self.perform(NodeAction::MouseOver)
    }

    /// Focus
    fn focus(&self) -> PageResult<()> {
        self.perform(NodeAction::Focus)
    }

    /// Blur
    fn blur(&self) -> PageResult<()> {
        self.perform(NodeAction::Blur)
    }

    /// Submit the enclosing form
    fn submit(&self) -> PageResult<()> {
        self.perform(NodeAction::Submit)
    }

    /// Press and release a key
    fn key_press(&self, key: &str, modifier: Option<KeyModifier>) -> PageResult<()> {
        self.perform(NodeAction::KeyPress {
            key: key.to_string(),
            modifier,
        })
    }

    /// Press a key
    fn key_down(&self, key: &str, modifier: Option<KeyModifier>) -> PageResult<()> {
        self.perform(NodeAction::KeyDown {
            key: key.to_string(),
            modifier,
        })
    }

    /// Release a key
    fn key_up(&self, key: &str, modifier: Option<KeyModifier>) -> PageResult<()> {
        self.perform(NodeAction::KeyUp {
            key: key.to_string(),
            modifier,
        })
    }

    /// Drag onto another node
    fn drag_to(&self, target: &NodeElement) -> PageResult<()> {
        self.perform(NodeAction::DragTo(target.handle().clone()))
    }

    /// Visible text
    fn text(&self) -> PageResult<String> {
        expect_string(self.inspect(NodeQuery::Text)?, "text")
    }

    /// Inner HTML
    fn html(&self) -> PageResult<String> {
        expect_string(self.inspect(NodeQuery::Html)?, "html")
    }

    /// Outer HTML
    fn outer_html(&self) -> PageResult<String> {
        expect_string(self.inspect(NodeQuery::OuterHtml)?, "outer_html")
    }

    /// Tag name
    fn tag_name(&self) -> PageResult<String> {
        expect_string(self.inspect(NodeQuery::TagName)?, "tag_name")
    }

    /// Field value as returned by the session
    fn value(&self) -> PageResult<Value> {
        self.inspect(NodeQuery::Value)
    }

    /// Attribute value
    fn attribute(&self, name: &str) -> PageResult<Option<String>> {
        match self.inspect(NodeQuery::Attribute(name.to_string()))? {
            Value::Null => Ok(None),
            other => expect_string(other, "attribute").map(Some),
        }
    }

    /// Whether an attribute is present
    fn has_attribute(&self, name: &str) -> PageResult<bool> {
        expect_bool(
            self.inspect(NodeQuery::HasAttribute(name.to_string()))?,
            "has_attribute",
        )
    }

    /// Whether the node has a class
    fn has_class(&self, class: &str) -> PageResult<bool> {
        expect_bool(self.inspect(NodeQuery::HasClass(class.to_string()))?, "has_class")
    }

    /// Whether the node is visible
    fn is_visible(&self) -> PageResult<bool> {
        expect_bool(self.inspect(NodeQuery::IsVisible)?, "is_visible")
    }

    /// Whether a checkbox is checked
    fn is_checked(&self) -> PageResult<bool> {
        expect_bool(self.inspect(NodeQuery::IsChecked)?, "is_checked")
    }

    /// Whether an option is selected
    fn is_selected(&self) -> PageResult<bool> {
        expect_bool(self.inspect(NodeQuery::IsSelected)?, "is_selected")
    }
}

fn find_required<T: NodeOperations + ?Sized>(
    node: &T,
    kind: NamedKind,
    locator: &str,
) -> PageResult<NodeElement> {
    let selector = Selector::named(kind, locator);
    node.find(&selector)?.ok_or_else(|| PageError::ElementNotFound {
        name: format!("{kind} {locator}"),
        parameters: Parameters::new(),
        query: format!("{}={}", selector.engine(), selector.pattern()),
    })
}

fn expect_string(value: Value, what: &str) -> PageResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(PageError::session(format!(
            "expected a string for {what}, got {other}"
        ))),
    }
}

fn expect_bool(value: Value, what: &str) -> PageResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| PageError::session(format!("expected a bool for {what}, got {value}")))
}

/// A node found in the current document
#[derive(Clone)]
pub struct NodeElement {
    session: Rc<dyn Session>,
    handle: NodeHandle,
}

impl NodeElement {
    /// Wrap a handle returned by the session
    #[must_use]
    pub fn new(session: Rc<dyn Session>, handle: NodeHandle) -> Self {
        Self { session, handle }
    }

    /// The session handle
    #[must_use]
    pub const fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Query that found this node
    #[must_use]
    pub fn query(&self) -> &str {
        &self.handle.query
    }
}

impl fmt::Debug for NodeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeElement")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl NodeOperations for NodeElement {
    fn perform(&self, action: NodeAction) -> PageResult<()> {
        tracing::trace!(node = %self.handle.id, action = action.name(), "forwarding node action");
        self.session.perform(&self.handle, &action)
    }

    fn inspect(&self, query: NodeQuery) -> PageResult<Value> {
        self.session.inspect(&self.handle, &query)
    }

    fn find_all(&self, selector: &Selector) -> PageResult<Vec<NodeElement>> {
        let query = self.session.selectors().to_query(selector)?;
        tracing::trace!(node = %self.handle.id, %query, "searching below node");
        Ok(self
            .session
            .find_within(&self.handle, &query)?
            .into_iter()
            .map(|handle| Self::new(Rc::clone(&self.session), handle))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::{MockNode, MockSession};

    fn node(session: &Rc<MockSession>, id: &str) -> NodeElement {
        let handle = session
            .find_all(&format!("css=#{id}"))
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        NodeElement::new(Rc::clone(session) as Rc<dyn Session>, handle)
    }

    fn session() -> Rc<MockSession> {
        let session = MockSession::new();
        session.add_node(
            MockNode::new("email", "input")
                .matching("css=#email")
                .with_attribute("name", "email")
                .with_class("field"),
        );
        session.add_node(
            MockNode::new("terms", "input")
                .matching("css=#terms")
                .with_attribute("type", "checkbox"),
        );
        session.add_node(
            MockNode::new("title", "h1")
                .matching("css=#title")
                .with_text("Checkout")
                .with_html("<em>Checkout</em>"),
        );
        Rc::new(session)
    }

    mod action_tests {
        use super::*;

        #[test]
        fn test_action_names() {
            assert_eq!(NodeAction::Click.name(), "click");
            assert_eq!(NodeAction::SetValue("x".to_string()).name(), "set_value");
            assert_eq!(
                NodeAction::KeyPress {
                    key: "a".to_string(),
                    modifier: Some(KeyModifier::Ctrl)
                }
                .name(),
                "key_press"
            );
        }

        #[test]
        fn test_click_is_forwarded() {
            let session = session();
            node(&session, "title").click().unwrap();
            assert!(session.was_called("click:title"));
        }

        #[test]
        fn test_fill_sets_value() {
            let session = session();
            let email = node(&session, "email");
            email.fill("ada@example.com").unwrap();
            assert_eq!(email.value().unwrap(), Value::from("ada@example.com"));
        }

        #[test]
        fn test_check_and_uncheck() {
            let session = session();
            let terms = node(&session, "terms");
            assert!(!terms.is_checked().unwrap());
            terms.check().unwrap();
            assert!(terms.is_checked().unwrap());
            terms.uncheck().unwrap();
            assert!(!terms.is_checked().unwrap());
        }

        #[test]
        fn test_drag_to_records_target() {
            let session = session();
            node(&session, "title")
                .drag_to(&node(&session, "email"))
                .unwrap();
            assert!(session.was_called("drag_to:title"));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_text_and_html() {
            let session = session();
            let title = node(&session, "title");
            assert_eq!(title.text().unwrap(), "Checkout");
            assert_eq!(title.html().unwrap(), "<em>Checkout</em>");
            assert_eq!(title.tag_name().unwrap(), "h1");
        }

        #[test]
        fn test_attributes_and_classes() {
            let session = session();
            let email = node(&session, "email");
            assert_eq!(email.attribute("name").unwrap(), Some("email".to_string()));
            assert_eq!(email.attribute("placeholder").unwrap(), None);
            assert!(email.has_attribute("name").unwrap());
            assert!(email.has_class("field").unwrap());
            assert!(!email.has_class("hidden").unwrap());
        }

        #[test]
        fn test_visibility() {
            let session = session();
            assert!(node(&session, "title").is_visible().unwrap());
        }

        #[test]
        fn test_query_accessor() {
            let session = session();
            assert_eq!(node(&session, "title").query(), "css=#title");
        }
    }

    mod lookup_tests {
        use super::*;

        fn form_session() -> Rc<MockSession> {
            let session = MockSession::new()
                .with_node(MockNode::new("form", "form").matching("css=#form"))
                .with_node(
                    MockNode::new("email", "input")
                        .matching("named=field:Email")
                        .matching("named=id:email")
                        .inside("form"),
                )
                .with_node(
                    MockNode::new("terms", "input")
                        .matching("named=field:Terms")
                        .inside("form"),
                )
                .with_node(
                    MockNode::new("news", "input")
                        .matching("named=field:Newsletter")
                        .with_checked(true)
                        .inside("form"),
                )
                .with_node(
                    MockNode::new("country", "select")
                        .matching("named=field:Country")
                        .matching("named=select:Country")
                        .inside("form"),
                )
                .with_node(
                    MockNode::new("avatar", "input")
                        .matching("named=field:Avatar")
                        .inside("form"),
                )
                .with_node(MockNode::new("send", "button").matching("named=button:Send").inside("form"))
                .with_node(MockNode::new("help", "a").matching("named=link:Help").inside("form"))
                .with_node(MockNode::new("prices", "table").matching("named=table:Prices").inside("form"))
                .with_node(MockNode::new("outside", "a").matching("named=link:Home"));
            Rc::new(session)
        }

        fn form(session: &Rc<MockSession>) -> NodeElement {
            node(session, "form")
        }

        #[test]
        fn test_find_and_find_all_are_scoped() {
            let session = form_session();
            let form = form(&session);
            assert!(form.has(&Selector::named(NamedKind::Link, "Help")).unwrap());
            assert!(!form.has(&Selector::named(NamedKind::Link, "Home")).unwrap());
            assert_eq!(
                form.find_all(&Selector::named(NamedKind::Field, "Email")).unwrap().len(),
                1
            );
            assert!(form.find(&Selector::css("p")).unwrap().is_none());
        }

        #[test]
        fn test_find_by_id() {
            let session = form_session();
            let email = form(&session).find_by_id("email").unwrap().unwrap();
            assert_eq!(email.handle().id, "email");
            assert!(form(&session).find_by_id("missing").unwrap().is_none());
        }

        #[test]
        fn test_links() {
            let session = form_session();
            let form = form(&session);
            assert!(form.has_link("Help").unwrap());
            assert!(form.find_link("Help").unwrap().is_some());
            form.click_link("Help").unwrap();
            assert!(session.was_called("click:help"));
        }

        #[test]
        fn test_buttons() {
            let session = form_session();
            let form = form(&session);
            assert!(form.has_button("Send").unwrap());
            assert!(!form.has_button("Cancel").unwrap());
            assert!(form.find_button("Send").unwrap().is_some());
            form.press_button("Send").unwrap();
            assert!(session.was_called("press:send"));
        }

        #[test]
        fn test_fill_field() {
            let session = form_session();
            let form = form(&session);
            assert!(form.has_field("Email").unwrap());
            form.fill_field("Email", "ada@example.com").unwrap();
            assert_eq!(
                form.find_field("Email").unwrap().unwrap().value().unwrap(),
                Value::from("ada@example.com")
            );
        }

        #[test]
        fn test_checkbox_fields() {
            let session = form_session();
            let form = form(&session);
            assert!(form.has_unchecked_field("Terms").unwrap());
            assert!(!form.has_checked_field("Terms").unwrap());
            form.check_field("Terms").unwrap();
            assert!(form.has_checked_field("Terms").unwrap());

            assert!(form.has_checked_field("Newsletter").unwrap());
            form.uncheck_field("Newsletter").unwrap();
            assert!(form.has_unchecked_field("Newsletter").unwrap());

            assert!(!form.has_checked_field("Missing").unwrap());
            assert!(!form.has_unchecked_field("Missing").unwrap());
        }

        #[test]
        fn test_select_field_option() {
            let session = form_session();
            let form = form(&session);
            assert!(form.has_select("Country").unwrap());
            form.select_field_option("Country", "NL", false).unwrap();
            assert_eq!(session.node("country").unwrap().value, Value::from("NL"));
            form.select_field_option("Country", "BE", true).unwrap();
            form.select_field_option("Country", "DE", true).unwrap();
            assert_eq!(
                session.node("country").unwrap().value,
                serde_json::json!(["BE", "DE"])
            );
        }

        #[test]
        fn test_has_table() {
            let session = form_session();
            assert!(form(&session).has_table("Prices").unwrap());
            assert!(!form(&session).has_table("Stock").unwrap());
        }

        #[test]
        fn test_attach_file_to_field() {
            let session = form_session();
            form(&session)
                .attach_file_to_field("Avatar", "/tmp/me.png")
                .unwrap();
            assert_eq!(session.node("avatar").unwrap().value, Value::from("/tmp/me.png"));
        }

        #[test]
        fn test_missing_target_reports_named_query() {
            let session = form_session();
            match form(&session).fill_field("Phone", "1").unwrap_err() {
                PageError::ElementNotFound { name, parameters, query } => {
                    assert_eq!(name, "field Phone");
                    assert!(parameters.is_empty());
                    assert_eq!(query, "named=field:Phone");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(form(&session).press_button("Cancel").is_err());
            assert!(form(&session).click_link("Home").is_err());
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_expect_string_rejects_other_types() {
            assert!(expect_string(Value::Bool(true), "text").is_err());
            assert_eq!(expect_string(Value::from("a"), "text").unwrap(), "a");
        }

        #[test]
        fn test_expect_bool_rejects_other_types() {
            assert!(expect_bool(Value::from("true"), "is_visible").is_err());
            assert!(expect_bool(Value::Bool(true), "is_visible").unwrap());
        }
    }
}
