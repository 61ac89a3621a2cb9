//! Declarative node and mark specifications.
//!
//! Specs are plain data plus two kinds of closures: parse rules that map
//! HTML onto a type, and a `to_dom` constructor that maps a node or mark
//! back to a [`DomOutputSpec`] template.

use std::fmt;
use std::sync::Arc;

use super::attrs::AttrSpec;
use super::mark::Mark;
use super::node::Node;
use super::ordered_map::OrderedMap;
use crate::parser::ParseRule;
use crate::serializer::DomOutputSpec;

/// Renders a node to its output template.
pub type NodeToDom = Arc<dyn Fn(&Node) -> DomOutputSpec + Send + Sync>;

/// Renders a mark to its output template. The flag tells whether the
/// marked content is inline.
pub type MarkToDom = Arc<dyn Fn(&Mark, bool) -> DomOutputSpec + Send + Sync>;

/// Description of a node type.
#[derive(Clone, Default)]
pub struct NodeSpec {
    /// Content expression. `None` makes the node a leaf.
    pub content: Option<String>,
    /// Allowed marks: space-separated names or groups, `_` for all, or an
    /// empty string for none. Defaults to all marks for nodes with inline
    /// content and none otherwise.
    pub marks: Option<String>,
    /// Space-separated group names.
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    pub attrs: Vec<(String, AttrSpec)>,
    pub selectable: Option<bool>,
    pub draggable: bool,
    /// Code content keeps all whitespace when parsed.
    pub code: bool,
    pub defining: bool,
    pub isolating: bool,
    pub parse_dom: Vec<ParseRule>,
    pub to_dom: Option<NodeToDom>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, expr: &str) -> Self {
        self.content = Some(expr.to_string());
        self
    }

    pub fn marks(mut self, expr: &str) -> Self {
        self.marks = Some(expr.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.retain(|(n, _)| n != name);
        self.attrs.push((name.to_string(), spec));
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = Some(selectable);
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse_dom.push(rule);
        self
    }

    pub fn to_dom<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node) -> DomOutputSpec + Send + Sync + 'static,
    {
        self.to_dom = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("content", &self.content)
            .field("marks", &self.marks)
            .field("group", &self.group)
            .field("inline", &self.inline)
            .field("atom", &self.atom)
            .field("attrs", &self.attrs)
            .field("selectable", &self.selectable)
            .field("code", &self.code)
            .field("defining", &self.defining)
            .field("isolating", &self.isolating)
            .field("parse_dom", &self.parse_dom)
            .field("to_dom", &self.to_dom.is_some())
            .finish()
    }
}

/// Description of a mark type.
#[derive(Clone, Default)]
pub struct MarkSpec {
    pub attrs: Vec<(String, AttrSpec)>,
    /// Whether the mark extends to text typed at its end. Defaults to true.
    pub inclusive: Option<bool>,
    /// Marks this one excludes: space-separated names or groups, `_` for
    /// all, empty for none. Defaults to marks of the same type.
    pub excludes: Option<String>,
    pub group: Option<String>,
    /// Whether adjacent nodes with this mark share one rendered wrapper.
    /// Defaults to true.
    pub spanning: Option<bool>,
    pub parse_dom: Vec<ParseRule>,
    pub to_dom: Option<MarkToDom>,
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.retain(|(n, _)| n != name);
        self.attrs.push((name.to_string(), spec));
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    pub fn excludes(mut self, expr: &str) -> Self {
        self.excludes = Some(expr.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn spanning(mut self, spanning: bool) -> Self {
        self.spanning = Some(spanning);
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse_dom.push(rule);
        self
    }

    pub fn to_dom<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mark, bool) -> DomOutputSpec + Send + Sync + 'static,
    {
        self.to_dom = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for MarkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkSpec")
            .field("attrs", &self.attrs)
            .field("inclusive", &self.inclusive)
            .field("excludes", &self.excludes)
            .field("group", &self.group)
            .field("spanning", &self.spanning)
            .field("parse_dom", &self.parse_dom)
            .field("to_dom", &self.to_dom.is_some())
            .finish()
    }
}

/// Input to [`Schema::new`](super::Schema::new).
#[derive(Debug, Clone)]
pub struct SchemaSpec {
    pub nodes: OrderedMap<NodeSpec>,
    pub marks: OrderedMap<MarkSpec>,
    /// Name of the document's top node type. Defaults to `doc`.
    pub top_node: Option<String>,
}

impl SchemaSpec {
    pub fn new(nodes: OrderedMap<NodeSpec>, marks: OrderedMap<MarkSpec>) -> Self {
        Self {
            nodes,
            marks,
            top_node: None,
        }
    }

    pub fn with_top_node(mut self, name: &str) -> Self {
        self.top_node = Some(name.to_string());
        self
    }
}
