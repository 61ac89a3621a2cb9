//! Document nodes and fragments.

use serde_json::Value;

use super::attrs::Attrs;
use super::mark::Mark;
use super::node_type::NodeTypeId;
use super::schema::Schema;
use crate::error::{Error, Result};

/// A node in a document tree.
///
/// Text nodes carry their text and no content; all other nodes carry a
/// [`Fragment`] of children (empty for leaves).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    node_type: NodeTypeId,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
}

impl Node {
    /// Build a node without validating its content.
    pub(crate) fn new(node_type: NodeTypeId, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        Self {
            node_type,
            attrs,
            content,
            marks,
            text: None,
        }
    }

    pub(crate) fn new_text(node_type: NodeTypeId, text: String, marks: Vec<Mark>) -> Self {
        Self {
            node_type,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text),
        }
    }

    pub fn type_id(&self) -> NodeTypeId {
        self.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Text of a text node.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.child(index)
    }

    pub fn children(&self) -> &[Node] {
        self.content.children()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.text_content(),
        }
    }

    /// Size in document positions: text length for text, 1 for leaves,
    /// content size plus two for everything else.
    pub fn node_size(&self, schema: &Schema) -> usize {
        match &self.text {
            Some(text) => text.chars().count(),
            None if schema.node_type(self.node_type).is_leaf() => 1,
            None => self.content.size(schema) + 2,
        }
    }

    /// Same type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.node_type == other.node_type && self.attrs == other.attrs && self.marks == other.marks
    }

    /// Copy of this node with a different mark set.
    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// Copy of this node with different content.
    pub fn with_content(&self, content: Fragment) -> Node {
        Node {
            content,
            ..self.clone()
        }
    }

    pub(crate) fn with_text(&self, text: String) -> Node {
        Node {
            text: Some(text),
            ..self.clone()
        }
    }

    /// Check that this node and everything below it conforms to `schema`.
    pub fn check(&self, schema: &Schema) -> Result<()> {
        let node_type = schema.node_type(self.node_type);
        if let Some(text) = &self.text
            && text.is_empty()
        {
            return Err(Error::EmptyText);
        }
        node_type.check_content(schema, &self.content)?;
        node_type.check_attrs(&self.attrs)?;

        let mut set = Vec::new();
        for mark in &self.marks {
            schema.mark_type(mark.type_id()).check_attrs(mark.attrs())?;
            set = mark.add_to_set(&set, schema);
        }
        if !Mark::same_set(&set, &self.marks) {
            return Err(Error::InvalidMarks(node_type.name().to_string()));
        }

        self.content.children().iter().try_for_each(|c| c.check(schema))
    }
}

/// An ordered sequence of child nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    children: Vec<Node>,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment, joining adjacent text nodes with equal marks.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut children: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(last) = children.last_mut()
                && last.marks == node.marks
                && let (Some(a), Some(b)) = (last.text.as_mut(), node.text.as_ref())
            {
                a.push_str(b);
                continue;
            }
            children.push(node);
        }
        Self { children }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.children.last()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn size(&self, schema: &Schema) -> usize {
        self.children.iter().map(|c| c.node_size(schema)).sum()
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    /// Concatenate two fragments, joining text at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        let mut nodes = self.children.clone();
        nodes.extend(other.children.iter().cloned());
        Fragment::from_nodes(nodes)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.children.iter()
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}
