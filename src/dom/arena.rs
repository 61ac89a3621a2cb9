//! Arena-allocated DOM tree.
//!
//! Both directions of the HTML mapping go through this tree: html5ever
//! parses into it, and the serializer renders DOM-output templates into it
//! before it is written out as HTML.

use html5ever::{LocalName, Namespace, QualName, ns};

/// Index of a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomNodeId(pub u32);

impl DomNodeId {
    /// Sentinel for a missing link.
    pub const NONE: DomNodeId = DomNodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Payload of a DOM node.
#[derive(Debug, Clone)]
pub enum DomData {
    /// Root of the tree. Fragments produced by the serializer also hang
    /// off a document node.
    Document,
    Element {
        /// Boxed so the name keeps its address when the arena grows.
        name: Box<QualName>,
        attrs: Vec<DomAttribute>,
    },
    Text(String),
    Comment(String),
    Doctype,
}

/// An element attribute.
#[derive(Debug, Clone)]
pub struct DomAttribute {
    pub name: QualName,
    pub value: String,
}

impl DomAttribute {
    /// Attribute in the null namespace, which is where HTML attributes live.
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.into(),
        }
    }
}

/// A node in the arena with its tree links.
#[derive(Debug)]
pub struct DomNode {
    pub data: DomData,
    pub parent: DomNodeId,
    pub first_child: DomNodeId,
    pub last_child: DomNodeId,
    pub prev_sibling: DomNodeId,
    pub next_sibling: DomNodeId,
}

impl DomNode {
    fn new(data: DomData) -> Self {
        Self {
            data,
            parent: DomNodeId::NONE,
            first_child: DomNodeId::NONE,
            last_child: DomNodeId::NONE,
            prev_sibling: DomNodeId::NONE,
            next_sibling: DomNodeId::NONE,
        }
    }
}

/// Arena DOM. Links between nodes are indices into one vector.
#[derive(Debug)]
pub struct Dom {
    nodes: Vec<DomNode>,
    document: DomNodeId,
}

impl Dom {
    /// Create an empty tree holding only the document node.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: DomNodeId::NONE,
        };
        dom.document = dom.alloc(DomData::Document);
        dom
    }

    fn alloc(&mut self, data: DomData) -> DomNodeId {
        let id = DomNodeId(self.nodes.len() as u32);
        self.nodes.push(DomNode::new(data));
        id
    }

    pub fn document(&self) -> DomNodeId {
        self.document
    }

    pub fn get(&self, id: DomNodeId) -> Option<&DomNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: DomNodeId) -> Option<&mut DomNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds nothing but the document node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<DomAttribute>) -> DomNodeId {
        self.alloc(DomData::Element {
            name: Box::new(name),
            attrs,
        })
    }

    /// Create an element in the HTML namespace.
    pub fn create_html_element(&mut self, tag: &str, attrs: Vec<DomAttribute>) -> DomNodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        self.create_element(name, attrs)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> DomNodeId {
        self.alloc(DomData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> DomNodeId {
        self.alloc(DomData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self) -> DomNodeId {
        self.alloc(DomData::Doctype)
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// The child must be detached.
    pub fn append(&mut self, parent: DomNodeId, child: DomNodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(DomNodeId::NONE);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last_child;
            node.next_sibling = DomNodeId::NONE;
        }

        if let Some(last) = self.get_mut(last_child) {
            last.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert `new_node` directly before `sibling`.
    pub fn insert_before(&mut self, sibling: DomNodeId, new_node: DomNodeId) {
        let Some((parent, prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text, merging into the last child when that is a text node.
    pub fn append_text(&mut self, parent: DomNodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(DomNodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let DomData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Unlink a node from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: DomNodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = DomNodeId::NONE;
            node.prev_sibling = DomNodeId::NONE;
            node.next_sibling = DomNodeId::NONE;
        }
    }

    pub fn children(&self, parent: DomNodeId) -> Children<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(DomNodeId::NONE);
        Children {
            dom: self,
            current: first,
        }
    }

    pub fn parent(&self, id: DomNodeId) -> Option<DomNodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_some())
    }

    /// Depth-first search in document order.
    pub fn find<F>(&self, from: DomNodeId, predicate: F) -> Option<DomNodeId>
    where
        F: Fn(DomNodeId, &DomNode) -> bool,
    {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(id, node) {
                    return Some(id);
                }
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
            }
        }
        None
    }

    /// First element with the given local name.
    pub fn find_by_tag(&self, tag: &str) -> Option<DomNodeId> {
        self.find(self.document, |_, node| match &node.data {
            DomData::Element { name, .. } => name.local.as_ref() == tag,
            _ => false,
        })
    }

    /// The `<body>` element of a parsed document, if any.
    pub fn body(&self) -> Option<DomNodeId> {
        self.find_by_tag("body")
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    dom: &'a Dom,
    current: DomNodeId,
}

impl Iterator for Children<'_> {
    type Item = DomNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(DomNodeId::NONE);
        Some(id)
    }
}

/// Element accessors.
impl Dom {
    pub fn element_name(&self, id: DomNodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            DomData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn element_namespace(&self, id: DomNodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            DomData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    pub fn attrs(&self, id: DomNodeId) -> &[DomAttribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                DomData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn get_attr(&self, id: DomNodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    pub fn element_id(&self, id: DomNodeId) -> Option<&str> {
        self.get_attr(id, "id")
    }

    pub fn has_class(&self, id: DomNodeId, class: &str) -> bool {
        self.get_attr(id, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn is_element(&self, id: DomNodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, DomData::Element { .. }))
    }

    pub fn is_text(&self, id: DomNodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, DomData::Text(_)))
    }

    pub fn text_content(&self, id: DomNodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            DomData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Element children only, skipping text and comments.
    pub fn element_children(&self, id: DomNodeId) -> impl Iterator<Item = DomNodeId> + '_ {
        self.children(id).filter(|&c| self.is_element(c))
    }
}
