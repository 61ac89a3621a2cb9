//! Document to DOM conversion.
//!
//! Node and mark specs describe their HTML form as a [`DomOutputSpec`]
//! template. The serializer instantiates those templates into a [`Dom`],
//! which can then be written out with [`inner_html`].

use std::collections::HashMap;

use crate::dom::{Dom, DomAttribute, DomNodeId, inner_html};
use crate::error::{Error, Result};
use crate::model::{Fragment, Mark, MarkToDom, MarkTypeId, Node, NodeToDom, NodeTypeId, Schema};

/// Template describing the DOM produced for a node or mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomOutputSpec {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<DomOutputSpec>,
    },
    Text(String),
    /// Where the node's content goes. Must be the only child of its parent
    /// element.
    Hole,
}

impl DomOutputSpec {
    pub fn element(tag: &str) -> Self {
        DomOutputSpec::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        DomOutputSpec::Text(text.to_string())
    }

    /// Add an attribute. No effect on text and holes.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        if let DomOutputSpec::Element { attrs, .. } = &mut self {
            attrs.push((name.to_string(), value.into()));
        }
        self
    }

    /// Add a child. No effect on text and holes.
    pub fn child(mut self, child: DomOutputSpec) -> Self {
        if let DomOutputSpec::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Add a content hole.
    pub fn with_hole(self) -> Self {
        self.child(DomOutputSpec::Hole)
    }
}

/// Result of rendering a template: the outer node and, if the template had
/// a hole, the element that receives content.
#[derive(Debug, Clone, Copy)]
pub struct Rendered {
    pub dom: DomNodeId,
    pub content_dom: Option<DomNodeId>,
}

/// Instantiate `spec` in `dom`. The result is detached.
pub fn render_spec(dom: &mut Dom, spec: &DomOutputSpec) -> Result<Rendered> {
    match spec {
        DomOutputSpec::Text(text) => Ok(Rendered {
            dom: dom.create_text(text.as_str()),
            content_dom: None,
        }),
        DomOutputSpec::Hole => Err(Error::Serialize(
            "template".into(),
            "content hole must be inside an element".into(),
        )),
        DomOutputSpec::Element {
            tag,
            attrs,
            children,
        } => {
            let attrs = attrs
                .iter()
                .map(|(name, value)| DomAttribute::new(name, value.as_str()))
                .collect();
            let element = dom.create_html_element(tag, attrs);
            let mut content_dom = None;

            for child in children {
                if *child == DomOutputSpec::Hole {
                    if children.len() > 1 {
                        return Err(Error::Serialize(
                            tag.clone(),
                            "content hole must be the only child of its parent node".into(),
                        ));
                    }
                    return Ok(Rendered {
                        dom: element,
                        content_dom: Some(element),
                    });
                }

                let inner = render_spec(dom, child)?;
                dom.append(element, inner.dom);
                if let Some(hole) = inner.content_dom {
                    if content_dom.is_some() {
                        return Err(Error::Serialize(
                            tag.clone(),
                            "multiple content holes".into(),
                        ));
                    }
                    content_dom = Some(hole);
                }
            }

            Ok(Rendered {
                dom: element,
                content_dom,
            })
        }
    }
}

/// Serializer holding the `to_dom` constructors of one schema.
pub struct DomSerializer<'s> {
    schema: &'s Schema,
    nodes: HashMap<NodeTypeId, NodeToDom>,
    marks: HashMap<MarkTypeId, MarkToDom>,
}

impl std::fmt::Debug for DomSerializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomSerializer")
            .field("nodes", &self.nodes.len())
            .field("marks", &self.marks.len())
            .finish()
    }
}

impl<'s> DomSerializer<'s> {
    pub fn from_schema(schema: &'s Schema) -> Self {
        let nodes = schema
            .node_types()
            .iter()
            .filter_map(|t| t.spec().to_dom.clone().map(|f| (t.id(), f)))
            .collect();
        let marks = schema
            .mark_types()
            .iter()
            .filter_map(|t| t.spec().to_dom.clone().map(|f| (t.id(), f)))
            .collect();
        Self {
            schema,
            nodes,
            marks,
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Serialize a fragment into the document node of a fresh [`Dom`].
    pub fn serialize_fragment(&self, fragment: &Fragment) -> Result<Dom> {
        let mut dom = Dom::new();
        let target = dom.document();
        self.serialize_fragment_into(&mut dom, fragment, target)?;
        Ok(dom)
    }

    /// Serialize a node, with its marks, into the document node of a fresh
    /// [`Dom`].
    pub fn serialize_node(&self, node: &Node) -> Result<Dom> {
        let mut dom = Dom::new();
        let mut rendered = self.serialize_node_inner(&mut dom, node)?;
        for mark in node.marks().iter().rev() {
            if let Some(wrap) = self.serialize_mark(&mut dom, mark, self.is_inline(node))? {
                dom.append(wrap.content_dom.unwrap_or(wrap.dom), rendered);
                rendered = wrap.dom;
            }
        }
        let document = dom.document();
        dom.append(document, rendered);
        Ok(dom)
    }

    /// Fragment as an HTML string.
    pub fn to_html(&self, fragment: &Fragment) -> Result<String> {
        let dom = self.serialize_fragment(fragment)?;
        Ok(inner_html(&dom, dom.document()))
    }

    fn is_inline(&self, node: &Node) -> bool {
        self.schema.node_type(node.type_id()).is_inline()
    }

    pub fn serialize_fragment_into(
        &self,
        dom: &mut Dom,
        fragment: &Fragment,
        target: DomNodeId,
    ) -> Result<()> {
        let mut top = target;
        // Open mark wrappers, each with the element it was appended to.
        let mut active: Vec<(&Mark, DomNodeId)> = Vec::new();

        for node in fragment {
            if !active.is_empty() || !node.marks().is_empty() {
                let marks = node.marks();
                let mut keep = 0;
                let mut rendered = 0;
                while keep < active.len() && rendered < marks.len() {
                    let next = &marks[rendered];
                    if !self.marks.contains_key(&next.type_id()) {
                        rendered += 1;
                        continue;
                    }
                    if next != active[keep].0 || !self.schema.mark_type(next.type_id()).spanning() {
                        break;
                    }
                    keep += 1;
                    rendered += 1;
                }

                while keep < active.len() {
                    if let Some((_, parent)) = active.pop() {
                        top = parent;
                    }
                }

                while rendered < marks.len() {
                    let add = &marks[rendered];
                    rendered += 1;
                    if let Some(wrap) = self.serialize_mark(dom, add, self.is_inline(node))? {
                        active.push((add, top));
                        dom.append(top, wrap.dom);
                        top = wrap.content_dom.unwrap_or(wrap.dom);
                    }
                }
            }

            let rendered = self.serialize_node_inner(dom, node)?;
            dom.append(top, rendered);
        }
        Ok(())
    }

    fn serialize_node_inner(&self, dom: &mut Dom, node: &Node) -> Result<DomNodeId> {
        if let Some(text) = node.text() {
            return Ok(dom.create_text(text));
        }

        let node_type = self.schema.node_type(node.type_id());
        let to_dom = self.nodes.get(&node.type_id()).ok_or_else(|| {
            Error::Serialize(node_type.name().to_string(), "no to_dom for node type".into())
        })?;

        let rendered = render_spec(dom, &to_dom(node))?;
        if let Some(content_dom) = rendered.content_dom {
            if node_type.is_leaf() {
                return Err(Error::Serialize(
                    node_type.name().to_string(),
                    "content hole not allowed in a leaf node spec".into(),
                ));
            }
            self.serialize_fragment_into(dom, node.content(), content_dom)?;
        }
        Ok(rendered.dom)
    }

    /// Render a mark wrapper. Marks without `to_dom` render nothing.
    fn serialize_mark(&self, dom: &mut Dom, mark: &Mark, inline: bool) -> Result<Option<Rendered>> {
        match self.marks.get(&mark.type_id()) {
            Some(to_dom) => render_spec(dom, &to_dom(mark, inline)).map(Some),
            None => Ok(None),
        }
    }
}
