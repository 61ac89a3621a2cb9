//! html5ever `TreeSink` that builds a [`Dom`].

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::driver::ParseOpts;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, QualName, parse_document};

use super::arena::{Dom, DomAttribute, DomData, DomNodeId};

/// Parse an HTML string into a [`Dom`].
///
/// Fragments are fine: html5ever wraps them in `html`/`body` like a browser
/// would, so the content ends up under [`Dom::body`].
pub fn parse_html(html: &str) -> Dom {
    parse_document(DomSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Handle html5ever uses to refer to nodes under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkHandle(pub DomNodeId);

/// Tree sink with interior mutability, since `TreeSink` methods take `&self`.
pub struct DomSink {
    dom: RefCell<Dom>,
    quirks_mode: RefCell<QuirksMode>,
}

impl Default for DomSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DomSink {
    pub fn new() -> Self {
        Self {
            dom: RefCell::new(Dom::new()),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    pub fn into_dom(self) -> Dom {
        self.dom.into_inner()
    }

    fn insert(&self, parent: DomNodeId, child: NodeOrText<SinkHandle>) {
        let mut dom = self.dom.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => dom.append(parent, node.0),
            NodeOrText::AppendText(text) => dom.append_text(parent, &text),
        }
    }
}

impl TreeSink for DomSink {
    type Handle = SinkHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Lenient, like a browser handling pasted markup.
    }

    fn get_document(&self) -> Self::Handle {
        SinkHandle(self.dom.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static EMPTY: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };

        let dom = self.dom.borrow();
        match dom.get(target.0).map(|n| &n.data) {
            Some(DomData::Element { name, .. }) => {
                let name: &QualName = name;
                // SAFETY: the name is boxed, so pushing new nodes and growing
                // the arena does not move it. Nodes are never freed and names
                // are never rewritten while the sink is alive.
                unsafe { std::mem::transmute::<&QualName, &'a QualName>(name) }
            }
            _ => &EMPTY,
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .into_iter()
            .map(|a| DomAttribute {
                name: a.name,
                value: a.value.to_string(),
            })
            .collect();
        SinkHandle(self.dom.borrow_mut().create_element(name, attrs))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        SinkHandle(self.dom.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        SinkHandle(self.dom.borrow_mut().create_comment(String::new()))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.insert(parent.0, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self.dom.borrow().parent(element.0);
        match parent {
            Some(parent) => self.insert(parent, child),
            None => self.insert(prev_element.0, child),
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let mut dom = self.dom.borrow_mut();
        let doc = dom.document();
        let doctype = dom.create_doctype();
        dom.append(doc, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        let node = match new_node {
            NodeOrText::AppendNode(node) => node.0,
            NodeOrText::AppendText(text) => dom.create_text(text.to_string()),
        };
        dom.insert_before(sibling.0, node);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut dom = self.dom.borrow_mut();
        if let Some(node) = dom.get_mut(target.0)
            && let DomData::Element {
                attrs: existing, ..
            } = &mut node.data
        {
            for attr in attrs {
                if !existing.iter().any(|a| a.name == attr.name) {
                    existing.push(DomAttribute {
                        name: attr.name,
                        value: attr.value.to_string(),
                    });
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.dom.borrow_mut().detach(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut dom = self.dom.borrow_mut();
        let children: Vec<_> = dom.children(node.0).collect();
        for child in children {
            dom.detach(child);
            dom.append(new_parent.0, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_lands_in_body() {
        let dom = parse_html("<p>Hello</p>");
        let body = dom.body().expect("body");
        let p = dom.element_children(body).next().expect("p");
        assert_eq!(dom.element_name(p).unwrap().as_ref(), "p");

        let text = dom.children(p).next().expect("text");
        assert_eq!(dom.text_content(text), Some("Hello"));
    }

    #[test]
    fn test_attributes_survive() {
        let dom = parse_html(r#"<b style="font-weight:normal" class="x">t</b>"#);
        let b = dom.find_by_tag("b").unwrap();
        assert_eq!(dom.get_attr(b, "style"), Some("font-weight:normal"));
        assert!(dom.has_class(b, "x"));
    }

    #[test]
    fn test_names_survive_arena_growth() {
        // Each <li> start tag makes the tree builder re-read the names of
        // open elements created long before.
        let html = format!("<ul>{}</ul>", "<li>item".repeat(2000));
        let dom = parse_html(&html);
        let ul = dom.find_by_tag("ul").unwrap();
        let items: Vec<_> = dom.element_children(ul).collect();
        assert_eq!(items.len(), 2000);
        for item in items {
            assert_eq!(dom.element_name(item).unwrap().as_ref(), "li");
            assert_eq!(dom.element_children(item).count(), 0);
        }
    }

    #[test]
    fn test_misnested_markup_is_repaired() {
        let dom = parse_html("<b><i>one</b> two</i>");
        let body = dom.body().unwrap();
        let tags: Vec<_> = dom
            .element_children(body)
            .map(|c| dom.element_name(c).unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["b", "i"]);
    }
}
