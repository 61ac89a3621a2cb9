//! HTML side of the document mapping.
//!
//! An arena DOM that html5ever parses into and the serializer renders into,
//! plus the helpers parse rules need to inspect it: CSS selector matching
//! for tag rules and inline-style parsing for style rules.

mod arena;
mod html;
mod selector;
mod style;
mod tree_sink;

pub use arena::{Children, Dom, DomAttribute, DomData, DomNode, DomNodeId};
pub use html::{escape_html, inner_html, is_void_element, outer_html};
pub use selector::{ElementRef, RuleSelectors, TagSelector};
pub use style::{StyleDeclaration, parse_inline_style, style_value};
pub use tree_sink::{DomSink, parse_html};

/// Borrowed view of one element, handed to attribute extractors of tag
/// rules.
#[derive(Clone, Copy)]
pub struct DomElement<'a> {
    pub dom: &'a Dom,
    pub id: DomNodeId,
    style: &'a [StyleDeclaration],
}

impl<'a> DomElement<'a> {
    pub fn new(dom: &'a Dom, id: DomNodeId, style: &'a [StyleDeclaration]) -> Self {
        Self { dom, id, style }
    }

    /// Local tag name, lowercase.
    pub fn tag(&self) -> &'a str {
        self.dom
            .element_name(self.id)
            .map(|n| n.as_ref())
            .unwrap_or("")
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.dom.get_attr(self.id, name)
    }

    /// Inline style value for `property`, like `element.style[property]`.
    pub fn style(&self, property: &str) -> Option<&'a str> {
        style_value(self.style, property)
    }

    pub fn style_declarations(&self) -> &'a [StyleDeclaration] {
        self.style
    }
}

impl std::fmt::Debug for DomElement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomElement")
            .field("tag", &self.tag())
            .field("style", &self.style)
            .finish()
    }
}
