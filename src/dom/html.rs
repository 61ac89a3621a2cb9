//! HTML output for [`Dom`] trees.

use super::arena::{Dom, DomData, DomNodeId};

/// Elements written without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Write the children of `parent` as HTML.
pub fn inner_html(dom: &Dom, parent: DomNodeId) -> String {
    let mut out = String::new();
    for child in dom.children(parent) {
        write_node(dom, child, &mut out);
    }
    out
}

/// Write `id` and its subtree as HTML.
pub fn outer_html(dom: &Dom, id: DomNodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

fn write_node(dom: &Dom, id: DomNodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        DomData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        DomData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(attr.name.local.as_ref());
                out.push_str("=\"");
                out.push_str(&escape_html(&attr.value));
                out.push('"');
            }
            out.push('>');

            if is_void_element(tag) {
                return;
            }

            for child in dom.children(id) {
                write_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        DomData::Text(text) => out.push_str(&escape_html(text)),
        DomData::Comment(_) | DomData::Doctype => {}
    }
}

/// Escape special HTML characters in text and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            '\u{a0}' => result.push_str("&nbsp;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::dom::{DomAttribute, parse_html};

    #[test]
    fn test_nested_elements() {
        let mut dom = Dom::new();
        let p = dom.create_html_element("p", vec![]);
        let strong = dom.create_html_element("strong", vec![]);
        let text = dom.create_text("a < b");
        dom.append(dom.document(), p);
        dom.append(p, strong);
        dom.append(strong, text);

        assert_eq!(
            inner_html(&dom, dom.document()),
            "<p><strong>a &lt; b</strong></p>"
        );
    }

    #[test]
    fn test_void_elements_have_no_close_tag() {
        let mut dom = Dom::new();
        let p = dom.create_html_element("p", vec![]);
        let br = dom.create_html_element("br", vec![]);
        dom.append(p, br);

        assert_eq!(outer_html(&dom, p), "<p><br></p>");
    }

    #[test]
    fn test_attributes_are_escaped() {
        let mut dom = Dom::new();
        let ol = dom.create_html_element("ol", vec![DomAttribute::new("title", "\"x\" & y")]);

        assert_eq!(outer_html(&dom, ol), r#"<ol title="&quot;x&quot; &amp; y"></ol>"#);
    }

    proptest! {
        #[test]
        fn escaped_text_reparses_to_itself(text in "[a-zA-Z0-9 <>&\"']{1,40}") {
            let html = format!("<p>{}</p>", escape_html(&text));
            let dom = parse_html(&html);
            let p = dom.find_by_tag("p").unwrap();
            let child = dom.children(p).next().unwrap();
            prop_assert_eq!(dom.text_content(child), Some(text.as_str()));
        }
    }
}
