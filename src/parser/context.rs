//! The state of a single parse.
//!
//! The context keeps a stack of open nodes. `open` points at the node that
//! currently receives content; nodes above it are finished but not yet
//! closed, and are closed lazily the next time content is placed.

use tracing::{debug, trace};

use super::{DomParser, RuleMatch, RuleTarget, WhitespaceMode};
use crate::dom::{
    Dom, DomData, DomElement, DomNodeId, StyleDeclaration, parse_inline_style, style_value,
};
use crate::error::Result;
use crate::model::{Attrs, ContentMatch, Fragment, Mark, Node, NodeType, NodeTypeId, Schema};

/// Elements that close an open inline context when they carry no rule.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "canvas",
    "dd",
    "div",
    "dl",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "li",
    "noscript",
    "ol",
    "output",
    "p",
    "pre",
    "section",
    "table",
    "tfoot",
    "ul",
];

/// Element nesting read with rules. Deeper wrappers are lifted: their text
/// and childless elements are added in place.
const MAX_DEPTH: usize = 256;

/// Elements dropped with their content when no rule matches them.
const IGNORE_TAGS: &[&str] = &[
    "head", "noscript", "object", "script", "style", "template", "title",
];

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0c')
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if is_ws(c) {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

fn whitespace_for(node_type: &NodeType, rule: Option<WhitespaceMode>, base: WhitespaceMode) -> WhitespaceMode {
    match rule {
        Some(mode) => mode,
        None if node_type.whitespace_pre() => WhitespaceMode::Full,
        None => base,
    }
}

struct NodeContext<'s> {
    /// Identity of this context, stable while the stack changes.
    serial: u32,
    node_type: NodeTypeId,
    attrs: Attrs,
    marks: Vec<Mark>,
    /// Opened by a rule rather than as a wrapper.
    solid: bool,
    content_match: Option<ContentMatch<'s>>,
    whitespace: WhitespaceMode,
    content: Vec<Node>,
}

impl<'s> NodeContext<'s> {
    fn find_wrapping(&self, node_type: NodeTypeId) -> Option<Vec<NodeTypeId>> {
        self.content_match?.find_wrapping(node_type)
    }

    fn inline_context(&self, schema: &Schema) -> bool {
        schema.node_type(self.node_type).inline_content()
    }

    fn finish(self, open_end: bool) -> Node {
        let mut content = self.content;
        if self.whitespace == WhitespaceMode::Collapse
            && let Some(text) = content.last().and_then(Node::text)
        {
            let trimmed = text.trim_end_matches(is_ws).to_string();
            if trimmed.len() != text.len()
                && let Some(last) = content.pop()
                && !trimmed.is_empty()
            {
                content.push(last.with_text(trimmed));
            }
        }

        let mut fragment = Fragment::from_nodes(content);
        if !open_end
            && let Some(m) = self.content_match
            && let Some(fill) = m.fill_before(&Fragment::empty(), true, 0)
        {
            fragment = fragment.append(&fill);
        }
        Node::new(self.node_type, self.attrs, fragment, self.marks)
    }
}

pub(super) struct ParseContext<'p, 's> {
    parser: &'p DomParser<'s>,
    schema: &'s Schema,
    dom: &'p Dom,
    nodes: Vec<NodeContext<'s>>,
    open: usize,
    next_serial: u32,
    /// Inside a `<pre>` or `white-space: pre` element.
    local_preserve_ws: bool,
    /// Elements currently being read.
    depth: usize,
}

impl<'p, 's> ParseContext<'p, 's> {
    pub(super) fn new(
        parser: &'p DomParser<'s>,
        dom: &'p Dom,
        top: NodeTypeId,
        whitespace: WhitespaceMode,
    ) -> Result<Self> {
        let schema = parser.schema();
        let top_type = schema.node_type(top);
        let rule_ws = (whitespace != WhitespaceMode::Collapse).then_some(whitespace);
        let root = NodeContext {
            serial: 0,
            node_type: top,
            attrs: top_type.compute_attrs(None)?,
            marks: Vec::new(),
            solid: true,
            content_match: Some(schema.content_match(top)),
            whitespace: whitespace_for(top_type, rule_ws, WhitespaceMode::Collapse),
            content: Vec::new(),
        };
        Ok(Self {
            parser,
            schema,
            dom,
            nodes: vec![root],
            open: 0,
            next_serial: 1,
            local_preserve_ws: false,
            depth: 0,
        })
    }

    fn top(&self) -> &NodeContext<'s> {
        &self.nodes[self.open]
    }

    fn tag_name(&self, id: DomNodeId) -> &'p str {
        self.dom.element_name(id).map(|n| n.as_ref()).unwrap_or("")
    }

    /// Add every child of `parent`.
    pub(super) fn add_all(&mut self, parent: DomNodeId, marks: &[Mark]) {
        let children: Vec<_> = self.dom.children(parent).collect();
        for child in children {
            self.add_dom(child, marks);
        }
    }

    fn add_dom(&mut self, id: DomNodeId, marks: &[Mark]) {
        let Some(node) = self.dom.get(id) else {
            return;
        };
        match &node.data {
            DomData::Text(text) => {
                let prev = Some(node.prev_sibling).filter(|p| p.is_some());
                self.add_text(text, prev, marks);
            }
            DomData::Element { .. } => self.add_element(id, marks, None),
            DomData::Document | DomData::Comment(_) | DomData::Doctype => {}
        }
    }

    fn add_text(&mut self, value: &str, prev_sibling: Option<DomNodeId>, marks: &[Mark]) {
        let top = self.top();
        let mode = match top.whitespace {
            WhitespaceMode::Full => WhitespaceMode::Full,
            WhitespaceMode::Preserve => WhitespaceMode::Preserve,
            WhitespaceMode::Collapse if self.local_preserve_ws => WhitespaceMode::Preserve,
            WhitespaceMode::Collapse => WhitespaceMode::Collapse,
        };

        if !(mode == WhitespaceMode::Full
            || top.inline_context(self.schema)
            || value.chars().any(|c| !is_ws(c)))
        {
            trace!("dropping whitespace outside inline content");
            return;
        }

        let value = match mode {
            WhitespaceMode::Collapse => {
                let mut value = collapse_whitespace(value);
                if value.starts_with(' ') && self.open == self.nodes.len() - 1 {
                    let node_before = top.content.last();
                    let after_br = prev_sibling.is_some_and(|p| self.tag_name(p) == "br");
                    let strip = match node_before {
                        None => true,
                        Some(node) => {
                            after_br || node.text().is_some_and(|t| t.ends_with(is_ws))
                        }
                    };
                    if strip {
                        value.remove(0);
                    }
                }
                value
            }
            WhitespaceMode::Preserve => value.replace("\r\n", " ").replace(['\n', '\r'], " "),
            WhitespaceMode::Full => value.replace("\r\n", "\n").replace('\r', "\n"),
        };

        if value.is_empty() {
            return;
        }
        let whitespace_only = !value.chars().any(|c| !is_ws(c));
        if let Ok(text) = self.schema.text(&value, Vec::new()) {
            self.insert_node(text, marks, whitespace_only);
        }
    }

    fn add_element(&mut self, id: DomNodeId, marks: &[Mark], match_after: Option<usize>) {
        if self.depth >= MAX_DEPTH {
            self.add_lifted(id, marks);
            return;
        }
        self.depth += 1;
        self.read_element(id, marks, match_after);
        self.depth -= 1;
    }

    /// Add the content of `id` without reading its element structure.
    fn add_lifted(&mut self, id: DomNodeId, marks: &[Mark]) {
        trace!(tag = self.tag_name(id), "nesting too deep, lifting content");
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.dom.get(id) else {
                continue;
            };
            match &node.data {
                DomData::Text(text) => {
                    let prev = Some(node.prev_sibling).filter(|p| p.is_some());
                    self.add_text(text, prev, marks);
                }
                DomData::Element { .. } if IGNORE_TAGS.contains(&self.tag_name(id)) => {}
                DomData::Element { .. } if self.dom.children(id).next().is_none() => {
                    self.read_element(id, marks, None);
                }
                DomData::Element { .. } => {
                    let children: Vec<_> = self.dom.children(id).collect();
                    stack.extend(children.into_iter().rev());
                }
                DomData::Document | DomData::Comment(_) | DomData::Doctype => {}
            }
        }
    }

    fn read_element(&mut self, id: DomNodeId, marks: &[Mark], match_after: Option<usize>) {
        let outer_ws = self.local_preserve_ws;
        let parser = self.parser;
        let name = self.tag_name(id);
        let style = self
            .dom
            .get_attr(id, "style")
            .map(parse_inline_style)
            .unwrap_or_default();

        if name == "pre" || style_value(&style, "white-space").is_some_and(|v| v.contains("pre")) {
            self.local_preserve_ws = true;
        }

        let element = DomElement::new(self.dom, id, &style);
        let rule = parser.match_tag_after(&element, match_after);

        let ignored = match &rule {
            Some(m) => m.rule.ignore,
            None => IGNORE_TAGS.contains(&name),
        };
        let skip = rule.as_ref().is_some_and(|m| m.rule.skip);

        if ignored {
            trace!(tag = name, "ignoring element");
            self.ignore_fallback(id, marks);
        } else if let Some(rule) = rule.filter(|m| !m.rule.skip) {
            if let Some(inner) = self.read_styles(&style, marks) {
                let continue_after = (!rule.rule.consuming).then_some(rule.index);
                self.add_element_by_rule(id, rule, inner, continue_after);
            }
        } else {
            let mut sync_to = None;
            if BLOCK_TAGS.contains(&name) {
                let top = self.top();
                if top
                    .content
                    .first()
                    .is_some_and(|n| self.schema.node_type(n.type_id()).is_inline())
                    && self.open > 0
                {
                    self.open -= 1;
                }
                sync_to = Some(self.top().serial);
            } else if self.dom.children(id).next().is_none() {
                self.leaf_fallback(id, marks);
                self.local_preserve_ws = outer_ws;
                return;
            }

            let inner = if skip {
                Some(marks.to_vec())
            } else {
                self.read_styles(&style, marks)
            };
            if let Some(inner) = inner {
                self.add_all(id, &inner);
            }
            if let Some(serial) = sync_to {
                self.sync(serial);
            }
        }

        self.local_preserve_ws = outer_ws;
    }

    /// A `<br>` that turned out not to be a node becomes a newline.
    fn leaf_fallback(&mut self, id: DomNodeId, marks: &[Mark]) {
        if self.tag_name(id) == "br"
            && self.top().inline_context(self.schema)
            && self.dom.parent(id).is_some()
        {
            self.add_text("\n", None, marks);
        }
    }

    /// An ignored `<br>` still opens an inline context.
    fn ignore_fallback(&mut self, id: DomNodeId, marks: &[Mark]) {
        if self.tag_name(id) == "br"
            && !self.top().inline_context(self.schema)
            && let Ok(text) = self.schema.text("-", Vec::new())
        {
            self.find_place(text.type_id(), marks, true);
        }
    }

    /// Apply style rules to `marks`. `None` means a rule asked for the
    /// element to be ignored.
    fn read_styles(&self, style: &[StyleDeclaration], marks: &[Mark]) -> Option<Vec<Mark>> {
        let mut marks = marks.to_vec();
        if style.is_empty() {
            return Some(marks);
        }

        for property in self.parser.matched_styles() {
            let Some(value) = style_value(style, property) else {
                continue;
            };
            let mut after = None;
            while let Some(m) = self.parser.match_style_after(property, value, after) {
                if m.rule.ignore {
                    return None;
                }
                if let RuleTarget::Mark(mark_type) = m.target {
                    match self.schema.mark_type(mark_type).create(Some(&m.attrs)) {
                        Ok(mark) => marks.push(mark),
                        Err(e) => debug!(%e, property, "cannot create mark from style"),
                    }
                }
                if m.rule.consuming {
                    break;
                }
                after = Some(m.index);
            }
        }
        Some(marks)
    }

    fn add_element_by_rule(
        &mut self,
        id: DomNodeId,
        rule: RuleMatch<'p>,
        mut marks: Vec<Mark>,
        continue_after: Option<usize>,
    ) {
        let mut sync_to = None;
        let mut leaf = false;

        match rule.target {
            RuleTarget::Node(node_type) => {
                let nt = self.schema.node_type(node_type);
                if !nt.is_leaf() {
                    if let Some(inner) = self.enter(node_type, &rule.attrs, &marks, rule.rule.preserve_whitespace) {
                        sync_to = Some(self.top().serial);
                        marks = inner;
                    }
                } else {
                    leaf = true;
                    let cautious = self.tag_name(id) == "br";
                    match nt.create(self.schema, Some(&rule.attrs), Fragment::empty(), &[]) {
                        Ok(node) => {
                            if !self.insert_node(node, &marks, cautious) {
                                self.leaf_fallback(id, &marks);
                            }
                        }
                        Err(e) => debug!(%e, node_type = nt.name(), "cannot create leaf"),
                    }
                }
            }
            RuleTarget::Mark(mark_type) => {
                match self.schema.mark_type(mark_type).create(Some(&rule.attrs)) {
                    Ok(mark) => marks.push(mark),
                    Err(e) => debug!(%e, "cannot create mark"),
                }
            }
        }

        if !leaf {
            match continue_after {
                Some(after) => self.add_element(id, &marks, Some(after)),
                None => self.add_all(id, &marks),
            }
        }

        if let Some(serial) = sync_to
            && self.sync(serial)
        {
            self.open -= 1;
        }
    }

    /// Find the context that can take a node of `node_type`, possibly via
    /// wrappers, make it current and open the wrappers. Returns the marks
    /// left after the wrappers took the ones they allow.
    fn find_place(&mut self, node_type: NodeTypeId, marks: &[Mark], cautious: bool) -> Option<Vec<Mark>> {
        let mut route: Option<(Vec<NodeTypeId>, u32)> = None;
        let mut penalty = 0;
        for depth in (0..=self.open).rev() {
            let cx = &self.nodes[depth];
            if let Some(found) = cx.find_wrapping(node_type)
                && route
                    .as_ref()
                    .is_none_or(|(r, _)| r.len() > found.len() + penalty)
            {
                let direct = found.is_empty();
                route = Some((found, cx.serial));
                if direct {
                    break;
                }
            }
            if cx.solid {
                if cautious {
                    break;
                }
                penalty += 2;
            }
        }

        let (route, serial) = route?;
        if !route.is_empty() {
            trace!(
                node = self.schema.node_type(node_type).name(),
                wrappers = ?route.iter().map(|t| self.schema.node_type(*t).name()).collect::<Vec<_>>(),
                "wrapping node"
            );
        }
        self.sync(serial);
        let mut marks = marks.to_vec();
        for wrapper in route {
            marks = self.enter_inner(wrapper, None, marks, false, None);
        }
        Some(marks)
    }

    fn insert_node(&mut self, node: Node, marks: &[Mark], cautious: bool) -> bool {
        let Some(inner) = self.find_place(node.type_id(), marks, cautious) else {
            debug!(
                node = self.schema.node_type(node.type_id()).name(),
                "dropping node that fits nowhere"
            );
            return false;
        };

        self.close_extra(false);
        let schema = self.schema;
        let top = &mut self.nodes[self.open];
        top.content_match = top.content_match.and_then(|m| m.match_type(node.type_id()));
        let top_type = schema.node_type(top.node_type);

        let mut node_marks = Vec::new();
        for mark in inner.iter().chain(node.marks()) {
            if top_type.allows_mark_type(mark.type_id()) {
                node_marks = mark.add_to_set(&node_marks, schema);
            }
        }
        top.content.push(node.with_marks(node_marks));
        true
    }

    fn enter(
        &mut self,
        node_type: NodeTypeId,
        attrs: &Attrs,
        marks: &[Mark],
        preserve_ws: Option<WhitespaceMode>,
    ) -> Option<Vec<Mark>> {
        let nt = self.schema.node_type(node_type);
        let attrs = match nt.compute_attrs(Some(attrs)) {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!(%e, node_type = nt.name(), "cannot create node");
                return None;
            }
        };
        self.find_place(node_type, marks, false)?;
        Some(self.enter_inner(node_type, Some(attrs), marks.to_vec(), true, preserve_ws))
    }

    fn enter_inner(
        &mut self,
        node_type: NodeTypeId,
        attrs: Option<Attrs>,
        marks: Vec<Mark>,
        solid: bool,
        preserve_ws: Option<WhitespaceMode>,
    ) -> Vec<Mark> {
        self.close_extra(false);
        let schema = self.schema;
        let nt = schema.node_type(node_type);
        let top = &mut self.nodes[self.open];
        top.content_match = top.content_match.and_then(|m| m.match_type(node_type));
        let whitespace = whitespace_for(nt, preserve_ws, top.whitespace);
        let top_type = schema.node_type(top.node_type);

        let mut applied = Vec::new();
        let mut rest = Vec::new();
        for mark in marks {
            if top_type.allows_mark_type(mark.type_id()) {
                applied = mark.add_to_set(&applied, schema);
            } else {
                rest.push(mark);
            }
        }

        let attrs = attrs.unwrap_or_else(|| nt.default_attrs().cloned().unwrap_or_default());
        self.nodes.push(NodeContext {
            serial: self.next_serial,
            node_type,
            attrs,
            marks: applied,
            solid,
            content_match: Some(nt.content_match(schema)),
            whitespace,
            content: Vec::new(),
        });
        self.next_serial += 1;
        self.open += 1;
        rest
    }

    /// Close every node above `open`.
    fn close_extra(&mut self, open_end: bool) {
        while self.nodes.len() > self.open + 1 {
            let Some(cx) = self.nodes.pop() else {
                break;
            };
            let node = cx.finish(open_end);
            if let Some(parent) = self.nodes.last_mut() {
                parent.content.push(node);
            }
        }
    }

    /// Make the context with `serial` current.
    fn sync(&mut self, serial: u32) -> bool {
        for i in (0..=self.open).rev() {
            if self.nodes[i].serial == serial {
                self.open = i;
                return true;
            }
            if self.local_preserve_ws && self.nodes[i].whitespace == WhitespaceMode::Collapse {
                self.nodes[i].whitespace = WhitespaceMode::Preserve;
            }
        }
        false
    }

    pub(super) fn finish(mut self) -> Node {
        self.open = 0;
        self.close_extra(false);
        match self.nodes.pop() {
            Some(root) => root.finish(false),
            None => unreachable!("the root context stays on the stack"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor;
    use crate::model::{MarkSpec, NodeSpec, OrderedMap, SchemaSpec};
    use crate::parser::{ParseOptions, ParseRule};

    /// `doc(gallery(rule))` style outline of a node tree.
    fn outline(schema: &Schema, node: &Node) -> String {
        let name = schema.node_type(node.type_id()).name();
        if let Some(text) = node.text() {
            return format!("{text:?}");
        }
        if node.child_count() == 0 {
            return name.to_string();
        }
        let children: Vec<_> = node.children().iter().map(|c| outline(schema, c)).collect();
        format!("{name}({})", children.join(", "))
    }

    fn gallery_schema() -> Schema {
        let nodes: OrderedMap<NodeSpec> = [
            ("doc", NodeSpec::new().content("block+")),
            (
                "para",
                NodeSpec::new()
                    .content("text*")
                    .group("block")
                    .parse_rule(ParseRule::tag("p")),
            ),
            (
                "gallery",
                NodeSpec::new()
                    .content("rule+")
                    .group("block")
                    .parse_rule(ParseRule::tag("div.gallery")),
            ),
            ("rule", NodeSpec::new().parse_rule(ParseRule::tag("hr"))),
            ("text", NodeSpec::new()),
        ]
        .into_iter()
        .collect();
        Schema::new(SchemaSpec::new(nodes, OrderedMap::<MarkSpec>::new())).unwrap()
    }

    #[test]
    fn test_whitespace_does_not_escape_solid_node() {
        let s = gallery_schema();
        let parser = DomParser::from_schema(&s).unwrap();
        let options = ParseOptions {
            preserve_whitespace: WhitespaceMode::Full,
            ..Default::default()
        };
        let doc = parser
            .parse("<div class=\"gallery\">  <hr>\n</div>", &options)
            .unwrap();
        assert_eq!(outline(&s, &doc), "doc(gallery(rule))");
    }

    #[test]
    fn test_text_still_wraps_past_solid_node() {
        let s = gallery_schema();
        let parser = DomParser::from_schema(&s).unwrap();
        let doc = parser
            .parse("<div class=\"gallery\"><hr>caption</div>", &ParseOptions::default())
            .unwrap();
        assert_eq!(outline(&s, &doc), "doc(gallery(rule), para(\"caption\"))");
    }

    #[test]
    fn test_deep_wrappers_are_lifted() {
        let depth = MAX_DEPTH + 50;
        let html = format!(
            "<p><em>{}a<br>b{}</em></p>",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let s = editor::schema();
        let doc = editor::parser().parse(&html, &ParseOptions::default()).unwrap();
        assert_eq!(outline(s, &doc), "doc(paragraph(\"a\", hard_break, \"b\"))");

        let para = doc.child(0).unwrap();
        let em = s.mark_type_by_name("em").unwrap().id();
        for child in para.children() {
            assert!(child.marks().iter().any(|m| m.type_id() == em));
        }
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b"), "a b");
        assert_eq!(collapse_whitespace("\n\nx\x0c"), " x ");
        assert_eq!(collapse_whitespace("\u{a0}"), "\u{a0}");
    }

    #[test]
    fn test_tag_tables() {
        assert!(BLOCK_TAGS.contains(&"div"));
        assert!(!BLOCK_TAGS.contains(&"span"));
        assert!(IGNORE_TAGS.contains(&"script"));
    }
}
