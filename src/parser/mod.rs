//! HTML to document conversion.
//!
//! A [`DomParser`] holds the parse rules gathered from every node and mark
//! spec of a schema, sorted by priority. Parsing walks the DOM, matches each
//! element against the rules and fits the resulting nodes into the schema's
//! content model, inserting wrapper nodes where needed.

mod context;
mod rule;

pub use rule::{AttrExtractor, AttrMatch, ElementAttrs, ParseRule, RuleSelector, StyleAttrs};

use tracing::debug;

use crate::dom::{Dom, DomElement, DomNodeId, TagSelector, parse_html};
use crate::error::{Error, Result};
use crate::model::{Attrs, MarkTypeId, Node, NodeTypeId, Schema};
use context::ParseContext;

/// How whitespace in text is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum WhitespaceMode {
    /// Collapse runs of whitespace to one space and trim at block edges.
    #[default]
    Collapse,
    /// Keep spaces, turn newlines into spaces.
    Preserve,
    /// Keep everything.
    Full,
}

/// Options for a single parse.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub preserve_whitespace: WhitespaceMode,
    /// Name of the node type to parse into. Defaults to the schema's top
    /// node type.
    pub top_node: Option<String>,
}

/// What a rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    Node(NodeTypeId),
    Mark(MarkTypeId),
}

#[derive(Debug, Clone)]
struct TagRule {
    selector: TagSelector,
    target: RuleTarget,
    rule: ParseRule,
}

#[derive(Debug, Clone)]
struct StyleRule {
    target: RuleTarget,
    rule: ParseRule,
}

/// A rule that matched, with the attributes it produced.
#[derive(Debug, Clone)]
pub struct RuleMatch<'p> {
    /// Position of the rule in its (tag or style) table.
    pub index: usize,
    pub target: RuleTarget,
    pub rule: &'p ParseRule,
    pub attrs: Attrs,
}

/// Rule-table driven HTML parser for one schema.
#[derive(Debug)]
pub struct DomParser<'s> {
    schema: &'s Schema,
    tags: Vec<TagRule>,
    styles: Vec<StyleRule>,
    /// Style properties that some rule looks at, in rule order.
    matched_styles: Vec<String>,
    normalize_lists: bool,
}

/// Insert `rule` after every rule of equal or higher priority.
fn insert_by_priority(rules: &mut Vec<(RuleTarget, ParseRule)>, target: RuleTarget, rule: ParseRule) {
    let at = rules
        .iter()
        .position(|(_, r)| r.priority < rule.priority)
        .unwrap_or(rules.len());
    rules.insert(at, (target, rule));
}

impl<'s> DomParser<'s> {
    /// Gather the parse rules of every mark spec, then every node spec.
    pub fn from_schema(schema: &'s Schema) -> Result<Self> {
        let mut rules = Vec::new();
        for mark_type in schema.mark_types() {
            for rule in &mark_type.spec().parse_dom {
                insert_by_priority(&mut rules, RuleTarget::Mark(mark_type.id()), rule.clone());
            }
        }
        for node_type in schema.node_types() {
            for rule in &node_type.spec().parse_dom {
                insert_by_priority(&mut rules, RuleTarget::Node(node_type.id()), rule.clone());
            }
        }

        let mut tags = Vec::new();
        let mut styles = Vec::new();
        let mut matched_styles: Vec<String> = Vec::new();
        for (target, rule) in rules {
            match &rule.selector {
                RuleSelector::Tag(source) => {
                    let selector = TagSelector::parse(source).ok_or_else(|| {
                        Error::InvalidSchema(format!("invalid tag selector '{source}'"))
                    })?;
                    tags.push(TagRule {
                        selector,
                        target,
                        rule,
                    });
                }
                RuleSelector::Style { property, .. } => {
                    if let RuleTarget::Node(id) = target
                        && !rule.ignore
                    {
                        return Err(Error::InvalidSchema(format!(
                            "style rule '{property}' on node type {} can only ignore",
                            schema.node_type(id).name()
                        )));
                    }
                    if !matched_styles.contains(property) {
                        matched_styles.push(property.clone());
                    }
                    styles.push(StyleRule { target, rule });
                }
            }
        }

        let normalize_lists = !tags.iter().any(|t| {
            let source = t.selector.source();
            let is_list = ["ul", "ol"].iter().any(|tag| {
                source
                    .strip_prefix(tag)
                    .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
            });
            match t.target {
                RuleTarget::Node(id) if is_list => schema.content_match(id).match_type(id).is_some(),
                _ => false,
            }
        });

        Ok(Self {
            schema,
            tags,
            styles,
            matched_styles,
            normalize_lists,
        })
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Parse an HTML string. The `<body>` content becomes the content of the
    /// returned top node.
    pub fn parse(&self, html: &str, options: &ParseOptions) -> Result<Node> {
        let mut dom = parse_html(html);
        let root = dom.body().unwrap_or(dom.document());
        self.parse_dom(&mut dom, root, options)
    }

    /// Parse the children of `root`.
    ///
    /// Lists directly nested in lists are moved into the preceding item
    /// first, which is why the tree is taken mutably.
    pub fn parse_dom(&self, dom: &mut Dom, root: DomNodeId, options: &ParseOptions) -> Result<Node> {
        if self.normalize_lists {
            normalize_lists(dom, root);
        }

        let top = match options.top_node.as_deref() {
            Some(name) => self
                .schema
                .node_type_by_name(name)
                .ok_or_else(|| Error::UnknownNodeType(name.to_string()))?
                .id(),
            None => self.schema.top_node_type().id(),
        };

        let mut cx = ParseContext::new(self, dom, top, options.preserve_whitespace)?;
        cx.add_all(root, &[]);
        Ok(cx.finish())
    }

    /// First tag rule matching `element`.
    pub fn match_tag(&self, element: &DomElement<'_>) -> Option<RuleMatch<'_>> {
        self.match_tag_after(element, None)
    }

    pub(crate) fn match_tag_after(
        &self,
        element: &DomElement<'_>,
        after: Option<usize>,
    ) -> Option<RuleMatch<'_>> {
        let start = after.map_or(0, |i| i + 1);
        for (index, tag) in self.tags.iter().enumerate().skip(start) {
            if !tag.selector.matches(element.dom, element.id) {
                continue;
            }
            match tag.rule.element_attrs(element) {
                AttrMatch::Reject => {
                    debug!(selector = tag.selector.source(), "tag rule rejected element");
                }
                AttrMatch::Accept(attrs) => {
                    return Some(RuleMatch {
                        index,
                        target: tag.target,
                        rule: &tag.rule,
                        attrs,
                    });
                }
            }
        }
        None
    }

    /// First style rule matching `property: value`.
    pub fn match_style(&self, property: &str, value: &str) -> Option<RuleMatch<'_>> {
        self.match_style_after(property, value, None)
    }

    pub(crate) fn match_style_after(
        &self,
        property: &str,
        value: &str,
        after: Option<usize>,
    ) -> Option<RuleMatch<'_>> {
        let start = after.map_or(0, |i| i + 1);
        for (index, style) in self.styles.iter().enumerate().skip(start) {
            if !style.rule.matches_style(property, value) {
                continue;
            }
            match style.rule.style_attrs(value) {
                AttrMatch::Reject => {
                    debug!(property, value, "style rule rejected value");
                }
                AttrMatch::Accept(attrs) => {
                    return Some(RuleMatch {
                        index,
                        target: style.target,
                        rule: &style.rule,
                        attrs,
                    });
                }
            }
        }
        None
    }

    pub(crate) fn matched_styles(&self) -> &[String] {
        &self.matched_styles
    }
}

fn is_list_tag(dom: &Dom, id: DomNodeId) -> bool {
    dom.element_name(id)
        .is_some_and(|n| matches!(n.as_ref(), "ul" | "ol"))
}

/// Move lists that sit directly inside a list into the preceding `<li>`.
fn normalize_lists(dom: &mut Dom, root: DomNodeId) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if is_list_tag(dom, id) {
            let mut prev_item: Option<DomNodeId> = None;
            let children: Vec<_> = dom.children(id).collect();
            for child in children {
                let name = dom.element_name(child).map(|n| n.to_string());
                match name.as_deref() {
                    Some("ul" | "ol") if prev_item.is_some() => {
                        if let Some(item) = prev_item {
                            dom.detach(child);
                            dom.append(item, child);
                        }
                    }
                    Some("li") => prev_item = Some(child),
                    Some(_) => prev_item = None,
                    None => {}
                }
            }
        }
        stack.extend(dom.children(id));
    }
}
