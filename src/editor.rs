//! The editor's document schema.
//!
//! Block nodes are paragraphs, headings, horizontal rules and lists; inline
//! content is text and hard breaks, marked with underline, emphasis and
//! strong emphasis. The schema, parser and serializer are built once and
//! shared.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::Value;

use crate::list::add_list_nodes;
use crate::model::{AttrSpec, MarkSpec, NodeSpec, OrderedMap, Schema, SchemaSpec};
use crate::parser::{AttrMatch, DomParser, ParseRule};
use crate::serializer::{DomOutputSpec, DomSerializer};

/// `font-weight` values that count as bold.
static STRONG_WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(bold(er)?|[5-9]\d{2,})$").unwrap());

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(SchemaSpec::new(nodes(), marks())).expect("editor schema is valid")
});

static PARSER: LazyLock<DomParser<'static>> =
    LazyLock::new(|| DomParser::from_schema(schema()).expect("editor parse rules are valid"));

static SERIALIZER: LazyLock<DomSerializer<'static>> =
    LazyLock::new(|| DomSerializer::from_schema(schema()));

/// Whether an inline `font-weight` value is bold.
pub fn is_bold_weight(value: &str) -> bool {
    STRONG_WEIGHT_RE.is_match(value)
}

fn heading() -> NodeSpec {
    let mut spec = NodeSpec::new()
        .content("inline*")
        .group("block")
        .attr("level", AttrSpec::with_default(1))
        .defining();
    for level in 1..=6 {
        spec = spec.parse_rule(ParseRule::tag(&format!("h{level}")).attr("level", level));
    }
    spec.to_dom(|node| {
        let level = node.attr("level").and_then(Value::as_u64).unwrap_or(1);
        DomOutputSpec::element(&format!("h{level}")).with_hole()
    })
}

/// Node specs, lists included.
pub fn nodes() -> OrderedMap<NodeSpec> {
    let base: OrderedMap<NodeSpec> = [
        ("doc", NodeSpec::new().content("block+")),
        (
            "paragraph",
            NodeSpec::new()
                .content("inline*")
                .group("block")
                .parse_rule(ParseRule::tag("p"))
                .to_dom(|_| DomOutputSpec::element("p").with_hole()),
        ),
        (
            "horizontal_rule",
            NodeSpec::new()
                .group("block")
                .parse_rule(ParseRule::tag("hr"))
                .to_dom(|_| DomOutputSpec::element("hr")),
        ),
        ("heading", heading()),
        ("text", NodeSpec::new().group("inline")),
        (
            "hard_break",
            NodeSpec::new()
                .inline()
                .group("inline")
                .selectable(false)
                .parse_rule(ParseRule::tag("br"))
                .to_dom(|_| DomOutputSpec::element("br")),
        ),
    ]
    .into_iter()
    .collect();

    add_list_nodes(&base, "paragraph block*", Some("block"))
}

/// Mark specs, in rank order.
pub fn marks() -> OrderedMap<MarkSpec> {
    [
        (
            "u",
            MarkSpec::new()
                .parse_rule(ParseRule::tag("u"))
                .parse_rule(ParseRule::style("text-decoration=underline"))
                .to_dom(|_, _| DomOutputSpec::element("u").with_hole()),
        ),
        (
            "em",
            MarkSpec::new()
                .parse_rule(ParseRule::tag("i"))
                .parse_rule(ParseRule::tag("em"))
                .parse_rule(ParseRule::style("font-style=italic"))
                .to_dom(|_, _| DomOutputSpec::element("em").with_hole()),
        ),
        (
            "strong",
            MarkSpec::new()
                .parse_rule(ParseRule::tag("strong"))
                // Google Docs wraps pasted content in <b style="font-weight: normal">.
                .parse_rule(ParseRule::tag("b").get_attrs(|el| {
                    AttrMatch::accept_if(el.style("font-weight") != Some("normal"))
                }))
                .parse_rule(
                    ParseRule::style("font-weight")
                        .get_style_attrs(|value| AttrMatch::accept_if(is_bold_weight(value))),
                )
                .to_dom(|_, _| DomOutputSpec::element("strong").with_hole()),
        ),
    ]
    .into_iter()
    .collect()
}

/// The editor schema.
pub fn schema() -> &'static Schema {
    &SCHEMA
}

/// Parser for the editor schema.
pub fn parser() -> &'static DomParser<'static> {
    &PARSER
}

/// Serializer for the editor schema.
pub fn serializer() -> &'static DomSerializer<'static> {
    &SERIALIZER
}
