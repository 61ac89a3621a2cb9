//! List node types.
//!
//! [`add_list_nodes`] extends a node table with `ordered_list`,
//! `bullet_list` and `list_item`.

use serde_json::Value;

use crate::model::{AttrSpec, Attrs, NodeSpec, OrderedMap};
use crate::parser::{AttrMatch, ParseRule};
use crate::serializer::DomOutputSpec;

/// `order` from an `<ol start>` value. Missing or unparsable starts count
/// from 1.
fn parse_start(start: Option<&str>) -> i64 {
    start
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(1)
}

/// An ordered list. Its `order` attribute is the number of the first item.
pub fn ordered_list() -> NodeSpec {
    NodeSpec::new()
        .attr("order", AttrSpec::with_default(1))
        .parse_rule(ParseRule::tag("ol").get_attrs(|el| {
            let mut attrs = Attrs::new();
            attrs.insert("order".into(), Value::from(parse_start(el.attr("start"))));
            AttrMatch::Accept(attrs)
        }))
        .to_dom(|node| {
            let order = node.attr("order").and_then(Value::as_i64).unwrap_or(1);
            if order == 1 {
                DomOutputSpec::element("ol").with_hole()
            } else {
                DomOutputSpec::element("ol")
                    .attr("start", order.to_string())
                    .with_hole()
            }
        })
}

pub fn bullet_list() -> NodeSpec {
    NodeSpec::new()
        .parse_rule(ParseRule::tag("ul"))
        .to_dom(|_| DomOutputSpec::element("ul").with_hole())
}

pub fn list_item() -> NodeSpec {
    NodeSpec::new()
        .defining()
        .parse_rule(ParseRule::tag("li"))
        .to_dom(|_| DomOutputSpec::element("li").with_hole())
}

/// Append the list node types to `nodes`.
///
/// Items get `item_content` as their content expression (for example
/// `"paragraph block*"`); both list types join `list_group` when given.
pub fn add_list_nodes(
    nodes: &OrderedMap<NodeSpec>,
    item_content: &str,
    list_group: Option<&str>,
) -> OrderedMap<NodeSpec> {
    let with_group = |spec: NodeSpec| match list_group {
        Some(group) => spec.group(group),
        None => spec,
    };

    let lists: OrderedMap<NodeSpec> = [
        ("ordered_list", with_group(ordered_list().content("list_item+"))),
        ("bullet_list", with_group(bullet_list().content("list_item+"))),
        ("list_item", list_item().content(item_content)),
    ]
    .into_iter()
    .collect();

    nodes.append(&lists)
}
