//! The compiled schema.

use super::attrs::Attrs;
use super::content::{ContentMatch, MatchId, MatchState, compile_content};
use super::mark::{Mark, MarkType, MarkTypeId};
use super::node::{Fragment, Node};
use super::node_type::{NodeType, NodeTypeId};
use super::spec::SchemaSpec;
use crate::error::{Error, Result};

/// A document schema: node types with their content automata and mark
/// types, built once from a [`SchemaSpec`] and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    spec: SchemaSpec,
    nodes: Vec<NodeType>,
    marks: Vec<MarkType>,
    states: Vec<MatchState>,
    top: NodeTypeId,
    text: NodeTypeId,
}

impl Schema {
    /// Compile `spec`, validating names, content expressions and mark sets.
    pub fn new(spec: SchemaSpec) -> Result<Self> {
        if spec.nodes.len() > u16::MAX as usize || spec.marks.len() > u16::MAX as usize {
            return Err(Error::InvalidSchema("too many node or mark types".into()));
        }

        let mut nodes: Vec<NodeType> = spec
            .nodes
            .iter()
            .enumerate()
            .map(|(i, (name, s))| NodeType::from_spec(name, NodeTypeId(i as u16), s.clone()))
            .collect();

        let top_name = spec.top_node.as_deref().unwrap_or("doc");
        let top = nodes
            .iter()
            .find(|t| t.name == top_name)
            .map(|t| t.id)
            .ok_or_else(|| {
                Error::InvalidSchema(format!("schema is missing its top node type ('{top_name}')"))
            })?;
        let text = nodes
            .iter()
            .find(|t| t.is_text())
            .ok_or_else(|| Error::InvalidSchema("every schema needs a 'text' type".into()))?;
        if !text.spec.attrs.is_empty() {
            return Err(Error::InvalidSchema(
                "the text node type should not have attributes".into(),
            ));
        }
        let text = text.id;

        if let Some(name) = spec.nodes.keys().find(|n| spec.marks.contains_key(n)) {
            return Err(Error::InvalidSchema(format!(
                "{name} can not be both a node and a mark"
            )));
        }

        let mut marks: Vec<MarkType> = spec
            .marks
            .iter()
            .enumerate()
            .map(|(i, (name, s))| MarkType {
                name: name.to_string(),
                id: MarkTypeId(i as u16),
                spec: s.clone(),
                excluded: Vec::new(),
            })
            .collect();
        for i in 0..marks.len() {
            let excluded = match marks[i].spec.excludes.as_deref() {
                None => vec![marks[i].id],
                Some(expr) => gather_marks(&marks, expr)?,
            };
            marks[i].excluded = excluded;
        }

        let mut states: Vec<MatchState> = Vec::new();
        let mut compiled: Vec<(MatchId, bool)> = Vec::with_capacity(nodes.len());
        for node_type in &nodes {
            let base = states.len() as u32;
            let automaton = compile_content(node_type.content_expr(), &nodes, base)?;
            let inline_content = automaton[0]
                .next
                .first()
                .is_some_and(|e| nodes[e.node_type.0 as usize].is_inline());
            states.extend(automaton);
            compiled.push((MatchId(base), inline_content));
        }

        for (node_type, (start, inline_content)) in nodes.iter_mut().zip(compiled) {
            node_type.content_match = start;
            node_type.inline_content = inline_content;
            node_type.mark_set = match node_type.spec.marks.as_deref() {
                Some("_") => None,
                Some("") => Some(Vec::new()),
                Some(expr) => Some(gather_marks(&marks, expr)?),
                None if inline_content => None,
                None => Some(Vec::new()),
            };
        }

        Ok(Self {
            spec,
            nodes,
            marks,
            states,
            top,
            text,
        })
    }

    pub fn spec(&self) -> &SchemaSpec {
        &self.spec
    }

    pub fn node_types(&self) -> &[NodeType] {
        &self.nodes
    }

    pub fn mark_types(&self) -> &[MarkType] {
        &self.marks
    }

    pub fn node_type(&self, id: NodeTypeId) -> &NodeType {
        &self.nodes[id.0 as usize]
    }

    pub fn mark_type(&self, id: MarkTypeId) -> &MarkType {
        &self.marks[id.0 as usize]
    }

    pub fn node_type_by_name(&self, name: &str) -> Option<&NodeType> {
        self.nodes.iter().find(|t| t.name == name)
    }

    pub fn mark_type_by_name(&self, name: &str) -> Option<&MarkType> {
        self.marks.iter().find(|t| t.name == name)
    }

    pub fn top_node_type(&self) -> &NodeType {
        self.node_type(self.top)
    }

    pub fn text_type(&self) -> &NodeType {
        self.node_type(self.text)
    }

    pub(crate) fn match_state(&self, id: MatchId) -> &MatchState {
        &self.states[id.0 as usize]
    }

    /// Start state of a node type's content automaton.
    pub fn content_match(&self, id: NodeTypeId) -> ContentMatch<'_> {
        self.node_type(id).content_match(self)
    }

    fn require_node_type(&self, name: &str) -> Result<&NodeType> {
        self.node_type_by_name(name)
            .ok_or_else(|| Error::UnknownNodeType(name.to_string()))
    }

    fn require_mark_type(&self, name: &str) -> Result<&MarkType> {
        self.mark_type_by_name(name)
            .ok_or_else(|| Error::UnknownMarkType(name.to_string()))
    }

    /// Create a node by type name, checking its content.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node> {
        self.require_node_type(name)?
            .create_checked(self, attrs, content, &marks)
    }

    /// Create a text node. Empty text is rejected.
    pub fn text(&self, text: &str, marks: Vec<Mark>) -> Result<Node> {
        if text.is_empty() {
            return Err(Error::EmptyText);
        }
        Ok(Node::new_text(
            self.text,
            text.to_string(),
            Mark::set_from(&marks, self),
        ))
    }

    /// Create a mark by type name.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark> {
        self.require_mark_type(name)?.create(attrs)
    }

    /// Create a node of `id` with default attributes, filling required
    /// content. Used when content has to be synthesized.
    pub(crate) fn create_and_fill(&self, id: NodeTypeId) -> Option<Node> {
        self.node_type(id)
            .create_and_fill(self, None, Fragment::empty(), &[])
            .ok()
            .flatten()
    }
}

/// Resolve a space-separated list of mark names, group names or `_`.
fn gather_marks(marks: &[MarkType], expr: &str) -> Result<Vec<MarkTypeId>> {
    let mut found = Vec::new();
    for name in expr.split_whitespace() {
        if let Some(mark) = marks.iter().find(|m| m.name == name) {
            found.push(mark.id);
            continue;
        }
        let before = found.len();
        found.extend(
            marks
                .iter()
                .filter(|m| name == "_" || m.is_in_group(name))
                .map(|m| m.id),
        );
        if found.len() == before {
            return Err(Error::UnknownMarkType(name.to_string()));
        }
    }
    found.sort_unstable();
    found.dedup();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarkSpec, NodeSpec, OrderedMap};

    fn nodes() -> OrderedMap<NodeSpec> {
        [
            ("doc", NodeSpec::new().content("block+")),
            ("para", NodeSpec::new().content("text*").group("block")),
            ("text", NodeSpec::new()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_missing_top_node() {
        let spec = SchemaSpec::new(nodes(), OrderedMap::new()).with_top_node("page");
        let err = Schema::new(spec).unwrap_err();
        assert!(err.to_string().contains("top node type"));
    }

    #[test]
    fn test_missing_text() {
        let nodes = nodes().remove("text");
        let err = Schema::new(SchemaSpec::new(nodes, OrderedMap::new())).unwrap_err();
        assert!(err.to_string().contains("'text' type"));
    }

    #[test]
    fn test_name_clash_between_node_and_mark() {
        let marks: OrderedMap<MarkSpec> = [("para", MarkSpec::new())].into_iter().collect();
        assert!(Schema::new(SchemaSpec::new(nodes(), marks)).is_err());
    }

    #[test]
    fn test_unknown_content_name() {
        let nodes = nodes().update("doc", NodeSpec::new().content("section+"), None);
        let err = Schema::new(SchemaSpec::new(nodes, OrderedMap::new())).unwrap_err();
        assert!(matches!(err, Error::ContentExpr { .. }));
    }

    #[test]
    fn test_mark_groups_and_excludes() {
        let marks: OrderedMap<MarkSpec> = [
            ("em", MarkSpec::new().group("font")),
            ("strong", MarkSpec::new().group("font")),
            ("code", MarkSpec::new().excludes("font")),
        ]
        .into_iter()
        .collect();
        let nodes = nodes().update(
            "para",
            NodeSpec::new().content("text*").group("block").marks("font"),
            None,
        );
        let s = Schema::new(SchemaSpec::new(nodes, marks)).unwrap();
        let para = s.node_type_by_name("para").unwrap();
        let code = s.mark_type_by_name("code").unwrap();
        assert!(!para.allows_mark_type(code.id()));
        assert!(code.excludes(s.mark_type_by_name("em").unwrap().id()));
        assert!(!code.excludes(code.id()));
    }

    #[test]
    fn test_unknown_mark_in_set() {
        let nodes = nodes().update(
            "para",
            NodeSpec::new().content("text*").group("block").marks("bogus"),
            None,
        );
        let err = Schema::new(SchemaSpec::new(nodes, OrderedMap::new())).unwrap_err();
        assert!(matches!(err, Error::UnknownMarkType(name) if name == "bogus"));
    }

    #[test]
    fn test_text_rejects_empty() {
        let s = Schema::new(SchemaSpec::new(nodes(), OrderedMap::new())).unwrap();
        assert!(matches!(s.text("", vec![]), Err(Error::EmptyText)));
        assert!(matches!(s.node("nope", None, Fragment::empty(), vec![]), Err(Error::UnknownNodeType(_))));
    }
}
