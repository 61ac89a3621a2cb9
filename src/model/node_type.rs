//! Node types compiled from node specs.

use super::attrs::{AttrSpec, Attrs, check_attrs, compute_attrs, default_attrs};
use super::content::{ContentMatch, MatchId};
use super::mark::{Mark, MarkTypeId};
use super::node::{Fragment, Node};
use super::schema::Schema;
use super::spec::NodeSpec;
use crate::error::{Error, Result};

/// Index of a node type in its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeTypeId(pub u16);

#[derive(Debug, Clone)]
pub struct NodeType {
    pub(crate) name: String,
    pub(crate) id: NodeTypeId,
    pub(crate) spec: NodeSpec,
    pub(crate) groups: Vec<String>,
    pub(crate) default_attrs: Option<Attrs>,
    pub(crate) content_match: MatchId,
    pub(crate) inline_content: bool,
    /// `None` allows every mark.
    pub(crate) mark_set: Option<Vec<MarkTypeId>>,
}

impl NodeType {
    pub(crate) fn from_spec(name: &str, id: NodeTypeId, spec: NodeSpec) -> Self {
        let groups = spec
            .group
            .as_deref()
            .map(|g| g.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            id,
            default_attrs: default_attrs(&spec.attrs),
            spec,
            groups,
            content_match: MatchId(0),
            inline_content: false,
            mark_set: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> NodeTypeId {
        self.id
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn content_expr(&self) -> &str {
        self.spec.content.as_deref().unwrap_or("")
    }

    pub fn content_match_id(&self) -> MatchId {
        self.content_match
    }

    pub fn content_match<'s>(&self, schema: &'s Schema) -> ContentMatch<'s> {
        ContentMatch::new(schema, self.content_match)
    }

    pub fn is_text(&self) -> bool {
        self.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// Block node whose content is inline.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.content_expr().trim().is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    pub fn selectable(&self) -> bool {
        self.spec.selectable.unwrap_or(!self.is_text())
    }

    pub fn defining(&self) -> bool {
        self.spec.defining
    }

    pub fn isolating(&self) -> bool {
        self.spec.isolating
    }

    /// Whether parsed content keeps all whitespace.
    pub fn whitespace_pre(&self) -> bool {
        self.spec.code
    }

    pub fn attr_specs(&self) -> &[(String, AttrSpec)] {
        &self.spec.attrs
    }

    pub fn has_required_attrs(&self) -> bool {
        self.spec.attrs.iter().any(|(_, s)| s.is_required())
    }

    /// Attributes made only of defaults, if every attribute has one.
    pub fn default_attrs(&self) -> Option<&Attrs> {
        self.default_attrs.as_ref()
    }

    pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> Result<Attrs> {
        match (attrs, &self.default_attrs) {
            (None, Some(defaults)) => Ok(defaults.clone()),
            _ => compute_attrs(&self.name, &self.spec.attrs, attrs),
        }
    }

    pub(crate) fn check_attrs(&self, attrs: &Attrs) -> Result<()> {
        check_attrs(&self.name, &self.spec.attrs, attrs)
    }

    pub fn allows_mark_type(&self, mark_type: MarkTypeId) -> bool {
        self.mark_set
            .as_ref()
            .is_none_or(|set| set.contains(&mark_type))
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.type_id()))
    }

    /// Mark types allowed in this node's content. `None` means all.
    pub fn mark_set(&self) -> Option<&[MarkTypeId]> {
        self.mark_set.as_deref()
    }

    /// Whether `content` is valid for this node type.
    pub fn valid_content(&self, schema: &Schema, content: &Fragment) -> bool {
        let valid = self
            .content_match(schema)
            .match_fragment(content, 0)
            .is_some_and(|m| m.valid_end());
        valid && content.iter().all(|c| self.allows_marks(c.marks()))
    }

    pub(crate) fn check_content(&self, schema: &Schema, content: &Fragment) -> Result<()> {
        if self.is_text() || self.valid_content(schema, content) {
            Ok(())
        } else {
            Err(Error::InvalidContent(self.name.clone()))
        }
    }

    /// Create a node of this type. Content is not checked.
    pub fn create(
        &self,
        schema: &Schema,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Node> {
        if self.is_text() {
            return Err(Error::InvalidSchema(
                "text nodes are created with Schema::text".into(),
            ));
        }
        Ok(Node::new(
            self.id,
            self.compute_attrs(attrs)?,
            content,
            Mark::set_from(marks, schema),
        ))
    }

    /// Like [`create`](Self::create), but fails when the content does not
    /// match this type's content expression.
    pub fn create_checked(
        &self,
        schema: &Schema,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Node> {
        self.check_content(schema, &content)?;
        self.create(schema, attrs, content, marks)
    }

    /// Create a node, inserting whatever required nodes are missing around
    /// `content`. Returns `Ok(None)` when the content cannot be made valid.
    pub fn create_and_fill(
        &self,
        schema: &Schema,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Option<Node>> {
        let attrs = self.compute_attrs(attrs)?;
        let start = self.content_match(schema);

        let mut content = content;
        if !content.is_empty() {
            let Some(before) = start.fill_before(&content, false, 0) else {
                return Ok(None);
            };
            content = before.append(&content);
        }

        let Some(after) = start
            .match_fragment(&content, 0)
            .and_then(|m| m.fill_before(&Fragment::empty(), true, 0))
        else {
            return Ok(None);
        };

        Ok(Some(Node::new(
            self.id,
            attrs,
            content.append(&after),
            Mark::set_from(marks, schema),
        )))
    }
}
