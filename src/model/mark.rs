//! Marks and mark types.

use super::attrs::{AttrSpec, Attrs, check_attrs, compute_attrs};
use super::schema::Schema;
use super::spec::MarkSpec;
use crate::error::Result;

/// Index of a mark type in its schema. Ordering follows declaration order,
/// which is also the rank used to sort mark sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkTypeId(pub u16);

/// A mark type compiled from a [`MarkSpec`].
#[derive(Debug, Clone)]
pub struct MarkType {
    pub(crate) name: String,
    pub(crate) id: MarkTypeId,
    pub(crate) spec: MarkSpec,
    pub(crate) excluded: Vec<MarkTypeId>,
}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> MarkTypeId {
        self.id
    }

    pub fn rank(&self) -> u16 {
        self.id.0
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }

    pub fn attr_specs(&self) -> &[(String, AttrSpec)] {
        &self.spec.attrs
    }

    pub fn inclusive(&self) -> bool {
        self.spec.inclusive.unwrap_or(true)
    }

    pub fn spanning(&self) -> bool {
        self.spec.spanning.unwrap_or(true)
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.spec
            .group
            .as_deref()
            .is_some_and(|g| g.split_whitespace().any(|n| n == group))
    }

    /// Whether this mark type excludes `other`.
    pub fn excludes(&self, other: MarkTypeId) -> bool {
        self.excluded.contains(&other)
    }

    /// Create a mark, filling default attributes.
    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark> {
        Ok(Mark {
            mark_type: self.id,
            attrs: compute_attrs(&self.name, &self.spec.attrs, attrs)?,
        })
    }

    pub(crate) fn check_attrs(&self, attrs: &Attrs) -> Result<()> {
        check_attrs(&self.name, &self.spec.attrs, attrs)
    }
}

/// A mark applied to inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub(crate) mark_type: MarkTypeId,
    pub(crate) attrs: Attrs,
}

impl Mark {
    pub fn type_id(&self) -> MarkTypeId {
        self.mark_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add this mark to a sorted mark set.
    ///
    /// Returns the set unchanged when it already holds this mark or a mark
    /// that excludes it; marks this one excludes are removed.
    pub fn add_to_set(&self, set: &[Mark], schema: &Schema) -> Vec<Mark> {
        let this = schema.mark_type(self.mark_type);
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;

        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if this.excludes(other.mark_type) {
                copy.get_or_insert_with(|| set[..i].to_vec());
            } else if schema.mark_type(other.mark_type).excludes(self.mark_type) {
                return set.to_vec();
            } else {
                if !placed && other.mark_type > self.mark_type {
                    copy.get_or_insert_with(|| set[..i].to_vec()).push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }

        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    /// Remove this mark from a set.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }

    /// Whether two sets hold the same marks.
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }

    /// Normalize a list of marks into a sorted set.
    pub fn set_from(marks: &[Mark], schema: &Schema) -> Vec<Mark> {
        let mut set = Vec::new();
        for mark in marks {
            set = mark.add_to_set(&set, schema);
        }
        set
    }
}
