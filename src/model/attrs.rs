//! Node and mark attributes.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Attribute values of a node or mark, keyed by attribute name.
pub type Attrs = BTreeMap<String, Value>;

/// Declaration of a single attribute. An attribute without a default is
/// required and must be supplied whenever a node or mark is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrSpec {
    pub default: Option<Value>,
}

impl AttrSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Attributes made only of defaults, or `None` when some attribute is
/// required.
pub(crate) fn default_attrs(specs: &[(String, AttrSpec)]) -> Option<Attrs> {
    specs
        .iter()
        .map(|(name, spec)| spec.default.clone().map(|v| (name.clone(), v)))
        .collect()
}

/// Build a full attribute set from `given`, falling back to defaults.
/// Attributes not declared in `specs` are dropped.
pub(crate) fn compute_attrs(
    type_name: &str,
    specs: &[(String, AttrSpec)],
    given: Option<&Attrs>,
) -> Result<Attrs> {
    let mut built = Attrs::new();
    for (name, spec) in specs {
        let value = match given.and_then(|g| g.get(name)) {
            Some(v) => v.clone(),
            None => spec.default.clone().ok_or_else(|| Error::MissingAttribute {
                type_name: type_name.to_string(),
                attr: name.clone(),
            })?,
        };
        built.insert(name.clone(), value);
    }
    Ok(built)
}

/// Reject attributes that are not declared and required ones that are
/// missing.
pub(crate) fn check_attrs(type_name: &str, specs: &[(String, AttrSpec)], attrs: &Attrs) -> Result<()> {
    if let Some(name) = attrs.keys().find(|k| !specs.iter().any(|(n, _)| n == *k)) {
        return Err(Error::UnsupportedAttribute {
            type_name: type_name.to_string(),
            attr: name.clone(),
        });
    }
    if let Some((name, _)) = specs
        .iter()
        .find(|(n, s)| s.is_required() && !attrs.contains_key(n))
    {
        return Err(Error::MissingAttribute {
            type_name: type_name.to_string(),
            attr: name.clone(),
        });
    }
    Ok(())
}
