//! Parse rules: how HTML maps onto node and mark types.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::WhitespaceMode;
use crate::dom::DomElement;
use crate::model::Attrs;

/// Result of a rule's attribute extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrMatch {
    /// The rule does not apply; matching continues with the next rule.
    Reject,
    /// The rule applies with these attributes.
    Accept(Attrs),
}

impl AttrMatch {
    /// Accept with no attributes.
    pub fn accept() -> Self {
        AttrMatch::Accept(Attrs::new())
    }

    /// Accept with no attributes when `ok`, otherwise reject.
    pub fn accept_if(ok: bool) -> Self {
        if ok { Self::accept() } else { AttrMatch::Reject }
    }
}

pub type ElementAttrs = Arc<dyn Fn(&DomElement<'_>) -> AttrMatch + Send + Sync>;
pub type StyleAttrs = Arc<dyn Fn(&str) -> AttrMatch + Send + Sync>;

/// Attribute extractor, by the kind of selector it belongs to.
#[derive(Clone)]
pub enum AttrExtractor {
    /// Receives the matched element.
    Element(ElementAttrs),
    /// Receives the matched style value.
    Style(StyleAttrs),
}

/// What a rule looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelector {
    /// CSS selector matched against elements.
    Tag(String),
    /// Inline style declaration: any value of `property`, or only `value`.
    Style {
        property: String,
        value: Option<String>,
    },
}

impl RuleSelector {
    /// Parse a style selector of the form `prop` or `prop=value`.
    pub fn style(selector: &str) -> Self {
        match selector.split_once('=') {
            Some((property, value)) => RuleSelector::Style {
                property: property.trim().to_ascii_lowercase(),
                value: Some(value.trim().to_ascii_lowercase()),
            },
            None => RuleSelector::Style {
                property: selector.trim().to_ascii_lowercase(),
                value: None,
            },
        }
    }
}

/// A rule in a node or mark spec's `parse_dom` list.
#[derive(Clone)]
pub struct ParseRule {
    pub selector: RuleSelector,
    /// Higher priorities are tried first. Defaults to 50.
    pub priority: i32,
    /// Fixed attributes, used when there is no extractor.
    pub attrs: Option<Attrs>,
    pub get_attrs: Option<AttrExtractor>,
    /// Drop the matched element and its content.
    pub ignore: bool,
    /// Ignore the matched element but keep its content.
    pub skip: bool,
    /// When false, later rules may also match the same element.
    pub consuming: bool,
    pub preserve_whitespace: Option<WhitespaceMode>,
}

impl ParseRule {
    fn with_selector(selector: RuleSelector) -> Self {
        Self {
            selector,
            priority: 50,
            attrs: None,
            get_attrs: None,
            ignore: false,
            skip: false,
            consuming: true,
            preserve_whitespace: None,
        }
    }

    /// Rule matching elements by CSS selector.
    pub fn tag(selector: &str) -> Self {
        Self::with_selector(RuleSelector::Tag(selector.to_string()))
    }

    /// Rule matching an inline style, `prop` or `prop=value`.
    pub fn style(selector: &str) -> Self {
        Self::with_selector(RuleSelector::style(selector))
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set a fixed attribute.
    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attrs
            .get_or_insert_with(Attrs::new)
            .insert(name.to_string(), value.into());
        self
    }

    /// Extract attributes from a matched element.
    pub fn get_attrs<F>(mut self, f: F) -> Self
    where
        F: Fn(&DomElement<'_>) -> AttrMatch + Send + Sync + 'static,
    {
        self.get_attrs = Some(AttrExtractor::Element(Arc::new(f)));
        self
    }

    /// Extract attributes from a matched style value.
    pub fn get_style_attrs<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> AttrMatch + Send + Sync + 'static,
    {
        self.get_attrs = Some(AttrExtractor::Style(Arc::new(f)));
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn non_consuming(mut self) -> Self {
        self.consuming = false;
        self
    }

    pub fn preserve_whitespace(mut self, mode: WhitespaceMode) -> Self {
        self.preserve_whitespace = Some(mode);
        self
    }

    pub fn is_tag(&self) -> bool {
        matches!(self.selector, RuleSelector::Tag(_))
    }

    pub(crate) fn fixed_attrs(&self) -> Attrs {
        self.attrs.clone().unwrap_or_default()
    }

    /// Run the extractor for a matched element.
    pub(crate) fn element_attrs(&self, element: &DomElement<'_>) -> AttrMatch {
        match &self.get_attrs {
            None => AttrMatch::Accept(self.fixed_attrs()),
            Some(AttrExtractor::Element(f)) => f(element),
            Some(AttrExtractor::Style(_)) => AttrMatch::Reject,
        }
    }

    /// Run the extractor for a matched style value.
    pub(crate) fn style_attrs(&self, value: &str) -> AttrMatch {
        match &self.get_attrs {
            None => AttrMatch::Accept(self.fixed_attrs()),
            Some(AttrExtractor::Style(f)) => f(value),
            Some(AttrExtractor::Element(_)) => AttrMatch::Reject,
        }
    }

    /// Whether this style rule covers `property: value`.
    pub(crate) fn matches_style(&self, property: &str, value: &str) -> bool {
        match &self.selector {
            RuleSelector::Style {
                property: p,
                value: v,
            } => p == property && v.as_deref().is_none_or(|v| v == value),
            RuleSelector::Tag(_) => false,
        }
    }
}

impl fmt::Debug for ParseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseRule")
            .field("selector", &self.selector)
            .field("priority", &self.priority)
            .field("attrs", &self.attrs)
            .field("get_attrs", &self.get_attrs.is_some())
            .field("ignore", &self.ignore)
            .field("skip", &self.skip)
            .field("consuming", &self.consuming)
            .field("preserve_whitespace", &self.preserve_whitespace)
            .finish()
    }
}
