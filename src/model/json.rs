//! JSON representation of documents.
//!
//! ```json
//! {"type": "paragraph", "content": [
//!   {"type": "text", "text": "hi", "marks": [{"type": "strong"}]}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attrs::Attrs;
use super::mark::Mark;
use super::node::{Fragment, Node};
use super::schema::Schema;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeJson {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<NodeJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<MarkJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkJson {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

fn non_empty(attrs: &Attrs) -> Option<Attrs> {
    (!attrs.is_empty()).then(|| attrs.clone())
}

impl Mark {
    pub fn to_json_repr(&self, schema: &Schema) -> MarkJson {
        MarkJson {
            mark_type: schema.mark_type(self.type_id()).name().to_string(),
            attrs: non_empty(self.attrs()),
        }
    }
}

impl Node {
    pub fn to_json_repr(&self, schema: &Schema) -> NodeJson {
        let content: Vec<_> = self
            .children()
            .iter()
            .map(|c| c.to_json_repr(schema))
            .collect();
        let marks: Vec<_> = self
            .marks()
            .iter()
            .map(|m| m.to_json_repr(schema))
            .collect();
        NodeJson {
            node_type: schema.node_type(self.type_id()).name().to_string(),
            attrs: non_empty(self.attrs()),
            content: (!content.is_empty()).then_some(content),
            marks: (!marks.is_empty()).then_some(marks),
            text: self.text().map(str::to_string),
        }
    }

    pub fn to_json(&self, schema: &Schema) -> Result<Value> {
        Ok(serde_json::to_value(self.to_json_repr(schema))?)
    }
}

impl Schema {
    pub fn mark_from_json_repr(&self, json: &MarkJson) -> Result<Mark> {
        let mark_type = self
            .mark_type_by_name(&json.mark_type)
            .ok_or_else(|| Error::UnknownMarkType(json.mark_type.clone()))?;
        let mark = mark_type.create(json.attrs.as_ref())?;
        if let Some(attrs) = &json.attrs {
            mark_type.check_attrs(attrs)?;
        }
        Ok(mark)
    }

    /// Rebuild a node from its JSON form. Content is not validated; use
    /// [`Node::check`] for that.
    pub fn node_from_json_repr(&self, json: &NodeJson) -> Result<Node> {
        let marks = json
            .marks
            .iter()
            .flatten()
            .map(|m| self.mark_from_json_repr(m))
            .collect::<Result<Vec<_>>>()?;

        if json.node_type == self.text_type().name() {
            let text = json
                .text
                .as_deref()
                .ok_or_else(|| Error::MalformedJson("text node without text".into()))?;
            return self.text(text, marks);
        }

        let node_type = self
            .node_type_by_name(&json.node_type)
            .ok_or_else(|| Error::UnknownNodeType(json.node_type.clone()))?;
        let children = json
            .content
            .iter()
            .flatten()
            .map(|c| self.node_from_json_repr(c))
            .collect::<Result<Vec<_>>>()?;
        let node = node_type.create(self, json.attrs.as_ref(), Fragment::from_nodes(children), &marks)?;
        if let Some(attrs) = &json.attrs {
            node_type.check_attrs(attrs)?;
        }
        Ok(node)
    }

    pub fn node_from_json(&self, value: &Value) -> Result<Node> {
        if !value.is_object() {
            return Err(Error::MalformedJson("expected a node object".into()));
        }
        let json: NodeJson = serde_json::from_value(value.clone())
            .map_err(|e| Error::MalformedJson(e.to_string()))?;
        self.node_from_json_repr(&json)
    }

    pub fn mark_from_json(&self, value: &Value) -> Result<Mark> {
        let json: MarkJson = serde_json::from_value(value.clone())
            .map_err(|e| Error::MalformedJson(e.to_string()))?;
        self.mark_from_json_repr(&json)
    }
}
