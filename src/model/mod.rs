//! Document model: schemas, node and mark types, documents.
//!
//! This module contains:
//! - Attribute specs and values
//! - Content expressions compiled to automata ([`ContentMatch`])
//! - Node and mark types, built from specs into a [`Schema`]
//! - Document nodes, fragments and marks
//! - JSON import/export

mod attrs;
mod content;
mod json;
mod mark;
mod node;
mod node_type;
mod ordered_map;
mod schema;
mod spec;

pub use attrs::{AttrSpec, Attrs};
pub use content::{ContentMatch, MatchId};
pub use json::{MarkJson, NodeJson};
pub use mark::{Mark, MarkType, MarkTypeId};
pub use node::{Fragment, Node};
pub use node_type::{NodeType, NodeTypeId};
pub use ordered_map::OrderedMap;
pub use schema::Schema;
pub use spec::{MarkSpec, MarkToDom, NodeSpec, NodeToDom, SchemaSpec};
