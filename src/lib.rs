//! # richtext-schema
//!
//! A rich-text document schema with HTML parsing and serialization.
//!
//! ## Features
//!
//! - Document model: typed nodes and marks checked against content
//!   expressions like `"paragraph block*"`
//! - HTML to document parsing driven by per-type parse rules
//! - Document to HTML serialization driven by per-type output templates
//! - JSON form of documents
//! - A ready-made editor schema: paragraphs, headings, horizontal rules,
//!   hard breaks, ordered and bullet lists, underline, emphasis and strong
//!
//! ## Quick Start
//!
//! ```
//! use richtext_schema::{ParseOptions, editor};
//!
//! let doc = editor::parser()
//!     .parse("<p>Hello <b>world</b></p>", &ParseOptions::default())
//!     .unwrap();
//! assert_eq!(doc.text_content(), "Hello world");
//!
//! let html = editor::serializer().to_html(doc.content()).unwrap();
//! assert_eq!(html, "<p>Hello <strong>world</strong></p>");
//! ```
//!
//! ## Custom Schemas
//!
//! ```
//! use richtext_schema::{MarkSpec, NodeSpec, OrderedMap, ParseRule, Schema, SchemaSpec};
//!
//! let nodes: OrderedMap<NodeSpec> = [
//!     ("doc", NodeSpec::new().content("paragraph+")),
//!     ("paragraph", NodeSpec::new().content("text*").parse_rule(ParseRule::tag("p"))),
//!     ("text", NodeSpec::new()),
//! ]
//! .into_iter()
//! .collect();
//! let schema = Schema::new(SchemaSpec::new(nodes, OrderedMap::<MarkSpec>::new())).unwrap();
//! assert!(schema.node_type_by_name("paragraph").is_some());
//! ```

pub mod dom;
pub mod editor;
pub mod error;
pub mod list;
pub mod model;
pub mod parser;
pub mod serializer;
pub(crate) mod util;

pub use error::{Error, Result};
pub use list::add_list_nodes;
pub use model::{
    AttrSpec, Attrs, ContentMatch, Fragment, Mark, MarkSpec, MarkType, MarkTypeId, Node, NodeSpec,
    NodeType, NodeTypeId, OrderedMap, Schema, SchemaSpec,
};
pub use parser::{AttrMatch, DomParser, ParseOptions, ParseRule, WhitespaceMode};
pub use serializer::{DomOutputSpec, DomSerializer};
pub use util::decode_text;
