//! Error types for schema construction, document building and serialization.

use thiserror::Error;

/// Errors that can occur while building a schema or working with documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid content expression {expr:?}: {message}")]
    ContentExpr { expr: String, message: String },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("No value supplied for attribute {attr} on {type_name}")]
    MissingAttribute { type_name: String, attr: String },

    #[error("Unsupported attribute {attr} for {type_name}")]
    UnsupportedAttribute { type_name: String, attr: String },

    #[error("Invalid content for node {0}")]
    InvalidContent(String),

    #[error("Invalid marks on node {0}")]
    InvalidMarks(String),

    #[error("Empty text nodes are not allowed")]
    EmptyText,

    #[error("Malformed document JSON: {0}")]
    MalformedJson(String),

    #[error("Cannot serialize {0}: {1}")]
    Serialize(String, String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn content_expr(expr: &str, message: impl Into<String>) -> Self {
        Error::ContentExpr {
            expr: expr.to_string(),
            message: message.into(),
        }
    }
}
