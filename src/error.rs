//! Error types for entity mapping

use thiserror::Error;

/// Errors raised while mapping entities to and from their wire forms
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ODataError {
    /// A property or association name that the schema does not declare
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// A wire value that cannot be interpreted as the declared kind
    #[error("Cannot coerce {value:?} into {kind}: {reason}")]
    TypeCoercion {
        kind: String,
        value: String,
        reason: String,
    },

    /// The schema has no definition for a requested entity type, kind or complex type
    #[error("Schema resolution error: {0}")]
    SchemaResolution(String),

    /// Malformed XML input
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Malformed JSON input or an unexpected JSON shape
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Writing a wire document failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl ODataError {
    pub(crate) fn coercion(
        kind: impl Into<String>,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        ODataError::TypeCoercion {
            kind: kind.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for ODataError {
    fn from(e: serde_json::Error) -> Self {
        ODataError::JsonParse(e.to_string())
    }
}

impl From<std::io::Error> for ODataError {
    fn from(e: std::io::Error) -> Self {
        ODataError::IoError(e.to_string())
    }
}

impl From<quick_xml::Error> for ODataError {
    fn from(e: quick_xml::Error) -> Self {
        ODataError::XmlParse(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ODataError>;
