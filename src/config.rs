//! Configuration for the Atom entry writer

use serde::{Deserialize, Serialize};

/// Base protocol namespace of the Atom envelope
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
/// GeoRSS namespace declared on the envelope
pub const GEORSS_NAMESPACE: &str = "http://www.georss.org/georss";
/// GML namespace used for geography values
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";

/// Configuration for [`Entity::to_xml_with`](crate::Entity::to_xml_with)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlWriterConfig {
    /// Value of the `xml:base` attribute on the entry
    pub xml_base: String,

    /// Namespace bound to the `data` prefix (property values)
    pub data_namespace: String,

    /// Namespace bound to the `metadata` prefix (type and null annotations)
    pub metadata_namespace: String,

    /// Scheme attribute of the `category` element
    pub scheme: String,

    /// Spaces per nesting level (0 = compact output)
    pub indent: usize,

    /// Emit an `<?xml ...?>` declaration
    pub include_declaration: bool,
}

impl Default for XmlWriterConfig {
    fn default() -> Self {
        Self {
            xml_base: "http://services.odata.org/OData/OData.svc/".to_string(),
            data_namespace: "http://schemas.microsoft.com/ado/2007/08/dataservices".to_string(),
            metadata_namespace: "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata"
                .to_string(),
            scheme: "http://schemas.microsoft.com/ado/2007/08/dataservices/scheme".to_string(),
            indent: 2,
            include_declaration: true,
        }
    }
}

impl XmlWriterConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> XmlWriterConfigBuilder {
        XmlWriterConfigBuilder::default()
    }

    /// Namespaces of an OData v4 service
    pub fn v4() -> Self {
        Self {
            data_namespace: "http://docs.oasis-open.org/odata/ns/data".to_string(),
            metadata_namespace: "http://docs.oasis-open.org/odata/ns/metadata".to_string(),
            scheme: "http://docs.oasis-open.org/odata/ns/scheme".to_string(),
            ..Self::default()
        }
    }
}

/// Builder for XmlWriterConfig
#[derive(Debug, Default)]
pub struct XmlWriterConfigBuilder {
    config: XmlWriterConfig,
}

impl XmlWriterConfigBuilder {
    /// Set the `xml:base` of the entry
    pub fn xml_base(mut self, base: impl Into<String>) -> Self {
        self.config.xml_base = base.into();
        self
    }

    /// Set the namespace bound to the `data` prefix
    pub fn data_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.data_namespace = namespace.into();
        self
    }

    /// Set the namespace bound to the `metadata` prefix
    pub fn metadata_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.metadata_namespace = namespace.into();
        self
    }

    /// Set the category scheme
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    /// Set the indentation width (0 = compact)
    pub fn indent(mut self, indent: usize) -> Self {
        self.config.indent = indent;
        self
    }

    /// Enable or disable the XML declaration
    pub fn include_declaration(mut self, include: bool) -> Self {
        self.config.include_declaration = include;
        self
    }

    /// Build the configuration
    pub fn build(self) -> XmlWriterConfig {
        self.config
    }
}
