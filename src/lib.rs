//! OData Entity SDK - metadata-driven entity mapping for OData services
//!
//! Provides:
//! - Typed properties for every `Edm` primitive kind plus complex types
//! - Service metadata lookups (in-memory or loaded from CSDL)
//! - Entity decoding from Atom XML entries and JSON objects
//! - Entity encoding back to Atom XML and JSON
//!
//! ```no_run
//! use odata_entity_sdk::{Entity, EntityOptions, Schema};
//!
//! # fn main() -> odata_entity_sdk::Result<()> {
//! let schema = Schema::from_csdl_path("ODataDemo", "metadata.xml")?;
//! let options = EntityOptions::new("ODataDemo.Product", "ODataDemo");
//! let product = Entity::from_json(&schema, options, r#"{"ID": 0, "Name": "Bread"}"#)?;
//! println!("{}", product.to_xml()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod properties;
pub mod schema;
pub mod xml;

// Re-export commonly used types
pub use config::{XmlWriterConfig, XmlWriterConfigBuilder};
pub use entity::{Associations, Entity, EntityOptions, Link, LinkKind};
pub use error::{ODataError, Result};
pub use properties::{ComplexValue, GeographyPoint, Property, PropertyKind, PropertyValue};
pub use schema::{
    Association, ComplexType, ComplexTypeDeclaration, EntityType, EntityTypeDeclaration,
    PropertyDeclaration, Schema, SchemaBuilder, ServiceMetadata,
};
pub use xml::XmlElement;
