//! CSDL (`$metadata`) loader
//!
//! Reads the entity data model of a service into a [`Schema`]. Both the v2/v3
//! dialect (associations, feed customisation attributes) and the v4 dialect
//! (typed navigation properties) are understood.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::complex_type::required_attribute;
use super::{ComplexTypeDeclaration, EntityTypeDeclaration, PropertyDeclaration, Schema};
use crate::error::{ODataError, Result};
use crate::xml::XmlElement;

const SYNDICATION_TITLE: &str = "SyndicationTitle";
const SYNDICATION_SUMMARY: &str = "SyndicationSummary";

/// One end of a v2 association: role name to (entity type, multiplicity)
type AssociationEnds<'a> = HashMap<&'a str, (&'a str, &'a str)>;

impl Schema {
    /// Load a schema from a CSDL document
    pub fn from_csdl(service_name: &str, xml: &str) -> Result<Self> {
        let document = XmlElement::parse(xml)?;
        Self::from_csdl_element(service_name, &document)
    }

    /// Load a schema from a `$metadata` document saved on disk
    pub fn from_csdl_path(service_name: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading metadata from {}", path.display());
        let xml = std::fs::read_to_string(path)?;
        Self::from_csdl(service_name, &xml)
    }

    /// Load a schema from a parsed CSDL document
    ///
    /// The first `Schema` element declaring entity or complex types is used.
    pub fn from_csdl_element(service_name: &str, document: &XmlElement) -> Result<Self> {
        let schemas = if document.name() == "Schema" {
            vec![document]
        } else {
            document.descendants_named("Schema")
        };
        let schema = schemas
            .iter()
            .copied()
            .find(|s| s.child("EntityType").is_some() || s.child("ComplexType").is_some())
            .or_else(|| schemas.first().copied())
            .ok_or_else(|| {
                ODataError::SchemaResolution("metadata document has no Schema element".to_string())
            })?;
        if schemas.len() > 1 {
            debug!(
                "Metadata has {} Schema elements, using '{}'",
                schemas.len(),
                schema.attribute("Namespace").unwrap_or_default()
            );
        }

        let namespace = required_attribute(schema, "Namespace")?;
        let mut builder = Schema::builder(service_name, namespace);
        if let Some(alias) = schema.attribute("Alias") {
            builder = builder.alias(alias);
        }

        for node in schema.children_named("ComplexType") {
            builder = builder.complex_type(ComplexTypeDeclaration::from_xml(node)?);
        }

        let associations = read_associations(schema)?;
        for node in schema.children_named("EntityType") {
            builder = builder.entity_type(read_entity_type(node, &associations)?);
        }

        builder.build()
    }
}

fn read_associations(schema: &XmlElement) -> Result<HashMap<&str, AssociationEnds<'_>>> {
    let mut associations = HashMap::new();
    for node in schema.children_named("Association") {
        let name = required_attribute(node, "Name")?;
        let mut ends = HashMap::new();
        for end in node.children_named("End") {
            ends.insert(
                required_attribute(end, "Role")?,
                (
                    required_attribute(end, "Type")?,
                    end.attribute("Multiplicity").unwrap_or("1"),
                ),
            );
        }
        associations.insert(name, ends);
    }
    Ok(associations)
}

fn read_entity_type(
    node: &XmlElement,
    associations: &HashMap<&str, AssociationEnds<'_>>,
) -> Result<EntityTypeDeclaration> {
    let mut declaration = EntityTypeDeclaration::new(required_attribute(node, "Name")?);
    if let Some(base) = node.attribute("BaseType") {
        declaration = declaration.base_type(base);
    }

    if let Some(key) = node.child("Key") {
        for reference in key.children_named("PropertyRef") {
            declaration = declaration.key(required_attribute(reference, "Name")?);
        }
    }

    for property in node.children_named("Property") {
        let parsed = PropertyDeclaration::from_xml(property)?;
        match property.attribute("FC_TargetPath") {
            Some(SYNDICATION_TITLE) => declaration = declaration.title_property(parsed.name.as_str()),
            Some(SYNDICATION_SUMMARY) => {
                declaration = declaration.summary_property(parsed.name.as_str())
            }
            _ => {}
        }
        declaration.properties.push(parsed);
    }

    for navigation in node.children_named("NavigationProperty") {
        let name = required_attribute(navigation, "Name")?;
        let (target, to_many) = match navigation.attribute("Type") {
            Some(type_name) => match type_name
                .strip_prefix("Collection(")
                .and_then(|inner| inner.strip_suffix(')'))
            {
                Some(inner) => (inner, true),
                None => (type_name, false),
            },
            None => association_end(navigation, associations)?,
        };
        declaration = declaration.navigation(name, target, to_many);
    }

    Ok(declaration)
}

/// Target type and cardinality of a v2 navigation property
fn association_end<'a>(
    navigation: &XmlElement,
    associations: &HashMap<&str, AssociationEnds<'a>>,
) -> Result<(&'a str, bool)> {
    let relationship = required_attribute(navigation, "Relationship")?;
    let to_role = required_attribute(navigation, "ToRole")?;
    let association_name = relationship.rsplit('.').next().unwrap_or(relationship);

    let (target, multiplicity) = associations
        .get(association_name)
        .and_then(|ends| ends.get(to_role))
        .copied()
        .ok_or_else(|| {
            ODataError::SchemaResolution(format!(
                "navigation property '{}' refers to unknown association end {}/{}",
                navigation.attribute("Name").unwrap_or_default(),
                relationship,
                to_role
            ))
        })?;
    Ok((target, multiplicity == "*"))
}
