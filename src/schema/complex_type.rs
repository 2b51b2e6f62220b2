//! Complex type definitions

use std::sync::Arc;

use crate::error::{ODataError, Result};
use crate::properties::{ComplexValue, Property, PropertyKind};
use crate::xml::XmlElement;

/// A declared property: name plus declared type name, before kind resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDeclaration {
    pub name: String,
    pub type_name: String,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Read a `<Property Name=".." Type=".."/>` element
    pub fn from_xml(node: &XmlElement) -> Result<Self> {
        let name = required_attribute(node, "Name")?;
        let type_name = required_attribute(node, "Type")?;
        Ok(Self::new(name, type_name))
    }
}

pub(crate) fn required_attribute<'a>(node: &'a XmlElement, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        ODataError::SchemaResolution(format!(
            "<{}> is missing the '{}' attribute",
            node.name(),
            name
        ))
    })
}

/// The unresolved form of a complex type, as read from metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexTypeDeclaration {
    pub name: String,
    pub properties: Vec<PropertyDeclaration>,
}

impl ComplexTypeDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Add a property declaration (builder style)
    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.push(PropertyDeclaration::new(name, type_name));
        self
    }

    /// Read a `<ComplexType Name="..">` element and its `<Property>` children
    pub fn from_xml(node: &XmlElement) -> Result<Self> {
        let name = required_attribute(node, "Name")?;
        let properties = node
            .children_named("Property")
            .map(PropertyDeclaration::from_xml)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            properties,
        })
    }
}

/// A named structured type
///
/// The property directory is fixed at construction. Entities and other
/// complex types embed it through [`ComplexType::property`], and each
/// instance gets its own clones of the prototypes.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    name: String,
    namespace: String,
    type_name: String,
    properties: Vec<Property>,
}

impl ComplexType {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        properties: Vec<Property>,
    ) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        let type_name = if namespace.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", namespace, name)
        };
        Self {
            name,
            namespace,
            type_name,
            properties,
        }
    }

    /// Load from a `<ComplexType>` element, resolving each property kind with `resolve`
    pub fn load<F>(node: &XmlElement, namespace: &str, resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<PropertyKind>,
    {
        Self::from_declaration(&ComplexTypeDeclaration::from_xml(node)?, namespace, resolve)
    }

    /// Build from a parsed declaration, resolving each property kind with `resolve`
    pub fn from_declaration<F>(
        declaration: &ComplexTypeDeclaration,
        namespace: &str,
        mut resolve: F,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Result<PropertyKind>,
    {
        let mut properties = Vec::with_capacity(declaration.properties.len());
        for property in &declaration.properties {
            if properties.iter().any(|p: &Property| p.name() == property.name) {
                return Err(ODataError::SchemaResolution(format!(
                    "complex type '{}' declares '{}' twice",
                    declaration.name, property.name
                )));
            }
            properties.push(Property::new(
                property.name.as_str(),
                resolve(&property.type_name)?,
            ));
        }
        Ok(Self::new(declaration.name.as_str(), namespace, properties))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespaced name, e.g. `ODataDemo.Address`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Property prototypes in declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(Property::name).collect()
    }

    /// Prototype of one sub-property
    pub fn prototype(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// A fresh instance with every sub-property null
    pub fn instantiate(self: &Arc<Self>) -> ComplexValue {
        ComplexValue::new(Arc::clone(self))
    }

    /// An empty property bound to this complex type
    pub fn property(self: &Arc<Self>, name: impl Into<String>) -> Property {
        Property::new(name, PropertyKind::Complex(Arc::clone(self)))
    }
}
