//! Values of complex (structured) types

use std::sync::Arc;

use serde_json::{Map, Value};

use super::Property;
use super::value::PropertyValue;
use crate::error::{ODataError, Result};
use crate::schema::ComplexType;
use crate::xml::XmlElement;

/// One instance of a [`ComplexType`]
///
/// Holds its own clones of the type's property prototypes, so mutating one
/// instance never affects another. The type definition itself is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexValue {
    complex_type: Arc<ComplexType>,
    properties: Vec<Property>,
}

impl ComplexValue {
    /// Create an instance with every declared property null
    pub fn new(complex_type: Arc<ComplexType>) -> Self {
        let properties = complex_type.properties().to_vec();
        Self {
            complex_type,
            properties,
        }
    }

    pub fn complex_type(&self) -> &Arc<ComplexType> {
        &self.complex_type
    }

    /// Namespaced name of the bound complex type
    pub fn type_name(&self) -> &str {
        self.complex_type.type_name()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.properties
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| ODataError::UnknownProperty(format!("{}.{}", self.type_name(), name)))
    }

    pub fn property_mut(&mut self, name: &str) -> Result<&mut Property> {
        let type_name = self.complex_type.type_name();
        self.properties
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| ODataError::UnknownProperty(format!("{}.{}", type_name, name)))
    }

    /// Current value of a sub-property
    pub fn get(&self, name: &str) -> Result<Option<&PropertyValue>> {
        Ok(self.property(name)?.value())
    }

    /// Assign a sub-property, coercing into its declared kind
    pub fn set(&mut self, name: &str, value: Option<PropertyValue>) -> Result<()> {
        self.property_mut(name)?.set_value(value)
    }

    fn directory_miss(&self, name: &str) -> ODataError {
        ODataError::SchemaResolution(format!(
            "complex type '{}' declares no property '{}'",
            self.type_name(),
            name
        ))
    }

    /// Decode the child elements of a complex property element
    pub fn from_xml(complex_type: &Arc<ComplexType>, element: &XmlElement) -> Result<Self> {
        let mut value = Self::new(Arc::clone(complex_type));
        for child in element.children() {
            let property = value
                .properties
                .iter_mut()
                .find(|p| p.name() == child.name());
            match property {
                Some(property) => property.decode_xml(child)?,
                None => return Err(value.directory_miss(child.name())),
            }
        }
        Ok(value)
    }

    /// Decode a nested JSON object; annotation keys (containing `@`) are skipped
    pub fn from_json(complex_type: &Arc<ComplexType>, object: &Map<String, Value>) -> Result<Self> {
        let mut value = Self::new(Arc::clone(complex_type));
        for (key, json) in object {
            if key.contains('@') || key.starts_with("__") {
                continue;
            }
            let property = value.properties.iter_mut().find(|p| p.name() == key);
            match property {
                Some(property) => property.decode_json(json)?,
                None => return Err(value.directory_miss(key)),
            }
        }
        Ok(value)
    }

    /// Nested JSON object in declaration order
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.properties
                .iter()
                .filter(|p| !p.kind().is_stream())
                .map(|p| (p.name().to_string(), p.to_json()))
                .collect(),
        )
    }
}
