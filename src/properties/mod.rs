//! Typed property cells
//!
//! A [`Property`] is a named, nullable value with a declared [`PropertyKind`].
//! Properties are created empty from schema prototypes, cloned per entity or
//! complex-type instance, and then populated by assignment or by decoding a
//! wire value. The kind owns the parse/serialize rules.

pub mod complex;
pub mod geography;
pub mod kind;
pub mod primitive;
pub mod value;

use serde_json::Value;

use crate::error::Result;
use crate::xml::XmlElement;

pub use complex::ComplexValue;
pub use geography::GeographyPoint;
pub use kind::PropertyKind;
pub use value::PropertyValue;

/// A named, typed, nullable value cell
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    value: Option<PropertyValue>,
}

impl Property {
    /// Create an empty (null) property
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: None,
        }
    }

    /// Create a property and assign an initial value
    pub fn with_value(
        name: impl Into<String>,
        kind: PropertyKind,
        value: Option<PropertyValue>,
    ) -> Result<Self> {
        let mut property = Self::new(name, kind);
        property.set_value(value)?;
        Ok(property)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Declared type name, e.g. `Edm.Int32` or `ODataDemo.Address`
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut PropertyValue> {
        self.value.as_mut()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Assign an already-typed value, coercing it into the declared kind
    pub fn set_value(&mut self, value: Option<PropertyValue>) -> Result<()> {
        self.value = value.map(|v| self.kind.coerce(v)).transpose()?;
        Ok(())
    }

    /// Parse and store a wire string; `None` is an explicit null
    pub fn set_wire(&mut self, wire: Option<&str>) -> Result<()> {
        self.value = wire.map(|w| self.kind.parse(w)).transpose()?;
        Ok(())
    }

    /// Decode the value from a property element
    pub fn decode_xml(&mut self, element: &XmlElement) -> Result<()> {
        self.value = self.kind.decode_xml(element)?;
        Ok(())
    }

    /// Decode the value from a JSON value
    pub fn decode_json(&mut self, value: &Value) -> Result<()> {
        self.value = self.kind.decode_json(value)?;
        Ok(())
    }

    /// Serialized wire string; `None` when null or complex
    pub fn wire_value(&self) -> Option<String> {
        self.value.as_ref().and_then(PropertyValue::to_wire_string)
    }

    /// Native JSON value; `null` when the property is null
    pub fn to_json(&self) -> Value {
        self.value
            .as_ref()
            .map(PropertyValue::to_json)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ODataError;

    #[test]
    fn test_new_property_is_null() {
        let property = Property::new("Rating", PropertyKind::Int32);
        assert!(property.is_null());
        assert_eq!(property.type_name(), "Edm.Int32");
        assert_eq!(property.to_json(), Value::Null);
        assert_eq!(property.wire_value(), None);
    }

    #[test]
    fn test_set_wire_parses() {
        let mut property = Property::new("Price", PropertyKind::Double);
        property.set_wire(Some("2.5")).unwrap();
        assert_eq!(property.value(), Some(&PropertyValue::Double(2.5)));
        assert_eq!(property.wire_value().as_deref(), Some("2.5"));

        property.set_wire(None).unwrap();
        assert!(property.is_null());
    }

    #[test]
    fn test_failed_parse_keeps_previous_value() {
        let mut property = Property::with_value("Rating", PropertyKind::Int32, Some(4.into())).unwrap();
        let err = property.set_wire(Some("four")).unwrap_err();
        assert!(matches!(err, ODataError::TypeCoercion { .. }));
        assert_eq!(property.value(), Some(&PropertyValue::Int32(4)));
    }

    #[test]
    fn test_clones_are_independent() {
        let prototype = Property::new("Name", PropertyKind::String);
        let mut first = prototype.clone();
        first.set_value(Some("Bread".into())).unwrap();
        assert!(prototype.is_null());
        assert_eq!(first.value().and_then(PropertyValue::as_str), Some("Bread"));
    }
}
