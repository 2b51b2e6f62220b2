//! Declared property kinds

use std::sync::Arc;

use serde_json::Value;

use super::complex::ComplexValue;
use super::geography::GeographyPoint;
use super::primitive;
use super::value::PropertyValue;
use crate::error::{ODataError, Result};
use crate::schema::{ComplexType, ServiceMetadata};
use crate::xml::XmlElement;

/// The declared kind of a property
///
/// Primitive kinds map one-to-one onto `Edm.*` type names. Complex kinds
/// carry the shared, read-only [`ComplexType`] definition they are bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Binary,
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Guid,
    DateTime,
    DateTimeOffset,
    Date,
    TimeOfDay,
    Duration,
    /// `Edm.Time` of older services; same values as `Duration`
    Time,
    GeographyPoint,
    /// `Edm.Stream`; media content lives behind its own link and never
    /// appears inline, so values of this kind stay null
    Stream,
    Complex(Arc<ComplexType>),
}

impl PropertyKind {
    /// Look up a primitive kind by name, with or without the `Edm.` prefix
    pub fn primitive(type_name: &str) -> Option<Self> {
        let kind = match type_name.strip_prefix("Edm.").unwrap_or(type_name) {
            "Binary" => PropertyKind::Binary,
            "Boolean" => PropertyKind::Boolean,
            "Byte" => PropertyKind::Byte,
            "SByte" => PropertyKind::SByte,
            "Int16" => PropertyKind::Int16,
            "Int32" => PropertyKind::Int32,
            "Int64" => PropertyKind::Int64,
            "Single" => PropertyKind::Single,
            "Double" => PropertyKind::Double,
            "Decimal" => PropertyKind::Decimal,
            "String" => PropertyKind::String,
            "Guid" => PropertyKind::Guid,
            "DateTime" => PropertyKind::DateTime,
            "DateTimeOffset" => PropertyKind::DateTimeOffset,
            "Date" => PropertyKind::Date,
            "TimeOfDay" => PropertyKind::TimeOfDay,
            "Duration" => PropertyKind::Duration,
            "Time" => PropertyKind::Time,
            "GeographyPoint" => PropertyKind::GeographyPoint,
            "Stream" => PropertyKind::Stream,
            _ => return None,
        };
        Some(kind)
    }

    /// Resolve a declared type name, asking `complex` for anything that is
    /// not a primitive kind.
    ///
    /// Unrecognised `Edm.*` names and collection types fail with
    /// [`ODataError::SchemaResolution`].
    pub fn resolve_with<F>(type_name: &str, mut complex: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Arc<ComplexType>>,
    {
        if let Some(kind) = Self::primitive(type_name) {
            return Ok(kind);
        }
        if type_name.starts_with("Edm.") || type_name.starts_with("Collection(") {
            return Err(ODataError::SchemaResolution(format!(
                "no property variant for kind '{}'",
                type_name
            )));
        }
        complex(type_name).map(PropertyKind::Complex)
    }

    /// Resolve a declared type name against a loaded service schema
    pub fn resolve(type_name: &str, schema: &dyn ServiceMetadata) -> Result<Self> {
        Self::resolve_with(type_name, |name| schema.complex_type(name))
    }

    /// Declared type name as written in XML `metadata:type` attributes
    pub fn type_name(&self) -> &str {
        match self {
            PropertyKind::Binary => "Edm.Binary",
            PropertyKind::Boolean => "Edm.Boolean",
            PropertyKind::Byte => "Edm.Byte",
            PropertyKind::SByte => "Edm.SByte",
            PropertyKind::Int16 => "Edm.Int16",
            PropertyKind::Int32 => "Edm.Int32",
            PropertyKind::Int64 => "Edm.Int64",
            PropertyKind::Single => "Edm.Single",
            PropertyKind::Double => "Edm.Double",
            PropertyKind::Decimal => "Edm.Decimal",
            PropertyKind::String => "Edm.String",
            PropertyKind::Guid => "Edm.Guid",
            PropertyKind::DateTime => "Edm.DateTime",
            PropertyKind::DateTimeOffset => "Edm.DateTimeOffset",
            PropertyKind::Date => "Edm.Date",
            PropertyKind::TimeOfDay => "Edm.TimeOfDay",
            PropertyKind::Duration => "Edm.Duration",
            PropertyKind::Time => "Edm.Time",
            PropertyKind::GeographyPoint => "Edm.GeographyPoint",
            PropertyKind::Stream => "Edm.Stream",
            PropertyKind::Complex(complex_type) => complex_type.type_name(),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, PropertyKind::Complex(_))
    }

    /// Stream properties are declared but skipped by the payload codecs
    pub fn is_stream(&self) -> bool {
        matches!(self, PropertyKind::Stream)
    }

    /// The bound complex type, for complex kinds
    pub fn complex_type(&self) -> Option<&Arc<ComplexType>> {
        match self {
            PropertyKind::Complex(complex_type) => Some(complex_type),
            _ => None,
        }
    }

    /// Parse a wire string into a value of this kind
    pub fn parse(&self, wire: &str) -> Result<PropertyValue> {
        let kind = self.type_name();
        let value = match self {
            PropertyKind::Binary => PropertyValue::Binary(primitive::parse_binary(kind, wire)?),
            PropertyKind::Boolean => PropertyValue::Boolean(primitive::parse_boolean(kind, wire)?),
            PropertyKind::Byte => PropertyValue::Byte(primitive::parse_integer(kind, wire)?),
            PropertyKind::SByte => PropertyValue::SByte(primitive::parse_integer(kind, wire)?),
            PropertyKind::Int16 => PropertyValue::Int16(primitive::parse_integer(kind, wire)?),
            PropertyKind::Int32 => PropertyValue::Int32(primitive::parse_integer(kind, wire)?),
            PropertyKind::Int64 => PropertyValue::Int64(primitive::parse_integer(kind, wire)?),
            PropertyKind::Single => PropertyValue::Single(primitive::parse_single(kind, wire)?),
            PropertyKind::Double => PropertyValue::Double(primitive::parse_double(kind, wire)?),
            PropertyKind::Decimal => PropertyValue::Decimal(primitive::parse_decimal(kind, wire)?),
            PropertyKind::String => PropertyValue::String(wire.to_string()),
            PropertyKind::Guid => PropertyValue::Guid(primitive::parse_guid(kind, wire)?),
            PropertyKind::DateTime => {
                PropertyValue::DateTime(primitive::parse_datetime(kind, wire)?)
            }
            PropertyKind::DateTimeOffset => {
                PropertyValue::DateTimeOffset(primitive::parse_datetime_offset(kind, wire)?)
            }
            PropertyKind::Date => PropertyValue::Date(primitive::parse_date(kind, wire)?),
            PropertyKind::TimeOfDay => {
                PropertyValue::TimeOfDay(primitive::parse_time_of_day(kind, wire)?)
            }
            PropertyKind::Duration | PropertyKind::Time => {
                PropertyValue::Duration(primitive::parse_duration(kind, wire)?)
            }
            PropertyKind::GeographyPoint => {
                PropertyValue::GeographyPoint(GeographyPoint::parse(wire)?)
            }
            PropertyKind::Complex(_) => {
                return Err(ODataError::coercion(
                    kind,
                    wire,
                    "complex values have no text form",
                ));
            }
            PropertyKind::Stream => {
                return Err(ODataError::coercion(
                    kind,
                    wire,
                    "stream values are not carried inline",
                ));
            }
        };
        Ok(value)
    }

    /// Whether `value` is already exactly of this kind
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (PropertyKind::Complex(expected), PropertyValue::Complex(actual)) => {
                expected.type_name() == actual.type_name()
            }
            (PropertyKind::Duration | PropertyKind::Time, PropertyValue::Duration(_)) => true,
            (kind, value) => !kind.is_complex() && kind.variant_name() == value.variant_name(),
        }
    }

    fn variant_name(&self) -> &str {
        self.type_name().strip_prefix("Edm.").unwrap_or_default()
    }

    /// Coerce an already-typed value into this kind.
    ///
    /// Exact matches are stored as given, strings are parsed, integers
    /// widen (range-checked) and floats convert between precisions.
    pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue> {
        if self.accepts(&value) {
            return Ok(value);
        }
        if let PropertyValue::String(text) = &value {
            return self.parse(text);
        }
        if let Some(integer) = value.as_i64() {
            return self.widen_integer(integer);
        }

        let kind = self.type_name();
        match (self, value) {
            (PropertyKind::Single, PropertyValue::Double(v)) => Ok(PropertyValue::Single(v as f32)),
            (PropertyKind::Double, PropertyValue::Single(v)) => {
                Ok(PropertyValue::Double(f64::from(v)))
            }
            (PropertyKind::Decimal, PropertyValue::Double(v)) => {
                let text = primitive::format_double(v);
                Ok(PropertyValue::Decimal(primitive::parse_decimal(kind, &text)?))
            }
            (PropertyKind::DateTimeOffset, PropertyValue::DateTime(v)) => {
                Ok(PropertyValue::DateTimeOffset(v.and_utc().fixed_offset()))
            }
            (PropertyKind::DateTime, PropertyValue::DateTimeOffset(v)) => {
                Ok(PropertyValue::DateTime(v.naive_utc()))
            }
            (_, other) => Err(ODataError::coercion(
                kind,
                other.to_wire_string().unwrap_or_else(|| other.variant_name().to_string()),
                format!("a {} value cannot be stored in {}", other.variant_name(), kind),
            )),
        }
    }

    fn widen_integer(&self, integer: i64) -> Result<PropertyValue> {
        let kind = self.type_name();
        let out_of_range = |e: std::num::TryFromIntError| ODataError::coercion(kind, integer.to_string(), e);
        match self {
            PropertyKind::Byte => u8::try_from(integer).map(PropertyValue::Byte).map_err(out_of_range),
            PropertyKind::SByte => i8::try_from(integer).map(PropertyValue::SByte).map_err(out_of_range),
            PropertyKind::Int16 => i16::try_from(integer).map(PropertyValue::Int16).map_err(out_of_range),
            PropertyKind::Int32 => i32::try_from(integer).map(PropertyValue::Int32).map_err(out_of_range),
            PropertyKind::Int64 => Ok(PropertyValue::Int64(integer)),
            PropertyKind::Single => Ok(PropertyValue::Single(integer as f32)),
            PropertyKind::Double => Ok(PropertyValue::Double(integer as f64)),
            PropertyKind::Decimal => Ok(PropertyValue::Decimal(integer.into())),
            _ => Err(ODataError::coercion(
                kind,
                integer.to_string(),
                "integers cannot be stored in this kind",
            )),
        }
    }

    /// Decode a JSON value; `null` is an explicit null
    pub fn decode_json(&self, value: &Value) -> Result<Option<PropertyValue>> {
        let kind = self.type_name();
        let mismatch = |reason: &str| ODataError::coercion(kind, value.to_string(), reason);

        if self.is_stream() {
            return Ok(None);
        }
        let decoded = match value {
            Value::Null => return Ok(None),
            Value::String(text) => self.parse(text)?,
            Value::Bool(flag) => match self {
                PropertyKind::Boolean => PropertyValue::Boolean(*flag),
                _ => return Err(mismatch("unexpected boolean")),
            },
            Value::Number(number) => match self {
                PropertyKind::Single | PropertyKind::Double => {
                    let float = number.as_f64().ok_or_else(|| mismatch("not a finite number"))?;
                    self.coerce(PropertyValue::Double(float))?
                }
                PropertyKind::Decimal => {
                    PropertyValue::Decimal(primitive::parse_decimal(kind, &number.to_string())?)
                }
                _ => {
                    let integer = number
                        .as_i64()
                        .ok_or_else(|| mismatch("expected an integer"))?;
                    self.widen_integer(integer)?
                }
            },
            Value::Object(object) => match self {
                PropertyKind::Complex(complex_type) => {
                    PropertyValue::Complex(ComplexValue::from_json(complex_type, object)?)
                }
                PropertyKind::GeographyPoint => {
                    PropertyValue::GeographyPoint(GeographyPoint::from_geojson(object)?)
                }
                _ => return Err(mismatch("unexpected object")),
            },
            Value::Array(_) => return Err(mismatch("collections are not supported")),
        };
        Ok(Some(decoded))
    }

    /// Decode a property element; a `null="true"` marker wins over any content
    pub fn decode_xml(&self, element: &XmlElement) -> Result<Option<PropertyValue>> {
        if element.is_null() || self.is_stream() {
            return Ok(None);
        }
        let decoded = match self {
            PropertyKind::Complex(complex_type) => {
                PropertyValue::Complex(ComplexValue::from_xml(complex_type, element)?)
            }
            PropertyKind::GeographyPoint => {
                PropertyValue::GeographyPoint(GeographyPoint::from_gml(element)?)
            }
            _ => self.parse(element.text())?,
        };
        Ok(Some(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use serde_json::json;

    fn no_complex_types(name: &str) -> Result<Arc<ComplexType>> {
        Err(ODataError::SchemaResolution(format!("unknown complex type '{}'", name)))
    }

    #[test]
    fn test_resolve_strips_edm_prefix() {
        assert_eq!(
            PropertyKind::resolve_with("Edm.Int32", no_complex_types).unwrap(),
            PropertyKind::Int32
        );
        assert_eq!(
            PropertyKind::resolve_with("DateTimeOffset", no_complex_types).unwrap(),
            PropertyKind::DateTimeOffset
        );
    }

    #[test]
    fn test_resolve_unknown_kind_is_schema_error() {
        for name in ["Edm.Untyped", "Collection(Edm.String)", "Demo.Missing"] {
            let result = PropertyKind::resolve_with(name, no_complex_types);
            assert!(
                matches!(result, Err(ODataError::SchemaResolution(_))),
                "expected schema error for {}",
                name
            );
        }
    }

    #[test]
    fn test_parse_round_trip_for_every_primitive() {
        let samples = [
            (PropertyKind::Binary, "SGVsbG8="),
            (PropertyKind::Boolean, "true"),
            (PropertyKind::Byte, "255"),
            (PropertyKind::SByte, "-128"),
            (PropertyKind::Int16, "4"),
            (PropertyKind::Int32, "-2147483648"),
            (PropertyKind::Int64, "9223372036854775807"),
            (PropertyKind::Single, "3.25"),
            (PropertyKind::Double, "2.5"),
            (PropertyKind::Decimal, "199.99"),
            (PropertyKind::String, " Whole grain bread "),
            (PropertyKind::Guid, "0b5e8e1d-6a27-4c6e-9d0e-2d7c0f7a9d11"),
            (PropertyKind::DateTime, "2008-12-31T23:59:59.5"),
            (PropertyKind::DateTimeOffset, "1992-01-01T00:00:00Z"),
            (PropertyKind::Date, "1992-01-01"),
            (PropertyKind::TimeOfDay, "23:59:59"),
            (PropertyKind::Duration, "P2DT3H"),
            (PropertyKind::Time, "PT12H30M"),
            (PropertyKind::GeographyPoint, "47.5 -122.25"),
        ];
        for (kind, wire) in samples {
            let value = kind.parse(wire).unwrap();
            assert!(kind.accepts(&value), "{} rejected its own value", kind.type_name());
            let text = value.to_wire_string().unwrap();
            assert_eq!(kind.parse(&text).unwrap(), value, "round trip of {}", wire);
        }
    }

    #[test]
    fn test_parse_failure_is_coercion_error() {
        let err = PropertyKind::Int32.parse("Bread").unwrap_err();
        assert!(matches!(err, ODataError::TypeCoercion { .. }));
        assert!(PropertyKind::Guid.parse("not-a-guid").is_err());
    }

    #[test]
    fn test_coerce_typed_values() {
        assert_eq!(
            PropertyKind::Int64.coerce(PropertyValue::Int32(4)).unwrap(),
            PropertyValue::Int64(4)
        );
        assert_eq!(
            PropertyKind::Double.coerce(PropertyValue::Int32(2)).unwrap(),
            PropertyValue::Double(2.0)
        );
        assert_eq!(
            PropertyKind::Date.coerce("1992-01-01".into()).unwrap(),
            PropertyValue::Date(NaiveDate::from_ymd_opt(1992, 1, 1).unwrap())
        );
        assert!(PropertyKind::Byte.coerce(PropertyValue::Int32(300)).is_err());
        assert!(PropertyKind::Boolean.coerce(PropertyValue::Double(1.0)).is_err());
        assert_eq!(
            PropertyKind::Time.coerce(PropertyValue::Duration(TimeDelta::hours(1))).unwrap(),
            PropertyValue::Duration(TimeDelta::hours(1))
        );
    }

    #[test]
    fn test_decode_json_values() {
        assert_eq!(PropertyKind::Int32.decode_json(&json!(4)).unwrap(), Some(PropertyValue::Int32(4)));
        assert_eq!(PropertyKind::Int64.decode_json(&json!("42")).unwrap(), Some(PropertyValue::Int64(42)));
        assert_eq!(PropertyKind::Double.decode_json(&json!(2.5)).unwrap(), Some(PropertyValue::Double(2.5)));
        assert_eq!(PropertyKind::Double.decode_json(&json!("INF")).unwrap(), Some(PropertyValue::Double(f64::INFINITY)));
        assert_eq!(PropertyKind::String.decode_json(&json!(null)).unwrap(), None);
        assert!(PropertyKind::Int32.decode_json(&json!(2.5)).is_err());
        assert!(PropertyKind::String.decode_json(&json!(true)).is_err());
        assert!(PropertyKind::String.decode_json(&json!(["a"])).is_err());
    }

    #[test]
    fn test_decimal_values_compare_numerically() {
        let from_xml = PropertyKind::Decimal
            .decode_xml(&XmlElement::new("Price").with_text("2.50"))
            .unwrap();
        let from_json = PropertyKind::Decimal.decode_json(&json!(2.50)).unwrap();
        assert_eq!(from_xml, from_json);
        assert_eq!(
            PropertyKind::Decimal.coerce(PropertyValue::Double(0.1)).unwrap(),
            PropertyValue::Decimal(rust_decimal::Decimal::new(1, 1))
        );
        assert_eq!(
            PropertyKind::Decimal.coerce(PropertyValue::Int32(7)).unwrap(),
            PropertyValue::Decimal(rust_decimal::Decimal::from(7))
        );
    }

    #[test]
    fn test_stream_kind_is_never_inline() {
        let kind = PropertyKind::resolve_with("Edm.Stream", no_complex_types).unwrap();
        assert!(kind.is_stream());
        assert_eq!(kind.type_name(), "Edm.Stream");
        assert_eq!(kind.decode_json(&json!("aGk=")).unwrap(), None);
        assert_eq!(kind.decode_xml(&XmlElement::new("Photo").with_text("aGk=")).unwrap(), None);
        assert!(kind.parse("aGk=").is_err());
        assert!(kind.coerce("aGk=".into()).is_err());
    }

    #[test]
    fn test_decode_xml_null_marker_wins() {
        let element = XmlElement::new("Rating")
            .with_attribute("null", "true")
            .with_text("4");
        assert_eq!(PropertyKind::Int32.decode_xml(&element).unwrap(), None);

        let element = XmlElement::new("Rating").with_text("4");
        assert_eq!(
            PropertyKind::Int32.decode_xml(&element).unwrap(),
            Some(PropertyValue::Int32(4))
        );
    }
}
