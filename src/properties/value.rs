//! Typed property values

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use uuid::Uuid;

use super::complex::ComplexValue;
use super::geography::GeographyPoint;
use super::primitive;

/// The typed value held by a [`Property`](super::Property)
///
/// There is one variant per primitive kind plus [`PropertyValue::Complex`]
/// for embedded structured values. `Edm.Time` and `Edm.Duration` share the
/// `Duration` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Binary(Vec<u8>),
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    /// Exact decimal; values parsed from the wire are normalised (`2.50` becomes `2.5`)
    Decimal(Decimal),
    String(String),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Date(NaiveDate),
    TimeOfDay(NaiveTime),
    Duration(TimeDelta),
    GeographyPoint(GeographyPoint),
    Complex(ComplexValue),
}

impl PropertyValue {
    /// Name of the variant, used in coercion errors
    pub fn variant_name(&self) -> &'static str {
        match self {
            PropertyValue::Binary(_) => "Binary",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Byte(_) => "Byte",
            PropertyValue::SByte(_) => "SByte",
            PropertyValue::Int16(_) => "Int16",
            PropertyValue::Int32(_) => "Int32",
            PropertyValue::Int64(_) => "Int64",
            PropertyValue::Single(_) => "Single",
            PropertyValue::Double(_) => "Double",
            PropertyValue::Decimal(_) => "Decimal",
            PropertyValue::String(_) => "String",
            PropertyValue::Guid(_) => "Guid",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::DateTimeOffset(_) => "DateTimeOffset",
            PropertyValue::Date(_) => "Date",
            PropertyValue::TimeOfDay(_) => "TimeOfDay",
            PropertyValue::Duration(_) => "Duration",
            PropertyValue::GeographyPoint(_) => "GeographyPoint",
            PropertyValue::Complex(_) => "Complex",
        }
    }

    /// Wire text for the value; `None` for complex values, which have no flat form
    pub fn to_wire_string(&self) -> Option<String> {
        let text = match self {
            PropertyValue::Binary(v) => primitive::format_binary(v),
            PropertyValue::Boolean(v) => v.to_string(),
            PropertyValue::Byte(v) => v.to_string(),
            PropertyValue::SByte(v) => v.to_string(),
            PropertyValue::Int16(v) => v.to_string(),
            PropertyValue::Int32(v) => v.to_string(),
            PropertyValue::Int64(v) => v.to_string(),
            PropertyValue::Single(v) => primitive::format_single(*v),
            PropertyValue::Double(v) => primitive::format_double(*v),
            PropertyValue::Decimal(v) => primitive::format_decimal(v),
            PropertyValue::String(v) => v.clone(),
            PropertyValue::Guid(v) => v.to_string(),
            PropertyValue::DateTime(v) => primitive::format_datetime(v),
            PropertyValue::DateTimeOffset(v) => primitive::format_datetime_offset(v),
            PropertyValue::Date(v) => primitive::format_date(v),
            PropertyValue::TimeOfDay(v) => primitive::format_time_of_day(v),
            PropertyValue::Duration(v) => primitive::format_duration(v),
            PropertyValue::GeographyPoint(v) => v.to_wire_string(),
            PropertyValue::Complex(_) => return None,
        };
        Some(text)
    }

    /// Native JSON representation
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Boolean(v) => Value::Bool(*v),
            PropertyValue::Byte(v) => Value::from(*v),
            PropertyValue::SByte(v) => Value::from(*v),
            PropertyValue::Int16(v) => Value::from(*v),
            PropertyValue::Int32(v) => Value::from(*v),
            PropertyValue::Int64(v) => Value::from(*v),
            PropertyValue::Single(v) => float_to_json(f64::from(*v), primitive::format_single(*v)),
            PropertyValue::Double(v) => float_to_json(*v, primitive::format_double(*v)),
            PropertyValue::Decimal(v) => decimal_to_json(v),
            PropertyValue::String(v) => Value::String(v.clone()),
            PropertyValue::GeographyPoint(v) => v.to_geojson(),
            PropertyValue::Complex(v) => v.to_json(),
            other => other
                .to_wire_string()
                .map(Value::String)
                .unwrap_or(Value::Null),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            PropertyValue::Decimal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer kind, widened
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Byte(v) => Some(i64::from(*v)),
            PropertyValue::SByte(v) => Some(i64::from(*v)),
            PropertyValue::Int16(v) => Some(i64::from(*v)),
            PropertyValue::Int32(v) => Some(i64::from(*v)),
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Any floating or integer kind, widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Single(v) => Some(f64::from(*v)),
            PropertyValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_guid(&self) -> Option<&Uuid> {
        match self {
            PropertyValue::Guid(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Binary(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            PropertyValue::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime_offset(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            PropertyValue::DateTimeOffset(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            PropertyValue::Date(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time_of_day(&self) -> Option<&NaiveTime> {
        match self {
            PropertyValue::TimeOfDay(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<&TimeDelta> {
        match self {
            PropertyValue::Duration(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&GeographyPoint> {
        match self {
            PropertyValue::GeographyPoint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexValue> {
        match self {
            PropertyValue::Complex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut ComplexValue> {
        match self {
            PropertyValue::Complex(v) => Some(v),
            _ => None,
        }
    }
}

fn float_to_json(value: f64, text: String) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

/// A JSON number when a double carries the value exactly, otherwise the decimal text
fn decimal_to_json(value: &Decimal) -> Value {
    let text = primitive::format_decimal(value);
    text.parse::<f64>()
        .ok()
        .filter(|float| primitive::format_double(*float) == text)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for PropertyValue {
                fn from(value: $source) -> Self {
                    PropertyValue::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    Vec<u8> => Binary,
    bool => Boolean,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Uuid => Guid,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveDate => Date,
    NaiveTime => TimeOfDay,
    TimeDelta => Duration,
    GeographyPoint => GeographyPoint,
    ComplexValue => Complex,
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::DateTimeOffset(value.fixed_offset())
    }
}
