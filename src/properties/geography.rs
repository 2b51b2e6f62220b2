//! Geography point values

use serde_json::{Map, Value, json};

use crate::error::{ODataError, Result};
use crate::xml::XmlElement;

const KIND: &str = "Edm.GeographyPoint";
const SRS_PREFIX: &str = "http://www.opengis.net/def/crs/EPSG/0/";

/// WGS 84, the default coordinate reference system for geography values
pub const DEFAULT_SRID: u32 = 4326;

/// A point on the globe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographyPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub srid: u32,
}

impl GeographyPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            srid: DEFAULT_SRID,
        }
    }

    /// Parse the `"latitude longitude"` text of a `gml:pos` element
    pub fn parse(wire: &str) -> Result<Self> {
        let mut parts = wire.split_whitespace();
        let (Some(latitude), Some(longitude), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ODataError::coercion(KIND, wire, "expected \"latitude longitude\""));
        };
        Ok(Self::new(
            super::primitive::parse_double(KIND, latitude)?,
            super::primitive::parse_double(KIND, longitude)?,
        ))
    }

    /// Inverse of [`GeographyPoint::parse`]
    pub fn to_wire_string(&self) -> String {
        format!(
            "{} {}",
            super::primitive::format_double(self.latitude),
            super::primitive::format_double(self.longitude)
        )
    }

    /// `srsName` attribute value for GML output
    pub fn srs_name(&self) -> String {
        format!("{}{}", SRS_PREFIX, self.srid)
    }

    /// Decode from a property element holding a `gml:Point` (or a GeoRSS `point`)
    pub fn from_gml(element: &XmlElement) -> Result<Self> {
        let position = element
            .descendant("pos")
            .or_else(|| element.descendant("point"));

        let mut point = match position {
            Some(pos) => Self::parse(pos.text())?,
            None if element.children().is_empty() => Self::parse(element.text())?,
            None => {
                return Err(ODataError::coercion(
                    KIND,
                    element.name(),
                    "no coordinate element found",
                ));
            }
        };

        if let Some(srid) = element
            .descendant("Point")
            .and_then(|p| p.attribute("srsName"))
            .and_then(|name| name.rsplit('/').next())
            .and_then(|code| code.parse().ok())
        {
            point.srid = srid;
        }
        Ok(point)
    }

    /// Decode from a GeoJSON point object
    pub fn from_geojson(object: &Map<String, Value>) -> Result<Self> {
        let invalid = |reason: &str| {
            ODataError::coercion(KIND, Value::Object(object.clone()).to_string(), reason)
        };

        if object.get("type").and_then(Value::as_str) != Some("Point") {
            return Err(invalid("GeoJSON type must be Point"));
        }
        let coordinates = object
            .get("coordinates")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing coordinates"))?;
        let (longitude, latitude) = match coordinates.as_slice() {
            [lon, lat, ..] => (
                lon.as_f64().ok_or_else(|| invalid("longitude is not a number"))?,
                lat.as_f64().ok_or_else(|| invalid("latitude is not a number"))?,
            ),
            _ => return Err(invalid("expected [longitude, latitude]")),
        };

        let srid = object
            .get("crs")
            .and_then(|crs| crs.pointer("/properties/name"))
            .and_then(Value::as_str)
            .and_then(|name| name.rsplit(':').next())
            .and_then(|code| code.parse().ok())
            .unwrap_or(DEFAULT_SRID);

        Ok(Self {
            latitude,
            longitude,
            srid,
        })
    }

    /// GeoJSON form; coordinates are ordered longitude first
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
            "crs": {
                "type": "name",
                "properties": { "name": format!("EPSG:{}", self.srid) }
            }
        })
    }
}
