//! JSON entity decoding and encoding

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Entity, EntityOptions, Link};
use crate::error::{ODataError, Result};
use crate::properties::{Property, PropertyKind};
use crate::schema::ServiceMetadata;

const NAVIGATION_LINK: &str = "odata.navigationLink";

impl Entity {
    /// Decode a JSON document
    pub fn from_json(schema: &dyn ServiceMetadata, options: EntityOptions, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(schema, options, &value)
    }

    /// Decode an already parsed JSON object
    ///
    /// Accepts a flat object or the verbose `{"d": {...}}` wrapper.
    /// Annotation keys (`@odata.*`, `__metadata`) are skipped, except
    /// navigation link annotations and `__deferred` values, which become
    /// [`links`](Entity::links).
    pub fn from_json_value(
        schema: &dyn ServiceMetadata,
        options: EntityOptions,
        value: &Value,
    ) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ODataError::JsonParse(format!("expected an entity object, found {}", value)))?;
        let object = match object.get("d") {
            Some(Value::Object(inner)) if object.len() == 1 => inner,
            _ => object,
        };

        let mut entity = Self::new(schema, options)?;
        for (key, json) in object {
            if let Some((name, annotation)) = key.split_once('@') {
                if annotation == NAVIGATION_LINK && !name.is_empty() {
                    entity.json_link(name, json);
                }
                continue;
            }
            if key.starts_with("__") {
                continue;
            }
            if entity.associations.contains(key) {
                match json.pointer("/__deferred/uri") {
                    Some(uri) => entity.json_link(key, uri),
                    None => debug!("Skipping expanded navigation property '{}'", key),
                }
                continue;
            }

            let type_name = schema.property_type(&entity.name, key)?;
            let mut property = Property::new(key.as_str(), PropertyKind::resolve(&type_name, schema)?);
            property.decode_json(json)?;
            entity.install(property)?;
        }

        debug!(
            "Decoded {} from JSON ({} links)",
            entity.type_name,
            entity.links.len()
        );
        Ok(entity)
    }

    fn json_link(&mut self, name: &str, href: &Value) {
        let Some(href) = href.as_str() else {
            warn!("Navigation link '{}' of {} is not a string", name, self.type_name);
            return;
        };
        match self.associations.get(name) {
            Ok(association) => {
                let link = Link::new(association.link_kind(), href);
                self.add_link(name, link);
            }
            Err(_) => warn!(
                "Entity type {} declares no association '{}', skipping link {}",
                self.type_name, name, href
            ),
        }
    }

    /// Flat object of property name to native JSON value, in schema order
    ///
    /// Unlike [`Entity::to_xml`], the primary key is included. Stream
    /// properties are left out of both.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.properties
                .iter()
                .filter(|p| !p.kind().is_stream())
                .map(|p| (p.name().to_string(), p.to_json()))
                .collect::<Map<String, Value>>(),
        )
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.to_json()).map_err(|e| ODataError::Serialization(e.to_string()))
    }
}
