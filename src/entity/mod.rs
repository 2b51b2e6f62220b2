//! Entities
//!
//! An [`Entity`] is a typed bag of the properties its schema declares. It is
//! created from one of three factories:
//!
//! - [`Entity::with_properties`] (or [`Entity::new`] for an all-null entity)
//! - [`Entity::from_xml`], decoding an Atom entry
//! - [`Entity::from_json`], decoding a JSON object
//!
//! and encoded back with [`Entity::to_xml`] and [`Entity::to_json`]. The set
//! of property names is fixed at construction; only values change.
//!
//! Entities are plain owned data. Mutating one from several threads at once
//! is the caller's business to prevent.

pub mod json;
pub mod links;
pub mod xml;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ODataError, Result};
use crate::properties::{Property, PropertyValue};
use crate::schema::ServiceMetadata;

pub use links::{Associations, Link, LinkKind};

/// Identifies which entity type to build and which service describes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOptions {
    /// Qualified type name, e.g. `ODataDemo.Product`
    #[serde(rename = "type")]
    pub type_name: String,
    pub namespace: String,
    pub service_name: String,
}

impl EntityOptions {
    /// Options for `type_name` in `namespace`; the service name defaults to the namespace
    pub fn new(type_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            type_name: type_name.into(),
            service_name: namespace.clone(),
            namespace,
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Options for an entity type of the given service, from its short or qualified name
    pub fn for_service(schema: &dyn ServiceMetadata, entity: &str) -> Self {
        let namespace = schema.namespace();
        let type_name = if entity.contains('.') || namespace.is_empty() {
            entity.to_string()
        } else {
            format!("{}.{}", namespace, entity)
        };
        Self::new(type_name, namespace).with_service_name(schema.service_name())
    }

    /// Type name with the namespace qualifier stripped
    pub fn entity_name(&self) -> &str {
        self.type_name
            .strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.type_name)
    }
}

/// A typed instance of a schema entity type
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    type_name: String,
    namespace: String,
    service_name: String,
    name: String,
    primary_key: String,
    properties: Vec<Property>,
    links: BTreeMap<String, Link>,
    associations: Associations,
}

impl Entity {
    /// An entity with every declared property present and null
    pub fn new(schema: &dyn ServiceMetadata, options: EntityOptions) -> Result<Self> {
        if options.service_name != schema.service_name() {
            warn!(
                "Entity {} names service '{}' but is resolved against '{}'",
                options.type_name,
                options.service_name,
                schema.service_name()
            );
        }
        let name = options.entity_name().to_string();
        let properties = schema.properties_for(&name)?;
        let primary_key = schema.primary_key_property(&name)?;
        let associations = Associations::new(
            options.type_name.as_str(),
            schema.associations_for(&name)?,
        );

        Ok(Self {
            type_name: options.type_name,
            namespace: options.namespace,
            service_name: options.service_name,
            name,
            primary_key,
            properties,
            links: BTreeMap::new(),
            associations,
        })
    }

    /// An entity populated from caller-supplied values
    ///
    /// Each value goes through [`Entity::set`], so an undeclared name fails
    /// with [`ODataError::UnknownProperty`].
    pub fn with_properties<I, S>(
        schema: &dyn ServiceMetadata,
        options: EntityOptions,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Option<PropertyValue>)>,
        S: AsRef<str>,
    {
        let mut entity = Self::new(schema, options)?;
        for (name, value) in values {
            entity.set(name.as_ref(), value)?;
        }
        Ok(entity)
    }

    /// An entity populated from a map of native JSON values
    pub fn with_json_properties(
        schema: &dyn ServiceMetadata,
        options: EntityOptions,
        values: &Map<String, Value>,
    ) -> Result<Self> {
        let mut entity = Self::new(schema, options)?;
        for (name, value) in values {
            entity.property_mut(name)?.decode_json(value)?;
        }
        Ok(entity)
    }

    /// Type name with the namespace stripped, e.g. `Product`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified type name, e.g. `ODataDemo.Product`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Name of the key property
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Current value of the key property
    pub fn primary_key_value(&self) -> Option<&PropertyValue> {
        self.property(&self.primary_key).ok().and_then(Property::value)
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.properties
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| self.unknown(name))
    }

    pub fn property_mut(&mut self, name: &str) -> Result<&mut Property> {
        match self.properties.iter().position(|p| p.name() == name) {
            Some(index) => Ok(&mut self.properties[index]),
            None => Err(self.unknown(name)),
        }
    }

    /// Properties in schema declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(Property::name).collect()
    }

    /// Current value of a property; `Ok(None)` when it is null
    pub fn get(&self, name: &str) -> Result<Option<&PropertyValue>> {
        Ok(self.property(name)?.value())
    }

    /// Assign a typed value, coercing into the declared kind
    pub fn set(&mut self, name: &str, value: Option<PropertyValue>) -> Result<()> {
        self.property_mut(name)?.set_value(value)
    }

    /// Parse a wire string into the named property; `None` stores null
    pub fn set_wire(&mut self, name: &str, wire: Option<&str>) -> Result<()> {
        self.property_mut(name)?.set_wire(wire)
    }

    /// Related links found in the decoded document, by navigation property name
    pub fn links(&self) -> &BTreeMap<String, Link> {
        &self.links
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    /// Navigation relationships declared for this entity's type
    pub fn associations(&self) -> &Associations {
        &self.associations
    }

    fn unknown(&self, name: &str) -> ODataError {
        ODataError::UnknownProperty(format!("{}.{}", self.type_name, name))
    }

    /// Replace the declared property of the same name with a decoded one
    fn install(&mut self, property: Property) -> Result<()> {
        let slot = self.property_mut(property.name())?;
        *slot = property;
        Ok(())
    }

    fn add_link(&mut self, name: &str, link: Link) {
        if !self.associations.contains(name) {
            warn!(
                "Entity type {} declares no association '{}', keeping link to {}",
                self.type_name, name, link.href
            );
        }
        self.links.insert(name.to_string(), link);
    }
}

impl Serialize for Entity {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}
