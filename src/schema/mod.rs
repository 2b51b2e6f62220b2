//! Service metadata
//!
//! The mapping engine never discovers types on its own. Every entity factory
//! and encoder takes a [`ServiceMetadata`] handle and asks it for declared
//! kinds, primary keys, feed aliases and property prototypes. [`Schema`] is
//! the in-memory implementation, built programmatically with
//! [`SchemaBuilder`] or loaded from a CSDL document (see [`csdl`]).
//!
//! A `Schema` is read-only once built and can be shared freely between
//! threads; decoders only ever read from it.

pub mod complex_type;
pub mod csdl;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::entity::LinkKind;
use crate::error::{ODataError, Result};
use crate::properties::{Property, PropertyKind};

pub use complex_type::{ComplexType, ComplexTypeDeclaration, PropertyDeclaration};

/// Lookups the mapping engine needs from a loaded service description
///
/// Entity names may be given short (`Product`) or namespace-qualified
/// (`ODataDemo.Product`). Every lookup for an entity type, property or
/// complex type the service does not declare fails with
/// [`ODataError::SchemaResolution`].
pub trait ServiceMetadata {
    /// Name the service was registered under
    fn service_name(&self) -> &str;

    /// Namespace of the service's types
    fn namespace(&self) -> &str;

    /// Declared type name of one property, e.g. `Edm.Int32` or `ODataDemo.Address`
    fn property_type(&self, entity: &str, property: &str) -> Result<String>;

    /// Name of the entity type's key property
    fn primary_key_property(&self, entity: &str) -> Result<String>;

    /// Property that the feed `title` element is mapped onto, if any
    fn title_property_name(&self, entity: &str) -> Result<Option<String>>;

    /// Property that the feed `summary` element is mapped onto, if any
    fn summary_property_name(&self, entity: &str) -> Result<Option<String>>;

    /// Fresh, null property prototypes in declaration order
    fn properties_for(&self, entity: &str) -> Result<Vec<Property>>;

    /// A complex type definition by short or qualified name
    fn complex_type(&self, name: &str) -> Result<Arc<ComplexType>>;

    /// Navigation properties declared for the entity type
    fn associations_for(&self, entity: &str) -> Result<Vec<Association>>;
}

/// A declared navigation relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub name: String,
    /// Qualified name of the related entity type
    pub target_type: String,
    pub to_many: bool,
}

impl Association {
    pub fn new(name: impl Into<String>, target_type: impl Into<String>, to_many: bool) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            to_many,
        }
    }

    /// `Feed` for to-many relationships, `Entry` for to-one
    pub fn link_kind(&self) -> LinkKind {
        if self.to_many {
            LinkKind::Feed
        } else {
            LinkKind::Entry
        }
    }
}

/// The unresolved form of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityTypeDeclaration {
    pub name: String,
    pub base_type: Option<String>,
    pub keys: Vec<String>,
    pub properties: Vec<PropertyDeclaration>,
    pub navigations: Vec<Association>,
    pub title_property: Option<String>,
    pub summary_property: Option<String>,
}

impl EntityTypeDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(name.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.push(PropertyDeclaration::new(name, type_name));
        self
    }

    pub fn navigation(
        mut self,
        name: impl Into<String>,
        target_type: impl Into<String>,
        to_many: bool,
    ) -> Self {
        self.navigations.push(Association::new(name, target_type, to_many));
        self
    }

    pub fn base_type(mut self, name: impl Into<String>) -> Self {
        self.base_type = Some(name.into());
        self
    }

    pub fn title_property(mut self, name: impl Into<String>) -> Self {
        self.title_property = Some(name.into());
        self
    }

    pub fn summary_property(mut self, name: impl Into<String>) -> Self {
        self.summary_property = Some(name.into());
        self
    }
}

/// A resolved entity type: inherited members flattened, kinds resolved
#[derive(Debug, Clone, PartialEq)]
pub struct EntityType {
    name: String,
    type_name: String,
    keys: Vec<String>,
    properties: Vec<Property>,
    associations: Vec<Association>,
    title_property: Option<String>,
    summary_property: Option<String>,
}

impl EntityType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name, e.g. `ODataDemo.Product`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Key property name; composite keys report their first member
    pub fn primary_key(&self) -> Result<&str> {
        match self.keys.as_slice() {
            [] => Err(ODataError::SchemaResolution(format!(
                "entity type '{}' declares no key",
                self.type_name
            ))),
            [key] => Ok(key.as_str()),
            [first, ..] => {
                warn!(
                    "Entity type '{}' has a composite key {:?}, using '{}'",
                    self.type_name, self.keys, first
                );
                Ok(first.as_str())
            }
        }
    }

    /// Property prototypes in declaration order, base type members first
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn title_property(&self) -> Option<&str> {
        self.title_property.as_deref()
    }

    pub fn summary_property(&self) -> Option<&str> {
        self.summary_property.as_deref()
    }
}

/// In-memory service description
#[derive(Debug, Clone)]
pub struct Schema {
    service_name: String,
    namespace: String,
    alias: Option<String>,
    entity_types: HashMap<String, EntityType>,
    complex_types: HashMap<String, Arc<ComplexType>>,
}

impl Schema {
    pub fn builder(service_name: impl Into<String>, namespace: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(service_name, namespace)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Strip this schema's namespace (or alias) qualifier from a type name
    pub fn local_name<'n>(&self, name: &'n str) -> &'n str {
        unqualify(name, &self.namespace, self.alias.as_deref())
    }

    pub fn entity_type(&self, name: &str) -> Result<&EntityType> {
        self.entity_types.get(self.local_name(name)).ok_or_else(|| {
            ODataError::SchemaResolution(format!(
                "service '{}' declares no entity type '{}'",
                self.service_name, name
            ))
        })
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entity_types.values()
    }

    pub fn complex_types(&self) -> impl Iterator<Item = &Arc<ComplexType>> {
        self.complex_types.values()
    }
}

impl ServiceMetadata for Schema {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn property_type(&self, entity: &str, property: &str) -> Result<String> {
        let entity_type = self.entity_type(entity)?;
        entity_type
            .property(property)
            .map(|p| p.type_name().to_string())
            .ok_or_else(|| {
                ODataError::SchemaResolution(format!(
                    "entity type '{}' declares no property '{}'",
                    entity_type.type_name(),
                    property
                ))
            })
    }

    fn primary_key_property(&self, entity: &str) -> Result<String> {
        self.entity_type(entity)?.primary_key().map(str::to_string)
    }

    fn title_property_name(&self, entity: &str) -> Result<Option<String>> {
        Ok(self.entity_type(entity)?.title_property.clone())
    }

    fn summary_property_name(&self, entity: &str) -> Result<Option<String>> {
        Ok(self.entity_type(entity)?.summary_property.clone())
    }

    fn properties_for(&self, entity: &str) -> Result<Vec<Property>> {
        Ok(self.entity_type(entity)?.properties.clone())
    }

    fn complex_type(&self, name: &str) -> Result<Arc<ComplexType>> {
        self.complex_types
            .get(self.local_name(name))
            .cloned()
            .ok_or_else(|| {
                ODataError::SchemaResolution(format!(
                    "service '{}' declares no complex type '{}'",
                    self.service_name, name
                ))
            })
    }

    fn associations_for(&self, entity: &str) -> Result<Vec<Association>> {
        Ok(self.entity_type(entity)?.associations.clone())
    }
}

fn unqualify<'n>(name: &'n str, namespace: &str, alias: Option<&str>) -> &'n str {
    let strip = |qualifier: &str| {
        name.strip_prefix(qualifier)
            .and_then(|rest| rest.strip_prefix('.'))
    };
    strip(namespace)
        .or_else(|| alias.and_then(strip))
        .unwrap_or(name)
}

/// Collects declarations and resolves them into a [`Schema`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    service_name: String,
    namespace: String,
    alias: Option<String>,
    complex_types: Vec<ComplexTypeDeclaration>,
    entity_types: Vec<EntityTypeDeclaration>,
}

impl SchemaBuilder {
    pub fn new(service_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            namespace: namespace.into(),
            alias: None,
            complex_types: Vec::new(),
            entity_types: Vec::new(),
        }
    }

    /// Alternative qualifier accepted in type references (CSDL `Alias`)
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn complex_type(mut self, declaration: ComplexTypeDeclaration) -> Self {
        self.complex_types.push(declaration);
        self
    }

    pub fn entity_type(mut self, declaration: EntityTypeDeclaration) -> Self {
        self.entity_types.push(declaration);
        self
    }

    /// Resolve every declaration.
    ///
    /// Fails with [`ODataError::SchemaResolution`] on duplicate names,
    /// unknown kinds, recursive complex types, inheritance cycles and keys or
    /// feed aliases that name undeclared properties.
    pub fn build(self) -> Result<Schema> {
        let (entity_types, complex_types) = {
            let mut complex_declarations = HashMap::new();
            for declaration in &self.complex_types {
                if complex_declarations
                    .insert(declaration.name.as_str(), declaration)
                    .is_some()
                {
                    return Err(ODataError::SchemaResolution(format!(
                        "complex type '{}' is declared twice",
                        declaration.name
                    )));
                }
            }

            let mut resolver = KindResolver {
                namespace: &self.namespace,
                alias: self.alias.as_deref(),
                declarations: complex_declarations,
                resolved: HashMap::new(),
                visiting: Vec::new(),
            };
            for declaration in &self.complex_types {
                resolver.complex(&declaration.name)?;
            }

            let mut entity_declarations = HashMap::new();
            for declaration in &self.entity_types {
                if entity_declarations
                    .insert(declaration.name.as_str(), declaration)
                    .is_some()
                {
                    return Err(ODataError::SchemaResolution(format!(
                        "entity type '{}' is declared twice",
                        declaration.name
                    )));
                }
            }

            let mut entity_types = HashMap::new();
            for declaration in &self.entity_types {
                let entity_type =
                    self.resolve_entity(declaration, &entity_declarations, &mut resolver)?;
                entity_types.insert(declaration.name.clone(), entity_type);
            }
            (entity_types, resolver.into_resolved())
        };

        let schema = Schema {
            service_name: self.service_name,
            namespace: self.namespace,
            alias: self.alias,
            entity_types,
            complex_types,
        };
        info!(
            "Loaded schema '{}' for service '{}': {} entity types, {} complex types",
            schema.namespace,
            schema.service_name,
            schema.entity_types.len(),
            schema.complex_types.len()
        );
        Ok(schema)
    }

    fn resolve_entity(
        &self,
        declaration: &EntityTypeDeclaration,
        declarations: &HashMap<&str, &EntityTypeDeclaration>,
        resolver: &mut KindResolver<'_>,
    ) -> Result<EntityType> {
        // Inheritance chain, most derived first
        let mut chain = vec![declaration];
        let mut current = declaration;
        while let Some(base) = &current.base_type {
            let local = unqualify(base, &self.namespace, self.alias.as_deref());
            let parent = *declarations.get(local).ok_or_else(|| {
                ODataError::SchemaResolution(format!(
                    "entity type '{}' derives from unknown type '{}'",
                    declaration.name, base
                ))
            })?;
            if chain.iter().any(|d| d.name == parent.name) {
                return Err(ODataError::SchemaResolution(format!(
                    "inheritance cycle through entity type '{}'",
                    parent.name
                )));
            }
            chain.push(parent);
            current = parent;
        }

        let mut properties: Vec<Property> = Vec::new();
        let mut associations: Vec<Association> = Vec::new();
        let mut keys = Vec::new();
        let mut title_property = None;
        let mut summary_property = None;
        for member in chain.iter().rev() {
            for property in &member.properties {
                if properties.iter().any(|p| p.name() == property.name) {
                    return Err(ODataError::SchemaResolution(format!(
                        "entity type '{}' declares property '{}' twice",
                        declaration.name, property.name
                    )));
                }
                properties.push(Property::new(
                    property.name.as_str(),
                    resolver.kind(&property.type_name)?,
                ));
            }
            associations.extend(member.navigations.iter().cloned());
            if !member.keys.is_empty() {
                keys = member.keys.clone();
            }
            title_property = member.title_property.clone().or(title_property);
            summary_property = member.summary_property.clone().or(summary_property);
        }

        let declared = |name: &str| properties.iter().any(|p| p.name() == name);
        for name in keys
            .iter()
            .chain(title_property.iter())
            .chain(summary_property.iter())
        {
            if !declared(name.as_str()) {
                return Err(ODataError::SchemaResolution(format!(
                    "entity type '{}' refers to undeclared property '{}'",
                    declaration.name, name
                )));
            }
        }

        let type_name = if self.namespace.is_empty() {
            declaration.name.clone()
        } else {
            format!("{}.{}", self.namespace, declaration.name)
        };
        Ok(EntityType {
            name: declaration.name.clone(),
            type_name,
            keys,
            properties,
            associations,
            title_property,
            summary_property,
        })
    }
}

/// Resolves kind names, building complex types on first use
struct KindResolver<'a> {
    namespace: &'a str,
    alias: Option<&'a str>,
    declarations: HashMap<&'a str, &'a ComplexTypeDeclaration>,
    resolved: HashMap<String, Arc<ComplexType>>,
    visiting: Vec<String>,
}

impl KindResolver<'_> {
    fn into_resolved(self) -> HashMap<String, Arc<ComplexType>> {
        self.resolved
    }

    fn kind(&mut self, type_name: &str) -> Result<PropertyKind> {
        PropertyKind::resolve_with(type_name, |name| self.complex(name))
    }

    fn complex(&mut self, name: &str) -> Result<Arc<ComplexType>> {
        let local = unqualify(name, self.namespace, self.alias).to_string();
        if let Some(found) = self.resolved.get(&local) {
            return Ok(Arc::clone(found));
        }
        let declaration = *self.declarations.get(local.as_str()).ok_or_else(|| {
            ODataError::SchemaResolution(format!("no property variant for kind '{}'", name))
        })?;
        if self.visiting.contains(&local) {
            return Err(ODataError::SchemaResolution(format!(
                "complex type '{}' contains itself",
                local
            )));
        }

        self.visiting.push(local.clone());
        let namespace = self.namespace;
        let complex = ComplexType::from_declaration(declaration, namespace, |kind| self.kind(kind));
        self.visiting.pop();

        let complex = Arc::new(complex?);
        self.resolved.insert(local, Arc::clone(&complex));
        Ok(complex)
    }
}
