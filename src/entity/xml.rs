//! Atom entry decoding and encoding

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, warn};

use super::{Entity, EntityOptions, Link, LinkKind};
use crate::config::{ATOM_NAMESPACE, GEORSS_NAMESPACE, GML_NAMESPACE, XmlWriterConfig};
use crate::error::{ODataError, Result};
use crate::properties::{Property, PropertyKind, PropertyValue};
use crate::schema::ServiceMetadata;
use crate::xml::XmlElement;

const RELATED_MARKER: &str = "/related/";

impl Entity {
    /// Decode an Atom entry document
    pub fn from_xml(schema: &dyn ServiceMetadata, options: EntityOptions, xml: &str) -> Result<Self> {
        let document = XmlElement::parse(xml)?;
        Self::from_xml_element(schema, options, &document)
    }

    /// Decode an already parsed fragment
    ///
    /// The fragment is either an `entry` element or contains one; the first
    /// entry found is decoded. Properties absent from the fragment stay null.
    pub fn from_xml_element(
        schema: &dyn ServiceMetadata,
        options: EntityOptions,
        fragment: &XmlElement,
    ) -> Result<Self> {
        let entry = fragment.find("entry").unwrap_or(fragment);
        let mut entity = Self::new(schema, options)?;

        entity.process_properties(schema, entry)?;
        let title = schema.title_property_name(&entity.name)?;
        entity.process_feed_property(schema, entry, "title", title.as_deref())?;
        let summary = schema.summary_property_name(&entity.name)?;
        entity.process_feed_property(schema, entry, "summary", summary.as_deref())?;
        entity.process_links(entry);

        debug!(
            "Decoded {} from XML ({} links)",
            entity.type_name,
            entity.links.len()
        );
        Ok(entity)
    }

    fn process_properties(&mut self, schema: &dyn ServiceMetadata, entry: &XmlElement) -> Result<()> {
        // Media link entries carry m:properties beside content instead of inside it
        let container = entry
            .child("content")
            .and_then(|content| content.child("properties"))
            .or_else(|| entry.child("properties"));
        let Some(container) = container else {
            return Ok(());
        };

        for element in container.children() {
            let name = element.name();
            let type_name = schema.property_type(&self.name, name)?;
            let mut property = Property::new(name, PropertyKind::resolve(&type_name, schema)?);
            property.decode_xml(element)?;
            self.install(property)?;
        }
        Ok(())
    }

    fn process_feed_property(
        &mut self,
        schema: &dyn ServiceMetadata,
        entry: &XmlElement,
        element_name: &str,
        property_name: Option<&str>,
    ) -> Result<()> {
        let (Some(property_name), Some(element)) = (property_name, entry.child(element_name)) else {
            return Ok(());
        };
        let type_name = schema.property_type(&self.name, property_name)?;
        let mut property = Property::new(property_name, PropertyKind::resolve(&type_name, schema)?);
        property.decode_xml(element)?;
        self.install(property)
    }

    fn process_links(&mut self, entry: &XmlElement) {
        for element in entry.children_named("link") {
            let Some(rel) = element.attribute("rel") else {
                continue;
            };
            let Some((_, name)) = rel.rsplit_once(RELATED_MARKER) else {
                continue;
            };
            let Some(href) = element.attribute("href") else {
                warn!("Related link '{}' of {} has no href", name, self.type_name);
                continue;
            };
            let kind = element
                .attribute("type")
                .and_then(LinkKind::from_media_type)
                .or_else(|| self.associations.get(name).ok().map(|a| a.link_kind()));
            match kind {
                Some(kind) => self.add_link(name, Link::new(kind, href)),
                None => warn!(
                    "Cannot tell whether related link '{}' of {} is a feed or an entry",
                    name, self.type_name
                ),
            }
        }
    }

    /// Encode as an Atom entry with the default envelope
    pub fn to_xml(&self) -> Result<String> {
        self.to_xml_with(&XmlWriterConfig::default())
    }

    /// Encode as an Atom entry
    ///
    /// Properties appear in schema order, each tagged with `metadata:type`.
    /// Nulls become empty elements marked `metadata:null="true"`. The primary
    /// key and stream properties are not written.
    pub fn to_xml_with(&self, config: &XmlWriterConfig) -> Result<String> {
        let mut writer = if config.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', config.indent)
        } else {
            Writer::new(Vec::new())
        };

        if config.include_declaration {
            emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }

        let mut entry = BytesStart::new("entry");
        entry.push_attribute(("xmlns", ATOM_NAMESPACE));
        entry.push_attribute(("xmlns:data", config.data_namespace.as_str()));
        entry.push_attribute(("xmlns:metadata", config.metadata_namespace.as_str()));
        entry.push_attribute(("xmlns:georss", GEORSS_NAMESPACE));
        entry.push_attribute(("xmlns:gml", GML_NAMESPACE));
        entry.push_attribute(("xml:base", config.xml_base.as_str()));
        emit(&mut writer, Event::Start(entry))?;

        let mut category = BytesStart::new("category");
        category.push_attribute(("term", self.type_name.as_str()));
        category.push_attribute(("scheme", config.scheme.as_str()));
        emit(&mut writer, Event::Empty(category))?;

        emit(&mut writer, Event::Start(BytesStart::new("author")))?;
        emit(&mut writer, Event::Empty(BytesStart::new("name")))?;
        emit(&mut writer, Event::End(BytesEnd::new("author")))?;

        let mut content = BytesStart::new("content");
        content.push_attribute(("type", "application/xml"));
        emit(&mut writer, Event::Start(content))?;
        emit(&mut writer, Event::Start(BytesStart::new("metadata:properties")))?;

        for property in &self.properties {
            if property.name() == self.primary_key || property.kind().is_stream() {
                continue;
            }
            write_property(&mut writer, property)?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("metadata:properties")))?;
        emit(&mut writer, Event::End(BytesEnd::new("content")))?;
        emit(&mut writer, Event::End(BytesEnd::new("entry")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| ODataError::Serialization(format!("entry is not valid UTF-8: {}", e)))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ODataError::Serialization(e.to_string()))
}

fn write_property(writer: &mut Writer<Vec<u8>>, property: &Property) -> Result<()> {
    let tag = format!("data:{}", property.name());
    let mut start = BytesStart::new(tag.as_str());
    start.push_attribute(("metadata:type", property.type_name()));

    let Some(value) = property.value() else {
        start.push_attribute(("metadata:null", "true"));
        return emit(writer, Event::Empty(start));
    };

    emit(writer, Event::Start(start))?;
    match value {
        PropertyValue::Complex(complex) => {
            for child in complex.properties().iter().filter(|p| !p.kind().is_stream()) {
                write_property(writer, child)?;
            }
        }
        PropertyValue::GeographyPoint(point) => {
            let srs_name = point.srs_name();
            let mut gml = BytesStart::new("gml:Point");
            gml.push_attribute(("gml:srsName", srs_name.as_str()));
            emit(writer, Event::Start(gml))?;
            emit(writer, Event::Start(BytesStart::new("gml:pos")))?;
            emit(writer, Event::Text(BytesText::new(&point.to_wire_string())))?;
            emit(writer, Event::End(BytesEnd::new("gml:pos")))?;
            emit(writer, Event::End(BytesEnd::new("gml:Point")))?;
        }
        other => {
            let text = other.to_wire_string().unwrap_or_default();
            emit(writer, Event::Text(BytesText::new(&text)))?;
        }
    }
    emit(writer, Event::End(BytesEnd::new(tag.as_str())))
}
