//! Minimal XML element tree
//!
//! Atom entries and CSDL documents are small, so they are read into an owned
//! tree with quick-xml and queried by local name. Namespace prefixes are kept
//! for diagnostics but never used for matching.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ODataError, Result};

/// An attribute of an [`XmlElement`]
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

/// An element with its attributes, child elements and text content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    prefix: Option<String>,
    name: String,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_bytes(xml.as_bytes())
    }

    /// Parse a UTF-8 encoded document; text that is not valid UTF-8 fails
    /// with [`ODataError::XmlParse`]
    pub fn parse_bytes(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    stack.push(Self::from_start(e)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = Self::from_start(e)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        ODataError::XmlParse("unexpected closing tag".to_string())
                    })?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = e.unescape().map_err(|e| {
                            ODataError::XmlParse(format!(
                                "invalid text at position {}: {}",
                                reader.buffer_position(),
                                e
                            ))
                        })?;
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = std::str::from_utf8(&e).map_err(|e| {
                            ODataError::XmlParse(format!(
                                "invalid CDATA at position {}: {}",
                                reader.buffer_position(),
                                e
                            ))
                        })?;
                        current.text.push_str(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ODataError::XmlParse(format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ODataError::XmlParse(format!(
                "unclosed element <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| ODataError::XmlParse("document has no root element".to_string()))
    }

    /// Create an element with no attributes or content
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute (builder style, used when assembling fragments by hand)
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(XmlAttribute {
            prefix: None,
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = start.name();
        let mut element = Self {
            prefix: name
                .prefix()
                .map(|p| String::from_utf8_lossy(p.as_ref()).to_string()),
            name: String::from_utf8_lossy(start.local_name().as_ref()).to_string(),
            ..Self::default()
        };

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ODataError::XmlParse(e.to_string()))?;
            let key = attr.key;
            let value = attr
                .unescape_value()
                .map_err(|e| ODataError::XmlParse(e.to_string()))?;
            element.attributes.push(XmlAttribute {
                prefix: key
                    .prefix()
                    .map(|p| String::from_utf8_lossy(p.as_ref()).to_string()),
                name: String::from_utf8_lossy(key.local_name().as_ref()).to_string(),
                value: value.to_string(),
            });
        }

        Ok(element)
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(ODataError::XmlParse(format!(
                    "multiple root elements (found <{}>)",
                    element.name
                )));
            }
        }
        Ok(())
    }

    /// Local name of the element
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace prefix as written in the source document
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// All attributes, including namespace declarations
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Value of the first attribute with the given local name.
    ///
    /// Namespace declarations (`xmlns`, `xmlns:*`) are never matched.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| a.prefix.as_deref() != Some("xmlns") && a.name != "xmlns")
            .find(|a| a.name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Direct child elements
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child with the given local name
    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == local_name)
    }

    /// Direct children with the given local name
    pub fn children_named<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == local_name)
    }

    /// First descendant (depth first, excluding self) with the given local name
    pub fn descendant(&self, local_name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == local_name {
                return Some(child);
            }
            if let Some(found) = child.descendant(local_name) {
                return Some(found);
            }
        }
        None
    }

    /// Self if it has the given local name, otherwise the first matching descendant
    pub fn find(&self, local_name: &str) -> Option<&XmlElement> {
        if self.name == local_name {
            Some(self)
        } else {
            self.descendant(local_name)
        }
    }

    /// All descendants (document order, excluding self) with the given local name
    pub fn descendants_named(&self, local_name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_named(local_name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, local_name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == local_name {
                found.push(child);
            }
            child.collect_named(local_name, found);
        }
    }

    /// Text content directly under this element
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the element carries an explicit `null="true"` marker
    pub fn is_null(&self) -> bool {
        self.attribute("null") == Some("true")
    }
}
