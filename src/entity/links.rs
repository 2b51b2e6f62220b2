//! Navigation links and declared associations

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ODataError, Result};
use crate::schema::Association;

/// Cardinality of a navigation link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// To-many relationship
    Feed,
    /// To-one relationship
    Entry,
}

impl LinkKind {
    /// Read the `type=feed` / `type=entry` parameter of an Atom link media type,
    /// e.g. `application/atom+xml;type=feed`
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        media_type
            .split(';')
            .skip(1)
            .filter_map(|parameter| parameter.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("type"))
            .and_then(|(_, value)| match value.trim().to_ascii_lowercase().as_str() {
                "feed" => Some(LinkKind::Feed),
                "entry" => Some(LinkKind::Entry),
                _ => None,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Feed => "feed",
            LinkKind::Entry => "entry",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A related resource discovered in a decoded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
    pub href: String,
}

impl Link {
    pub fn new(kind: LinkKind, href: impl Into<String>) -> Self {
        Self {
            kind,
            href: href.into(),
        }
    }
}

/// The navigation relationships an entity type declares
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Associations {
    entity: String,
    items: Vec<Association>,
}

impl Associations {
    pub fn new(entity: impl Into<String>, items: Vec<Association>) -> Self {
        Self {
            entity: entity.into(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an association; undeclared names are [`ODataError::UnknownProperty`]
    pub fn get(&self, name: &str) -> Result<&Association> {
        self.items
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ODataError::UnknownProperty(format!("{}.{}", self.entity, name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|a| a.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Association> {
        self.items.iter()
    }
}
