//! Normalized image metadata
//!
//! [`MetadataRecord`] is what every backend hands back: dimensions, color
//! model, transparency, animation, comments and the ordered EXIF tag area.
//!
//! ## Tag ordering
//!
//! [`Tags`] keeps sections in insertion order (`FILE`, `COMPUTED`, then the
//! declared EXIF sections) and every section keeps its tags in insertion
//! order. Both serialize as JSON objects in that order.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Core Record
// ============================================================================

/// Metadata gathered for one image file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    /// Lower-case MIME type (e.g., "image/png"); set once a frame was parsed
    pub mime: Option<String>,

    /// Largest frame width in pixels
    pub width: u32,

    /// Largest frame height in pixels
    pub height: u32,

    /// File size in bytes, as reported by the file system
    pub size: u64,

    pub mode: ColorMode,

    pub transparency_type: TransparencyType,

    /// Color image (as opposed to grayscale / bilevel)
    pub is_color: bool,

    /// More than one frame
    pub is_animated: bool,

    /// Comment of the first frame
    pub comment: Option<String>,

    /// All comments; see the frame parser for which frames contribute
    pub comment_list: Vec<String>,

    /// Not populated by the current backends
    pub copyright: Option<String>,

    /// Not populated by the current backends
    pub date: Option<String>,

    /// Not populated by the current backends
    pub has_thumbnail: Option<bool>,

    /// EXIF tag area, empty for formats without tag support
    pub tags: Tags,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            mime: None,
            width: 0,
            height: 0,
            size: 0,
            mode: ColorMode::Truecolor,
            transparency_type: TransparencyType::Opaque,
            is_color: true,
            is_animated: false,
            comment: None,
            comment_list: Vec::new(),
            copyright: None,
            date: None,
            has_thumbnail: None,
            tags: Tags::default(),
        }
    }
}

impl MetadataRecord {
    /// Shortcut for `tags.get(section, tag)`
    pub fn tag(&self, section: &str, tag: &str) -> Option<&TagValue> {
        self.tags.get(section, tag)
    }

    pub fn mime(&self) -> &str {
        self.mime.as_deref().unwrap_or("")
    }
}

/// Pixel storage model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Palette based
    Indexed,
    #[default]
    Truecolor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransparencyType {
    #[default]
    Opaque,
    /// Binary (on/off) alpha
    Transparent,
    /// Partial alpha
    Translucent,
}

// ============================================================================
// Tag Values
// ============================================================================

/// A coerced tag scalar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl TagValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Integer(v) => write!(f, "{}", v),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Text(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        TagValue::Text(s)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Integer(v)
    }
}

impl From<u32> for TagValue {
    fn from(v: u32) -> Self {
        TagValue::Integer(v as i64)
    }
}

impl From<u64> for TagValue {
    fn from(v: u64) -> Self {
        // Saturate; file sizes above i64::MAX do not occur in practice
        TagValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Float(v)
    }
}

// ============================================================================
// Ordered Tag Containers
// ============================================================================

/// One named group of tags, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct TagSection {
    name: String,
    entries: Vec<(String, TagValue)>,
}

impl TagSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace; a replaced tag keeps its original position.
    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<TagValue>) {
        let tag = tag.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == tag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((tag, value)),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&TagValue> {
        self.entries.iter().find(|(k, _)| k == tag).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TagSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Ordered section → tags mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
    sections: Vec<TagSection>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section; a section with the same name is replaced in place.
    pub fn push(&mut self, section: TagSection) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    pub fn section(&self, name: &str) -> Option<&TagSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn get(&self, section: &str, tag: &str) -> Option<&TagValue> {
        self.section(section).and_then(|s| s.get(tag))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagSection> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(&section.name, section)?;
        }
        map.end()
    }
}

// ============================================================================
// Tests
// ============================================================================
