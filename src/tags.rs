//! EXIF tag dump normalization
//!
//! Turns `identify -format '%[EXIF:*]'` output (one `key=value` per line) into
//! the ordered, typed tag area of a [`MetadataRecord`]:
//!
//! 1. `FILE`: synthesized from file-system facts and the header probe
//! 2. `COMPUTED`: html size attribute, color flag, f-number, user comment
//! 3. declared sections (`IFD0`, `EXIF`, `INTEROP`) in declaration order
//!
//! Tag names follow the naming other EXIF readers use (`Exif_IFD_Pointer`,
//! `InterOperabilityIndex`, ...), so a few ImageMagick keys are aliased first.

use std::collections::HashMap;

use crate::probe::{FileFacts, ProbedImage};
use crate::record::{MetadataRecord, TagSection, TagValue, Tags};

/// A declared group of tags
#[derive(Debug, Clone, Copy)]
pub struct SectionLayout {
    pub name: &'static str,
    pub tags: &'static [&'static str],
}

pub const EXIF_LAYOUT: &[SectionLayout] = &[
    SectionLayout {
        name: "IFD0",
        tags: &[
            "ImageDescription",
            "Make",
            "Model",
            "Orientation",
            "XResolution",
            "YResolution",
            "ResolutionUnit",
            "Software",
            "DateTime",
            "YCbCrPositioning",
            "Exif_IFD_Pointer",
            "Copyright",
            "UserComment",
        ],
    },
    SectionLayout {
        name: "EXIF",
        tags: &[
            "ExposureTime",
            "FNumber",
            "ExposureProgram",
            "ISOSpeedRatings",
            "ExifVersion",
            "DateTimeOriginal",
            "DateTimeDigitized",
            "ComponentsConfiguration",
            "BrightnessValue",
            "ExposureBiasValue",
            "MaxApertureValue",
            "MeteringMode",
            "LightSource",
            "Flash",
            "FocalLength",
            // SubjectLocation is reported wrongly by ImageMagick
            "MakerNote",
            "UserComment",
            "FlashPixVersion",
            "ColorSpace",
            "ExifImageWidth",
            "ExifImageLength",
            "InteroperabilityOffset",
            "FileSource",
            "SceneType",
            "CustomRendered",
            "ExposureMode",
            "WhiteBalance",
            "DigitalZoomRatio",
            "FocalLengthIn35mmFilm",
            "SceneCaptureType",
            "GainControl",
            "Contrast",
            "Saturation",
            "Sharpness",
            "SubjectDistanceRange",
        ],
    },
    SectionLayout {
        name: "INTEROP",
        tags: &["InterOperabilityIndex", "InterOperabilityVersion"],
    },
];

/// `(source, alias)`: when `source` is present it is also exposed as `alias`.
pub const TAG_ALIASES: &[(&str, &str)] = &[
    ("ExifOffset", "Exif_IFD_Pointer"),
    ("InteroperabilityIndex", "InterOperabilityIndex"),
    ("InteroperabilityVersion", "InterOperabilityVersion"),
    ("Artist", "Author"),
];

pub const FILE_SECTION: &str = "FILE";
pub const COMPUTED_SECTION: &str = "COMPUTED";

/// Prefix of `SectionsFound` when a real tag section resolved.
pub const ANY_TAG_MARKER: &str = "ANY_TAG";

/// Color counts below this mean a non-color image.
pub const COLOR_COUNT_THRESHOLD: u64 = 3;

/// Namespace ImageMagick puts in front of EXIF keys
const EXIF_KEY_PREFIX: &str = "exif:";

// ============================================================================
// Raw Dump Parsing
// ============================================================================

/// `key=value` pairs from a tag dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    values: HashMap<String, String>,
}

impl RawTags {
    /// Parse dump text. Lines without `=` are skipped; one trailing period is
    /// stripped from every value (ImageMagick pads some values with it).
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        for line in raw.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = strip_exif_prefix(key);
            let value = value.strip_suffix('.').unwrap_or(value);
            values.insert(key.to_string(), value.to_string());
        }
        Self { values }
    }

    /// Expose every present `source` key under its alias as well.
    pub fn apply_aliases(&mut self, aliases: &[(&str, &str)]) {
        for (source, alias) in aliases {
            if let Some(value) = self.values.get(*source).cloned() {
                self.values.insert(alias.to_string(), value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn strip_exif_prefix(key: &str) -> &str {
    match key.get(..EXIF_KEY_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(EXIF_KEY_PREFIX) => &key[EXIF_KEY_PREFIX.len()..],
        _ => key,
    }
}

// ============================================================================
// Type Coercion
// ============================================================================

/// Coerce a raw value: digits → integer, other numbers → float, else text.
/// Tags whose name contains "version" always stay text ("0220" is not 220).
pub fn coerce_tag_value(tag: &str, value: &str) -> TagValue {
    if tag.to_ascii_lowercase().contains("version") {
        return TagValue::Text(value.to_string());
    }
    if is_all_digits(value) {
        if let Ok(v) = value.parse::<i64>() {
            return TagValue::Integer(v);
        }
    }
    if is_numeric(value) {
        if let Ok(v) = value.trim().parse::<f64>() {
            return TagValue::Float(v);
        }
    }
    TagValue::Text(value.to_string())
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Decimal notation with optional sign, fraction and exponent.
/// Surrounding whitespace is allowed; `inf`/`nan` spellings are not.
fn is_numeric(value: &str) -> bool {
    let value = value.trim();
    value.bytes().any(|b| b.is_ascii_digit())
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && value.parse::<f64>().is_ok()
}

/// `f/<n/d>` with one decimal for a rational `n/d` tag value.
pub fn aperture_f_number(value: &TagValue) -> Option<String> {
    let text = value.as_str()?;
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 2 {
        return None;
    }
    let numerator: f64 = parts[0].trim().parse().ok()?;
    let denominator: f64 = parts[1].trim().parse().ok()?;
    if denominator == 0.0 {
        return None;
    }
    // Halves round away from zero
    let rounded = (numerator / denominator * 10.0).round() / 10.0;
    Some(format!("f/{:.1}", rounded))
}

/// ImageMagick reports unset user comments as a run of periods.
fn is_placeholder_comment(value: &TagValue) -> bool {
    match value {
        TagValue::Text(s) => s.chars().all(|c| c == '.'),
        _ => false,
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Everything the normalizer needs besides the record itself
#[derive(Debug, Clone, Copy)]
pub struct TagInputs<'a> {
    /// Raw `key=value` dump
    pub dump: &'a str,
    /// Unique color count reported by the tool
    pub color_count: u64,
    pub file: &'a FileFacts,
    /// Header probe, when the file could be probed
    pub probe: Option<&'a ProbedImage>,
}

#[derive(Debug, Clone, Copy)]
pub struct TagNormalizer {
    layout: &'static [SectionLayout],
    aliases: &'static [(&'static str, &'static str)],
}

impl Default for TagNormalizer {
    fn default() -> Self {
        Self::new(EXIF_LAYOUT, TAG_ALIASES)
    }
}

impl TagNormalizer {
    pub fn new(
        layout: &'static [SectionLayout],
        aliases: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { layout, aliases }
    }

    /// Declared sections with every present tag coerced; empty sections dropped.
    pub fn resolve_sections(&self, raw: &RawTags) -> Vec<TagSection> {
        let mut sections = Vec::new();
        for layout in self.layout {
            let mut section = TagSection::new(layout.name);
            for tag in layout.tags {
                if let Some(value) = raw.get(tag) {
                    section.insert(*tag, coerce_tag_value(tag, value));
                }
            }
            if !section.is_empty() {
                sections.push(section);
            }
        }
        sections
    }

    /// Build the full tag area for `record`. Deterministic for equal inputs.
    pub fn normalize(&self, record: &MetadataRecord, inputs: &TagInputs<'_>) -> Tags {
        let mut raw = RawTags::parse(inputs.dump);
        raw.apply_aliases(self.aliases);
        let resolved = self.resolve_sections(&raw);

        let mut tags = Tags::new();
        tags.push(file_section(record, inputs, &resolved));
        tags.push(computed_section(record, inputs.color_count, &resolved));
        for section in resolved {
            tags.push(section);
        }
        tags
    }

    /// Normalize and attach the result to `record.tags`.
    pub fn apply(&self, record: &mut MetadataRecord, inputs: &TagInputs<'_>) {
        record.tags = self.normalize(record, inputs);
    }
}

fn file_section(record: &MetadataRecord, inputs: &TagInputs<'_>, resolved: &[TagSection]) -> TagSection {
    let mut section = TagSection::new(FILE_SECTION);
    section.insert("FileName", inputs.file.name.as_str());
    section.insert("FileDateTime", inputs.file.modified);
    section.insert("FileSize", inputs.file.size);
    if let Some(image_type) = inputs.probe.and_then(|p| p.image_type) {
        section.insert("FileType", image_type.code());
    }
    section.insert("MimeType", record.mime());
    section.insert("SectionsFound", sections_found(resolved));
    section
}

fn sections_found(resolved: &[TagSection]) -> String {
    let names: Vec<&str> = resolved.iter().map(|s| s.name()).collect();
    let any_tag = names.iter().any(|n| *n == "IFD0" || *n == "EXIF");
    let mut found = String::new();
    if any_tag {
        found.push_str(ANY_TAG_MARKER);
        found.push_str(", ");
    }
    found.push_str(&names.join(", "));
    found
}

fn computed_section(record: &MetadataRecord, color_count: u64, resolved: &[TagSection]) -> TagSection {
    let mut section = TagSection::new(COMPUTED_SECTION);
    section.insert(
        "html",
        format!("width=\"{}\" height=\"{}\"", record.width, record.height),
    );
    section.insert("Height", record.height);
    section.insert("Width", record.width);
    section.insert(
        "IsColor",
        if color_count < COLOR_COUNT_THRESHOLD { 0i64 } else { 1i64 },
    );

    let exif = resolved.iter().find(|s| s.name() == "EXIF");
    if let Some(f_number) = exif.and_then(|s| s.get("FNumber")).and_then(aperture_f_number) {
        section.insert("ApertureFNumber", f_number);
    }
    if let Some(comment) = exif.and_then(|s| s.get("UserComment")) {
        if !is_placeholder_comment(comment) {
            section.insert("UserComment", comment.clone());
        }
    }
    section
}
