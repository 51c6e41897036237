//! Native backend (pure Rust)
//!
//! Used when ImageMagick is not installed. Type detection uses magic numbers
//! (`infer`), dimensions and color model come from the image header (`image`),
//! and EXIF fields read with `kamadak-exif` are rendered into the same
//! `key=value` dump ImageMagick prints, so both backends share the tag
//! normalizer.
//!
//! Animation and comments are not reported by this backend.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::handler::{AnalyzerHandler, BackendKind};
use crate::mime::MimeSet;
use crate::probe::{probe_image, FileFacts};
use crate::record::{MetadataRecord, TransparencyType};
use crate::tags::{TagInputs, TagNormalizer, COLOR_COUNT_THRESHOLD};

/// Types the `image` crate can read headers of with default features
const NATIVE_READABLE: &[&str] = &[
    "image/bmp",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "image/vnd.microsoft.icon",
    "image/webp",
];

/// kamadak-exif tag names that differ from the names in the tag layout
const EXIF_RENAMES: &[(&str, &str)] = &[
    ("ExifIFDPointer", "ExifOffset"),
    ("InteropIFDPointer", "InteroperabilityOffset"),
    ("PhotographicSensitivity", "ISOSpeedRatings"),
    ("PixelXDimension", "ExifImageWidth"),
    ("PixelYDimension", "ExifImageLength"),
];

/// Length of the character code prefix of `UserComment`
const USER_COMMENT_CHARSET_LEN: usize = 8;

pub struct NativeHandler {
    readable: MimeSet,
    tag_capable: Arc<MimeSet>,
    normalizer: TagNormalizer,
}

impl NativeHandler {
    pub fn new() -> Self {
        Self {
            readable: NATIVE_READABLE.iter().collect(),
            tag_capable: Arc::new(MimeSet::tag_capable()),
            normalizer: TagNormalizer::default(),
        }
    }

    pub fn with_tag_capable(mut self, tag_capable: Arc<MimeSet>) -> Self {
        self.tag_capable = tag_capable;
        self
    }
}

impl Default for NativeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerHandler for NativeHandler {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn is_available(&self) -> bool {
        true
    }

    fn analyze_type(&self, path: &Path) -> Result<String> {
        let kind = infer::get_from_path(path)?.ok_or_else(|| {
            AnalysisError::NotAnalyzable(format!("unrecognized content in {}", path.display()))
        })?;
        Ok(kind.mime_type().to_lowercase())
    }

    fn analyze_image(&self, path: &Path) -> Result<MetadataRecord> {
        let mime = self.analyze_type(path)?;
        if !self.can_analyze(&mime) {
            return Err(AnalysisError::NotAnalyzable(format!("{} not supported natively", mime)));
        }

        let facts = FileFacts::from_path(path)?;
        let probe = probe_image(path)?;

        let mut record = MetadataRecord {
            mime: Some(mime),
            width: probe.width,
            height: probe.height,
            size: facts.size,
            is_color: probe.has_color(),
            transparency_type: if probe.has_alpha() {
                TransparencyType::Transparent
            } else {
                TransparencyType::Opaque
            },
            ..Default::default()
        };

        if self.tag_capable.contains(record.mime()) {
            let dump = read_exif_dump(path)?;
            // No palette statistics without decoding pixels
            let color_count = if record.is_color { COLOR_COUNT_THRESHOLD } else { 0 };
            let inputs = TagInputs {
                dump: &dump,
                color_count,
                file: &facts,
                probe: Some(&probe),
            };
            self.normalizer.apply(&mut record, &inputs);
        }

        Ok(record)
    }

    fn can_analyze(&self, mime: &str) -> bool {
        self.readable.contains(mime)
    }
}

/// Render the primary-image EXIF fields of `path` as `key=value` lines.
/// A file without EXIF yields an empty dump.
pub fn read_exif_dump(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif_data = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif_data) => exif_data,
        Err(exif::Error::NotFound(_)) | Err(exif::Error::BlankValue(_)) => {
            debug!("No EXIF data found in {}", path.display());
            return Ok(String::new());
        }
        Err(exif::Error::Io(e)) => return Err(AnalysisError::Io(e)),
        Err(e) => return Err(AnalysisError::MalformedOutput(format!("EXIF parse error: {}", e))),
    };

    let lines: Vec<String> = exif_data
        .fields()
        .filter(|f| f.ifd_num == exif::In::PRIMARY)
        .map(dump_line)
        .collect();
    Ok(lines.join("\n"))
}

fn dump_line(field: &exif::Field) -> String {
    let name = field.tag.to_string();
    let name = EXIF_RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| to.to_string())
        .unwrap_or(name);
    let value = field_text(field).replace(['\n', '\r'], " ");
    format!("{}={}", name, value)
}

fn first<T: ToString>(values: &[T]) -> String {
    values.first().map(ToString::to_string).unwrap_or_default()
}

/// Text of the first value, formatted the way `identify` prints it
/// (rationals stay `n/d`).
fn field_text(field: &exif::Field) -> String {
    use exif::Value;

    match &field.value {
        Value::Ascii(v) => v
            .first()
            .map(|s| String::from_utf8_lossy(s).trim_end_matches('\0').to_string())
            .unwrap_or_default(),
        Value::Rational(v) => v
            .first()
            .map(|r| format!("{}/{}", r.num, r.denom))
            .unwrap_or_default(),
        Value::SRational(v) => v
            .first()
            .map(|r| format!("{}/{}", r.num, r.denom))
            .unwrap_or_default(),
        Value::Byte(v) => first(v),
        Value::Short(v) => first(v),
        Value::Long(v) => first(v),
        Value::SByte(v) => first(v),
        Value::SShort(v) => first(v),
        Value::SLong(v) => first(v),
        Value::Float(v) => first(v),
        Value::Double(v) => first(v),
        Value::Undefined(bytes, _) if field.tag == exif::Tag::UserComment => {
            let text = bytes.get(USER_COMMENT_CHARSET_LEN..).unwrap_or_default();
            String::from_utf8_lossy(text).trim_end_matches(['\0', ' ']).to_string()
        }
        Value::Undefined(bytes, _) if bytes.iter().all(|b| b.is_ascii_graphic()) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        _ => field.display_value().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TagValue;
    use tempfile::TempDir;

    fn field(tag: exif::Tag, value: exif::Value) -> exif::Field {
        exif::Field {
            tag,
            ifd_num: exif::In::PRIMARY,
            value,
        }
    }

    #[test]
    fn test_dump_line_formats() {
        let f = field(
            exif::Tag::FNumber,
            exif::Value::Rational(vec![exif::Rational { num: 4, denom: 10 }]),
        );
        assert_eq!(dump_line(&f), "FNumber=4/10");

        let f = field(exif::Tag::Make, exif::Value::Ascii(vec![b"Canon".to_vec()]));
        assert_eq!(dump_line(&f), "Make=Canon");

        let f = field(exif::Tag::ExifVersion, exif::Value::Undefined(b"0220".to_vec(), 0));
        assert_eq!(dump_line(&f), "ExifVersion=0220");

        let f = field(exif::Tag::PhotographicSensitivity, exif::Value::Short(vec![200]));
        assert_eq!(dump_line(&f), "ISOSpeedRatings=200");
    }

    #[test]
    fn test_user_comment_skips_charset() {
        let mut bytes = b"ASCII\0\0\0".to_vec();
        bytes.extend_from_slice(b"hello\0\0");
        let f = field(exif::Tag::UserComment, exif::Value::Undefined(bytes, 0));
        assert_eq!(dump_line(&f), "UserComment=hello");
    }

    #[test]
    fn test_png_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alpha.png");
        image::RgbaImage::new(16, 9).save(&path).unwrap();

        let handler = NativeHandler::new();
        assert_eq!(handler.analyze_type(&path).unwrap(), "image/png");

        let record = handler.analyze_image(&path).unwrap();
        assert_eq!(record.mime.as_deref(), Some("image/png"));
        assert_eq!((record.width, record.height), (16, 9));
        assert_eq!(record.transparency_type, TransparencyType::Transparent);
        assert!(record.is_color);
        assert!(record.tags.is_empty());
        assert_eq!(record.size, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_jpeg_without_exif_gets_synthesized_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        image::RgbImage::new(8, 4).save(&path).unwrap();

        let record = NativeHandler::new().analyze_image(&path).unwrap();
        assert_eq!(record.mime.as_deref(), Some("image/jpeg"));
        let names: Vec<_> = record.tags.section_names().collect();
        assert_eq!(names, vec!["FILE", "COMPUTED"]);
        assert_eq!(record.tag("FILE", "FileName"), Some(&TagValue::from("plain.jpg")));
        assert_eq!(record.tag("FILE", "FileType"), Some(&TagValue::Integer(2)));
        assert_eq!(record.tag("COMPUTED", "Width"), Some(&TagValue::Integer(8)));
        assert_eq!(record.tag("COMPUTED", "IsColor"), Some(&TagValue::Integer(1)));
    }

    #[test]
    fn test_unrecognized_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "just text").unwrap();
        let err = NativeHandler::new().analyze_image(&path).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotAnalyzable);
    }
}
