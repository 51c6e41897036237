//! Per-frame summary parsing
//!
//! `identify -format '[%m|%b|%w|%h|%z|%k|%r|%c]*' file` prints one bracketed
//! record per frame, each terminated by `*`, with nothing in between:
//!
//! ```text
//! [GIF|4100|80|50|8|38|PseudoClassRGB|]*[GIF|4100|80|50|8|17|PseudoClassRGB|Animated Cog]*
//! ```
//!
//! Fields: format identifier, reported byte size, width, height, color depth,
//! color count, color class, comment. Older format strings omit the color
//! count ([`FrameShape::Legacy`]). The shape is fixed by whoever chose the
//! `-format` string; records with any other field count are malformed.

use std::sync::Arc;

use crate::error::{AnalysisError, Result};
use crate::mime::MimeTable;
use crate::record::{MetadataRecord, TransparencyType};

/// `-format` argument producing the canonical record shape.
pub const FRAME_FORMAT: &str = "[%m|%b|%w|%h|%z|%k|%r|%c]*";

/// `-format` argument of the shape without color count.
pub const LEGACY_FRAME_FORMAT: &str = "[%m|%b|%w|%h|%z|%r|%c]*";

pub const RECORD_TERMINATOR: char = '*';
pub const FIELD_DELIMITER: char = '|';

/// Color class substrings of alpha-capable frames (`DirectClassRGBMatte`
/// from ImageMagick 6, `DirectClasssRGBAlpha` from ImageMagick 7).
const ALPHA_MARKERS: &[&str] = &["RGBMatte", "Alpha"];

/// Depths above this count as color.
const COLOR_DEPTH_THRESHOLD: u32 = 2;

/// Field layout of every record in one summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameShape {
    /// Eight fields, produced by [`FRAME_FORMAT`]
    #[default]
    WithColorCount,
    /// Seven fields, produced by [`LEGACY_FRAME_FORMAT`]
    Legacy,
}

impl FrameShape {
    /// The `-format` string producing this shape.
    pub fn format(self) -> &'static str {
        match self {
            FrameShape::WithColorCount => FRAME_FORMAT,
            FrameShape::Legacy => LEGACY_FRAME_FORMAT,
        }
    }

    pub fn field_count(self) -> usize {
        match self {
            FrameShape::WithColorCount => 8,
            FrameShape::Legacy => 7,
        }
    }
}

/// One parsed frame, only alive while folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrameRecord {
    pub format: String,
    /// Unreliable for some formats (TIFF with comments); shape only.
    pub reported_size: String,
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub color_count: Option<String>,
    pub color_class: String,
    pub comment: String,
}

impl FrameRecord {
    /// Parse one `[...]` segment (terminator already removed).
    pub(crate) fn parse(segment: &str, shape: FrameShape) -> Result<Self> {
        let inner = segment
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| {
                AnalysisError::MalformedOutput(format!("frame record not bracketed: {:?}", segment))
            })?;

        let fields: Vec<&str> = inner.split(FIELD_DELIMITER).collect();
        if fields.len() != shape.field_count() {
            return Err(AnalysisError::MalformedOutput(format!(
                "expected {} fields per frame, got {}",
                shape.field_count(),
                fields.len()
            )));
        }
        let (color_count, color_class, comment) = match shape {
            FrameShape::WithColorCount => (Some(fields[5].to_string()), fields[6], fields[7]),
            FrameShape::Legacy => (None, fields[5], fields[6]),
        };

        Ok(Self {
            format: fields[0].to_string(),
            reported_size: fields[1].to_string(),
            width: parse_number(fields[2], "width")?,
            height: parse_number(fields[3], "height")?,
            color_depth: parse_number(fields[4], "color depth")?,
            color_count,
            color_class: color_class.to_string(),
            comment: comment.to_string(),
        })
    }

    fn has_alpha(&self) -> bool {
        ALPHA_MARKERS.iter().any(|m| self.color_class.contains(m))
    }
}

fn parse_number(field: &str, what: &str) -> Result<u32> {
    field.trim().parse().map_err(|_| {
        AnalysisError::MalformedOutput(format!("{} is not a number: {:?}", what, field))
    })
}

/// Split raw summary text into frame segments.
fn split_records(raw: &str) -> Result<Vec<&str>> {
    let mut segments: Vec<&str> = raw.split(RECORD_TERMINATOR).collect();
    if segments.len() == 1 {
        return Err(AnalysisError::MalformedOutput(
            "no frame terminator in tool output".to_string(),
        ));
    }

    // Whatever follows the last terminator
    let tail = segments.pop().unwrap_or_default();
    if !tail.trim().is_empty() {
        return Err(AnalysisError::MalformedOutput(format!(
            "unterminated data after last frame: {:?}",
            tail
        )));
    }
    Ok(segments)
}

/// Parse a per-frame summary into a fresh record.
///
/// `file_size` comes from the file system; the size the tool reports per frame
/// is not trusted.
pub fn parse_frame_summary(
    raw: &str,
    shape: FrameShape,
    mime_table: &MimeTable,
    file_size: u64,
) -> Result<MetadataRecord> {
    let segments = split_records(raw)?;

    let mut record = MetadataRecord {
        size: file_size,
        is_animated: segments.len() > 1,
        ..Default::default()
    };

    for (index, segment) in segments.iter().enumerate() {
        let frame = FrameRecord::parse(segment, shape)?;
        fold_frame(&mut record, index, &frame, mime_table)?;
    }

    Ok(record)
}

fn fold_frame(
    record: &mut MetadataRecord,
    index: usize,
    frame: &FrameRecord,
    mime_table: &MimeTable,
) -> Result<()> {
    let mime = mime_table
        .lookup(&frame.format)
        .ok_or_else(|| AnalysisError::NotAnalyzable(format!("unknown format {:?}", frame.format)))?;
    record.mime = Some(mime.to_string());

    record.width = record.width.max(frame.width);
    record.height = record.height.max(frame.height);

    // Last frame decides
    record.is_color = frame.color_depth > COLOR_DEPTH_THRESHOLD;

    // Never downgraded once a frame had alpha
    if frame.has_alpha() {
        record.transparency_type = TransparencyType::Transparent;
    }

    if !frame.comment.is_empty() {
        if index == 0 {
            record.comment = Some(frame.comment.clone());
            record.comment_list = vec![frame.comment.clone()];
        } else if record.is_animated {
            record.comment_list.push(frame.comment.clone());
        }
    }
    Ok(())
}

/// Frame-record parser bound to a MIME table.
#[derive(Debug, Clone)]
pub struct FrameParser {
    mime_table: Arc<MimeTable>,
    shape: FrameShape,
}

impl FrameParser {
    pub fn new(mime_table: Arc<MimeTable>) -> Self {
        Self {
            mime_table,
            shape: FrameShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: FrameShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn mime_table(&self) -> &MimeTable {
        &self.mime_table
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn parse(&self, raw: &str, file_size: u64) -> Result<MetadataRecord> {
        parse_frame_summary(raw, self.shape, &self.mime_table, file_size)
    }
}
