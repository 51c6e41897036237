//! ImageMagick backend
//!
//! Runs `identify` up to three times per image:
//!
//! 1. per-frame summary ([`crate::frames::FRAME_FORMAT`]) for every file
//! 2. EXIF dump (`%[EXIF:*]`) for tag-capable MIME types
//! 3. unique color count (`%k`) for tag-capable MIME types
//!
//! Any failing run aborts the analysis; no partial record is returned.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::error::{AnalysisError, Result};
use crate::frames::{parse_frame_summary, FrameShape};
use crate::handler::{AnalyzerHandler, BackendKind};
use crate::identify::{is_identify_installed, IdentifyCommand, DEFAULT_BINARY};
use crate::mime::{MimeSet, MimeTable};
use crate::probe::{probe_image, FileFacts};
use crate::record::MetadataRecord;
use crate::tags::{TagInputs, TagNormalizer};

/// `-format` for type detection: `JPEG|`
pub const TYPE_FORMAT: &str = "%m|";

/// `-format` for the EXIF tag dump
pub const EXIF_FORMAT: &str = "%[EXIF:*]";

/// `-format` for the unique color count, one line per frame
pub const COLOR_COUNT_FORMAT: &str = "%k\\n";

pub struct ImageMagickHandler {
    binary: PathBuf,
    mime_table: Arc<MimeTable>,
    readable: Arc<MimeSet>,
    tag_capable: Arc<MimeSet>,
    normalizer: TagNormalizer,
    available: OnceLock<bool>,
}

impl ImageMagickHandler {
    /// Handler using `identify` from `PATH` and the reference tables.
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_BINARY)
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            mime_table: Arc::new(MimeTable::imagemagick()),
            readable: Arc::new(MimeSet::imagemagick_readable()),
            tag_capable: Arc::new(MimeSet::tag_capable()),
            normalizer: TagNormalizer::default(),
            available: OnceLock::new(),
        }
    }

    /// Replace the lookup tables.
    pub fn with_tables(
        mut self,
        mime_table: Arc<MimeTable>,
        readable: Arc<MimeSet>,
        tag_capable: Arc<MimeSet>,
    ) -> Self {
        self.mime_table = mime_table;
        self.readable = readable;
        self.tag_capable = tag_capable;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn identify(&self, format: &str, path: &Path) -> IdentifyCommand {
        IdentifyCommand::new(&self.binary).format(format).input(path)
    }

    /// Fetch tag dump and color count, then attach the normalized tags.
    fn analyze_tags(&self, path: &Path, facts: &FileFacts, record: &mut MetadataRecord) -> Result<()> {
        let dump = self.identify(EXIF_FORMAT, path).keep_newlines().run()?;
        let counts = self.identify(COLOR_COUNT_FORMAT, path).keep_newlines().run()?;
        let color_count = parse_color_count(&counts)?;

        let probe = match probe_image(path) {
            Ok(probe) => Some(probe),
            Err(e) => {
                warn!("Header probe failed for {}, FILE.FileType omitted: {}", path.display(), e);
                None
            }
        };

        let inputs = TagInputs {
            dump: &dump,
            color_count,
            file: facts,
            probe: probe.as_ref(),
        };
        self.normalizer.apply(record, &inputs);
        Ok(())
    }
}

impl Default for ImageMagickHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerHandler for ImageMagickHandler {
    fn kind(&self) -> BackendKind {
        BackendKind::ImageMagick
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let found = is_identify_installed(&self.binary);
            if !found {
                warn!("ImageMagick identify not usable at {}", self.binary.display());
            }
            found
        })
    }

    fn analyze_type(&self, path: &Path) -> Result<String> {
        let output = self.identify(TYPE_FORMAT, path).run()?;
        parse_type_output(&output, &self.mime_table)
    }

    fn analyze_image(&self, path: &Path) -> Result<MetadataRecord> {
        let shape = FrameShape::WithColorCount;
        let summary = self.identify(shape.format(), path).run()?;
        let facts = FileFacts::from_path(path)?;

        let mut record = parse_frame_summary(&summary, shape, &self.mime_table, facts.size)?;
        if self.tag_capable.contains(record.mime()) {
            self.analyze_tags(path, &facts, &mut record)?;
        }

        debug!(
            "{}: {} {}x{} animated={}",
            path.display(),
            record.mime(),
            record.width,
            record.height,
            record.is_animated
        );
        Ok(record)
    }

    fn can_analyze(&self, mime: &str) -> bool {
        self.readable.contains(mime)
    }
}

/// Map `%m|` output (`JPEG|` or `GIF|GIF|GIF|` for animations) to a MIME type.
pub fn parse_type_output(raw: &str, mime_table: &MimeTable) -> Result<String> {
    let format = raw.split('|').next().unwrap_or_default().trim();
    mime_table
        .lookup(format)
        .map(str::to_string)
        .ok_or_else(|| AnalysisError::NotAnalyzable(format!("unknown format {:?}", format)))
}

/// Color count of the first frame from `%k\n` output.
pub fn parse_color_count(raw: &str) -> Result<u64> {
    let first = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| AnalysisError::MalformedOutput("empty color count".to_string()))?;
    first
        .parse()
        .map_err(|_| AnalysisError::MalformedOutput(format!("color count is not a number: {:?}", first)))
}
