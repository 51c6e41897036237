//! image_analyzer - image metadata extraction backed by ImageMagick `identify`
//!
//! Produces one [`MetadataRecord`] per file: dimensions, color model,
//! transparency, animation, comments and (for JPEG/TIFF) normalized EXIF tags.
//! ImageMagick is shelled out to (no linking); a pure Rust backend covers
//! common formats when `identify` is missing.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod frames;
pub mod handler;
pub mod identify;
pub mod imagemagick;
pub mod metrics;
pub mod mime;
pub mod native;
pub mod probe;
pub mod record;
pub mod tags;

pub use analyzer::ImageAnalyzer;
pub use config::AnalyzerConfig;
pub use error::{AnalysisError, ErrorKind, Result};
pub use frames::{parse_frame_summary, FrameParser, FrameShape};
pub use handler::{AnalyzerHandler, BackendKind};
pub use identify::{IdentifyCommand, IdentifyError};
pub use imagemagick::ImageMagickHandler;
pub use metrics::{Metrics, MetricsSnapshot};
pub use mime::{MimeSet, MimeTable};
pub use native::NativeHandler;
pub use record::{ColorMode, MetadataRecord, TagSection, TagValue, Tags, TransparencyType};
pub use tags::{TagInputs, TagNormalizer};
