//! File-system facts and header-only pixel probing
//!
//! Both are collaborators of the tag normalizer: the `FILE` section reports
//! name, modification time and size, plus the image type found by reading the
//! file header independently of the identification tool.

use image::ImageDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Name, modification time and size of the analyzed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFacts {
    /// Base name without directories
    pub name: String,
    /// Modification time, Unix seconds
    pub modified: i64,
    /// Size in bytes
    pub size: u64,
}

impl FileFacts {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp())
            .unwrap_or(0);

        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            modified,
            size: metadata.len(),
        })
    }
}

/// Image type indicator, numbered like the classic `IMAGETYPE_*` constants
/// so the `FILE.FileType` tag matches what other EXIF readers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageType {
    Gif = 1,
    Jpeg = 2,
    Png = 3,
    Bmp = 6,
    TiffIntel = 7,
    TiffMotorola = 8,
    Ico = 17,
    Webp = 18,
    Avif = 19,
}

impl ImageType {
    pub fn code(self) -> i64 {
        self as i64
    }

    fn from_format(format: image::ImageFormat, header: &[u8]) -> Option<Self> {
        use image::ImageFormat;

        Some(match format {
            ImageFormat::Gif => ImageType::Gif,
            ImageFormat::Jpeg => ImageType::Jpeg,
            ImageFormat::Png => ImageType::Png,
            ImageFormat::Bmp => ImageType::Bmp,
            ImageFormat::Ico => ImageType::Ico,
            ImageFormat::WebP => ImageType::Webp,
            ImageFormat::Avif => ImageType::Avif,
            ImageFormat::Tiff if header.starts_with(b"MM") => ImageType::TiffMotorola,
            ImageFormat::Tiff => ImageType::TiffIntel,
            _ => return None,
        })
    }
}

/// Result of reading an image header
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedImage {
    pub image_type: Option<ImageType>,
    pub format: Option<image::ImageFormat>,
    pub width: u32,
    pub height: u32,
    pub color_type: image::ColorType,
}

impl ProbedImage {
    pub fn has_alpha(&self) -> bool {
        self.color_type.has_alpha()
    }

    pub fn has_color(&self) -> bool {
        self.color_type.has_color()
    }
}

/// Read the header of `path` without decoding pixel data.
pub fn probe_image(path: &Path) -> Result<ProbedImage> {
    let mut header = [0u8; 4];
    let read = File::open(path)?.read(&mut header)?;

    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();

    Ok(ProbedImage {
        image_type: format.and_then(|f| ImageType::from_format(f, &header[..read])),
        format,
        width,
        height,
        color_type: decoder.color_type(),
    })
}
