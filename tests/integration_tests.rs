//! Integration tests for image_analyzer public API

use image_analyzer::probe::FileFacts;
use image_analyzer::{
    parse_frame_summary, AnalysisError, AnalyzerConfig, AnalyzerHandler, BackendKind, ErrorKind,
    FrameShape, ImageAnalyzer, MetadataRecord, MimeTable, NativeHandler, TagInputs, TagNormalizer,
    TagValue, TransparencyType,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Handler answering from fixed frame-summary text
struct CannedHandler {
    summary: &'static str,
    table: MimeTable,
}

impl CannedHandler {
    fn new(summary: &'static str) -> Self {
        Self {
            summary,
            table: MimeTable::imagemagick(),
        }
    }
}

impl AnalyzerHandler for CannedHandler {
    fn kind(&self) -> BackendKind {
        BackendKind::ImageMagick
    }

    fn is_available(&self) -> bool {
        true
    }

    fn analyze_type(&self, _path: &Path) -> image_analyzer::Result<String> {
        Ok("image/gif".to_string())
    }

    fn analyze_image(&self, _path: &Path) -> image_analyzer::Result<MetadataRecord> {
        parse_frame_summary(self.summary, FrameShape::WithColorCount, &self.table, 4100)
    }

    fn can_analyze(&self, mime: &str) -> bool {
        mime.starts_with("image/")
    }
}

fn parse(raw: &str) -> image_analyzer::Result<MetadataRecord> {
    parse_frame_summary(raw, FrameShape::WithColorCount, &MimeTable::imagemagick(), 1000)
}

#[test]
fn test_jpeg_summary() {
    let record = parse("[JPEG|76383|399|600|8|59428|DirectClassRGB|]*").unwrap();

    assert_eq!(record.mime.as_deref(), Some("image/jpeg"));
    assert_eq!((record.width, record.height), (399, 600));
    assert!(record.is_color);
    assert_eq!(record.transparency_type, TransparencyType::Opaque);
    assert!(!record.is_animated);
    assert!(record.comment.is_none());
    assert!(record.comment_list.is_empty());
    assert_eq!(record.size, 1000);
}

#[test]
fn test_png_with_matte_is_transparent() {
    let record = parse("[PNG|5420|160|120|8|254|DirectClassRGBMatte|]*").unwrap();
    assert_eq!(record.mime.as_deref(), Some("image/png"));
    assert_eq!(record.transparency_type, TransparencyType::Transparent);
}

#[test]
fn test_animated_gif_comments() {
    let record = parse(concat!(
        "[GIF|4100|80|50|8|38|PseudoClassRGB|]*",
        "[GIF|4100|96|40|8|29|PseudoClassRGB|]*",
        "[GIF|4100|60|64|8|17|PseudoClassRGB|Animated Cog]*",
    ))
    .unwrap();

    assert!(record.is_animated);
    assert_eq!((record.width, record.height), (96, 64));
    assert!(record.comment.is_none());
    assert_eq!(record.comment_list, vec!["Animated Cog".to_string()]);
}

#[test]
fn test_unknown_format_is_not_analyzable() {
    let err = parse("[PNG|1|1|1|8|2|DirectClassRGB|]*[WHAT|1|1|1|8|2|DirectClassRGB|]*").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAnalyzable);
    assert!(matches!(err, AnalysisError::NotAnalyzable(_)));
}

#[test]
fn test_aperture_from_tag_dump() {
    let record = parse("[JPEG|76383|399|600|8|59428|DirectClassRGB|]*").unwrap();
    let file = FileFacts {
        name: "exif.jpg".to_string(),
        modified: 0,
        size: 76383,
    };
    let inputs = TagInputs {
        dump: "exif:FNumber=4/10\nexif:Make=Canon\n",
        color_count: 59428,
        file: &file,
        probe: None,
    };
    let tags = TagNormalizer::default().normalize(&record, &inputs);

    assert_eq!(tags.get("COMPUTED", "ApertureFNumber"), Some(&TagValue::from("f/0.4")));
    assert_eq!(tags.get("IFD0", "Make"), Some(&TagValue::from("Canon")));
    assert_eq!(tags.get("FILE", "SectionsFound"), Some(&TagValue::from("ANY_TAG, IFD0, EXIF")));

    let json = serde_json::to_value(&tags).unwrap();
    assert_eq!(json["COMPUTED"]["html"], "width=\"399\" height=\"600\"");
}

#[test]
fn test_analyzer_with_stub_handler() {
    let analyzer = ImageAnalyzer::new(vec![Box::new(CannedHandler::new(
        "[GIF|4100|80|50|8|38|PseudoClassRGB|First]*[GIF|4100|80|50|8|17|PseudoClassRGB|]*",
    ))]);

    let record = analyzer.analyze(Path::new("cog.gif")).unwrap();
    assert!(record.is_animated);
    assert_eq!(record.comment.as_deref(), Some("First"));
    assert_eq!(record.comment_list, vec!["First".to_string()]);
    assert_eq!(analyzer.analyze_type(Path::new("cog.gif")).unwrap(), "image/gif");

    let snapshot = analyzer.metrics().snapshot();
    assert_eq!(snapshot.total_requests, 1);
    assert_eq!(snapshot.successful_requests, 1);
}

#[test]
fn test_analyzer_reports_path_on_failure() {
    let analyzer = ImageAnalyzer::new(vec![Box::new(CannedHandler::new("[GIF|4100|80|50|8|38|"))]);

    let err = analyzer.analyze(Path::new("broken.gif")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    assert_eq!(err.path(), Some(Path::new("broken.gif")));
    assert!(err.to_string().starts_with("broken.gif: "));
    assert_eq!(analyzer.metrics().snapshot().malformed_output_count, 1);
}

#[test]
fn test_native_only_analyzer() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gray.png");
    image::GrayImage::new(12, 7).save(&path).unwrap();

    let config = AnalyzerConfig {
        backends: vec![BackendKind::Native],
        ..Default::default()
    };
    let analyzer = ImageAnalyzer::from_config(&config).unwrap();
    let record = analyzer.analyze(&path).unwrap();

    assert_eq!(record.mime.as_deref(), Some("image/png"));
    assert_eq!((record.width, record.height), (12, 7));
    assert!(!record.is_color);
    assert_eq!(record.transparency_type, TransparencyType::Opaque);
    assert!(record.tags.is_empty());
    assert!(NativeHandler::new().is_available());
}

#[cfg(unix)]
fn write_fake_identify(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "Version: ImageMagick 6.9.12-98 Q16 x86_64"
  exit 0
fi
case "$2" in
  '%m|') printf 'JPEG|' ;;
  '[%m|%b|%w|%h|%z|%k|%r|%c]*') printf '[JPEG|76383|399|600|8|59428|DirectClassRGB|]*\n' ;;
  '%[EXIF:*]') printf 'exif:Make=Canon\nexif:FNumber=4/10\nexif:ExifVersion=0220\nexif:UserComment=....\n' ;;
  '%k\n') printf '59428\n' ;;
  *) echo "identify: unexpected format $2" >&2; exit 1 ;;
esac
"#;
    let path = dir.join("identify");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// Single test for everything that spawns the fake binary
#[cfg(unix)]
#[test]
fn test_imagemagick_backend_with_fake_identify() {
    let dir = TempDir::new().unwrap();
    let binary = write_fake_identify(dir.path());
    let photo = dir.path().join("photo.jpg");
    image::RgbImage::new(4, 4).save(&photo).unwrap();

    let config = AnalyzerConfig {
        identify_binary: Some(binary),
        backends: vec![BackendKind::ImageMagick],
        ..Default::default()
    };
    let analyzer = ImageAnalyzer::from_config(&config).unwrap();

    assert_eq!(analyzer.analyze_type(&photo).unwrap(), "image/jpeg");

    let record = analyzer.analyze(&photo).unwrap();
    assert_eq!(record.mime.as_deref(), Some("image/jpeg"));
    assert_eq!((record.width, record.height), (399, 600));
    assert_eq!(record.size, std::fs::metadata(&photo).unwrap().len());

    assert_eq!(record.tag("FILE", "FileName"), Some(&TagValue::from("photo.jpg")));
    assert_eq!(record.tag("FILE", "FileType"), Some(&TagValue::Integer(2)));
    assert_eq!(record.tag("FILE", "MimeType"), Some(&TagValue::from("image/jpeg")));
    assert_eq!(record.tag("COMPUTED", "ApertureFNumber"), Some(&TagValue::from("f/0.4")));
    assert_eq!(record.tag("COMPUTED", "IsColor"), Some(&TagValue::Integer(1)));
    assert_eq!(record.tag("COMPUTED", "UserComment"), None);
    assert_eq!(record.tag("EXIF", "ExifVersion"), Some(&TagValue::from("0220")));
    assert_eq!(record.tag("IFD0", "Make"), Some(&TagValue::from("Canon")));

    // Header probe fails on content the image crate cannot read; FileType is left out
    let opaque = dir.path().join("opaque.jpg");
    std::fs::write(&opaque, b"not really a jpeg").unwrap();
    let record = analyzer.analyze(&opaque).unwrap();
    assert_eq!(record.tag("FILE", "FileName"), Some(&TagValue::from("opaque.jpg")));
    assert_eq!(record.tag("FILE", "FileType"), None);
    assert_eq!(record.tag("COMPUTED", "ApertureFNumber"), Some(&TagValue::from("f/0.4")));

    // Missing identify: the native backend takes over
    let png = dir.path().join("plain.png");
    image::RgbImage::new(2, 2).save(&png).unwrap();
    let missing = ImageAnalyzer::from_config(&AnalyzerConfig {
        identify_binary: Some(dir.path().join("no-such-identify")),
        backends: vec![BackendKind::ImageMagick, BackendKind::Native],
        ..Default::default()
    })
    .unwrap();
    let record = missing.analyze(&png).unwrap();
    assert_eq!(record.mime.as_deref(), Some("image/png"));
    assert_eq!(missing.metrics().snapshot().native_count, 1);
}
