//! Analysis backend interface
//!
//! Every backend (ImageMagick, native) implements [`AnalyzerHandler`]; the
//! [`crate::analyzer::ImageAnalyzer`] picks one per file from a priority list.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::record::MetadataRecord;

/// Available backend implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External ImageMagick `identify`
    ImageMagick,
    /// Pure Rust header probe and EXIF reader
    Native,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::ImageMagick => "imagemagick",
            BackendKind::Native => "native",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "imagemagick" | "identify" => Ok(BackendKind::ImageMagick),
            "native" => Ok(BackendKind::Native),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability interface of an analysis backend
pub trait AnalyzerHandler: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether the backend can run on this system at all.
    fn is_available(&self) -> bool;

    /// Lower-case MIME type of `path`.
    fn analyze_type(&self, path: &Path) -> Result<String>;

    /// Full metadata record for `path`.
    fn analyze_image(&self, path: &Path) -> Result<MetadataRecord>;

    /// Whether [`AnalyzerHandler::analyze_image`] supports `mime`.
    fn can_analyze(&self, mime: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("ImageMagick".parse::<BackendKind>(), Ok(BackendKind::ImageMagick));
        assert_eq!("identify".parse::<BackendKind>(), Ok(BackendKind::ImageMagick));
        assert_eq!("native".parse::<BackendKind>(), Ok(BackendKind::Native));
        assert!("gd".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Native.to_string(), "native");
    }

    #[test]
    fn test_backend_kind_serde() {
        let kinds: Vec<BackendKind> = serde_json::from_str(r#"["native","imagemagick"]"#).unwrap();
        assert_eq!(kinds, vec![BackendKind::Native, BackendKind::ImageMagick]);
    }
}
