use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};
use crate::handler::BackendKind;
use crate::identify::DEFAULT_BINARY;
use crate::mime::{MimeSet, MimeTable, TAG_CAPABLE_TYPES};

/// Environment variable overriding [`AnalyzerConfig::identify_binary`].
pub const IDENTIFY_ENV: &str = "IMAGE_ANALYZER_IDENTIFY";

/// Analyzer configuration.
///
/// # Loading
///
/// ```rust,no_run
/// use image_analyzer::config::AnalyzerConfig;
///
/// // From a JSON file, missing keys fall back to defaults
/// let config = AnalyzerConfig::load(Some("analyzer.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = AnalyzerConfig::default();
/// config.identify_binary = Some("/opt/imagemagick/bin/identify".into());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Path of the `identify` executable; `PATH` lookup when unset.
    pub identify_binary: Option<PathBuf>,
    /// Backends in the order they are tried.
    pub backends: Vec<BackendKind>,
    /// MIME types for which EXIF tags are extracted.
    pub tag_capable_types: Vec<String>,
    /// Additional format identifier → MIME type entries.
    pub extra_formats: BTreeMap<String, String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            identify_binary: None,
            backends: vec![BackendKind::ImageMagick, BackendKind::Native],
            tag_capable_types: TAG_CAPABLE_TYPES.iter().map(|s| s.to_string()).collect(),
            extra_formats: BTreeMap::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    AnalysisError::Config(format!("cannot read {}: {}", p.display(), e))
                })?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };

        if let Ok(binary) = std::env::var(IDENTIFY_ENV) {
            if !binary.is_empty() {
                config.identify_binary = Some(PathBuf::from(binary));
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(AnalysisError::Config("no backends configured".to_string()));
        }
        for (i, kind) in self.backends.iter().enumerate() {
            if self.backends[..i].contains(kind) {
                return Err(AnalysisError::Config(format!("backend {} listed twice", kind)));
            }
        }

        for (format, mime) in &self.extra_formats {
            if format.is_empty() || !mime.contains('/') {
                return Err(AnalysisError::Config(format!(
                    "invalid format entry {:?} -> {:?}",
                    format, mime
                )));
            }
        }

        // A tag-capable type no format maps to would never get tags
        let table = self.mime_table();
        if let Some(mime) = self.tag_capable_types.iter().find(|m| !table.contains_mime(m)) {
            return Err(AnalysisError::Config(format!(
                "tag-capable type {} is not produced by any format",
                mime
            )));
        }
        Ok(())
    }

    pub fn identify_binary(&self) -> PathBuf {
        self.identify_binary
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY))
    }

    /// Reference table plus `extra_formats`.
    pub fn mime_table(&self) -> MimeTable {
        let mut table = MimeTable::imagemagick();
        for (format, mime) in &self.extra_formats {
            table.insert(format, mime);
        }
        table
    }

    pub fn tag_capable(&self) -> MimeSet {
        self.tag_capable_types.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.backends, vec![BackendKind::ImageMagick, BackendKind::Native]);
        assert!(config.tag_capable().contains("image/jpeg"));
        assert!(config.tag_capable().contains("image/tiff"));
        assert_eq!(config.identify_binary(), PathBuf::from(DEFAULT_BINARY));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalyzerConfig::from_json(
            r#"{"identify_binary": "/opt/im/identify", "extra_formats": {"HEIC": "image/heic"}}"#,
        )
        .unwrap();
        assert_eq!(config.identify_binary(), PathBuf::from("/opt/im/identify"));
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.mime_table().lookup("heic"), Some("image/heic"));
        assert_eq!(config.mime_table().lookup("jpeg"), Some("image/jpeg"));
    }

    #[test]
    fn test_validate_rejects_bad_backends() {
        let config = AnalyzerConfig { backends: vec![], ..Default::default() };
        assert!(config.validate().is_err());
        let config = AnalyzerConfig {
            backends: vec![BackendKind::Native, BackendKind::Native],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_format_entries() {
        let config = AnalyzerConfig::from_json(r#"{"tag_capable_types": ["image/x-unknown"]}"#).unwrap();
        assert!(config.validate().is_err());

        let config = AnalyzerConfig::from_json(
            r#"{"tag_capable_types": ["image/jpeg", "image/heic"], "extra_formats": {"HEIC": "image/heic"}}"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let config = AnalyzerConfig::from_json(r#"{"extra_formats": {"HEIC": "heic"}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analyzer.json");
        std::fs::write(&path, r#"{"backends": ["native"], "tag_capable_types": ["image/jpeg"]}"#).unwrap();

        let config = AnalyzerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.backends, vec![BackendKind::Native]);
        assert!(!config.tag_capable().contains("image/tiff"));
    }

    #[test]
    fn test_load_errors() {
        assert!(AnalyzerConfig::load(Some(Path::new("/nonexistent/analyzer.json"))).is_err());
        assert!(AnalyzerConfig::from_json("{not json").is_err());
    }
}
