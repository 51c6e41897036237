//! Backend selection
//!
//! [`ImageAnalyzer`] holds handlers in priority order. For each file the first
//! handler that is available, recognizes the file type and declares it can
//! analyze that type does the full analysis. Once a handler is chosen its
//! result (record or error) is final.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Result};
use crate::handler::{AnalyzerHandler, BackendKind};
use crate::imagemagick::ImageMagickHandler;
use crate::metrics::Metrics;
use crate::native::NativeHandler;
use crate::record::MetadataRecord;

pub struct ImageAnalyzer {
    handlers: Vec<Box<dyn AnalyzerHandler>>,
    metrics: Arc<Metrics>,
}

impl ImageAnalyzer {
    pub fn new(handlers: Vec<Box<dyn AnalyzerHandler>>) -> Self {
        Self {
            handlers,
            metrics: Metrics::new(),
        }
    }

    /// Build handlers in the order `config.backends` lists them.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        config.validate()?;

        let mime_table = Arc::new(config.mime_table());
        let tag_capable = Arc::new(config.tag_capable());

        let handlers = config
            .backends
            .iter()
            .map(|kind| -> Box<dyn AnalyzerHandler> {
                match kind {
                    BackendKind::ImageMagick => {
                        let readable = Arc::new(crate::mime::MimeSet::imagemagick_readable());
                        Box::new(
                            ImageMagickHandler::with_binary(config.identify_binary()).with_tables(
                                Arc::clone(&mime_table),
                                readable,
                                Arc::clone(&tag_capable),
                            ),
                        )
                    }
                    BackendKind::Native => {
                        Box::new(NativeHandler::new().with_tag_capable(Arc::clone(&tag_capable)))
                    }
                }
            })
            .collect();

        Ok(Self::new(handlers))
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn backends(&self) -> Vec<BackendKind> {
        self.handlers.iter().map(|h| h.kind()).collect()
    }

    /// MIME type from the first available handler that recognizes the file.
    pub fn analyze_type(&self, path: &Path) -> Result<String> {
        let mut last_error = None;
        for handler in self.available() {
            match handler.analyze_type(path) {
                Ok(mime) => return Ok(mime),
                Err(e) => {
                    debug!("{} could not type {}: {}", handler.kind(), path.display(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(no_backend).for_file(path))
    }

    /// Full analysis of one file.
    pub fn analyze(&self, path: &Path) -> Result<MetadataRecord> {
        let start = Instant::now();

        let (backend, result) = match self.select(path) {
            Ok(handler) => {
                info!("Analyzing {} with {}", path.display(), handler.kind());
                (Some(handler.kind()), handler.analyze_image(path))
            }
            Err(e) => (None, Err(e)),
        };
        let result = result.map_err(|e| e.for_file(path));

        let latency_ms = start.elapsed().as_millis() as u64;
        self.metrics
            .record_request(backend, result.as_ref().map(|_| ()).map_err(|e| e.kind()), latency_ms);
        result
    }

    fn available(&self) -> impl Iterator<Item = &dyn AnalyzerHandler> {
        self.handlers
            .iter()
            .map(|h| h.as_ref())
            .filter(|h| h.is_available())
    }

    fn select(&self, path: &Path) -> Result<&dyn AnalyzerHandler> {
        let mut last_error = None;
        for handler in self.available() {
            match handler.analyze_type(path) {
                Ok(mime) if handler.can_analyze(&mime) => return Ok(handler),
                Ok(mime) => {
                    debug!("{} cannot analyze {}", handler.kind(), mime);
                    last_error = Some(AnalysisError::NotAnalyzable(format!(
                        "{} not supported by {}",
                        mime,
                        handler.kind()
                    )));
                }
                Err(e) => {
                    debug!("{} could not type {}: {}", handler.kind(), path.display(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(no_backend))
    }
}

fn no_backend() -> AnalysisError {
    AnalysisError::ToolNotFound("no analysis backend available".to_string())
}
