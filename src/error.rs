use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Not analyzable: {0}")]
    NotAnalyzable(String),

    #[error("Malformed tool output: {0}")]
    MalformedOutput(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image probe error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<AnalysisError>,
    },
}

/// Coarse classification callers report alongside the file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAnalyzable,
    MalformedOutput,
    UpstreamFailure,
    /// Missing tools, IO, configuration.
    Environment,
}

impl AnalysisError {
    /// Attach the offending file to an error, keeping an existing path if present.
    pub fn for_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            err @ AnalysisError::File { .. } => err,
            err => AnalysisError::File {
                path: path.into(),
                source: Box::new(err),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::NotAnalyzable(_) => ErrorKind::NotAnalyzable,
            AnalysisError::MalformedOutput(_) => ErrorKind::MalformedOutput,
            AnalysisError::UpstreamFailure(_) => ErrorKind::UpstreamFailure,
            AnalysisError::File { source, .. } => source.kind(),
            AnalysisError::ToolNotFound(_)
            | AnalysisError::Config(_)
            | AnalysisError::Io(_)
            | AnalysisError::Json(_)
            | AnalysisError::Image(_) => ErrorKind::Environment,
        }
    }

    /// Path of the file the error was raised for, if known.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            AnalysisError::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
