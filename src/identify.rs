//! ImageMagick `identify` command wrapper utilities
//!
//! Spawning is a scoped acquisition: `Command::output` owns stdin/stdout/stderr
//! and waits for the child, so every pipe is released before the captured text
//! is handed to the parsers.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

use crate::error::AnalysisError;

/// Default executable name looked up on `PATH`.
#[cfg(windows)]
pub const DEFAULT_BINARY: &str = "identify.exe";
#[cfg(not(windows))]
pub const DEFAULT_BINARY: &str = "identify";

#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("identify not found: {0}")]
    NotInstalled(String),

    #[error("identify execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IdentifyError> for AnalysisError {
    fn from(err: IdentifyError) -> Self {
        match err {
            IdentifyError::NotInstalled(msg) => AnalysisError::ToolNotFound(msg),
            IdentifyError::ExecutionFailed(msg) => AnalysisError::UpstreamFailure(msg),
            IdentifyError::InvalidOutput(msg) => AnalysisError::MalformedOutput(msg),
            IdentifyError::Io(e) => AnalysisError::Io(e),
        }
    }
}

/// Fully captured result of one `identify` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// Returns stdout when the run exited with 0 and printed no diagnostics.
    ///
    /// ImageMagick reports some problems (e.g. corrupt EXIF blocks) only on
    /// stderr with a zero exit code, so both signals count as failure.
    pub fn into_stdout(self) -> Result<String, IdentifyError> {
        match self.status {
            Some(0) if self.stderr.is_empty() => Ok(self.stdout),
            Some(0) => Err(IdentifyError::ExecutionFailed(self.stderr)),
            Some(code) if self.stderr.is_empty() => {
                Err(IdentifyError::ExecutionFailed(format!("exit status {}", code)))
            }
            Some(_) => Err(IdentifyError::ExecutionFailed(self.stderr)),
            None => Err(IdentifyError::ExecutionFailed("terminated by signal".to_string())),
        }
    }
}

pub struct IdentifyCommand {
    binary: PathBuf,
    args: Vec<OsString>,
    strip_newlines: bool,
}

impl IdentifyCommand {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            args: Vec::new(),
            strip_newlines: true,
        }
    }

    /// `-format <spec>`; no shell is involved, so the spec is passed verbatim.
    pub fn format(mut self, spec: &str) -> Self {
        self.args.push("-format".into());
        self.args.push(spec.into());
        self
    }

    /// Input file, passed as raw OS bytes.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push(path.as_ref().as_os_str().to_os_string());
        self
    }

    /// Keep `\n` in stdout. Multi-line output such as tag dumps needs it;
    /// per-frame summaries are joined into one line by default.
    pub fn keep_newlines(mut self) -> Self {
        self.strip_newlines = false;
        self
    }

    pub fn execute(self) -> Result<CapturedOutput, IdentifyError> {
        debug!("Running {} {:?}", self.binary.display(), self.args);

        let output = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    IdentifyError::NotInstalled(self.binary.display().to_string())
                }
                _ => IdentifyError::Io(e),
            })?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if self.strip_newlines {
            stdout.retain(|c| c != '\n');
        }
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        stderr.retain(|c| c != '\n');

        Ok(CapturedOutput {
            status: output.status.code(),
            stdout,
            stderr,
        })
    }

    /// Run and return stdout, failing on a non-zero status or any stderr text.
    pub fn run(self) -> Result<String, IdentifyError> {
        self.execute()?.into_stdout()
    }
}

/// Checks that `binary -version` can be spawned and exits successfully.
pub fn is_identify_installed(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
