//! Fast-start remuxing through `ffmpeg`.
//!
//! Streams are copied, never re-encoded; only the container layout changes so
//! the `moov` atom precedes the media data.

use async_trait::async_trait;
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::Stdio,
};
use thiserror::Error;
use tempfile::TempPath;
use tokio::{fs, process::Command};
use tracing::debug;

/// Suffix appended to the input path to name the remuxed output.
pub const PROCESSING_SUFFIX: &str = ".processing";

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("remux tool `{0}` not found")]
    ToolNotFound(PathBuf),
    #[error("failed to start remux tool: {0}")]
    Spawn(#[source] io::Error),
    #[error("remux exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("remux produced no output at {}", .0.display())]
    EmptyOutput(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Rewrites a local media file into a streaming-friendly container.
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Remux `input` into a new file and return its path. The caller owns
    /// deleting the returned file.
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError>;
}

/// Output path for `input`: the same path with [`PROCESSING_SUFFIX`] appended.
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(PROCESSING_SUFFIX);
    PathBuf::from(name)
}

/// Confirm `output` exists and is non-empty.
pub async fn ensure_non_empty(output: &Path) -> Result<(), RemuxError> {
    match fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(RemuxError::EmptyOutput(output.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(RemuxError::EmptyOutput(output.to_path_buf()))
        }
        Err(err) => Err(RemuxError::Io(err)),
    }
}

/// [`Remuxer`] that shells out to ffmpeg with `-c copy -movflags faststart`.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    binary: PathBuf,
}

impl FfmpegRemuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments passed to ffmpeg for `input` -> `output`.
    pub fn build_args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-v", "error", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(
            ["-c", "copy", "-movflags", "faststart", "-f", "mp4"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<(), RemuxError> {
        let binary =
            which::which(&self.binary).map_err(|_| RemuxError::ToolNotFound(self.binary.clone()))?;

        let result = Command::new(binary)
            .args(Self::build_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(RemuxError::Spawn)?;

        if !result.status.success() {
            return Err(RemuxError::Failed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        ensure_non_empty(output).await
    }
}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        // Deletes any partial output unless the run succeeds.
        let guard = TempPath::from_path(output_path_for(input));

        self.run(input, &guard).await?;

        let output = guard.keep().map_err(|err| RemuxError::Io(err.error))?;
        debug!(input = %input.display(), output = %output.display(), "remuxed for fast start");
        Ok(output)
    }
}
