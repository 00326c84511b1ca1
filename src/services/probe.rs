//! Aspect-ratio probing through `ffprobe`.
//!
//! The external tool is hidden behind [`MediaInspector`] so the upload
//! pipeline can be exercised without ffprobe installed.

use async_trait::async_trait;
use serde::Deserialize;
use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::Stdio,
};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe tool `{0}` not found")]
    ToolNotFound(PathBuf),
    #[error("failed to start probe tool: {0}")]
    Spawn(#[source] io::Error),
    #[error("probe exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("probe output is not valid stream metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Stream metadata as reported by `ffprobe -show_streams -print_format json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamMetadata {
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub codec_type: String,
    pub display_aspect_ratio: Option<String>,
}

/// Orientation namespace used for storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    /// Classify a raw display-aspect-ratio string.
    ///
    /// Only the exact strings `16:9` and `9:16` are recognised; equivalent
    /// ratios in other notations (`1.78`, `32:18`) fall into `Other`.
    pub fn from_aspect_ratio(ratio: &str) -> Self {
        match ratio {
            "16:9" => Orientation::Landscape,
            "9:16" => Orientation::Portrait,
            _ => Orientation::Other,
        }
    }

    /// Classify from the first video stream in `meta`.
    pub fn from_streams(meta: &StreamMetadata) -> Self {
        meta.streams
            .iter()
            .find(|stream| stream.codec_type == "video")
            .and_then(|stream| stream.display_aspect_ratio.as_deref())
            .map(Orientation::from_aspect_ratio)
            .unwrap_or(Orientation::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only inspection of a local media file.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<StreamMetadata, ProbeError>;
}

/// Probe `path` and classify its orientation.
pub async fn probe_orientation(
    inspector: &dyn MediaInspector,
    path: &Path,
) -> Result<Orientation, ProbeError> {
    let meta = inspector.inspect(path).await?;
    Ok(Orientation::from_streams(&meta))
}

/// [`MediaInspector`] that shells out to ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    binary: PathBuf,
}

impl FfprobeInspector {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeInspector {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn inspect(&self, path: &Path) -> Result<StreamMetadata, ProbeError> {
        let binary =
            which::which(&self.binary).map_err(|_| ProbeError::ToolNotFound(self.binary.clone()))?;

        let output = Command::new(binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let meta: StreamMetadata = serde_json::from_slice(&output.stdout)?;
        debug!(
            path = %path.display(),
            streams = meta.streams.len(),
            "probed media file"
        );
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFPROBE_PORTRAIT: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "aac", "codec_type": "audio"},
            {"index": 1, "codec_name": "h264", "codec_type": "video",
             "width": 1080, "height": 1920, "display_aspect_ratio": "9:16"}
        ]
    }"#;

    #[cfg(unix)]
    fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn exact_ratios_classify() {
        assert_eq!(Orientation::from_aspect_ratio("16:9"), Orientation::Landscape);
        assert_eq!(Orientation::from_aspect_ratio("9:16"), Orientation::Portrait);
    }

    #[test]
    fn equivalent_notations_are_other() {
        for ratio in ["1.78", "32:18", "16/9", " 16:9", "9:16 ", "4:3", ""] {
            assert_eq!(Orientation::from_aspect_ratio(ratio), Orientation::Other, "{ratio:?}");
        }
    }

    #[test]
    fn parses_ffprobe_output_and_skips_audio() {
        let meta: StreamMetadata = serde_json::from_str(FFPROBE_PORTRAIT).unwrap();
        assert_eq!(meta.streams.len(), 2);
        assert_eq!(Orientation::from_streams(&meta), Orientation::Portrait);
    }

    #[test]
    fn first_video_stream_wins() {
        let meta: StreamMetadata = serde_json::from_str(
            r#"{"streams": [
                {"codec_type": "video", "display_aspect_ratio": "4:3"},
                {"codec_type": "video", "display_aspect_ratio": "16:9"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(Orientation::from_streams(&meta), Orientation::Other);
    }

    #[test]
    fn missing_video_stream_is_other() {
        let meta: StreamMetadata =
            serde_json::from_str(r#"{"streams": [{"codec_type": "audio"}]}"#).unwrap();
        assert_eq!(Orientation::from_streams(&meta), Orientation::Other);

        let empty: StreamMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(Orientation::from_streams(&empty), Orientation::Other);
    }

    #[test]
    fn non_json_output_is_a_parse_error() {
        let err: ProbeError = serde_json::from_str::<StreamMetadata>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ProbeError::Parse(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let inspector = FfprobeInspector::new("definitely-not-a-real-ffprobe-binary");
        let err = inspector
            .inspect(Path::new("/tmp/does-not-matter.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = write_stub(dir.path(), "ffprobe", "echo bad >&2\nexit 1");

        let err = FfprobeInspector::new(ffprobe)
            .inspect(&dir.path().join("input.mp4"))
            .await
            .unwrap_err();
        match err {
            ProbeError::Failed { code, stderr } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "bad");
            }
            other => panic!("expected a failed run, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn garbage_stdout_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = write_stub(dir.path(), "ffprobe", "echo 'not json'");

        let err = FfprobeInspector::new(ffprobe)
            .inspect(&dir.path().join("input.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Parse(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stub_output_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = write_stub(
            dir.path(),
            "ffprobe",
            "cat <<'EOF'\n{\"streams\": [{\"codec_type\": \"video\", \"display_aspect_ratio\": \"16:9\"}]}\nEOF",
        );

        let orientation = probe_orientation(
            &FfprobeInspector::new(ffprobe),
            &dir.path().join("input.mp4"),
        )
        .await
        .unwrap();
        assert_eq!(orientation, Orientation::Landscape);
    }
}
