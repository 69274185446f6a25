//! Artifact store: results directory layout, naming, and writes.
//!
//! The store owns the on-disk layout a reporting tool later reads:
//! `screenshots/`, `logs/`, `videos/` and `history/` under a results root,
//! plus `environment.properties` at the root. Files are named
//! `<test_name>_<yyyyMMdd_HHmmss>.<ext>` so concurrent writes under distinct
//! timestamps do not collide. Artifacts are written once and never mutated.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kind of a captured artifact, with its MIME type and file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Full-page screenshot
    Png,

    /// Formatted log or failure-detail text
    PlainText,

    /// Screen-recorded video
    Video,
}

impl ArtifactKind {
    /// MIME type for report attachment
    pub fn mime(&self) -> &'static str {
        match self {
            ArtifactKind::Png => "image/png",
            ArtifactKind::PlainText => "text/plain",
            ArtifactKind::Video => "video/mp4",
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Png => "png",
            ArtifactKind::PlainText => "log",
            ArtifactKind::Video => "mp4",
        }
    }
}

/// A captured file registered for inclusion in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Logical attachment label (e.g. "Screenshot - login_test")
    pub label: String,

    /// Artifact kind
    pub kind: ArtifactKind,

    /// Where the file was written
    pub path: PathBuf,

    /// Optional metadata about the capture
    pub metadata: Option<serde_json::Value>,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for store operations
#[derive(Debug)]
pub enum StoreError {
    /// I/O error with the path that failed
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(path, err) => write!(f, "I/O error at {}: {}", path.display(), err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(_, err) => Some(err),
        }
    }
}

/// External report attachment capability.
///
/// Implementations forward captured payloads to a reporting tool. Failures
/// here are non-fatal everywhere: the file is already saved locally and the
/// caller logs and continues.
pub trait AttachmentSink {
    /// Attach a payload under the given label and kind
    fn attach(&self, label: &str, kind: ArtifactKind, payload: &[u8]) -> Result<(), SinkError>;
}

/// Error from a report attachment sink
#[derive(Debug)]
pub struct SinkError {
    /// What the sink rejected and why
    pub message: String,
}

impl SinkError {
    /// Create a sink error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Attachment sink error: {}", self.message)
    }
}

impl std::error::Error for SinkError {}

/// Sink that drops every attachment (for runs without a reporting tool)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AttachmentSink for NullSink {
    fn attach(&self, _label: &str, _kind: ArtifactKind, _payload: &[u8]) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Owns the results directory tree and performs artifact writes
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Root of the results directory
    results_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at the given results directory
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Create the results root and the artifact subdirectories
    pub fn init(&self) -> StoreResult<()> {
        for dir in [
            self.results_dir.clone(),
            self.screenshots_dir(),
            self.logs_dir(),
            self.videos_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| StoreError::Io(dir.clone(), e))?;
        }
        debug!(results_dir = %self.results_dir.display(), "artifact directories ready");
        Ok(())
    }

    /// Results root
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Screenshot subdirectory
    pub fn screenshots_dir(&self) -> PathBuf {
        self.results_dir.join("screenshots")
    }

    /// Log subdirectory
    pub fn logs_dir(&self) -> PathBuf {
        self.results_dir.join("logs")
    }

    /// Video subdirectory
    pub fn videos_dir(&self) -> PathBuf {
        self.results_dir.join("videos")
    }

    /// History subdirectory (populated by history migration)
    pub fn history_dir(&self) -> PathBuf {
        self.results_dir.join("history")
    }

    /// Path of the environment snapshot file
    pub fn environment_file(&self) -> PathBuf {
        self.results_dir.join("environment.properties")
    }

    /// Write screenshot bytes under `screenshots/` and return the artifact
    pub fn write_screenshot(
        &self,
        test_name: &str,
        bytes: &[u8],
        metadata: Option<serde_json::Value>,
    ) -> StoreResult<Artifact> {
        let file_name = format!(
            "{}_{}.{}",
            sanitize_name(test_name),
            generate_timestamp(),
            ArtifactKind::Png.extension()
        );
        let path = self.screenshots_dir().join(file_name);
        fs::write(&path, bytes).map_err(|e| StoreError::Io(path.clone(), e))?;
        debug!(path = %path.display(), "screenshot written");
        Ok(Artifact {
            label: format!("Screenshot - {}", test_name),
            kind: ArtifactKind::Png,
            path,
            metadata,
        })
    }

    /// Write log text under `logs/` with a tag distinguishing the log kind
    /// (e.g. "browser", "execution", "failure") and return the artifact
    pub fn write_log(
        &self,
        test_name: &str,
        tag: &str,
        label: String,
        text: &str,
        metadata: Option<serde_json::Value>,
    ) -> StoreResult<Artifact> {
        let file_name = format!(
            "{}_{}_{}.{}",
            sanitize_name(test_name),
            tag,
            generate_timestamp(),
            ArtifactKind::PlainText.extension()
        );
        let path = self.logs_dir().join(file_name);
        fs::write(&path, text).map_err(|e| StoreError::Io(path.clone(), e))?;
        debug!(path = %path.display(), "log written");
        Ok(Artifact {
            label,
            kind: ArtifactKind::PlainText,
            path,
            metadata,
        })
    }

    /// Path a new recording for this test should be written to
    pub fn video_output_path(&self, test_name: &str) -> PathBuf {
        let file_name = format!(
            "{}_{}.{}",
            sanitize_name(test_name),
            generate_timestamp(),
            ArtifactKind::Video.extension()
        );
        self.videos_dir().join(file_name)
    }

    /// Register an already-written video file as an artifact
    pub fn register_video(
        &self,
        test_name: &str,
        path: PathBuf,
        metadata: Option<serde_json::Value>,
    ) -> Artifact {
        Artifact {
            label: format!("Video Recording - {}", test_name),
            kind: ArtifactKind::Video,
            path,
            metadata,
        }
    }
}

/// Generate a timestamp string in YYYYMMDD_HHMMSS format
pub fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sanitize a test name for use in filenames
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("login test"), "login_test");
        assert_eq!(sanitize_name("search/fun"), "search_fun");
        assert_eq!(sanitize_name("play_music-2"), "play_music-2");
    }

    #[test]
    fn test_kind_mime_and_extension() {
        assert_eq!(ArtifactKind::Png.mime(), "image/png");
        assert_eq!(ArtifactKind::Png.extension(), "png");
        assert_eq!(ArtifactKind::PlainText.mime(), "text/plain");
        assert_eq!(ArtifactKind::Video.extension(), "mp4");
    }

    #[test]
    fn test_init_creates_layout() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("results"));
        store.init().unwrap();

        assert!(store.screenshots_dir().is_dir());
        assert!(store.logs_dir().is_dir());
        assert!(store.videos_dir().is_dir());
    }

    #[test]
    fn test_write_screenshot_names_file_from_test() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.init().unwrap();

        let artifact = store
            .write_screenshot("login test", b"\x89PNG-bytes", None)
            .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Png);
        assert!(artifact.path.exists());
        let file_name = artifact.path.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("login_test_"));
        assert!(file_name.ends_with(".png"));
    }

    #[test]
    fn test_write_log_includes_tag() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.init().unwrap();

        let artifact = store
            .write_log("t1", "browser", "Browser Console Logs - t1".to_string(), "text", None)
            .unwrap();

        let file_name = artifact.path.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("t1_browser_"));
        assert!(file_name.ends_with(".log"));
        assert_eq!(fs::read_to_string(&artifact.path).unwrap(), "text");
    }

    #[test]
    fn test_write_to_missing_dir_is_io_error() {
        let store = ArtifactStore::new("/nonexistent-root/results");
        let err = store.write_screenshot("t", b"x", None).unwrap_err();
        assert!(matches!(err, StoreError::Io(_, _)));
    }
}
