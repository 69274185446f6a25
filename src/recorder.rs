//! Screen recording resource management.
//!
//! Wraps one OS-level screen-recording session per test: acquisition at
//! test start, timed capture for the test's duration, and controlled
//! release (keep vs. delete) at the outcome event. The recorder fails soft:
//! a missing display or codec never aborts the test it was meant to record.
//!
//! Backends implement [`RecorderBackend`]:
//! - [`FfmpegRecorder`] captures the default display through an `ffmpeg`
//!   child process
//! - [`MockRecorder`] writes stub files for testing

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

use crate::store::{Artifact, ArtifactStore, AttachmentSink};

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Error types for recorder operations
#[derive(Debug)]
pub enum RecorderError {
    /// The recording device could not be acquired or driven
    Device(String),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::Device(msg) => write!(f, "Recording device error: {}", msg),
            RecorderError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RecorderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecorderError::Device(_) => None,
            RecorderError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RecorderError {
    fn from(err: std::io::Error) -> Self {
        RecorderError::Io(err)
    }
}

/// Trait for screen-recording backends
pub trait RecorderBackend {
    /// Acquire the capture device and begin recording to `output`
    fn begin(&mut self, output: &Path) -> RecorderResult<()>;

    /// Stop recording and flush the output file
    fn finish(&mut self) -> RecorderResult<()>;

    /// Backend identifier (e.g. "ffmpeg", "mock")
    fn source_type(&self) -> &str;
}

/// Screen recorder driving an `ffmpeg` child process.
///
/// Captures the display named by `display` (e.g. ":0") with x11grab at the
/// configured frame rate into an MP4 container. Stopping writes `q` to the
/// child's stdin for a clean container trailer, falling back to a kill.
#[derive(Debug)]
pub struct FfmpegRecorder {
    frame_rate: u32,
    display: String,
    child: Option<Child>,
}

impl FfmpegRecorder {
    /// Create a recorder for the given display and frame rate
    pub fn new(display: impl Into<String>, frame_rate: u32) -> Self {
        Self {
            frame_rate,
            display: display.into(),
            child: None,
        }
    }
}

impl RecorderBackend for FfmpegRecorder {
    fn begin(&mut self, output: &Path) -> RecorderResult<()> {
        let child = Command::new("ffmpeg")
            .arg("-y")
            .args(["-f", "x11grab"])
            .args(["-framerate", &self.frame_rate.to_string()])
            .args(["-i", &self.display])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RecorderError::Device(format!("Failed to spawn ffmpeg: {}", e)))?;
        self.child = Some(child);
        Ok(())
    }

    fn finish(&mut self) -> RecorderResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // Ask ffmpeg to stop cleanly so the container trailer is written
        let quit_sent = child
            .stdin
            .take()
            .and_then(|mut stdin| stdin.write_all(b"q").ok())
            .is_some();

        if !quit_sent {
            let _ = child.kill();
        }
        let status = child.wait()?;
        if !quit_sent || !status.success() {
            debug!(%status, "ffmpeg did not exit cleanly");
        }
        Ok(())
    }

    fn source_type(&self) -> &str {
        "ffmpeg"
    }
}

/// Recorder backend for testing: writes stub video files.
///
/// `begin` creates the output file immediately (like a real recorder);
/// `finish` flushes stub content into it. Construct with
/// [`MockRecorder::failing`] to simulate an unavailable capture device.
#[derive(Debug, Default)]
pub struct MockRecorder {
    fail_begin: bool,
    output: Option<PathBuf>,
}

impl MockRecorder {
    /// Create a mock recorder that records successfully
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock recorder whose device acquisition always fails
    pub fn failing() -> Self {
        Self {
            fail_begin: true,
            output: None,
        }
    }
}

impl RecorderBackend for MockRecorder {
    fn begin(&mut self, output: &Path) -> RecorderResult<()> {
        if self.fail_begin {
            return Err(RecorderError::Device("no capture device".to_string()));
        }
        fs::write(output, b"")?;
        self.output = Some(output.to_path_buf());
        Ok(())
    }

    fn finish(&mut self) -> RecorderResult<()> {
        if let Some(output) = self.output.take() {
            fs::write(output, b"mock video content")?;
        }
        Ok(())
    }

    fn source_type(&self) -> &str {
        "mock"
    }
}

/// One active screen-recording resource bound to a single test
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Test the recording belongs to
    pub test_name: String,

    /// When the recording started
    pub started_at: DateTime<Utc>,

    /// File the backend is recording into
    pub output: PathBuf,
}

/// Owns the recording session lifecycle: start, stop(keep|discard), release.
///
/// At most one session is active at a time. A second `start` while a session
/// is active is a calling-discipline violation by the orchestrator; the
/// manager refuses to leak it by force-stopping and discarding the stale
/// session with a warning.
pub struct VideoRecorder {
    backend: Box<dyn RecorderBackend>,
    session: Option<RecordingSession>,
}

impl VideoRecorder {
    /// Create a recorder manager over the given backend
    pub fn new(backend: Box<dyn RecorderBackend>) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Whether a recording is currently active
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Begin recording for a test.
    ///
    /// Soft-fails: if the capture device cannot be acquired the failure is
    /// logged and no session is left active — the test itself proceeds
    /// without video.
    pub fn start(&mut self, test_name: &str, store: &ArtifactStore) {
        if self.session.is_some() {
            warn!(
                test = test_name,
                "recording already active, discarding stale session"
            );
            self.discard_active();
        }

        let output = store.video_output_path(test_name);
        match self.backend.begin(&output) {
            Ok(()) => {
                debug!(test = test_name, output = %output.display(), "video recording started");
                self.session = Some(RecordingSession {
                    test_name: test_name.to_string(),
                    started_at: Utc::now(),
                    output,
                });
            }
            Err(e) => {
                warn!(test = test_name, error = %e, "failed to start video recording");
            }
        }
    }

    /// Stop the active session, if any.
    ///
    /// With `discard` the produced file is deleted and no artifact is
    /// produced. Otherwise the file is read, attached through the sink and
    /// registered as a video artifact; the file itself stays on disk.
    /// Session state is always released, even when reading or attaching
    /// fails.
    pub fn stop(
        &mut self,
        discard: bool,
        store: &ArtifactStore,
        sink: &dyn AttachmentSink,
    ) -> Option<Artifact> {
        // Taken up-front: the session is released no matter what follows
        let session = self.session.take()?;

        if let Err(e) = self.backend.finish() {
            warn!(test = %session.test_name, error = %e, "failed to stop recording cleanly");
        }

        if discard {
            match fs::remove_file(&session.output) {
                Ok(()) => debug!(test = %session.test_name, "video discarded"),
                Err(e) => warn!(
                    path = %session.output.display(),
                    error = %e,
                    "failed to delete discarded video"
                ),
            }
            return None;
        }

        let bytes = match fs::read(&session.output) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    path = %session.output.display(),
                    error = %e,
                    "failed to read recorded video"
                );
                return None;
            }
        };

        let artifact = store.register_video(
            &session.test_name,
            session.output.clone(),
            Some(serde_json::json!({
                "source": self.backend.source_type(),
                "started": session.started_at.to_rfc3339(),
                "size_bytes": bytes.len(),
            })),
        );

        if let Err(e) = sink.attach(&artifact.label, artifact.kind, &bytes) {
            warn!(test = %session.test_name, error = %e, "video attachment skipped (file saved locally)");
        }

        Some(artifact)
    }

    fn discard_active(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = self.backend.finish() {
                warn!(error = %e, "failed to stop stale recording");
            }
            if let Err(e) = fs::remove_file(&session.output) {
                warn!(
                    path = %session.output.display(),
                    error = %e,
                    "failed to delete stale recording"
                );
            }
        }
    }
}

impl std::fmt::Debug for VideoRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRecorder")
            .field("backend", &self.backend.source_type())
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NullSink;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn test_start_then_keep_produces_one_artifact() {
        let (_dir, store) = store();
        let mut recorder = VideoRecorder::new(Box::new(MockRecorder::new()));

        recorder.start("checkout_flow", &store);
        assert!(recorder.is_recording());

        let artifact = recorder.stop(false, &store, &NullSink).unwrap();
        assert!(!recorder.is_recording());
        assert!(artifact.path.exists());
        assert_eq!(artifact.label, "Video Recording - checkout_flow");
    }

    #[test]
    fn test_discard_deletes_file_and_produces_no_artifact() {
        let (_dir, store) = store();
        let mut recorder = VideoRecorder::new(Box::new(MockRecorder::new()));

        recorder.start("login", &store);
        let output = recorder.session().unwrap().output.clone();
        assert!(output.exists());

        let artifact = recorder.stop(true, &store, &NullSink);
        assert!(artifact.is_none());
        assert!(!output.exists());
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_stop_without_session_is_noop() {
        let (_dir, store) = store();
        let mut recorder = VideoRecorder::new(Box::new(MockRecorder::new()));
        assert!(recorder.stop(false, &store, &NullSink).is_none());
        assert!(recorder.stop(true, &store, &NullSink).is_none());
    }

    #[test]
    fn test_second_start_discards_first_session() {
        let (_dir, store) = store();
        let mut recorder = VideoRecorder::new(Box::new(MockRecorder::new()));

        recorder.start("first", &store);
        let first_output = recorder.session().unwrap().output.clone();

        recorder.start("second", &store);
        let session = recorder.session().unwrap();
        assert_eq!(session.test_name, "second");
        assert!(!first_output.exists(), "stale recording should be deleted");
    }

    #[test]
    fn test_failed_device_leaves_no_session() {
        let (_dir, store) = store();
        let mut recorder = VideoRecorder::new(Box::new(MockRecorder::failing()));

        recorder.start("no_display", &store);
        assert!(!recorder.is_recording());
        // A stop after a failed start stays a safe no-op
        assert!(recorder.stop(false, &store, &NullSink).is_none());
    }
}
