//! Diagnostic capture from the browser session and the test runner.
//!
//! Pulls screenshots and console logs from the live browser session and
//! execution metadata from the finished test, formats them, and writes them
//! through the artifact store. Each operation is independent and
//! best-effort: it returns its own `CaptureResult` and never blocks a
//! sibling capture. The lifecycle router is the single place these results
//! are logged.

use tracing::warn;

use crate::model::{millis_to_datetime, ConsoleEntry, ConsoleLevel, FailureCause, TestExecution};
use crate::store::{Artifact, ArtifactStore, AttachmentSink, StoreError};

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture operations
#[derive(Debug)]
pub enum CaptureError {
    /// The browser session was unreachable or rejected the request
    Session(String),

    /// The artifact store failed to persist the capture
    Store(StoreError),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Session(msg) => write!(f, "Browser session error: {}", msg),
            CaptureError::Store(err) => write!(f, "Store error: {}", err),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::Session(_) => None,
            CaptureError::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for CaptureError {
    fn from(err: StoreError) -> Self {
        CaptureError::Store(err)
    }
}

/// Live browser session capability consumed by the capturer.
///
/// Implemented by the driver plumbing outside this crate; the capturer only
/// needs screenshot bytes and the console log buffer.
pub trait DriverSession {
    /// Take a full-page screenshot and return PNG bytes
    fn screenshot_png(&mut self) -> Result<Vec<u8>, String>;

    /// Read and drain the browser console log buffer, oldest first
    fn console_entries(&mut self) -> Result<Vec<ConsoleEntry>, String>;

    /// End the browser session
    fn quit(&mut self);
}

/// Severity tally for a console log capture.
///
/// An entry is an error iff its level is the highest severity, a warning
/// iff it is the warning level, and info otherwise, so
/// `errors + warnings + info` always equals the entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogTally {
    /// Entries at the highest severity
    pub errors: usize,

    /// Entries at warning severity
    pub warnings: usize,

    /// Everything else
    pub info: usize,
}

impl LogTally {
    /// Tally severities across a set of console entries
    pub fn of(entries: &[ConsoleEntry]) -> Self {
        let mut tally = LogTally::default();
        for entry in entries {
            match entry.level {
                ConsoleLevel::Severe => tally.errors += 1,
                ConsoleLevel::Warning => tally.warnings += 1,
                _ => tally.info += 1,
            }
        }
        tally
    }

    /// Total entries tallied
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

/// Captures diagnostics and writes them through the artifact store
pub struct Capturer<'a> {
    store: &'a ArtifactStore,
    sink: &'a dyn AttachmentSink,
}

impl<'a> Capturer<'a> {
    /// Create a capturer writing through the given store and sink
    pub fn new(store: &'a ArtifactStore, sink: &'a dyn AttachmentSink) -> Self {
        Self { store, sink }
    }

    /// Capture a full-page screenshot from the browser session
    pub fn capture_screenshot(
        &self,
        driver: &mut dyn DriverSession,
        test_name: &str,
    ) -> CaptureResult<Artifact> {
        let bytes = driver.screenshot_png().map_err(CaptureError::Session)?;

        // Dimensions recorded best-effort; a decode failure still saves the file
        let metadata = match image::load_from_memory(&bytes) {
            Ok(img) => Some(serde_json::json!({
                "width": img.width(),
                "height": img.height(),
            })),
            Err(e) => {
                warn!(test = test_name, error = %e, "screenshot did not decode as an image");
                None
            }
        };

        let artifact = self.store.write_screenshot(test_name, &bytes, metadata)?;
        self.attach(&artifact, &bytes);
        Ok(artifact)
    }

    /// Capture the browser console log buffer, formatted with a severity
    /// summary
    pub fn capture_console_logs(
        &self,
        driver: &mut dyn DriverSession,
        test_name: &str,
    ) -> CaptureResult<Artifact> {
        let entries = driver.console_entries().map_err(CaptureError::Session)?;
        let tally = LogTally::of(&entries);
        let text = format_console_log(test_name, &entries, tally);

        let artifact = self.store.write_log(
            test_name,
            "browser",
            format!("Browser Console Logs - {}", test_name),
            &text,
            Some(serde_json::json!({
                "total": tally.total(),
                "errors": tally.errors,
                "warnings": tally.warnings,
                "info": tally.info,
            })),
        )?;
        self.attach(&artifact, text.as_bytes());
        Ok(artifact)
    }

    /// Capture the runner's own execution metadata for a finished test
    pub fn capture_execution_log(&self, execution: &TestExecution) -> CaptureResult<Artifact> {
        let text = format_execution_log(execution);
        let artifact = self.store.write_log(
            &execution.name,
            "execution",
            format!("Execution Logs - {}", execution.name),
            &text,
            None,
        )?;
        self.attach(&artifact, text.as_bytes());
        Ok(artifact)
    }

    /// Attach formatted failure-cause detail for a failed or broken test.
    ///
    /// Returns `Ok(None)` when the execution carries no failure cause.
    pub fn capture_failure_details(
        &self,
        execution: &TestExecution,
    ) -> CaptureResult<Option<Artifact>> {
        let Some(cause) = &execution.failure else {
            return Ok(None);
        };
        let text = format_failure_cause(cause);
        let artifact = self.store.write_log(
            &execution.name,
            "failure",
            format!("Failure Details - {}", execution.name),
            &text,
            None,
        )?;
        self.attach(&artifact, text.as_bytes());
        Ok(Some(artifact))
    }

    fn attach(&self, artifact: &Artifact, payload: &[u8]) {
        if let Err(e) = self.sink.attach(&artifact.label, artifact.kind, payload) {
            warn!(label = %artifact.label, error = %e, "attachment skipped (file saved locally)");
        }
    }
}

const BANNER: &str = "=================================================================";

/// Format the console log buffer with banner framing and a severity summary
pub fn format_console_log(test_name: &str, entries: &[ConsoleEntry], tally: LogTally) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push_str("\n BROWSER CONSOLE LOGS\n Test: ");
    out.push_str(test_name);
    out.push('\n');
    out.push_str(BANNER);
    out.push_str("\n\n");

    for entry in entries {
        let stamp = millis_to_datetime(entry.timestamp_ms).format("%Y-%m-%d %H:%M:%S");
        out.push_str(&format!(
            "[{:<7}] {} - {}\n",
            entry.level.label(),
            stamp,
            entry.message
        ));
    }

    out.push('\n');
    out.push_str(BANNER);
    out.push_str("\n SUMMARY\n");
    out.push_str(&format!(" Total Logs: {}\n", tally.total()));
    out.push_str(&format!(" Errors: {}\n", tally.errors));
    out.push_str(&format!(" Warnings: {}\n", tally.warnings));
    out.push_str(&format!(" Info: {}\n", tally.info));
    out.push_str(BANNER);
    out.push('\n');
    out
}

/// Format execution metadata for a finished test
pub fn format_execution_log(execution: &TestExecution) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push_str("\n EXECUTION LOGS\n Test: ");
    out.push_str(&execution.name);
    out.push('\n');
    out.push_str(BANNER);
    out.push_str("\n\n");

    out.push_str("Test Information:\n");
    out.push_str(&format!("  Test Name: {}\n", execution.name));
    out.push_str(&format!("  Test Class: {}\n", execution.class_name));
    out.push_str(&format!("  Status: {}\n", execution.status.label()));
    out.push_str(&format!(
        "  Start Time: {}\n",
        execution.started_at().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "  End Time: {}\n",
        execution.ended_at().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Duration: {} seconds\n", execution.duration_secs()));

    if !execution.parameters.is_empty() {
        out.push_str("\nTest Parameters:\n");
        for (i, param) in execution.parameters.iter().enumerate() {
            out.push_str(&format!("  Parameter[{}]: {}\n", i, param));
        }
    }

    if !execution.messages.is_empty() {
        out.push_str("\nLogged Messages:\n");
        for message in &execution.messages {
            out.push_str(&format!("  {}\n", message));
        }
    }

    out.push_str("\nTest Context:\n");
    out.push_str(&format!("  Suite Name: {}\n", execution.suite));
    out.push_str(&format!(
        "  Host: {}\n",
        execution.host.as_deref().unwrap_or("N/A")
    ));
    out
}

/// Format a failure cause with its frames and any nested cause
pub fn format_failure_cause(cause: &FailureCause) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push_str("\n FAILURE DETAILS\n");
    out.push_str(BANNER);
    out.push_str("\n\n");

    out.push_str(&format!("Failure Type: {}\n", cause.kind));
    out.push_str(&format!("Message: {}\n\n", cause.message));
    out.push_str("Stack Trace:\n");
    for frame in &cause.frames {
        out.push_str(&format!("  at {}\n", frame));
    }

    if let Some(nested) = &cause.cause {
        out.push_str(&format!("\nCaused by: {}\n", nested.kind));
        out.push_str(&format!("Cause Message: {}\n\n", nested.message));
        out.push_str("Cause Stack Trace:\n");
        for frame in &nested.frames {
            out.push_str(&format!("  at {}\n", frame));
        }
    }
    out
}
