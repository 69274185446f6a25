//! Core data types for test run lifecycle events.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Final status of a single test invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Test ran to completion and all assertions held
    Passed,

    /// Test ran and an assertion or the application failed
    Failed,

    /// Test did not run (deliberate skip, or broken setup when a
    /// failure cause is attached)
    Skipped,
}

impl TestStatus {
    /// Human-readable label used in execution logs
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Skipped => "SKIPPED",
        }
    }
}

/// An exception-like failure description attached to a test result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureCause {
    /// Type name of the failure (e.g. "AssertionError", "TimeoutError")
    pub kind: String,

    /// Failure message
    pub message: String,

    /// Stack frames, outermost first
    pub frames: Vec<String>,

    /// Nested cause, if the failure wraps another one
    pub cause: Option<Box<FailureCause>>,
}

impl FailureCause {
    /// Create a cause with no frames and no nested cause
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            frames: Vec::new(),
            cause: None,
        }
    }
}

/// One invocation of one test case.
///
/// Created when the runner reports a test outcome and never mutated
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecution {
    /// Test method name
    pub name: String,

    /// Test class (or module) name
    pub class_name: String,

    /// Enclosing suite name
    pub suite: String,

    /// Host the test ran on, if the runner reports one
    pub host: Option<String>,

    /// Final status
    pub status: TestStatus,

    /// Failure cause for failed or broken-skipped tests
    pub failure: Option<FailureCause>,

    /// Start timestamp, epoch milliseconds
    pub started_ms: i64,

    /// End timestamp, epoch milliseconds
    pub ended_ms: i64,

    /// Parameters the test was invoked with, stringified
    pub parameters: Vec<String>,

    /// Ad-hoc messages logged during the test
    pub messages: Vec<String>,
}

impl TestExecution {
    /// Wall-clock duration in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.ended_ms - self.started_ms) as f64 / 1000.0
    }

    /// Start time as a UTC datetime (epoch on malformed timestamps)
    pub fn started_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.started_ms)
    }

    /// End time as a UTC datetime (epoch on malformed timestamps)
    pub fn ended_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.ended_ms)
    }
}

/// Browser console log severity, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleLevel {
    /// Highest severity; tallied as an error
    Severe,

    /// Tallied as a warning
    Warning,

    /// Tallied as info
    Info,

    /// Tallied as info
    Debug,
}

impl ConsoleLevel {
    /// Fixed-width label for log formatting
    pub fn label(&self) -> &'static str {
        match self {
            ConsoleLevel::Severe => "SEVERE",
            ConsoleLevel::Warning => "WARNING",
            ConsoleLevel::Info => "INFO",
            ConsoleLevel::Debug => "DEBUG",
        }
    }
}

/// One entry from the browser console log buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Severity level
    pub level: ConsoleLevel,

    /// Logged message
    pub message: String,

    /// Entry timestamp, epoch milliseconds
    pub timestamp_ms: i64,
}

impl ConsoleEntry {
    /// Create an entry
    pub fn new(level: ConsoleLevel, message: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp_ms,
        }
    }
}

/// Outcome counts for a finished suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests that passed
    pub passed: usize,

    /// Tests that failed
    pub failed: usize,

    /// Tests that were skipped (clean or broken)
    pub skipped: usize,
}

impl RunSummary {
    /// Total number of reported outcomes
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Convert epoch milliseconds to a UTC datetime, clamping invalid values
pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
