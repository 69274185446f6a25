//! Web Witness - conditional diagnostic artifact capture for browser UI test runs.
//!
//! This crate provides:
//! - A lifecycle event router that reacts to suite/test events from an
//!   external test runner
//! - Outcome-based capture policies (retain everything on failure, discard
//!   the recording on success)
//! - Screenshot, browser console log, and execution log capture through an
//!   artifact store with a stable on-disk layout
//! - Screen-recording session management with safe start/stop/cleanup
//! - Cross-run history migration and per-run environment snapshots for a
//!   reporting dashboard
//!
//! # Example
//!
//! ```rust,no_run
//! use web_witness::{Config, NullSink, RunObserver, TestExecution, TestStatus};
//!
//! let mut observer = RunObserver::new(Config::from_env(), Box::new(NullSink));
//! observer.on_suite_start("smoke", 1);
//! observer.on_test_start("login_with_valid_credentials");
//! let execution = TestExecution {
//!     name: "login_with_valid_credentials".to_string(),
//!     class_name: "LoginTest".to_string(),
//!     suite: "smoke".to_string(),
//!     host: None,
//!     status: TestStatus::Passed,
//!     failure: None,
//!     started_ms: 0,
//!     ended_ms: 1200,
//!     parameters: vec![],
//!     messages: vec![],
//! };
//! observer.on_test_success(&execution);
//! let summary = observer.on_suite_finish();
//! assert_eq!(summary.passed, 1);
//! ```

pub mod capture;
pub mod config;
pub mod history;
pub mod model;
pub mod observer;
pub mod policy;
pub mod recorder;
pub mod store;

// Re-export model types
pub use model::{ConsoleEntry, ConsoleLevel, FailureCause, RunSummary, TestExecution, TestStatus};

// Re-export policy types
pub use policy::{classify, CapturePolicy};

// Re-export store types
pub use store::{Artifact, ArtifactKind, ArtifactStore, AttachmentSink, NullSink, SinkError, StoreError};

// Re-export recorder types
pub use recorder::{
    FfmpegRecorder, MockRecorder, RecorderBackend, RecorderError, RecordingSession, VideoRecorder,
};

// Re-export capture types
pub use capture::{CaptureError, Capturer, DriverSession, LogTally};

// Re-export history types
pub use history::{
    migrate_history, place_history_marker, write_environment_snapshot, EnvironmentSnapshot,
    HistoryError, HistoryMigration,
};

// Re-export configuration and the router
pub use config::{CaptureSettings, Config, Environment, TargetSettings};
pub use observer::RunObserver;
