//! Lifecycle event router.
//!
//! Receives suite and test lifecycle events from the external test runner
//! and sequences the capture components according to the outcome
//! classifier's verdict. Every capture step logs its own failure and the
//! siblings still run; the router never returns an error — a broken capture
//! subsystem must never fail the test it is reporting on.
//!
//! Per-run state (current test name, active recording session) is correct
//! only for strictly sequential test execution: one test's start must fully
//! precede another's. A runner that interleaves lifecycle events across
//! threads needs per-test keying this router does not provide.

use std::path::Path;
use tracing::{error, info, warn};

use crate::capture::{Capturer, DriverSession};
use crate::config::Config;
use crate::history::{self, EnvironmentSnapshot};
use crate::model::{RunSummary, TestExecution};
use crate::policy::{classify, CapturePolicy};
use crate::recorder::{FfmpegRecorder, RecorderBackend, VideoRecorder};
use crate::store::{ArtifactStore, AttachmentSink};

/// Orchestrates artifact capture across a suite's lifecycle events
pub struct RunObserver {
    config: Config,
    store: ArtifactStore,
    recorder: VideoRecorder,
    sink: Box<dyn AttachmentSink>,
    headless: bool,
    current_test: Option<String>,
    summary: RunSummary,
}

impl RunObserver {
    /// Create an observer recording through ffmpeg on the local display
    pub fn new(config: Config, sink: Box<dyn AttachmentSink>) -> Self {
        let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string());
        let backend = Box::new(FfmpegRecorder::new(display, config.capture.video_fps));
        Self::with_backend(config, sink, backend)
    }

    /// Create an observer over a specific recorder backend
    pub fn with_backend(
        config: Config,
        sink: Box<dyn AttachmentSink>,
        backend: Box<dyn RecorderBackend>,
    ) -> Self {
        let store = ArtifactStore::new(&config.capture.results_dir);
        Self {
            config,
            store,
            recorder: VideoRecorder::new(backend),
            sink,
            headless: false,
            current_test: None,
            summary: RunSummary::default(),
        }
    }

    /// The artifact store this observer writes through
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Whether the suite was detected as headless at suite start
    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Whether a recording session is currently active
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Outcome counts reported so far
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Suite is starting: cache the headless flag, prepare the results
    /// tree, migrate prior history and write the environment snapshot.
    pub fn on_suite_start(&mut self, suite_name: &str, planned_tests: usize) {
        info!(suite = suite_name, tests = planned_tests, "suite started");

        // Checked once and cached for the whole suite
        self.headless = self.config.target.headless;
        if self.headless {
            info!("headless run, video recording disabled for the suite");
        }

        if let Err(e) = self.store.init() {
            error!(error = %e, "failed to prepare results directories");
        }

        if let Err(e) = history::migrate_history(
            Path::new(&self.config.capture.report_dir),
            self.store.results_dir(),
        ) {
            // Fresh-start history is a degraded state, not an error state
            warn!(error = %e, "history migration failed, trends start fresh");
        }

        let snapshot = EnvironmentSnapshot::gather(&self.config, suite_name, planned_tests);
        if let Err(e) = history::write_environment_snapshot(self.store.results_dir(), &snapshot) {
            warn!(error = %e, "failed to write environment snapshot");
        }
    }

    /// A test is starting: begin recording unless the suite is headless
    pub fn on_test_start(&mut self, test_name: &str) {
        info!(test = test_name, "test started");
        self.current_test = Some(test_name.to_string());
        if !self.headless {
            self.recorder.start(test_name, &self.store);
        }
    }

    /// Test passed: the recording is discarded and nothing is captured
    pub fn on_test_success(&mut self, execution: &TestExecution) {
        info!(test = %execution.name, "test passed");
        self.summary.passed += 1;
        self.dispatch(execution, None);
    }

    /// Test failed: capture screenshot, console logs, execution log, keep
    /// the video, and attach failure details.
    ///
    /// When no browser session is reachable, screenshot and console-log
    /// capture are skipped; execution log, video stop and failure details
    /// still run.
    pub fn on_test_failure(
        &mut self,
        execution: &TestExecution,
        driver: Option<&mut dyn DriverSession>,
    ) {
        warn!(test = %execution.name, "test failed");
        self.summary.failed += 1;
        self.dispatch(execution, driver);
    }

    /// Test skipped: a skip carrying a failure cause (broken setup) is
    /// treated like a failure; a clean skip like a pass.
    pub fn on_test_skip(
        &mut self,
        execution: &TestExecution,
        driver: Option<&mut dyn DriverSession>,
    ) {
        info!(
            test = %execution.name,
            broken = execution.failure.is_some(),
            "test skipped"
        );
        self.summary.skipped += 1;
        self.dispatch(execution, driver);
    }

    /// Suite finished: log the outcome counts and prepare the history
    /// directory for the next run
    pub fn on_suite_finish(&mut self) -> RunSummary {
        let summary = self.summary;
        info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "suite finished"
        );

        if let Err(e) = history::place_history_marker(self.store.results_dir()) {
            warn!(error = %e, "failed to place history marker");
        }
        summary
    }

    /// Apply the classified capture policy for a finished test
    fn dispatch(&mut self, execution: &TestExecution, driver: Option<&mut dyn DriverSession>) {
        let mut policy = classify(execution.status, execution.failure.as_ref());
        if self.headless {
            policy = policy.for_headless();
        }

        match policy {
            CapturePolicy::CaptureAndRetain => self.capture_and_retain(execution, driver),
            CapturePolicy::RecordOnlyDiscardOnSuccess => {
                self.recorder.stop(true, &self.store, self.sink.as_ref());
            }
            CapturePolicy::SkipCapture => {}
        }
        self.current_test = None;
    }

    fn capture_and_retain(
        &mut self,
        execution: &TestExecution,
        driver: Option<&mut dyn DriverSession>,
    ) {
        let capturer = Capturer::new(&self.store, self.sink.as_ref());

        match driver {
            Some(driver) => {
                if let Err(e) = capturer.capture_screenshot(driver, &execution.name) {
                    error!(test = %execution.name, error = %e, "screenshot capture failed");
                }
                if let Err(e) = capturer.capture_console_logs(driver, &execution.name) {
                    error!(test = %execution.name, error = %e, "console log capture failed");
                }
            }
            None => {
                warn!(
                    test = %execution.name,
                    "no browser session reachable, skipping screenshot and console logs"
                );
            }
        }

        if let Err(e) = capturer.capture_execution_log(execution) {
            error!(test = %execution.name, error = %e, "execution log capture failed");
        }

        self.recorder.stop(false, &self.store, self.sink.as_ref());

        if let Err(e) = capturer.capture_failure_details(execution) {
            error!(test = %execution.name, error = %e, "failure detail capture failed");
        }
    }
}

impl std::fmt::Debug for RunObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunObserver")
            .field("headless", &self.headless)
            .field("current_test", &self.current_test)
            .field("summary", &self.summary)
            .finish()
    }
}
