//! Integration tests for the lifecycle event router

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use web_witness::{
    ArtifactKind, AttachmentSink, Config, ConsoleEntry, ConsoleLevel, DriverSession, FailureCause,
    MockRecorder, RunObserver, SinkError, TestExecution, TestStatus,
};

/// Sink that records every attachment it receives
#[derive(Clone, Default)]
struct CountingSink {
    events: Arc<Mutex<Vec<(String, ArtifactKind)>>>,
}

impl CountingSink {
    fn labels(&self) -> Vec<(String, ArtifactKind)> {
        self.events.lock().unwrap().clone()
    }
}

impl AttachmentSink for CountingSink {
    fn attach(&self, label: &str, kind: ArtifactKind, _payload: &[u8]) -> Result<(), SinkError> {
        self.events.lock().unwrap().push((label.to_string(), kind));
        Ok(())
    }
}

/// Driver stub with a scripted console buffer and a real PNG screenshot
struct StubDriver {
    entries: Vec<ConsoleEntry>,
}

impl DriverSession for StubDriver {
    fn screenshot_png(&mut self) -> Result<Vec<u8>, String> {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .map_err(|e| e.to_string())?;
        Ok(bytes)
    }

    fn console_entries(&mut self) -> Result<Vec<ConsoleEntry>, String> {
        Ok(self.entries.clone())
    }

    fn quit(&mut self) {}
}

fn test_config(root: &Path, headless: bool) -> Config {
    let mut config = Config::defaults();
    config.capture.results_dir = root.join("results").to_string_lossy().to_string();
    config.capture.report_dir = root.join("report").to_string_lossy().to_string();
    config.target.headless = headless;
    config
}

fn execution(name: &str, status: TestStatus, failure: Option<FailureCause>) -> TestExecution {
    TestExecution {
        name: name.to_string(),
        class_name: "LoginTest".to_string(),
        suite: "smoke".to_string(),
        host: None,
        status,
        failure,
        started_ms: 1_700_000_000_000,
        ended_ms: 1_700_000_004_000,
        parameters: vec![],
        messages: vec![],
    }
}

fn dir_file_count(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_passing_test_leaves_no_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let sink = CountingSink::default();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(sink.clone()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("smoke", 1);
    observer.on_test_start("login");
    assert!(observer.is_recording());

    observer.on_test_success(&execution("login", TestStatus::Passed, None));
    assert!(!observer.is_recording());

    let results = root.path().join("results");
    assert_eq!(dir_file_count(&results.join("screenshots")), 0);
    assert_eq!(dir_file_count(&results.join("logs")), 0);
    assert_eq!(dir_file_count(&results.join("videos")), 0);
    assert!(sink.labels().is_empty());

    let summary = observer.on_suite_finish();
    assert_eq!(summary.passed, 1);
}

#[test]
fn test_failing_test_retains_all_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let sink = CountingSink::default();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(sink.clone()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("smoke", 1);
    observer.on_test_start("checkout");

    let mut driver = StubDriver {
        entries: vec![
            ConsoleEntry::new(ConsoleLevel::Severe, "uncaught TypeError", 1_700_000_001_000),
            ConsoleEntry::new(ConsoleLevel::Warning, "deprecated API", 1_700_000_002_000),
        ],
    };
    let failure = FailureCause::new("AssertionError", "cart total mismatch");
    observer.on_test_failure(
        &execution("checkout", TestStatus::Failed, Some(failure)),
        Some(&mut driver),
    );

    let results = root.path().join("results");
    assert_eq!(dir_file_count(&results.join("screenshots")), 1);
    // browser log + execution log + failure details
    assert_eq!(dir_file_count(&results.join("logs")), 3);
    assert_eq!(dir_file_count(&results.join("videos")), 1);

    let labels = sink.labels();
    assert_eq!(labels.len(), 5);
    assert!(labels.iter().any(|(l, k)| l.starts_with("Screenshot") && *k == ArtifactKind::Png));
    assert!(labels.iter().any(|(l, k)| l.starts_with("Video") && *k == ArtifactKind::Video));

    // Console log summary counts are exact
    let browser_log = fs::read_dir(results.join("logs"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.file_name().unwrap().to_string_lossy().contains("_browser_"))
        .expect("browser log written");
    let text = fs::read_to_string(browser_log).unwrap();
    assert!(text.contains("Total Logs: 2"));
    assert!(text.contains("Errors: 1"));
    assert!(text.contains("Warnings: 1"));
    assert!(text.contains("Info: 0"));

    assert_eq!(observer.on_suite_finish().failed, 1);
}

#[test]
fn test_failure_without_driver_still_captures_execution_log_and_video() {
    let root = tempfile::tempdir().unwrap();
    let sink = CountingSink::default();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(sink.clone()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("smoke", 1);
    observer.on_test_start("search");
    observer.on_test_failure(
        &execution(
            "search",
            TestStatus::Failed,
            Some(FailureCause::new("TimeoutError", "results never loaded")),
        ),
        None,
    );

    let results = root.path().join("results");
    assert_eq!(dir_file_count(&results.join("screenshots")), 0);
    // execution log + failure details, no browser log
    assert_eq!(dir_file_count(&results.join("logs")), 2);
    assert_eq!(dir_file_count(&results.join("videos")), 1);
    assert!(!observer.is_recording());
}

#[test]
fn test_broken_skip_treated_like_failure() {
    let root = tempfile::tempdir().unwrap();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(CountingSink::default()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("smoke", 2);

    observer.on_test_start("broken_setup");
    let cause = FailureCause::new("SessionError", "driver not created");
    observer.on_test_skip(
        &execution("broken_setup", TestStatus::Skipped, Some(cause)),
        None,
    );

    observer.on_test_start("deliberate_skip");
    observer.on_test_skip(&execution("deliberate_skip", TestStatus::Skipped, None), None);

    let results = root.path().join("results");
    // Only the broken skip keeps its video
    assert_eq!(dir_file_count(&results.join("videos")), 1);
    assert_eq!(observer.summary().skipped, 2);
}

#[test]
fn test_headless_suite_never_starts_recording() {
    let root = tempfile::tempdir().unwrap();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), true),
        Box::new(CountingSink::default()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("smoke", 3);
    assert!(observer.is_headless());

    for (name, status) in [
        ("a", TestStatus::Passed),
        ("b", TestStatus::Failed),
        ("c", TestStatus::Skipped),
    ] {
        observer.on_test_start(name);
        assert!(!observer.is_recording());
        match status {
            TestStatus::Passed => observer.on_test_success(&execution(name, status, None)),
            TestStatus::Failed => observer.on_test_failure(
                &execution(name, status, Some(FailureCause::new("E", "boom"))),
                None,
            ),
            TestStatus::Skipped => observer.on_test_skip(&execution(name, status, None), None),
        }
    }

    assert_eq!(dir_file_count(&root.path().join("results").join("videos")), 0);
}

#[test]
fn test_broken_capture_stack_still_reports_correct_summary() {
    let root = tempfile::tempdir().unwrap();

    /// Driver whose every capability fails
    struct DeadDriver;
    impl DriverSession for DeadDriver {
        fn screenshot_png(&mut self) -> Result<Vec<u8>, String> {
            Err("session terminated".to_string())
        }
        fn console_entries(&mut self) -> Result<Vec<ConsoleEntry>, String> {
            Err("log buffer unavailable".to_string())
        }
        fn quit(&mut self) {}
    }

    /// Sink that rejects every payload
    struct RejectingSink;
    impl AttachmentSink for RejectingSink {
        fn attach(&self, _: &str, _: ArtifactKind, _: &[u8]) -> Result<(), SinkError> {
            Err(SinkError::new("report backend down"))
        }
    }

    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(RejectingSink),
        Box::new(MockRecorder::failing()),
    );

    observer.on_suite_start("smoke", 2);

    observer.on_test_start("first");
    observer.on_test_failure(
        &execution("first", TestStatus::Failed, Some(FailureCause::new("E", "x"))),
        Some(&mut DeadDriver),
    );

    observer.on_test_start("second");
    observer.on_test_success(&execution("second", TestStatus::Passed, None));

    let summary = observer.on_suite_finish();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.total(), 2);
}

#[test]
fn test_suite_start_writes_environment_snapshot() {
    let root = tempfile::tempdir().unwrap();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(CountingSink::default()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("regression", 12);

    let properties = root.path().join("results").join("environment.properties");
    let text = fs::read_to_string(properties).unwrap();
    assert!(text.contains("Environment=TEST"));
    assert!(text.contains("Browser=CHROME"));
    assert!(text.contains("Suite.Name=regression"));
    assert!(text.contains("Total.Tests=12"));
}

#[test]
fn test_suite_finish_places_history_marker() {
    let root = tempfile::tempdir().unwrap();
    let mut observer = RunObserver::with_backend(
        test_config(root.path(), false),
        Box::new(CountingSink::default()),
        Box::new(MockRecorder::new()),
    );

    observer.on_suite_start("smoke", 0);
    observer.on_suite_finish();

    let marker = root
        .path()
        .join("results")
        .join("history")
        .join("history-marker.txt");
    assert!(marker.is_file());
}
