//! Cross-run history migration and per-run environment metadata.
//!
//! Before any test executes, trend history from the previously published
//! report is carried into the new results directory so downstream trend
//! graphs see a consistent lineage. A snapshot of environment, system and
//! suite facts is written alongside it for the reporting dashboard, and at
//! suite finish a marker guarantees a history directory exists for the next
//! run to populate.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;

/// Name of the history subdirectory under both report and results roots
const HISTORY_DIR: &str = "history";

/// Marker file written at suite finish
const MARKER_FILE: &str = "history-marker.txt";

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Error types for history operations
#[derive(Debug)]
pub enum HistoryError {
    /// I/O error with the path that failed
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::Io(path, err) => {
                write!(f, "History I/O error at {}: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Io(_, err) => Some(err),
        }
    }
}

/// Outcome of a history migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMigration {
    /// Previous history was found and copied; holds the entry count of the
    /// copied top level
    Copied(usize),

    /// No previous history exists — trend graphs start fresh. A normal
    /// outcome, not an error.
    NoPrevious,
}

/// Migrate trend history from the previous report into the results
/// directory.
///
/// If `<report_dir>/history` exists and is non-empty, any existing
/// `<results_dir>/history` is deleted and the previous history is copied
/// recursively in its place — replaced, never merged, so stale entries
/// cannot survive. Running this twice against an unchanged source yields an
/// identical destination tree.
pub fn migrate_history(report_dir: &Path, results_dir: &Path) -> HistoryResult<HistoryMigration> {
    let source = report_dir.join(HISTORY_DIR);
    let destination = results_dir.join(HISTORY_DIR);

    if !source.is_dir() || dir_entry_count(&source)? == 0 {
        debug!(source = %source.display(), "no previous history found");
        return Ok(HistoryMigration::NoPrevious);
    }

    if destination.exists() {
        fs::remove_dir_all(&destination)
            .map_err(|e| HistoryError::Io(destination.clone(), e))?;
    }
    copy_dir_recursive(&source, &destination)?;

    let copied = dir_entry_count(&destination)?;
    info!(
        source = %source.display(),
        destination = %destination.display(),
        entries = copied,
        "history migrated"
    );
    Ok(HistoryMigration::Copied(copied))
}

/// Ensure a history directory exists at the results location and write a
/// marker recording the creation time, so the next run has a directory to
/// populate even when this one produced no historical continuity.
pub fn place_history_marker(results_dir: &Path) -> HistoryResult<()> {
    let history_dir = results_dir.join(HISTORY_DIR);
    fs::create_dir_all(&history_dir).map_err(|e| HistoryError::Io(history_dir.clone(), e))?;

    let marker = history_dir.join(MARKER_FILE);
    let content = format!(
        "History marker\nCreated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    );
    fs::write(&marker, content).map_err(|e| HistoryError::Io(marker.clone(), e))?;
    debug!(path = %marker.display(), "history marker placed");
    Ok(())
}

/// Point-in-time record of run configuration and host facts, written once
/// at suite start
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    /// Environment preset name (TEST / PRE-PRODUCTION / PRODUCTION)
    pub environment: String,

    /// Target base URL
    pub base_url: String,

    /// Browser name, upper-cased for the dashboard
    pub browser: String,

    /// Headless execution flag
    pub headless: bool,

    /// Implicit wait (seconds)
    pub implicit_wait_secs: u64,

    /// Page load timeout (seconds)
    pub page_load_timeout_secs: u64,

    /// Operating system family
    pub os: String,

    /// Operating system version, best-effort
    pub os_version: String,

    /// Host machine name
    pub host: String,

    /// User the run executed as
    pub user: String,

    /// Harness version
    pub harness_version: String,

    /// Suite name
    pub suite: String,

    /// Number of tests the suite plans to run
    pub total_tests: usize,
}

impl EnvironmentSnapshot {
    /// Gather a snapshot from the run configuration and host facts
    pub fn gather(config: &Config, suite: &str, total_tests: usize) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            environment: config.target.environment.display_name().to_string(),
            base_url: config.target.base_url.clone(),
            browser: config.target.browser.to_uppercase(),
            headless: config.target.headless,
            implicit_wait_secs: config.target.implicit_wait_secs,
            page_load_timeout_secs: config.target.page_load_timeout_secs,
            os: std::env::consts::OS.to_string(),
            os_version: detect_os_version(),
            host,
            user,
            harness_version: env!("CARGO_PKG_VERSION").to_string(),
            suite: suite.to_string(),
            total_tests,
        }
    }

    /// Render the snapshot as a flat key=value document with grouped
    /// sections for the reporting dashboard
    pub fn to_properties(&self) -> String {
        let mut out = String::new();
        out.push_str("# Environment Information\n");
        out.push_str(&format!(
            "# Generated: {}\n\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));

        out.push_str(&format!("Environment={}\n", self.environment));
        out.push_str(&format!("Base.URL={}\n", self.base_url));
        out.push_str(&format!("Browser={}\n", self.browser));
        out.push_str(&format!(
            "Headless.Mode={}\n",
            if self.headless { "Yes" } else { "No" }
        ));
        out.push_str(&format!("Implicit.Wait={} seconds\n", self.implicit_wait_secs));
        out.push_str(&format!(
            "Page.Load.Timeout={} seconds\n",
            self.page_load_timeout_secs
        ));

        out.push_str("\n# System Information\n");
        out.push_str(&format!("OS={}\n", self.os));
        out.push_str(&format!("OS.Version={}\n", self.os_version));
        out.push_str(&format!("Host={}\n", self.host));
        out.push_str(&format!("User={}\n", self.user));
        out.push_str(&format!("Harness.Version={}\n", self.harness_version));

        out.push_str("\n# Test Suite Information\n");
        out.push_str(&format!("Suite.Name={}\n", self.suite));
        out.push_str(&format!("Total.Tests={}\n", self.total_tests));
        out
    }
}

/// Write the environment snapshot as `environment.properties`, overwriting
/// any prior snapshot for this run
pub fn write_environment_snapshot(
    results_dir: &Path,
    snapshot: &EnvironmentSnapshot,
) -> HistoryResult<()> {
    fs::create_dir_all(results_dir)
        .map_err(|e| HistoryError::Io(results_dir.to_path_buf(), e))?;
    let path = results_dir.join("environment.properties");
    fs::write(&path, snapshot.to_properties()).map_err(|e| HistoryError::Io(path.clone(), e))?;
    debug!(path = %path.display(), "environment snapshot written");
    Ok(())
}

/// Detect the operating system version, best-effort.
///
/// Reads the distribution release file on Linux; anything unreadable or
/// unrecognized yields "unknown" rather than an error.
fn detect_os_version() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(release) = fs::read_to_string("/etc/os-release") {
            for line in release.lines() {
                if let Some(value) = line.strip_prefix("PRETTY_NAME=") {
                    let value = value.trim_matches('"');
                    if !value.is_empty() {
                        return value.to_string();
                    }
                }
            }
        }
    }
    "unknown".to_string()
}

fn dir_entry_count(dir: &Path) -> HistoryResult<usize> {
    let entries = fs::read_dir(dir).map_err(|e| HistoryError::Io(dir.to_path_buf(), e))?;
    Ok(entries.count())
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> HistoryResult<()> {
    fs::create_dir_all(destination)
        .map_err(|e| HistoryError::Io(destination.to_path_buf(), e))?;

    let entries = fs::read_dir(source).map_err(|e| HistoryError::Io(source.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HistoryError::Io(source.to_path_buf(), e))?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        if from.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| HistoryError::Io(from.clone(), e))?;
        }
    }
    Ok(())
}
