//! Capture policy decisions.
//!
//! Maps a raw test outcome to one of three capture policies. The mapping is
//! a pure function over the status and the presence of a failure cause; it
//! is recomputed for every test and holds no state.

use serde::{Deserialize, Serialize};

use crate::model::{FailureCause, TestStatus};

/// What to capture and retain for a finished test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturePolicy {
    /// Keep everything: screenshot, logs, and the recorded video
    CaptureAndRetain,

    /// Video was recorded but is deleted; nothing else is captured
    RecordOnlyDiscardOnSuccess,

    /// No recording and no artifacts
    SkipCapture,
}

impl CapturePolicy {
    /// Adjust the policy for a headless suite, where there is no display
    /// surface and no recording was ever started.
    ///
    /// `RecordOnlyDiscardOnSuccess` becomes `SkipCapture` (there is nothing
    /// to discard); `CaptureAndRetain` is kept, since screenshots and logs
    /// still apply.
    pub fn for_headless(self) -> CapturePolicy {
        match self {
            CapturePolicy::RecordOnlyDiscardOnSuccess => CapturePolicy::SkipCapture,
            other => other,
        }
    }
}

/// Classify a test outcome into a capture policy.
///
/// Failed tests and tests skipped because of an exception ("broken" tests)
/// retain everything; passing and cleanly skipped tests only discard their
/// recording.
pub fn classify(status: TestStatus, failure: Option<&FailureCause>) -> CapturePolicy {
    match (status, failure) {
        (TestStatus::Failed, _) => CapturePolicy::CaptureAndRetain,
        (TestStatus::Skipped, Some(_)) => CapturePolicy::CaptureAndRetain,
        (TestStatus::Skipped, None) => CapturePolicy::RecordOnlyDiscardOnSuccess,
        (TestStatus::Passed, _) => CapturePolicy::RecordOnlyDiscardOnSuccess,
    }
}
