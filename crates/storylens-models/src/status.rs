//! Analysis status and observable snapshots.
//!
//! The orchestrator owns one [`AnalysisSnapshot`] per session and
//! republishes it on every state transition and every capture progress
//! tick. Consumers render from the latest snapshot only.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scene::{Scene, Storyboard};

/// Analysis run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// No run in flight; a clip may or may not be bound
    #[default]
    Idle,
    /// Clip is being encoded and analyzed by the external service
    Analyzing,
    /// Thumbnails are being captured scene by scene
    Capturing,
    /// Run completed successfully
    Success,
    /// Run failed; see the snapshot's error message
    Error,
}

impl AnalysisStatus {
    /// String representation for display and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Capturing => "capturing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// True for states that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// True while a run is in flight; a new submit is rejected here.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Analyzing | Self::Capturing)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable session state.
///
/// `event_seq` increases monotonically with every publication so
/// consumers can order updates; partial results survive a failure for
/// inspection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisSnapshot {
    /// Current run status
    pub status: AnalysisStatus,
    /// Analysis result, present from the moment the external call
    /// resolves; scenes gain thumbnails while `Capturing`
    pub result: Option<Storyboard>,
    /// Human-readable failure message when `status` is `Error`
    pub error_message: Option<String>,
    /// When the snapshot was last updated
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing publication counter
    pub event_seq: u64,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

impl AnalysisSnapshot {
    /// Fresh idle snapshot.
    pub fn idle() -> Self {
        Self {
            status: AnalysisStatus::Idle,
            result: None,
            error_message: None,
            updated_at: Utc::now(),
            event_seq: 0,
        }
    }

    /// Discard any prior result or error and return to `Idle`.
    pub fn clear(&mut self) {
        self.status = AnalysisStatus::Idle;
        self.result = None;
        self.error_message = None;
        self.touch();
    }

    /// Enter `Analyzing`, clearing any stale error.
    pub fn begin_analyzing(&mut self) {
        self.status = AnalysisStatus::Analyzing;
        self.error_message = None;
        self.touch();
    }

    /// Store the external analysis result and enter `Capturing`.
    pub fn begin_capturing(&mut self, result: Storyboard) {
        self.status = AnalysisStatus::Capturing;
        self.result = Some(result);
        self.touch();
    }

    /// Replace the scene list with a capture progress snapshot.
    ///
    /// No-op when no result has been stored yet.
    pub fn update_scenes(&mut self, scenes: Vec<Scene>) {
        if let Some(result) = self.result.as_mut() {
            result.scenes = scenes;
        }
        self.touch();
    }

    /// Mark the run as completed.
    pub fn complete(&mut self) {
        self.status = AnalysisStatus::Success;
        self.touch();
    }

    /// Mark the run as failed, keeping any partial result.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = AnalysisStatus::Error;
        self.error_message = Some(message.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.event_seq += 1;
    }
}
