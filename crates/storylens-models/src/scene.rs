//! Storyboard data models.
//!
//! These types mirror the JSON schema the analysis service is instructed
//! to return, so field names on the wire are camelCase.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single shot/segment of the analyzed clip.
///
/// All descriptive fields are populated by the analysis service; only
/// `thumbnail` is filled in locally by the capture engine, and once set it
/// is never cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Scene start, `MM:SS` or `HH:MM:SS`
    pub timestamp: String,

    /// Display-only duration label (e.g. "3.2s"); never used in seek math
    #[serde(rename = "duration")]
    pub duration_label: String,

    /// Shot framing (e.g. "Medium Close Up")
    pub shot_type: String,

    /// Camera movement (e.g. "Handheld Tracking" or "Static")
    pub camera_movement: String,

    /// Visual layout and color palette
    pub description: String,

    /// What is physically happening in the shot
    pub action: String,

    /// Lighting direction and temperature
    pub lighting: String,

    /// On-screen text, captions, or spoken dialogue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<String>,

    /// Prompt for AI video generators to recreate this shot
    pub reproduction_prompt: String,

    /// JPEG data URL captured from the clip; absent until capture runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// The full analysis result for one clip.
///
/// Scene order is significant: the analysis contract puts the intro at
/// index 0 and the outro at the last index, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Storyboard {
    /// Short title for the clip
    pub title: String,

    /// Concise summary of the visual narrative
    pub summary: String,

    /// Chronologically ordered scenes
    pub scenes: Vec<Scene>,
}

impl Storyboard {
    /// Number of scenes in the storyboard.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the scene at `index` is the intro (always index 0).
    pub fn is_intro(&self, index: usize) -> bool {
        index == 0 && !self.scenes.is_empty()
    }

    /// Whether the scene at `index` is the outro (always the last index).
    pub fn is_outro(&self, index: usize) -> bool {
        !self.scenes.is_empty() && index + 1 == self.scenes.len()
    }

    /// True once every scene has a captured thumbnail.
    pub fn thumbnails_complete(&self) -> bool {
        self.scenes.iter().all(|s| s.thumbnail.is_some())
    }
}
