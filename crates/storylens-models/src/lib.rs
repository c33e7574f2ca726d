//! Shared data models for StoryLens.
//!
//! This crate provides Serde-serializable types for:
//! - Storyboard scenes and analysis results
//! - Analysis status and observable snapshots
//! - Timestamp parsing and seek-offset resolution
//! - Upload limits

pub mod limits;
pub mod scene;
pub mod status;
pub mod timestamp;

// Re-export common types
pub use limits::{exceeds_upload_limit, MAX_UPLOAD_BYTES, RECOMMENDED_MAX_CLIP_SECS};
pub use scene::{Scene, Storyboard};
pub use status::{AnalysisSnapshot, AnalysisStatus};
pub use timestamp::{format_seconds, parse_clock_timestamp, resolve_offset, TimestampError};
