//! FFmpeg CLI wrapper and frame capture for StoryLens.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with stdout capture
//! - FFprobe metadata (duration, dimensions, frame rate)
//! - The [`FrameSource`] decode-resource abstraction and its
//!   FFmpeg-backed implementation
//! - The frame capture engine that populates scene thumbnails
//!   sequentially, publishing progress after each scene

pub mod capture;
pub mod command;
pub mod error;
pub mod probe;
pub mod source;

pub use capture::{capture_thumbnails, THUMBNAIL_JPEG_QUALITY};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaMetadata};
pub use source::{FfmpegFrameSource, FrameSource};
