//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use storylens_models::timestamp::TimestampError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during probing, seeking, and frame capture.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] TimestampError),

    #[error("no frame decoded yet; seek before reading the current frame")]
    NoFrameDecoded,

    #[error("decoded frame has a zero dimension ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("frame decode failed: {0}")]
    FrameDecode(String),

    #[error("frame encode failed: {0}")]
    FrameEncode(String),

    #[error("invalid video file: {0}")]
    InvalidVideo(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a frame decode failure error.
    pub fn frame_decode(message: impl Into<String>) -> Self {
        Self::FrameDecode(message.into())
    }

    /// Create a frame encode failure error.
    pub fn frame_encode(message: impl Into<String>) -> Self {
        Self::FrameEncode(message.into())
    }

    /// Create an invalid video error.
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }
}
