//! Engine error types.

use thiserror::Error;

use storylens_media::MediaError;
use storylens_models::timestamp::TimestampError;
use storylens_models::MAX_UPLOAD_BYTES;

pub type EngineResult<T> = Result<T, EngineError>;

/// Fallback shown to the user when a failure carries no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "The AI analysis failed. This could be due to video length or formatting.";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no clip selected")]
    NoClipSelected,

    #[error("clip is {size} bytes, over the {limit} byte upload limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("an analysis run is already in flight")]
    RunAlreadyInFlight,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read clip: {0}")]
    Transport(String),

    // External analysis failures surface verbatim with the service's message.
    #[error("{0}")]
    External(String),

    #[error("the analysis service returned an empty storyboard")]
    EmptyResponse,

    #[error("thumbnail capture failed: {0}")]
    Capture(#[from] MediaError),

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::External(msg.into())
    }

    /// Create a `FileTooLarge` error against the configured upload cap.
    pub fn file_too_large(size: u64) -> Self {
        Self::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        }
    }

    /// Human-readable message for the presentation layer.
    ///
    /// Defaults to a generic explanation when the failure carries no
    /// message of its own.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_message_surfaces_verbatim() {
        let err = EngineError::external("quota exceeded");
        assert_eq!(err.user_message(), "quota exceeded");
    }

    #[test]
    fn test_blank_message_falls_back_to_generic() {
        let err = EngineError::external("  ");
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_file_too_large_names_the_limit() {
        let err = EngineError::file_too_large(MAX_UPLOAD_BYTES + 1);
        assert!(err.user_message().contains("157286400"));
    }
}
