//! The decode resource: one owned handle over a video source.
//!
//! A [`FrameSource`] can report metadata, seek to an offset, and expose
//! the currently decoded frame. All calls go through `&mut self`, so
//! overlapping seeks against one handle are impossible by construction;
//! the capture loop and the display player each own a separate instance
//! bound to the same file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_media, MediaMetadata};

/// Default per-seek timeout for the FFmpeg-backed source.
const DEFAULT_SEEK_TIMEOUT_SECS: u64 = 30;

/// Abstraction over a seekable video decode resource.
#[async_trait]
pub trait FrameSource: Send {
    /// Resolve the source's metadata.
    ///
    /// The first call may suspend until the metadata is ready; later
    /// calls answer from cache.
    async fn metadata(&mut self) -> MediaResult<MediaMetadata>;

    /// Seek to `offset_secs`, returning once the frame at that offset is
    /// decoded and available via [`current_frame`](Self::current_frame).
    async fn seek_to(&mut self, offset_secs: f64) -> MediaResult<()>;

    /// The currently decoded frame. Fails with
    /// [`MediaError::NoFrameDecoded`] before the first settled seek.
    fn current_frame(&self) -> MediaResult<&RgbImage>;

    /// Offset of the last settled seek, in seconds.
    fn position(&self) -> f64;
}

/// FFmpeg-backed [`FrameSource`].
///
/// Each seek extracts a single PNG frame via the FFmpeg CLI and decodes
/// it in memory. Seek precision is decoder-dependent, which is fine for
/// thumbnail work.
#[derive(Debug)]
pub struct FfmpegFrameSource {
    source: PathBuf,
    seek_timeout_secs: u64,
    metadata: Option<MediaMetadata>,
    frame: Option<RgbImage>,
    position: f64,
}

impl FfmpegFrameSource {
    /// Bind a new source to a video file.
    ///
    /// The file is not touched until the first `metadata` or `seek_to`
    /// call.
    pub fn new(source: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            seek_timeout_secs: DEFAULT_SEEK_TIMEOUT_SECS,
            metadata: None,
            frame: None,
            position: 0.0,
        }
    }

    /// Override the per-seek timeout.
    pub fn with_seek_timeout(mut self, secs: u64) -> Self {
        self.seek_timeout_secs = secs;
        self
    }

    /// Path of the bound video file.
    pub fn source_path(&self) -> &Path {
        &self.source
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn metadata(&mut self) -> MediaResult<MediaMetadata> {
        if let Some(meta) = self.metadata {
            return Ok(meta);
        }

        let meta = probe_media(&self.source).await?;
        debug!(
            duration = meta.duration,
            width = meta.width,
            height = meta.height,
            "probed {}",
            self.source.display()
        );
        self.metadata = Some(meta);
        Ok(meta)
    }

    async fn seek_to(&mut self, offset_secs: f64) -> MediaResult<()> {
        let cmd = FfmpegCommand::frame_at(&self.source, offset_secs);
        let bytes = FfmpegRunner::new()
            .with_timeout(self.seek_timeout_secs)
            .run(&cmd)
            .await?;

        if bytes.is_empty() {
            return Err(MediaError::frame_decode(format!(
                "no frame data at {:.3}s",
                offset_secs
            )));
        }

        let frame = image::load_from_memory(&bytes)
            .map_err(|e| MediaError::frame_decode(e.to_string()))?
            .to_rgb8();

        self.frame = Some(frame);
        self.position = offset_secs;
        Ok(())
    }

    fn current_frame(&self) -> MediaResult<&RgbImage> {
        self.frame.as_ref().ok_or(MediaError::NoFrameDecoded)
    }

    fn position(&self) -> f64 {
        self.position
    }
}
