//! The frame capture engine.
//!
//! Populates the `thumbnail` field of every scene in an ordered list,
//! one shared [`FrameSource`] driven strictly sequentially: resolve the
//! scene timestamp, seek, wait for the seek to settle, encode the decoded
//! frame as a JPEG data URL, then publish a progress snapshot. The next
//! seek is never issued before the current one settles.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use tracing::{debug, warn};

use storylens_models::timestamp::resolve_offset;
use storylens_models::Scene;

use crate::error::{MediaError, MediaResult};
use crate::probe::MediaMetadata;
use crate::source::FrameSource;

/// JPEG quality for captured thumbnails.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Capture a thumbnail for every scene, in ascending index order.
///
/// `on_progress` is invoked exactly once per scene with a defensive copy
/// of the full scene list, so consumers can reveal thumbnails as they
/// resolve instead of waiting for the batch.
///
/// A scene whose capture fails is logged and left without a thumbnail;
/// the remaining scenes are still attempted. Scenes that already carry a
/// thumbnail are skipped untouched, so re-invocation alters no field.
/// Only a resource-level failure (metadata never becomes ready) aborts
/// the run.
pub async fn capture_thumbnails<S, F>(
    scenes: &mut [Scene],
    source: &mut S,
    mut on_progress: F,
) -> MediaResult<()>
where
    S: FrameSource + ?Sized,
    F: FnMut(Vec<Scene>),
{
    // One-time wait for duration and native dimensions.
    let meta = source.metadata().await?;

    for index in 0..scenes.len() {
        if scenes[index].thumbnail.is_some() {
            debug!(scene = index, "thumbnail already present, skipping");
        } else {
            match capture_scene(&scenes[index].timestamp, &meta, source).await {
                Ok(data_url) => {
                    debug!(scene = index, "captured thumbnail");
                    scenes[index].thumbnail = Some(data_url);
                }
                Err(e) => {
                    warn!(scene = index, error = %e, "thumbnail capture failed, continuing");
                }
            }
        }

        on_progress(scenes.to_vec());
    }

    Ok(())
}

async fn capture_scene<S>(
    timestamp: &str,
    meta: &MediaMetadata,
    source: &mut S,
) -> MediaResult<String>
where
    S: FrameSource + ?Sized,
{
    let offset = resolve_offset(timestamp, Some(meta.duration))?;
    source.seek_to(offset).await?;
    let frame = source.current_frame()?;
    encode_thumbnail(frame, meta, THUMBNAIL_JPEG_QUALITY)
}

/// Encode a decoded frame as a `data:image/jpeg;base64,` URL.
///
/// The raster is sized to the resource's native dimensions, falling back
/// to the frame's own dimensions when the reported value is zero.
fn encode_thumbnail(
    frame: &RgbImage,
    meta: &MediaMetadata,
    quality: u8,
) -> MediaResult<String> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(MediaError::EmptyFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }

    let (target_w, target_h) = if meta.width == 0 || meta.height == 0 {
        (frame.width(), frame.height())
    } else {
        (meta.width, meta.height)
    };

    let scaled;
    let raster: &RgbImage = if (frame.width(), frame.height()) != (target_w, target_h) {
        scaled = image::imageops::resize(frame, target_w, target_h, FilterType::Triangle);
        &scaled
    } else {
        frame
    };

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode(raster.as_raw(), target_w, target_h, image::ColorType::Rgb8)
        .map_err(|e| MediaError::frame_encode(e.to_string()))?;

    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes)))
}
