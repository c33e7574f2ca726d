//! Upload limits.

/// Hard cap on clip size, checked before any network use (150 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 150 * 1024 * 1024;

/// Soft guidance on clip length, folded into the analysis prompt.
/// Never enforced locally.
pub const RECOMMENDED_MAX_CLIP_SECS: u32 = 70;

/// True when a clip of `bytes` is over the upload cap.
///
/// A clip of exactly [`MAX_UPLOAD_BYTES`] is accepted.
pub fn exceeds_upload_limit(bytes: u64) -> bool {
    bytes > MAX_UPLOAD_BYTES
}
