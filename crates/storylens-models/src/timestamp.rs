//! Timestamp parsing and seek-offset resolution.
//!
//! The analysis contract only speaks `MM:SS` and `HH:MM:SS`; anything
//! else is rejected. The same resolver backs both thumbnail capture and
//! user-initiated jump-to-scene seeks.

use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("malformed timestamp '{0}': expected MM:SS or HH:MM:SS")]
    Malformed(String),
}

/// Parse a clock timestamp to total seconds.
///
/// Supports `MM:SS` and `HH:MM:SS`. Hour and minute components must be
/// non-negative integers; the seconds component may carry a fractional
/// part.
///
/// # Examples
/// ```
/// use storylens_models::timestamp::parse_clock_timestamp;
/// assert_eq!(parse_clock_timestamp("02:05").unwrap(), 125.0);
/// assert_eq!(parse_clock_timestamp("01:00:00").unwrap(), 3600.0);
/// ```
pub fn parse_clock_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let trimmed = ts.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();

    let (hours, minutes, seconds) = match parts.len() {
        2 => (0u32, parse_int(trimmed, parts[0])?, parse_secs(trimmed, parts[1])?),
        3 => (
            parse_int(trimmed, parts[0])?,
            parse_int(trimmed, parts[1])?,
            parse_secs(trimmed, parts[2])?,
        ),
        _ => return Err(TimestampError::Malformed(trimmed.to_string())),
    };

    Ok(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}

/// Resolve a timestamp into a playback offset, clamped to the media
/// duration when one is known.
///
/// An offset at or past the end of the stream is pulled back to
/// `max(0, duration - 0.5)` so an outro timestamp equal to the total
/// duration still lands on a decodable frame.
///
/// # Examples
/// ```
/// use storylens_models::timestamp::resolve_offset;
/// assert_eq!(resolve_offset("00:05", Some(10.0)).unwrap(), 5.0);
/// assert_eq!(resolve_offset("00:10", Some(10.0)).unwrap(), 9.5);
/// ```
pub fn resolve_offset(ts: &str, media_duration: Option<f64>) -> Result<f64, TimestampError> {
    let seconds = parse_clock_timestamp(ts)?;

    if let Some(duration) = media_duration {
        if seconds >= duration {
            return Ok((duration - 0.5).max(0.0));
        }
    }

    Ok(seconds)
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` past the one-hour mark.
pub fn format_seconds(total_secs: f64) -> String {
    let total = total_secs.max(0.0);
    let hours = (total / 3600.0).floor() as u32;
    let mins = ((total % 3600.0) / 60.0).floor() as u32;
    let secs = (total % 60.0).floor() as u32;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

fn parse_int(whole: &str, component: &str) -> Result<u32, TimestampError> {
    component
        .trim()
        .parse::<u32>()
        .map_err(|_| TimestampError::Malformed(whole.to_string()))
}

fn parse_secs(whole: &str, component: &str) -> Result<f64, TimestampError> {
    let secs: f64 = component
        .trim()
        .parse()
        .map_err(|_| TimestampError::Malformed(whole.to_string()))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(TimestampError::Malformed(whole.to_string()));
    }
    Ok(secs)
}
