//! Shared conversion helpers.
//!
//! Frame/time conversion and rounding logic that does not belong in any
//! single public module.

use std::path::Path;

/// Container extensions the navigator is expected to open.
///
/// Advisory only; nothing in the crate refuses other extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "wmv", "flv", "m4v"];

/// Returns `true` if `path` ends in one of [`SUPPORTED_EXTENSIONS`]
/// (case-insensitive).
pub fn is_supported_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(extension))
        })
}

/// Round to three decimal places.
pub fn round_to_millis(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Presentation timestamp of `frame_index`, in seconds.
pub fn frame_index_to_seconds(frame_index: u64, frame_rate: f64) -> f64 {
    if frame_rate > 0.0 {
        frame_index as f64 / frame_rate
    } else {
        0.0
    }
}

/// Nearest frame index to `seconds`. Negative and non-finite times map to 0.
pub fn seconds_to_frame_index(seconds: f64, frame_rate: f64) -> u64 {
    let index = (seconds * frame_rate).round();
    if index.is_finite() && index > 0.0 {
        index as u64
    } else {
        0
    }
}

/// `floor(frame_rate * duration)`, never negative.
pub fn total_frame_count(frame_rate: f64, duration: f64) -> u64 {
    let frames = (frame_rate * duration).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}
