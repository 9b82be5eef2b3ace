//! Frame timing metadata.
//!
//! [`FrameTimingDescriptor`] is the single, normalized view of a container's
//! video stream that every other component works from. It is produced once
//! by [`MediaProbe`](crate::MediaProbe) and never mutated afterwards.

use serde::Serialize;

use crate::utilities::{frame_index_to_seconds, seconds_to_frame_index, total_frame_count};

/// Authoritative frame timing for one video stream.
///
/// # Example
///
/// ```no_run
/// use framewise::{ExtractOptions, MediaProbe};
///
/// # async fn example() -> Result<(), framewise::FramewiseError> {
/// let descriptor = MediaProbe::new(ExtractOptions::new()).probe("input.mp4").await?;
/// println!(
///     "{}x{} @ {} fps, {} frames",
///     descriptor.width, descriptor.height, descriptor.frame_rate, descriptor.total_frames,
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct FrameTimingDescriptor {
    /// Frames per second, rounded to three decimals. Always positive.
    pub frame_rate: f64,
    /// Duration in seconds. Zero when neither the stream nor the container
    /// states one.
    pub duration: f64,
    /// `floor(frame_rate * duration)`. Zero means the length is unknown, not
    /// that the video is empty.
    pub total_frames: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// `true` when the stream's nominal rate string differs from its average
    /// rate string. A coarse indicator used for advisory warnings only.
    pub variable_frame_rate: bool,
    /// Container bit rate in bits per second, zero if unknown.
    pub bit_rate: u64,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

impl FrameTimingDescriptor {
    /// Build a descriptor from a resolved rate and duration, deriving the
    /// frame count.
    pub fn new(frame_rate: f64, duration: f64) -> Self {
        Self {
            frame_rate,
            duration,
            total_frames: total_frame_count(frame_rate, duration),
            width: 0,
            height: 0,
            codec: String::new(),
            variable_frame_rate: false,
            bit_rate: 0,
            format: String::new(),
        }
    }

    /// Timestamp of `frame_index` in seconds.
    pub fn timestamp_of(&self, frame_index: u64) -> f64 {
        frame_index_to_seconds(frame_index, self.frame_rate)
    }

    /// Nearest frame index to `seconds`, not clamped to the video length.
    pub fn frame_at(&self, seconds: f64) -> u64 {
        seconds_to_frame_index(seconds, self.frame_rate)
    }

    /// Whether the frame count is known.
    pub fn has_known_length(&self) -> bool {
        self.total_frames > 0
    }

    /// Index of the final frame, if the length is known.
    pub fn last_frame(&self) -> Option<u64> {
        self.total_frames.checked_sub(1)
    }

    /// Clamp `frame_index` to the valid range. With an unknown length only
    /// the lower bound applies.
    pub fn clamp_frame(&self, frame_index: i128) -> u64 {
        let lower = frame_index.max(0);
        match self.last_frame() {
            Some(last) => lower.min(last as i128) as u64,
            None => lower.min(u64::MAX as i128) as u64,
        }
    }
}
