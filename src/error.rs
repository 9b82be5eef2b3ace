//! Error types for the `framewise` crate.
//!
//! This module defines [`FramewiseError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry the context needed to
//! diagnose a failure (file paths, frame indices, timeouts, tool output)
//! without extra logging at the call site.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use base64::DecodeError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `framewise` operations.
///
/// Variants fall into three classes, queryable through
/// [`is_probe_error`](FramewiseError::is_probe_error),
/// [`is_extraction_error`](FramewiseError::is_extraction_error) and
/// [`is_load_error`](FramewiseError::is_load_error):
///
/// - probe failures are fatal to a load,
/// - extraction failures are recoverable per frame,
/// - native surface load failures are fatal to a load.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramewiseError {
    /// The probe process could not run, exited with an error, or produced
    /// output that could not be understood.
    #[error("Failed to probe {path}: {reason}")]
    ProbeFailed {
        /// Path that was probed.
        path: PathBuf,
        /// Underlying reason the probe failed.
        reason: String,
    },

    /// The container does not contain a video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path that was probed.
        path: PathBuf,
    },

    /// The decode process exited unsuccessfully or emitted no image bytes.
    #[error("Failed to extract frame {frame_index}: {reason}")]
    ExtractionFailed {
        /// The frame that was requested.
        frame_index: u64,
        /// Underlying reason (exit status, stderr excerpt, spawn error).
        reason: String,
    },

    /// The decode process did not finish within the configured timeout and
    /// was terminated.
    #[error("Extraction of frame {frame_index} timed out after {timeout:?}")]
    ExtractionTimeout {
        /// The frame that was requested.
        frame_index: u64,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The native playback surface did not report readiness in time.
    #[error("Playback surface did not become ready within {0:?}")]
    LoadTimeout(Duration),

    /// The native playback surface reported an error.
    #[error("Playback surface error: {0}")]
    SurfaceError(String),

    /// A navigation command was issued while no media is loaded.
    #[error("No media loaded")]
    NoMediaLoaded,

    /// The requested frame index is past the end of the video.
    #[error("Frame {frame_index} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame index that was requested.
        frame_index: u64,
        /// Total number of frames in the video.
        total_frames: u64,
    },

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while decoding or saving a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// Probe output was not valid JSON.
    #[error("Malformed probe output: {0}")]
    JsonError(#[from] JsonError),

    /// A frame's transport encoding could not be decoded.
    #[error("Invalid frame encoding: {0}")]
    DecodeError(#[from] DecodeError),
}

impl FramewiseError {
    /// Returns `true` for failures of the metadata probe.
    pub fn is_probe_error(&self) -> bool {
        matches!(
            self,
            FramewiseError::ProbeFailed { .. }
                | FramewiseError::NoVideoStream { .. }
                | FramewiseError::JsonError(_)
        )
    }

    /// Returns `true` for per-frame extraction failures.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            FramewiseError::ExtractionFailed { .. } | FramewiseError::ExtractionTimeout { .. }
        )
    }

    /// Returns `true` for native surface load failures.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            FramewiseError::LoadTimeout(_) | FramewiseError::SurfaceError(_)
        )
    }
}
