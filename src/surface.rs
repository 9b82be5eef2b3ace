//! The native continuous-playback surface.
//!
//! A [`Navigator`](crate::Navigator) does not decode or render video for
//! ordinary playback itself. It drives a platform player (a media element, a
//! hardware decoder pipeline, a GUI toolkit's video widget) through this
//! trait. The surface is owned exclusively by the navigator.

use std::{future::Future, path::Path};

use crate::error::FramewiseError;

/// A native decoder/renderer that plays video continuously and can seek.
///
/// Seeking on an already loaded source is expected to be fast and to land on
/// the frame whose presentation interval contains the requested time.
pub trait PlaybackSurface: Send {
    /// Open `path` and resolve once the surface is ready to play.
    fn load(&mut self, path: &Path) -> impl Future<Output = Result<(), FramewiseError>> + Send;

    /// Release the current source.
    fn unload(&mut self);

    /// Start or resume playback.
    fn play(&mut self) -> Result<(), FramewiseError>;

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Current media time in seconds.
    fn current_time(&self) -> f64;

    /// Seek to `seconds` and resolve once the seek has completed and the
    /// target picture is presented.
    fn seek(&mut self, seconds: f64) -> impl Future<Output = Result<(), FramewiseError>> + Send;

    /// Move the playback position without waiting for the seek to finish.
    fn set_time(&mut self, seconds: f64);

    fn set_playback_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    /// Capture the currently presented picture as JPEG bytes.
    fn capture_still(&mut self) -> Result<Vec<u8>, FramewiseError>;
}
