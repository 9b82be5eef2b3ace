//! Extraction and navigation configuration.
//!
//! [`ExtractOptions`] is a builder that threads tool paths, timeouts,
//! progress callbacks, and cancellation tokens through probing and
//! extraction without polluting every function signature.
//! [`NavigatorOptions`] configures the cache, prefetching, and stepping
//! behaviour of a [`Navigator`](crate::Navigator).
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use framewise::{CancellationToken, ExtractOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::from_env()
//!     .with_timeout(Duration::from_secs(5))
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone());
//! ```

use std::{
    env,
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    ffmpeg::FfmpegLogLevel,
    progress::{CancellationToken, NoOpProgress, ProgressCallback},
};

/// Environment variable overriding the `ffprobe` program path.
pub const FFPROBE_ENV: &str = "FRAMEWISE_FFPROBE";
/// Environment variable overriding the `ffmpeg` program path.
pub const FFMPEG_ENV: &str = "FRAMEWISE_FFMPEG";

/// Default wait before a probe or extraction process is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default coarse-seek back-off, in seconds.
pub const DEFAULT_SEEK_MARGIN: f64 = 2.0;
/// Default JPEG quality (`-q:v`; 2 is the best practical setting).
pub const DEFAULT_JPEG_QUALITY: u8 = 2;

/// Default number of frames held by the cache.
pub const DEFAULT_CACHE_SIZE: usize = 30;
/// Default prefetch distance on each side of the current frame.
pub const DEFAULT_PREFETCH_RADIUS: u64 = 3;

const MIN_PLAYBACK_RATE: f64 = 0.0625;
const MAX_PLAYBACK_RATE: f64 = 16.0;

/// Configuration for probe and extraction operations.
///
/// All fields have sensible defaults; a default-constructed value runs
/// `ffprobe`/`ffmpeg` from `PATH` with a 10 second timeout.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) ffprobe: PathBuf,
    pub(crate) ffmpeg: PathBuf,
    pub(crate) timeout: Duration,
    pub(crate) seek_margin: f64,
    pub(crate) jpeg_quality: u8,
    pub(crate) log_level: FfmpegLogLevel,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("ffprobe", &self.ffprobe)
            .field("ffmpeg", &self.ffmpeg)
            .field("timeout", &self.timeout)
            .field("seek_margin", &self.seek_margin)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("log_level", &self.log_level)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
            timeout: DEFAULT_TIMEOUT,
            seek_margin: DEFAULT_SEEK_MARGIN,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            log_level: FfmpegLogLevel::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Create default options, taking tool paths from
    /// [`FFPROBE_ENV`] and [`FFMPEG_ENV`] when they are set.
    pub fn from_env() -> Self {
        let mut options = Self::new();
        if let Some(ffprobe) = env::var_os(FFPROBE_ENV).filter(|value| !value.is_empty()) {
            options.ffprobe = PathBuf::from(ffprobe);
        }
        if let Some(ffmpeg) = env::var_os(FFMPEG_ENV).filter(|value| !value.is_empty()) {
            options.ffmpeg = PathBuf::from(ffmpeg);
        }
        options
    }

    /// Set the `ffprobe` program used for metadata probing.
    #[must_use]
    pub fn with_ffprobe<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.ffprobe = program.into();
        self
    }

    /// Set the `ffmpeg` program used for frame extraction.
    #[must_use]
    pub fn with_ffmpeg<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.ffmpeg = program.into();
        self
    }

    /// Set how long a probe or extraction process may run before it is
    /// killed.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the coarse-seek back-off in seconds. Negative and non-finite
    /// values are treated as zero.
    #[must_use]
    pub fn with_seek_margin(mut self, seconds: f64) -> Self {
        self.seek_margin = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self
    }

    /// Set the JPEG quality scale. Clamped to FFmpeg's `2..=31` range, lower
    /// is better.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(2, 31);
        self
    }

    /// Set the stderr verbosity of the spawned tools.
    #[must_use]
    pub fn with_log_level(mut self, level: FfmpegLogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Attach a progress callback for batch extraction.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, batch extraction stops and every
    /// unfinished index reports
    /// [`FramewiseError::Cancelled`](crate::FramewiseError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn seek_margin(&self) -> f64 {
        self.seek_margin
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn log_level(&self) -> FfmpegLogLevel {
        self.log_level
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// How a [`Navigator`](crate::Navigator) lands on a frame when stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStrategy {
    /// Seek the native playback surface to the frame's timestamp and capture
    /// what it presents. This is the default.
    #[default]
    NativeSeek,
    /// Decode the frame with the external extractor through the frame cache,
    /// prefetching neighbours after every step.
    Extract,
}

/// Configuration for a [`Navigator`](crate::Navigator).
#[derive(Debug, Clone)]
pub struct NavigatorOptions {
    pub(crate) cache_size: usize,
    pub(crate) prefetch_radius: u64,
    pub(crate) load_timeout: Duration,
    pub(crate) step_strategy: StepStrategy,
    pub(crate) playback_rate: f64,
    pub(crate) volume: f64,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigatorOptions {
    /// Create options with default settings: 30 cached frames, prefetch
    /// radius 3, 10 second load timeout, native seeking, rate 1.0, full volume.
    pub fn new() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
            load_timeout: DEFAULT_TIMEOUT,
            step_strategy: StepStrategy::default(),
            playback_rate: 1.0,
            volume: 1.0,
        }
    }

    /// Set the maximum number of cached frames. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size.max(1);
        self
    }

    /// Set how many frames on each side of the current one are prefetched.
    /// Zero disables prefetching.
    #[must_use]
    pub fn with_prefetch_radius(mut self, radius: u64) -> Self {
        self.prefetch_radius = radius;
        self
    }

    /// Set how long to wait for the playback surface to report readiness.
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Choose how steps land on a frame.
    #[must_use]
    pub fn with_step_strategy(mut self, strategy: StepStrategy) -> Self {
        self.step_strategy = strategy;
        self
    }

    /// Set the initial playback rate.
    #[must_use]
    pub fn with_playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = clamp_playback_rate(rate);
        self
    }

    /// Set the initial volume in `[0, 1]`.
    #[must_use]
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = clamp_volume(volume);
        self
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn prefetch_radius(&self) -> u64 {
        self.prefetch_radius
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }

    pub fn step_strategy(&self) -> StepStrategy {
        self.step_strategy
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

pub(crate) fn clamp_playback_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
    } else {
        1.0
    }
}

pub(crate) fn clamp_volume(volume: f64) -> f64 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        1.0
    }
}
