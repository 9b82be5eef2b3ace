//! Frame-exact navigation.
//!
//! [`Navigator`] is the state machine behind a frame-stepping player. It owns
//! a native [`PlaybackSurface`] for ordinary playback and a still frame for
//! exact stepping, and decides per action which of the two is authoritative:
//!
//! ```text
//! Empty ──load──▶ Continuous ◀──play── Exact
//!   ▲                 │                  ▲
//!   └──close/fail─────┴──────step────────┘
//! ```
//!
//! In [`Continuous`](NavigationMode::Continuous) mode the surface drives the
//! clock and the displayed frame index is derived from its media time. In
//! [`Exact`](NavigationMode::Exact) mode the last action was a discrete step,
//! the frame index is authoritative, and a decoded still is what is shown.
//!
//! # Example
//!
//! ```no_run
//! use framewise::{ExtractOptions, Navigator, NavigatorOptions, PlaybackSurface};
//!
//! # async fn example<S: PlaybackSurface>(surface: S) -> Result<(), framewise::FramewiseError> {
//! let mut navigator = Navigator::new(surface, ExtractOptions::from_env(), NavigatorOptions::new());
//! navigator.load_video("input.mp4").await?;
//!
//! navigator.step_frame(1).await?;
//! navigator.step_frame(1).await?;
//! let state = navigator.snapshot();
//! assert!(state.is_frame_mode);
//! assert_eq!(state.current_frame, 2);
//! # Ok(())
//! # }
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use crate::{
    cache::FrameCache,
    configuration::{
        ExtractOptions, NavigatorOptions, StepStrategy, clamp_playback_rate, clamp_volume,
    },
    error::FramewiseError,
    extract::{FrameExtractor, FrameSource},
    frame::ExtractedFrame,
    metadata::FrameTimingDescriptor,
    probe::MediaProbe,
    surface::PlaybackSurface,
};

/// Which view is authoritative for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    /// No media loaded.
    #[default]
    Empty,
    /// The native surface drives time; the frame index is derived from it.
    Continuous,
    /// The last action was a discrete step; the frame index is authoritative.
    Exact,
}

/// Observable player state, as handed to a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub is_playing: bool,
    pub is_paused: bool,
    /// `true` in [`NavigationMode::Exact`].
    pub is_frame_mode: bool,
    pub current_frame: u64,
    pub total_frames: u64,
    /// Seconds.
    pub current_time: f64,
    /// Seconds.
    pub duration: f64,
    pub playback_rate: f64,
    pub volume: f64,
}

#[derive(Debug, Clone)]
struct PlayerState {
    current_frame: u64,
    mode: NavigationMode,
    playing: bool,
    playback_rate: f64,
    volume: f64,
}

impl PlayerState {
    fn new(options: &NavigatorOptions) -> Self {
        Self {
            current_frame: 0,
            mode: NavigationMode::Empty,
            playing: false,
            playback_rate: options.playback_rate,
            volume: options.volume,
        }
    }
}

#[derive(Debug, Clone)]
struct LoadedMedia {
    path: Arc<PathBuf>,
    descriptor: FrameTimingDescriptor,
}

/// Frame-exact navigation over a native playback surface.
///
/// Generic over the surface `S` and the exact-frame source `X`, which
/// defaults to the `ffmpeg`-backed [`FrameExtractor`]. Every navigation
/// command takes `&mut self`, so a step always runs to completion before the
/// next command is accepted.
pub struct Navigator<S, X = FrameExtractor> {
    surface: S,
    source: Arc<X>,
    probe: MediaProbe,
    cache: FrameCache,
    options: NavigatorOptions,
    media: Option<LoadedMedia>,
    state: PlayerState,
    display_frame: u64,
    still: Option<ExtractedFrame>,
}

impl<S: PlaybackSurface> Navigator<S, FrameExtractor> {
    /// Create a navigator that probes and extracts with the tools configured
    /// in `extract_options`.
    pub fn new(surface: S, extract_options: ExtractOptions, options: NavigatorOptions) -> Self {
        let source = FrameExtractor::new(extract_options.clone());
        Self::with_source(surface, source, MediaProbe::new(extract_options), options)
    }
}

impl<S: PlaybackSurface, X: FrameSource> Navigator<S, X> {
    /// Create a navigator with a custom exact-frame source.
    pub fn with_source(surface: S, source: X, probe: MediaProbe, options: NavigatorOptions) -> Self {
        Self {
            surface,
            source: Arc::new(source),
            probe,
            cache: FrameCache::new(options.cache_size),
            state: PlayerState::new(&options),
            options,
            media: None,
            display_frame: 0,
            still: None,
        }
    }

    pub fn mode(&self) -> NavigationMode {
        self.state.mode
    }

    pub fn descriptor(&self) -> Option<&FrameTimingDescriptor> {
        self.media.as_ref().map(|media| &media.descriptor)
    }

    pub fn path(&self) -> Option<&Path> {
        self.media.as_ref().map(|media| media.path.as_path())
    }

    /// The decoded still shown in [`NavigationMode::Exact`].
    pub fn still_frame(&self) -> Option<&ExtractedFrame> {
        self.still.as_ref()
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn options(&self) -> &NavigatorOptions {
        &self.options
    }

    fn loaded(&self) -> Result<LoadedMedia, FramewiseError> {
        self.media.clone().ok_or(FramewiseError::NoMediaLoaded)
    }

    /// Return to [`NavigationMode::Empty`], releasing the surface and
    /// discarding every cached frame.
    pub fn close(&mut self) {
        if self.media.take().is_some() {
            self.surface.unload();
            log::info!("Closed media");
        }
        self.cache.clear();
        self.state = PlayerState::new(&self.options);
        self.display_frame = 0;
        self.still = None;
    }

    /// Probe `path`, open it on the surface, and start playing.
    ///
    /// # Errors
    ///
    /// Probe failures, [`FramewiseError::LoadTimeout`], and surface errors.
    /// On failure the navigator is left in [`NavigationMode::Empty`].
    pub async fn load_video<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<FrameTimingDescriptor, FramewiseError> {
        let path = path.as_ref();
        self.close();

        let descriptor = match self.probe.probe(path).await {
            Ok(descriptor) => descriptor,
            Err(error) => {
                log::warn!("Failed to load {}: {error}", path.display());
                return Err(error);
            }
        };

        self.open_with_descriptor(path, descriptor).await
    }

    /// Open `path` on the surface using already-probed frame timing, and
    /// start playing.
    ///
    /// # Errors
    ///
    /// [`FramewiseError::LoadTimeout`] if the surface does not become ready
    /// within the configured load timeout, or the surface's own load error.
    /// On failure the navigator is left in [`NavigationMode::Empty`].
    pub async fn open_with_descriptor<P: AsRef<Path>>(
        &mut self,
        path: P,
        descriptor: FrameTimingDescriptor,
    ) -> Result<FrameTimingDescriptor, FramewiseError> {
        let path = path.as_ref();
        self.close();

        let timeout = self.options.load_timeout;
        let loaded = match tokio::time::timeout(timeout, self.surface.load(path)).await {
            Ok(result) => result,
            Err(_) => Err(FramewiseError::LoadTimeout(timeout)),
        };
        if let Err(error) = loaded {
            log::warn!("Failed to load {}: {error}", path.display());
            self.surface.unload();
            return Err(error);
        }

        self.surface.set_playback_rate(self.state.playback_rate);
        self.surface.set_volume(self.state.volume);
        self.media = Some(LoadedMedia {
            path: Arc::new(path.to_path_buf()),
            descriptor: descriptor.clone(),
        });
        self.state.mode = NavigationMode::Continuous;

        self.state.playing = match self.surface.play() {
            Ok(()) => true,
            Err(error) => {
                log::warn!("Autoplay failed, staying paused: {error}");
                false
            }
        };

        log::info!(
            "Loaded {} ({:.3} fps, {} frames{})",
            path.display(),
            descriptor.frame_rate,
            descriptor.total_frames,
            if descriptor.variable_frame_rate { ", variable frame rate" } else { "" }
        );
        Ok(descriptor)
    }

    /// Step `delta` frames from the current one and show that exact frame.
    ///
    /// Pauses playback first. The target is clamped to the video; stepping
    /// onto the frame already shown is a no-op.
    ///
    /// # Errors
    ///
    /// [`FramewiseError::NoMediaLoaded`], or the seek/capture/extraction
    /// error. A failed step leaves the current frame, the mode and the
    /// surface position unchanged.
    ///
    /// Steps are serialized by the exclusive borrow, so a step can never
    /// start while another is awaiting its seek. A caller that shares the
    /// navigator behind an async lock should drop inputs that arrive while
    /// a step holds it (e.g. with `try_lock`) instead of queueing them.
    pub async fn step_frame(&mut self, delta: i64) -> Result<(), FramewiseError> {
        let media = self.loaded()?;
        if self.surface.is_playing() {
            self.surface.pause();
        }
        self.state.playing = false;

        let current = self.current_frame(&media.descriptor);
        let target = media
            .descriptor
            .clamp_frame(i128::from(current) + i128::from(delta));
        if target == current {
            return Ok(());
        }

        self.land_on(target, &media).await
    }

    /// Seek to a fraction of the duration.
    ///
    /// While paused or in [`NavigationMode::Exact`] this lands exactly on the
    /// target frame, with the same precision as stepping. While playing it is
    /// a plain native time seek.
    pub async fn seek_to_progress(&mut self, fraction: f64) -> Result<(), FramewiseError> {
        let media = self.loaded()?;
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let time = fraction * media.descriptor.duration;
        let target = media
            .descriptor
            .clamp_frame(i128::from(media.descriptor.frame_at(time)));

        if self.state.mode == NavigationMode::Exact || !self.surface.is_playing() {
            self.state.playing = false;
            self.land_on(target, &media).await
        } else {
            self.surface.set_time(time);
            self.display_frame = target;
            Ok(())
        }
    }

    /// Resume playback, or pause it if already playing.
    pub async fn toggle_play_pause(&mut self) -> Result<(), FramewiseError> {
        self.loaded()?;
        if self.surface.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play().await
        }
    }

    /// Resume continuous playback.
    ///
    /// Leaving [`NavigationMode::Exact`] first seeks the surface to the shown
    /// frame's timestamp, so playback continues from exactly that frame.
    pub async fn play(&mut self) -> Result<(), FramewiseError> {
        let media = self.loaded()?;

        if self.state.mode == NavigationMode::Exact {
            let timestamp = media.descriptor.timestamp_of(self.state.current_frame);
            self.surface.seek(timestamp).await?;
            self.state.mode = NavigationMode::Continuous;
            self.display_frame = self.state.current_frame;
            self.still = None;
        }

        self.surface.play()?;
        self.state.playing = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.surface.pause();
        self.state.playing = false;
        if let Some(media) = &self.media {
            if self.state.mode == NavigationMode::Continuous {
                self.display_frame = self.derived_frame(&media.descriptor);
            }
        }
    }

    /// Per-render hook for continuous playback.
    ///
    /// Re-derives the displayed frame from the surface's media time and
    /// picks up play/pause changes the surface made on its own (e.g. reaching
    /// the end). The derived index is display state only; it never becomes
    /// the stepping index. Returns the frame now displayed.
    pub fn on_frame_rendered(&mut self) -> u64 {
        if let Some(media) = &self.media {
            if self.state.mode == NavigationMode::Continuous {
                self.display_frame = self.derived_frame(&media.descriptor);
                self.state.playing = self.surface.is_playing();
            }
        }
        self.displayed_frame()
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.state.playback_rate = clamp_playback_rate(rate);
        self.surface.set_playback_rate(self.state.playback_rate);
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.state.volume = clamp_volume(volume);
        self.surface.set_volume(self.state.volume);
    }

    /// Extract frame `frame_index` exactly, through the cache.
    ///
    /// Joins an extraction already in flight for the same index rather than
    /// starting a second one.
    pub async fn frame(&self, frame_index: u64) -> Result<ExtractedFrame, FramewiseError> {
        let media = self.loaded()?;
        let descriptor = &media.descriptor;
        if descriptor.has_known_length() && frame_index >= descriptor.total_frames {
            return Err(FramewiseError::FrameOutOfRange {
                frame_index,
                total_frames: descriptor.total_frames,
            });
        }

        let source = Arc::clone(&self.source);
        let path = Arc::clone(&media.path);
        let frame_rate = descriptor.frame_rate;
        self.cache
            .get_or_extract(frame_index, move |index| async move {
                source.extract_frame(&path, index, frame_rate).await
            })
            .await
    }

    /// The observable player state.
    pub fn snapshot(&self) -> PlayerSnapshot {
        let (total_frames, duration) = self
            .media
            .as_ref()
            .map(|media| (media.descriptor.total_frames, media.descriptor.duration))
            .unwrap_or((0, 0.0));

        let current_frame = self.displayed_frame();
        let current_time = match (self.state.mode, &self.media) {
            (NavigationMode::Exact, Some(media)) => media.descriptor.timestamp_of(current_frame),
            (NavigationMode::Continuous, Some(_)) => self.surface.current_time(),
            _ => 0.0,
        };

        PlayerSnapshot {
            is_playing: self.state.playing,
            is_paused: self.media.is_some() && !self.state.playing,
            is_frame_mode: self.state.mode == NavigationMode::Exact,
            current_frame,
            total_frames,
            current_time,
            duration,
            playback_rate: self.state.playback_rate,
            volume: self.state.volume,
        }
    }

    fn displayed_frame(&self) -> u64 {
        match self.state.mode {
            NavigationMode::Exact => self.state.current_frame,
            NavigationMode::Continuous => self.display_frame,
            NavigationMode::Empty => 0,
        }
    }

    fn derived_frame(&self, descriptor: &FrameTimingDescriptor) -> u64 {
        descriptor.clamp_frame(i128::from(descriptor.frame_at(self.surface.current_time())))
    }

    /// The frame a step starts from: the authoritative index in exact mode,
    /// the surface's position otherwise.
    fn current_frame(&self, descriptor: &FrameTimingDescriptor) -> u64 {
        match self.state.mode {
            NavigationMode::Exact => self.state.current_frame,
            _ => self.derived_frame(descriptor),
        }
    }

    async fn land_on(&mut self, target: u64, media: &LoadedMedia) -> Result<(), FramewiseError> {
        let previous_time = self.surface.current_time();
        match self.present(target, media).await {
            Ok(frame) => {
                self.state.current_frame = target;
                self.state.mode = NavigationMode::Exact;
                self.display_frame = target;
                self.still = Some(frame);

                if self.options.step_strategy == StepStrategy::Extract {
                    self.prefetch_around(target, media);
                }
                Ok(())
            }
            Err(error) => {
                log::warn!("Step to frame {target} failed: {error}");
                // A seek may have landed before the capture failed.
                if self.surface.current_time() != previous_time {
                    self.surface.set_time(previous_time);
                }
                Err(error)
            }
        }
    }

    /// Produce the still for `target` and bring the surface to its timestamp.
    async fn present(
        &mut self,
        target: u64,
        media: &LoadedMedia,
    ) -> Result<ExtractedFrame, FramewiseError> {
        let frame_rate = media.descriptor.frame_rate;
        let timestamp = media.descriptor.timestamp_of(target);

        match self.options.step_strategy {
            StepStrategy::NativeSeek => {
                self.surface.seek(timestamp).await?;
                if let Some(frame) = self.cache.get(target) {
                    return Ok(frame);
                }
                let bytes = self.surface.capture_still()?;
                let frame = ExtractedFrame::from_jpeg(target, frame_rate, &bytes);
                self.cache.put(target, frame.clone());
                Ok(frame)
            }
            StepStrategy::Extract => {
                let frame = self.frame(target).await?;
                self.surface.set_time(timestamp);
                Ok(frame)
            }
        }
    }

    fn prefetch_around(&self, target: u64, media: &LoadedMedia) {
        let source = Arc::clone(&self.source);
        let path = Arc::clone(&media.path);
        let frame_rate = media.descriptor.frame_rate;

        self.cache.prefetch(
            target,
            media.descriptor.total_frames,
            move |index| {
                let source = Arc::clone(&source);
                let path = Arc::clone(&path);
                async move { source.extract_frame(&path, index, frame_rate).await }
            },
            self.options.prefetch_radius,
        );
    }
}
