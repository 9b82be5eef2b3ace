//! # framewise
//!
//! Frame-exact navigation for video players.
//!
//! Native playback surfaces seek to the nearest keyframe or the nearest
//! presentation time, which makes "step one frame forward" unreliable.
//! `framewise` adds a frame-exact layer next to an existing surface: it
//! probes the container for authoritative frame timing, extracts any frame
//! exactly through `ffmpeg`, caches extracted frames, and coordinates
//! continuous playback with discrete frame stepping.
//!
//! ## Quick Start
//!
//! ### Probe a Video
//!
//! ```no_run
//! use framewise::{ExtractOptions, MediaProbe};
//!
//! # async fn example() -> Result<(), framewise::FramewiseError> {
//! let descriptor = MediaProbe::new(ExtractOptions::from_env()).probe("input.mp4").await?;
//! println!("{} fps, {} frames", descriptor.frame_rate, descriptor.total_frames);
//! # Ok(())
//! # }
//! ```
//!
//! ### Extract an Exact Frame
//!
//! ```no_run
//! use framewise::{ExtractOptions, FrameExtractor};
//!
//! # async fn example() -> Result<(), framewise::FramewiseError> {
//! let extractor = FrameExtractor::new(ExtractOptions::from_env());
//! let frame = extractor.extract("input.mp4", 150, 29.97).await?;
//! frame.save("frame_150.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Step Through a Video
//!
//! Implement [`PlaybackSurface`] for the platform player, then drive it with
//! a [`Navigator`]:
//!
//! ```no_run
//! use framewise::{ExtractOptions, Navigator, NavigatorOptions, PlaybackSurface};
//!
//! # async fn example<S: PlaybackSurface>(surface: S) -> Result<(), framewise::FramewiseError> {
//! let mut navigator = Navigator::new(surface, ExtractOptions::from_env(), NavigatorOptions::new());
//! navigator.load_video("input.mp4").await?;
//! navigator.step_frame(1).await?;
//! navigator.seek_to_progress(0.5).await?;
//! navigator.play().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Metadata probing** via `ffprobe`, with frame rate fallback and a
//!   variable-frame-rate indicator
//! - **Exact extraction** via a bounded coarse seek followed by a
//!   frame-selecting decode
//! - **Frame cache** with LRU eviction, in-flight de-duplication, and
//!   neighbour prefetching
//! - **Navigation state machine** switching between continuous playback and
//!   exact stepping
//! - **Progress & cancellation** for batch probing and extraction
//!
//! ## Requirements
//!
//! `ffprobe` and `ffmpeg` must be installed, either on `PATH` or at the
//! locations named by `FRAMEWISE_FFPROBE` and `FRAMEWISE_FFMPEG`.

pub mod cache;
pub mod configuration;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod frame;
pub mod metadata;
pub mod navigator;
pub mod probe;
pub mod progress;
pub mod surface;
pub mod utilities;

pub use cache::{FrameCache, PendingFrame};
pub use configuration::{ExtractOptions, NavigatorOptions, StepStrategy};
pub use error::FramewiseError;
pub use extract::{FrameExtractor, FrameSource, SeekPlan};
pub use ffmpeg::{FfmpegLogLevel, tools_available};
pub use frame::{ExtractedFrame, FrameFormat};
pub use metadata::FrameTimingDescriptor;
pub use navigator::{NavigationMode, Navigator, PlayerSnapshot};
pub use probe::MediaProbe;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use surface::PlaybackSurface;
