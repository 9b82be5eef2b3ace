//! Exact frame extraction.
//!
//! [`FrameExtractor`] spawns one `ffmpeg` process per requested frame. A pure
//! keyframe seek is fast but lands on the wrong frame whenever keyframes are
//! sparse, and a linear decode from frame 0 is exact but slow deep into a
//! long file. The extractor does both: a fast input seek to a point
//! [`seek_margin`](crate::ExtractOptions::with_seek_margin) seconds before
//! the target, then a sequential decode that selects the one frame whose
//! post-seek sequence number matches. The decode cost is bounded by the
//! margin regardless of where the frame sits in the file.
//!
//! The plan for a request is exposed as [`SeekPlan`], and the exact command
//! line as [`FrameExtractor::command_args`].

use std::{
    ffi::OsString,
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use tokio::{process::Command, sync::Semaphore, task::JoinSet};

use crate::{
    configuration::ExtractOptions,
    error::FramewiseError,
    frame::ExtractedFrame,
    progress::{OperationType, ProgressTracker},
    utilities::round_to_millis,
};

/// Anything that can produce the exact frame at an index.
///
/// [`FrameExtractor`] is the production implementation; the
/// [`Navigator`](crate::Navigator) and [`FrameCache`](crate::FrameCache) are
/// generic over this trait so alternative decoders can be plugged in.
pub trait FrameSource: Send + Sync + 'static {
    /// Produce frame `frame_index` of the video at `path`.
    fn extract_frame(
        &self,
        path: &Path,
        frame_index: u64,
        frame_rate: f64,
    ) -> impl Future<Output = Result<ExtractedFrame, FramewiseError>> + Send;
}

/// The seek-then-select plan for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekPlan {
    /// The requested frame.
    pub frame_index: u64,
    /// `frame_index / frame_rate`, in seconds.
    pub timestamp: f64,
    /// Where the coarse input seek lands: `max(0, timestamp - margin)`,
    /// rounded to milliseconds as passed on the command line.
    pub seek_time: f64,
    /// `round(seek_time * frame_rate)`.
    pub frames_skipped: u64,
    /// The frame to select after the coarse seek.
    pub relative_frame_index: u64,
}

impl SeekPlan {
    /// Plan the extraction of `frame_index`.
    ///
    /// ```
    /// use framewise::SeekPlan;
    ///
    /// let plan = SeekPlan::new(150, 30.0, 2.0);
    /// assert_eq!(plan.timestamp, 5.0);
    /// assert_eq!(plan.seek_time, 3.0);
    /// assert_eq!(plan.relative_frame_index, 60);
    /// ```
    pub fn new(frame_index: u64, frame_rate: f64, seek_margin: f64) -> Self {
        let timestamp = frame_index as f64 / frame_rate;
        let seek_time = round_to_millis((timestamp - seek_margin).max(0.0));
        let frames_skipped = (seek_time * frame_rate).round().max(0.0) as u64;

        Self {
            frame_index,
            timestamp,
            seek_time,
            frames_skipped,
            relative_frame_index: frame_index.saturating_sub(frames_skipped),
        }
    }
}

/// Exact frame extractor backed by the `ffmpeg` command-line tool.
///
/// Holds no state between calls: every extraction spawns and fully tears
/// down one process.
#[derive(Debug, Clone, Default)]
pub struct FrameExtractor {
    options: ExtractOptions,
}

impl FrameExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Plan the extraction of `frame_index` with this extractor's margin.
    pub fn plan(&self, frame_index: u64, frame_rate: f64) -> SeekPlan {
        SeekPlan::new(frame_index, frame_rate, self.options.seek_margin)
    }

    /// The `ffmpeg` arguments used to carry out `plan` on `path`.
    pub fn command_args(&self, path: &Path, plan: &SeekPlan) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-nostdin",
            "-v",
            self.options.log_level.as_arg(),
            "-ss",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push(format!("{:.3}", plan.seek_time).into());
        args.push("-i".into());
        args.push(path.as_os_str().to_os_string());
        args.push("-vf".into());
        args.push(format!("select=eq(n\\,{})", plan.relative_frame_index).into());

        args.extend(
            [
                "-frames:v",
                "1",
                "-vsync",
                "vfr",
                "-f",
                "image2pipe",
                "-c:v",
                "mjpeg",
                "-q:v",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(self.options.jpeg_quality.to_string().into());
        args.push("-an".into());
        args.push("pipe:1".into());
        args
    }

    /// Extract the exact frame at `frame_index`.
    ///
    /// # Errors
    ///
    /// - [`FramewiseError::ExtractionTimeout`] if `ffmpeg` runs longer than the
    ///   configured timeout; the process is killed.
    /// - [`FramewiseError::ExtractionFailed`] if `ffmpeg` cannot be started,
    ///   exits unsuccessfully, or writes no image bytes.
    pub async fn extract<P: AsRef<Path>>(
        &self,
        path: P,
        frame_index: u64,
        frame_rate: f64,
    ) -> Result<ExtractedFrame, FramewiseError> {
        let path = path.as_ref();
        let failed = |reason: String| FramewiseError::ExtractionFailed {
            frame_index,
            reason,
        };

        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(failed(format!("invalid frame rate {frame_rate}")));
        }

        let plan = self.plan(frame_index, frame_rate);
        log::debug!(
            "Extracting frame {} from {} (seek {:.3}s, select {})",
            frame_index,
            path.display(),
            plan.seek_time,
            plan.relative_frame_index
        );

        let child = Command::new(&self.options.ffmpeg)
            .args(self.command_args(path, &plan))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                failed(format!(
                    "could not start {}: {error}",
                    self.options.ffmpeg.display()
                ))
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.options.timeout, child.wait_with_output())
            .await
            .map_err(|_| FramewiseError::ExtractionTimeout {
                frame_index,
                timeout: self.options.timeout,
            })?
            .map_err(|error| failed(error.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default().trim();
            return Err(failed(format!("ffmpeg exited with {}: {detail}", output.status)));
        }

        if output.stdout.is_empty() {
            return Err(failed("ffmpeg produced no image data".to_string()));
        }

        Ok(ExtractedFrame::from_jpeg(frame_index, frame_rate, &output.stdout))
    }

    /// Extract several frames concurrently.
    ///
    /// Each index is extracted independently; one failure does not fail the
    /// batch. Results are returned in request order. Concurrency is bounded
    /// by the number of available CPUs. Progress is reported as each index
    /// completes, and indices not yet started when the cancellation token
    /// fires yield [`FramewiseError::Cancelled`].
    pub async fn extract_batch<P: AsRef<Path>>(
        &self,
        path: P,
        frame_indices: &[u64],
        frame_rate: f64,
    ) -> Vec<(u64, Result<ExtractedFrame, FramewiseError>)> {
        let path: Arc<PathBuf> = Arc::new(path.as_ref().to_path_buf());
        let workers = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(4);
        let permits = Arc::new(Semaphore::new(workers));

        let mut tasks = JoinSet::new();
        for (position, &frame_index) in frame_indices.iter().enumerate() {
            let extractor = self.clone();
            let path = Arc::clone(&path);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) if !extractor.options.is_cancelled() => {
                        extractor.extract(path.as_path(), frame_index, frame_rate).await
                    }
                    _ => Err(FramewiseError::Cancelled),
                };
                (position, result)
            });
        }

        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::FrameExtraction,
            Some(frame_indices.len() as u64),
        );

        let mut slots: Vec<Option<Result<ExtractedFrame, FramewiseError>>> =
            (0..frame_indices.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => {
                    if let Err(error) = &result {
                        log::warn!("Batch extraction of frame {}: {error}", frame_indices[position]);
                    }
                    tracker.advance(Some(frame_indices[position]));
                    slots[position] = Some(result);
                }
                Err(error) => log::warn!("Batch extraction task failed: {error}"),
            }
        }

        frame_indices
            .iter()
            .zip(slots)
            .map(|(&frame_index, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(FramewiseError::ExtractionFailed {
                        frame_index,
                        reason: "extraction task did not complete".to_string(),
                    })
                });
                (frame_index, result)
            })
            .collect()
    }
}

impl FrameSource for FrameExtractor {
    fn extract_frame(
        &self,
        path: &Path,
        frame_index: u64,
        frame_rate: f64,
    ) -> impl Future<Output = Result<ExtractedFrame, FramewiseError>> + Send {
        self.extract(path, frame_index, frame_rate)
    }
}
