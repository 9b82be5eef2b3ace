//! Metadata probing.
//!
//! [`MediaProbe`] runs `ffprobe` against a container and normalizes the
//! JSON stream/format description into a [`FrameTimingDescriptor`].
//!
//! Frame rate resolution order:
//!
//! 1. the stream's real rate (`r_frame_rate`, an `"N/D"` string),
//! 2. the stream's average rate (`avg_frame_rate`),
//! 3. 30 fps.
//!
//! A zero or missing denominator means the numerator is the rate. Duration
//! comes from the video stream, then the container, then defaults to zero.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use serde::{Deserialize, Deserializer};
use tokio::process::Command;

use crate::{
    configuration::ExtractOptions,
    error::FramewiseError,
    metadata::FrameTimingDescriptor,
    progress::{OperationType, ProgressTracker},
    utilities::{round_to_millis, total_frame_count},
};

/// Frame rate used when no rate field parses.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    duration: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default, deserialize_with = "lenient_number")]
    duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    bit_rate: Option<f64>,
    format_name: Option<String>,
}

/// ffprobe prints most numbers as strings; accept either form and treat
/// anything unparsable (`"N/A"`) as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(number)) => Some(number),
        Some(NumberOrText::Text(text)) => text.trim().parse::<f64>().ok(),
        None => None,
    }
    .filter(|number| number.is_finite()))
}

/// Parse an `"N/D"` rate string.
///
/// Returns `None` unless the result is a positive, finite number.
///
/// ```
/// use framewise::probe::parse_frame_rate;
///
/// assert_eq!(parse_frame_rate("25/1"), Some(25.0));
/// assert_eq!(parse_frame_rate("24/0"), Some(24.0));
/// assert_eq!(parse_frame_rate("0/0"), None);
/// ```
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (numerator, denominator) = match rate.trim().split_once('/') {
        Some((numerator, denominator)) => (numerator, Some(denominator)),
        None => (rate.trim(), None),
    };

    let numerator: f64 = numerator.trim().parse().ok()?;
    let denominator = denominator
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|&value| value != 0.0);

    let rate = match denominator {
        Some(denominator) => numerator / denominator,
        None => numerator,
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Resolve the frame rate from the real and average rate fields, falling
/// back to [`DEFAULT_FRAME_RATE`]. The result is rounded to three decimals.
pub fn resolve_frame_rate(real_rate: Option<&str>, average_rate: Option<&str>) -> f64 {
    let rate = real_rate
        .and_then(parse_frame_rate)
        .or_else(|| average_rate.and_then(parse_frame_rate))
        .unwrap_or(DEFAULT_FRAME_RATE);
    let rounded = round_to_millis(rate);
    if rounded > 0.0 { rounded } else { DEFAULT_FRAME_RATE }
}

/// Metadata prober backed by the `ffprobe` command-line tool.
///
/// # Example
///
/// ```no_run
/// use framewise::{ExtractOptions, MediaProbe};
///
/// # async fn example() -> Result<(), framewise::FramewiseError> {
/// let probe = MediaProbe::new(ExtractOptions::from_env());
/// let descriptor = probe.probe("input.mkv").await?;
/// if descriptor.variable_frame_rate {
///     eprintln!("warning: stepping may be approximate");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MediaProbe {
    options: ExtractOptions,
}

impl MediaProbe {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Probe a container and return its frame timing.
    ///
    /// # Errors
    ///
    /// - [`FramewiseError::ProbeFailed`] if `ffprobe` cannot be started, exits
    ///   unsuccessfully, times out, or prints malformed JSON.
    /// - [`FramewiseError::NoVideoStream`] if the container has no video stream.
    pub async fn probe<P: AsRef<Path>>(&self, path: P) -> Result<FrameTimingDescriptor, FramewiseError> {
        let path = path.as_ref();
        log::debug!("Probing {}", path.display());

        let probe_failed = |reason: String| FramewiseError::ProbeFailed {
            path: path.to_path_buf(),
            reason,
        };

        let child = Command::new(&self.options.ffprobe)
            .args(["-v", self.options.log_level.as_arg()])
            .args(["-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                probe_failed(format!(
                    "could not start {}: {error}",
                    self.options.ffprobe.display()
                ))
            })?;

        let output = tokio::time::timeout(self.options.timeout, child.wait_with_output())
            .await
            .map_err(|_| probe_failed(format!("timed out after {:?}", self.options.timeout)))?
            .map_err(|error| probe_failed(error.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_failed(format!(
                "{} exited with {}: {}",
                self.options.ffprobe.display(),
                output.status,
                stderr.trim()
            )));
        }

        Self::parse(&output.stdout, path)
    }

    /// Probe several containers one after another.
    ///
    /// Files that cannot be probed produce an `Err` entry rather than
    /// aborting the batch. Progress is reported per file; once the
    /// cancellation token fires, the remaining files yield
    /// [`FramewiseError::Cancelled`].
    pub async fn probe_many<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Vec<Result<FrameTimingDescriptor, FramewiseError>> {
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::Probing,
            Some(paths.len() as u64),
        );

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            if self.options.is_cancelled() {
                results.push(Err(FramewiseError::Cancelled));
                continue;
            }
            results.push(self.probe(path).await);
            tracker.advance(None);
        }
        results
    }

    /// Normalize raw `ffprobe -print_format json -show_streams -show_format`
    /// output into a descriptor. `path` is used for error context only.
    ///
    /// # Errors
    ///
    /// [`FramewiseError::ProbeFailed`] on malformed JSON,
    /// [`FramewiseError::NoVideoStream`] if no stream has `codec_type` video.
    pub fn parse<P: AsRef<Path>>(json: &[u8], path: P) -> Result<FrameTimingDescriptor, FramewiseError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let output: ProbeOutput =
            serde_json::from_slice(json).map_err(|error| FramewiseError::ProbeFailed {
                path: path.clone(),
                reason: format!("malformed probe output: {error}"),
            })?;

        let format = output.format.unwrap_or_default();
        let stream = output
            .streams
            .into_iter()
            .find(|stream| stream.codec_type.as_deref() == Some("video"))
            .ok_or(FramewiseError::NoVideoStream { path })?;

        let frame_rate = resolve_frame_rate(
            stream.r_frame_rate.as_deref(),
            stream.avg_frame_rate.as_deref(),
        );
        let duration = stream
            .duration
            .or(format.duration)
            .filter(|&duration| duration >= 0.0)
            .unwrap_or(0.0);
        let variable_frame_rate = stream.r_frame_rate != stream.avg_frame_rate;

        let descriptor = FrameTimingDescriptor {
            frame_rate,
            duration,
            total_frames: total_frame_count(frame_rate, duration),
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
            variable_frame_rate,
            bit_rate: format.bit_rate.filter(|&rate| rate > 0.0).unwrap_or(0.0) as u64,
            format: format.format_name.unwrap_or_default(),
        };

        log::debug!(
            "Probed {:.3} fps, {:.3}s, {} frames{}",
            descriptor.frame_rate,
            descriptor.duration,
            descriptor.total_frames,
            if descriptor.variable_frame_rate { " (VFR)" } else { "" }
        );

        Ok(descriptor)
    }
}
