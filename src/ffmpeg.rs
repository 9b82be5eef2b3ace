//! FFmpeg tool configuration.
//!
//! `framewise` drives the `ffprobe` and `ffmpeg` command-line tools as
//! subprocesses. Both tools have their own stderr logging, separate from the
//! Rust [`log`](https://crates.io/crates/log) facade used by this crate. This
//! module maps a typed verbosity level onto the `-v` argument passed to every
//! invocation, and checks whether the tools can be run at all.
//!
//! # Example
//!
//! ```no_run
//! use framewise::{ExtractOptions, FfmpegLogLevel};
//!
//! // Silence everything except fatal errors.
//! let options = ExtractOptions::new().with_log_level(FfmpegLogLevel::Fatal);
//! assert!(framewise::ffmpeg::tools_available(&options));
//! ```
//!
//! # Note
//!
//! This controls **the tools' own console output**, not the Rust-side
//! diagnostic messages emitted via the `log` crate. To see those, install a
//! `log` subscriber such as `env_logger`.

use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
    sync::{Mutex, OnceLock},
};

use crate::configuration::ExtractOptions;

/// FFmpeg tool log verbosity level.
///
/// Maps directly to the names accepted by `-v` / `-loglevel`. Setting a level
/// causes the tool to suppress all messages below that severity.
///
/// # Ordering (most verbose → most quiet)
///
/// `Trace` > `Debug` > `Verbose` > `Info` > `Warning` > `Error` > `Fatal` > `Panic` > `Quiet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only log conditions that abort the process.
    Panic,
    /// Only log unrecoverable errors.
    Fatal,
    /// Log recoverable errors. This is the default.
    #[default]
    Error,
    /// Log warnings.
    Warning,
    /// Log informational messages.
    Info,
    /// Log verbose informational messages.
    Verbose,
    /// Log debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    /// The value passed after `-v` on the tool command line.
    pub fn as_arg(self) -> &'static str {
        match self {
            FfmpegLogLevel::Quiet => "quiet",
            FfmpegLogLevel::Panic => "panic",
            FfmpegLogLevel::Fatal => "fatal",
            FfmpegLogLevel::Error => "error",
            FfmpegLogLevel::Warning => "warning",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Verbose => "verbose",
            FfmpegLogLevel::Debug => "debug",
            FfmpegLogLevel::Trace => "trace",
        }
    }
}

impl Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_arg())
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "panic" => Ok(FfmpegLogLevel::Panic),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "verbose" => Ok(FfmpegLogLevel::Verbose),
            "debug" => Ok(FfmpegLogLevel::Debug),
            "trace" => Ok(FfmpegLogLevel::Trace),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Returns `true` if `program -version` runs and exits successfully.
///
/// Results are cached per program path for the lifetime of the process.
pub fn program_available(program: &Path) -> bool {
    static AVAILABLE: OnceLock<Mutex<HashMap<PathBuf, bool>>> = OnceLock::new();

    let cache = AVAILABLE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(known) = cache.lock() {
        if let Some(&available) = known.get(program) {
            return available;
        }
    }

    let available = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);

    log::debug!("{} available: {available}", program.display());
    if let Ok(mut known) = cache.lock() {
        known.insert(program.to_path_buf(), available);
    }
    available
}

/// Returns `true` if both the probe and the decode tool configured in
/// `options` can be run.
pub fn tools_available(options: &ExtractOptions) -> bool {
    program_available(options.ffprobe()) && program_available(options.ffmpeg())
}
