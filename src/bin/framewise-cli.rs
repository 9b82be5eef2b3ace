use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use framewise::{
    ExtractOptions, FfmpegLogLevel, FrameExtractor, FrameTimingDescriptor, MediaProbe,
    ProgressCallback, ProgressInfo,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framewise probe input.mp4 --json\n  framewise frame input.mp4 --index 150 --out frame.jpg\n  framewise frames input.mp4 --out frames --start 0:10 --end 0:20 --every 5 --progress\n  framewise plan input.mp4 --index 150\n  framewise completions zsh > _framewise";

#[derive(Debug, Parser)]
#[command(
    name = "framewise",
    version,
    about = "Probe frame timing and extract exact video frames",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// Tool log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Path to the ffprobe program.
    #[arg(long, global = true)]
    ffprobe: Option<PathBuf>,

    /// Path to the ffmpeg program.
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Seconds before a probe or extraction is abandoned.
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Seconds to seek before the target frame before decoding forward.
    #[arg(long, global = true)]
    seek_margin: Option<f64>,

    /// JPEG quality, 2 (best) to 31.
    #[arg(long, global = true)]
    quality: Option<u8>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print frame timing for a video file.
    #[command(
        about = "Print frame timing",
        visible_alias = "info",
        after_help = "Examples:\n  framewise probe input.mp4\n  framewise probe a.mp4 b.mkv --json"
    )]
    Probe {
        /// Input video paths.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract one exact frame to a JPEG file.
    #[command(
        about = "Extract a single frame",
        after_help = "Examples:\n  framewise frame input.mp4 --index 150 --out frame.jpg\n  framewise frame input.mp4 --time 00:01:05.5 --out frame.jpg"
    )]
    Frame {
        /// Input video path.
        input: PathBuf,
        /// Frame index to extract.
        #[arg(long, conflicts_with = "time", required_unless_present = "time")]
        index: Option<u64>,
        /// Timestamp to extract, in seconds or [hh:]mm:ss[.fff].
        #[arg(long)]
        time: Option<String>,
        /// Output JPEG path.
        #[arg(long)]
        out: PathBuf,
    },

    /// Extract several exact frames into a directory.
    #[command(
        about = "Extract many frames",
        after_help = "Examples:\n  framewise frames input.mp4 --out frames --indices 0,10,20-25\n  framewise frames input.mp4 --out frames --start 0:10 --end 0:20 --every 5 --progress"
    )]
    Frames {
        /// Input video path.
        input: PathBuf,
        /// Output directory.
        #[arg(long)]
        out: PathBuf,
        /// Comma-separated frame indices and inclusive ranges, e.g. 0,10,20-25.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        indices: Option<String>,
        /// First frame (index, or timestamp containing ':').
        #[arg(long)]
        start: Option<String>,
        /// Last frame, inclusive (index, or timestamp containing ':').
        #[arg(long)]
        end: Option<String>,
        /// Extract every Nth frame of the range.
        #[arg(long, default_value_t = 1)]
        every: u64,
    },

    /// Show how a frame would be extracted.
    #[command(
        about = "Print the seek plan and ffmpeg command for a frame",
        after_help = "Examples:\n  framewise plan input.mp4 --index 150"
    )]
    Plan {
        /// Input video path.
        input: PathBuf,
        /// Frame index.
        #[arg(long)]
        index: u64,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(seconds.max(0.0));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    Ok(total_seconds.max(0.0))
}

fn parse_frame_list(value: &str) -> Result<Vec<u64>, Box<dyn std::error::Error>> {
    let mut indices = Vec::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((first, last)) => {
                let first = first.trim().parse::<u64>()?;
                let last = last.trim().parse::<u64>()?;
                if first > last {
                    return Err(format!("invalid range: {part}").into());
                }
                indices.extend(first..=last);
            }
            None => indices.push(part.parse::<u64>()?),
        }
    }

    if indices.is_empty() {
        return Err("--indices cannot be empty".into());
    }
    Ok(indices)
}

/// Resolve a `--start`/`--end` bound, given either as an index or a timecode.
fn parse_frame_bound(
    value: &str,
    descriptor: &FrameTimingDescriptor,
) -> Result<u64, Box<dyn std::error::Error>> {
    let index = if value.contains(':') {
        descriptor.frame_at(parse_timecode(value)?)
    } else {
        value.trim().parse::<u64>()?
    };
    Ok(descriptor.clamp_frame(i128::from(index)))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn base_extract_options(
    global: &GlobalOptions,
) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    let mut options = ExtractOptions::from_env();

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        options = options.with_log_level(parsed);
    }
    if let Some(ffprobe) = &global.ffprobe {
        options = options.with_ffprobe(ffprobe);
    }
    if let Some(ffmpeg) = &global.ffmpeg {
        options = options.with_ffmpeg(ffmpeg);
    }
    if let Some(seconds) = global.timeout {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(format!("--timeout must be positive: {seconds}").into());
        }
        options = options.with_timeout(Duration::from_secs_f64(seconds));
    }
    if let Some(margin) = global.seek_margin {
        options = options.with_seek_margin(margin);
    }
    if let Some(quality) = global.quality {
        options = options.with_jpeg_quality(quality);
    }

    Ok(options)
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "framewise=debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
}

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        if let Some(frame) = info.current_frame {
            self.bar.set_message(format!("frame {frame}"));
        }
    }
}

fn descriptor_json(path: &Path, descriptor: &FrameTimingDescriptor) -> serde_json::Value {
    json!({
        "path": path.display().to_string(),
        "frame_rate": descriptor.frame_rate,
        "duration_seconds": descriptor.duration,
        "total_frames": descriptor.total_frames,
        "width": descriptor.width,
        "height": descriptor.height,
        "codec": descriptor.codec,
        "variable_frame_rate": descriptor.variable_frame_rate,
        "bit_rate": descriptor.bit_rate,
        "format": descriptor.format,
    })
}

fn print_descriptor(path: &Path, descriptor: &FrameTimingDescriptor) {
    println!("{}", path.display().to_string().bold());
    println!("  Format: {}", descriptor.format);
    println!(
        "  Video: {}x{} @ {:.3} fps [{}]",
        descriptor.width, descriptor.height, descriptor.frame_rate, descriptor.codec
    );
    println!("  Duration: {:.3}s", descriptor.duration);
    if descriptor.has_known_length() {
        println!("  Frames: {}", descriptor.total_frames);
    } else {
        println!("  Frames: unknown");
    }
    if descriptor.variable_frame_rate {
        println!(
            "  {} {}",
            "warning:".yellow().bold(),
            "variable frame rate; frame indices are approximate".yellow()
        );
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Probe { inputs, json } => {
            let probe = MediaProbe::new(base_extract_options(&cli.global)?);
            let results = probe.probe_many(&inputs).await;

            if json {
                let payload: Vec<_> = inputs
                    .iter()
                    .zip(&results)
                    .map(|(path, result)| match result {
                        Ok(descriptor) => descriptor_json(path, descriptor),
                        Err(error) => json!({
                            "path": path.display().to_string(),
                            "error": error.to_string(),
                        }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (path, result) in inputs.iter().zip(&results) {
                    match result {
                        Ok(descriptor) => print_descriptor(path, descriptor),
                        Err(error) => eprintln!("{} {error}", "error:".red().bold()),
                    }
                }
            }

            let failures = results.iter().filter(|result| result.is_err()).count();
            if failures > 0 {
                return Err(format!("{failures} file(s) could not be probed").into());
            }
        }
        Commands::Frame {
            input,
            index,
            time,
            out,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let options = base_extract_options(&cli.global)?;
            let descriptor = MediaProbe::new(options.clone()).probe(&input).await?;

            let requested = match (index, time) {
                (Some(index), _) => index,
                (None, Some(time)) => descriptor.frame_at(parse_timecode(&time)?),
                (None, None) => return Err("one of --index or --time is required".into()),
            };
            let frame_index = descriptor.clamp_frame(i128::from(requested));
            if frame_index != requested {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("frame {requested} is out of range, using {frame_index}").yellow()
                );
            }

            let frame = FrameExtractor::new(options)
                .extract(&input, frame_index, descriptor.frame_rate)
                .await?;
            frame.save(&out)?;
            println!(
                "{} frame {} ({:.3}s) -> {}",
                "saved".green().bold(),
                frame.index(),
                frame.timestamp(),
                out.display()
            );
        }
        Commands::Frames {
            input,
            out,
            indices,
            start,
            end,
            every,
        } => {
            if every == 0 {
                return Err("--every must be greater than 0".into());
            }

            let mut options = base_extract_options(&cli.global)?;
            let descriptor = MediaProbe::new(options.clone()).probe(&input).await?;

            let frame_indices: Vec<u64> = match indices {
                Some(list) => parse_frame_list(&list)?
                    .into_iter()
                    .map(|index| descriptor.clamp_frame(i128::from(index)))
                    .collect(),
                None => {
                    let last = descriptor
                        .last_frame()
                        .ok_or("frame count is unknown; use --indices")?;
                    let first = match &start {
                        Some(value) => parse_frame_bound(value, &descriptor)?,
                        None => 0,
                    };
                    let last = match &end {
                        Some(value) => parse_frame_bound(value, &descriptor)?,
                        None => last,
                    };
                    if first > last {
                        return Err("--start must be <= --end".into());
                    }
                    (first..=last).step_by(every as usize).collect()
                }
            };

            if out.exists() && !cli.global.overwrite {
                return Err(format!(
                    "output directory already exists: {} (use --overwrite)",
                    out.display()
                )
                .into());
            }
            fs::create_dir_all(&out)?;

            let progress_bar = if cli.global.progress {
                let bar = ProgressBar::new(frame_indices.len() as u64);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                bar.set_style(style.progress_chars("##-"));
                options = options.with_progress(Arc::new(BarProgress { bar: bar.clone() }));
                Some(bar)
            } else {
                None
            };

            let results = FrameExtractor::new(options)
                .extract_batch(&input, &frame_indices, descriptor.frame_rate)
                .await;

            if let Some(bar) = progress_bar {
                bar.finish_with_message("done");
            }

            let mut extracted = 0_u64;
            let mut failed = 0_u64;
            for (frame_index, result) in results {
                match result {
                    Ok(frame) => {
                        let output_path = out.join(format!("frame_{frame_index:06}.jpg"));
                        frame.save(&output_path)?;
                        extracted += 1;
                        log::debug!("saved frame {frame_index} -> {}", output_path.display());
                    }
                    Err(error) => {
                        failed += 1;
                        eprintln!("{} {error}", "error:".red().bold());
                    }
                }
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Extracted {extracted} frame(s) to {}", out.display()).green()
            );
            if failed > 0 {
                return Err(format!("{failed} frame(s) could not be extracted").into());
            }
        }
        Commands::Plan { input, index, json } => {
            let options = base_extract_options(&cli.global)?;
            let descriptor = MediaProbe::new(options.clone()).probe(&input).await?;
            let extractor = FrameExtractor::new(options);
            let plan = extractor.plan(index, descriptor.frame_rate);
            let args: Vec<String> = extractor
                .command_args(&input, &plan)
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();

            if json {
                let payload = json!({
                    "frame_index": plan.frame_index,
                    "timestamp": plan.timestamp,
                    "seek_time": plan.seek_time,
                    "frames_skipped": plan.frames_skipped,
                    "relative_frame_index": plan.relative_frame_index,
                    "program": extractor.options().ffmpeg().display().to_string(),
                    "args": args,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Frame: {} at {:.3}s", plan.frame_index, plan.timestamp);
                println!(
                    "Seek: {:.3}s (skips {} frames), select frame {}",
                    plan.seek_time, plan.frames_skipped, plan.relative_frame_index
                );
                println!("{} {}", extractor.options().ffmpeg().display(), args.join(" "));
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framewise", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use framewise::FrameTimingDescriptor;

    use super::{parse_frame_bound, parse_frame_list, parse_timecode};

    #[test]
    fn parse_timecode_formats() {
        assert_eq!(parse_timecode("75").unwrap(), 75.0);
        assert_eq!(parse_timecode("01:15").unwrap(), 75.0);
        assert_eq!(parse_timecode("00:01:15.5").unwrap(), 75.5);
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn parse_frame_list_expands_ranges() {
        assert_eq!(parse_frame_list("0,10,20-23").unwrap(), vec![0, 10, 20, 21, 22, 23]);
        assert_eq!(parse_frame_list(" 5 , 7 ").unwrap(), vec![5, 7]);
        assert!(parse_frame_list("9-3").is_err());
        assert!(parse_frame_list("a").is_err());
        assert!(parse_frame_list(",").is_err());
    }

    #[test]
    fn parse_frame_bound_clamps_to_video() {
        let descriptor = FrameTimingDescriptor::new(30.0, 10.0);
        assert_eq!(parse_frame_bound("0:05", &descriptor).unwrap(), 150);
        assert_eq!(parse_frame_bound("42", &descriptor).unwrap(), 42);
        assert_eq!(parse_frame_bound("5000", &descriptor).unwrap(), 299);
    }
}
