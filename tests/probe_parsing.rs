//! Metadata probe tests.
//!
//! Parsing tests run against canned `ffprobe` JSON. The live probe tests
//! require `tests/fixtures/sample_video.mp4` and `ffprobe` on `PATH`.

use std::path::Path;

use framewise::{
    ExtractOptions, FramewiseError, MediaProbe,
    probe::{DEFAULT_FRAME_RATE, parse_frame_rate, resolve_frame_rate},
    tools_available,
};

fn probe_json(stream: &str, format: &str) -> Vec<u8> {
    format!(r#"{{"streams": [{stream}], "format": {format}}}"#).into_bytes()
}

// ── Frame rate parsing ─────────────────────────────────────────────

#[test]
fn frame_rate_fraction() {
    assert_eq!(parse_frame_rate("25/1"), Some(25.0));
    assert_eq!(parse_frame_rate(" 60 / 1 "), Some(60.0));
    let ntsc = parse_frame_rate("30000/1001").unwrap();
    assert!((ntsc - 29.970_029).abs() < 1e-6);
}

#[test]
fn frame_rate_zero_denominator_uses_numerator() {
    assert_eq!(parse_frame_rate("24/0"), Some(24.0));
    assert_eq!(parse_frame_rate("24"), Some(24.0));
}

#[test]
fn frame_rate_rejects_non_positive_and_garbage() {
    assert_eq!(parse_frame_rate("0/0"), None);
    assert_eq!(parse_frame_rate("0/1"), None);
    assert_eq!(parse_frame_rate("-25/1"), None);
    assert_eq!(parse_frame_rate("N/A"), None);
    assert_eq!(parse_frame_rate(""), None);
}

#[test]
fn resolve_prefers_real_rate_then_average_then_default() {
    assert_eq!(resolve_frame_rate(Some("30000/1001"), Some("25/1")), 29.97);
    assert_eq!(resolve_frame_rate(Some("0/0"), Some("25/1")), 25.0);
    assert_eq!(resolve_frame_rate(None, Some("24/1")), 24.0);
    assert_eq!(resolve_frame_rate(Some("0/0"), Some("0/0")), DEFAULT_FRAME_RATE);
    assert_eq!(resolve_frame_rate(None, None), 30.0);
}

// ── Descriptor normalization ───────────────────────────────────────

#[test]
fn parse_ntsc_stream() {
    let json = probe_json(
        r#"{"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
            "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001", "duration": "10.010"}"#,
        r#"{"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "10.050", "bit_rate": "4000000"}"#,
    );

    let descriptor = MediaProbe::parse(&json, "ntsc.mp4").expect("Failed to parse");
    assert_eq!(descriptor.frame_rate, 29.97);
    assert_eq!(descriptor.duration, 10.01);
    assert_eq!(descriptor.total_frames, 299);
    assert_eq!(descriptor.width, 1920);
    assert_eq!(descriptor.height, 1080);
    assert_eq!(descriptor.codec, "h264");
    assert_eq!(descriptor.bit_rate, 4_000_000);
    assert_eq!(descriptor.format, "mov,mp4,m4a,3gp,3g2,mj2");
    assert!(!descriptor.variable_frame_rate);
}

#[test]
fn parse_falls_back_to_average_rate() {
    let json = probe_json(
        r#"{"codec_type": "video", "r_frame_rate": "0/0", "avg_frame_rate": "25/1", "duration": "4"}"#,
        "{}",
    );

    let descriptor = MediaProbe::parse(&json, "pal.mkv").expect("Failed to parse");
    assert_eq!(descriptor.frame_rate, 25.0);
    assert_eq!(descriptor.total_frames, 100);
    assert!(descriptor.variable_frame_rate);
}

#[test]
fn parse_defaults_to_thirty_fps() {
    let json = probe_json(r#"{"codec_type": "video", "duration": 2.0}"#, "{}");

    let descriptor = MediaProbe::parse(&json, "unknown.avi").expect("Failed to parse");
    assert_eq!(descriptor.frame_rate, 30.0);
    assert_eq!(descriptor.total_frames, 60);
    assert_eq!(descriptor.codec, "unknown");
}

#[test]
fn parse_flags_variable_frame_rate() {
    let json = probe_json(
        r#"{"codec_type": "video", "r_frame_rate": "60/1", "avg_frame_rate": "24000/1001"}"#,
        r#"{"duration": "1.0"}"#,
    );

    let descriptor = MediaProbe::parse(&json, "phone.mp4").expect("Failed to parse");
    assert_eq!(descriptor.frame_rate, 60.0);
    assert!(descriptor.variable_frame_rate);
}

#[test]
fn parse_duration_falls_back_to_container() {
    let json = probe_json(
        r#"{"codec_type": "video", "r_frame_rate": "30/1", "avg_frame_rate": "30/1", "duration": "N/A"}"#,
        r#"{"duration": "5.000000"}"#,
    );

    let descriptor = MediaProbe::parse(&json, "stream.webm").expect("Failed to parse");
    assert_eq!(descriptor.duration, 5.0);
    assert_eq!(descriptor.total_frames, 150);
}

#[test]
fn parse_unknown_duration_gives_unknown_length() {
    let json = probe_json(r#"{"codec_type": "video", "r_frame_rate": "30/1"}"#, "{}");

    let descriptor = MediaProbe::parse(&json, "live.flv").expect("Failed to parse");
    assert_eq!(descriptor.duration, 0.0);
    assert_eq!(descriptor.total_frames, 0);
    assert!(!descriptor.has_known_length());
    assert_eq!(descriptor.last_frame(), None);
}

#[test]
fn parse_skips_non_video_streams() {
    let json = br#"{"streams": [
        {"codec_type": "audio", "codec_name": "aac", "r_frame_rate": "0/0"},
        {"codec_type": "video", "codec_name": "vp9", "r_frame_rate": "24/1", "avg_frame_rate": "24/1", "duration": "1"}
    ]}"#;

    let descriptor = MediaProbe::parse(json, "clip.webm").expect("Failed to parse");
    assert_eq!(descriptor.codec, "vp9");
    assert_eq!(descriptor.frame_rate, 24.0);
}

#[test]
fn parse_without_video_stream_fails() {
    let json = probe_json(r#"{"codec_type": "audio", "codec_name": "mp3"}"#, "{}");

    match MediaProbe::parse(&json, "song.mp3") {
        Err(FramewiseError::NoVideoStream { path }) => assert_eq!(path, Path::new("song.mp3")),
        other => panic!("Expected NoVideoStream, got: {other:?}"),
    }
}

#[test]
fn parse_malformed_output_fails() {
    let error = MediaProbe::parse(b"not json", "broken.mp4").unwrap_err();
    assert!(error.is_probe_error());
    assert!(error.to_string().contains("broken.mp4"));
}

// ── Live probing ───────────────────────────────────────────────────

#[tokio::test]
async fn probe_missing_program_fails() {
    let options = ExtractOptions::new().with_ffprobe("/nonexistent/ffprobe");
    let error = MediaProbe::new(options).probe("input.mp4").await.unwrap_err();

    assert!(matches!(error, FramewiseError::ProbeFailed { .. }));
    assert!(error.to_string().contains("could not start"));
}

#[tokio::test]
async fn probe_sample_video() {
    let path = "tests/fixtures/sample_video.mp4";
    let options = ExtractOptions::from_env();
    if !Path::new(path).exists() || !tools_available(&options) {
        return;
    }

    let descriptor = MediaProbe::new(options).probe(path).await.expect("Failed to probe");
    assert!(descriptor.frame_rate > 0.0);
    assert!(descriptor.total_frames > 0);
    assert!(descriptor.width > 0);
}
