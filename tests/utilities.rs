//! Frame/time conversion and descriptor helper tests.

use framewise::{
    FrameTimingDescriptor,
    utilities::{
        frame_index_to_seconds, is_supported_extension, round_to_millis, seconds_to_frame_index,
        total_frame_count,
    },
};

#[test]
fn index_to_seconds() {
    assert_eq!(frame_index_to_seconds(0, 30.0), 0.0);
    assert_eq!(frame_index_to_seconds(150, 30.0), 5.0);
    assert_eq!(frame_index_to_seconds(10, 0.0), 0.0);
}

#[test]
fn seconds_to_nearest_index() {
    assert_eq!(seconds_to_frame_index(5.0, 30.0), 150);
    assert_eq!(seconds_to_frame_index(0.049, 10.0), 0);
    assert_eq!(seconds_to_frame_index(0.051, 10.0), 1);
    assert_eq!(seconds_to_frame_index(-2.0, 30.0), 0);
    assert_eq!(seconds_to_frame_index(f64::NAN, 30.0), 0);
}

#[test]
fn frame_count_floors() {
    assert_eq!(total_frame_count(29.97, 10.01), 299);
    assert_eq!(total_frame_count(30.0, 0.0), 0);
    assert_eq!(total_frame_count(25.0, 3.999), 99);
}

#[test]
fn millisecond_rounding() {
    assert_eq!(round_to_millis(29.970_029), 29.97);
    assert_eq!(round_to_millis(2.0004), 2.0);
    assert_eq!(round_to_millis(0.0), 0.0);
}

#[test]
fn supported_extensions() {
    assert!(is_supported_extension("movie.mp4"));
    assert!(is_supported_extension("/a/b/Clip.MKV"));
    assert!(is_supported_extension("take.webm"));
    assert!(!is_supported_extension("notes.txt"));
    assert!(!is_supported_extension("no_extension"));
}

#[test]
fn descriptor_clamping() {
    let descriptor = FrameTimingDescriptor::new(30.0, 10.0);
    assert_eq!(descriptor.total_frames, 300);
    assert_eq!(descriptor.last_frame(), Some(299));
    assert_eq!(descriptor.clamp_frame(-5), 0);
    assert_eq!(descriptor.clamp_frame(150), 150);
    assert_eq!(descriptor.clamp_frame(10_000), 299);
    assert_eq!(descriptor.timestamp_of(150), 5.0);
    assert_eq!(descriptor.frame_at(5.0), 150);

    let unknown = FrameTimingDescriptor::new(30.0, 0.0);
    assert!(!unknown.has_known_length());
    assert_eq!(unknown.clamp_frame(10_000), 10_000);
    assert_eq!(unknown.clamp_frame(-1), 0);
}
