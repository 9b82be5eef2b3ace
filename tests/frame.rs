//! ExtractedFrame tests.

use std::io::Cursor;

use framewise::{ExtractedFrame, FrameFormat};
use image::{ImageFormat, RgbImage};

fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    bytes.into_inner()
}

#[test]
fn timestamp_derives_from_rate() {
    let frame = ExtractedFrame::from_jpeg(150, 30.0, b"jpeg");
    assert_eq!(frame.index(), 150);
    assert_eq!(frame.timestamp(), 5.0);
    assert_eq!(frame.format(), FrameFormat::Jpeg);
}

#[test]
fn transport_encoding() {
    let frame = ExtractedFrame::from_jpeg(0, 25.0, b"hello");
    assert_eq!(frame.base64(), "aGVsbG8=");
    assert_eq!(frame.data_url(), "data:image/jpeg;base64,aGVsbG8=");
    assert_eq!(frame.bytes().unwrap(), b"hello");
}

#[test]
fn debug_does_not_dump_image() {
    let frame = ExtractedFrame::from_jpeg(3, 25.0, &[0u8; 4096]);
    let debug = format!("{frame:?}");
    assert!(debug.contains("index: 3"));
    assert!(debug.len() < 200, "{debug}");
}

#[test]
fn decodes_to_pixels() {
    let frame = ExtractedFrame::from_jpeg(0, 30.0, &encoded_jpeg(32, 16));
    let image = frame.to_image().expect("Failed to decode");
    assert_eq!(image.width(), 32);
    assert_eq!(image.height(), 16);
}

#[test]
fn save_writes_raw_jpeg() {
    let bytes = encoded_jpeg(8, 8);
    let frame = ExtractedFrame::from_jpeg(9, 30.0, &bytes);

    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("frame_000009.jpg");
    frame.save(&path).expect("Failed to save");

    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

#[test]
fn format_tags() {
    assert_eq!(FrameFormat::Jpeg.as_str(), "jpeg");
    assert_eq!(FrameFormat::Jpeg.mime_type(), "image/jpeg");
}
