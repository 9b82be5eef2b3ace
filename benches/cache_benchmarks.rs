//! Benchmarks for the frame cache, seek planning, and probe parsing.
//!
//! Run with: cargo bench
//!
//! The extraction benchmark requires `tests/fixtures/sample_video.mp4` and
//! `ffmpeg` on `PATH`; it is skipped otherwise.

use std::path::Path;

use criterion::Criterion;
use framewise::{
    ExtractOptions, ExtractedFrame, FrameCache, FrameExtractor, MediaProbe, SeekPlan,
    tools_available,
};
use tokio::runtime::Runtime;

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

const PROBE_JSON: &str = r#"{
    "streams": [
        {"codec_type": "audio", "codec_name": "aac"},
        {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
         "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001", "duration": "120.120"}
    ],
    "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "120.150", "bit_rate": "5000000"}
}"#;

fn sample_frame(index: u64) -> ExtractedFrame {
    ExtractedFrame::from_jpeg(index, 30.0, &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9])
}

fn benchmark_cache(criterion: &mut Criterion) {
    criterion.bench_function("cache put 1000 frames (capacity 30)", |bencher| {
        bencher.iter(|| {
            let cache = FrameCache::new(30);
            for index in 0..1000 {
                cache.put(index, sample_frame(index));
            }
        });
    });

    let cache = FrameCache::new(30);
    for index in 0..30 {
        cache.put(index, sample_frame(index));
    }
    criterion.bench_function("cache get hit", |bencher| {
        let mut index = 0;
        bencher.iter(|| {
            index = (index + 7) % 30;
            cache.get(index)
        });
    });

    criterion.bench_function("cache get miss", |bencher| {
        bencher.iter(|| cache.get(10_000));
    });
}

fn benchmark_seek_plan(criterion: &mut Criterion) {
    criterion.bench_function("seek plan", |bencher| {
        let mut index = 0_u64;
        bencher.iter(|| {
            index = (index + 97) % 100_000;
            SeekPlan::new(index, 29.97, 2.0)
        });
    });
}

fn benchmark_probe_parse(criterion: &mut Criterion) {
    criterion.bench_function("parse probe output", |bencher| {
        bencher.iter(|| MediaProbe::parse(PROBE_JSON.as_bytes(), "bench.mp4").unwrap());
    });
}

fn benchmark_extraction(criterion: &mut Criterion) {
    let options = ExtractOptions::from_env();
    if !Path::new(SAMPLE_VIDEO).exists() || !tools_available(&options) {
        eprintln!("Skipping extraction benchmark: fixture or ffmpeg not found");
        return;
    }

    let runtime = Runtime::new().unwrap();
    let extractor = FrameExtractor::new(options);

    let mut group = criterion.benchmark_group("extraction");
    group.sample_size(10);

    group.bench_function("extract frame 0", |bencher| {
        bencher.iter(|| runtime.block_on(extractor.extract(SAMPLE_VIDEO, 0, 30.0)).unwrap());
    });

    group.bench_function("extract frame 75 (mid-video seek)", |bencher| {
        bencher.iter(|| runtime.block_on(extractor.extract(SAMPLE_VIDEO, 75, 30.0)).unwrap());
    });

    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_cache,
    benchmark_seek_plan,
    benchmark_probe_parse,
    benchmark_extraction,
);
criterion::criterion_main!(benches);
