//! Progress and cancellation integration tests.

use std::sync::{Arc, Mutex};

use framewise::{
    CancellationToken, ExtractOptions, FramewiseError, MediaProbe, OperationType,
    ProgressCallback, ProgressInfo,
};

#[derive(Default)]
struct RecordingProgress {
    updates: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.updates.lock().unwrap().push(info.clone());
    }
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    assert!(!CancellationToken::new().is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

// ── Batch probing ──────────────────────────────────────────────────

#[tokio::test]
async fn probe_many_reports_each_file() {
    let progress = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new()
        .with_ffprobe("/nonexistent/ffprobe")
        .with_progress(progress.clone());

    let results = MediaProbe::new(options)
        .probe_many(&["a.mp4", "b.mp4", "c.mp4"])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|result| result.as_ref().is_err_and(FramewiseError::is_probe_error)));

    let updates = progress.updates.lock().unwrap();
    assert_eq!(updates.len(), 3);
    assert!(updates.iter().all(|info| info.operation == OperationType::Probing));
    assert_eq!(updates.last().unwrap().current, 3);
    assert_eq!(updates.last().unwrap().total, Some(3));
    assert_eq!(updates.last().unwrap().percentage, Some(100.0));
    assert_eq!(updates[0].percentage.map(|pct| pct.round()), Some(33.0));
}

#[tokio::test]
async fn cancelled_probe_many_skips_everything() {
    let token = CancellationToken::new();
    token.cancel();
    let options = ExtractOptions::new()
        .with_ffprobe("/nonexistent/ffprobe")
        .with_cancellation(token);

    let results = MediaProbe::new(options).probe_many(&["a.mp4", "b.mp4"]).await;

    assert_eq!(results.len(), 2);
    assert!(
        results
            .iter()
            .all(|result| matches!(result, Err(FramewiseError::Cancelled)))
    );
}
