//! Bounded frame cache with speculative prefetch.
//!
//! [`FrameCache`] keeps the most recently used [`ExtractedFrame`]s keyed by
//! frame index, evicting the least recently used entry once `max_size`
//! distinct frames are held. Alongside the entries it tracks extractions
//! that are still running, so a frame is never extracted twice at once:
//! a caller that needs an in-flight frame joins it through a
//! [`PendingFrame`] handle instead of starting a duplicate.
//!
//! A frame index is either cached, pending, or neither; never both. A
//! pending marker is removed in the same critical section that stores the
//! finished frame, and a pending extraction whose future is dropped before
//! completing removes its own marker.
//!
//! # Example
//!
//! ```no_run
//! use std::{path::PathBuf, sync::Arc};
//!
//! use framewise::{ExtractOptions, FrameCache, FrameExtractor};
//!
//! # async fn example() -> Result<(), framewise::FramewiseError> {
//! let cache = FrameCache::new(30);
//! let extractor = Arc::new(FrameExtractor::new(ExtractOptions::new()));
//! let path = Arc::new(PathBuf::from("input.mp4"));
//!
//! let fetch = |index: u64| {
//!     let extractor = Arc::clone(&extractor);
//!     let path = Arc::clone(&path);
//!     async move { extractor.extract(path.as_path(), index, 30.0).await }
//! };
//!
//! let frame = cache.get_or_extract(100, &fetch).await?;
//! cache.prefetch(100, 300, &fetch, 3);
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    future::Future,
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use lru::LruCache;
use tokio::sync::watch;

use crate::{configuration::DEFAULT_CACHE_SIZE, error::FramewiseError, frame::ExtractedFrame};

/// Clonable summary of a failed extraction, handed to every joined waiter.
#[derive(Debug, Clone)]
enum SharedFailure {
    Timeout(Duration),
    Failed(String),
}

impl SharedFailure {
    fn from_error(error: &FramewiseError) -> Self {
        match error {
            FramewiseError::ExtractionTimeout { timeout, .. } => SharedFailure::Timeout(*timeout),
            other => SharedFailure::Failed(other.to_string()),
        }
    }

    fn into_error(self, frame_index: u64) -> FramewiseError {
        match self {
            SharedFailure::Timeout(timeout) => FramewiseError::ExtractionTimeout {
                frame_index,
                timeout,
            },
            SharedFailure::Failed(reason) => FramewiseError::ExtractionFailed {
                frame_index,
                reason,
            },
        }
    }
}

type Outcome = Option<Result<ExtractedFrame, SharedFailure>>;

/// Handle to an extraction that is still running.
///
/// Any number of callers may hold a clone and [`wait`](PendingFrame::wait)
/// for the same result.
#[derive(Debug, Clone)]
pub struct PendingFrame {
    frame_index: u64,
    receiver: watch::Receiver<Outcome>,
}

impl PendingFrame {
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Wait for the extraction to finish.
    ///
    /// # Errors
    ///
    /// The extraction's own error, or
    /// [`FramewiseError::ExtractionFailed`] if it was abandoned before
    /// completing.
    pub async fn wait(mut self) -> Result<ExtractedFrame, FramewiseError> {
        let frame_index = self.frame_index;
        let outcome = match self.receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(failure)) => Err(failure.into_error(frame_index)),
            None => Err(FramewiseError::ExtractionFailed {
                frame_index,
                reason: "extraction was abandoned".to_string(),
            }),
        }
    }
}

struct PendingSlot {
    ticket: u64,
    receiver: watch::Receiver<Outcome>,
}

struct CacheState {
    entries: LruCache<u64, ExtractedFrame>,
    pending: HashMap<u64, PendingSlot>,
    next_ticket: u64,
}

/// Ownership of one pending marker. Completing it stores the result;
/// dropping it unfinished withdraws the marker.
struct Claim {
    cache: FrameCache,
    frame_index: u64,
    ticket: u64,
    sender: Option<watch::Sender<Outcome>>,
}

impl Claim {
    fn complete(mut self, result: &Result<ExtractedFrame, FramewiseError>) {
        let Some(sender) = self.sender.take() else {
            return;
        };

        {
            let mut state = self.cache.state();
            if self.withdraw(&mut state) {
                match result {
                    Ok(frame) => state.insert(self.frame_index, frame.clone()),
                    Err(error) => log::warn!("Extraction of frame {} failed: {error}", self.frame_index),
                }
            } else {
                log::debug!("Discarding stale result for frame {}", self.frame_index);
            }
        }

        let outcome = match result {
            Ok(frame) => Ok(frame.clone()),
            Err(error) => Err(SharedFailure::from_error(error)),
        };
        sender.send_replace(Some(outcome));
    }

    /// Remove the pending marker if it is still ours.
    fn withdraw(&self, state: &mut CacheState) -> bool {
        let owned = state
            .pending
            .get(&self.frame_index)
            .is_some_and(|slot| slot.ticket == self.ticket);
        if owned {
            state.pending.remove(&self.frame_index);
        }
        owned
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if self.sender.is_some() {
            let mut state = self.cache.state();
            self.withdraw(&mut state);
        }
    }
}

enum Lookup {
    Hit(ExtractedFrame),
    Join(PendingFrame),
    Claimed(Claim),
}

impl CacheState {
    fn insert(&mut self, frame_index: u64, frame: ExtractedFrame) {
        if let Some((evicted, _)) = self.entries.push(frame_index, frame) {
            if evicted != frame_index {
                log::debug!("Evicted frame {evicted} from cache");
            }
        }
    }
}

/// Bounded, recency-ordered store of extracted frames.
///
/// `FrameCache` is a cheap handle: clones share the same entries. No lock
/// is held across an `.await`.
#[derive(Clone)]
pub struct FrameCache {
    inner: Arc<Mutex<CacheState>>,
}

impl Debug for FrameCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state();
        f.debug_struct("FrameCache")
            .field("len", &state.entries.len())
            .field("capacity", &state.entries.cap())
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl FrameCache {
    /// Create a cache holding at most `max_size` frames (minimum 1).
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                pending: HashMap::new(),
                next_ticket: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a frame, marking it most recently used on a hit.
    pub fn get(&self, frame_index: u64) -> Option<ExtractedFrame> {
        self.state().entries.get(&frame_index).cloned()
    }

    /// Store a frame as most recently used, evicting the least recently used
    /// entry if `frame_index` is new and the cache is full. Any extraction
    /// still pending for the index stops being tracked; its result will not
    /// overwrite this one.
    pub fn put(&self, frame_index: u64, frame: ExtractedFrame) {
        let mut state = self.state();
        state.pending.remove(&frame_index);
        state.insert(frame_index, frame);
    }

    /// Whether `frame_index` is cached. Does not affect recency.
    pub fn has(&self, frame_index: u64) -> bool {
        self.state().entries.contains(&frame_index)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state().entries.cap().get()
    }

    /// Number of extractions currently in flight.
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Cached indices ordered from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<u64> {
        let state = self.state();
        let mut keys: Vec<u64> = state.entries.iter().map(|(&key, _)| key).collect();
        keys.reverse();
        keys
    }

    /// Drop every cached frame and stop tracking in-flight extractions.
    ///
    /// Running extractions are not cancelled, but their results are
    /// discarded instead of stored.
    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.pending.clear();
    }

    /// Join the extraction already running for `frame_index`, if any.
    pub fn pending_request(&self, frame_index: u64) -> Option<PendingFrame> {
        self.state()
            .pending
            .get(&frame_index)
            .map(|slot| PendingFrame {
                frame_index,
                receiver: slot.receiver.clone(),
            })
    }

    fn claim(&self, state: &mut CacheState, frame_index: u64) -> Claim {
        let (sender, receiver) = watch::channel(None);
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.pending.insert(frame_index, PendingSlot { ticket, receiver });

        Claim {
            cache: self.clone(),
            frame_index,
            ticket,
            sender: Some(sender),
        }
    }

    fn lookup(&self, frame_index: u64) -> Lookup {
        let mut state = self.state();
        if let Some(frame) = state.entries.get(&frame_index) {
            return Lookup::Hit(frame.clone());
        }
        if let Some(slot) = state.pending.get(&frame_index) {
            return Lookup::Join(PendingFrame {
                frame_index,
                receiver: slot.receiver.clone(),
            });
        }
        Lookup::Claimed(self.claim(&mut state, frame_index))
    }

    /// Return `frame_index` from the cache, from the extraction already
    /// running for it, or by running `fetch` and caching the result.
    ///
    /// Concurrent calls for the same uncached index run `fetch` once.
    pub async fn get_or_extract<F, Fut>(
        &self,
        frame_index: u64,
        fetch: F,
    ) -> Result<ExtractedFrame, FramewiseError>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<ExtractedFrame, FramewiseError>>,
    {
        match self.lookup(frame_index) {
            Lookup::Hit(frame) => Ok(frame),
            Lookup::Join(pending) => {
                log::debug!("Joining in-flight extraction of frame {frame_index}");
                pending.wait().await
            }
            Lookup::Claimed(claim) => {
                let result = fetch(frame_index).await;
                claim.complete(&result);
                result
            }
        }
    }

    /// Speculatively extract the frames around `current_index`.
    ///
    /// For each distance `i` in `1..=radius`, schedules `current_index + i`
    /// and then `current_index - i`, skipping indices outside
    /// `[0, total_frames)`, already cached, or already in flight. Distances
    /// past either end of the video are never visited. Scheduled
    /// extractions run on spawned Tokio tasks; a success is cached, a
    /// failure is logged and leaves the slot empty for a later on-demand
    /// retry. Returns the scheduled indices in scheduling order.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn prefetch<F, Fut>(
        &self,
        current_index: u64,
        total_frames: u64,
        fetch: F,
        radius: u64,
    ) -> Vec<u64>
    where
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<ExtractedFrame, FramewiseError>> + Send + 'static,
    {
        let reach = if total_frames == 0 {
            0
        } else {
            current_index.max(total_frames.saturating_sub(current_index.saturating_add(1)))
        };
        let radius = radius.min(reach);

        let mut candidates = Vec::new();
        for distance in 1..=radius {
            if let Some(forward) = current_index.checked_add(distance) {
                candidates.push(forward);
            }
            if let Some(backward) = current_index.checked_sub(distance) {
                candidates.push(backward);
            }
        }

        let mut scheduled = Vec::new();
        for frame_index in candidates {
            if frame_index >= total_frames {
                continue;
            }

            let claim = {
                let mut state = self.state();
                if state.entries.contains(&frame_index) || state.pending.contains_key(&frame_index) {
                    continue;
                }
                self.claim(&mut state, frame_index)
            };

            let extraction = fetch(frame_index);
            tokio::spawn(async move {
                let result = extraction.await;
                claim.complete(&result);
            });
            scheduled.push(frame_index);
        }

        if !scheduled.is_empty() {
            log::debug!("Prefetching frames {scheduled:?} around {current_index}");
        }
        scheduled
    }
}
