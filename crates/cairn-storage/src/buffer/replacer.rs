//! LRU-K eviction policy for the buffer pool.
//!
//! LRU-K ranks frames by the time of their K-th most recent access rather
//! than their most recent one, so a page touched once by a scan does not
//! push out a page that is used over and over.
//!
//! Tracked frames that are currently evictable fall into two classes:
//!
//! 1. **Cold**: fewer than K recorded accesses. Their backward K-distance
//!    is infinite, so they always go before any hot frame. Among cold
//!    frames the one whose first access is oldest goes first.
//! 2. **Hot**: K or more accesses. The frame whose K-th most recent access
//!    is oldest goes first.
//!
//! A frame never moves from hot back to cold. Its history survives being
//! marked non-evictable and is dropped only on eviction or removal.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use parking_lot::Mutex;

use super::error::{BufferError, BufferResult};
use super::frame::FrameId;

/// Access history of one frame.
#[derive(Debug)]
struct FrameRecord {
    /// The last K access timestamps, oldest first.
    history: VecDeque<u64>,
    /// Total number of recorded accesses.
    hits: usize,
    evictable: bool,
}

impl FrameRecord {
    /// Ranking timestamp: first access while cold, K-th most recent once hot.
    /// Both are the oldest timestamp still kept.
    fn rank(&self) -> u64 {
        self.history.front().copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct ReplacerState {
    records: HashMap<FrameId, FrameRecord>,
    /// Evictable frames with fewer than K accesses, keyed by rank.
    cold: BTreeSet<(u64, FrameId)>,
    /// Evictable frames with at least K accesses, keyed by rank.
    hot: BTreeSet<(u64, FrameId)>,
    current_timestamp: u64,
}

impl ReplacerState {
    fn class_mut(&mut self, hits: usize, k: usize) -> &mut BTreeSet<(u64, FrameId)> {
        if hits >= k {
            &mut self.hot
        } else {
            &mut self.cold
        }
    }

    fn admit(&mut self, frame_id: FrameId, k: usize) {
        if let Some((hits, rank)) = self.records.get(&frame_id).map(|r| (r.hits, r.rank())) {
            self.class_mut(hits, k).insert((rank, frame_id));
        }
    }

    fn withdraw(&mut self, frame_id: FrameId, k: usize) {
        if let Some((hits, rank)) = self.records.get(&frame_id).map(|r| (r.hits, r.rank())) {
            self.class_mut(hits, k).remove(&(rank, frame_id));
        }
    }
}

/// LRU-K page replacement policy.
///
/// Every operation takes one internal mutex, so each is atomic with respect
/// to the others.
///
/// # Example
///
/// ```
/// use cairn_storage::buffer::{FrameId, LruKReplacer};
///
/// let replacer = LruKReplacer::new(8, 2);
/// for f in [0, 1, 0, 2] {
///     replacer.record_access(FrameId::new(f));
///     replacer.set_evictable(FrameId::new(f), true);
/// }
/// // Frame 0 has two accesses; frames 1 and 2 are still cold.
/// assert_eq!(replacer.evict(), Some(FrameId::new(1)));
/// assert_eq!(replacer.evict(), Some(FrameId::new(2)));
/// assert_eq!(replacer.evict(), Some(FrameId::new(0)));
/// assert_eq!(replacer.evict(), None);
/// ```
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    /// Number of frames in the buffer pool.
    num_frames: usize,
    /// History depth.
    k: usize,
}

impl LruKReplacer {
    /// Creates a replacer for frames `0..num_frames` with history depth `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "replacer k must be > 0");
        Self {
            state: Mutex::new(ReplacerState::default()),
            num_frames,
            k,
        }
    }

    /// Records an access to `frame_id` at the next logical timestamp.
    ///
    /// An untracked frame starts out non-evictable. The evictable flag of a
    /// tracked frame is left as is.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is outside the pool.
    pub fn record_access(&self, frame_id: FrameId) {
        self.check_frame(frame_id);
        let k = self.k;
        let mut state = self.state.lock();

        state.current_timestamp += 1;
        let now = state.current_timestamp;

        let evictable = state.records.get(&frame_id).is_some_and(|r| r.evictable);
        if evictable {
            state.withdraw(frame_id, k);
        }

        let record = state.records.entry(frame_id).or_insert_with(|| FrameRecord {
            history: VecDeque::with_capacity(k),
            hits: 0,
            evictable: false,
        });
        record.history.push_back(now);
        if record.history.len() > k {
            record.history.pop_front();
        }
        record.hits += 1;

        if evictable {
            state.admit(frame_id, k);
        }
    }

    /// Adds `frame_id` to or withdraws it from the victim candidates.
    ///
    /// Access history is kept either way. Untracked frames are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.check_frame(frame_id);
        let k = self.k;
        let mut state = self.state.lock();

        let Some(record) = state.records.get_mut(&frame_id) else {
            return;
        };
        if record.evictable == evictable {
            return;
        }
        record.evictable = evictable;

        if evictable {
            state.admit(frame_id, k);
        } else {
            state.withdraw(frame_id, k);
        }
    }

    /// Returns the frame [`evict`](Self::evict) would choose, leaving it
    /// tracked and evictable.
    pub fn victim(&self) -> Option<FrameId> {
        let state = self.state.lock();
        state
            .cold
            .first()
            .or_else(|| state.hot.first())
            .map(|&(_, frame_id)| frame_id)
    }

    /// Picks a victim, forgets its history and returns it.
    ///
    /// Cold frames go before hot ones; within a class the lowest rank goes.
    /// Returns `None` if no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();

        let (_, frame_id) = match state.cold.pop_first() {
            Some(entry) => entry,
            None => state.hot.pop_first()?,
        };
        state.records.remove(&frame_id);
        Some(frame_id)
    }

    /// Forgets `frame_id` entirely, for a page that is being deleted.
    ///
    /// Removing an untracked frame does nothing. Removing a tracked frame
    /// that is not evictable is an error.
    pub fn remove(&self, frame_id: FrameId) -> BufferResult<()> {
        self.check_frame(frame_id);
        let k = self.k;
        let mut state = self.state.lock();

        let Some(evictable) = state.records.get(&frame_id).map(|r| r.evictable) else {
            return Ok(());
        };
        if !evictable {
            return Err(BufferError::FrameNotEvictable { frame_id });
        }

        state.withdraw(frame_id, k);
        state.records.remove(&frame_id);
        Ok(())
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.cold.len() + state.hot.len()
    }

    /// Returns the history depth.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the number of frames this replacer covers.
    pub fn capacity(&self) -> usize {
        self.num_frames
    }

    /// Total recorded accesses of a tracked frame.
    pub fn access_count(&self, frame_id: FrameId) -> Option<usize> {
        self.state.lock().records.get(&frame_id).map(|r| r.hits)
    }

    /// Evictable flag of a tracked frame.
    pub fn is_evictable(&self, frame_id: FrameId) -> Option<bool> {
        self.state.lock().records.get(&frame_id).map(|r| r.evictable)
    }

    fn check_frame(&self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.num_frames,
            "frame {} outside replacer range 0..{}",
            frame_id,
            self.num_frames
        );
    }
}

impl fmt::Debug for LruKReplacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LruKReplacer")
            .field("num_frames", &self.num_frames)
            .field("k", &self.k)
            .field("tracked", &state.records.len())
            .field("cold", &state.cold.len())
            .field("hot", &state.hot.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(id: usize) -> FrameId {
        FrameId::new(id)
    }

    fn access_all(replacer: &LruKReplacer, frames: &[usize]) {
        for &id in frames {
            replacer.record_access(f(id));
        }
    }

    fn make_evictable(replacer: &LruKReplacer, frames: &[usize]) {
        for &id in frames {
            replacer.set_evictable(f(id), true);
        }
    }

    #[test]
    fn test_cold_before_hot() {
        let replacer = LruKReplacer::new(8, 2);
        // A, B, A, C
        access_all(&replacer, &[0, 1, 0, 2]);
        make_evictable(&replacer, &[0, 1, 2]);
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(2)));
        assert_eq!(replacer.evict(), Some(f(0)));
        assert_eq!(replacer.evict(), None);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_victim_leaves_frame_tracked() {
        let replacer = LruKReplacer::new(8, 2);
        access_all(&replacer, &[0, 0, 1]);
        make_evictable(&replacer, &[0]);

        // Only the hot frame is evictable.
        assert_eq!(replacer.victim(), Some(f(0)));
        assert_eq!(replacer.victim(), Some(f(0)));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.access_count(f(0)), Some(2));

        make_evictable(&replacer, &[1]);
        assert_eq!(replacer.victim(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(0)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_cold_ranked_by_first_access() {
        let replacer = LruKReplacer::new(8, 3);
        access_all(&replacer, &[0, 1, 0, 2]);
        make_evictable(&replacer, &[0, 1, 2]);

        // All cold (k = 3); frame 0 was seen first even though it was
        // touched again later.
        assert_eq!(replacer.evict(), Some(f(0)));
        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(2)));
    }

    #[test]
    fn test_hot_ranked_by_kth_recent_access() {
        let replacer = LruKReplacer::new(8, 2);
        // ts: 0@1 1@2 0@3 1@4 0@5 -> frame 0 k-distance ts 3, frame 1 ts 2
        access_all(&replacer, &[0, 1, 0, 1, 0]);
        make_evictable(&replacer, &[0, 1]);

        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(0)));
    }

    #[test]
    fn test_access_while_evictable_updates_rank() {
        let replacer = LruKReplacer::new(8, 2);
        access_all(&replacer, &[0, 0, 1, 1]);
        make_evictable(&replacer, &[0, 1]);

        // Frame 0 ranks at ts 1, frame 1 at ts 3. Two more accesses move
        // frame 0's second-most-recent access to ts 5.
        replacer.record_access(f(0));
        replacer.record_access(f(0));
        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(0)));
    }

    #[test]
    fn test_set_evictable_keeps_history() {
        let replacer = LruKReplacer::new(8, 2);
        access_all(&replacer, &[0, 0, 1]);
        make_evictable(&replacer, &[0, 1]);

        replacer.set_evictable(f(0), false);
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.access_count(f(0)), Some(2));

        replacer.set_evictable(f(0), true);
        replacer.set_evictable(f(0), true);
        assert_eq!(replacer.size(), 2);

        // Frame 0 returns as hot, so cold frame 1 still goes first.
        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(0)));
    }

    #[test]
    fn test_non_evictable_frames_are_skipped() {
        let replacer = LruKReplacer::new(4, 2);
        access_all(&replacer, &[0, 1, 2]);
        make_evictable(&replacer, &[1]);

        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), None);
        assert_eq!(replacer.is_evictable(f(0)), Some(false));
    }

    #[test]
    fn test_eviction_forgets_history() {
        let replacer = LruKReplacer::new(4, 2);
        access_all(&replacer, &[0, 0]);
        make_evictable(&replacer, &[0]);
        assert_eq!(replacer.evict(), Some(f(0)));
        assert_eq!(replacer.access_count(f(0)), None);

        // Re-tracked from scratch: cold again.
        access_all(&replacer, &[1, 0]);
        make_evictable(&replacer, &[0, 1]);
        assert_eq!(replacer.evict(), Some(f(1)));
    }

    #[test]
    fn test_set_evictable_untracked_is_noop() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.set_evictable(f(3), true);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_remove() {
        let replacer = LruKReplacer::new(4, 2);
        access_all(&replacer, &[0, 1]);
        make_evictable(&replacer, &[0]);

        replacer.remove(f(0)).unwrap();
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.access_count(f(0)), None);

        // Untracked: nothing to do.
        replacer.remove(f(2)).unwrap();

        // Tracked but pinned.
        let err = replacer.remove(f(1)).unwrap_err();
        assert!(matches!(err, BufferError::FrameNotEvictable { frame_id } if frame_id == f(1)));
        assert_eq!(replacer.access_count(f(1)), Some(1));
    }

    #[test]
    fn test_k_equals_one_is_lru() {
        let replacer = LruKReplacer::new(4, 1);
        access_all(&replacer, &[0, 1, 2, 0]);
        make_evictable(&replacer, &[0, 1, 2]);
        assert_eq!(replacer.evict(), Some(f(1)));
        assert_eq!(replacer.evict(), Some(f(2)));
        assert_eq!(replacer.evict(), Some(f(0)));
    }

    #[test]
    #[should_panic(expected = "outside replacer range")]
    fn test_out_of_range_frame_panics() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(f(4));
    }
}
