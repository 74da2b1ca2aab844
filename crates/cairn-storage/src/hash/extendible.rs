//! Extendible hash table.
//!
//! Buckets live in an arena and directory slots hold arena indices, so any
//! number of slots can alias one bucket without duplicating its entries.
//! The slot for a key is the low `global_depth` bits of its hash.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use parking_lot::RwLock;

/// A bucket: up to `capacity` entries sharing the low `depth` hash bits.
struct Bucket<K, V> {
    depth: u32,
    /// Entries as `(hash, key, value)`; the hash is kept to redistribute on split.
    items: Vec<(u64, K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(depth: u32, capacity: usize) -> Self {
        Self {
            depth,
            items: Vec::with_capacity(capacity),
        }
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.items
            .iter()
            .find(|(_, k, _)| k == key)
            .map(|(_, _, v)| v)
    }

    fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.items
            .iter_mut()
            .find(|(_, k, _)| k == key)
            .map(|(_, _, v)| v)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let pos = self.items.iter().position(|(_, k, _)| k == key)?;
        Some(self.items.swap_remove(pos).2)
    }

    /// True when no split could separate these entries from `hash`.
    fn all_share_hash(&self, hash: u64) -> bool {
        self.items.iter().all(|(h, _, _)| *h == hash)
    }
}

struct Directory<K, V> {
    global_depth: u32,
    /// Slot -> index into `buckets`.
    slots: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
    len: usize,
}

impl<K: Eq, V> Directory<K, V> {
    fn slot_of(&self, hash: u64) -> usize {
        let mask = (1u64 << self.global_depth) - 1;
        (hash & mask) as usize
    }

    fn bucket_of(&self, hash: u64) -> usize {
        self.slots[self.slot_of(hash)]
    }

    /// Doubles the directory; slot `i + n` aliases the bucket of slot `i`.
    fn grow(&mut self) {
        self.slots.extend_from_within(..);
        self.global_depth += 1;
    }

    /// Splits bucket `idx` on its next hash bit.
    ///
    /// The old bucket keeps the entries and slots whose new bit is zero; a
    /// fresh bucket takes the rest. Both end up at the incremented depth.
    fn split(&mut self, idx: usize, capacity: usize) {
        let depth = self.buckets[idx].depth + 1;
        debug_assert!(depth <= self.global_depth);
        let high_bit = 1u64 << (depth - 1);

        let new_idx = self.buckets.len();
        self.buckets.push(Bucket::new(depth, capacity));

        let old_items = std::mem::take(&mut self.buckets[idx].items);
        self.buckets[idx].depth = depth;

        for (slot, target) in self.slots.iter_mut().enumerate() {
            if *target == idx && (slot as u64) & high_bit != 0 {
                *target = new_idx;
            }
        }

        for item in old_items {
            let dest = if item.0 & high_bit != 0 { new_idx } else { idx };
            self.buckets[dest].items.push(item);
        }
    }
}

/// Thread-safe extendible hash table.
///
/// `find` takes the table lock shared; `insert` and `remove` take it
/// exclusively, so a directory doubling or bucket split is never observed
/// half-done. Inserting never fails: a full bucket is split (doubling the
/// directory first when its local depth equals the global depth) until the
/// new entry fits.
///
/// # Example
///
/// ```
/// use cairn_storage::hash::ExtendibleHashTable;
///
/// let table = ExtendibleHashTable::new(2);
/// for i in 0..16u64 {
///     table.insert(i, i * 10);
/// }
/// assert_eq!(table.find(&7), Some(70));
/// assert!(table.global_depth() > 0);
/// ```
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    inner: RwLock<Directory<K, V>>,
    bucket_capacity: usize,
    hasher: S,
}

impl<K: Hash + Eq, V: Clone> ExtendibleHashTable<K, V, RandomState> {
    /// Creates an empty table whose buckets hold `bucket_capacity` entries.
    pub fn new(bucket_capacity: usize) -> Self {
        Self::with_hasher(bucket_capacity, RandomState::new())
    }
}

impl<K: Hash + Eq, V: Clone, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    /// Creates an empty table that hashes keys with `hasher`.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_capacity` is zero.
    pub fn with_hasher(bucket_capacity: usize, hasher: S) -> Self {
        assert!(bucket_capacity > 0, "bucket capacity must be > 0");
        Self {
            inner: RwLock::new(Directory {
                global_depth: 0,
                slots: vec![0],
                buckets: vec![Bucket::new(0, bucket_capacity)],
                len: 0,
            }),
            bucket_capacity,
            hasher,
        }
    }

    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    /// Looks up the value stored for `key`.
    pub fn find(&self, key: &K) -> Option<V> {
        let hash = self.hash(key);
        let dir = self.inner.read();
        let idx = dir.bucket_of(hash);
        dir.buckets[idx].find(key).cloned()
    }

    /// Inserts `key -> value`, replacing the value if the key is present.
    pub fn insert(&self, key: K, value: V) {
        let hash = self.hash(&key);
        let mut dir = self.inner.write();

        loop {
            let idx = dir.bucket_of(hash);
            let bucket = &mut dir.buckets[idx];

            if let Some(slot) = bucket.find_mut(&key) {
                *slot = value;
                return;
            }

            // A bucket whose entries all carry this exact hash can never be
            // split apart, so it is allowed to overflow.
            if bucket.items.len() < self.bucket_capacity || bucket.all_share_hash(hash) {
                bucket.items.push((hash, key, value));
                dir.len += 1;
                return;
            }

            if dir.buckets[idx].depth == dir.global_depth {
                dir.grow();
            }
            dir.split(idx, self.bucket_capacity);
        }
    }

    /// Removes `key`, returning true if it was present.
    pub fn remove(&self, key: &K) -> bool {
        let hash = self.hash(key);
        let mut dir = self.inner.write();
        let idx = dir.bucket_of(hash);
        let removed = dir.buckets[idx].remove(key).is_some();
        if removed {
            dir.len -= 1;
        }
        removed
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        let hash = self.hash(key);
        let dir = self.inner.read();
        let idx = dir.bucket_of(hash);
        dir.buckets[idx].find(key).is_some()
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.inner.read().len
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of hash bits used to pick a directory slot.
    pub fn global_depth(&self) -> u32 {
        self.inner.read().global_depth
    }

    /// Local depth of the bucket behind directory slot `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= 2^global_depth`.
    pub fn local_depth(&self, slot: usize) -> u32 {
        let dir = self.inner.read();
        dir.buckets[dir.slots[slot]].depth
    }

    /// Number of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        self.inner.read().buckets.len()
    }

    /// Maximum entries per bucket before it splits.
    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }
}

impl<K, V, S> fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = self.inner.read();
        f.debug_struct("ExtendibleHashTable")
            .field("len", &dir.len)
            .field("global_depth", &dir.global_depth)
            .field("num_buckets", &dir.buckets.len())
            .field("bucket_capacity", &self.bucket_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::{BuildHasherDefault, Hasher};
    use std::sync::Arc;
    use std::thread;

    /// Hashes a `u64` key to itself so tests control slot placement.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    type IdentityTable<V> = ExtendibleHashTable<u64, V, BuildHasherDefault<IdentityHasher>>;

    fn identity_table<V: Clone>(capacity: usize) -> IdentityTable<V> {
        ExtendibleHashTable::with_hasher(capacity, BuildHasherDefault::default())
    }

    /// Every slot agrees with its bucket on the bucket's low `depth` bits,
    /// and no bucket is deeper than the directory.
    fn check_invariants<V>(table: &IdentityTable<V>) {
        let dir = table.inner.read();
        assert_eq!(dir.slots.len(), 1 << dir.global_depth);
        for (slot, &idx) in dir.slots.iter().enumerate() {
            let bucket = &dir.buckets[idx];
            assert!(bucket.depth <= dir.global_depth);
            let mask = (1u64 << bucket.depth) - 1;
            for (hash, _, _) in &bucket.items {
                assert_eq!(hash & mask, slot as u64 & mask);
            }
        }
        let total: usize = dir.buckets.iter().map(|b| b.items.len()).sum();
        assert_eq!(total, dir.len);
    }

    #[test]
    fn test_insert_find_remove() {
        let table = ExtendibleHashTable::new(2);
        table.insert(1, "a".to_string());
        table.insert(2, "b".to_string());
        table.insert(3, "c".to_string());

        assert_eq!(table.find(&1).as_deref(), Some("a"));
        assert_eq!(table.find(&3).as_deref(), Some("c"));
        assert_eq!(table.find(&4), None);
        assert_eq!(table.len(), 3);

        assert!(table.remove(&2));
        assert!(!table.remove(&2));
        assert_eq!(table.find(&2), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_insert_is_idempotent_update() {
        let table = identity_table(2);
        table.insert(5, 1);
        table.insert(5, 2);
        assert_eq!(table.find(&5), Some(2));
        assert_eq!(table.len(), 1);
        assert_eq!(table.num_buckets(), 1);
    }

    #[test]
    fn test_overflowing_one_slot_splits_once() {
        // Global depth 0: every key lands in the single slot.
        let table = identity_table(2);
        table.insert(0, 0);
        table.insert(1, 1);
        assert_eq!(table.global_depth(), 0);
        assert_eq!(table.local_depth(0), 0);

        // One more key than the bucket holds.
        table.insert(2, 2);
        assert_eq!(table.global_depth(), 1);
        assert_eq!(table.local_depth(0), 1);
        assert_eq!(table.local_depth(1), 1);
        assert_eq!(table.num_buckets(), 2);

        for k in 0..3 {
            assert_eq!(table.find(&k), Some(k));
        }
        check_invariants(&table);
    }

    #[test]
    fn test_split_without_directory_growth() {
        let table = identity_table(2);
        // 0b000, 0b001, 0b010 -> depth 1, buckets {0, 2} and {1}
        for k in [0, 1, 2] {
            table.insert(k, k);
        }
        // Fill the odd bucket and grow it to depth 2.
        table.insert(3, 3);
        table.insert(5, 5);
        assert_eq!(table.global_depth(), 2);
        assert_eq!(table.local_depth(1), 2);
        assert_eq!(table.local_depth(3), 2);
        // Even bucket kept depth 1 and is shared by slots 0 and 2.
        assert_eq!(table.local_depth(0), 1);
        assert_eq!(table.local_depth(2), 1);

        // Overflowing the shared even bucket splits it without doubling.
        table.insert(4, 4);
        assert_eq!(table.global_depth(), 2);
        assert_eq!(table.local_depth(0), 2);
        assert_eq!(table.local_depth(2), 2);
        assert_eq!(table.num_buckets(), 4);

        for k in 0..6 {
            assert_eq!(table.find(&k), Some(k));
        }
        check_invariants(&table);
    }

    #[test]
    fn test_cascading_split() {
        // 0, 4, 8 share their low two bits; splitting must recurse.
        let table = identity_table(2);
        for k in [0, 4, 8] {
            table.insert(k, k);
        }
        assert_eq!(table.global_depth(), 3);
        for k in [0, 4, 8] {
            assert_eq!(table.find(&k), Some(k));
        }
        check_invariants(&table);
    }

    #[test]
    fn test_identical_hashes_overflow() {
        #[derive(Default)]
        struct ConstHasher;
        impl Hasher for ConstHasher {
            fn finish(&self) -> u64 {
                42
            }
            fn write(&mut self, _bytes: &[u8]) {}
        }

        let table: ExtendibleHashTable<u32, u32, BuildHasherDefault<ConstHasher>> =
            ExtendibleHashTable::with_hasher(2, BuildHasherDefault::default());
        for k in 0..10 {
            table.insert(k, k);
        }
        assert_eq!(table.len(), 10);
        assert_eq!(table.num_buckets(), 1);
        for k in 0..10 {
            assert_eq!(table.find(&k), Some(k));
        }
    }

    #[test]
    fn test_many_keys() {
        let table = ExtendibleHashTable::new(4);
        for i in 0..1000u64 {
            table.insert(i, i + 1);
        }
        assert_eq!(table.len(), 1000);
        for i in 0..1000u64 {
            assert_eq!(table.find(&i), Some(i + 1));
        }
        for i in (0..1000u64).step_by(2) {
            assert!(table.remove(&i));
        }
        assert_eq!(table.len(), 500);
        assert!(!table.contains(&0));
        assert!(table.contains(&1));
    }

    #[test]
    fn test_identity_invariants_after_many_inserts() {
        let table = identity_table(3);
        for i in 0..200u64 {
            table.insert(i.wrapping_mul(0x9E37_79B9), i);
        }
        check_invariants(&table);
        assert_eq!(table.len(), 200);
    }

    #[test]
    fn test_concurrent_inserts() {
        let table = Arc::new(ExtendibleHashTable::new(4));
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for i in 0..250u64 {
                        let key = t * 1000 + i;
                        table.insert(key, key);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(table.len(), 1000);
        for t in 0..4u64 {
            for i in 0..250u64 {
                let key = t * 1000 + i;
                assert_eq!(table.find(&key), Some(key));
            }
        }
    }
}
