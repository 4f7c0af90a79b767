//! In-memory caches shared between the render thread and tile loaders.
//!
//! # Implementations
//!
//! - [`MemoryCache`]: size-bounded LRU cache of reference-counted values
//! - [`MutexMap`]: unbounded map, used for tiles that must stay resident
//! - [`MutexSet`]: set of keys, used to de-duplicate in-flight requests
//!
//! Each container guards its whole contents with one lock. Values are handed
//! out as `Arc`s, so evicting an entry never invalidates a reader that
//! already holds it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

/// Values that report their memory footprint to a [`MemoryCache`].
pub trait Cacheable {
    fn size_in_bytes(&self) -> usize;
}

/// A size-bounded, least-recently-used cache.
///
/// When an insertion would exceed the capacity, the least recently used
/// entries are evicted until the cache is at or below its low-water mark.
/// A value larger than the whole capacity is refused, so [`Self::size`]
/// never exceeds [`Self::capacity`].
/// Cloning the cache yields another handle to the same storage.
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    data: Arc<Mutex<MemoryCacheInner<K, V>>>,
    capacity: usize,
    low_water: usize,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    size: usize,
    stamp: u64,
}

#[derive(Debug)]
struct MemoryCacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys by last access stamp, least recently used first.
    order: BTreeMap<u64, K>,
    next_stamp: u64,
    current_size: usize,
}

impl<K: Eq + Hash + Clone, V> MemoryCacheInner<K, V> {
    fn stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.stamp);
        self.current_size -= entry.size;
        Some(entry)
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Cacheable,
{
    /// Create a cache that evicts down to 80% of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_low_water(capacity, capacity / 5 * 4)
    }

    #[must_use]
    pub fn with_low_water(capacity: usize, low_water: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(MemoryCacheInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_stamp: 0,
                current_size: 0,
            })),
            capacity,
            low_water: low_water.min(capacity),
        }
    }

    /// Look up an entry and mark it as most recently used.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut guard = self.data.lock();
        let cache = &mut *guard;
        let stamp = cache.stamp();
        let entry = cache.entries.get_mut(key)?;
        cache.order.remove(&entry.stamp);
        entry.stamp = stamp;
        cache.order.insert(stamp, key.clone());
        Some(Arc::clone(&entry.value))
    }

    /// Insert or replace an entry.
    ///
    /// Returns `false`, leaving the cache untouched, when the value alone is
    /// larger than the capacity.
    pub fn put(&self, key: K, value: Arc<V>) -> bool {
        let size = value.size_in_bytes();
        if size > self.capacity {
            tracing::debug!(size, capacity = self.capacity, "value larger than memory cache");
            return false;
        }
        let mut cache = self.data.lock();
        cache.remove(&key);

        if cache.current_size + size > self.capacity {
            let mut evicted = 0usize;
            while cache.current_size + size > self.low_water {
                let Some((_, oldest)) = cache.order.pop_first() else {
                    break;
                };
                if let Some(entry) = cache.entries.remove(&oldest) {
                    cache.current_size -= entry.size;
                    evicted += 1;
                }
            }
            tracing::trace!(evicted, size = cache.current_size, "memory cache eviction");
        }

        let stamp = cache.stamp();
        cache.order.insert(stamp, key.clone());
        cache.entries.insert(key, CacheEntry { value, size, stamp });
        cache.current_size += size;
        true
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.data.lock().entries.contains_key(key)
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.data.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        let mut cache = self.data.lock();
        cache.entries.clear();
        cache.order.clear();
        cache.current_size = 0;
    }

    /// Total size of cached values in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.lock().current_size
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            capacity: self.capacity,
            low_water: self.low_water,
        }
    }
}

/// A mutex-guarded map of shared values.
#[derive(Debug)]
pub struct MutexMap<K, V> {
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> MutexMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.entries.lock().insert(key, value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.entries.lock().remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K: Eq + Hash, V> Default for MutexMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A mutex-guarded set.
#[derive(Debug)]
pub struct MutexSet<K> {
    entries: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash> MutexSet<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashSet::new()),
        }
    }

    /// Add a key. Returns `false` if it was already present, which makes
    /// this the test-and-set for claiming a key.
    pub fn insert(&self, key: K) -> bool {
        self.entries.lock().insert(key)
    }

    pub fn remove(&self, key: &K) -> bool {
        self.entries.lock().remove(key)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K: Eq + Hash> Default for MutexSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Blob(Vec<u8>);

    impl Cacheable for Blob {
        fn size_in_bytes(&self) -> usize {
            self.0.len()
        }
    }

    fn blob(bytes: &[u8]) -> Arc<Blob> {
        Arc::new(Blob(bytes.to_vec()))
    }

    #[test]
    fn test_memory_cache_basic() {
        let cache = MemoryCache::new(100);

        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);

        cache.put("a", blob(&[1, 2, 3]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 3);
        assert_eq!(cache.get(&"a").unwrap().0, vec![1, 2, 3]);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));

        assert!(cache.remove(&"a").is_some());
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_memory_cache_eviction() {
        // Evict straight to capacity.
        let cache = MemoryCache::with_low_water(10, 10);

        cache.put("a", blob(&[1, 2, 3, 4, 5]));
        cache.put("b", blob(&[6, 7, 8, 9, 10]));
        assert_eq!(cache.size(), 10);

        // Adding 3 more bytes evicts "a".
        cache.put("c", blob(&[11, 12, 13]));
        assert_eq!(cache.size(), 8);
        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn test_memory_cache_evicts_least_recently_used() {
        let cache = MemoryCache::with_low_water(10, 10);
        cache.put("a", blob(&[0; 4]));
        cache.put("b", blob(&[0; 4]));

        // Touching "a" makes "b" the eviction candidate.
        assert!(cache.get(&"a").is_some());
        cache.put("c", blob(&[0; 4]));
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
    }

    #[test]
    fn test_memory_cache_low_water() {
        let cache = MemoryCache::with_low_water(10, 4);
        for key in ["a", "b", "c", "d", "e"] {
            cache.put(key, blob(&[0; 2]));
        }
        assert_eq!(cache.size(), 10);

        // Overflow drains down to the low-water mark before inserting.
        cache.put("f", blob(&[0; 2]));
        assert_eq!(cache.size(), 4);
        assert!(cache.contains(&"e"));
        assert!(cache.contains(&"f"));
        assert!(!cache.contains(&"d"));
    }

    #[test]
    fn test_memory_cache_update_and_clear() {
        let cache = MemoryCache::new(100);
        cache.put("a", blob(&[1, 2, 3]));
        cache.put("a", blob(&[1, 2, 3, 4, 5]));
        assert_eq!(cache.size(), 5);
        assert_eq!(cache.len(), 1);

        cache.put("b", blob(&[4, 5, 6]));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_memory_cache_refuses_oversized_values() {
        let cache = MemoryCache::with_low_water(10, 10);
        cache.put("a", blob(&[0; 6]));

        assert!(!cache.put("big", blob(&[0; 11])));
        assert!(!cache.contains(&"big"));
        assert!(cache.contains(&"a"));
        assert_eq!(cache.size(), 6);

        // Exactly the capacity still fits, after evicting everything else.
        assert!(cache.put("full", blob(&[0; 10])));
        assert!(!cache.contains(&"a"));
        assert_eq!(cache.size(), 10);
    }

    #[test]
    fn test_memory_cache_recency_after_many_touches() {
        let cache = MemoryCache::with_low_water(6, 6);
        cache.put("a", blob(&[0; 2]));
        cache.put("b", blob(&[0; 2]));
        cache.put("c", blob(&[0; 2]));
        for _ in 0..5 {
            assert!(cache.get(&"a").is_some());
            assert!(cache.get(&"b").is_some());
        }

        cache.put("d", blob(&[0; 2]));
        assert!(!cache.contains(&"c"));
        cache.put("e", blob(&[0; 2]));
        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
        assert!(cache.contains(&"d"));
        assert!(cache.contains(&"e"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_evicted_value_outlives_cache_entry() {
        let cache = MemoryCache::with_low_water(4, 4);
        cache.put("a", blob(&[7; 4]));
        let held = cache.get(&"a").unwrap();

        cache.put("b", blob(&[0; 4]));
        assert!(!cache.contains(&"a"));
        assert_eq!(held.0, vec![7; 4]);
    }

    #[test]
    fn test_clone_shares_storage() {
        let cache = MemoryCache::new(100);
        let other = cache.clone();
        cache.put("a", blob(&[1]));
        assert!(other.contains(&"a"));
    }

    #[test]
    fn test_mutex_map() {
        let map = MutexMap::new();
        assert!(map.insert(1, Arc::new("one")).is_none());
        assert!(map.insert(1, Arc::new("uno")).is_some());
        assert_eq!(map.len(), 1);
        assert_eq!(*map.get(&1).unwrap(), "uno");
        assert!(map.contains_key(&1));
        assert!(map.remove(&1).is_some());
        assert!(map.is_empty());
    }

    #[test]
    fn test_mutex_set_claims_once() {
        let set = MutexSet::new();
        assert!(set.insert("k"));
        assert!(!set.insert("k"));
        assert!(set.contains(&"k"));
        assert_eq!(set.len(), 1);
        assert!(set.remove(&"k"));
        assert!(!set.remove(&"k"));
        assert!(set.is_empty());
    }
}
