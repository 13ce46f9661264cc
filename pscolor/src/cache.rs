//! Caches shared by all conversions of a [`Context`](crate::Context).
//!
//! Every cache is keyed by content (a 128-bit hash of procedure tokens or profile bytes),
//! so two equal procedures or profiles share one entry no matter where they come from.

use crate::color::icc::IccProfile;
use crate::object::{Stream, StreamId};
use log::{debug, trace};
use moxcms::ColorProfile;
use pscolor_postscript::{DecodeTable, Procedure};
use rustc_hash::FxHashMap;
use siphasher::sip128::{Hasher128, SipHasher13};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

/// Compute the content hash of some bytes.
pub(crate) fn hash128(data: &[u8]) -> u128 {
    let mut hasher = SipHasher13::new();
    data.hash(&mut hasher);
    hasher.finish128().as_u128()
}

/// A map whose values are computed once per key.
pub(crate) struct Memo<K, V>(Mutex<FxHashMap<K, V>>);

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self(Mutex::new(FxHashMap::default()))
    }
}

impl<K: Hash + Eq, V: Clone> Memo<K, V> {
    /// Return the value stored for `key`, computing it with `f` if it doesn't exist yet.
    ///
    /// The lock is not held while `f` runs, so `f` may use the cache itself.
    pub(crate) fn get_or_insert_with(&self, key: K, f: impl FnOnce() -> V) -> V {
        if let Some(value) = self.lock().get(&key) {
            return value.clone();
        }

        let value = f();

        self.lock().entry(key).or_insert(value).clone()
    }

    /// Like [`Memo::get_or_insert_with`], but empties the map first if it already holds
    /// `limit` entries.
    pub(crate) fn get_or_insert_bounded(&self, key: K, limit: usize, f: impl FnOnce() -> V) -> V {
        {
            let mut map = self.lock();

            if let Some(value) = map.get(&key) {
                return value.clone();
            }

            if map.len() >= limit {
                debug!("memo reached {limit} entries, clearing");
                map.clear();
            }
        }

        self.get_or_insert_with(key, f)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<K, V>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K, V> std::fmt::Debug for Memo<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memo {{..}}")
    }
}

/// The number of stream hashes kept before the map is emptied. Stream ids are unique per
/// stream, so the map would otherwise grow with every image of a job.
const MAX_STREAM_HASHES: usize = 4096;

/// The key of a single converted color: the profile hash, the number of components and the
/// components quantized to 8 bit.
pub(crate) type ColorKey = (u128, u8, [u8; 4]);

struct ColorEntry {
    rgb: [f32; 3],
    last_used: u64,
}

/// A bounded cache of converted colors.
///
/// Once `capacity` is reached, the least recently used quarter of the entries is evicted.
pub(crate) struct ColorCache {
    capacity: usize,
    clock: u64,
    entries: FxHashMap<ColorKey, ColorEntry>,
}

impl ColorCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            clock: 0,
            entries: FxHashMap::default(),
        }
    }

    pub(crate) fn get(&mut self, key: &ColorKey) -> Option<[f32; 3]> {
        self.clock += 1;
        let entry = self.entries.get_mut(key)?;
        entry.last_used = self.clock;

        Some(entry.rgb)
    }

    pub(crate) fn insert(&mut self, key: ColorKey, rgb: [f32; 3]) {
        if self.capacity == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict();
        }

        self.clock += 1;
        self.entries.insert(
            key,
            ColorEntry {
                rgb,
                last_used: self.clock,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict(&mut self) {
        let count = (self.entries.len() / 4).max(1);

        let mut stamps = self
            .entries
            .values()
            .map(|e| e.last_used)
            .collect::<Vec<_>>();
        stamps.sort_unstable();

        // Stamps are unique, so this removes exactly `count` entries.
        let threshold = stamps[count - 1];
        self.entries.retain(|_, e| e.last_used > threshold);

        debug!("evicted {count} entries from the ICC color cache");
    }
}

struct Repr {
    decode_tables: Memo<u128, Arc<DecodeTable>>,
    stream_hashes: Memo<StreamId, u128>,
    profiles: Memo<u128, Option<Arc<ColorProfile>>>,
    transforms: Memo<(u128, usize), Option<IccProfile>>,
    colors: Mutex<ColorCache>,
}

/// The caches of a [`Context`](crate::Context).
///
/// Cloning a cache is cheap, clones share their entries.
#[derive(Clone)]
pub struct Cache(Arc<Repr>);

impl Cache {
    /// Create new, empty caches. `icc_color_cache_size` bounds the number of cached
    /// single-color ICC conversions.
    pub fn new(icc_color_cache_size: usize) -> Self {
        Self(Arc::new(Repr {
            decode_tables: Memo::default(),
            stream_hashes: Memo::default(),
            profiles: Memo::default(),
            transforms: Memo::default(),
            colors: Mutex::new(ColorCache::new(icc_color_cache_size)),
        }))
    }

    /// Remove all entries from all caches.
    pub fn clear(&self) {
        self.0.decode_tables.clear();
        self.0.stream_hashes.clear();
        self.0.profiles.clear();
        self.0.transforms.clear();
        self.colors().clear();
    }

    /// The sampled table of a decode procedure.
    pub(crate) fn decode_table(&self, procedure: &Procedure) -> Arc<DecodeTable> {
        self.0
            .decode_tables
            .get_or_insert_with(procedure.content_hash(), || {
                trace!("building decode table");

                Arc::new(DecodeTable::new(procedure.clone()))
            })
    }

    /// The content hash of the data of a stream, computed once per stream.
    pub(crate) fn stream_hash(&self, stream: &Stream) -> u128 {
        self.0
            .stream_hashes
            .get_or_insert_bounded(stream.id(), MAX_STREAM_HASHES, || {
                hash128(stream.data())
            })
    }

    /// Build a transform from the profile with the given bytes and hash into sRGB.
    ///
    /// `on_failure` is only called the first time a profile turns out to be unusable.
    pub(crate) fn icc_profile(
        &self,
        hash: u128,
        data: &[u8],
        number_components: usize,
        on_failure: impl FnOnce(),
    ) -> Option<IccProfile> {
        self.0
            .transforms
            .get_or_insert_with((hash, number_components), || {
                let profile = self
                    .0
                    .profiles
                    .get_or_insert_with(hash, || {
                        ColorProfile::new_from_slice(data).ok().map(Arc::new)
                    })
                    .and_then(|p| IccProfile::new(hash, data, &p, number_components));

                if profile.is_none() {
                    on_failure();
                }

                profile
            })
    }

    pub(crate) fn cached_color(&self, key: &ColorKey) -> Option<[f32; 3]> {
        self.colors().get(key)
    }

    pub(crate) fn insert_color(&self, key: ColorKey, rgb: [f32; 3]) {
        self.colors().insert(key, rgb);
    }

    #[cfg(test)]
    fn decode_table_count(&self) -> usize {
        self.0.decode_tables.len()
    }

    fn colors(&self) -> MutexGuard<'_, ColorCache> {
        self.0.colors.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cache {{..}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_tables_are_shared_by_content() {
        let cache = Cache::default();
        let a = Procedure::parse(b"{ 1 exch sub }").unwrap();
        let b = Procedure::parse(b"{1 exch sub} bind").unwrap();

        let t1 = cache.decode_table(&a);
        let t2 = cache.decode_table(&b);

        assert!(Arc::ptr_eq(&t1, &t2));
        assert_eq!(cache.decode_table_count(), 1);

        cache.clear();
        assert_eq!(cache.decode_table_count(), 0);
    }

    #[test]
    fn identical_bytes_hash_identically() {
        let cache = Cache::default();
        let s1 = Stream::new(crate::object::Dict::new(), vec![1, 2, 3]);
        let s2 = Stream::new(crate::object::Dict::new(), vec![1, 2, 3]);

        assert_eq!(cache.stream_hash(&s1), cache.stream_hash(&s2));
        assert_ne!(cache.stream_hash(&s1), hash128(&[1, 2]));
    }

    #[test]
    fn stream_hashes_are_bounded() {
        let cache = Cache::default();
        let streams = (0..MAX_STREAM_HASHES + 10)
            .map(|i| Stream::new(crate::object::Dict::new(), vec![i as u8]))
            .collect::<Vec<_>>();

        for stream in &streams {
            cache.stream_hash(stream);
            assert!(cache.0.stream_hashes.len() <= MAX_STREAM_HASHES);
        }

        // Hashes computed after a reset are still correct.
        assert_eq!(cache.stream_hash(&streams[0]), hash128(&[0]));
    }

    #[test]
    fn bounded_memo_keeps_existing_keys() {
        let memo = Memo::<u8, u8>::default();
        memo.get_or_insert_bounded(1, 2, || 1);
        memo.get_or_insert_bounded(2, 2, || 2);

        // Present keys are returned without clearing.
        assert_eq!(memo.get_or_insert_bounded(1, 2, || 0), 1);
        assert_eq!(memo.len(), 2);

        assert_eq!(memo.get_or_insert_bounded(3, 2, || 3), 3);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn color_cache_is_bounded() {
        let mut cache = ColorCache::new(8);

        for i in 0..100u8 {
            cache.insert((0, 1, [i, 0, 0, 0]), [i as f32, 0.0, 0.0]);
            assert!(cache.len() <= 8);
        }

        // The most recent entry always survives.
        assert_eq!(cache.get(&(0, 1, [99, 0, 0, 0])), Some([99.0, 0.0, 0.0]));
    }

    #[test]
    fn color_cache_evicts_least_recently_used() {
        let mut cache = ColorCache::new(4);

        for i in 0..4u8 {
            cache.insert((0, 1, [i, 0, 0, 0]), [0.0; 3]);
        }

        // Touch the oldest entry, so the second one is evicted instead.
        assert!(cache.get(&(0, 1, [0, 0, 0, 0])).is_some());
        cache.insert((0, 1, [4, 0, 0, 0]), [0.0; 3]);

        assert_eq!(cache.len(), 4);
        assert!(cache.get(&(0, 1, [0, 0, 0, 0])).is_some());
        assert!(cache.get(&(0, 1, [1, 0, 0, 0])).is_none());
    }

    #[test]
    fn zero_sized_color_cache() {
        let mut cache = ColorCache::new(0);
        cache.insert((0, 1, [0; 4]), [1.0; 3]);

        assert_eq!(cache.len(), 0);
    }
}
