use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use hashkv_core::{Bucket, BucketPath, HashkvResult};

use crate::entry::{EntryArena, FREE, USED};
use crate::trie::CacheTrie;

/// Snapshot of cache hit/miss counters and current occupancy, returned by
/// [`BucketCache::stats`] and surfaced through `Store::info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// A bounded LRU cache of [`Bucket`]s, backed by a fixed-size arena of
/// slots (see [`EntryArena`]) and a [`CacheTrie`] for prefix lookup.
///
/// Lookup, eviction and redistribution are all expressed in terms of a
/// bucket's [`BucketPath`], never a raw id: a path is what the trie and
/// the arena understand, and `fetch`/`evict` derive it from the id they
/// are given.
pub struct BucketCache {
    arena: EntryArena,
    trie: CacheTrie,
    hits: AtomicU64,
    misses: AtomicU64,
    len: usize,
}

impl BucketCache {
    pub fn new(capacity: usize) -> Self {
        BucketCache {
            arena: EntryArena::new(capacity),
            trie: CacheTrie::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket(&self, idx: usize) -> &Bucket {
        self.arena
            .get(idx)
            .bucket
            .as_ref()
            .expect("cache slot index must hold a bucket")
    }

    pub fn bucket_mut(&mut self, idx: usize) -> &mut Bucket {
        self.arena
            .get_mut(idx)
            .bucket
            .as_mut()
            .expect("cache slot index must hold a bucket")
    }

    /// Trie lookup for `path`: on hit, moves the entry to MRU and counts a
    /// hit; on miss, counts a miss. This is the cache's only read of the
    /// trie — `fetch` builds on top of it.
    fn lookup(&mut self, path: &BucketPath) -> Option<usize> {
        match self.trie.find(path) {
            Some(idx) => {
                self.arena.splice_after(idx, USED);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(idx)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns the arena index of the bucket for `id`, loading it from
    /// disk via `loader` on a miss. The deepest cached ancestor of `id`
    /// satisfies a hit, per the trie's prefix-match semantics.
    pub fn fetch<F>(&mut self, id: &str, root: &Path, loader: F) -> HashkvResult<usize>
    where
        F: FnOnce(&Path, &str) -> HashkvResult<Bucket>,
    {
        let path = BucketPath::new(id);
        if let Some(idx) = self.lookup(&path) {
            return Ok(idx);
        }
        let bucket = loader(root, id)?;
        self.encache(bucket, root)
    }

    /// Inserts a freshly loaded bucket into the cache, evicting the LRU
    /// entry first if the cache is at capacity.
    fn encache(&mut self, bucket: Bucket, root: &Path) -> HashkvResult<usize> {
        let idx = if self.arena.has_free() {
            self.arena.take_free()
        } else {
            let lru = self.arena.lru();
            self.vacate(lru, root)?;
            lru
        };

        let path = bucket.path().clone();
        self.arena.get_mut(idx).bucket = Some(bucket);
        self.arena.splice_after(idx, USED);
        self.trie.insert(&path, idx);
        self.len += 1;
        Ok(idx)
    }

    /// Removes whatever occupies slot `idx` from the trie, frees the slot,
    /// and saves the bucket it held. The slot is freed before the save is
    /// attempted, so a save failure here leaves the cache structure
    /// consistent even though the bucket's pending writes are lost.
    fn vacate(&mut self, idx: usize, root: &Path) -> HashkvResult<()> {
        let path = self.arena.get(idx).bucket.as_ref().map(|b| b.path().clone());
        if let Some(path) = path {
            self.trie.remove(&path);
        }
        let bucket = self.arena.get_mut(idx).bucket.take();
        self.arena.splice_after(idx, FREE);
        self.len -= 1;
        if let Some(mut bucket) = bucket {
            bucket.save(root)?;
        }
        Ok(())
    }

    /// Removes the bucket for `id` from the cache, saves it, and returns
    /// the slot to the free pool. A no-op if `id` is not cached.
    pub fn evict(&mut self, id: &str, root: &Path) -> HashkvResult<()> {
        self.evict_owned(id, root).map(|_| ())
    }

    /// As [`BucketCache::evict`], but hands back ownership of the evicted
    /// bucket instead of discarding it. `Store::put` uses this to retain
    /// the bucket it is about to [`Bucket::split`] once it no longer
    /// lives in the cache.
    pub fn evict_owned(&mut self, id: &str, root: &Path) -> HashkvResult<Option<Bucket>> {
        let path = BucketPath::new(id);
        let idx = match self.trie.remove(&path) {
            Some(idx) => idx,
            None => return Ok(None),
        };
        let bucket = self.arena.get_mut(idx).bucket.take();
        self.arena.splice_after(idx, FREE);
        self.len -= 1;
        if let Some(mut bucket) = bucket {
            bucket.save(root)?;
            log::debug!("evicted bucket {id}");
            return Ok(Some(bucket));
        }
        Ok(None)
    }

    /// Saves every dirty bucket on the `used` list, walking from MRU to
    /// LRU. Saving a clean bucket is a no-op, so this is safe to call
    /// whether or not anything is actually dirty.
    pub fn flush(&mut self, root: &Path) -> HashkvResult<()> {
        let indices: Vec<usize> = self.arena.used_iter().collect();
        for idx in indices {
            self.arena
                .get_mut(idx)
                .bucket
                .as_mut()
                .expect("used slot holds a bucket")
                .save(root)?;
        }
        Ok(())
    }

    /// Drops all cached buckets and resets the trie without persisting
    /// anything. Unflushed writes are lost.
    pub fn clear(&mut self) {
        let capacity = self.arena.capacity();
        self.arena = EntryArena::new(capacity);
        self.trie = CacheTrie::new();
        self.len = 0;
        log::debug!("cache cleared ({capacity} slots)");
    }

    /// Flushes, then reinitializes the arena with a new capacity. Must
    /// not be called while a lookup is in flight elsewhere — callers are
    /// expected to hold whatever lock serializes cache structural access.
    pub fn set_max_buckets_cached(&mut self, n: usize, root: &Path) -> HashkvResult<()> {
        self.flush(root)?;
        self.arena = EntryArena::new(n);
        self.trie = CacheTrie::new();
        self.len = 0;
        Ok(())
    }

    /// Flushes every dirty bucket, then clears the cache.
    pub fn close(&mut self, root: &Path) -> HashkvResult<()> {
        self.flush(root)?;
        self.clear();
        log::debug!("cache closed");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len,
        }
    }
}
