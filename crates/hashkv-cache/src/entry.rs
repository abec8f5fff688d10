use hashkv_core::Bucket;

/// Sentinel index for the head of the `used` (MRU-at-front) ring.
pub const USED: usize = 0;
/// Sentinel index for the head of the `free` ring (unused slots).
pub const FREE: usize = 1;

/// A slot in the fixed-size LRU arena: either a sentinel (no `bucket`) or a
/// cached bucket, linked into one of the two circular rings via index-based
/// `prev`/`next` rather than heap pointers (see Design Notes — arena of
/// entries instead of `Box`-per-node).
pub struct CacheEntry {
    pub prev: usize,
    pub next: usize,
    pub bucket: Option<Bucket>,
}

impl CacheEntry {
    fn self_linked(index: usize) -> Self {
        CacheEntry {
            prev: index,
            next: index,
            bucket: None,
        }
    }
}

/// Arena of [`CacheEntry`] slots forming two sentinel-headed circular
/// doubly-linked lists: `used` (recency order, MRU immediately after the
/// sentinel) and `free` (a pool of slots not currently holding a bucket).
pub struct EntryArena {
    entries: Vec<CacheEntry>,
}

impl EntryArena {
    /// Builds an arena with `capacity` pre-allocated slots, all on `free`.
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity + 2);
        entries.push(CacheEntry::self_linked(USED));
        entries.push(CacheEntry::self_linked(FREE));
        for i in 0..capacity {
            entries.push(CacheEntry::self_linked(i + 2));
        }

        let mut arena = EntryArena { entries };
        for i in 0..capacity {
            arena.splice_after(i + 2, FREE);
        }
        arena
    }

    pub fn capacity(&self) -> usize {
        self.entries.len() - 2
    }

    pub fn get(&self, index: usize) -> &CacheEntry {
        &self.entries[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut CacheEntry {
        &mut self.entries[index]
    }

    /// Index of the most-recently-used real slot, or `USED` if the `used`
    /// ring is empty (no real slot follows the sentinel).
    pub fn mru(&self) -> usize {
        self.entries[USED].next
    }

    /// Index of the least-recently-used real slot, or `USED` if empty.
    pub fn lru(&self) -> usize {
        self.entries[USED].prev
    }

    pub fn take_free(&self) -> usize {
        self.entries[FREE].next
    }

    pub fn has_free(&self) -> bool {
        self.entries[FREE].next != FREE
    }

    pub fn is_used_empty(&self) -> bool {
        self.entries[USED].next == USED
    }

    /// Removes entry `index` from whichever ring it is in and reinserts it
    /// immediately after `dest` (which must be a sentinel or a slot already
    /// in the destination ring).
    pub fn splice_after(&mut self, index: usize, dest: usize) {
        let (e_next, e_prev) = (self.entries[index].next, self.entries[index].prev);
        self.entries[e_next].prev = e_prev;
        self.entries[e_prev].next = e_next;

        let dest_next = self.entries[dest].next;
        self.entries[index].next = dest_next;
        self.entries[index].prev = dest;
        self.entries[dest_next].prev = index;
        self.entries[dest].next = index;
    }

    /// Iterates real slot indices on the `used` ring from MRU to LRU.
    pub fn used_iter(&self) -> UsedIter<'_> {
        UsedIter {
            arena: self,
            current: self.entries[USED].next,
        }
    }
}

pub struct UsedIter<'a> {
    arena: &'a EntryArena,
    current: usize,
}

impl<'a> Iterator for UsedIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current == USED {
            return None;
        }
        let index = self.current;
        self.current = self.arena.entries[index].next;
        Some(index)
    }
}
