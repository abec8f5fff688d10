use std::collections::HashMap;

use hashkv_core::BucketPath;

const ROOT: usize = 0;

struct TrieNode {
    entry: Option<usize>,
    parent: Option<usize>,
    children: HashMap<String, usize>,
}

impl TrieNode {
    fn empty(parent: Option<usize>) -> Self {
        TrieNode {
            entry: None,
            parent,
            children: HashMap::new(),
        }
    }
}

/// Prefix trie keyed by two-character bucket-path segments. Each node
/// holds at most one cache-entry slot index; the trie does not own the
/// bucket itself, only a back-reference into the [`EntryArena`](crate::entry::EntryArena).
pub struct CacheTrie {
    nodes: Vec<TrieNode>,
}

impl CacheTrie {
    pub fn new() -> Self {
        CacheTrie {
            nodes: vec![TrieNode::empty(None)],
        }
    }

    /// Assigns `entry` to the node at the end of `path`, creating
    /// intermediate nodes as needed. Silently displaces any entry
    /// previously occupying that node (callers must already have removed
    /// it from the LRU rings).
    pub fn insert(&mut self, path: &BucketPath, entry: usize) {
        let mut node = ROOT;
        let mut remainder = BucketPath::new(path.as_str());

        loop {
            let (segment, rest) = remainder.step();
            if segment.is_empty() {
                break;
            }

            node = match self.nodes[node].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::empty(Some(node)));
                    self.nodes[node].children.insert(segment.to_string(), child);
                    child
                }
            };

            remainder = rest;
        }

        self.nodes[node].entry = Some(entry);
    }

    /// Walks as deep as possible along `path`, returning the last entry
    /// encountered (not necessarily at the terminal node) — this is what
    /// lets a lookup for a long id hit a shallower, not-yet-split ancestor
    /// bucket.
    pub fn find(&self, path: &BucketPath) -> Option<usize> {
        let mut node = ROOT;
        let mut best = self.nodes[ROOT].entry;
        let mut remainder = BucketPath::new(path.as_str());

        loop {
            let (segment, rest) = remainder.step();
            if segment.is_empty() {
                break;
            }

            match self.nodes[node].children.get(segment) {
                Some(&child) => {
                    node = child;
                    if let Some(entry) = self.nodes[node].entry {
                        best = Some(entry);
                    }
                    remainder = rest;
                }
                None => break,
            }
        }

        best
    }

    /// Walks to the deepest node matching `path`, clears its entry slot,
    /// then prunes empty trailing nodes back up the parent chain (stopping
    /// at any ancestor that still has children or its own entry).
    pub fn remove(&mut self, path: &BucketPath) -> Option<usize> {
        let mut node = ROOT;
        let mut segments: Vec<String> = Vec::new();
        let mut remainder = BucketPath::new(path.as_str());

        loop {
            let (segment, rest) = remainder.step();
            if segment.is_empty() {
                break;
            }

            match self.nodes[node].children.get(segment) {
                Some(&child) => {
                    segments.push(segment.to_string());
                    node = child;
                    remainder = rest;
                }
                None => break,
            }
        }

        let removed = self.nodes[node].entry.take();

        while self.nodes[node].children.is_empty()
            && self.nodes[node].entry.is_none()
            && !segments.is_empty()
        {
            let parent = match self.nodes[node].parent {
                Some(p) => p,
                None => break,
            };
            let last_segment = segments.pop().unwrap();
            self.nodes[parent].children.remove(&last_segment);
            node = parent;
        }

        removed
    }
}

impl Default for CacheTrie {
    fn default() -> Self {
        Self::new()
    }
}
