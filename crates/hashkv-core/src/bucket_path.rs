use std::path::PathBuf;

const SEGMENT_LEN: usize = 2;

/// A prefix of a bucket ID that names a bucket's position on disk.
///
/// Stepped two hex characters at a time; the trailing segment may be a
/// single character. `render` turns a path into a filesystem location by
/// joining each non-terminal segment as a directory and leaving the final
/// segment as the leaf name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketPath(String);

impl BucketPath {
    pub fn new(id: impl Into<String>) -> Self {
        BucketPath(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Splits off the next two-character segment (or one, at the tail),
    /// returning the segment and the remaining path. Returns two empty
    /// strings once the path is exhausted.
    pub fn step(&self) -> (&str, BucketPath) {
        if self.0.len() < SEGMENT_LEN {
            return (&self.0, BucketPath::new(""));
        }

        let (segment, rest) = self.0.split_at(SEGMENT_LEN);
        (segment, BucketPath::new(rest))
    }

    /// Renders this path as a filesystem path relative to a bucket store's
    /// root: each two-character segment but the last becomes a directory
    /// component, and the trailing one- or two-char segment becomes the
    /// leaf component.
    pub fn render(&self) -> PathBuf {
        let mut out = PathBuf::new();
        let mut remainder = BucketPath::new(self.0.clone());

        loop {
            let (segment, rest) = remainder.step();
            if segment.is_empty() {
                break;
            }
            out.push(segment);
            remainder = rest;
        }

        out
    }
}

impl From<&str> for BucketPath {
    fn from(s: &str) -> Self {
        BucketPath::new(s)
    }
}

impl From<String> for BucketPath {
    fn from(s: String) -> Self {
        BucketPath::new(s)
    }
}

impl std::fmt::Display for BucketPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_splits_two_chars_at_a_time() {
        let p = BucketPath::new("aabbcc");
        let (seg, rest) = p.step();
        assert_eq!(seg, "aa");
        assert_eq!(rest.as_str(), "bbcc");
    }

    #[test]
    fn step_returns_single_char_tail() {
        let p = BucketPath::new("a");
        let (seg, rest) = p.step();
        assert_eq!(seg, "a");
        assert!(rest.is_empty());
    }

    #[test]
    fn step_on_empty_is_total() {
        let p = BucketPath::new("");
        let (seg, rest) = p.step();
        assert_eq!(seg, "");
        assert!(rest.is_empty());
    }

    #[test]
    fn step_always_terminates() {
        let mut p = BucketPath::new("aabbccddee1");
        let mut steps = 0;
        loop {
            let (seg, rest) = p.step();
            if seg.is_empty() {
                break;
            }
            p = rest;
            steps += 1;
            assert!(steps < 100, "step() did not terminate");
        }
        assert_eq!(steps, 6);
    }

    #[test]
    fn render_joins_two_char_directories() {
        let p = BucketPath::new("aabbc");
        assert_eq!(p.render(), PathBuf::from("aa").join("bb").join("c"));
    }

    #[test]
    fn render_of_short_path_has_no_trailing_separator() {
        let p = BucketPath::new("aa");
        assert_eq!(p.render(), PathBuf::from("aa"));
    }

    #[test]
    fn render_is_injective_over_different_lengths() {
        let a = BucketPath::new("aa").render();
        let b = BucketPath::new("aab").render();
        let c = BucketPath::new("aabb").render();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
