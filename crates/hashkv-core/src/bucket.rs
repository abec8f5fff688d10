use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bucket_path::BucketPath;
use crate::encoding;
use crate::error::{HashkvError, HashkvResult};

/// A single on-disk unit of storage: the file (or file-to-be) at
/// `path.render()` under a store root, holding an in-memory map of key to
/// encoded value.
#[derive(Debug)]
pub struct Bucket {
    id: String,
    path: BucketPath,
    objects: HashMap<String, Vec<u8>>,
    dirty: bool,
}

impl Bucket {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &BucketPath {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Loads the bucket for `id` from disk under `root`. Walks `id` two
    /// hex characters at a time against the filesystem: each segment that
    /// exists and is a directory extends the resolved path, stopping at
    /// the first missing entry or the first non-directory entry. If no
    /// file exists at the resolved path the bucket starts with an empty
    /// object map.
    pub fn load(root: &Path, id: &str) -> HashkvResult<Bucket> {
        let path = resolve_path(root, id)?;
        let abs_path = root.join(path.render());

        let objects = match File::open(&abs_path) {
            Ok(file) => {
                let reader = io::BufReader::new(file);
                serde_json::from_reader(reader).map_err(|e| {
                    log::warn!("bucket {id} at {abs_path:?} failed to decode: {e}");
                    HashkvError::Decode(id.to_string(), e)
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::error!("bucket {id} failed to open {abs_path:?}: {e}");
                return Err(HashkvError::Io(e));
            }
        };
        log::trace!("loaded bucket {id} at path {path:?} ({} objects)", objects.len());

        Ok(Bucket {
            id: id.to_string(),
            path,
            objects,
            dirty: false,
        })
    }

    /// Decodes the stored value for `key` into `T`. Fails with `NotFound`
    /// if the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> HashkvResult<T> {
        let bytes = self
            .objects
            .get(key)
            .ok_or_else(|| HashkvError::NotFound(key.to_string()))?;
        encoding::decode(key, bytes)
    }

    /// Encodes `value` and stores it under `key`, marking the bucket dirty.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> HashkvResult<()> {
        let encoded = encoding::encode(value)?;
        self.put_encoded(key, encoded);
        Ok(())
    }

    /// Stores an already-encoded value under `key`, marking the bucket
    /// dirty. Used when redistributing objects during [`Bucket::split`],
    /// where the bytes were encoded once by the original `put` and must
    /// not be re-encoded on the way into a child bucket.
    pub fn put_encoded(&mut self, key: &str, encoded: Vec<u8>) {
        self.objects.insert(key.to_string(), encoded);
        self.dirty = true;
    }

    /// Removes `key` if present, marking the bucket dirty. A remove of an
    /// absent key is a no-op (and does not mark the bucket dirty).
    pub fn remove(&mut self, key: &str) {
        if self.objects.remove(key).is_some() {
            self.dirty = true;
        }
    }

    /// Persists the bucket if dirty. Writes to a `.swp` sidecar, flushes
    /// it to the device, closes it, then renames it over the bucket file.
    /// On any failure before rename the partial file is left in place and
    /// the error is returned; on success `dirty` is cleared.
    pub fn save(&mut self, root: &Path) -> HashkvResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let abs_path = root.join(self.path.render());
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                log::error!("bucket {} failed to create directory {parent:?}: {e}", self.id);
                e
            })?;
        }
        let swp_path = swp_path_for(&abs_path);

        let mut file = File::create(&swp_path).map_err(|e| {
            log::error!("bucket {} failed to create {swp_path:?}: {e}", self.id);
            e
        })?;
        serde_json::to_writer(&mut file, &self.objects).map_err(HashkvError::Encode)?;
        file.flush().map_err(|e| {
            log::error!("bucket {} failed to flush {swp_path:?}: {e}", self.id);
            e
        })?;
        file.sync_all().map_err(|e| {
            log::error!("bucket {} failed to sync {swp_path:?}: {e}", self.id);
            e
        })?;
        drop(file);

        fs::rename(&swp_path, &abs_path).map_err(|e| {
            log::error!(
                "bucket {} failed to rename {swp_path:?} over {abs_path:?}: {e}",
                self.id
            );
            e
        })?;
        self.dirty = false;
        log::debug!("saved bucket {} ({} objects)", self.id, self.objects.len());
        Ok(())
    }

    /// Splits this bucket once it has exceeded its configured capacity.
    ///
    /// Protocol: rename the existing file to a `.swp` sidecar, create a
    /// directory in its place, then hand each (key, encoded value) pair to
    /// `resolve_and_insert`, which must resolve the key to its new, deeper
    /// target bucket and insert the pair there, marking that bucket dirty.
    /// On any failure the new directory is removed and the sidecar is
    /// renamed back, leaving the bucket in its pre-split state on disk.
    pub fn split<F>(&mut self, root: &Path, mut resolve_and_insert: F) -> HashkvResult<()>
    where
        F: FnMut(&str, Vec<u8>) -> HashkvResult<()>,
    {
        let abs_path = root.join(self.path.render());
        let swp_path = swp_path_for(&abs_path);

        log::debug!(
            "splitting bucket {} at {:?} ({} objects)",
            self.id,
            self.path,
            self.objects.len()
        );

        if abs_path.exists() {
            fs::rename(&abs_path, &swp_path)?;
        }

        if let Err(e) = fs::create_dir(&abs_path) {
            let _ = fs::rename(&swp_path, &abs_path);
            log::warn!("split of bucket {} failed creating directory: {e}", self.id);
            return Err(HashkvError::Split(Box::new(HashkvError::Io(e))));
        }

        for (key, encoded) in self.objects.drain() {
            if let Err(e) = resolve_and_insert(&key, encoded) {
                let _ = fs::remove_dir_all(&abs_path);
                let _ = fs::rename(&swp_path, &abs_path);
                log::warn!("split of bucket {} rolled back: {e}", self.id);
                return Err(HashkvError::Split(Box::new(e)));
            }
        }

        let _ = fs::remove_file(&swp_path);
        self.dirty = false;
        Ok(())
    }
}

fn swp_path_for(abs_path: &Path) -> PathBuf {
    let mut name = abs_path.as_os_str().to_owned();
    name.push(".swp");
    PathBuf::from(name)
}

/// Walks `id` two hex characters at a time against the filesystem under
/// `root`, extending the path through each segment that exists and is a
/// directory, and stopping at the first missing entry or first
/// non-directory entry. The returned path is the prefix of `id` at which
/// the bucket currently lives on disk.
fn resolve_path(root: &Path, id: &str) -> HashkvResult<BucketPath> {
    let mut walked = PathBuf::new();
    let mut consumed = 0usize;
    let mut remainder = BucketPath::new(id);

    loop {
        let (segment, rest) = remainder.step();
        if segment.is_empty() {
            break;
        }

        let candidate = walked.join(segment);
        match fs::metadata(root.join(&candidate)) {
            Ok(meta) if meta.is_dir() => {
                walked = candidate;
                consumed += segment.len();
                remainder = rest;
            }
            Ok(_) => {
                // Not a directory: the bucket lives at this segment.
                consumed += segment.len();
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Nothing here yet: the bucket will live at this segment.
                consumed += segment.len();
                break;
            }
            Err(e) => {
                log::error!("bucket {id} failed to stat {candidate:?}: {e}");
                return Err(HashkvError::Io(e));
            }
        }
    }

    Ok(BucketPath::new(id[..consumed].to_string()))
}
