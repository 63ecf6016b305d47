//! On-disk snapshot of the newest posts of each timeline.
//!
//! Lets a timeline view show something before the first page arrives.
//!
//! File layout:
//! ```text
//! magic "TLC\0" | version u8 | len u64 LE | MessagePack body | crc32 u32 LE
//! ```

use crate::error::{Result, TimelineError};
use crate::types::{Post, TimelineKind};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for cache files.
const CACHE_MAGIC: &[u8; 4] = b"TLC\0";

/// Current cache format version.
const CACHE_VERSION: u8 = 1;

/// Default number of posts kept per timeline.
pub const DEFAULT_MAX_CACHED_POSTS: usize = 800;

/// Timeline snapshots stored under one directory.
#[derive(Clone, Debug)]
pub struct TimelineCache {
    dir: PathBuf,
    max_posts: usize,
}

impl TimelineCache {
    /// Create a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_limit(dir, DEFAULT_MAX_CACHED_POSTS)
    }

    pub fn with_limit(dir: impl AsRef<Path>, max_posts: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_posts })
    }

    fn path_for(&self, kind: TimelineKind) -> PathBuf {
        self.dir.join(format!("timeline-{}.cache", kind.as_str()))
    }

    /// Write the newest `max_posts` of `posts` (newest first).
    pub fn save(&self, kind: TimelineKind, posts: &[Post]) -> Result<()> {
        let kept = &posts[..posts.len().min(self.max_posts)];
        let encoded = rmp_serde::to_vec_named(kept)?;

        // Write beside the target, then rename over it.
        let path = self.path_for(kind);
        let tmp = path.with_extension("cache.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(CACHE_MAGIC)?;
            file.write_all(&[CACHE_VERSION])?;
            file.write_all(&(encoded.len() as u64).to_le_bytes())?;
            file.write_all(&encoded)?;
            file.write_all(&crc32fast::hash(&encoded).to_le_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        tracing::debug!(timeline = kind.as_str(), posts = kept.len(), "timeline cache saved");
        Ok(())
    }

    /// Read a snapshot. `Ok(None)` if none was saved.
    pub fn load(&self, kind: TimelineKind) -> Result<Option<Vec<Post>>> {
        let path = self.path_for(kind);
        if !path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != CACHE_MAGIC {
            return Err(TimelineError::InvalidFormat("Invalid cache magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != CACHE_VERSION {
            return Err(TimelineError::InvalidFormat(format!(
                "Unsupported cache version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut encoded = vec![0u8; len];
        file.read_exact(&mut encoded)?;

        let mut crc_bytes = [0u8; 4];
        file.read_exact(&mut crc_bytes)?;
        let expected = u32::from_le_bytes(crc_bytes);
        let got = crc32fast::hash(&encoded);
        if expected != got {
            return Err(TimelineError::ChecksumMismatch { expected, got });
        }

        let posts: Vec<Post> = rmp_serde::from_slice(&encoded)?;
        Ok(Some(posts))
    }

    /// Forget the snapshot for `kind`.
    pub fn clear(&self, kind: TimelineKind) -> Result<()> {
        match fs::remove_file(self.path_for(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
