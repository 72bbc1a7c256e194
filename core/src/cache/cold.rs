//! Persistent on-disk cache tier (spec §4.2/§6).
//!
//! Grounded on the teacher's `snapshot.rs::{project_cache_dir, write_atomic}`
//! for the cache-directory layout and atomic-write pattern, generalized from
//! a single per-project snapshot file to one file per cache key (MD5 of the
//! key, spec §6), with optional zlib compression behind a 4-byte `COMP`
//! marker (`original_source/.../cache_manager.py::FilesystemCache`).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use sha2::{Digest, Sha256};
use std::io::Read as _;

const COMPRESSED_MARKER: &[u8; 4] = b"COMP";
const COMPRESS_ABOVE_BYTES: usize = 1024;
const CACHE_DIR_ENV: &str = "TSA_CACHE_DIR";

/// `~/.cache/tsa/projects/<sha256(root)[..16]>` (or `$TSA_CACHE_DIR`),
/// mirroring `project_cache_dir` in the teacher.
pub fn project_cache_dir(root: &Path) -> PathBuf {
    if let Ok(custom) = std::env::var(CACHE_DIR_ENV) {
        let custom = custom.trim();
        if !custom.is_empty() {
            return PathBuf::from(custom);
        }
    }
    let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let project_id: String = format!("{hash:x}").chars().take(16).collect();
    cache_base_dir().join("projects").join(project_id)
}

fn cache_base_dir() -> PathBuf {
    if let Some(dir) = dirs::cache_dir() {
        return dir.join("tsa");
    }
    std::env::temp_dir().join("tsa")
}

fn cache_file_name(key: &str) -> String {
    format!("{:x}", md5::compute(key.as_bytes()))
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("cache file path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new().prefix("tsa_cold_tmp").tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ColdTierStats {
    pub entries_on_disk: u64,
    pub total_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub compressed_count: u64,
    pub uncompressed_count: u64,
}

/// The cold tier: one file per key under [`project_cache_dir`]. Read/write
/// failures are swallowed per spec §4.2's failure policy ("read errors ...
/// drop the file silently and count as misses; write errors drop the entry
/// and are not surfaced as request errors").
pub struct ColdTier {
    dir: PathBuf,
    max_bytes: u64,
}

impl ColdTier {
    pub fn new(dir: PathBuf, max_bytes: u64) -> Self {
        Self { dir, max_bytes }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(cache_file_name(key))
    }

    /// Reads and decompresses the raw bytes stored under `key`, self-healing
    /// by unlinking corrupt entries on read failure (spec §6).
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        let raw = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return None,
        };
        if raw.len() >= 4 && &raw[0..4] == COMPRESSED_MARKER {
            let mut decoder = ZlibDecoder::new(&raw[4..]);
            let mut out = Vec::new();
            match decoder.read_to_end(&mut out) {
                Ok(_) => Some(out),
                Err(_) => {
                    let _ = std::fs::remove_file(&path);
                    None
                }
            }
        } else {
            Some(raw)
        }
    }

    /// Writes `data` to `key`'s file, compressing when it exceeds 1 KiB and
    /// compression actually saves space (spec §4.2/§6).
    pub fn set_bytes(&self, key: &str, data: &[u8]) {
        let path = self.path_for(key);
        if data.len() > COMPRESS_ABOVE_BYTES {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
            if encoder.write_all(data).is_ok() {
                if let Ok(compressed) = encoder.finish() {
                    if compressed.len() < data.len() {
                        let mut framed = Vec::with_capacity(compressed.len() + 4);
                        framed.extend_from_slice(COMPRESSED_MARKER);
                        framed.extend_from_slice(&compressed);
                        let _ = write_atomic(&path, &framed);
                        self.cleanup_if_needed();
                        return;
                    }
                }
            }
        }
        let _ = write_atomic(&path, data);
        self.cleanup_if_needed();
    }

    pub fn invalidate(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    fn total_bytes(&self) -> u64 {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// When total on-disk size exceeds the budget, deletes the oldest ~25%
    /// of files by mtime (spec §6).
    fn cleanup_if_needed(&self) {
        if self.total_bytes() <= self.max_bytes {
            return;
        }
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return;
        };
        let mut files: Vec<(PathBuf, std::time::SystemTime)> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                let mtime = meta.modified().ok()?;
                Some((e.path(), mtime))
            })
            .collect();
        files.sort_by_key(|(_, mtime)| *mtime);
        let to_delete = (files.len() as f64 * 0.25).ceil() as usize;
        for (path, _) in files.into_iter().take(to_delete) {
            let _ = std::fs::remove_file(path);
        }
    }

    pub fn stats(&self) -> ColdTierStats {
        let entries = std::fs::read_dir(&self.dir)
            .map(|e| e.filter_map(|e| e.ok()).count() as u64)
            .unwrap_or(0);
        ColdTierStats {
            entries_on_disk: entries,
            total_bytes: self.total_bytes(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_uncompressed_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let tier = ColdTier::new(dir.path().to_path_buf(), 10 * 1024 * 1024);
        tier.set_bytes("k1", b"hello");
        assert_eq!(tier.get_bytes("k1").unwrap(), b"hello");
    }

    #[test]
    fn compresses_large_compressible_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let tier = ColdTier::new(dir.path().to_path_buf(), 10 * 1024 * 1024);
        let data = "a".repeat(5000);
        tier.set_bytes("k2", data.as_bytes());
        let path = tier.path_for("k2");
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[0..4], COMPRESSED_MARKER);
        assert_eq!(tier.get_bytes("k2").unwrap(), data.as_bytes());
    }

    #[test]
    fn corrupt_entry_is_unlinked_on_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let tier = ColdTier::new(dir.path().to_path_buf(), 10 * 1024 * 1024);
        let path = tier.path_for("k3");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"COMPnotvalidzlib").unwrap();
        assert!(tier.get_bytes("k3").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn missing_entry_is_a_silent_miss() {
        let dir = tempfile::TempDir::new().unwrap();
        let tier = ColdTier::new(dir.path().to_path_buf(), 10 * 1024 * 1024);
        assert!(tier.get_bytes("nope").is_none());
    }
}
