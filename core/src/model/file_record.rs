use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Per-file bookkeeping used by the cache and incremental analyzer (spec §3).
///
/// Created on first scan or first query, updated on detected change, removed
/// on deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    #[serde(with = "system_time_secs")]
    pub mtime: SystemTime,
    pub size_bytes: u64,
    /// Content fingerprint (hash of raw bytes).
    pub content_fingerprint: String,
    /// Hash of comment-stripped, whitespace-normalized content; a proxy for
    /// semantic equivalence (spec glossary: "AST fingerprint").
    pub semantic_fingerprint: String,
    #[serde(with = "system_time_secs")]
    pub last_analyzed: SystemTime,
    pub dependencies: Vec<PathBuf>,
}

impl FileRecord {
    pub fn new(path: PathBuf, mtime: SystemTime, size_bytes: u64, fingerprint: String) -> Self {
        Self {
            path,
            mtime,
            size_bytes,
            content_fingerprint: fingerprint.clone(),
            semantic_fingerprint: fingerprint,
            last_analyzed: SystemTime::now(),
            dependencies: Vec::new(),
        }
    }

    /// True when the filesystem's current mtime/size no longer matches what
    /// was recorded (spec invariant 2: stale entries must be invalidated
    /// before any read returns them).
    pub fn is_stale(&self, current_mtime: SystemTime, current_size: u64) -> bool {
        self.mtime != current_mtime || self.size_bytes != current_size
    }
}

mod system_time_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        s.serialize_f64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_secs_f64(secs.max(0.0)))
    }
}
