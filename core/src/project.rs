//! Project root resolution and `.ts`/`.tsx` file discovery.
//!
//! Grounded on the teacher's `fs_utils.rs`/`detect.rs` (gitignore-aware file
//! gathering), generalized to the single TypeScript/TSX target this engine
//! analyzes rather than loctree's multi-language sweep.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::TsaConfig;

/// `MCP_FILE_ROOT` anchors relative path resolution and project-wide scans
/// (spec §6); falls back to the process working directory.
pub fn resolve_project_root() -> PathBuf {
    if let Ok(root) = std::env::var("MCP_FILE_ROOT") {
        let path = PathBuf::from(root);
        if path.is_absolute() {
            return path;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn is_excluded(path: &Path, excluded_dirs: &[String]) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        excluded_dirs.iter().any(|d| d == s.as_ref())
    })
}

/// Walk `root` and collect every `.ts`/`.tsx` file not under an excluded
/// directory (spec §4.1: `EXCLUDED_PATH`).
pub fn discover_source_files(root: &Path, config: &TsaConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            if e.file_type().is_dir() {
                !is_excluded(e.path(), &config.parser.excluded_dirs)
            } else {
                true
            }
        })
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && is_source_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    files
}

pub fn is_source_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts") | Some("tsx")
    )
}

/// Test file filter: `*.test.*`, `*.spec.*`, `*_test.*`, or anywhere under a
/// `tests/`, `test/`, `__tests__/` directory (spec §4.5).
pub fn is_test_file(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if file_name.contains(".test.") || file_name.contains(".spec.") || file_name.contains("_test.")
    {
        return true;
    }
    path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("tests") | Some("test") | Some("__tests__")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_test_files_by_suffix_and_directory() {
        assert!(is_test_file(Path::new("src/foo.test.ts")));
        assert!(is_test_file(Path::new("src/foo.spec.tsx")));
        assert!(is_test_file(Path::new("src/__tests__/foo.ts")));
        assert!(!is_test_file(Path::new("src/foo.ts")));
    }

    #[test]
    fn excludes_configured_directories() {
        let config = TsaConfig::default();
        assert!(is_excluded(
            Path::new("project/node_modules/pkg/index.ts"),
            &config.parser.excluded_dirs
        ));
        assert!(!is_excluded(
            Path::new("project/src/index.ts"),
            &config.parser.excluded_dirs
        ));
    }
}
