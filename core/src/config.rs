//! Project-local configuration: `.tsa/config.toml`.
//!
//! Loaded the way the teacher loads `.loctree/config.toml`
//! (`loctree_rs/src/config.rs`): missing or invalid config falls back to
//! `Default::default()` with a logged warning rather than a hard failure.

use serde::Deserialize;
use std::path::Path;

/// Directory names the parser and project scanner never descend into
/// (spec §4.1: `EXCLUDED_PATH`).
pub const DEFAULT_EXCLUDED_DIRS: &[&str] =
    &[".git", "node_modules", "dist", "build", ".next", ".nuxt"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TsaConfig {
    pub parser: ParserConfig,
    pub cache: CacheConfig,
    pub memory: MemoryConfig,
    pub resolution: ResolutionConfig,
}

impl Default for TsaConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            cache: CacheConfig::default(),
            memory: MemoryConfig::default(),
            resolution: ResolutionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Files larger than this are rejected with `FILE_TOO_LARGE`.
    pub max_file_size_bytes: u64,
    pub excluded_dirs: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 2 * 1024 * 1024,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub hot_max_bytes: u64,
    pub warm_max_bytes: u64,
    pub cold_max_bytes: u64,
    pub compress_above_bytes: u64,
    pub adaptive_sizing: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hot_max_bytes: 32 * 1024 * 1024,
            warm_max_bytes: 64 * 1024 * 1024,
            cold_max_bytes: 256 * 1024 * 1024,
            compress_above_bytes: 1024,
            adaptive_sizing: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_mb: u64,
    pub gc_threshold_mb: u64,
    pub emergency_threshold_mb: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_mb: 500,
            gc_threshold_mb: 400,
            emergency_threshold_mb: 450,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub default_inheritance_depth: u32,
    pub default_max_constraint_depth: u32,
    pub default_call_graph_depth: u32,
    pub max_out_edges_per_node: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            default_inheritance_depth: 5,
            default_max_constraint_depth: 5,
            default_call_graph_depth: 10,
            max_out_edges_per_node: 50,
        }
    }
}

impl TsaConfig {
    /// Load `.tsa/config.toml` under `root`, falling back to defaults.
    pub fn load(root: &Path) -> Self {
        Self::load_from_path(&root.join(".tsa").join("config.toml"))
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = TsaConfig::load(temp.path());
        assert_eq!(config.parser.max_file_size_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".tsa");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "not valid [[[ toml").unwrap();
        let config = TsaConfig::load(temp.path());
        assert_eq!(config.memory.max_mb, 500);
    }

    #[test]
    fn parses_overrides() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".tsa");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[parser]\nmax_file_size_bytes = 1024\n[resolution]\ndefault_max_constraint_depth = 2\n"
        )
        .unwrap();
        let config = TsaConfig::load(temp.path());
        assert_eq!(config.parser.max_file_size_bytes, 1024);
        assert_eq!(config.resolution.default_max_constraint_depth, 2);
    }
}
