//! Parses and caches `.ts`/`.tsx` concrete syntax trees (spec §4.1).
//!
//! Grounded on the teacher's `analyzer/ast_js/mod.rs::analyze_js_file_ast`
//! for the parse call shape (`Allocator::default()` + `SourceType` selection
//! + `Parser::new(...).parse()`), generalized from loctree's multi-framework
//! (Svelte/Vue/Flow) dispatch down to the plain `.ts`/`.tsx` surface this
//! engine targets, and from loctree's uncached one-shot parse to an
//! LRU-cached, mtime-checked, memory-aware parser per spec.

mod cst;
mod visitor;

pub use cst::{Cst, CstNode, CstNodeKind};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use lru::LruCache;
use oxc_allocator::Allocator;
use oxc_parser::Parser as OxcParser;
use oxc_span::SourceType;
use parking_lot::ReentrantMutex;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::num::NonZeroUsize;

use crate::config::TsaConfig;
use crate::error::{AnalysisError, AnalysisErrorCode};
use crate::memory::MemoryManager;

use stats::ParserStats;
mod stats;
pub use stats::ParserStats as ParserStatsSnapshot;

const DEFAULT_CACHE_CAPACITY: usize = 512;

#[derive(Clone)]
struct CacheEntry {
    tree: Arc<Cst>,
    fingerprint: String,
    mtime: SystemTime,
    parse_time_ms: f64,
}

/// Outcome of a single [`Parser::parse`] call (spec §4.1).
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub success: bool,
    pub tree: Option<Arc<Cst>>,
    pub errors: Vec<AnalysisError>,
    pub parse_time_ms: f64,
}

impl ParseResult {
    fn failure(error: AnalysisError) -> Self {
        Self {
            success: false,
            tree: None,
            errors: vec![error],
            parse_time_ms: 0.0,
        }
    }
}

/// Produces and caches concrete syntax trees. Safe to share across request
/// threads: the cache body is guarded by a reentrant mutex per spec §5 (a
/// cache lookup that triggers a parse re-enters `set` from within `get`
/// without deadlocking).
pub struct Parser {
    max_file_size_bytes: u64,
    excluded_dirs: Vec<String>,
    cache: ReentrantMutex<RefCell<LruCache<PathBuf, CacheEntry>>>,
    stats: ReentrantMutex<RefCell<ParserStats>>,
}

impl Parser {
    pub fn new(config: &TsaConfig) -> Self {
        Self {
            max_file_size_bytes: config.parser.max_file_size_bytes,
            excluded_dirs: config.parser.excluded_dirs.clone(),
            cache: ReentrantMutex::new(RefCell::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap(),
            ))),
            stats: ReentrantMutex::new(RefCell::new(ParserStats::default())),
        }
    }

    /// Registers this parser's cache with the memory manager: on **high**
    /// pressure evict 10% of entries, on **emergency** retain only 5%
    /// (spec §4.1).
    pub fn register_with_memory_manager(self: &Arc<Self>, memory: &MemoryManager) {
        let high = Arc::clone(self);
        memory.register_pressure_callback(move || high.evict_fraction(0.10));
        let emergency = Arc::clone(self);
        memory.register_emergency_callback(move || emergency.retain_fraction(0.05));
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            self.excluded_dirs.iter().any(|d| d == s.as_ref())
        })
    }

    fn evict_fraction(&self, fraction: f64) {
        let guard = self.cache.lock();
        let mut cache = guard.borrow_mut();
        let to_evict = ((cache.len() as f64) * fraction).ceil() as usize;
        for _ in 0..to_evict {
            if cache.pop_lru().is_none() {
                break;
            }
        }
    }

    fn retain_fraction(&self, fraction: f64) {
        let guard = self.cache.lock();
        let mut cache = guard.borrow_mut();
        let keep = ((cache.len() as f64) * fraction).floor() as usize;
        while cache.len() > keep {
            if cache.pop_lru().is_none() {
                break;
            }
        }
    }

    /// Parses `file`, consulting and updating the cache (spec §4.1).
    pub fn parse(&self, file: &Path) -> ParseResult {
        if self.is_excluded(file) {
            return ParseResult::failure(
                AnalysisError::new(
                    AnalysisErrorCode::ExcludedPath,
                    format!("{} is under an excluded directory", file.display()),
                )
                .with_file(file.display().to_string()),
            );
        }

        let metadata = match std::fs::metadata(file) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ParseResult::failure(AnalysisError::not_found(file.display().to_string()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return ParseResult::failure(
                    AnalysisError::new(AnalysisErrorCode::PermissionDenied, e.to_string())
                        .with_file(file.display().to_string()),
                );
            }
            Err(e) => {
                return ParseResult::failure(
                    AnalysisError::new(AnalysisErrorCode::NotFound, e.to_string())
                        .with_file(file.display().to_string()),
                );
            }
        };

        if metadata.len() > self.max_file_size_bytes {
            return ParseResult::failure(
                AnalysisError::new(
                    AnalysisErrorCode::FileTooLarge,
                    format!(
                        "{} bytes exceeds the {} byte limit",
                        metadata.len(),
                        self.max_file_size_bytes
                    ),
                )
                .with_file(file.display().to_string()),
            );
        }

        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        if let Some(entry) = self.lookup_cached(file, mtime) {
            let guard = self.stats.lock();
            guard.borrow_mut().record_hit();
            return ParseResult {
                success: true,
                tree: Some(entry.tree),
                errors: Vec::new(),
                parse_time_ms: entry.parse_time_ms,
            };
        }

        let content = match std::fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) => {
                return ParseResult::failure(
                    AnalysisError::new(AnalysisErrorCode::NotFound, e.to_string())
                        .with_file(file.display().to_string()),
                );
            }
        };

        self.parse_and_cache(file, &content, mtime)
    }

    fn lookup_cached(&self, file: &Path, mtime: SystemTime) -> Option<CacheEntry> {
        let guard = self.cache.lock();
        let mut cache = guard.borrow_mut();
        match cache.get(file) {
            Some(entry) if entry.mtime == mtime => Some(entry.clone()),
            Some(_) => {
                cache.pop(file);
                None
            }
            None => None,
        }
    }

    fn parse_and_cache(&self, file: &Path, content: &str, mtime: SystemTime) -> ParseResult {
        let start = Instant::now();
        let is_jsx = matches!(
            file.extension().and_then(|e| e.to_str()),
            Some("tsx") | Some("jsx")
        );
        let source_type = SourceType::from_path(file)
            .unwrap_or_default()
            .with_typescript(true)
            .with_jsx(is_jsx);

        let allocator = Allocator::default();
        let ret = OxcParser::new(&allocator, content, source_type).parse();

        let mut errors: Vec<AnalysisError> = ret
            .errors
            .iter()
            .map(|e| {
                AnalysisError::new(AnalysisErrorCode::ParseError, e.to_string())
                    .with_file(file.display().to_string())
            })
            .collect();

        let mut cst_visitor = visitor::CstVisitor::new(content);
        oxc_ast_visit::Visit::visit_program(&mut cst_visitor, &ret.program);
        let mut tree = cst_visitor.into_cst(is_jsx);

        let semantic_ret = oxc_semantic::SemanticBuilder::new().build(&ret.program);
        if semantic_ret.errors.is_empty() {
            let semantic = semantic_ret.semantic;
            tree.locally_referenced = semantic
                .scoping()
                .symbol_ids()
                .map(|id| semantic.scoping().symbol_name(id).to_string())
                .filter(|name| !name.is_empty())
                .collect();
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let tree = Arc::new(tree);
        let fingerprint = content_fingerprint(content);

        {
            let guard = self.cache.lock();
            guard.borrow_mut().put(
                file.to_path_buf(),
                CacheEntry {
                    tree: Arc::clone(&tree),
                    fingerprint,
                    mtime,
                    parse_time_ms: elapsed_ms,
                },
            );
        }

        {
            let guard = self.stats.lock();
            guard.borrow_mut().record_parse(elapsed_ms);
        }

        let success = !tree.nodes.is_empty() || errors.is_empty();
        if !success && errors.is_empty() {
            errors.push(
                AnalysisError::new(AnalysisErrorCode::ParseError, "empty parse result")
                    .with_file(file.display().to_string()),
            );
        }

        ParseResult {
            success: true,
            tree: Some(tree),
            errors,
            parse_time_ms: elapsed_ms,
        }
    }

    /// Returns a cached tree without triggering a parse, if present and not
    /// stale with respect to the filesystem (spec §4.1).
    pub fn get_cached_tree(&self, file: &Path) -> Option<Arc<Cst>> {
        let mtime = std::fs::metadata(file).ok()?.modified().ok()?;
        self.lookup_cached(file, mtime).map(|e| e.tree)
    }

    pub fn invalidate(&self, file: &Path) {
        let guard = self.cache.lock();
        guard.borrow_mut().pop(file);
    }

    pub fn query_nodes(tree: &Cst, kind: CstNodeKind) -> Vec<&CstNode> {
        tree.query_nodes(kind)
    }

    pub fn get_stats(&self) -> ParserStats {
        let guard = self.stats.lock();
        guard.borrow_mut().snapshot()
    }
}

fn content_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str, ext: &str) -> tempfile::TempPath {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.into_temp_path()
    }

    #[test]
    fn parses_a_simple_function_declaration() {
        let path = write_temp("export function greet(name: string): string { return name; }", "ts");
        let parser = Parser::new(&TsaConfig::default());
        let result = parser.parse(&path);
        assert!(result.success);
        let tree = result.tree.unwrap();
        let functions = tree.query_nodes(CstNodeKind::FunctionDeclaration);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name.as_deref(), Some("greet"));
    }

    #[test]
    fn rejects_oversized_files() {
        let path = write_temp("const x = 1;", "ts");
        let mut config = TsaConfig::default();
        config.parser.max_file_size_bytes = 1;
        let parser = Parser::new(&config);
        let result = parser.parse(&path);
        assert!(!result.success);
        assert_eq!(result.errors[0].code, AnalysisErrorCode::FileTooLarge);
    }

    #[test]
    fn missing_file_reports_not_found() {
        let parser = Parser::new(&TsaConfig::default());
        let result = parser.parse(Path::new("/no/such/file.ts"));
        assert!(!result.success);
        assert_eq!(result.errors[0].code, AnalysisErrorCode::NotFound);
    }

    #[test]
    fn second_parse_of_unchanged_file_is_a_cache_hit() {
        let path = write_temp("const x: number = 1;", "ts");
        let parser = Parser::new(&TsaConfig::default());
        parser.parse(&path);
        parser.parse(&path);
        let stats = parser.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn excluded_directory_is_rejected_without_touching_disk() {
        let parser = Parser::new(&TsaConfig::default());
        let result = parser.parse(Path::new("/project/node_modules/pkg/index.ts"));
        assert!(!result.success);
        assert_eq!(result.errors[0].code, AnalysisErrorCode::ExcludedPath);
    }
}
