//! Incremental Analyzer (spec §4.10): tracks per-file mtime/hash/semantic
//! fingerprint, classifies changes as cosmetic or semantic, and drives
//! partial reanalysis through the dependency-tracked cache invalidation in
//! [`crate::cache`].
//!
//! Grounded on `original_source/.../incremental_analyzer.py`'s four change
//! strategies (timestamp / content-hash / AST-level / hybrid) and its
//! detect-then-invalidate-then-reanalyze pipeline. Live reanalysis
//! triggering (an opt-in CLI mode, off by default) is layered on top by
//! `tsa`'s `watch` subcommand using `notify`/`notify-debouncer-full`, the
//! same crates the teacher's `watch.rs` uses for snapshot refresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cache::CacheManager;
use crate::import_tracker::ImportTracker;
use crate::model::{FileRecord, ModuleGraph, ModuleNode};
use crate::symbol_resolver::SymbolResolver;

/// Which signal a change is detected through (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStrategy {
    TimestampOnly,
    ContentHash,
    AstLevel,
    /// Timestamp first, then content hash, then semantic hash.
    Hybrid,
}

/// Whether a detected change altered runtime behavior (spec §4.10: "only
/// semantic changes force reanalysis").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Cosmetic,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct ModifiedFile {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// `{modified, new, deleted}` produced by a single [`IncrementalAnalyzer::detect_changes`] call.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub modified: Vec<ModifiedFile>,
    pub new: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.new.is_empty() && self.deleted.is_empty()
    }

    /// Files whose cached analysis is no longer valid: every new file, plus
    /// modified files whose change was classified semantic (cosmetic edits
    /// never force reanalysis).
    pub fn directly_changed(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.new.clone();
        out.extend(
            self.modified
                .iter()
                .filter(|m| m.kind == ChangeKind::Semantic)
                .map(|m| m.path.clone()),
        );
        out
    }
}

/// Result of driving [`IncrementalAnalyzer::reanalyze`] (spec §4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReanalysisResult {
    pub changes: ChangeSetSummary,
    /// The union of directly-changed files and their transitive dependents,
    /// i.e. the files this pass actually re-derives symbols/imports/exports
    /// for. Cosmetic-only edits contribute nothing here (testable property
    /// "incremental cosmetic edit": `files_analyzed == 0`).
    pub files_analyzed: Vec<PathBuf>,
    pub files_deleted: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSetSummary {
    pub modified: usize,
    pub new: usize,
    pub deleted: usize,
}

/// Cache key prefixes invalidated together for a given file (spec §4.10
/// invariant: "a file's cache entries for symbols, imports, exports, ast
/// are either all valid or all invalidated together").
const TRACKED_KEY_PREFIXES: &[&str] = &["ast:", "symbols:", "imports:", "exports:"];

fn cache_key(prefix: &str, path: &Path) -> String {
    format!("{prefix}{}", path.to_string_lossy())
}

/// Hash of the raw bytes.
fn content_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash of the comment-stripped, whitespace-normalized source (spec
/// glossary: "AST fingerprint"), used as a cheap proxy for semantic
/// equivalence without re-parsing.
pub fn semantic_fingerprint(content: &str) -> String {
    let stripped = strip_comments_and_whitespace(content);
    let mut hasher = Sha256::new();
    hasher.update(stripped.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn strip_comments_and_whitespace(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let bytes = content.as_bytes();
    let mut i = 0;
    let mut in_string: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_string {
            out.push(b as char);
            if b == b'\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            if b == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => {
                in_string = Some(b);
                out.push(b as char);
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            _ if b.is_ascii_whitespace() => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
                i += 1;
            }
            _ => {
                out.push(b as char);
                i += 1;
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tracks every `.ts`/`.tsx` file under the project root and drives
/// change detection + partial reanalysis (spec §4.10).
pub struct IncrementalAnalyzer {
    strategy: ChangeStrategy,
    files: Mutex<HashMap<PathBuf, FileRecord>>,
}

impl IncrementalAnalyzer {
    pub fn new(strategy: ChangeStrategy) -> Self {
        Self {
            strategy,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds the tracker after a full analysis pass, so the next
    /// [`detect_changes`](Self::detect_changes) call has a baseline to
    /// compare against.
    pub fn record_baseline(&self, files: &[(PathBuf, String, SystemTime, u64)]) {
        let mut tracker = self.files.lock().unwrap();
        for (path, content, mtime, size) in files {
            tracker.insert(
                path.clone(),
                build_record(path.clone(), content, *mtime, *size),
            );
        }
    }

    /// Compares `current_files` (already read from disk) against the
    /// tracked baseline using the configured [`ChangeStrategy`], producing
    /// `{modified, new, deleted}` (spec §4.10).
    pub fn detect_changes(
        &self,
        current_files: &[(PathBuf, String, SystemTime, u64)],
    ) -> ChangeSet {
        let tracker = self.files.lock().unwrap();
        let mut changes = ChangeSet::default();
        let mut seen = std::collections::HashSet::new();

        for (path, content, mtime, size) in current_files {
            seen.insert(path.clone());
            match tracker.get(path) {
                None => changes.new.push(path.clone()),
                Some(record) => {
                    if let Some(kind) = self.classify(record, content, *mtime, *size) {
                        changes.modified.push(ModifiedFile {
                            path: path.clone(),
                            kind,
                        });
                    }
                }
            }
        }

        for path in tracker.keys() {
            if !seen.contains(path) {
                changes.deleted.push(path.clone());
            }
        }

        changes
    }

    /// `None` when the strategy determines nothing changed; `Some(kind)`
    /// otherwise. Hybrid short-circuits at the cheapest signal that proves
    /// "unchanged", falling through to the next only when the cheaper
    /// signal can't rule a change out.
    fn classify(
        &self,
        record: &FileRecord,
        content: &str,
        mtime: SystemTime,
        size: u64,
    ) -> Option<ChangeKind> {
        match self.strategy {
            ChangeStrategy::TimestampOnly => {
                if record.is_stale(mtime, size) {
                    Some(ChangeKind::Semantic)
                } else {
                    None
                }
            }
            ChangeStrategy::ContentHash => {
                let fp = content_fingerprint(content);
                if fp != record.content_fingerprint {
                    Some(ChangeKind::Semantic)
                } else {
                    None
                }
            }
            ChangeStrategy::AstLevel => {
                let semantic = semantic_fingerprint(content);
                if semantic != record.semantic_fingerprint {
                    Some(ChangeKind::Semantic)
                } else {
                    let fp = content_fingerprint(content);
                    if fp != record.content_fingerprint {
                        Some(ChangeKind::Cosmetic)
                    } else {
                        None
                    }
                }
            }
            ChangeStrategy::Hybrid => {
                if !record.is_stale(mtime, size) {
                    return None;
                }
                let fp = content_fingerprint(content);
                if fp == record.content_fingerprint {
                    return None;
                }
                let semantic = semantic_fingerprint(content);
                if semantic != record.semantic_fingerprint {
                    Some(ChangeKind::Semantic)
                } else {
                    Some(ChangeKind::Cosmetic)
                }
            }
        }
    }

    /// Drives one incremental pass (spec §4.10 steps 1-4; step 5, cache
    /// warming for hot files, is left to the caller since "hot" is a
    /// policy decision the engine layer owns).
    ///
    /// `module_graph` must reflect dependency-graph state *before* this
    /// pass's edges are rewritten (spec invariant: "the dependent closure
    /// is computed against the graph state before edges are rewritten").
    pub fn reanalyze(
        &self,
        current_files: &[(PathBuf, String, SystemTime, u64)],
        module_graph: &ModuleGraph,
        cache: &CacheManager,
        symbol_resolver: &SymbolResolver,
        import_tracker: &ImportTracker,
    ) -> ReanalysisResult {
        let changes = self.detect_changes(current_files);

        let mut affected: std::collections::HashSet<PathBuf> = std::collections::HashSet::new();
        for path in changes.directly_changed() {
            affected.insert(path.clone());
            let node = ModuleNode::File(path.to_string_lossy().to_string());
            for dependent in module_graph.dependents_of(&node) {
                if let ModuleNode::File(p) = dependent {
                    affected.insert(PathBuf::from(p));
                }
            }
        }

        for path in affected.iter().chain(changes.deleted.iter()) {
            for prefix in TRACKED_KEY_PREFIXES {
                cache.invalidate(&cache_key(prefix, path), None);
            }
            symbol_resolver.invalidate(path);
            import_tracker.invalidate(path);
        }

        for path in &changes.deleted {
            cache.dependency_tracker().remove_item(&path.to_string_lossy());
        }

        {
            let mut tracker = self.files.lock().unwrap();
            for path in &changes.deleted {
                tracker.remove(path);
            }
            for (path, content, mtime, size) in current_files {
                if affected.contains(path) || changes.new.contains(path) {
                    tracker.insert(path.clone(), build_record(path.clone(), content, *mtime, *size));
                }
            }
        }

        let mut files_analyzed: Vec<PathBuf> = affected.into_iter().collect();
        files_analyzed.sort();

        ReanalysisResult {
            changes: ChangeSetSummary {
                modified: changes.modified.len(),
                new: changes.new.len(),
                deleted: changes.deleted.len(),
            },
            files_analyzed,
            files_deleted: changes.deleted,
        }
    }

    pub fn strategy(&self) -> ChangeStrategy {
        self.strategy
    }

    pub fn tracked_file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

fn build_record(path: PathBuf, content: &str, mtime: SystemTime, size: u64) -> FileRecord {
    FileRecord {
        path,
        mtime,
        size_bytes: size,
        content_fingerprint: content_fingerprint(content),
        semantic_fingerprint: semantic_fingerprint(content),
        last_analyzed: SystemTime::now(),
        dependencies: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn files_at(entries: &[(&str, &str)]) -> Vec<(PathBuf, String, SystemTime, u64)> {
        entries
            .iter()
            .map(|(p, c)| {
                (
                    PathBuf::from(p),
                    c.to_string(),
                    SystemTime::UNIX_EPOCH,
                    c.len() as u64,
                )
            })
            .collect()
    }

    #[test]
    fn new_file_detected() {
        let analyzer = IncrementalAnalyzer::new(ChangeStrategy::ContentHash);
        let changes = analyzer.detect_changes(&files_at(&[("a.ts", "export const x = 1;")]));
        assert_eq!(changes.new.len(), 1);
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn cosmetic_comment_edit_is_not_semantic_under_ast_level_strategy() {
        let analyzer = IncrementalAnalyzer::new(ChangeStrategy::AstLevel);
        analyzer.record_baseline(&files_at(&[("a.ts", "export const x = 1;")]));
        let changes =
            analyzer.detect_changes(&files_at(&[("a.ts", "export const x = 1; // comment")]));
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.modified[0].kind, ChangeKind::Cosmetic);
        assert!(changes.directly_changed().is_empty());
    }

    #[test]
    fn semantic_edit_is_detected_under_ast_level_strategy() {
        let analyzer = IncrementalAnalyzer::new(ChangeStrategy::AstLevel);
        analyzer.record_baseline(&files_at(&[("a.ts", "export const x = 1;")]));
        let changes = analyzer.detect_changes(&files_at(&[("a.ts", "export const x = 2;")]));
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.modified[0].kind, ChangeKind::Semantic);
        assert_eq!(changes.directly_changed(), vec![PathBuf::from("a.ts")]);
    }

    #[test]
    fn deleted_file_detected() {
        let analyzer = IncrementalAnalyzer::new(ChangeStrategy::ContentHash);
        analyzer.record_baseline(&files_at(&[("a.ts", "export const x = 1;")]));
        let changes = analyzer.detect_changes(&[]);
        assert_eq!(changes.deleted, vec![PathBuf::from("a.ts")]);
    }

    #[test]
    fn reanalyze_cosmetic_edit_touches_no_files() {
        let analyzer = IncrementalAnalyzer::new(ChangeStrategy::AstLevel);
        let temp = tempfile::TempDir::new().unwrap();
        analyzer.record_baseline(&files_at(&[("a.ts", "export const x = 1;")]));
        let cache = CacheManager::in_memory_for_tests(&CacheConfig::default(), temp.path().to_path_buf());
        let symbol_resolver = SymbolResolver::new(temp.path());
        let import_tracker = ImportTracker::new(temp.path());
        let graph = ModuleGraph::new();
        let result = analyzer.reanalyze(
            &files_at(&[("a.ts", "export const x = 1; // comment")]),
            &graph,
            &cache,
            &symbol_resolver,
            &import_tracker,
        );
        assert!(result.files_analyzed.is_empty());
        assert_eq!(result.changes.modified, 1);
    }

    #[test]
    fn reanalyze_semantic_edit_invalidates_dependents() {
        let analyzer = IncrementalAnalyzer::new(ChangeStrategy::ContentHash);
        let temp = tempfile::TempDir::new().unwrap();
        analyzer.record_baseline(&files_at(&[
            ("a.ts", "export const x = 1;"),
            ("b.ts", "import { x } from './a';"),
        ]));
        let cache = CacheManager::in_memory_for_tests(&CacheConfig::default(), temp.path().to_path_buf());
        let symbol_resolver = SymbolResolver::new(temp.path());
        let import_tracker = ImportTracker::new(temp.path());
        let mut graph = ModuleGraph::new();
        graph.add_edge(
            ModuleNode::File("b.ts".to_string()),
            ModuleNode::File("a.ts".to_string()),
            crate::model::ImportForm::Named,
            1,
        );
        let result = analyzer.reanalyze(
            &files_at(&[
                ("a.ts", "export const x = 2;"),
                ("b.ts", "import { x } from './a';"),
            ]),
            &graph,
            &cache,
            &symbol_resolver,
            &import_tracker,
        );
        assert_eq!(result.files_analyzed.len(), 2);
        assert!(result.files_analyzed.contains(&PathBuf::from("a.ts")));
        assert!(result.files_analyzed.contains(&PathBuf::from("b.ts")));
    }
}
