//! Import Tracker (spec §4.4): per-file import/export extraction, module
//! dependency graph construction, and cycle detection.
//!
//! Grounded on the teacher's `analyzer/ast_js/imports.rs` for the
//! extraction shape and `analyzer/resolvers.rs` for specifier resolution;
//! the dependency-graph and cycle-detection pieces generalize
//! `analyzer/cycles.rs` onto `petgraph`. Per-file results are cached by
//! absolute path and dropped whenever that file is reanalyzed, mirroring
//! the parser's own per-file cache in `parser/mod.rs`.

mod cycles;
pub(crate) mod extract;
mod resolve;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use cycles::{CycleSeverity, DetectedCycle, detect_cycles};
pub use resolve::resolve_specifier;

use crate::error::{AnalysisError, AnalysisErrorCode};
use crate::model::{ExportRecord, ImportRecord, ModuleGraph, ModuleNode};

#[derive(Debug, Clone, Default)]
struct FileImports {
    imports: Vec<ImportRecord>,
    exports: Vec<ExportRecord>,
}

/// Extracts and caches per-file import/export records, and builds the
/// project-wide module dependency graph on demand.
pub struct ImportTracker {
    project_root: PathBuf,
    cache: Mutex<HashMap<PathBuf, FileImports>>,
}

impl ImportTracker {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drops any cached extraction for `file`, forcing re-extraction on the
    /// next call that touches it.
    pub fn invalidate(&self, file: &Path) {
        self.cache.lock().unwrap().remove(file);
    }

    /// Extracts (or returns the cached) imports/exports for `file`. `content`
    /// is the already-read source text; callers own file I/O (mirrors
    /// `Parser::parse`'s contract).
    fn imports_and_exports(
        &self,
        file: &Path,
        content: &str,
    ) -> Result<(Vec<ImportRecord>, Vec<ExportRecord>), AnalysisError> {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.get(file) {
                return Ok((entry.imports.clone(), entry.exports.clone()));
            }
        }

        let file_str = file.to_string_lossy();
        let extracted = extract::extract(&file_str, content).ok_or_else(|| {
            AnalysisError::new(AnalysisErrorCode::ParseError, "failed to parse file for import analysis")
                .with_file(file_str.to_string())
        })?;

        let mut imports = extracted.imports;
        for import in &mut imports {
            import.external = resolve_specifier(file, &import.module_specifier, &self.project_root).is_none();
        }

        self.cache.lock().unwrap().insert(
            file.to_path_buf(),
            FileImports {
                imports: imports.clone(),
                exports: extracted.exports.clone(),
            },
        );
        Ok((imports, extracted.exports))
    }

    /// Imports declared by `file`, with `external` resolved against the
    /// project root.
    pub fn imports_of(&self, file: &Path, content: &str) -> Result<Vec<ImportRecord>, AnalysisError> {
        self.imports_and_exports(file, content).map(|(i, _)| i)
    }

    /// Exports declared by `file`.
    pub fn exports_of(&self, file: &Path, content: &str) -> Result<Vec<ExportRecord>, AnalysisError> {
        self.imports_and_exports(file, content).map(|(_, e)| e)
    }

    /// Builds the project-wide module dependency graph from a set of
    /// already-read `(path, content)` pairs. Files that fail to parse
    /// contribute a `PARSE_ERROR` and are skipped rather than aborting the
    /// whole build (spec §7).
    pub fn build_dependency_graph(
        &self,
        files: &[(PathBuf, String)],
    ) -> (ModuleGraph, Vec<AnalysisError>) {
        let mut graph = ModuleGraph::new();
        let mut errors = Vec::new();

        for (path, _content) in files {
            graph.add_node(ModuleNode::File(path.to_string_lossy().to_string()));
        }

        for (path, content) in files {
            let imports = match self.imports_of(path, content) {
                Ok(imports) => imports,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };
            let from = ModuleNode::File(path.to_string_lossy().to_string());
            for import in imports {
                let to = match resolve_specifier(path, &import.module_specifier, &self.project_root) {
                    Some(resolved) => ModuleNode::File(resolved.to_string_lossy().to_string()),
                    None => ModuleNode::External(import.module_specifier.clone()),
                };
                graph.add_edge(from.clone(), to, import.form, import.line);
            }
        }

        (graph, errors)
    }

    /// Cycles present in a previously built dependency graph (spec §4.4).
    pub fn find_cycles(&self, graph: &ModuleGraph) -> Vec<DetectedCycle> {
        detect_cycles(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn imports_are_cached_after_first_extraction() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "import { x } from './b';").unwrap();
        let tracker = ImportTracker::new(dir.path());
        let first = tracker.imports_of(&file, "import { x } from './b';").unwrap();
        // Pass different content on second call; cached result wins.
        let second = tracker.imports_of(&file, "garbage").unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(second[0].module_specifier, "./b");
    }

    #[test]
    fn invalidate_forces_reextraction() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        let tracker = ImportTracker::new(dir.path());
        tracker.imports_of(&file, "import { x } from './b';").unwrap();
        tracker.invalidate(&file);
        let reextracted = tracker.imports_of(&file, "import { y } from './c';").unwrap();
        assert_eq!(reextracted[0].module_specifier, "./c");
    }

    #[test]
    fn build_dependency_graph_resolves_relative_imports() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");
        fs::write(&a, "import { y } from './b';").unwrap();
        fs::write(&b, "export const y = 1;").unwrap();
        let tracker = ImportTracker::new(dir.path());
        let files = vec![
            (a.clone(), fs::read_to_string(&a).unwrap()),
            (b.clone(), fs::read_to_string(&b).unwrap()),
        ];
        let (graph, errors) = tracker.build_dependency_graph(&files);
        assert!(errors.is_empty());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn build_dependency_graph_marks_bare_specifiers_external() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.ts");
        fs::write(&a, "import React from 'react';").unwrap();
        let tracker = ImportTracker::new(dir.path());
        let files = vec![(a.clone(), fs::read_to_string(&a).unwrap())];
        let (graph, _) = tracker.build_dependency_graph(&files);
        assert_eq!(graph.node_count(), 2);
        assert!(
            graph
                .index_of(&ModuleNode::External("react".to_string()))
                .is_some()
        );
    }

    #[test]
    fn cycles_are_found_through_the_tracker() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");
        fs::write(&a, "import { y } from './b';").unwrap();
        fs::write(&b, "import { x } from './a';").unwrap();
        let tracker = ImportTracker::new(dir.path());
        let files = vec![
            (a.clone(), fs::read_to_string(&a).unwrap()),
            (b.clone(), fs::read_to_string(&b).unwrap()),
        ];
        let (graph, _) = tracker.build_dependency_graph(&files);
        let cycles = tracker.find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, CycleSeverity::Warning);
    }
}
