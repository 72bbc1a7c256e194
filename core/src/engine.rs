//! Ties every component to the three tool surfaces of spec §6:
//! `find_references`, `get_function_details`, `analyze_call_graph`.
//!
//! Grounded on `original_source/.../mcp_server.py`'s tool-dispatch
//! functions, which read the request, gather the candidate file set, drive
//! the relevant component(s), and shape the pagination/error envelope
//! common to every response. [`EngineContext`] plays the role of the
//! teacher's `LoctreeServer` (`loctree-mcp/src/main.rs`): one long-lived
//! object per project root, constructed explicitly by the caller rather
//! than a module-level singleton (spec §9).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::cache::CacheManager;
use crate::config::TsaConfig;
use crate::error::{AnalysisError, AnalysisErrorCode, overall_success};
use crate::function_analyzer::{AnalyzeOptions, FunctionAnalyzer, FunctionDetail, FunctionTypes};
use crate::import_tracker::ImportTracker;
use crate::incremental::{ChangeStrategy, IncrementalAnalyzer, ReanalysisResult};
use crate::inheritance::{InheritanceChain, InheritanceResolver, MethodDef};
use crate::memory::MemoryManager;
use crate::model::{AnalysisStats, ModuleNode, Reference};
use crate::parser::Parser;
use crate::project::{discover_source_files, resolve_project_root};
use crate::symbol_resolver::{ResolutionPass, ResolveFilters, ResolveOptions, SymbolResolver, TargetFilter};
use crate::type_resolver::{ResolutionDepth as TypeResolutionDepth, TypeResolver};

/// `file_paths: string | [string] | null` at the tool boundary (spec §6).
#[derive(Debug, Clone)]
pub enum FilePathsInput {
    All,
    One(String),
    Many(Vec<String>),
}

impl FilePathsInput {
    pub fn from_optional(value: Option<Vec<String>>) -> Self {
        match value {
            None => FilePathsInput::All,
            Some(mut v) if v.len() == 1 => FilePathsInput::One(v.remove(0)),
            Some(v) => FilePathsInput::Many(v),
        }
    }
}

/// One project's worth of shared engine state: parser cache, three-tier
/// cache, memory watcher, symbol/import trackers, and the incremental
/// reanalysis coordinator. Construction is the caller's responsibility
/// (spec §9 "module-level singletons ... become explicit context
/// objects").
pub struct EngineContext {
    pub project_root: PathBuf,
    pub config: TsaConfig,
    pub parser: Arc<Parser>,
    pub cache: Arc<CacheManager>,
    pub memory: Arc<MemoryManager>,
    pub symbol_resolver: SymbolResolver,
    pub import_tracker: ImportTracker,
    pub incremental: IncrementalAnalyzer,
}

impl EngineContext {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let config = TsaConfig::load(&project_root);
        let parser = Arc::new(Parser::new(&config));
        let cache = Arc::new(CacheManager::new(&config.cache, &project_root));
        let memory = Arc::new(MemoryManager::new(config.memory.clone()));
        parser.register_with_memory_manager(&memory);

        Self {
            symbol_resolver: SymbolResolver::new(&project_root),
            import_tracker: ImportTracker::new(&project_root),
            incremental: IncrementalAnalyzer::new(ChangeStrategy::Hybrid),
            project_root,
            config,
            parser,
            cache,
            memory,
        }
    }

    /// For the process-default root (`MCP_FILE_ROOT` or cwd, spec §6).
    pub fn from_env() -> Self {
        Self::new(resolve_project_root())
    }

    fn resolve_candidate(&self, spec: &str) -> PathBuf {
        let path = Path::new(spec);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Resolves `file_paths` into an absolute, deduplicated file list:
    /// the named files when given, or every discovered project source
    /// file when `null` (spec §6).
    fn candidate_files(&self, file_paths: &FilePathsInput) -> Vec<PathBuf> {
        match file_paths {
            FilePathsInput::All => discover_source_files(&self.project_root, &self.config),
            FilePathsInput::One(p) => vec![self.resolve_candidate(p)],
            FilePathsInput::Many(paths) => paths.iter().map(|p| self.resolve_candidate(p)).collect(),
        }
    }

    /// Reads every candidate through [`Parser::parse`] for the boundary
    /// gating it enforces (size limit, excluded dirs, I/O errors, spec
    /// §4.1), then reads the raw text for the components that walk source
    /// directly. Files that fail the parser gate are skipped and recorded
    /// as errors rather than aborting the whole request (spec §7).
    fn read_files(&self, paths: &[PathBuf]) -> (Vec<(PathBuf, String, SystemTime, u64)>, Vec<AnalysisError>) {
        let mut out = Vec::new();
        let mut errors = Vec::new();
        for path in paths {
            let parsed = self.parser.parse(path);
            if !parsed.success {
                errors.extend(parsed.errors);
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let mtime = std::fs::metadata(path)
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    let size = content.len() as u64;
                    out.push((path.clone(), content, mtime, size));
                }
                Err(e) => {
                    errors.push(
                        AnalysisError::new(AnalysisErrorCode::NotFound, e.to_string())
                            .with_file(path.display().to_string()),
                    );
                }
            }
        }
        (out, errors)
    }

    /// Drives one incremental pass over the whole project and returns the
    /// files whose cached symbols/imports/exports/ast were invalidated
    /// (spec §4.10). Intended for a `tsa watch`-style caller; `find_*`
    /// tools don't call this themselves since each request already reads
    /// fresh file contents.
    pub fn incremental_analysis(&self) -> ReanalysisResult {
        let all_paths = discover_source_files(&self.project_root, &self.config);
        let (files, _errors) = self.read_files(&all_paths);
        let (graph, _graph_errors) = self.import_tracker.build_dependency_graph(
            &files.iter().map(|(p, c, _, _)| (p.clone(), c.clone())).collect::<Vec<_>>(),
        );
        self.incremental
            .reanalyze(&files, &graph, &self.cache, &self.symbol_resolver, &self.import_tracker)
    }
}

// ---------------------------------------------------------------------
// find_references
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FindReferencesParams {
    pub symbol: String,
    pub file_paths: FilePathsInput,
    pub include_declarations: bool,
    pub include_usages: bool,
    pub include_tests: bool,
    pub resolution_depth: ResolutionDepthInput,
    pub resolve_inheritance: bool,
    pub method_resolution: bool,
    pub include_confidence_scores: bool,
    pub resolve_imports: bool,
    pub page: usize,
}

impl Default for FilePathsInput {
    fn default() -> Self {
        FilePathsInput::All
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionDepthInput {
    #[default]
    Syntactic,
    Semantic,
    FullType,
}

impl ResolutionDepthInput {
    fn to_pass(self) -> ResolutionPass {
        match self {
            ResolutionDepthInput::Syntactic => ResolutionPass::Syntactic,
            ResolutionDepthInput::Semantic => ResolutionPass::Semantic,
            ResolutionDepthInput::FullType => ResolutionPass::Dynamic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InheritanceInfo {
    pub chains: Vec<InheritanceChain>,
    pub method_candidates: Vec<MethodDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindReferencesResponse {
    pub references: Vec<Reference>,
    pub total_references: usize,
    pub searched_files: usize,
    pub errors: Vec<AnalysisError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inheritance_info: Option<InheritanceInfo>,
    pub analysis_stats: AnalysisStats,
    pub page_size: usize,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub success: bool,
}

impl EngineContext {
    pub fn find_references(&self, params: &FindReferencesParams) -> FindReferencesResponse {
        let candidates = self.candidate_files(&params.file_paths);
        let (files, mut errors) = self.read_files(&candidates);

        // `resolve_imports` pulls in cross-file specifier resolution, which
        // only the semantic pass (and above) performs; a syntactic-only
        // request is bumped transparently (see DESIGN.md "resolve_imports").
        let pass = if params.resolve_imports && params.resolution_depth == ResolutionDepthInput::Syntactic {
            ResolutionPass::Semantic
        } else {
            params.resolution_depth.to_pass()
        };

        let inheritance = if params.resolve_inheritance || pass == ResolutionPass::Dynamic {
            let owned: Vec<(PathBuf, String)> = files.iter().map(|(p, c, _, _)| (p.clone(), c.clone())).collect();
            Some(InheritanceResolver::build(&owned))
        } else {
            None
        };

        let options = ResolveOptions {
            pass,
            filters: ResolveFilters {
                include_test_files: params.include_tests,
                kind: None,
                target: Some(TargetFilter::parse(&params.symbol)),
            },
            confidence_analysis: params.include_confidence_scores,
            inheritance_depth: self.config.resolution.default_inheritance_depth,
            page: params.page,
        };

        let (mut result, resolve_errors) = self
            .symbol_resolver
            .resolve(&files, &options, inheritance.as_ref());
        errors.extend(resolve_errors);

        if !params.include_declarations {
            result
                .references
                .retain(|r| r.kind != crate::model::ReferenceKind::Declaration);
        }
        if !params.include_usages {
            result.references.retain(|r| {
                !matches!(
                    r.kind,
                    crate::model::ReferenceKind::Usage | crate::model::ReferenceKind::Call
                )
            });
        }

        let inheritance_info = if params.resolve_inheritance {
            inheritance.as_ref().map(|resolver| {
                let chains = resolver.build_class_hierarchy(self.config.resolution.default_inheritance_depth);
                let method_candidates = match TargetFilter::parse(&params.symbol) {
                    TargetFilter::Method { class, method } if params.method_resolution => {
                        resolver.resolve_method_reference(
                            &class,
                            &method,
                            self.config.resolution.default_inheritance_depth,
                        )
                    }
                    _ => Vec::new(),
                };
                InheritanceInfo { chains, method_candidates }
            })
        } else {
            None
        };

        let produced_any = !result.references.is_empty();
        let success = overall_success(&errors, produced_any);

        FindReferencesResponse {
            total_references: result.references.len(),
            references: result.references,
            searched_files: files.len(),
            errors,
            inheritance_info,
            analysis_stats: result.stats,
            page_size: result.page_size,
            next_cursor: result.next_cursor,
            has_more: result.has_more,
            success,
        }
    }
}

// ---------------------------------------------------------------------
// get_function_details
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GetFunctionDetailsParams {
    pub functions: Vec<String>,
    pub file_paths: FilePathsInput,
    pub include_code: bool,
    pub include_types: bool,
    pub include_calls: bool,
    pub resolution_depth: TypeResolutionDepthInput,
    pub analyze_options: AnalyzeOptions,
    pub max_constraint_depth: u32,
    pub fallback_on_complexity: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeResolutionDepthInput {
    #[default]
    Basic,
    Generics,
    Full,
}

impl TypeResolutionDepthInput {
    fn to_depth(self) -> TypeResolutionDepth {
        match self {
            TypeResolutionDepthInput::Basic => TypeResolutionDepth::Basic,
            TypeResolutionDepthInput::Generics => TypeResolutionDepth::Generics,
            TypeResolutionDepthInput::Full => TypeResolutionDepth::Full,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFunctionDetailsResponse {
    pub details: std::collections::HashMap<String, Vec<FunctionDetail>>,
    pub errors: Vec<AnalysisError>,
    pub searched_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_metadata: Option<crate::model::BatchStats>,
    pub success: bool,
}

impl EngineContext {
    pub fn get_function_details(&self, params: &GetFunctionDetailsParams) -> GetFunctionDetailsResponse {
        let candidates = self.candidate_files(&params.file_paths);
        let (files, mut errors) = self.read_files(&candidates);
        let owned: Vec<(PathBuf, String)> = files.iter().map(|(p, c, _, _)| (p.clone(), c.clone())).collect();

        let analyzer = FunctionAnalyzer::new(&owned);
        let inheritance = InheritanceResolver::build(&owned);
        let mut type_options = params.analyze_options.clone();
        type_options.include_calls = type_options.include_calls || params.include_calls;
        type_options.include_code = type_options.include_code || params.include_code;

        let mut details: std::collections::HashMap<String, Vec<FunctionDetail>> = std::collections::HashMap::new();
        let mut batch_stats = crate::model::BatchStats::default();

        for name in &params.functions {
            let mut found_any = false;
            for (path, content) in &owned {
                let mut detail = match analyzer.analyze(name, path, &type_options) {
                    Ok(d) => d,
                    Err(_) => continue,
                };
                found_any = true;

                if params.include_types {
                    let resolver = TypeResolver::new(&self.project_root, &owned, Some(&inheritance));
                    let depth = params.resolution_depth.to_depth();
                    let mut types = FunctionTypes::default();
                    for parameter in &detail.parameters {
                        if let Some(annotation) = &parameter.type_annotation {
                            let (def, errs) = resolver.resolve(annotation, path, depth, params.max_constraint_depth);
                            types.parameter_types.push(def.text.clone());
                            if !errs.is_empty() {
                                batch_stats.error += 1;
                                if !params.fallback_on_complexity {
                                    errors.extend(errs);
                                }
                            } else {
                                batch_stats.basic += 1;
                            }
                        }
                    }
                    if let Some(return_type) = &detail.return_type {
                        let (def, errs) = resolver.resolve(return_type, path, depth, params.max_constraint_depth);
                        types.return_type = Some(def.text.clone());
                        if !errs.is_empty() && !params.fallback_on_complexity {
                            errors.extend(errs);
                        }
                    }
                    if let Some(generics) = &detail.generic_params {
                        let (constraint_depths, errs) =
                            resolver.check_constraints(generics, path, params.max_constraint_depth);
                        types.constraints = constraint_depths
                            .into_iter()
                            .map(|(param, depth)| format!("{param}: depth {depth}"))
                            .collect();
                        if !errs.is_empty() {
                            if params.fallback_on_complexity {
                                batch_stats.error += 1;
                            } else {
                                errors.extend(errs);
                            }
                        }
                    }
                    detail.types = Some(types);
                }

                details.entry(name.clone()).or_default().push(detail);
            }
            if !found_any {
                errors.push(
                    AnalysisError::new(
                        AnalysisErrorCode::NotFound,
                        format!("function '{name}' not found in any provided file"),
                    ),
                );
            }
        }

        let produced_any = details.values().any(|v| !v.is_empty());
        let success = overall_success(&errors, produced_any);
        let resolution_metadata = params.include_types.then_some(batch_stats);

        GetFunctionDetailsResponse {
            details,
            errors,
            searched_files: files.len(),
            resolution_metadata,
            success,
        }
    }
}

// ---------------------------------------------------------------------
// analyze_call_graph
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnalyzeCallGraphParams {
    pub entry_point: String,
    pub file_paths: Vec<String>,
    pub max_depth: usize,
    pub include_external_calls: bool,
    pub analyze_conditions: bool,
    pub page: usize,
}

impl EngineContext {
    pub fn analyze_call_graph(&self, params: &AnalyzeCallGraphParams) -> crate::call_graph::CallGraphResult {
        let candidates: Vec<PathBuf> = params.file_paths.iter().map(|p| self.resolve_candidate(p)).collect();
        let (files, read_errors) = self.read_files(&candidates);
        let owned: Vec<(PathBuf, String)> = files.into_iter().map(|(p, c, _, _)| (p, c)).collect();

        let options = crate::call_graph::CallGraphOptions {
            max_depth: params.max_depth,
            include_external_calls: params.include_external_calls,
            analyze_conditions: params.analyze_conditions,
            page: params.page,
        };

        let mut result = crate::call_graph::analyze(&owned, &params.entry_point, &options);
        let mut errors = read_errors;
        errors.append(&mut result.errors);
        result.errors = errors;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn find_references_locates_declaration_import_and_call() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "a.ts", "export class User {}\n");
        write(
            dir.path(),
            "b.ts",
            "import { User } from './a';\nnew User();\n",
        );

        let engine = EngineContext::new(dir.path());
        let params = FindReferencesParams {
            symbol: "User".to_string(),
            file_paths: FilePathsInput::All,
            include_declarations: true,
            include_usages: true,
            include_tests: true,
            resolution_depth: ResolutionDepthInput::Semantic,
            resolve_inheritance: false,
            method_resolution: false,
            include_confidence_scores: false,
            resolve_imports: false,
            page: 0,
        };
        let response = engine.find_references(&params);
        assert_eq!(response.total_references, 3);
        assert!(
            response
                .references
                .iter()
                .any(|r| r.file.ends_with("a.ts") && r.kind == crate::model::ReferenceKind::Declaration)
        );
        assert!(
            response
                .references
                .iter()
                .any(|r| r.file.ends_with("b.ts") && r.kind == crate::model::ReferenceKind::Import)
        );
        assert!(response.references.iter().any(|r| {
            r.file.ends_with("b.ts") && r.kind == crate::model::ReferenceKind::Call && r.line == 2
        }));
        assert!(response.references.iter().all(|r| r.confidence >= 0.7));
    }

    #[test]
    fn get_function_details_locates_named_function() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "a.ts", "export function add(a: number, b: number): number {\n  return a + b;\n}\n");

        let engine = EngineContext::new(dir.path());
        let params = GetFunctionDetailsParams {
            functions: vec!["add".to_string()],
            file_paths: FilePathsInput::All,
            include_code: true,
            include_types: false,
            include_calls: true,
            resolution_depth: TypeResolutionDepthInput::Basic,
            analyze_options: AnalyzeOptions::default(),
            max_constraint_depth: 5,
            fallback_on_complexity: true,
        };
        let response = engine.get_function_details(&params);
        let matches = response.details.get("add").expect("add should be found");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].parameters.len(), 2);
    }

    #[test]
    fn analyze_call_graph_reports_not_found_for_missing_entry_point() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = write(dir.path(), "a.ts", "function a() {}\n");

        let engine = EngineContext::new(dir.path());
        let params = AnalyzeCallGraphParams {
            entry_point: "missing".to_string(),
            file_paths: vec![file.to_string_lossy().to_string()],
            max_depth: 5,
            include_external_calls: false,
            analyze_conditions: false,
            page: 0,
        };
        let response = engine.analyze_call_graph(&params);
        assert!(
            response
                .errors
                .iter()
                .any(|e| e.code == AnalysisErrorCode::NotFound)
        );
    }
}
