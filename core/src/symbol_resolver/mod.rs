//! Symbol Resolver (spec §4.5): three-pass (syntactic → semantic →
//! dynamic) symbol and reference resolution with confidence scoring,
//! filtering, result caching, and pagination.
//!
//! Grounded on `original_source/.../symbol_resolver.py`'s dispatch over
//! `resolution_depth`; per-file extraction reuses the teacher's
//! emit-on-visit traversal style (see [`extract`]).

mod extract;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::error::AnalysisError;
use crate::import_tracker::resolve_specifier;
use crate::inheritance::InheritanceResolver;
use crate::model::{AnalysisStats, Reference, ReferenceKind, Symbol, SymbolKind};
use crate::project::is_test_file;

pub use extract::{ExtractedSymbols, ImplementsClause};

/// How deep resolution should go (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionPass {
    Syntactic,
    Semantic,
    Dynamic,
}

impl ResolutionPass {
    fn as_str(self) -> &'static str {
        match self {
            ResolutionPass::Syntactic => "syntactic",
            ResolutionPass::Semantic => "semantic",
            ResolutionPass::Dynamic => "dynamic",
        }
    }

    fn depth(self) -> u8 {
        match self {
            ResolutionPass::Syntactic => 1,
            ResolutionPass::Semantic => 2,
            ResolutionPass::Dynamic => 3,
        }
    }
}

/// `ClassName#methodName` style target filter, or a bare symbol name
/// (spec §4.5 "Filters").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetFilter {
    Symbol(String),
    Method { class: String, method: String },
}

impl TargetFilter {
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('#') {
            Some((class, method)) => TargetFilter::Method {
                class: class.to_string(),
                method: method.to_string(),
            },
            None => TargetFilter::Symbol(spec.to_string()),
        }
    }

    fn matches_symbol(&self, symbol: &Symbol) -> bool {
        match self {
            TargetFilter::Symbol(name) => &symbol.name == name,
            TargetFilter::Method { class, method } => {
                symbol.name == *method && symbol.enclosing_class.as_deref() == Some(class.as_str())
            }
        }
    }

    fn matches_reference(&self, reference: &Reference) -> bool {
        match self {
            TargetFilter::Symbol(name) => reference.symbol_name.as_deref() == Some(name.as_str()),
            TargetFilter::Method { class, method } => {
                reference.symbol_name.as_deref() == Some(method.as_str())
                    && reference.class_name.as_deref() == Some(class.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveFilters {
    pub include_test_files: bool,
    pub kind: Option<SymbolKind>,
    pub target: Option<TargetFilter>,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub pass: ResolutionPass,
    pub filters: ResolveFilters,
    pub confidence_analysis: bool,
    pub inheritance_depth: u32,
    /// Zero-based page index; pagination cuts by an estimated token budget
    /// (spec §4.5, ~100 tokens/item).
    pub page: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            pass: ResolutionPass::Syntactic,
            filters: ResolveFilters::default(),
            confidence_analysis: false,
            inheritance_depth: 5,
            page: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub stats: AnalysisStats,
    pub total: usize,
    pub page_size: usize,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Approximate token cost per item used for pagination (spec §4.5).
const TOKENS_PER_ITEM: usize = 100;
const TOKEN_BUDGET_PER_PAGE: usize = 4000;
const ITEMS_PER_PAGE: usize = TOKEN_BUDGET_PER_PAGE / TOKENS_PER_ITEM;

#[derive(Clone)]
struct CachedResolution {
    symbols: Vec<Symbol>,
    references: Vec<Reference>,
    stats: AnalysisStats,
}

pub struct SymbolResolver {
    project_root: PathBuf,
    file_cache: Mutex<HashMap<PathBuf, ExtractedSymbols>>,
    resolution_cache: Mutex<HashMap<String, CachedResolution>>,
}

impl SymbolResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            file_cache: Mutex::new(HashMap::new()),
            resolution_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drops cached extraction for `file` and every cached resolution
    /// result (a resolution result may depend on any file in its input
    /// set, so a single-file invalidation clears the whole result cache;
    /// the per-file cache still saves the re-extraction cost).
    pub fn invalidate(&self, file: &Path) {
        self.file_cache.lock().unwrap().remove(file);
        self.resolution_cache.lock().unwrap().clear();
    }

    fn cache_key(files: &[(PathBuf, u64)], options: &ResolveOptions) -> String {
        let mut sorted: Vec<&(PathBuf, u64)> = files.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut hasher = Sha256::new();
        for (path, mtime) in sorted {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(mtime.to_le_bytes());
        }
        hasher.update(options.pass.as_str().as_bytes());
        hasher.update([options.filters.include_test_files as u8]);
        if let Some(kind) = options.filters.kind {
            hasher.update(format!("{kind:?}").as_bytes());
        }
        if let Some(target) = &options.filters.target {
            hasher.update(format!("{target:?}").as_bytes());
        }
        hasher.update([options.confidence_analysis as u8]);
        hasher.update(options.inheritance_depth.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn extracted_for(&self, path: &Path, content: &str) -> Option<ExtractedSymbols> {
        {
            let cache = self.file_cache.lock().unwrap();
            if let Some(cached) = cache.get(path) {
                return Some(clone_extracted(cached));
            }
        }
        let extracted = extract::extract_syntactic(&path.to_string_lossy(), content)?;
        let clone = clone_extracted(&extracted);
        self.file_cache.lock().unwrap().insert(path.to_path_buf(), extracted);
        Some(clone)
    }

    /// Resolves symbols/references across `files` (already-read
    /// `(path, content, mtime)` triples; callers own file I/O, mirroring
    /// the parser's own contract).
    pub fn resolve(
        &self,
        files: &[(PathBuf, String, u64)],
        options: &ResolveOptions,
        inheritance: Option<&InheritanceResolver>,
    ) -> (ResolveResult, Vec<AnalysisError>) {
        let effective: Vec<&(PathBuf, String, u64)> = files
            .iter()
            .filter(|(path, _, _)| options.filters.include_test_files || !is_test_file(path))
            .collect();

        let cache_key_inputs: Vec<(PathBuf, u64)> =
            effective.iter().map(|(p, _, m)| (p.clone(), *m)).collect();
        let key = Self::cache_key(&cache_key_inputs, options);

        let (mut symbols, mut references, stats, errors) = {
            let cached = self.resolution_cache.lock().unwrap().get(&key).cloned();
            if let Some(cached) = cached {
                let mut stats = cached.stats;
                stats.cache_hits += 1;
                (cached.symbols, cached.references, stats, Vec::new())
            } else {
                let (symbols, references, mut stats, errors) = self.resolve_uncached(&effective, options, inheritance);
                stats.cache_misses += 1;
                let to_cache = CachedResolution {
                    symbols: symbols.clone(),
                    references: references.clone(),
                    stats: stats.clone(),
                };
                self.resolution_cache.lock().unwrap().insert(key, to_cache);
                (symbols, references, stats, errors)
            }
        };

        apply_filters(&mut symbols, &mut references, &options.filters);
        if options.confidence_analysis {
            apply_confidence_analysis(&mut symbols, &mut references);
        }
        dedup_references(&mut references);

        let total = symbols.len() + references.len();
        let (symbols, references, has_more, next_cursor) = paginate(symbols, references, options.page);

        (
            ResolveResult {
                symbols,
                references,
                stats,
                total,
                page_size: ITEMS_PER_PAGE,
                next_cursor,
                has_more,
            },
            errors,
        )
    }

    fn resolve_uncached(
        &self,
        files: &[&(PathBuf, String, u64)],
        options: &ResolveOptions,
        inheritance: Option<&InheritanceResolver>,
    ) -> (Vec<Symbol>, Vec<Reference>, AnalysisStats, Vec<AnalysisError>) {
        let mut symbols = Vec::new();
        let mut references = Vec::new();
        let mut implements_clauses = Vec::new();
        let mut errors = Vec::new();
        let mut stats = AnalysisStats {
            pass_depth: options.pass.depth(),
            ..Default::default()
        };

        for (path, content, _mtime) in files {
            stats.searched_files += 1;
            match self.extracted_for(path, content) {
                Some(extracted) => {
                    symbols.extend(extracted.symbols);
                    references.extend(extracted.references);
                    for clause in extracted.implements_clauses {
                        implements_clauses.push((path.clone(), clause));
                    }
                }
                None => errors.push(
                    AnalysisError::new(
                        crate::error::AnalysisErrorCode::ParseError,
                        "failed to parse file during symbol resolution",
                    )
                    .with_file(path.to_string_lossy().to_string()),
                ),
            }
        }

        if matches!(options.pass, ResolutionPass::Semantic | ResolutionPass::Dynamic) {
            self.augment_semantic(files, &mut symbols, &mut references, implements_clauses);
        }

        if matches!(options.pass, ResolutionPass::Dynamic) {
            if let Some(inheritance) = inheritance {
                self.augment_dynamic(inheritance, &symbols, &mut references, options.inheritance_depth);
            }
        }

        (symbols, references, stats, errors)
    }

    fn augment_semantic(
        &self,
        files: &[&(PathBuf, String, u64)],
        symbols: &mut Vec<Symbol>,
        references: &mut Vec<Reference>,
        implements_clauses: Vec<(PathBuf, ImplementsClause)>,
    ) {
        // Resolve import specifiers to files: bump confidence on the
        // already-emitted import references that resolve inside the
        // project (invariant 6: confidence never decreases with depth).
        for reference in references.iter_mut() {
            if reference.kind != ReferenceKind::Import {
                continue;
            }
            let Some(path) = reference.import_path.clone() else {
                continue;
            };
            let owning = Path::new(&reference.file);
            if resolve_specifier(owning, &path, &self.project_root).is_some() {
                reference.bump_confidence(0.05);
            }
        }

        // Emit references for implements clauses.
        for (path, clause) in implements_clauses {
            let mut reference = Reference::new(
                path.to_string_lossy().to_string(),
                clause.line,
                clause.column,
                format!("class {} implements {}", clause.class_name, clause.interface_name),
                ReferenceKind::Usage,
            )
            .with_symbol(clause.interface_name.clone());
            reference.class_name = Some(clause.class_name);
            references.push(reference);
        }

        // Propagate symbol identity across re-exports: for each file,
        // re-extract its export records and, for re-exports resolving to
        // another file in this batch, clone that file's matching symbols
        // under the re-exporting file with slightly reduced confidence.
        let by_path: HashMap<&Path, &str> = files
            .iter()
            .map(|(p, c, _)| (p.as_path(), c.as_str()))
            .collect();
        let mut propagated = Vec::new();
        for (path, content) in by_path.iter().map(|(p, c)| (*p, *c)) {
            let Some(extracted) = crate::import_tracker::extract::extract(&path.to_string_lossy(), content) else {
                continue;
            };
            for export in extracted.exports {
                let Some(source) = &export.reexport_source else {
                    continue;
                };
                let Some(resolved) = resolve_specifier(path, source, &self.project_root) else {
                    continue;
                };
                for name in &export.names {
                    for symbol in symbols.iter() {
                        if &symbol.name == name && Path::new(&symbol.file) == resolved.as_path() {
                            let mut reexported = symbol.clone();
                            reexported.file = path.to_string_lossy().to_string();
                            reexported.exported = true;
                            reexported.confidence = crate::model::clamp_confidence(symbol.confidence * 0.95);
                            propagated.push(reexported);
                        }
                    }
                }
            }
        }
        symbols.extend(propagated);
    }

    fn augment_dynamic(
        &self,
        inheritance: &InheritanceResolver,
        symbols: &[Symbol],
        references: &mut Vec<Reference>,
        max_depth: u32,
    ) {
        let method_calls: Vec<(String, String)> = references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Call)
            .filter_map(|r| {
                let method = r.symbol_name.clone()?;
                let class = symbols
                    .iter()
                    .find(|s| s.kind == SymbolKind::Method && s.name == method)
                    .and_then(|s| s.enclosing_class.clone())?;
                Some((class, method))
            })
            .collect();

        let mut additions = Vec::new();
        for (class, method) in method_calls {
            for def in inheritance.resolve_method_reference(&class, &method, max_depth) {
                let mut reference = Reference::new(
                    def.file.clone(),
                    def.line,
                    def.column,
                    format!("{}.{}", def.class_name, def.method_name),
                    ReferenceKind::Usage,
                )
                .with_symbol(method.clone());
                reference.class_name = Some(def.class_name);
                reference.method_name = Some(def.method_name);
                reference.confidence = 0.5;
                additions.push(reference);
            }
        }
        references.extend(additions);
    }
}

fn clone_extracted(extracted: &ExtractedSymbols) -> ExtractedSymbols {
    ExtractedSymbols {
        symbols: extracted.symbols.clone(),
        references: extracted.references.clone(),
        implements_clauses: extracted.implements_clauses.clone(),
    }
}

fn apply_filters(symbols: &mut Vec<Symbol>, references: &mut Vec<Reference>, filters: &ResolveFilters) {
    if let Some(kind) = filters.kind {
        symbols.retain(|s| s.kind == kind);
        references.retain(|r| r.symbol_kind.map(|k| k == kind).unwrap_or(true));
    }
    if let Some(target) = &filters.target {
        symbols.retain(|s| target.matches_symbol(s));
        references.retain(|r| target.matches_reference(r));
    }
}

/// Optional confidence analysis (spec §4.5): exported symbols +0.1,
/// type-guard-pattern functions +0.1 and flagged, declaration references
/// +0.1. Scores are clamped to [0,1] (spec invariant 4).
fn apply_confidence_analysis(symbols: &mut [Symbol], references: &mut [Reference]) {
    for symbol in symbols.iter_mut() {
        if symbol.exported {
            symbol.bump_confidence(0.1);
        }
        if symbol.kind == SymbolKind::Function && is_type_guard_name(&symbol.name) {
            symbol.is_type_guard = true;
            symbol.bump_confidence(0.1);
        }
    }
    for reference in references.iter_mut() {
        if reference.kind == ReferenceKind::Declaration {
            reference.bump_confidence(0.1);
        }
    }
}

fn is_type_guard_name(name: &str) -> bool {
    name.starts_with("is") && name.len() > 2 && name.as_bytes()[2].is_ascii_uppercase()
}

/// Removes duplicate references sharing `(file, line, column, kind,
/// symbol_name)` (spec invariant 3).
pub fn dedup_references(references: &mut Vec<Reference>) {
    let mut seen = HashSet::new();
    references.retain(|r| seen.insert(r.identity()));
}

fn paginate(
    symbols: Vec<Symbol>,
    references: Vec<Reference>,
    page: usize,
) -> (Vec<Symbol>, Vec<Reference>, bool, Option<String>) {
    let symbol_budget = ITEMS_PER_PAGE;
    let total_items = symbols.len() + references.len();
    let start = page * symbol_budget;
    if start >= total_items {
        return (Vec::new(), Vec::new(), false, None);
    }

    let mut remaining = symbol_budget;
    let mut skip = start;
    let mut page_symbols = Vec::new();
    let mut page_references = Vec::new();

    for symbol in symbols.into_iter() {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        if remaining == 0 {
            break;
        }
        page_symbols.push(symbol);
        remaining -= 1;
    }
    for reference in references.into_iter() {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        if remaining == 0 {
            break;
        }
        page_references.push(reference);
        remaining -= 1;
    }

    let consumed = start + page_symbols.len() + page_references.len();
    let has_more = consumed < total_items;
    let next_cursor = if has_more { Some(format!("page_{}", page + 1)) } else { None };
    (page_symbols, page_references, has_more, next_cursor)
}

/// Exported names for a file (named exports + default), used to mark
/// [`Symbol::exported`] during pass 1 extraction.
fn exported_names(file: &str, content: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    if let Some(extracted) = crate::import_tracker::extract::extract(file, content) {
        for export in extracted.exports {
            names.extend(export.names);
            if let Some(default) = export.default_name {
                names.insert(default);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntactic_pass_resolves_single_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = SymbolResolver::new(dir.path());
        let file = dir.path().join("a.ts");
        let files = vec![(file.clone(), "export function foo() {}".to_string(), 1)];
        let (result, errors) = resolver.resolve(&files, &ResolveOptions::default(), None);
        assert!(errors.is_empty());
        assert!(result.symbols.iter().any(|s| s.name == "foo"));
    }

    #[test]
    fn target_filter_restricts_to_class_method() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = SymbolResolver::new(dir.path());
        let file = dir.path().join("a.ts");
        let files = vec![(
            file.clone(),
            "class Foo { bar() {} baz() {} }".to_string(),
            1,
        )];
        let options = ResolveOptions {
            filters: ResolveFilters {
                target: Some(TargetFilter::parse("Foo#bar")),
                ..Default::default()
            },
            ..Default::default()
        };
        let (result, _) = resolver.resolve(&files, &options, None);
        assert!(result.symbols.iter().all(|s| s.name == "bar"));
    }

    #[test]
    fn test_files_excluded_by_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = SymbolResolver::new(dir.path());
        let file = dir.path().join("a.test.ts");
        let files = vec![(file.clone(), "function foo() {}".to_string(), 1)];
        let (result, _) = resolver.resolve(&files, &ResolveOptions::default(), None);
        assert!(result.symbols.is_empty());

        let options = ResolveOptions {
            filters: ResolveFilters {
                include_test_files: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let (result, _) = resolver.resolve(&files, &options, None);
        assert!(!result.symbols.is_empty());
    }

    #[test]
    fn confidence_analysis_bumps_exported_symbols() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = SymbolResolver::new(dir.path());
        let file = dir.path().join("a.ts");
        let files = vec![(file.clone(), "export function foo() {}".to_string(), 1)];
        let without = ResolveOptions::default();
        let (plain, _) = resolver.resolve(&files, &without, None);
        let with_confidence = ResolveOptions {
            confidence_analysis: true,
            ..Default::default()
        };
        let (boosted, _) = resolver.resolve(&files, &with_confidence, None);
        let plain_conf = plain.symbols.iter().find(|s| s.name == "foo").unwrap().confidence;
        let boosted_conf = boosted.symbols.iter().find(|s| s.name == "foo").unwrap().confidence;
        assert!(boosted_conf > plain_conf);
    }

    #[test]
    fn cache_hit_increments_hit_counter() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = SymbolResolver::new(dir.path());
        let file = dir.path().join("a.ts");
        let files = vec![(file.clone(), "export function foo() {}".to_string(), 1)];
        let options = ResolveOptions::default();
        let (first, _) = resolver.resolve(&files, &options, None);
        assert_eq!(first.stats.cache_misses, 1);
        let (second, _) = resolver.resolve(&files, &options, None);
        assert_eq!(second.stats.cache_hits, 1);
    }

    #[test]
    fn dedup_references_removes_exact_duplicates() {
        let mut refs = vec![
            Reference::new("a.ts", 1, 0, "x", ReferenceKind::Usage).with_symbol("x"),
            Reference::new("a.ts", 1, 0, "x", ReferenceKind::Usage).with_symbol("x"),
        ];
        dedup_references(&mut refs);
        assert_eq!(refs.len(), 1);
    }
}
