//! # tsa-core
//!
//! Static analysis engine for TypeScript/TSX projects: a parser layer, a
//! three-tier cache with dependency-driven invalidation, a multi-pass
//! symbol resolver, a progressive type resolver, a function analyzer, a
//! call-graph builder with cycle detection, an import/export tracker, and
//! an incremental-reanalysis coordinator, all sharing a single parsed-AST
//! substrate.
//!
//! The engine answers three questions about a project's source tree:
//! *where is this symbol defined and used* ([`engine::EngineContext::find_references`]),
//! *what are the details of this function* ([`engine::EngineContext::get_function_details`]),
//! and *what does this function transitively call* ([`engine::EngineContext::analyze_call_graph`]).
//! Every answer carries a confidence score; the engine is permitted to
//! fall back to structural/regex-level reasoning when deep type
//! resolution is infeasible.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsa_core::engine::{EngineContext, FindReferencesParams, FilePathsInput, ResolutionDepthInput};
//!
//! let engine = EngineContext::new(".");
//! let response = engine.find_references(&FindReferencesParams {
//!     symbol: "User".to_string(),
//!     file_paths: FilePathsInput::All,
//!     include_declarations: true,
//!     include_usages: true,
//!     include_tests: false,
//!     resolution_depth: ResolutionDepthInput::Semantic,
//!     resolve_inheritance: false,
//!     method_resolution: false,
//!     include_confidence_scores: true,
//!     resolve_imports: false,
//!     page: 0,
//! });
//! println!("{} references found", response.total_references);
//! ```

/// Project-wide data model: files, cache entries, symbols, references,
/// imports/exports, the module graph, type definitions, the call graph.
pub mod model;

/// The closed error taxonomy shared by every tool surface.
pub mod error;

/// `.tsa/config.toml` loading and defaults.
pub mod config;

/// Project root resolution and `.ts`/`.tsx` file discovery.
pub mod project;

/// Produces and caches concrete syntax trees via `oxc`.
pub mod parser;

/// The three-tier (hot/warm/cold) cache with dependency-tracked
/// invalidation.
pub mod cache;

/// Process-memory pressure watcher with registered callbacks.
pub mod memory;

/// Import/export extraction, module resolution, dependency-graph
/// construction, cycle detection.
pub mod import_tracker;

/// Three-pass (syntactic/semantic/dynamic) symbol and reference
/// resolution.
pub mod symbol_resolver;

/// Class/interface hierarchy construction and method-reference
/// resolution.
pub mod inheritance;

/// Progressive (basic/generics/full) TypeScript type resolution.
pub mod type_resolver;

/// Function location, signature/body extraction, call-site and
/// control-flow analysis.
pub mod function_analyzer;

/// Forward call-graph construction, cycle detection/breaking, and
/// conditional-branch annotation.
pub mod call_graph;

/// File-change tracking and dependency-driven partial reanalysis.
pub mod incremental;

/// Wires every component into the three tool surfaces
/// (`find_references`, `get_function_details`, `analyze_call_graph`).
pub mod engine;

pub use engine::EngineContext;
pub use error::{AnalysisError, AnalysisErrorCode};
