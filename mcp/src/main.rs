//! # tsa-mcp
//!
//! MCP server exposing the TypeScript/TSX static analysis engine
//! (`tsa-core`) as three tools: `find_references`, `get_function_details`,
//! `analyze_call_graph` (spec §6).
//!
//! Grounded on `loctree-mcp/src/main.rs`: project-agnostic tools that each
//! accept a `project` argument, a multi-project cache of long-lived engine
//! state (`LoctreeServer::cache` -> [`AnalysisServer::cache`]), the same
//! panic-hook/SIGPIPE handling for clean shutdown under an MCP client, and
//! stderr-only logging since stdout carries the JSON-RPC transport.

use std::collections::HashMap;
use std::panic;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::ServerInfo;
use rmcp::{ServerHandler, ServiceExt, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use tsa_core::engine::{
    AnalyzeCallGraphParams, EngineContext, FilePathsInput, FindReferencesParams,
    GetFunctionDetailsParams, ResolutionDepthInput, TypeResolutionDepthInput,
};
use tsa_core::function_analyzer::AnalyzeOptions;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(ClapParser, Debug)]
#[command(name = "tsa-mcp")]
#[command(about = "MCP server exposing TypeScript/TSX static analysis tools")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

fn default_project() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_resolution_depth() -> String {
    "syntactic".to_string()
}

fn default_type_resolution_depth() -> String {
    "basic".to_string()
}

fn default_max_depth() -> usize {
    10
}

fn default_max_constraint_depth() -> u32 {
    5
}

fn default_page() -> usize {
    0
}

/// `file_paths: string | [string] | null` at the JSON boundary (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum FilePathsArg {
    One(String),
    Many(Vec<String>),
}

impl FilePathsArg {
    fn into_input(value: Option<FilePathsArg>) -> FilePathsInput {
        match value {
            None => FilePathsInput::All,
            Some(FilePathsArg::One(s)) => FilePathsInput::One(s),
            Some(FilePathsArg::Many(v)) if v.len() == 1 => FilePathsInput::One(v.into_iter().next().unwrap()),
            Some(FilePathsArg::Many(v)) => FilePathsInput::Many(v),
        }
    }
}

fn parse_resolution_depth(s: &str) -> ResolutionDepthInput {
    match s {
        "semantic" => ResolutionDepthInput::Semantic,
        "full_type" => ResolutionDepthInput::FullType,
        _ => ResolutionDepthInput::Syntactic,
    }
}

fn parse_type_resolution_depth(s: &str) -> TypeResolutionDepthInput {
    match s {
        "generics" => TypeResolutionDepthInput::Generics,
        "full" => TypeResolutionDepthInput::Full,
        _ => TypeResolutionDepthInput::Basic,
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct FindReferencesArgs {
    /// Project directory to analyze (default: current directory, or
    /// `MCP_FILE_ROOT` if unset).
    #[serde(default = "default_project")]
    project: String,
    /// Symbol name to find. Supports `ClassName#methodName` for a specific
    /// method on a specific class.
    symbol: String,
    /// Files to search: a single path, a list of paths, or omitted to
    /// search the whole project.
    #[serde(default)]
    file_paths: Option<FilePathsArg>,
    #[serde(default = "default_true")]
    include_declarations: bool,
    #[serde(default = "default_true")]
    include_usages: bool,
    #[serde(default = "default_false")]
    include_tests: bool,
    /// One of `syntactic`, `semantic`, `full_type`.
    #[serde(default = "default_resolution_depth")]
    resolution_depth: String,
    #[serde(default = "default_false")]
    resolve_inheritance: bool,
    #[serde(default = "default_false")]
    method_resolution: bool,
    #[serde(default = "default_true")]
    include_confidence_scores: bool,
    #[serde(default = "default_false")]
    resolve_imports: bool,
    #[serde(default = "default_page")]
    page: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct GetFunctionDetailsArgs {
    #[serde(default = "default_project")]
    project: String,
    /// Function name(s) to locate. A single name or a list.
    functions: FilePathsArg,
    #[serde(default)]
    file_paths: Option<FilePathsArg>,
    #[serde(default = "default_true")]
    include_code: bool,
    #[serde(default = "default_false")]
    include_types: bool,
    #[serde(default = "default_true")]
    include_calls: bool,
    /// One of `basic`, `generics`, `full`.
    #[serde(default = "default_type_resolution_depth")]
    resolution_depth: String,
    #[serde(default = "default_false")]
    include_nested_functions: bool,
    #[serde(default = "default_false")]
    include_overloads: bool,
    #[serde(default = "default_false")]
    include_control_flow: bool,
    #[serde(default = "default_false")]
    include_variables: bool,
    #[serde(default = "default_false")]
    include_dynamic_calls: bool,
    #[serde(default = "default_false")]
    include_async_patterns: bool,
    #[serde(default = "default_max_constraint_depth")]
    max_constraint_depth: u32,
    #[serde(default = "default_true")]
    fallback_on_complexity: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct AnalyzeCallGraphArgs {
    #[serde(default = "default_project")]
    project: String,
    entry_point: String,
    /// Files to analyze. Required (spec §6: `file_paths` is required for
    /// this tool, unlike the other two).
    file_paths: Vec<String>,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
    #[serde(default = "default_false")]
    include_external_calls: bool,
    #[serde(default = "default_false")]
    analyze_conditions: bool,
    #[serde(default = "default_page")]
    page: usize,
}

// ============================================================================
// Server State - Multi-project engine cache
// ============================================================================

/// One long-lived [`EngineContext`] per project root, analogous to
/// `LoctreeServer::cache`'s per-project `Snapshot` cache: the first request
/// against a project builds the context (parser/cache/memory state) and
/// every later request against the same root reuses it, so the three-tier
/// cache (spec §4.2) actually pays off across calls.
#[derive(Clone)]
struct AnalysisServer {
    cache: Arc<RwLock<HashMap<PathBuf, Arc<EngineContext>>>>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

impl AnalysisServer {
    fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            tool_router: Self::tool_router(),
        }
    }

    /// Resolve `project` to an absolute, canonicalized path.
    /// Note: path traversal is intentional - the MCP server runs locally
    /// with the same privileges as its client.
    fn resolve_project(project: &str) -> Result<PathBuf> {
        // nosemgrep: rust.actix.path-traversal.tainted-path.tainted-path
        let path = PathBuf::from(project); // nosemgrep
        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        absolute
            .canonicalize()
            .with_context(|| format!("Project directory not found: {}", project))
    }

    /// Get or create the cached engine context for a project root.
    async fn get_engine(&self, project: &Path) -> Arc<EngineContext> {
        {
            let cache = self.cache.read().await;
            if let Some(engine) = cache.get(project) {
                debug!("Reusing cached engine context for {:?}", project);
                return Arc::clone(engine);
            }
        }

        info!("Building engine context for {:?}", project);
        let engine = Arc::new(EngineContext::new(project));

        let mut cache = self.cache.write().await;
        // Another request may have raced us to build the same context;
        // keep whichever landed first so there's a single owner of the
        // parser/cache/memory state per project root.
        Arc::clone(cache.entry(project.to_path_buf()).or_insert(engine))
    }

    /// Drop a project's cached engine, forcing a fresh context (and empty
    /// caches) on the next request against it.
    async fn invalidate(&self, project: &Path) {
        let mut cache = self.cache.write().await;
        cache.remove(project);
    }
}

// ============================================================================
// MCP Tool Implementations
// ============================================================================

#[tool_router]
impl AnalysisServer {
    /// Find where a symbol is declared, defined, imported, and used.
    #[tool(
        name = "find_references",
        description = "Find every declaration, definition, import, and usage of a TypeScript/TSX symbol across a project. Supports 'ClassName#methodName' to target one method on one class, and resolution_depth to trade thoroughness for speed (syntactic is fastest, full_type resolves cross-file imports and inheritance chains)."
    )]
    async fn find_references(&self, Parameters(args): Parameters<FindReferencesArgs>) -> String {
        let project = match Self::resolve_project(&args.project) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };
        let engine = self.get_engine(&project).await;

        let params = FindReferencesParams {
            symbol: args.symbol,
            file_paths: FilePathsArg::into_input(args.file_paths),
            include_declarations: args.include_declarations,
            include_usages: args.include_usages,
            include_tests: args.include_tests,
            resolution_depth: parse_resolution_depth(&args.resolution_depth),
            resolve_inheritance: args.resolve_inheritance,
            method_resolution: args.method_resolution,
            include_confidence_scores: args.include_confidence_scores,
            resolve_imports: args.resolve_imports,
            page: args.page,
        };

        let response = engine.find_references(&params);
        serde_json::to_string_pretty(&response)
            .unwrap_or_else(|e| format!("Serialization error: {}", e))
    }

    /// Locate named functions/methods and extract their signatures, bodies,
    /// calls, and (optionally) resolved types.
    #[tool(
        name = "get_function_details",
        description = "Locate one or more named functions/methods across a project and return their signature, parameters, body, call sites, and (with include_types) progressively resolved parameter/return/constraint types. Accepts 'ClassName.methodName' for a method on a specific class."
    )]
    async fn get_function_details(&self, Parameters(args): Parameters<GetFunctionDetailsArgs>) -> String {
        let project = match Self::resolve_project(&args.project) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };
        let engine = self.get_engine(&project).await;

        let functions = match args.functions {
            FilePathsArg::One(s) => vec![s],
            FilePathsArg::Many(v) => v,
        };

        let params = GetFunctionDetailsParams {
            functions,
            file_paths: FilePathsArg::into_input(args.file_paths),
            include_code: args.include_code,
            include_types: args.include_types,
            include_calls: args.include_calls,
            resolution_depth: parse_type_resolution_depth(&args.resolution_depth),
            analyze_options: AnalyzeOptions {
                include_code: args.include_code,
                include_calls: args.include_calls,
                include_nested_functions: args.include_nested_functions,
                include_overloads: args.include_overloads,
                include_control_flow: args.include_control_flow,
                include_variables: args.include_variables,
                include_dynamic_calls: args.include_dynamic_calls,
                include_async_patterns: args.include_async_patterns,
            },
            max_constraint_depth: args.max_constraint_depth,
            fallback_on_complexity: args.fallback_on_complexity,
        };

        let response = engine.get_function_details(&params);
        serde_json::to_string_pretty(&response)
            .unwrap_or_else(|e| format!("Serialization error: {}", e))
    }

    /// Build a forward call graph from an entry-point function.
    #[tool(
        name = "analyze_call_graph",
        description = "Build the forward call graph from an entry-point function across a given file set, up to max_depth. Detects and breaks cycles/recursion with placeholder nodes, and with analyze_conditions=true annotates execution paths with their guarding if/switch/try branches and estimated probabilities."
    )]
    async fn analyze_call_graph(&self, Parameters(args): Parameters<AnalyzeCallGraphArgs>) -> String {
        let project = match Self::resolve_project(&args.project) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };
        let engine = self.get_engine(&project).await;

        let params = AnalyzeCallGraphParams {
            entry_point: args.entry_point,
            file_paths: args.file_paths,
            max_depth: args.max_depth,
            include_external_calls: args.include_external_calls,
            analyze_conditions: args.analyze_conditions,
            page: args.page,
        };

        let response = engine.analyze_call_graph(&params);
        serde_json::to_string_pretty(&response)
            .unwrap_or_else(|e| format!("Serialization error: {}", e))
    }

    /// Drop the cached engine state for a project, forcing fresh parsing
    /// and empty caches on the next request against it.
    #[tool(
        name = "invalidate_project",
        description = "Drop cached parse/symbol/cache state for a project, forcing the next analysis request against it to start fresh. Use after large external changes (e.g. a branch switch) the incremental analyzer wasn't driven against."
    )]
    async fn invalidate_project(&self, Parameters(args): Parameters<FindingsParams>) -> String {
        let project = match Self::resolve_project(&args.project) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };
        self.invalidate(&project).await;
        serde_json::json!({ "status": "ok", "project": project.display().to_string() }).to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct FindingsParams {
    #[serde(default = "default_project")]
    project: String,
}

#[tool_handler]
impl ServerHandler for AnalysisServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: rmcp::model::ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation {
                name: "tsa".to_string(),
                title: Some("TypeScript Static Analysis MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: Some("https://github.com/tsa-rs/tsa".to_string()),
            },
            instructions: Some(
                "Static analysis over a TypeScript/TSX project's source tree. \
                 All tools accept a 'project' argument (default: current directory).\n\n\
                 - find_references(symbol) - where a symbol is declared, defined, \
                   imported, and used. Supports 'Class#method'.\n\
                 - get_function_details(functions) - signature, body, calls, and \
                   (with include_types) resolved types for named functions/methods.\n\
                 - analyze_call_graph(entry_point, file_paths) - forward call graph \
                   from an entry point, with cycle detection and optional \
                   conditional-branch annotation.\n\
                 - invalidate_project(project) - drop cached state after large \
                   external changes.\n\n\
                 Every response carries per-item confidence scores and an errors \
                 list; partial results are normal when some files fail to parse."
                    .into(),
            ),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Install a panic hook that logs to stderr and exits cleanly. Handles the
/// "broken pipe" panic from `rmcp` when the client disconnects mid-write.
fn install_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        if msg.contains("Broken pipe") || msg.contains("os error 32") {
            eprintln!("[tsa-mcp] Client disconnected (broken pipe), shutting down");
        } else {
            let location = panic_info
                .location()
                .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
                .unwrap_or_default();
            eprintln!("[tsa-mcp] Panic{}: {}", location, msg);
        }

        std::process::exit(1);
    }));
}

/// Ignore SIGPIPE at the OS level so writing to a closed stdio pipe fails
/// with `EPIPE` rather than terminating the process.
#[cfg(unix)]
fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

#[cfg(not(unix))]
fn ignore_sigpipe() {}

async fn run_server() -> Result<()> {
    let args = Args::parse();

    // Logging MUST write to stderr; stdout carries MCP JSON-RPC.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.parse().unwrap_or_default()),
        )
        .init();

    info!("Starting tsa-mcp v{}", env!("CARGO_PKG_VERSION"));

    let server = AnalysisServer::new();

    info!("Server ready. Listening on stdio...");

    server
        .serve(rmcp::transport::stdio())
        .await?
        .waiting()
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    ignore_sigpipe();
    install_panic_hook();

    match run_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err_str = format!("{:?}", e);
            if err_str.contains("Broken pipe") || err_str.contains("os error 32") {
                eprintln!("[tsa-mcp] Client disconnected, shutting down");
                ExitCode::SUCCESS
            } else {
                eprintln!("[tsa-mcp] Error: {:#}", e);
                ExitCode::FAILURE
            }
        }
    }
}
