//! `tsa` — command-line driver for the analysis engine.
//!
//! A thin CLI over [`tsa_core::engine::EngineContext`]: one subcommand per
//! tool surface of spec §6, plus `incremental` for the reanalysis
//! coordinator of §4.10. Every subcommand prints its response as JSON on
//! stdout so the binary composes with `jq` the way the teacher's `loct`
//! does (`loctree_rs/src/bin/loct.rs`).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use tsa_core::engine::{
    AnalyzeCallGraphParams, EngineContext, FilePathsInput, FindReferencesParams,
    GetFunctionDetailsParams, ResolutionDepthInput, TypeResolutionDepthInput,
};
use tsa_core::function_analyzer::AnalyzeOptions;

#[derive(Parser, Debug)]
#[command(name = "tsa", author, version, about = "Static analysis engine for TypeScript/TSX projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root to anchor relative paths and project-wide scans
    /// against (defaults to `MCP_FILE_ROOT`, then the current directory,
    /// spec §6).
    #[arg(long, global = true)]
    project: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// find_references: where a symbol is declared, defined, and used.
    FindReferences {
        /// Symbol name, or `ClassName#methodName` for a single method.
        symbol: String,
        /// Restrict the search to these files (default: whole project).
        #[arg(long)]
        file: Vec<String>,
        #[arg(long, default_value_t = true)]
        include_declarations: bool,
        #[arg(long, default_value_t = true)]
        include_usages: bool,
        #[arg(long)]
        include_tests: bool,
        /// syntactic | semantic | full-type
        #[arg(long, default_value = "semantic")]
        resolution_depth: String,
        #[arg(long)]
        resolve_inheritance: bool,
        #[arg(long)]
        method_resolution: bool,
        #[arg(long)]
        include_confidence_scores: bool,
        #[arg(long)]
        resolve_imports: bool,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// get_function_details: signature, body, calls, and types for one or
    /// more named functions.
    FunctionDetails {
        /// Function names, or `ClassName.methodName`.
        functions: Vec<String>,
        #[arg(long)]
        file: Vec<String>,
        #[arg(long, default_value_t = true)]
        include_code: bool,
        #[arg(long)]
        include_types: bool,
        #[arg(long, default_value_t = true)]
        include_calls: bool,
        /// basic | generics | full
        #[arg(long, default_value = "basic")]
        resolution_depth: String,
        #[arg(long, default_value_t = 5)]
        max_constraint_depth: u32,
        #[arg(long, default_value_t = true)]
        fallback_on_complexity: bool,
        #[arg(long)]
        include_nested_functions: bool,
        #[arg(long)]
        include_overloads: bool,
        #[arg(long)]
        include_control_flow: bool,
        #[arg(long)]
        include_variables: bool,
        #[arg(long)]
        include_dynamic_calls: bool,
        #[arg(long)]
        include_async_patterns: bool,
    },
    /// analyze_call_graph: forward call graph from an entry point, with
    /// cycle detection and (optionally) conditional-branch annotation.
    CallGraph {
        entry_point: String,
        /// Files to search (required — the graph only spans what's given).
        #[arg(long, required = true)]
        file: Vec<String>,
        #[arg(long, default_value_t = 10)]
        max_depth: usize,
        #[arg(long)]
        include_external_calls: bool,
        #[arg(long)]
        analyze_conditions: bool,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Runs one incremental-reanalysis pass over the whole project and
    /// reports what changed (spec §4.10).
    Incremental,
}

fn parse_resolution_depth(s: &str) -> ResolutionDepthInput {
    match s {
        "syntactic" => ResolutionDepthInput::Syntactic,
        "full_type" | "full-type" | "dynamic" => ResolutionDepthInput::FullType,
        _ => ResolutionDepthInput::Semantic,
    }
}

fn parse_type_depth(s: &str) -> TypeResolutionDepthInput {
    match s {
        "generics" => TypeResolutionDepthInput::Generics,
        "full" => TypeResolutionDepthInput::Full,
        _ => TypeResolutionDepthInput::Basic,
    }
}

fn file_paths(files: Vec<String>) -> FilePathsInput {
    FilePathsInput::from_optional(if files.is_empty() { None } else { Some(files) })
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to serialize response: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.log_level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();

    let engine = match cli.project {
        Some(root) => EngineContext::new(root),
        None => EngineContext::from_env(),
    };

    match cli.command {
        Commands::FindReferences {
            symbol,
            file,
            include_declarations,
            include_usages,
            include_tests,
            resolution_depth,
            resolve_inheritance,
            method_resolution,
            include_confidence_scores,
            resolve_imports,
            page,
        } => {
            let params = FindReferencesParams {
                symbol,
                file_paths: file_paths(file),
                include_declarations,
                include_usages,
                include_tests,
                resolution_depth: parse_resolution_depth(&resolution_depth),
                resolve_inheritance,
                method_resolution,
                include_confidence_scores,
                resolve_imports,
                page,
            };
            print_json(&engine.find_references(&params))
        }
        Commands::FunctionDetails {
            functions,
            file,
            include_code,
            include_types,
            include_calls,
            resolution_depth,
            max_constraint_depth,
            fallback_on_complexity,
            include_nested_functions,
            include_overloads,
            include_control_flow,
            include_variables,
            include_dynamic_calls,
            include_async_patterns,
        } => {
            let params = GetFunctionDetailsParams {
                functions,
                file_paths: file_paths(file),
                include_code,
                include_types,
                include_calls,
                resolution_depth: parse_type_depth(&resolution_depth),
                analyze_options: AnalyzeOptions {
                    include_code,
                    include_calls,
                    include_nested_functions,
                    include_overloads,
                    include_control_flow,
                    include_variables,
                    include_dynamic_calls,
                    include_async_patterns,
                },
                max_constraint_depth,
                fallback_on_complexity,
            };
            print_json(&engine.get_function_details(&params))
        }
        Commands::CallGraph {
            entry_point,
            file,
            max_depth,
            include_external_calls,
            analyze_conditions,
            page,
        } => {
            let params = AnalyzeCallGraphParams {
                entry_point,
                file_paths: file,
                max_depth,
                include_external_calls,
                analyze_conditions,
                page,
            };
            print_json(&engine.analyze_call_graph(&params))
        }
        Commands::Incremental => print_json(&engine.incremental_analysis()),
    }
}
