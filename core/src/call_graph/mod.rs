//! Call Graph, Cycle Detector, Conditional Analyzer (spec §4.9): builds a
//! depth-limited call graph from an entry point, detects and breaks
//! cycles, enumerates execution paths, and (optionally) enriches those
//! paths with conditional-branch guards.
//!
//! Grounded on `original_source/.../get_call_trace.py`, which is the
//! combining entry point this module's [`analyze`] mirrors: build the
//! graph, detect/break cycles for stats, optionally enhance paths with
//! conditions, then paginate.

mod builder;
mod conditional;
mod cycles;

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisErrorCode};
use crate::model::{CallGraph, CallGraphNode, ExecutionPath, PathStep};

pub use builder::{CallGraphBuilder, CallSite, FunctionDefinition};
pub use conditional::{condition_complexity_score, ConditionalPath};
pub use cycles::CycleDetector;

const TOKENS_PER_ITEM: usize = 100;
const TOKEN_BUDGET_PER_PAGE: usize = 20_000;
const ITEMS_PER_PAGE: usize = TOKEN_BUDGET_PER_PAGE / TOKENS_PER_ITEM;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphStats {
    pub total_functions: usize,
    pub total_edges: usize,
    pub max_depth_reached: usize,
    pub cycles_detected: usize,
}

#[derive(Debug, Clone)]
pub struct CallGraphOptions {
    pub max_depth: usize,
    pub include_external_calls: bool,
    pub analyze_conditions: bool,
    /// Zero-based page index (spec §6 pagination envelope).
    pub page: usize,
}

impl Default for CallGraphOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            include_external_calls: false,
            analyze_conditions: false,
            page: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphResult {
    pub entry_point: String,
    pub execution_paths: Vec<ExecutionPath>,
    pub call_graph_stats: CallGraphStats,
    pub errors: Vec<AnalysisError>,
    pub total: usize,
    pub page_size: usize,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Builds the call graph for `entry_point` across `files`, detects and
/// breaks cycles, generates execution paths (optionally enhanced with
/// conditional guards), and paginates the result (spec §4.9, §6
/// `analyze_call_graph`).
pub fn analyze(files: &[(PathBuf, String)], entry_point: &str, options: &CallGraphOptions) -> CallGraphResult {
    let mut errors = Vec::new();

    if entry_point.is_empty() {
        errors.push(AnalysisError::new(
            AnalysisErrorCode::InvalidEntryPoint,
            "Entry point cannot be empty",
        ));
        return empty_result(entry_point, errors);
    }

    let builder = CallGraphBuilder::new(files);
    if !builder.function_definitions.contains_key(entry_point) {
        errors.push(AnalysisError::new(
            AnalysisErrorCode::NotFound,
            format!("Entry point function '{entry_point}' not found in any of the provided files"),
        ));
    }

    let adjacency = builder.build_adjacency(entry_point, options.max_depth);
    let max_depth_reached = builder.max_depth_reached(&adjacency, entry_point);

    let mut execution_paths = generate_execution_paths(&adjacency, entry_point, options.max_depth);

    if options.analyze_conditions {
        if let Some(body) = builder.function_body(entry_point) {
            execution_paths = conditional::enhance_execution_paths(&execution_paths, &body);
        }
    }

    let mut detector = CycleDetector::from_adjacency(&adjacency);
    let cycles = detector.detect_and_break();

    let total_functions = builder.function_definitions.len();
    let total_edges: usize = adjacency.values().map(|v| v.len()).sum();

    let stats = CallGraphStats {
        total_functions,
        total_edges,
        max_depth_reached,
        cycles_detected: cycles.len(),
    };

    let (page_items, total, page_size, next_cursor, has_more) = paginate(execution_paths, options.page);

    CallGraphResult {
        entry_point: entry_point.to_string(),
        execution_paths: page_items,
        call_graph_stats: stats,
        errors,
        total,
        page_size,
        next_cursor,
        has_more,
    }
}

/// Also exposes the broken-edge [`CallGraph`] model (nodes/edges with
/// cycle placeholders) for callers that want the graph itself rather than
/// just execution paths.
pub fn build_graph_model(files: &[(PathBuf, String)], entry_point: &str, max_depth: usize) -> CallGraph {
    let builder = CallGraphBuilder::new(files);
    let adjacency = builder.build_adjacency(entry_point, max_depth);
    let mut detector = CycleDetector::from_adjacency(&adjacency);
    detector.detect_and_break();
    let broken = detector.adjacency();

    let mut graph = CallGraph::new(entry_point);
    graph.max_depth_reached = builder.max_depth_reached(&adjacency, entry_point);

    for (source, targets) in &broken {
        let from_node = node_for(source);
        for target in targets {
            let to_node = node_for(target);
            graph.add_edge(from_node.clone(), to_node, None);
        }
    }
    graph.cycles_detected = detector.broken_edges().len();
    graph
}

fn node_for(name: &str) -> CallGraphNode {
    // Both the multi-node `[CYCLE: X]` and self-recursion `[RECURSION: X]`
    // placeholders (spec §4.9/glossary "Placeholder node") are broken-edge
    // substitutes and share the same `CallGraphNode` representation.
    let target = name
        .strip_prefix("[CYCLE: ")
        .or_else(|| name.strip_prefix("[RECURSION: "))
        .and_then(|s| s.strip_suffix(']'));
    if let Some(target) = target {
        CallGraphNode::CyclePlaceholder {
            target: target.to_string(),
            label: name.to_string(),
        }
    } else {
        CallGraphNode::Function(name.to_string())
    }
}

/// DFS from `entry_point` emitting every root-to-leaf execution path,
/// closing a path when a call targets a function already on it (cycle),
/// and emitting the partial path when `max_depth` is reached mid-traversal
/// (spec §4.9 "Execution paths").
fn generate_execution_paths(
    adjacency: &std::collections::HashMap<String, Vec<String>>,
    entry_point: &str,
    max_depth: usize,
) -> Vec<ExecutionPath> {
    let mut paths = Vec::new();
    if adjacency.contains_key(entry_point) {
        let mut current = Vec::new();
        dfs_paths(adjacency, entry_point, &mut current, 0, max_depth, &mut paths);
    }

    if paths.is_empty() {
        if let Some(calls) = adjacency.get(entry_point) {
            for called in calls {
                paths.push(ExecutionPath {
                    steps: vec![step(entry_point), step(called)],
                    closed_by_cycle: false,
                    truncated: false,
                });
            }
        }
    }

    paths
}

fn dfs_paths(
    adjacency: &std::collections::HashMap<String, Vec<String>>,
    current_func: &str,
    current_path: &mut Vec<String>,
    depth: usize,
    max_depth: usize,
    paths: &mut Vec<ExecutionPath>,
) {
    if depth > max_depth {
        if current_path.len() > 1 {
            paths.push(path_from(current_path, false, true));
        }
        return;
    }

    current_path.push(current_func.to_string());

    match adjacency.get(current_func) {
        Some(called_functions) if !called_functions.is_empty() => {
            for called_func in called_functions {
                if current_path.contains(called_func) {
                    let mut cycle_path = current_path.clone();
                    cycle_path.push(called_func.clone());
                    paths.push(path_from(&cycle_path, true, false));
                } else {
                    dfs_paths(adjacency, called_func, current_path, depth + 1, max_depth, paths);
                }
            }
        }
        _ => {
            if current_path.len() > 1 {
                paths.push(path_from(current_path, false, false));
            }
        }
    }

    current_path.pop();
}

fn path_from(names: &[String], closed_by_cycle: bool, truncated: bool) -> ExecutionPath {
    ExecutionPath {
        steps: names.iter().map(|n| step(n)).collect(),
        closed_by_cycle,
        truncated,
    }
}

fn step(name: &str) -> PathStep {
    PathStep {
        function: name.to_string(),
        guard: None,
        probability: None,
    }
}

fn empty_result(entry_point: &str, errors: Vec<AnalysisError>) -> CallGraphResult {
    CallGraphResult {
        entry_point: entry_point.to_string(),
        execution_paths: Vec::new(),
        call_graph_stats: CallGraphStats {
            total_functions: 0,
            total_edges: 0,
            max_depth_reached: 0,
            cycles_detected: 0,
        },
        errors,
        total: 0,
        page_size: 0,
        next_cursor: None,
        has_more: false,
    }
}

/// Paginates execution paths sorted by step count, matching the teacher's
/// `_paginate_execution_paths`' `sort_key=len(path)`.
fn paginate(mut paths: Vec<ExecutionPath>, page: usize) -> (Vec<ExecutionPath>, usize, usize, Option<String>, bool) {
    paths.sort_by_key(|p| p.steps.len());
    let total = paths.len();
    let start = page * ITEMS_PER_PAGE;
    if start >= total {
        return (Vec::new(), total, 0, None, false);
    }
    let end = (start + ITEMS_PER_PAGE).min(total);
    let page_items: Vec<ExecutionPath> = paths[start..end].to_vec();
    let has_more = end < total;
    let next_cursor = if has_more { Some(format!("page_{}", page + 1)) } else { None };
    let page_size = page_items.len();
    (page_items, total, page_size, next_cursor, has_more)
}

/// Functions reachable from `entry_point` per the built adjacency, used by
/// callers that need to know which names to treat as "in scope" (e.g. to
/// decide whether a call target is external per `include_external_calls`).
pub fn reachable_functions(adjacency: &std::collections::HashMap<String, Vec<String>>, entry_point: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack = vec![entry_point.to_string()];
    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(targets) = adjacency.get(&name) {
            stack.extend(targets.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builds_execution_paths_from_entry_point() {
        let files = vec![(
            PathBuf::from("a.ts"),
            "function a() { b(); }\nfunction b() { c(); }\nfunction c() {}".to_string(),
        )];
        let result = analyze(&files, "a", &CallGraphOptions::default());
        assert!(result.errors.is_empty());
        assert_eq!(result.call_graph_stats.total_functions, 3);
        assert!(result.execution_paths.iter().any(|p| p.steps.len() == 3));
    }

    #[test]
    fn detects_cycle_in_stats() {
        let files = vec![(
            PathBuf::from("a.ts"),
            "function a() { b(); }\nfunction b() { a(); }".to_string(),
        )];
        let result = analyze(&files, "a", &CallGraphOptions::default());
        assert!(result.call_graph_stats.cycles_detected >= 1);
        assert!(result.execution_paths.iter().any(|p| p.closed_by_cycle));
    }

    #[test]
    fn missing_entry_point_reports_not_found() {
        let files = vec![(PathBuf::from("a.ts"), "function a() {}".to_string())];
        let result = analyze(&files, "missing", &CallGraphOptions::default());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, AnalysisErrorCode::NotFound);
    }

    #[test]
    fn empty_entry_point_is_invalid_input() {
        let files: Vec<(PathBuf, String)> = Vec::new();
        let result = analyze(&files, "", &CallGraphOptions::default());
        assert_eq!(result.errors[0].code, AnalysisErrorCode::InvalidEntryPoint);
    }

    #[test]
    fn build_graph_model_replaces_cycle_edge_with_placeholder() {
        let files = vec![(
            PathBuf::from("a.ts"),
            "function a() { b(); }\nfunction b() { a(); }".to_string(),
        )];
        let graph = build_graph_model(&files, "a", 10);
        assert!(graph.nodes.iter().any(|n| matches!(n, CallGraphNode::CyclePlaceholder { .. })));
    }
}
