//! Dependency-cycle detection over a [`ModuleGraph`] (spec §4.4).
//!
//! Grounded on the teacher's `analyzer/cycles.rs` (`CycleClassification`,
//! severity scoring) but generalized to use `petgraph`'s Tarjan SCC as the
//! graph-library backend the corpus otherwise reaches for, with a DFS walk
//! over each non-trivial SCC to extract one representative rotation of the
//! simple cycle it contains (the teacher hand-rolls Tarjan; we let petgraph
//! do the SCC partitioning and keep only the rotation-extraction bespoke).

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::model::ModuleGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedCycle {
    /// File paths in cycle order; the last entry imports the first.
    pub members: Vec<String>,
    pub severity: CycleSeverity,
}

/// Finds every dependency cycle in `graph`. A direct two-file cycle (A
/// imports B, B imports A) is a `warning`; anything longer is an `error`
/// (spec §4.4).
pub fn detect_cycles(graph: &ModuleGraph) -> Vec<DetectedCycle> {
    let inner = graph.inner();
    let sccs = tarjan_scc(inner);
    let mut cycles = Vec::new();

    for scc in sccs {
        if scc.len() < 2 {
            // Singletons can still self-loop; check explicitly.
            if let Some(&idx) = scc.first() {
                if inner.contains_edge(idx, idx) {
                    cycles.push(DetectedCycle {
                        members: vec![inner[idx].label()],
                        severity: CycleSeverity::Error,
                    });
                }
            }
            continue;
        }
        if let Some(rotation) = representative_rotation(inner, &scc) {
            let severity = if rotation.len() == 2 {
                CycleSeverity::Warning
            } else {
                CycleSeverity::Error
            };
            cycles.push(DetectedCycle {
                members: rotation.iter().map(|&idx| inner[idx].label()).collect(),
                severity,
            });
        }
    }
    cycles
}

/// DFS from an arbitrary member of the SCC, returning the first simple
/// cycle found back to the start node.
fn representative_rotation(
    graph: &petgraph::graph::DiGraph<crate::model::ModuleNode, (crate::model::ImportForm, u32)>,
    scc: &[NodeIndex],
) -> Option<Vec<NodeIndex>> {
    use std::collections::HashSet;
    let members: HashSet<NodeIndex> = scc.iter().copied().collect();
    let start = *scc.first()?;

    let mut stack = vec![start];
    let mut path: Vec<NodeIndex> = Vec::new();
    let mut on_path: HashSet<NodeIndex> = HashSet::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();

    fn dfs(
        node: NodeIndex,
        start: NodeIndex,
        graph: &petgraph::graph::DiGraph<crate::model::ModuleNode, (crate::model::ImportForm, u32)>,
        members: &HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
        on_path: &mut HashSet<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        path.push(node);
        on_path.insert(node);
        visited.insert(node);
        for neighbor in graph.neighbors(node) {
            if !members.contains(&neighbor) {
                continue;
            }
            if neighbor == start && path.len() > 1 {
                return Some(path.clone());
            }
            if !visited.contains(&neighbor) {
                if let Some(found) = dfs(neighbor, start, graph, members, path, on_path, visited) {
                    return Some(found);
                }
            }
        }
        path.pop();
        on_path.remove(&node);
        None
    }

    let _ = &mut stack;
    dfs(start, start, graph, &members, &mut path, &mut on_path, &mut visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImportForm, ModuleNode};

    #[test]
    fn detects_two_file_cycle_as_warning() {
        let mut graph = ModuleGraph::new();
        graph.add_edge(
            ModuleNode::File("a.ts".into()),
            ModuleNode::File("b.ts".into()),
            ImportForm::Named,
            1,
        );
        graph.add_edge(
            ModuleNode::File("b.ts".into()),
            ModuleNode::File("a.ts".into()),
            ImportForm::Named,
            1,
        );
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, CycleSeverity::Warning);
        assert_eq!(cycles[0].members.len(), 2);
    }

    #[test]
    fn detects_three_file_cycle_as_error() {
        let mut graph = ModuleGraph::new();
        graph.add_edge(
            ModuleNode::File("a.ts".into()),
            ModuleNode::File("b.ts".into()),
            ImportForm::Named,
            1,
        );
        graph.add_edge(
            ModuleNode::File("b.ts".into()),
            ModuleNode::File("c.ts".into()),
            ImportForm::Named,
            1,
        );
        graph.add_edge(
            ModuleNode::File("c.ts".into()),
            ModuleNode::File("a.ts".into()),
            ImportForm::Named,
            1,
        );
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, CycleSeverity::Error);
        assert_eq!(cycles[0].members.len(), 3);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let mut graph = ModuleGraph::new();
        graph.add_edge(
            ModuleNode::File("a.ts".into()),
            ModuleNode::File("b.ts".into()),
            ImportForm::Named,
            1,
        );
        assert!(detect_cycles(&graph).is_empty());
    }
}
