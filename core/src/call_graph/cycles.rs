//! Cycle detection and breaking (spec §4.9).
//!
//! Grounded on `original_source/.../cycle_detector.py`'s manual
//! path-tracked DFS fallback (`_detect_cycles_manual`/
//! `_dfs_cycle_detection`/`_break_cycle_manual`) — the teacher's "prefer a
//! graph library when available" NetworkX branch is replaced outright by
//! `petgraph`, always available in this crate's dependency stack. Using
//! `petgraph::stable_graph::StableGraph` keeps node indices stable across
//! edge removal/placeholder insertion, so `restore` can put broken edges
//! back without renumbering.

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

/// Detects cycles in a call adjacency list and breaks them by rerouting the
/// closing edge to a synthetic `[CYCLE: target]` placeholder node.
pub struct CycleDetector {
    graph: StableDiGraph<String, ()>,
    index_of: HashMap<String, NodeIndex>,
    broken_edges: Vec<(String, String)>,
    detected_cycles: Vec<Vec<String>>,
}

impl CycleDetector {
    pub fn from_adjacency(adjacency: &HashMap<String, Vec<String>>) -> Self {
        let mut graph = StableDiGraph::new();
        let mut index_of = HashMap::new();

        let mut ensure_node = |graph: &mut StableDiGraph<String, ()>, index_of: &mut HashMap<String, NodeIndex>, name: &str| {
            *index_of
                .entry(name.to_string())
                .or_insert_with(|| graph.add_node(name.to_string()))
        };

        for (source, targets) in adjacency {
            let s = ensure_node(&mut graph, &mut index_of, source);
            for target in targets {
                let t = ensure_node(&mut graph, &mut index_of, target);
                graph.add_edge(s, t, ());
            }
        }

        Self {
            graph,
            index_of,
            broken_edges: Vec::new(),
            detected_cycles: Vec::new(),
        }
    }

    /// Detects every cycle via path-tracked DFS and reroutes each closing
    /// edge to a `[CYCLE: target]` placeholder node, returning the detected
    /// cycles (function-name paths, closing node repeated at the end).
    pub fn detect_and_break(&mut self) -> Vec<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut cycles = Vec::new();

        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for node in nodes {
            if !visited.contains(&node) {
                let mut path = Vec::new();
                self.dfs_detect(node, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }

        for cycle in &cycles {
            self.break_cycle(cycle);
        }

        self.detected_cycles = cycles.clone();
        cycles
    }

    fn dfs_detect(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        rec_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        let neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        for neighbor in neighbors {
            if !visited.contains(&neighbor) {
                self.dfs_detect(neighbor, visited, rec_stack, path, cycles);
            } else if rec_stack.contains(&neighbor) {
                if let Some(start) = path.iter().position(|n| *n == neighbor) {
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                    cycle.push(self.graph[neighbor].clone());
                    if !is_duplicate_cycle(&cycle, cycles) {
                        cycles.push(cycle);
                    }
                }
            }
        }

        rec_stack.remove(&node);
        path.pop();
    }

    fn break_cycle(&mut self, cycle: &[String]) {
        if cycle.len() < 2 {
            return;
        }
        let source = if cycle.len() > 2 { &cycle[cycle.len() - 2] } else { &cycle[cycle.len() - 1] };
        let target = &cycle[0];

        let Some(&source_idx) = self.index_of.get(source) else { return };
        let Some(&target_idx) = self.index_of.get(target) else { return };

        let Some(edge) = self.graph.find_edge(source_idx, target_idx) else { return };
        self.graph.remove_edge(edge);
        self.broken_edges.push((source.clone(), target.clone()));

        // Self-loops are detected separately from multi-node cycles (spec
        // §4.9): a `[RECURSION: X]` placeholder for `a -> a`, distinct from
        // the `[CYCLE: X]` placeholder used for a genuine multi-node cycle.
        let placeholder = Self::placeholder_for(source, target);
        let placeholder_idx = *self
            .index_of
            .entry(placeholder.clone())
            .or_insert_with(|| self.graph.add_node(placeholder.clone()));
        self.graph.add_edge(source_idx, placeholder_idx, ());
    }

    fn placeholder_for(source: &str, target: &str) -> String {
        if source == target {
            format!("[RECURSION: {target}]")
        } else {
            format!("[CYCLE: {target}]")
        }
    }

    pub fn broken_edges(&self) -> &[(String, String)] {
        &self.broken_edges
    }

    /// Restores every broken edge, removing the placeholder edge it added
    /// (spec: "broken edges are remembered and can be restored").
    pub fn restore(&mut self) {
        for (source, target) in self.broken_edges.drain(..) {
            let placeholder = Self::placeholder_for(&source, &target);
            if let (Some(&s), Some(&p)) = (self.index_of.get(&source), self.index_of.get(&placeholder)) {
                if let Some(edge) = self.graph.find_edge(s, p) {
                    self.graph.remove_edge(edge);
                }
            }
            if let (Some(&s), Some(&t)) = (self.index_of.get(&source), self.index_of.get(&target)) {
                if self.graph.find_edge(s, t).is_none() {
                    self.graph.add_edge(s, t, ());
                }
            }
        }
    }

    pub fn functions_in_cycles(&self) -> HashSet<String> {
        self.detected_cycles.iter().flatten().cloned().collect()
    }

    /// Adjacency list reflecting every break performed so far (placeholder
    /// nodes included as targets).
    pub fn adjacency(&self) -> HashMap<String, Vec<String>> {
        let mut out = HashMap::new();
        for node in self.graph.node_indices() {
            let name = self.graph[node].clone();
            let targets: Vec<String> = self.graph.neighbors(node).map(|n| self.graph[n].clone()).collect();
            out.insert(name, targets);
        }
        out
    }
}

/// Checks rotational equality, matching the teacher's `_is_duplicate_cycle`.
fn is_duplicate_cycle(new_cycle: &[String], existing: &[Vec<String>]) -> bool {
    for existing_cycle in existing {
        if new_cycle.len() != existing_cycle.len() {
            continue;
        }
        for i in 0..existing_cycle.len() {
            let rotated: Vec<&String> = existing_cycle[i..].iter().chain(existing_cycle[..i].iter()).collect();
            if new_cycle.iter().collect::<Vec<_>>() == rotated {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency_of(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in pairs {
            map.entry(from.to_string()).or_default().push(to.to_string());
        }
        map
    }

    #[test]
    fn detects_direct_cycle() {
        let adjacency = adjacency_of(&[("a", "b"), ("b", "a")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        let cycles = detector.detect_and_break();
        assert_eq!(cycles.len(), 1);
    }

    #[test]
    fn breaking_replaces_edge_with_placeholder() {
        let adjacency = adjacency_of(&[("a", "b"), ("b", "a")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        detector.detect_and_break();
        let broken = detector.adjacency();
        let targets = &broken["b"];
        assert!(targets.iter().any(|t| t.starts_with("[CYCLE:")));
    }

    #[test]
    fn detects_self_recursion_as_cycle() {
        let adjacency = adjacency_of(&[("a", "a")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        let cycles = detector.detect_and_break();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn self_recursion_breaks_to_a_recursion_placeholder_not_a_cycle_placeholder() {
        let adjacency = adjacency_of(&[("a", "a")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        detector.detect_and_break();
        let broken = detector.adjacency();
        let targets = &broken["a"];
        assert!(targets.iter().any(|t| t == "[RECURSION: a]"));
        assert!(!targets.iter().any(|t| t.starts_with("[CYCLE:")));
    }

    #[test]
    fn multi_node_cycle_breaks_to_a_cycle_placeholder_not_a_recursion_placeholder() {
        let adjacency = adjacency_of(&[("a", "b"), ("b", "a")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        detector.detect_and_break();
        let broken = detector.adjacency();
        let targets = &broken["b"];
        assert!(targets.iter().any(|t| t == "[CYCLE: a]"));
        assert!(!targets.iter().any(|t| t.starts_with("[RECURSION:")));
    }

    #[test]
    fn restore_reverts_broken_edges() {
        let adjacency = adjacency_of(&[("a", "b"), ("b", "a")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        detector.detect_and_break();
        detector.restore();
        let restored = detector.adjacency();
        assert!(restored["b"].contains(&"a".to_string()));
        assert!(detector.broken_edges().is_empty());
    }

    #[test]
    fn no_cycle_in_acyclic_graph() {
        let adjacency = adjacency_of(&[("a", "b"), ("b", "c")]);
        let mut detector = CycleDetector::from_adjacency(&adjacency);
        assert!(detector.detect_and_break().is_empty());
    }
}
