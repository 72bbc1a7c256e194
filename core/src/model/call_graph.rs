use serde::{Deserialize, Serialize};

/// A node in a [`CallGraph`]: a real function, or a placeholder introduced
/// by cycle breaking (spec §3/§4.9: `[CYCLE: X]` / `[RECURSION: X]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallGraphNode {
    Function(String),
    CyclePlaceholder { target: String, label: String },
}

impl CallGraphNode {
    pub fn name(&self) -> &str {
        match self {
            CallGraphNode::Function(name) => name,
            CallGraphNode::CyclePlaceholder { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphEdge {
    pub from: CallGraphNode,
    pub to: CallGraphNode,
    pub call_site_line: Option<u32>,
}

/// Forward call graph built from a single entry point (spec §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub entry_point: String,
    pub nodes: Vec<CallGraphNode>,
    pub edges: Vec<CallGraphEdge>,
    pub max_depth_reached: usize,
    pub cycles_detected: usize,
}

impl CallGraph {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            ..Default::default()
        }
    }

    pub fn ensure_node(&mut self, node: CallGraphNode) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    /// Add an edge, ensuring both endpoints exist as nodes first (spec
    /// invariant 5: no edge without its source node).
    pub fn add_edge(&mut self, from: CallGraphNode, to: CallGraphNode, line: Option<u32>) {
        self.ensure_node(from.clone());
        self.ensure_node(to.clone());
        self.edges.push(CallGraphEdge {
            from,
            to,
            call_site_line: line,
        });
    }

    pub fn out_edges(&self, node: &CallGraphNode) -> impl Iterator<Item = &CallGraphEdge> {
        self.edges.iter().filter(move |e| &e.from == node)
    }
}

/// A single guard condition annotating a step of an [`ExecutionPath`]
/// (spec §4.9 conditional analyzer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStep {
    pub function: String,
    pub guard: Option<String>,
    pub probability: Option<f64>,
}

/// One root-to-leaf (or root-to-repeat) walk through a [`CallGraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPath {
    pub steps: Vec<PathStep>,
    /// True when this path was closed by hitting a node already on the
    /// current path (a cycle), rather than by reaching a leaf or the depth
    /// limit.
    pub closed_by_cycle: bool,
    /// True when this path was truncated by `max_depth` mid-traversal.
    pub truncated: bool,
}
