use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Form of an import statement (spec §3/§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportForm {
    Named,
    Default,
    Namespace,
    SideEffect,
    Dynamic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedSymbol {
    pub name: String,
    pub alias: Option<String>,
}

/// One import statement in an owning file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub owning_file: String,
    pub module_specifier: String,
    pub named: Vec<ImportedSymbol>,
    pub default_binding: Option<String>,
    pub namespace_binding: Option<String>,
    pub form: ImportForm,
    pub type_only: bool,
    /// True when the specifier resolves outside the project root.
    pub external: bool,
    pub is_async: bool,
    /// 1-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
}

/// Form of an export statement (spec §3/§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportForm {
    Named,
    Default,
    Namespace,
    Reexport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub owning_file: String,
    pub names: Vec<String>,
    pub default_name: Option<String>,
    pub form: ExportForm,
    pub reexport_source: Option<String>,
    /// 1-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
}

/// A node in the [`ModuleGraph`]: either a project file or a pseudo-node
/// `external:<specifier>` for an unresolved external module (spec §3/§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleNode {
    File(String),
    External(String),
}

impl ModuleNode {
    pub fn label(&self) -> String {
        match self {
            ModuleNode::File(path) => path.clone(),
            ModuleNode::External(spec) => format!("external:{spec}"),
        }
    }
}

/// Directed graph of module dependencies. Edges carry the import form and
/// the source line of the import statement that created them.
pub struct ModuleGraph {
    graph: DiGraph<ModuleNode, (ImportForm, u32)>,
    index_of: HashMap<ModuleNode, NodeIndex>,
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_of: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: ModuleNode) -> NodeIndex {
        if let Some(idx) = self.index_of.get(&node) {
            return *idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.index_of.insert(node, idx);
        idx
    }

    pub fn add_edge(&mut self, from: ModuleNode, to: ModuleNode, form: ImportForm, line: u32) {
        let a = self.add_node(from);
        let b = self.add_node(to);
        self.graph.add_edge(a, b, (form, line));
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn inner(&self) -> &DiGraph<ModuleNode, (ImportForm, u32)> {
        &self.graph
    }

    pub fn index_of(&self, node: &ModuleNode) -> Option<NodeIndex> {
        self.index_of.get(node).copied()
    }

    /// Nodes reachable from `node` by following edges forward, i.e. files
    /// this file (transitively) imports.
    pub fn dependencies_of(&self, node: &ModuleNode) -> Vec<ModuleNode> {
        let Some(start) = self.index_of(node) else {
            return Vec::new();
        };
        let mut dfs = petgraph::visit::Dfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                out.push(self.graph[idx].clone());
            }
        }
        out
    }

    /// Nodes that (transitively) depend on `node`, i.e. files that import
    /// this file directly or indirectly.
    pub fn dependents_of(&self, node: &ModuleNode) -> Vec<ModuleNode> {
        let Some(start) = self.index_of(node) else {
            return Vec::new();
        };
        let reversed = petgraph::visit::Reversed(&self.graph);
        let mut dfs = petgraph::visit::Dfs::new(&reversed, start);
        let mut out = Vec::new();
        while let Some(idx) = dfs.next(&reversed) {
            if idx != start {
                out.push(self.graph[idx].clone());
            }
        }
        out
    }
}
