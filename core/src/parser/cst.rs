//! Owned concrete syntax tree produced from a single parse.
//!
//! `oxc_parser::Parser::parse` returns a `Program<'a>` borrowing from the
//! `oxc_allocator::Allocator` it was parsed with, so a `Program` cannot
//! outlive the call that produced it without the cache becoming
//! self-referential. `Cst` is the walked-once, fully owned projection of
//! that program that the parser cache actually stores (spec §4.1's
//! "cache ... stores `(tree, content-fingerprint, mtime, parse_time)`");
//! the allocator and borrowed `Program` are dropped as soon as the walk
//! finishes. Downstream components that need full-fidelity AST shape
//! (inheritance, type, function, conditional analysis) re-walk the source
//! text directly via regex/bracket scanning per their own contracts rather
//! than querying this tree, matching the original analysis server's
//! text-scanning approach; `Cst` exists for `query_nodes` and for the
//! import tracker's first (syntactic) pass.

use serde::{Deserialize, Serialize};

/// Coarse classification a [`CstNode`] can be queried by (spec §4.1:
/// `query_nodes(tree, kind) -> [node]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CstNodeKind {
    FunctionDeclaration,
    ClassDeclaration,
    InterfaceDeclaration,
    TypeAlias,
    EnumDeclaration,
    ImportDeclaration,
    ExportDeclaration,
    VariableDeclarator,
    CallExpression,
    MethodDefinition,
}

/// One captured syntactic construct: a name (when the construct has one),
/// its byte span, and its 1-based source line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CstNode {
    pub kind: CstNodeKind,
    pub name: Option<String>,
    pub span_start: u32,
    pub span_end: u32,
    pub line: u32,
    /// For methods: the enclosing class/interface name.
    pub enclosing: Option<String>,
}

/// The parser's owned result for one file: a flat list of captured nodes
/// plus whatever the semantic pass could establish about exported-symbol
/// local usage (spec §4.1 / §4.4's local-reference de-duplication input).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cst {
    pub nodes: Vec<CstNode>,
    pub is_tsx: bool,
    /// Names oxc's semantic analysis could confirm are referenced locally
    /// (used by the symbol resolver's semantic pass to raise confidence).
    pub locally_referenced: Vec<String>,
}

impl Cst {
    pub fn query_nodes(&self, kind: CstNodeKind) -> Vec<&CstNode> {
        self.nodes.iter().filter(|n| n.kind == kind).collect()
    }

    pub fn byte_len(&self) -> usize {
        // Rough serialized-size proxy used for cache accounting; avoids a
        // real `serde_json::to_vec` call on every insert.
        self.nodes.len() * 96 + self.locally_referenced.iter().map(|s| s.len() + 8).sum::<usize>()
    }
}
