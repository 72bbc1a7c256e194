use serde::{Deserialize, Serialize};

use super::clamp_confidence;

/// What a textual occurrence of a symbol represents (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Declaration,
    Definition,
    Usage,
    Call,
    Import,
    Export,
}

/// A single textual occurrence of a symbol.
///
/// `(file, line, column)` uniquely identifies a reference within a pass
/// (spec invariant 3); duplicates sharing that triple plus `kind` and
/// `symbol_name` are removed by [`crate::symbol_resolver::dedup_references`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub file: String,
    /// 1-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
    pub context: String,
    pub kind: ReferenceKind,
    pub confidence: f64,
    pub symbol_name: Option<String>,
    pub symbol_kind: Option<super::SymbolKind>,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub signature: Option<String>,
    pub import_path: Option<String>,
    pub import_form: Option<super::ImportForm>,
}

impl Reference {
    pub fn new(file: impl Into<String>, line: u32, column: u32, context: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            context: context.into(),
            kind,
            confidence: base_confidence(kind),
            symbol_name: None,
            symbol_kind: None,
            class_name: None,
            method_name: None,
            signature: None,
            import_path: None,
            import_form: None,
        }
    }

    pub fn with_symbol(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }

    pub fn bump_confidence(&mut self, delta: f64) {
        self.confidence = clamp_confidence(self.confidence + delta);
    }

    /// Identity used for dedup (spec invariant 3 / testable property 5).
    pub fn identity(&self) -> (String, u32, u32, ReferenceKind, Option<String>) {
        (
            self.file.clone(),
            self.line,
            self.column,
            self.kind,
            self.symbol_name.clone(),
        )
    }
}

fn base_confidence(kind: ReferenceKind) -> f64 {
    match kind {
        ReferenceKind::Declaration => 0.9,
        ReferenceKind::Definition => 0.8,
        ReferenceKind::Import | ReferenceKind::Export => 0.85,
        ReferenceKind::Call => 0.7,
        ReferenceKind::Usage => 0.6,
    }
}
